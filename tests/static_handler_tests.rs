use std::fs;

use tempfile::TempDir;

use castor::error::HandlerError;
use castor::handlers::{Handler, StaticHandler};

fn static_root() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.gmi"), "hi\n").unwrap();
    fs::write(dir.path().join("notes.txt"), "plain text\n").unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub/page.gmi"), "# sub page\n").unwrap();
    dir
}

#[test]
fn serves_the_index_file_for_directories() {
    let root = static_root();
    let handler = StaticHandler::with_defaults(root.path()).unwrap();

    let response = handler.handle("", "/").unwrap();
    assert_eq!(
        response.wire(),
        b"20 text/gemini; charset=utf-8\r\nhi\r\n"
    );

    // The bare route path resolves to the same index.
    let response = handler.handle("", "").unwrap();
    assert_eq!(
        response.wire(),
        b"20 text/gemini; charset=utf-8\r\nhi\r\n"
    );
}

#[test]
fn serves_regular_files_with_guessed_mimetypes() {
    let root = static_root();
    let handler = StaticHandler::with_defaults(root.path()).unwrap();

    let response = handler.handle("", "/notes.txt").unwrap();
    let wire = response.wire();
    assert!(wire.starts_with(b"20 text/plain; charset=utf-8\r\n"));
    assert!(wire.ends_with(b"plain text\r\n"));
}

#[test]
fn strips_the_matched_route_prefix() {
    let root = static_root();
    let handler = StaticHandler::with_defaults(root.path()).unwrap();

    let response = handler.handle("/static", "/static/sub/page.gmi").unwrap();
    assert!(response.wire().starts_with(b"20 text/gemini; charset=utf-8\r\n"));
}

#[test]
fn lists_directories_without_an_index() {
    let root = static_root();
    let handler = StaticHandler::with_defaults(root.path()).unwrap();

    let response = handler.handle("", "/sub").unwrap();
    let wire = String::from_utf8(response.wire().to_vec()).unwrap();
    assert!(wire.starts_with("20 text/gemini; charset=utf-8\r\n"));
    assert!(wire.contains("# Directory listing for /sub\r\n"));
    assert!(wire.contains("=> /sub/page.gmi\r\n"));
}

#[test]
fn directory_listing_can_be_disabled() {
    let root = static_root();
    let handler = StaticHandler::new(root.path(), false, "index.gmi").unwrap();

    assert!(matches!(
        handler.handle("", "/sub"),
        Err(HandlerError::NotFound)
    ));
}

#[test]
fn alternate_index_files_are_honored() {
    let root = static_root();
    let handler = StaticHandler::new(root.path(), true, "page.gmi").unwrap();

    let response = handler.handle("", "/sub").unwrap();
    let wire = String::from_utf8(response.wire().to_vec()).unwrap();
    assert!(wire.contains("# sub page\r\n"));
}

#[test]
fn refuses_paths_escaping_the_root() {
    let base = tempfile::tempdir().unwrap();
    let root = base.path().join("root");
    fs::create_dir(&root).unwrap();
    fs::write(base.path().join("secret.txt"), "keep out").unwrap();

    let handler = StaticHandler::with_defaults(&root).unwrap();
    assert!(matches!(
        handler.handle("", "/../secret.txt"),
        Err(HandlerError::ForbiddenPath)
    ));
}

#[test]
fn missing_paths_are_not_found() {
    let root = static_root();
    let handler = StaticHandler::with_defaults(root.path()).unwrap();
    assert!(matches!(
        handler.handle("", "/nope.gmi"),
        Err(HandlerError::NotFound)
    ));
}

#[test]
fn construction_fails_on_a_missing_directory() {
    assert!(StaticHandler::with_defaults("/definitely/not/a/directory").is_err());
}
