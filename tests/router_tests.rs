use castor::response::Response;
use castor::router::{RouteTarget, Router};

fn table(prefixes: &[&str]) -> Router {
    let entries = prefixes
        .iter()
        .map(|p| {
            (
                (*p).to_string(),
                RouteTarget::fixed(Response::text(format!("route {p}"))),
            )
        })
        .collect();
    Router::new(entries).unwrap()
}

#[test]
fn longest_prefix_wins() {
    let router = table(&["", "/a", "/a/b"]);
    let (prefix, _) = router.route("/a/b/c").unwrap();
    assert_eq!(prefix, "/a/b");

    let (prefix, _) = router.route("/a/x").unwrap();
    assert_eq!(prefix, "/a");
}

#[test]
fn catch_all_matches_anything() {
    let router = table(&["", "/docs"]);
    let (prefix, _) = router.route("/nowhere/else").unwrap();
    assert_eq!(prefix, "");
    let (prefix, _) = router.route("/docs/setup").unwrap();
    assert_eq!(prefix, "/docs");
}

#[test]
fn no_match_without_catch_all() {
    let router = table(&["/a", "/b"]);
    assert!(router.route("/c").is_none());
    assert!(router.route("/a/sub").is_some());
}

#[test]
fn fixed_targets_are_returned_verbatim() {
    let router = Router::new(vec![(
        "/30".to_string(),
        RouteTarget::fixed(Response::redirect("/hello")),
    )])
    .unwrap();

    let (_, target) = router.route("/30").unwrap();
    let RouteTarget::Fixed(response) = target else {
        panic!("expected a fixed response");
    };
    assert_eq!(response.wire(), b"30 /hello\r\n");
}

#[test]
fn empty_tables_are_rejected() {
    assert!(Router::new(Vec::new()).is_err());
}

#[test]
fn duplicate_prefixes_are_rejected() {
    let entries = vec![
        ("/a".to_string(), RouteTarget::fixed(Response::text("one"))),
        ("/a".to_string(), RouteTarget::fixed(Response::text("two"))),
    ];
    assert!(Router::new(entries).is_err());
}
