use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

/// Mimetype of gemtext payloads, including synthesized ones (listings, errors).
pub const GEMTEXT: &str = "text/gemini; charset=utf-8";

const OCTET_STREAM: &str = "application/octet-stream";

/// Extensions the generic guesser does not know about.
static EXTRA_TYPES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([("gmi", "text/gemini"), ("gemini", "text/gemini")])
});

/// Guess the mimetype of a file from its extension.
///
/// `text/*` types carry an explicit `charset=utf-8` parameter; anything the
/// registry cannot identify is served as `application/octet-stream`.
pub fn guess_mimetype(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(str::to_ascii_lowercase);

    if let Some(essence) = ext.as_deref().and_then(|e| EXTRA_TYPES.get(e)) {
        return format!("{essence}; charset=utf-8");
    }

    match mime_guess::from_path(path).first_raw() {
        Some(essence) if essence.starts_with("text/") => format!("{essence}; charset=utf-8"),
        Some(essence) => essence.to_string(),
        None => OCTET_STREAM.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemtext_extensions_win_over_the_generic_registry() {
        assert_eq!(
            guess_mimetype(Path::new("index.gmi")),
            "text/gemini; charset=utf-8"
        );
        assert_eq!(
            guess_mimetype(Path::new("a/b/page.gemini")),
            "text/gemini; charset=utf-8"
        );
        assert_eq!(
            guess_mimetype(Path::new("PAGE.GMI")),
            "text/gemini; charset=utf-8"
        );
    }

    #[test]
    fn text_types_carry_a_charset() {
        assert_eq!(
            guess_mimetype(Path::new("notes.txt")),
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn binary_types_are_bare() {
        assert_eq!(guess_mimetype(Path::new("logo.png")), "image/png");
    }

    #[test]
    fn unknown_extensions_fall_back_to_octet_stream() {
        assert_eq!(guess_mimetype(Path::new("blob.zzz")), OCTET_STREAM);
        assert_eq!(guess_mimetype(Path::new("no-extension")), OCTET_STREAM);
    }
}
