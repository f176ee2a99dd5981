//! The Gemini response model.
//!
//! One sum type covers every status the server can speak; serialization is a
//! single exhaustive match, and the wire bytes are cached per instance so
//! length queries and socket writes always observe identical bytes.

mod mime;
mod template;

pub use mime::{GEMTEXT, guess_mimetype};
pub use template::{TemplateError, substitute};

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::error::HandlerError;

/// A response value: status, META payload and optional body.
///
/// Responses are immutable. Handlers build them per request; pre-built ones
/// live in the route table behind an `Arc` for the process lifetime.
#[derive(Debug)]
pub struct Response {
    kind: Kind,
    wire: OnceLock<Vec<u8>>,
}

#[derive(Debug, Clone)]
enum Kind {
    /// 10: ask the client for input.
    Input { prompt: String },
    /// 11: ask for input that must not be echoed.
    SensitiveInput { prompt: String },
    /// 20: inline gemtext.
    Text { content: String },
    /// 20: file contents with a guessed mimetype.
    Document { mimetype: String, content: Vec<u8> },
    /// 20: synthesized gemtext listing of a directory.
    DirectoryListing { content: Vec<u8> },
    /// 30: temporary redirect.
    Redirect { target: String },
    /// 31: permanent redirect.
    PermanentRedirect { target: String },
    /// 44: client must back off for the given number of seconds.
    SlowDown { seconds: u64 },
    /// 50: permanent failure with a reason string.
    PermanentFailure { reason: String },
    /// 51: not found.
    NotFound { reason: String },
    /// 53: refused to proxy a foreign scheme or port.
    ProxyRequestRefused,
    /// 59: the request line was not a valid Gemini request.
    BadRequest,
}

impl Response {
    fn from_kind(kind: Kind) -> Self {
        Self {
            kind,
            wire: OnceLock::new(),
        }
    }

    pub fn input(prompt: impl Into<String>) -> Self {
        Self::from_kind(Kind::Input {
            prompt: prompt.into(),
        })
    }

    pub fn sensitive_input(prompt: impl Into<String>) -> Self {
        Self::from_kind(Kind::SensitiveInput {
            prompt: prompt.into(),
        })
    }

    /// Inline gemtext content.
    pub fn text(content: impl Into<String>) -> Self {
        Self::from_kind(Kind::Text {
            content: content.into(),
        })
    }

    /// Gemtext page with a `# title` heading followed by a blank line and the
    /// body, every line CRLF-terminated on the wire.
    pub fn titled_text(title: &str, body: &str) -> Self {
        let mut content = String::new();
        if !title.is_empty() {
            content.push_str(&format!("# {title}\n\n"));
        }
        content.push_str(body);
        Self::text(content)
    }

    pub fn redirect(target: impl Into<String>) -> Self {
        Self::from_kind(Kind::Redirect {
            target: target.into(),
        })
    }

    pub fn permanent_redirect(target: impl Into<String>) -> Self {
        Self::from_kind(Kind::PermanentRedirect {
            target: target.into(),
        })
    }

    pub fn slow_down(seconds: u64) -> Self {
        Self::from_kind(Kind::SlowDown { seconds })
    }

    pub fn permanent_failure(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::from_kind(Kind::PermanentFailure {
            reason: if reason.is_empty() {
                "PERMANENT FAILURE".to_string()
            } else {
                reason
            },
        })
    }

    pub fn not_found(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::from_kind(Kind::NotFound {
            reason: if reason.is_empty() {
                "NOT FOUND".to_string()
            } else {
                reason
            },
        })
    }

    pub fn proxy_request_refused() -> Self {
        Self::from_kind(Kind::ProxyRequestRefused)
    }

    pub fn bad_request() -> Self {
        Self::from_kind(Kind::BadRequest)
    }

    /// Serve a file. The canonicalized path must stay inside `root`.
    pub fn document(path: &Path, root: &Path) -> Result<Self, HandlerError> {
        let full = confine(path, root)?;
        if !full.is_file() {
            return Err(HandlerError::NotFound);
        }
        let content = fs::read(&full)?;
        Ok(Self::from_kind(Kind::Document {
            mimetype: guess_mimetype(&full),
            content,
        }))
    }

    /// Synthesize a gemtext listing of a directory. The directory is read
    /// once, here; entry order is whatever the OS returns.
    pub fn directory_listing(path: &Path, root: &Path) -> Result<Self, HandlerError> {
        let full = confine(path, root)?;
        if !full.is_dir() {
            return Err(HandlerError::NotFound);
        }
        let relative = relative_display(&full, root);

        let mut body = format!("# Directory listing for {relative}\r\n\r\n");
        for entry in fs::read_dir(&full)? {
            let entry = entry?;
            let name = entry.file_name();
            body.push_str(&format!("=> {relative}/{}\r\n", name.to_string_lossy()));
        }
        Ok(Self::from_kind(Kind::DirectoryListing {
            content: body.into_bytes(),
        }))
    }

    /// Render a template file against a context map. A missing placeholder
    /// key surfaces as a status-50 response carrying the key name.
    pub fn template(
        path: &Path,
        context: &HashMap<String, String>,
    ) -> Result<Self, TemplateError> {
        let raw = fs::read_to_string(path)
            .map_err(|_| TemplateError::NotFound(path.display().to_string()))?;
        Ok(Self::text(substitute(&raw, context)?))
    }

    /// Two-digit Gemini status code.
    pub fn status(&self) -> u8 {
        match &self.kind {
            Kind::Input { .. } => 10,
            Kind::SensitiveInput { .. } => 11,
            Kind::Text { .. } | Kind::Document { .. } | Kind::DirectoryListing { .. } => 20,
            Kind::Redirect { .. } => 30,
            Kind::PermanentRedirect { .. } => 31,
            Kind::SlowDown { .. } => 44,
            Kind::PermanentFailure { .. } => 50,
            Kind::NotFound { .. } => 51,
            Kind::ProxyRequestRefused => 53,
            Kind::BadRequest => 59,
        }
    }

    /// The META text after the status code.
    pub fn meta(&self) -> String {
        match &self.kind {
            Kind::Input { prompt } | Kind::SensitiveInput { prompt } => prompt.clone(),
            Kind::Text { .. } | Kind::DirectoryListing { .. } => GEMTEXT.to_string(),
            Kind::Document { mimetype, .. } => mimetype.clone(),
            Kind::Redirect { target } | Kind::PermanentRedirect { target } => target.clone(),
            Kind::SlowDown { seconds } => seconds.to_string(),
            Kind::PermanentFailure { reason } | Kind::NotFound { reason } => reason.clone(),
            Kind::ProxyRequestRefused => "PROXY REQUEST REFUSED".to_string(),
            Kind::BadRequest => "BAD REQUEST".to_string(),
        }
    }

    fn mimetype(&self) -> &str {
        match &self.kind {
            Kind::Document { mimetype, .. } => mimetype,
            _ => GEMTEXT,
        }
    }

    fn body_bytes(&self) -> Option<&[u8]> {
        match &self.kind {
            Kind::Text { content } => Some(content.as_bytes()),
            Kind::Document { content, .. } | Kind::DirectoryListing { content } => Some(content),
            _ => None,
        }
    }

    /// The serialized wire form, computed once and cached.
    pub fn wire(&self) -> &[u8] {
        self.wire.get_or_init(|| self.serialize())
    }

    /// Byte length of the wire form. Stable across calls.
    pub fn len(&self) -> usize {
        self.wire().len()
    }

    pub fn is_empty(&self) -> bool {
        self.wire().is_empty()
    }

    fn serialize(&self) -> Vec<u8> {
        let mut buf = format!("{} {}\r\n", self.status(), self.meta()).into_bytes();
        match self.body_bytes() {
            Some(body) if self.mimetype().starts_with("text/") => {
                buf.extend_from_slice(body);
                buf = crlf(&buf);
            }
            Some(body) => buf.extend_from_slice(body),
            None => {}
        }
        buf
    }
}

/// Canonicalize `path` and require it to stay under the canonical `root`.
fn confine(path: &Path, root: &Path) -> Result<PathBuf, HandlerError> {
    let root = root.canonicalize().map_err(|_| HandlerError::NotFound)?;
    let full = path.canonicalize().map_err(|_| HandlerError::NotFound)?;
    if full.starts_with(&root) {
        Ok(full)
    } else {
        Err(HandlerError::ForbiddenPath)
    }
}

/// `full` relative to `root`, rendered with a leading slash; empty for the
/// root itself.
fn relative_display(full: &Path, root: &Path) -> String {
    match full.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => String::new(),
        Ok(rel) => format!("/{}", rel.to_string_lossy()),
        Err(_) => full.to_string_lossy().into_owned(),
    }
}

/// Normalize every line break (CR, LF or CRLF) to CRLF, terminating the last
/// line as well.
fn crlf(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() + 16);
    let mut line_start = 0;
    let mut i = 0;
    while i < input.len() {
        match input[i] {
            b'\n' => {
                out.extend_from_slice(&input[line_start..i]);
                out.extend_from_slice(b"\r\n");
                i += 1;
                line_start = i;
            }
            b'\r' => {
                out.extend_from_slice(&input[line_start..i]);
                out.extend_from_slice(b"\r\n");
                i += 1;
                if input.get(i) == Some(&b'\n') {
                    i += 1;
                }
                line_start = i;
            }
            _ => i += 1,
        }
    }
    if line_start < input.len() {
        out.extend_from_slice(&input[line_start..]);
        out.extend_from_slice(b"\r\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crlf_normalizes_mixed_line_endings() {
        assert_eq!(crlf(b"a\nb\rc\r\nd"), b"a\r\nb\r\nc\r\nd\r\n");
        assert_eq!(crlf(b"a\r\n"), b"a\r\n");
        assert_eq!(crlf(b""), b"");
    }

    #[test]
    fn meta_only_responses_end_with_crlf() {
        assert_eq!(Response::input("answer?").wire(), b"10 answer?\r\n");
        assert_eq!(Response::redirect("/hello").wire(), b"30 /hello\r\n");
        assert_eq!(Response::slow_down(44).wire(), b"44 44\r\n");
        assert_eq!(
            Response::proxy_request_refused().wire(),
            b"53 PROXY REQUEST REFUSED\r\n"
        );
        assert_eq!(Response::bad_request().wire(), b"59 BAD REQUEST\r\n");
    }

    #[test]
    fn default_reasons_apply_when_empty() {
        assert_eq!(Response::not_found("").wire(), b"51 NOT FOUND\r\n");
        assert_eq!(
            Response::permanent_failure("").wire(),
            b"50 PERMANENT FAILURE\r\n"
        );
        assert_eq!(
            Response::not_found("Nobody escapes").wire(),
            b"51 Nobody escapes\r\n"
        );
    }

    #[test]
    fn text_bodies_are_normalized() {
        let r = Response::text("hi\n");
        assert_eq!(r.wire(), b"20 text/gemini; charset=utf-8\r\nhi\r\n");

        let r = Response::titled_text("Title", "Hello World!");
        assert_eq!(
            r.wire(),
            b"20 text/gemini; charset=utf-8\r\n# Title\r\n\r\nHello World!\r\n"
        );
    }

    #[test]
    fn wire_bytes_are_cached() {
        let r = Response::text("stable");
        let first = r.wire().as_ptr();
        let len = r.len();
        assert_eq!(r.wire().as_ptr(), first);
        assert_eq!(r.len(), len);
    }
}
