use thiserror::Error as ThisError;

use crate::response::TemplateError;

/// Fatal startup errors. Per-connection faults never reach this type: they
/// are classified at the worker boundary and mapped to wire responses there.
#[derive(Debug, ThisError)]
pub enum CastorError {
    #[error("improperly configured: {0}")]
    ImproperlyConfigured(String),

    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("certificate parse error: {0}")]
    CertificateParse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of validating a request line, one variant per classification.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum RequestError {
    /// The line never ended in CRLF. Treated like a client that went away:
    /// no response is sent.
    #[error("request line not terminated by CRLF")]
    Unterminated,

    /// Not a `gemini://` URL at all. Status 59.
    #[error("not a gemini:// request line")]
    BadRequest,

    /// A foreign scheme or a foreign port: we are not a proxy. Status 53.
    #[error("proxy request refused")]
    ProxyRefused,

    /// Structurally broken URL (brackets, port, parse failure). Status 59.
    #[error("malformed URL: {0}")]
    Invalid(String),

    /// Hostname matches no subjectAltName entry of our certificate. Status 53.
    #[error("hostname `{0}` does not match the server certificate")]
    CertificateMismatch(String),
}

/// Errors raised while materializing a response for a routed request.
#[derive(Debug, ThisError)]
pub enum HandlerError {
    #[error("NOT FOUND")]
    NotFound,

    /// The resolved path escaped the static root. Reported like a missing
    /// file so probes learn nothing about the filesystem.
    #[error("forbidden path")]
    ForbiddenPath,

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
