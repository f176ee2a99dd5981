//! Request-line parsing and validation.
//!
//! `check_url` either returns the parsed request or exactly one
//! classification from [`RequestError`]; the worker maps classifications to
//! wire responses.

use url::Url;

use crate::error::RequestError;
use crate::tls::ServerIdentity;

/// Longest allowed request URL after trimming, per the Gemini protocol.
pub const MAX_URL_LEN: usize = 1024;

/// Default Gemini port, assumed when the URL carries none.
pub const DEFAULT_PORT: u16 = 1965;

/// A validated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiRequest {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub query: Option<String>,
}

/// Validate a raw request line against the protocol, the server port and the
/// server certificate's subjectAltName entries. `identity` is `None` only
/// when host checking is intentionally disabled.
pub fn check_url(
    raw: &str,
    server_port: u16,
    identity: Option<&ServerIdentity>,
) -> Result<GeminiRequest, RequestError> {
    if !raw.ends_with("\r\n") {
        return Err(RequestError::Unterminated);
    }
    let trimmed = raw.trim();

    if let Some(rest) = trimmed.strip_prefix("gemini://") {
        if rest.is_empty() {
            return Err(RequestError::Invalid("empty authority".to_string()));
        }
    } else if scheme_of(trimmed).is_some_and(|s| !s.eq_ignore_ascii_case("gemini")) {
        return Err(RequestError::ProxyRefused);
    } else {
        return Err(RequestError::BadRequest);
    }

    if trimmed.len() > MAX_URL_LEN {
        return Err(RequestError::BadRequest);
    }

    let authority = &trimmed["gemini://".len()..];
    let authority = authority
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(authority);
    check_brackets(authority)?;

    let url = Url::parse(trimmed).map_err(|e| RequestError::Invalid(e.to_string()))?;

    let host = url
        .host_str()
        .ok_or_else(|| RequestError::Invalid("missing host".to_string()))?;
    // IPv6 literals wear brackets in the authority; SAN entries do not.
    let host = host.trim_matches(['[', ']']).to_ascii_lowercase();

    let port = url.port().unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(RequestError::Invalid("port 0".to_string()));
    }
    if port != server_port {
        return Err(RequestError::ProxyRefused);
    }

    if let Some(identity) = identity {
        if !identity.matches(&host) {
            return Err(RequestError::CertificateMismatch(host));
        }
    }

    Ok(GeminiRequest {
        host,
        port,
        path: url.path().to_string(),
        query: url.query().map(str::to_string),
    })
}

/// The `scheme:` prefix of the line, if it has one, so a foreign scheme is
/// distinguishable from a bare hostname.
fn scheme_of(s: &str) -> Option<&str> {
    let (scheme, _) = s.split_once(':')?;
    let mut chars = scheme.chars();
    let well_formed = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    well_formed.then_some(scheme)
}

/// Reject unbalanced, out-of-order or duplicated IPv6 brackets before the
/// URL parser gets a chance to be lenient about them.
fn check_brackets(authority: &str) -> Result<(), RequestError> {
    let opens = authority.matches('[').count();
    let closes = authority.matches(']').count();
    if opens == 0 && closes == 0 {
        return Ok(());
    }
    let malformed = || RequestError::Invalid(format!("malformed IPv6 literal `{authority}`"));
    if opens != 1 || closes != 1 {
        return Err(malformed());
    }
    let open = authority.find('[').unwrap_or(0);
    let close = authority.find(']').unwrap_or(0);
    if open != 0 || close < open {
        return Err(malformed());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_detection() {
        assert_eq!(scheme_of("https://example.org"), Some("https"));
        assert_eq!(scheme_of("mailto:someone"), Some("mailto"));
        assert_eq!(scheme_of("localhost"), None);
        assert_eq!(scheme_of("localhost/path"), None);
        assert_eq!(scheme_of("//no-scheme"), None);
    }

    #[test]
    fn bracket_sanity() {
        assert!(check_brackets("[::1]").is_ok());
        assert!(check_brackets("[::1]:1965").is_ok());
        assert!(check_brackets("localhost").is_ok());
        for bad in ["]::1[", "::1[", "[::1", "::1]", "[[::1]", "[::1]]"] {
            assert!(check_brackets(bad).is_err(), "{bad} accepted");
        }
    }
}
