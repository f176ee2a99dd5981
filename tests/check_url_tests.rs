use std::net::IpAddr;

use castor::error::RequestError;
use castor::request::check_url;
use castor::tls::ServerIdentity;

const PORT: u16 = 1965;

fn localhost_identity() -> ServerIdentity {
    ServerIdentity::from_entries(
        &["localhost"],
        &["127.0.0.1".parse::<IpAddr>().unwrap()],
    )
}

fn loopback_identity() -> ServerIdentity {
    ServerIdentity::from_entries(
        &["localhost"],
        &[
            "::1".parse::<IpAddr>().unwrap(),
            "127.0.0.1".parse::<IpAddr>().unwrap(),
        ],
    )
}

#[test]
fn accepts_root_url_forms() {
    for raw in [
        "gemini://localhost\r\n",
        "gemini://localhost/\r\n",
        "gemini://localhost:1965\r\n",
        "gemini://localhost:1965/\r\n",
    ] {
        let req = check_url(raw, PORT, None).unwrap();
        assert_eq!(req.host, "localhost");
        assert_eq!(req.port, PORT);
    }
}

#[test]
fn rejects_lines_without_crlf() {
    for raw in [
        "gemini://localhost\n",
        "gemini://localhost\r",
        "gemini://localhost",
    ] {
        assert_eq!(
            check_url(raw, PORT, None).unwrap_err(),
            RequestError::Unterminated,
            "{raw:?}"
        );
    }
}

#[test]
fn classifies_missing_and_foreign_schemes() {
    assert_eq!(
        check_url("localhost\r\n", PORT, None).unwrap_err(),
        RequestError::BadRequest
    );
    assert_eq!(
        check_url("https://localhost\r\n", PORT, None).unwrap_err(),
        RequestError::ProxyRefused
    );
}

#[test]
fn checks_hostnames_against_certificate_entries() {
    let identity = localhost_identity();
    for raw in [
        "gemini://localhost/\r\n",
        "gemini://localhost\r\n",
        "gemini://127.0.0.1/\r\n",
        "gemini://127.0.0.1\r\n",
    ] {
        assert!(check_url(raw, PORT, Some(&identity)).is_ok(), "{raw:?}");
    }

    assert_eq!(
        check_url("gemini://wikipedia.org\r\n", PORT, Some(&identity)).unwrap_err(),
        RequestError::CertificateMismatch("wikipedia.org".to_string())
    );
}

#[test]
fn handles_ipv6_literals() {
    let identity = loopback_identity();
    assert!(check_url("gemini://[::1]\r\n", PORT, Some(&identity)).is_ok());
    assert!(check_url("gemini://[::1]:1965\r\n", PORT, Some(&identity)).is_ok());
    assert!(check_url("gemini://[::1]:1975\r\n", 1975, Some(&identity)).is_ok());

    let req = check_url("gemini://[::1]\r\n", PORT, Some(&identity)).unwrap();
    assert_eq!(req.host, "::1");
}

#[test]
fn rejects_malformed_ipv6_brackets() {
    let identity = loopback_identity();
    for raw in [
        "gemini://]::1[\r\n",
        "gemini://::1[\r\n",
        "gemini://[::1\r\n",
        "gemini://::1]\r\n",
        "gemini://[[::1]\r\n",
        "gemini://[::1]]\r\n",
    ] {
        assert!(
            matches!(
                check_url(raw, PORT, Some(&identity)),
                Err(RequestError::Invalid(_))
            ),
            "{raw:?}"
        );
    }
}

#[test]
fn rejects_unusable_ports() {
    let identity = loopback_identity();
    for raw in ["gemini://[::1]:-1965\r\n", "gemini://[::1]:0\r\n"] {
        assert!(
            matches!(
                check_url(raw, PORT, Some(&identity)),
                Err(RequestError::Invalid(_))
            ),
            "{raw:?}"
        );
    }
}

#[test]
fn refuses_foreign_ports() {
    assert_eq!(
        check_url("gemini://localhost:1968\r\n", PORT, None).unwrap_err(),
        RequestError::ProxyRefused
    );
}

#[test]
fn enforces_the_1024_byte_limit() {
    let padding = 1024 - "gemini://localhost".len();
    let host = format!("localhost{}", "0".repeat(padding));
    let identity = ServerIdentity::from_entries(&[host.as_str()], &[]);

    let raw = format!("gemini://{host}\r\n");
    assert_eq!(raw.trim().len(), 1024);
    assert!(check_url(&raw, PORT, Some(&identity)).is_ok());

    let raw = format!("gemini://{host}0\r\n");
    assert_eq!(
        check_url(&raw, PORT, None).unwrap_err(),
        RequestError::BadRequest
    );
}

#[test]
fn keeps_queries_intact() {
    for raw in [
        "gemini://localhost?\r\n",
        "gemini://localhost?hello\r\n",
        "gemini://localhost?hello+world\r\n",
        "gemini://localhost?hello%20world\r\n",
    ] {
        assert!(check_url(raw, PORT, None).is_ok(), "{raw:?}");
    }

    let req = check_url("gemini://localhost/page?hello\r\n", PORT, None).unwrap();
    assert_eq!(req.path, "/page");
    assert_eq!(req.query.as_deref(), Some("hello"));
}
