//! TLS context construction and server-certificate identity.

use std::fs::File;
use std::io::BufReader;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use rustls::ServerConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::TlsAcceptor;
use x509_parser::prelude::{FromDer, GeneralName, X509Certificate};

use crate::error::CastorError;

/// The subjectAltName entries of the server certificate, used to decide
/// whether a requested hostname is one of ours.
#[derive(Debug, Clone, Default)]
pub struct ServerIdentity {
    dns_names: Vec<String>,
    ip_addrs: Vec<IpAddr>,
}

impl ServerIdentity {
    /// Extract SAN entries from a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self, CastorError> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| CastorError::CertificateParse(e.to_string()))?;

        let mut identity = Self::default();
        let san = cert
            .subject_alternative_name()
            .map_err(|e| CastorError::CertificateParse(e.to_string()))?;
        if let Some(san) = san {
            for name in &san.value.general_names {
                match name {
                    GeneralName::DNSName(dns) => {
                        identity.dns_names.push(dns.to_ascii_lowercase());
                    }
                    GeneralName::IPAddress(bytes) => {
                        if let Some(ip) = ip_from_bytes(bytes) {
                            identity.ip_addrs.push(ip);
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(identity)
    }

    /// Identity used in tests: explicit DNS names and IP literals.
    pub fn from_entries(dns_names: &[&str], ip_addrs: &[IpAddr]) -> Self {
        Self {
            dns_names: dns_names
                .iter()
                .map(|s| s.to_ascii_lowercase())
                .collect(),
            ip_addrs: ip_addrs.to_vec(),
        }
    }

    /// Whether `host` (brackets already stripped, lowercased) names this
    /// server. IP literals match IP entries; anything else matches DNS
    /// entries case-insensitively.
    pub fn matches(&self, host: &str) -> bool {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return self.ip_addrs.contains(&ip);
        }
        self.dns_names.iter().any(|n| n.eq_ignore_ascii_case(host))
    }
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match *bytes {
        [a, b, c, d] => Some(IpAddr::from([a, b, c, d])),
        _ => <[u8; 16]>::try_from(bytes).ok().map(IpAddr::from),
    }
}

/// Load the certificate chain and private key, build the TLS acceptor and
/// the identity parsed from the leaf certificate.
pub fn build_acceptor(
    certfile: &Path,
    keyfile: &Path,
) -> Result<(TlsAcceptor, ServerIdentity), CastorError> {
    let chain = load_certs(certfile)?;
    let leaf = chain.first().ok_or_else(|| {
        CastorError::ImproperlyConfigured(format!("no certificate in {}", certfile.display()))
    })?;
    let identity = ServerIdentity::from_der(leaf.as_ref())?;

    let key = load_key(keyfile)?;
    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(chain, key)?;
    Ok((TlsAcceptor::from(Arc::new(config)), identity))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, CastorError> {
    let mut reader = BufReader::new(File::open(path)?);
    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(CastorError::Io)
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>, CastorError> {
    let mut reader = BufReader::new(File::open(path)?);
    rustls_pemfile::private_key(&mut reader)
        .map_err(CastorError::Io)?
        .ok_or_else(|| {
            CastorError::ImproperlyConfigured(format!("no private key in {}", path.display()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn matches_dns_names_case_insensitively() {
        let identity = ServerIdentity::from_entries(&["localhost", "Example.ORG"], &[]);
        assert!(identity.matches("localhost"));
        assert!(identity.matches("example.org"));
        assert!(!identity.matches("wikipedia.org"));
    }

    #[test]
    fn matches_ip_entries_by_parsed_value() {
        let identity = ServerIdentity::from_entries(
            &["localhost"],
            &[
                IpAddr::V4(Ipv4Addr::LOCALHOST),
                IpAddr::V6(Ipv6Addr::LOCALHOST),
            ],
        );
        assert!(identity.matches("127.0.0.1"));
        assert!(identity.matches("::1"));
        assert!(identity.matches("0:0:0:0:0:0:0:1"));
        assert!(!identity.matches("192.0.2.1"));
    }
}
