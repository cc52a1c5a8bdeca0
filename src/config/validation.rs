//! Configuration validation.
//!
//! # Responsibilities
//! - Enforce the certificate / certificate-key pairing
//! - Reject endpoint combinations the server cannot honor
//! - Parse environment-supplied values that have no serde layer
//!
//! # Design Decisions
//! - Validation is a set of pure functions, no I/O
//! - Runs before any listener is constructed

use std::path::Path;

use crate::config::loader::ConfigError;
use crate::config::schema::Endpoint;

/// Check that a certificate always comes with a key.
///
/// A key without a certificate is ignored rather than rejected.
pub fn validate_tls_pair<'a>(
    cert: Option<&'a Path>,
    key: Option<&'a Path>,
) -> Result<Option<(&'a Path, &'a Path)>, ConfigError> {
    match (cert, key) {
        (Some(cert), Some(key)) => Ok(Some((cert, key))),
        (Some(cert), None) => Err(ConfigError::CertificateWithoutKey {
            cert: cert.to_path_buf(),
        }),
        (None, _) => Ok(None),
    }
}

/// HTTPS is only served over TCP.
pub fn validate_endpoint(endpoint: &Endpoint, tls: bool) -> Result<(), ConfigError> {
    match endpoint {
        Endpoint::Socket(path) if tls => Err(ConfigError::SocketWithTls { socket: path.clone() }),
        Endpoint::Socket(path) if path.as_os_str().is_empty() => Err(ConfigError::EmptySocketPath),
        _ => Ok(()),
    }
}

/// Parse the `PORT` environment variable.
pub fn parse_env_port(raw: &str) -> Result<u16, ConfigError> {
    raw.trim()
        .parse::<u16>()
        .map_err(|_| ConfigError::InvalidPort(raw.to_string()))
}
