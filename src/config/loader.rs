//! Configuration loading from disk.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::ConfigFile;

/// Configuration errors. All of them are fatal and surface before any bind.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("--cert {cert} was provided without --cert-key")]
    CertificateWithoutKey { cert: PathBuf },

    #[error("--socket {socket} cannot be combined with --cert")]
    SocketWithTls { socket: PathBuf },

    #[error("--socket requires a non-empty path")]
    EmptySocketPath,

    #[error("invalid port {0:?}")]
    InvalidPort(String),

    #[error("password authentication selected but no password was resolved")]
    MissingPassword,
}

/// Load the config file at `path`.
///
/// A file that does not exist yields the defaults.
pub fn load_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(ConfigFile::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let file = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "Config file loaded");
    Ok(file)
}
