//! Socket binding for the HTTP and SSH listeners.
//!
//! # Responsibilities
//! - Bind to the resolved host:port or Unix socket path
//! - Report the effective address after the bind
//! - Clean up stale socket files before binding, never other files

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

use tokio::net::{TcpListener, UnixListener};

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to a TCP address.
    Bind { address: String, source: std::io::Error },
    /// Failed to bind a Unix socket.
    BindSocket { path: PathBuf, source: std::io::Error },
}

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerError::Bind { address, source } => {
                write!(f, "Failed to bind {}: {}", address, source)
            }
            ListenerError::BindSocket { path, source } => {
                write!(f, "Failed to bind socket {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Bind { source, .. } | ListenerError::BindSocket { source, .. } => {
                Some(source)
            }
        }
    }
}

/// Address a listener ended up bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenAddress {
    Tcp(SocketAddr),
    Unix(PathBuf),
}

impl ListenAddress {
    pub fn port(&self) -> Option<u16> {
        match self {
            ListenAddress::Tcp(addr) => Some(addr.port()),
            ListenAddress::Unix(_) => None,
        }
    }

    /// URL for a browser, using `localhost` for wildcard binds.
    pub fn url(&self, https: bool) -> Option<String> {
        let ListenAddress::Tcp(addr) = self else {
            return None;
        };
        let scheme = if https { "https" } else { "http" };
        let host = if addr.ip().is_unspecified() || addr.ip().is_loopback() {
            "localhost".to_string()
        } else {
            addr.ip().to_string()
        };
        Some(format!("{}://{}:{}", scheme, host, addr.port()))
    }
}

impl fmt::Display for ListenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenAddress::Tcp(addr) => write!(f, "{}", addr),
            ListenAddress::Unix(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Bind a TCP listener on `host:port`.
pub async fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let bind_error = |source| ListenerError::Bind {
        address: format!("{}:{}", host, port),
        source,
    };
    let listener = TcpListener::bind((host, port)).await.map_err(bind_error)?;

    let local_addr = listener.local_addr().map_err(bind_error)?;
    tracing::debug!(address = %local_addr, "Listener bound");
    Ok(listener)
}

/// Bind a Unix socket, replacing a stale socket file left by a previous run.
///
/// Anything at `path` that is not a socket is left alone and the bind fails.
pub fn bind_unix(path: &Path) -> Result<UnixListener, ListenerError> {
    let bind_error = |source| ListenerError::BindSocket {
        path: path.to_path_buf(),
        source,
    };

    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => {
            std::fs::remove_file(path).map_err(bind_error)?;
        }
        Ok(_) => {
            return Err(bind_error(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "path exists and is not a socket",
            )));
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(bind_error(e)),
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(bind_error)?;
    }

    let listener = UnixListener::bind(path).map_err(bind_error)?;
    tracing::debug!(path = %path.display(), "Socket bound");
    Ok(listener)
}
