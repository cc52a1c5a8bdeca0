//! Loopback SSH listener.
//!
//! # Responsibilities
//! - Bind `127.0.0.1:0` and report the chosen port
//! - Exchange identification lines with each client
//! - Expose port and host key at `/ssh`
//!
//! Key exchange and channel framing happen elsewhere; a connection here ends
//! after the identification exchange.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::http::Provider;
use crate::net::listener::{bind_tcp, ListenerError};

/// How long a client gets to send its identification line.
const IDENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest identification line accepted, CR LF included.
const MAX_IDENT_LEN: usize = 255;

#[derive(Debug, Clone, Serialize)]
pub struct SshInfo {
    pub port: Option<u16>,
    pub host_key: PathBuf,
}

/// SSH server state, also registered as the `/ssh` provider.
pub struct SshProvider {
    host_key: PathBuf,
    banner: String,
    port: Mutex<Option<u16>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SshProvider {
    pub fn new(host_key: PathBuf) -> Self {
        Self {
            host_key,
            banner: format!("SSH-2.0-dev_server_{}", env!("CARGO_PKG_VERSION")),
            port: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    pub fn host_key(&self) -> &Path {
        &self.host_key
    }

    pub fn port(&self) -> Option<u16> {
        self.port.lock().ok().and_then(|p| *p)
    }

    pub fn info(&self) -> SshInfo {
        SshInfo {
            port: self.port(),
            host_key: self.host_key.clone(),
        }
    }

    /// Bind on loopback with an ephemeral port and start accepting.
    pub async fn listen(&self) -> Result<u16, ListenerError> {
        let listener = bind_tcp("127.0.0.1", 0).await?;
        let addr = listener.local_addr().map_err(|source| ListenerError::Bind {
            address: "127.0.0.1:0".to_string(),
            source,
        })?;

        let task = tokio::spawn(accept_loop(listener, self.banner.clone()));
        if let Ok(mut slot) = self.task.lock() {
            if let Some(previous) = slot.replace(task) {
                previous.abort();
            }
        }
        if let Ok(mut slot) = self.port.lock() {
            *slot = Some(addr.port());
        }

        tracing::info!(port = addr.port(), "SSH server started");
        Ok(addr.port())
    }

    /// Stop accepting connections.
    pub fn stop(&self) {
        let task = self.task.lock().ok().and_then(|mut t| t.take());
        if let Some(task) = task {
            task.abort();
            tracing::info!("SSH server stopped");
        }
    }
}

impl Provider for SshProvider {
    fn name(&self) -> &'static str {
        "ssh"
    }

    fn router(self: Arc<Self>) -> Router {
        Router::new().route("/", get(info)).with_state(self)
    }

    fn dispose(&self) {
        self.stop();
    }
}

async fn info(State(ssh): State<Arc<SshProvider>>) -> Json<SshInfo> {
    Json(ssh.info())
}

async fn accept_loop(listener: TcpListener, banner: String) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let banner = banner.clone();
                tokio::spawn(async move {
                    if let Err(e) = identify(stream, peer, &banner).await {
                        tracing::debug!(peer = %peer, error = %e, "SSH connection closed");
                    }
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "SSH accept failed");
            }
        }
    }
}

/// Send our identification line and read the client's.
async fn identify(stream: TcpStream, peer: SocketAddr, banner: &str) -> std::io::Result<String> {
    let (read, mut write) = stream.into_split();
    write.write_all(format!("{}\r\n", banner).as_bytes()).await?;

    let mut reader = BufReader::new(read).take(MAX_IDENT_LEN as u64);
    let mut line = String::new();
    match tokio::time::timeout(IDENT_TIMEOUT, reader.read_line(&mut line)).await {
        Ok(read) => {
            read?;
        }
        Err(_) => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "no identification from client",
            ))
        }
    }

    let ident = line.trim_end().to_string();
    if !ident.starts_with("SSH-2.0-") {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("unsupported identification: {:?}", ident),
        ));
    }
    tracing::debug!(peer = %peer, client = %ident, "SSH client identified");
    write.shutdown().await?;
    Ok(ident)
}
