//! Worker side of delegation.

use std::path::{Path, PathBuf};

use tokio::net::UnixStream;

use crate::worker::protocol::{
    worker_handshake, ProtocolError, HANDSHAKE_TIMEOUT, IPC_SOCKET_ENV, PARENT_PID_ENV,
};

/// The parent's IPC socket, when this process was spawned as a worker.
pub fn ipc_socket_from_env() -> Option<PathBuf> {
    std::env::var_os(PARENT_PID_ENV)?;
    std::env::var_os(IPC_SOCKET_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Connect to the parent, receive the arguments and run the extension command.
pub async fn run(socket: &Path) -> Result<i32, ProtocolError> {
    let stream = UnixStream::connect(socket).await?;
    let cli = worker_handshake(stream, HANDSHAKE_TIMEOUT).await?;
    tracing::debug!(parent = ?std::env::var(PARENT_PID_ENV).ok(), "Arguments received");
    Ok(crate::extensions::execute(&cli))
}
