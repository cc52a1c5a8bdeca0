//! Parent/worker message protocol.
//!
//! Newline-delimited JSON over a Unix socket. The worker speaks first with
//! `ready`; the parent answers with exactly one `cli` and closes its side.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::time::{timeout_at, Instant};

use crate::net::ListenerError;

/// Set on the worker: the parent's process ID.
pub const PARENT_PID_ENV: &str = "DEV_SERVER_PARENT_PID";
/// Set on the worker: path of the parent's IPC socket.
pub const IPC_SOCKET_ENV: &str = "DEV_SERVER_IPC_SOCKET";

/// Time allowed from spawn until the first message.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest line either side will read.
const MAX_LINE: u64 = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerMessage {
    Ready,
    Cli { args: crate::cli::Cli },
}

impl WorkerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerMessage::Ready => "ready",
            WorkerMessage::Cli { .. } => "cli",
        }
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("expected a {expected} message, got {got}")]
    UnexpectedMessage { expected: &'static str, got: &'static str },

    #[error("malformed message {line:?}: {source}")]
    Malformed {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no message within {0:?}")]
    Timeout(Duration),

    #[error("connection closed before a message arrived")]
    Closed,

    #[error("worker exited before the handshake completed (code {0:?})")]
    ExitedEarly(Option<i32>),

    #[error("failed to spawn worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error(transparent)]
    Listen(#[from] ListenerError),

    #[error("IPC I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn encode(message: &WorkerMessage) -> Result<Vec<u8>, ProtocolError> {
    let mut bytes = serde_json::to_vec(message).map_err(|source| ProtocolError::Malformed {
        line: message.kind().to_string(),
        source,
    })?;
    bytes.push(b'\n');
    Ok(bytes)
}

pub fn decode(line: &str) -> Result<WorkerMessage, ProtocolError> {
    serde_json::from_str(line.trim_end()).map_err(|source| ProtocolError::Malformed {
        line: line.trim_end().to_string(),
        source,
    })
}

/// Read one message, failing on EOF or when `deadline` passes.
pub async fn read_message<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    deadline: Instant,
    budget: Duration,
) -> Result<WorkerMessage, ProtocolError> {
    let mut line = String::new();
    let read = timeout_at(deadline, (&mut *reader).take(MAX_LINE).read_line(&mut line))
        .await
        .map_err(|_| ProtocolError::Timeout(budget))??;
    if read == 0 {
        return Err(ProtocolError::Closed);
    }
    decode(&line)
}

pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: &WorkerMessage,
) -> Result<(), ProtocolError> {
    writer.write_all(&encode(message)?).await?;
    writer.flush().await?;
    Ok(())
}

/// Parent side: wait for `ready`, then send the arguments and close.
///
/// Nothing is written unless the first message is `ready`.
pub async fn parent_handshake<S: AsyncRead + AsyncWrite + Unpin>(
    stream: S,
    args: &crate::cli::Cli,
    deadline: Instant,
    budget: Duration,
) -> Result<(), ProtocolError> {
    let (read, mut write) = tokio::io::split(stream);
    let mut reader = BufReader::new(read);

    match read_message(&mut reader, deadline, budget).await? {
        WorkerMessage::Ready => {}
        other => {
            return Err(ProtocolError::UnexpectedMessage {
                expected: "ready",
                got: other.kind(),
            })
        }
    }
    tracing::debug!("Worker ready");

    let cli = WorkerMessage::Cli { args: args.clone() };
    write_message(&mut write, &cli).await?;
    write.shutdown().await?;
    Ok(())
}

/// Worker side: announce readiness and receive the arguments.
pub async fn worker_handshake<S: AsyncRead + AsyncWrite + Unpin>(
    stream: S,
    budget: Duration,
) -> Result<crate::cli::Cli, ProtocolError> {
    let (read, mut write) = tokio::io::split(stream);
    let mut reader = BufReader::new(read);

    write_message(&mut write, &WorkerMessage::Ready).await?;
    match read_message(&mut reader, Instant::now() + budget, budget).await? {
        WorkerMessage::Cli { args } => Ok(args),
        other => Err(ProtocolError::UnexpectedMessage {
            expected: "cli",
            got: other.kind(),
        }),
    }
}
