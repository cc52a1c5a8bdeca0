//! Parent side of worker delegation.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::net::UnixListener;
use tokio::process::{Child, Command};
use tokio::time::{timeout_at, Instant};
use uuid::Uuid;

use crate::cli::Cli;
use crate::net::listener::bind_unix;
use crate::worker::protocol::{
    parent_handshake, ProtocolError, HANDSHAKE_TIMEOUT, IPC_SOCKET_ENV, PARENT_PID_ENV,
};

/// Spawns a worker, hands it the arguments and reports its exit code.
#[derive(Debug, Clone)]
pub struct WorkerDelegate {
    program: PathBuf,
    args: Vec<OsString>,
    socket_dir: PathBuf,
    timeout: Duration,
}

impl WorkerDelegate {
    pub fn new(program: impl Into<PathBuf>, args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            args,
            socket_dir: std::env::temp_dir(),
            timeout: HANDSHAKE_TIMEOUT,
        }
    }

    /// Re-run this executable with the same arguments.
    pub fn for_current_process() -> std::io::Result<Self> {
        let program = std::env::current_exe()?;
        Ok(Self::new(program, std::env::args_os().skip(1).collect()))
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn socket_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.socket_dir = dir.into();
        self
    }

    /// Run the worker to completion and return its exit code.
    ///
    /// Any failure before the arguments are delivered kills the worker.
    pub async fn run(&self, cli: &Cli) -> Result<i32, ProtocolError> {
        let socket = SocketFile(
            self.socket_dir
                .join(format!("dev-server-ipc-{}.sock", Uuid::new_v4())),
        );
        let listener = bind_unix(socket.path())?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env(PARENT_PID_ENV, std::process::id().to_string())
            .env(IPC_SOCKET_ENV, socket.path())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(ProtocolError::Spawn)?;
        tracing::debug!(pid = ?child.id(), program = %self.program.display(), "Worker spawned");

        let outcome = tokio::select! {
            result = accept_and_handshake(&listener, cli, self.timeout) => result,
            status = child.wait() => Err(ProtocolError::ExitedEarly(
                status.ok().and_then(|s| s.code()),
            )),
        };
        if let Err(e) = outcome {
            stop(&mut child).await;
            return Err(e);
        }

        let status = child.wait().await?;
        tracing::debug!(status = %status, "Worker exited");
        Ok(status.code().unwrap_or(0))
    }
}

/// The whole exchange, from accept to `cli` sent, shares one deadline.
async fn accept_and_handshake(
    listener: &UnixListener,
    cli: &Cli,
    budget: Duration,
) -> Result<(), ProtocolError> {
    let deadline = Instant::now() + budget;
    let (stream, _) = timeout_at(deadline, listener.accept())
        .await
        .map_err(|_| ProtocolError::Timeout(budget))??;
    parent_handshake(stream, cli, deadline, budget).await
}

async fn stop(child: &mut Child) {
    if let Err(e) = child.kill().await {
        tracing::debug!(error = %e, "Worker already gone");
    }
}

/// Removes the socket file when dropped.
struct SocketFile(PathBuf);

impl SocketFile {
    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for SocketFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str) -> WorkerDelegate {
        WorkerDelegate::new("sh", vec!["-c".into(), script.into()])
    }

    #[tokio::test]
    async fn worker_exiting_before_ready_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = shell("exit 3").socket_dir(dir.path()).run(&Cli::default()).await;
        assert!(matches!(result, Err(ProtocolError::ExitedEarly(Some(3)))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn silent_worker_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let result = shell("sleep 5")
            .socket_dir(dir.path())
            .timeout(Duration::from_millis(100))
            .run(&Cli::default())
            .await;
        assert!(matches!(result, Err(ProtocolError::Timeout(_))));
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = WorkerDelegate::new("/nonexistent/dev-server", Vec::new())
            .socket_dir(dir.path())
            .run(&Cli::default())
            .await;
        assert!(matches!(result, Err(ProtocolError::Spawn(_))));
    }
}
