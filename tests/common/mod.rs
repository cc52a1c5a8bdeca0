//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use dev_server::config::{AuthMode, Endpoint, ServerOptions};
use dev_server::credentials::hash_password;
use dev_server::error::ProvisionError;
use dev_server::lifecycle::ListenerSettings;
use dev_server::ssh::HostKeyGenerator;

/// Path of the compiled server binary.
pub fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_dev-server")
}

/// Options for a server on an ephemeral loopback port.
pub fn options(auth: AuthMode, password: Option<&str>) -> Arc<ServerOptions> {
    let mut builder = ServerOptions::builder(auth)
        .host("127.0.0.1")
        .endpoint(Endpoint::Tcp { port: 0 });
    if let Some(password) = password {
        builder = builder.hashed_password(hash_password(password));
    }
    Arc::new(builder.build().unwrap())
}

pub fn settings(user_data_dir: &Path, disable_ssh: bool) -> ListenerSettings {
    ListenerSettings {
        disable_ssh,
        ssh_host_key: None,
        disable_updates: true,
        user_data_dir: user_data_dir.to_path_buf(),
        update_url: "http://127.0.0.1:1/unreachable".to_string(),
    }
}

/// HTTP client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Host key generator that counts calls and can be told to fail.
#[derive(Default)]
pub struct FakeKeygen {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl FakeKeygen {
    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HostKeyGenerator for FakeKeygen {
    async fn generate(&self, dir: &Path) -> Result<PathBuf, ProvisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProvisionError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "ssh-keygen unavailable",
            )));
        }
        Ok(dir.join("ssh").join("host_key"))
    }
}

/// Create an extension source directory with a manifest.
pub fn write_extension(dir: &Path, id: &str, version: &str) -> PathBuf {
    let src = dir.join(format!("src-{}", id));
    std::fs::create_dir_all(&src).unwrap();
    std::fs::write(
        src.join("extension.json"),
        format!(r#"{{"id":"{}","version":"{}"}}"#, id, version),
    )
    .unwrap();
    src
}

/// A server binary running in the background with its stderr captured.
pub struct ServerProcess {
    child: Child,
    lines: mpsc::Receiver<String>,
    output: Vec<String>,
}

impl ServerProcess {
    pub fn spawn(mut command: Command) -> Self {
        let mut child = command
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        let stderr = child.stderr.take().unwrap();
        let (tx, lines) = mpsc::channel();
        std::thread::spawn(move || {
            for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        Self {
            child,
            lines,
            output: Vec::new(),
        }
    }

    /// Collect stderr until a line contains `needle`.
    pub fn wait_for(&mut self, needle: &str) {
        let deadline = Instant::now() + Duration::from_secs(30);
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.lines.recv_timeout(remaining) {
                Ok(line) => {
                    let found = line.contains(needle);
                    self.output.push(line);
                    if found {
                        return;
                    }
                }
                Err(e) => panic!("no line containing {:?} ({}): {:#?}", needle, e, self.output),
            }
        }
    }

    /// Send SIGTERM, wait for exit and return the status with all of stderr.
    pub fn terminate(mut self) -> (ExitStatus, Vec<String>) {
        let kill = Command::new("kill")
            .args(["-TERM", &self.child.id().to_string()])
            .status()
            .unwrap();
        assert!(kill.success());
        let status = self.child.wait().unwrap();
        let mut output = std::mem::take(&mut self.output);
        output.extend(self.lines.iter());
        (status, output)
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Command for the server on an ephemeral port with SSH off and no
/// inherited configuration.
pub fn server_command(user_data_dir: &Path) -> Command {
    let mut command = Command::new(bin());
    command
        .args(["--port", "0", "--disable-ssh", "--disable-updates"])
        .arg("--user-data-dir")
        .arg(user_data_dir)
        .env_remove("PASSWORD")
        .env_remove("PORT")
        .env_remove("DEV_SERVER_CONFIG")
        .env_remove("RUST_LOG")
        .env_remove("DEV_SERVER_PARENT_PID")
        .env_remove("DEV_SERVER_IPC_SOCKET");
    command
}
