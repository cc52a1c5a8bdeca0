//! Startup orchestration.
//!
//! # Responsibilities
//! - Register the HTTP providers in their fixed order
//! - Provision and start SSH, tolerating its failure
//! - Bind the HTTP server last
//! - Render the startup summary
//!
//! # Design Decisions
//! - Credentials are complete before anything here runs
//! - Registration order is fixed and determines log order
//! - Only an HTTP failure is fatal

use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::Cli;
use crate::config::{AuthMode, ConfigFile, ServerOptions};
use crate::credentials::{Credentials, PasswordSource};
use crate::error::{BootstrapError, ProvisionError};
use crate::http::HttpServer;
use crate::net::ListenAddress;
use crate::providers::update::DEFAULT_UPDATE_URL;
use crate::providers::{
    ApiProvider, DashboardProvider, LoginProvider, RootProvider, StaticProvider, UpdateProvider,
};
use crate::ssh::{HostKeyGenerator, SshProvider};

/// Listener inputs that are not part of `ServerOptions`.
#[derive(Debug, Clone)]
pub struct ListenerSettings {
    pub disable_ssh: bool,
    pub ssh_host_key: Option<PathBuf>,
    pub disable_updates: bool,
    pub user_data_dir: PathBuf,
    pub update_url: String,
}

impl ListenerSettings {
    pub fn from_cli(cli: &Cli, file: &ConfigFile) -> Self {
        Self {
            disable_ssh: cli.disable_ssh || file.disable_ssh,
            ssh_host_key: cli.ssh_host_key.clone(),
            disable_updates: cli.disable_updates || file.disable_updates,
            user_data_dir: cli.user_data_dir(),
            update_url: DEFAULT_UPDATE_URL.to_string(),
        }
    }
}

/// Everything that is running once startup succeeds.
pub struct Listeners {
    pub server: Arc<HttpServer>,
    pub http: ListenAddress,
    pub ssh_port: Option<u16>,
    pub updates_enabled: bool,
}

/// Register providers, start SSH if possible, then bind HTTP.
pub async fn start_listeners<G: HostKeyGenerator>(
    options: Arc<ServerOptions>,
    settings: &ListenerSettings,
    keygen: &G,
) -> Result<Listeners, BootstrapError> {
    let updates_enabled = !settings.disable_updates;
    let mut server = HttpServer::new(options.clone());

    server.register("/", RootProvider::new(options.clone()))?;
    let api = server.register("/api", ApiProvider::new())?;
    let update = server.register(
        "/update",
        UpdateProvider::new(updates_enabled, options.version(), settings.update_url.clone()),
    )?;
    server.register("/login", LoginProvider::new(options.clone()))?;
    server.register("/static", StaticProvider::new(&settings.user_data_dir))?;
    server.register("/dashboard", DashboardProvider::new(api, update))?;

    let ssh_port = if settings.disable_ssh {
        tracing::debug!("SSH disabled by flag");
        None
    } else {
        start_ssh(&mut server, settings, keygen).await
    };

    let server = Arc::new(server);
    let http = match server.listen().await {
        Ok(address) => address,
        Err(e) => {
            server.dispose().await;
            return Err(e);
        }
    };

    Ok(Listeners {
        server,
        http,
        ssh_port,
        updates_enabled,
    })
}

async fn start_ssh<G: HostKeyGenerator>(
    server: &mut HttpServer,
    settings: &ListenerSettings,
    keygen: &G,
) -> Option<u16> {
    let host_key = match &settings.ssh_host_key {
        Some(path) => path.clone(),
        None => match keygen.generate(&settings.user_data_dir).await {
            Ok(path) => path,
            Err(e) => {
                tracing::error!(error = %e, "SSH host key generation failed, SSH disabled");
                return None;
            }
        },
    };

    let ssh = match server.register("/ssh", SshProvider::new(host_key)) {
        Ok(ssh) => ssh,
        Err(e) => {
            tracing::error!(error = %e, "SSH provider registration failed, SSH disabled");
            return None;
        }
    };

    match ssh.listen().await {
        Ok(port) => Some(port),
        Err(e) => {
            tracing::error!(error = %e, "SSH server failed to start, SSH disabled");
            None
        }
    }
}

/// Inputs for the startup summary.
#[derive(Debug, Clone)]
pub struct StartupReport {
    pub http: ListenAddress,
    pub auth: AuthMode,
    pub password: Option<String>,
    pub password_source: PasswordSource,
    pub https: Option<bool>,
    pub updates_enabled: bool,
    pub ssh_port: Option<u16>,
    pub opened: Option<String>,
}

impl StartupReport {
    pub fn new(credentials: &Credentials, listeners: &Listeners) -> Self {
        Self {
            http: listeners.http.clone(),
            auth: credentials.options.auth(),
            password: credentials.password.clone(),
            password_source: credentials.password_source,
            https: credentials.options.tls().map(|tls| tls.generated),
            updates_enabled: listeners.updates_enabled,
            ssh_port: listeners.ssh_port,
            opened: None,
        }
    }

    pub fn opened(mut self, url: impl Into<String>) -> Self {
        self.opened = Some(url.into());
        self
    }
}

/// Human-readable startup lines. The plaintext password appears at most
/// once, and only when it was generated for this run.
pub fn summary_lines(report: &StartupReport) -> Vec<String> {
    let mut lines = Vec::new();

    let address = match &report.http {
        ListenAddress::Tcp(addr) => {
            let scheme = if report.https.is_some() { "https" } else { "http" };
            format!("{}://{}", scheme, addr)
        }
        ListenAddress::Unix(path) => path.display().to_string(),
    };
    lines.push(format!("HTTP server listening on {}", address));

    match (report.auth, report.password_source, &report.password) {
        (AuthMode::None, _, _) => lines.push("  - No authentication".to_string()),
        (AuthMode::Password, PasswordSource::Generated, Some(password)) => {
            lines.push(format!("  - Password is {}", password));
            lines.push(
                "    - To use your own password set the PASSWORD environment variable".to_string(),
            );
        }
        (AuthMode::Password, _, _) => {
            lines.push("  - Using custom password for authentication".to_string())
        }
    }

    lines.push(
        match report.https {
            Some(true) => "  - Using generated certificate and key for HTTPS",
            Some(false) => "  - Using provided certificate and key for HTTPS",
            None => "  - Not serving HTTPS",
        }
        .to_string(),
    );

    lines.push(format!(
        "  - Automatic updates are {}",
        if report.updates_enabled { "enabled" } else { "disabled" }
    ));

    lines.push(match report.ssh_port {
        Some(port) => format!("  - SSH server listening on localhost:{}", port),
        None => "  - SSH server disabled".to_string(),
    });

    if let Some(url) = &report.opened {
        lines.push(format!("  - Opened {}", url));
    }
    lines
}

/// Open `url` with the platform's default handler.
pub async fn open_url(url: &str) -> Result<(), ProvisionError> {
    let program = if cfg!(target_os = "macos") { "open" } else { "xdg-open" };
    crate::credentials::tool::run_tool(program, &[url]).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> StartupReport {
        StartupReport {
            http: ListenAddress::Tcp("127.0.0.1:8080".parse().unwrap()),
            auth: AuthMode::Password,
            password: Some("0123456789abcdef01234567".to_string()),
            password_source: PasswordSource::Generated,
            https: None,
            updates_enabled: true,
            ssh_port: Some(2222),
            opened: None,
        }
    }

    #[test]
    fn generated_password_is_printed_once() {
        let lines = summary_lines(&report());
        assert_eq!(lines[0], "HTTP server listening on http://127.0.0.1:8080");
        assert_eq!(
            lines.iter().filter(|l| l.contains("0123456789abcdef01234567")).count(),
            1
        );
        assert!(lines.contains(&"  - Password is 0123456789abcdef01234567".to_string()));
        assert!(lines.contains(&"  - Not serving HTTPS".to_string()));
        assert!(lines.contains(&"  - Automatic updates are enabled".to_string()));
        assert!(lines.contains(&"  - SSH server listening on localhost:2222".to_string()));
    }

    #[test]
    fn supplied_password_is_never_printed() {
        let mut r = report();
        r.password = Some("hunter2".to_string());
        r.password_source = PasswordSource::Environment;
        let lines = summary_lines(&r);
        assert!(lines.iter().all(|l| !l.contains("hunter2")));
        assert!(lines.contains(&"  - Using custom password for authentication".to_string()));
    }

    #[test]
    fn https_ssh_and_open_variants() {
        let mut r = report();
        r.auth = AuthMode::None;
        r.password = None;
        r.password_source = PasswordSource::NotRequired;
        r.https = Some(true);
        r.ssh_port = None;
        r.updates_enabled = false;
        let r = r.opened("https://localhost:8080");
        let lines = summary_lines(&r);

        assert_eq!(lines[0], "HTTP server listening on https://127.0.0.1:8080");
        assert!(lines.contains(&"  - No authentication".to_string()));
        assert!(lines.contains(&"  - Using generated certificate and key for HTTPS".to_string()));
        assert!(lines.contains(&"  - Automatic updates are disabled".to_string()));
        assert!(lines.contains(&"  - SSH server disabled".to_string()));
        assert_eq!(lines.last().unwrap(), "  - Opened https://localhost:8080");
    }

    #[test]
    fn socket_address_is_a_path() {
        let mut r = report();
        r.http = ListenAddress::Unix(PathBuf::from("/tmp/dev.sock"));
        assert_eq!(summary_lines(&r)[0], "HTTP server listening on /tmp/dev.sock");
    }
}
