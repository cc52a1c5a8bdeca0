//! Credential provisioning.
//!
//! # Responsibilities
//! - Decide the effective authentication mode
//! - Obtain or generate the password and store only its hash
//! - Resolve host and port defaults
//! - Resolve or generate the TLS certificate pair
//!
//! # Design Decisions
//! - Runs to completion before any listener is constructed
//! - The plaintext password leaves this module only for the startup summary
//! - The certificate/key invariant is enforced by `ServerOptionsBuilder::build`,
//!   after every resolution step

pub mod certificate;
pub mod password;
pub(crate) mod tool;

use std::path::PathBuf;

use crate::cli::Cli;
use crate::config::validation::parse_env_port;
use crate::config::{AuthMode, ConfigFile, Endpoint, ServerOptions};
use crate::config::schema::DEFAULT_PORT;
use crate::error::BootstrapError;

pub use certificate::{CertificateGenerator, OpensslGenerator};
pub use password::{generate_password, hash_password, verify_password};

/// Environment variables consulted during provisioning.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// `PASSWORD`
    pub password: Option<String>,
    /// `PORT`
    pub port: Option<String>,
}

impl Environment {
    /// Snapshot the process environment. Empty values count as unset.
    pub fn from_process() -> Self {
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            password: non_empty("PASSWORD"),
            port: non_empty("PORT"),
        }
    }
}

/// Where the effective password came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordSource {
    /// Randomly generated for this run; shown once in the startup summary.
    Generated,
    /// `PASSWORD` environment variable.
    Environment,
    /// `password` in the config file.
    ConfigFile,
    /// Authentication is disabled.
    NotRequired,
}

impl PasswordSource {
    pub fn is_external(&self) -> bool {
        matches!(self, PasswordSource::Environment | PasswordSource::ConfigFile)
    }
}

/// Result of provisioning.
#[derive(Debug)]
pub struct Credentials {
    pub options: ServerOptions,
    /// Plaintext password, kept only for the startup summary.
    pub password: Option<String>,
    pub password_source: PasswordSource,
}

/// Resolve a complete, validated `ServerOptions` from the parsed arguments.
pub async fn provision<G: CertificateGenerator>(
    cli: &Cli,
    env: &Environment,
    file: &ConfigFile,
    certs: &G,
) -> Result<Credentials, BootstrapError> {
    let auth = cli.auth.or(file.auth).unwrap_or_default();

    let (password, password_source) = resolve_password(auth, env, file);
    let host = resolve_host(cli, file, auth);
    let endpoint = resolve_endpoint(cli, env, file)?;
    let (cert, cert_key, generated) = resolve_certificate(cli, file, certs).await?;

    let mut builder = ServerOptions::builder(auth)
        .host(host)
        .endpoint(endpoint)
        .cert(cert)
        .cert_key(cert_key)
        .generated_cert(generated);
    if let Some(password) = &password {
        builder = builder.hashed_password(hash_password(password));
    }
    let options = builder.build()?;

    tracing::debug!(
        auth = %options.auth(),
        host = options.host(),
        https = options.tls().is_some(),
        "Credentials provisioned"
    );

    Ok(Credentials {
        options,
        password,
        password_source,
    })
}

fn resolve_password(
    auth: AuthMode,
    env: &Environment,
    file: &ConfigFile,
) -> (Option<String>, PasswordSource) {
    if auth == AuthMode::None {
        return (None, PasswordSource::NotRequired);
    }
    if let Some(password) = &env.password {
        return (Some(password.clone()), PasswordSource::Environment);
    }
    if let Some(password) = file.password.as_ref().filter(|p| !p.is_empty()) {
        return (Some(password.clone()), PasswordSource::ConfigFile);
    }
    (Some(generate_password()), PasswordSource::Generated)
}

/// Explicit host wins. HTTPS with password auth defaults to all interfaces,
/// anything else to localhost.
fn resolve_host(cli: &Cli, file: &ConfigFile, auth: AuthMode) -> String {
    if let Some(host) = cli.host.clone().or_else(|| file.host.clone()) {
        return host;
    }
    if auth == AuthMode::Password && cli.cert_requested() {
        "0.0.0.0".to_string()
    } else {
        "localhost".to_string()
    }
}

fn resolve_endpoint(
    cli: &Cli,
    env: &Environment,
    file: &ConfigFile,
) -> Result<Endpoint, BootstrapError> {
    if let Some(socket) = &cli.socket {
        return Ok(Endpoint::Socket(socket.clone()));
    }
    let port = match (cli.port, env.port.as_deref()) {
        (Some(port), _) => port,
        (None, Some(raw)) => parse_env_port(raw)?,
        (None, None) => file.port.unwrap_or(DEFAULT_PORT),
    };
    Ok(Endpoint::Tcp { port })
}

async fn resolve_certificate<G: CertificateGenerator>(
    cli: &Cli,
    file: &ConfigFile,
    certs: &G,
) -> Result<(Option<PathBuf>, Option<PathBuf>, bool), BootstrapError> {
    let key = cli.cert_key.clone().or_else(|| file.cert_key.clone());
    match &cli.cert {
        Some(Some(cert)) => Ok((Some(cert.clone()), key, false)),
        Some(None) => {
            let (cert, key) = certs.generate(&cli.user_data_dir()).await?;
            Ok((Some(cert), Some(key), true))
        }
        None => Ok((file.cert.clone(), key, false)),
    }
}
