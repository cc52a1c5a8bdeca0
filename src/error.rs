//! Error types shared across the bootstrap pipeline.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::config::ConfigError;
use crate::http::server::RegistrationError;
use crate::lifecycle::shutdown::ShutdownError;
use crate::net::listener::ListenerError;
use crate::net::tls::TlsError;
use crate::worker::protocol::ProtocolError;

/// Failures of the external generators (openssl, ssh-keygen).
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: &'static str,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{program} reported success but {path} is missing")]
    MissingOutput {
        program: &'static str,
        path: PathBuf,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything that can end an invocation with a non-zero exit code.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("certificate provisioning failed: {0}")]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error(transparent)]
    Bind(#[from] ListenerError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Shutdown(#[from] ShutdownError),

    #[error("worker handshake failed: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BootstrapError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        1
    }
}
