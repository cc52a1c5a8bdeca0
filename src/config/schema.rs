//! Configuration schema definitions.
//!
//! `ConfigFile` is the on-disk shape; `ServerOptions` is the resolved value
//! handed to the HTTP server.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::loader::ConfigError;
use crate::config::validation::{validate_endpoint, validate_tls_pair};

/// Default TCP port when nothing else supplies one.
pub const DEFAULT_PORT: u16 = 8080;

/// Authentication mode for the HTTP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Password login; the cookie carries the password hash.
    #[default]
    Password,
    /// No authentication at all.
    None,
}

impl std::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMode::Password => f.write_str("password"),
            AuthMode::None => f.write_str("none"),
        }
    }
}

/// Optional config file contents. Every field may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub auth: Option<AuthMode>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub password: Option<String>,
    pub cert: Option<PathBuf>,
    pub cert_key: Option<PathBuf>,
    pub disable_updates: bool,
    pub disable_ssh: bool,
}

/// Where the HTTP server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// TCP port on the resolved host.
    Tcp { port: u16 },
    /// Filesystem path of a Unix domain socket.
    Socket(PathBuf),
}

/// Certificate and key used for HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPair {
    pub cert: PathBuf,
    pub key: PathBuf,
    /// True when the pair was self-signed at startup.
    pub generated: bool,
}

/// Fully resolved server options.
///
/// Constructed once through [`ServerOptionsBuilder`] and never mutated after
/// being handed to the listener stage.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    auth: AuthMode,
    host: String,
    endpoint: Endpoint,
    hashed_password: Option<String>,
    tls: Option<TlsPair>,
    commit: String,
    version: String,
}

impl ServerOptions {
    pub fn builder(auth: AuthMode) -> ServerOptionsBuilder {
        ServerOptionsBuilder::new(auth)
    }

    pub fn auth(&self) -> AuthMode {
        self.auth
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn hashed_password(&self) -> Option<&str> {
        self.hashed_password.as_deref()
    }

    pub fn tls(&self) -> Option<&TlsPair> {
        self.tls.as_ref()
    }

    pub fn commit(&self) -> &str {
        &self.commit
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

/// Builder that validates the certificate/key invariant before returning.
#[derive(Debug, Clone)]
pub struct ServerOptionsBuilder {
    auth: AuthMode,
    host: String,
    endpoint: Endpoint,
    hashed_password: Option<String>,
    cert: Option<PathBuf>,
    cert_key: Option<PathBuf>,
    cert_generated: bool,
    commit: String,
    version: String,
}

impl ServerOptionsBuilder {
    pub fn new(auth: AuthMode) -> Self {
        Self {
            auth,
            host: "localhost".to_string(),
            endpoint: Endpoint::Tcp { port: DEFAULT_PORT },
            hashed_password: None,
            cert: None,
            cert_key: None,
            cert_generated: false,
            commit: crate::COMMIT.to_string(),
            version: crate::VERSION.to_string(),
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn hashed_password(mut self, hash: impl Into<String>) -> Self {
        self.hashed_password = Some(hash.into());
        self
    }

    pub fn cert(mut self, cert: Option<PathBuf>) -> Self {
        self.cert = cert;
        self
    }

    pub fn cert_key(mut self, key: Option<PathBuf>) -> Self {
        self.cert_key = key;
        self
    }

    /// Mark the certificate pair as self-signed at startup.
    pub fn generated_cert(mut self, generated: bool) -> Self {
        self.cert_generated = generated;
        self
    }

    pub fn commit(mut self, commit: impl Into<String>) -> Self {
        self.commit = commit.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn build(self) -> Result<ServerOptions, ConfigError> {
        let generated = self.cert_generated;
        let tls = validate_tls_pair(self.cert.as_deref(), self.cert_key.as_deref())?.map(
            |(cert, key)| TlsPair {
                cert: cert.to_path_buf(),
                key: key.to_path_buf(),
                generated,
            },
        );
        validate_endpoint(&self.endpoint, tls.is_some())?;

        if self.auth == AuthMode::Password && self.hashed_password.is_none() {
            return Err(ConfigError::MissingPassword);
        }

        Ok(ServerOptions {
            auth: self.auth,
            host: self.host,
            endpoint: self.endpoint,
            hashed_password: self.hashed_password,
            tls,
            commit: self.commit,
            version: self.version,
        })
    }
}
