//! HTTP server setup.
//!
//! # Responsibilities
//! - Keep the provider registrations in insertion order
//! - Mount each provider under its prefix, guarding protected ones with auth
//! - Wire up middleware (tracing, request ID)
//! - Bind to TCP (plain or TLS) or a Unix socket
//! - Dispose providers in reverse order and close the socket

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{middleware, Router};
use axum_server::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::config::{Endpoint, ServerOptions};
use crate::error::BootstrapError;
use crate::http::auth::{require_auth, AuthGate};
use crate::http::provider::Provider;
use crate::http::request::RequestIdLayer;
use crate::net::listener::{bind_tcp, bind_unix, ListenAddress, ListenerError};
use crate::net::tls::load_tls_config;

/// How long in-flight requests get to finish once disposal starts.
const GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Error type for provider registration.
#[derive(Debug)]
pub enum RegistrationError {
    /// Prefix already taken by another provider.
    DuplicatePrefix(String),
    /// Prefix must start with `/`.
    InvalidPrefix(String),
    /// Registration after the server started listening.
    AlreadyListening,
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::DuplicatePrefix(prefix) => {
                write!(f, "A provider is already registered at {}", prefix)
            }
            RegistrationError::InvalidPrefix(prefix) => {
                write!(f, "Provider prefix must start with '/': {}", prefix)
            }
            RegistrationError::AlreadyListening => {
                write!(f, "Cannot register providers after the server started")
            }
        }
    }
}

impl std::error::Error for RegistrationError {}

/// HTTP server hosting the registered providers.
pub struct HttpServer {
    options: Arc<ServerOptions>,
    providers: Vec<(String, Arc<dyn Provider>)>,
    handle: Handle,
    unix_shutdown: Arc<Notify>,
    address: Mutex<Option<ListenAddress>>,
    task: Mutex<Option<JoinHandle<std::io::Result<()>>>>,
    disposed: AtomicBool,
}

impl HttpServer {
    pub fn new(options: Arc<ServerOptions>) -> Self {
        Self {
            options,
            providers: Vec::new(),
            handle: Handle::new(),
            unix_shutdown: Arc::new(Notify::new()),
            address: Mutex::new(None),
            task: Mutex::new(None),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn options(&self) -> &Arc<ServerOptions> {
        &self.options
    }

    /// Register a provider at `prefix`. The returned `Arc` can be handed to
    /// providers registered later.
    pub fn register<P: Provider>(
        &mut self,
        prefix: &str,
        provider: P,
    ) -> Result<Arc<P>, RegistrationError> {
        if !prefix.starts_with('/') {
            return Err(RegistrationError::InvalidPrefix(prefix.to_string()));
        }
        if self.is_listening() {
            return Err(RegistrationError::AlreadyListening);
        }
        if self.providers.iter().any(|(p, _)| p == prefix) {
            return Err(RegistrationError::DuplicatePrefix(prefix.to_string()));
        }

        let provider = Arc::new(provider);
        tracing::debug!(prefix, provider = provider.name(), "Provider registered");
        self.providers
            .push((prefix.to_string(), provider.clone() as Arc<dyn Provider>));
        Ok(provider)
    }

    /// Registered prefixes, in registration order.
    pub fn prefixes(&self) -> Vec<&str> {
        self.providers.iter().map(|(p, _)| p.as_str()).collect()
    }

    /// Address the server is bound to, once `listen` has succeeded.
    pub fn address(&self) -> Option<ListenAddress> {
        self.address.lock().ok().and_then(|a| a.clone())
    }

    fn is_listening(&self) -> bool {
        self.address().is_some()
    }

    /// Build the Axum router with every provider mounted.
    pub fn router(&self) -> Router {
        let gate = Arc::new(AuthGate::new(&self.options));
        let mut app = Router::new();

        for (prefix, provider) in &self.providers {
            let mut routes = provider.clone().router();
            if provider.requires_auth() {
                routes = routes.route_layer(middleware::from_fn_with_state(
                    gate.clone(),
                    require_auth,
                ));
            }
            app = if prefix == "/" {
                app.merge(routes)
            } else {
                app.nest(prefix, routes)
            };
        }

        app.layer(RequestIdLayer).layer(TraceLayer::new_for_http())
    }

    /// Bind the configured endpoint and start serving in the background.
    pub async fn listen(&self) -> Result<ListenAddress, BootstrapError> {
        let app = self.router();

        let (address, task) = match self.options.endpoint() {
            Endpoint::Tcp { port } => {
                // TLS material is checked before the socket is taken.
                let tls = match self.options.tls() {
                    Some(pair) => Some(load_tls_config(&pair.cert, &pair.key).await?),
                    None => None,
                };

                let listener = bind_tcp(self.options.host(), *port).await?;
                let local_addr = listener.local_addr().map_err(|source| ListenerError::Bind {
                    address: format!("{}:{}", self.options.host(), port),
                    source,
                })?;
                let listener = listener.into_std()?;

                let service = app.into_make_service();
                let handle = self.handle.clone();
                let task = match tls {
                    Some(config) => tokio::spawn(
                        axum_server::from_tcp_rustls(listener, config)
                            .handle(handle)
                            .serve(service),
                    ),
                    None => tokio::spawn(
                        axum_server::from_tcp(listener)
                            .handle(handle)
                            .serve(service),
                    ),
                };
                (ListenAddress::Tcp(local_addr), task)
            }
            Endpoint::Socket(path) => {
                let listener = bind_unix(path)?;
                let notify = self.unix_shutdown.clone();
                let task = tokio::spawn(async move {
                    axum::serve(listener, app)
                        .with_graceful_shutdown(async move { notify.notified().await })
                        .await
                });
                (ListenAddress::Unix(path.clone()), task)
            }
        };

        tracing::info!(address = %address, "HTTP server started");
        if let Ok(mut slot) = self.address.lock() {
            *slot = Some(address.clone());
        }
        if let Ok(mut slot) = self.task.lock() {
            *slot = Some(task);
        }
        Ok(address)
    }

    /// Dispose providers in reverse registration order, then close the socket.
    ///
    /// Only the first call does anything.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        for (prefix, provider) in self.providers.iter().rev() {
            tracing::debug!(prefix = %prefix, provider = provider.name(), "Disposing provider");
            provider.dispose();
        }

        self.handle.graceful_shutdown(Some(GRACE_PERIOD));
        self.unix_shutdown.notify_one();

        let task = self.task.lock().ok().and_then(|mut t| t.take());
        if let Some(task) = task {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "HTTP server stopped with error"),
                Err(e) => tracing::warn!(error = %e, "HTTP server task failed"),
            }
        }

        if let Some(ListenAddress::Unix(path)) = self.address() {
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::debug!(path = %path.display(), error = %e, "Socket file not removed");
            }
        }
        tracing::info!("HTTP server stopped");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}
