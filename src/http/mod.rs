//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection or Unix socket
//!     → server.rs (Axum setup, provider mounting, bind, dispose)
//!     → request.rs (request ID)
//!     → auth.rs (password cookie check for protected providers)
//!     → providers (root, /api, /update, /login, /static, /dashboard, /ssh)
//! ```

pub mod auth;
pub mod provider;
pub mod request;
pub mod server;

pub use provider::Provider;
pub use request::{RequestIdLayer, X_REQUEST_ID};
pub use server::HttpServer;
