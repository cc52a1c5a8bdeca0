//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ServerOptions endpoint
//!     → listener.rs (bind TCP or Unix socket, report ListenAddress)
//!     → tls.rs (optional: validate PEM files, build rustls config)
//!     → Hand off to the HTTP layer
//! ```
//!
//! # Design Decisions
//! - Binding is separate from serving so bind errors surface synchronously
//! - TLS material is checked before the socket is bound

pub mod listener;
pub mod tls;

pub use listener::{ListenAddress, ListenerError};
