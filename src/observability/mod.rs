//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → http::request (request IDs on every HTTP span)
//! ```
//!
//! # Design Decisions
//! - Structured fields (`error = %e`) instead of formatted messages
//! - Request ID flows through all HTTP handling

pub mod logging;
