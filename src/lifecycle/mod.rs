//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Credentials → Register providers → SSH (optional) → Bind HTTP → Summary
//!
//! Shutdown (shutdown.rs):
//!     trigger() → Dispose providers in reverse → Close sockets
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger()
//! ```
//!
//! # Design Decisions
//! - Ordered startup: HTTP binds last
//! - One disposal action, run at most once

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownError};
pub use signals::ShutdownSignals;
pub use startup::{start_listeners, summary_lines, ListenerSettings, Listeners, StartupReport};
