//! Remote development server bootstrap.
//!
//! # Architecture Overview
//!
//! ```text
//!   argv ──▶ cli ──┬─▶ --help / --version ──▶ stdout, exit
//!                  │
//!                  ├─▶ extension flags ──▶ worker::parent ══ IPC ══▶ worker::child ──▶ extensions
//!                  │
//!                  └─▶ credentials ──▶ lifecycle::startup ──┬─▶ http (providers) ──▶ TCP/TLS/socket
//!                                                           └─▶ ssh (optional)   ──▶ 127.0.0.1:0
//!                                          lifecycle::shutdown ◀── lifecycle::signals
//! ```

// Bootstrap pipeline
pub mod cli;
pub mod config;
pub mod credentials;
pub mod lifecycle;

// Listeners
pub mod http;
pub mod net;
pub mod providers;
pub mod ssh;

// Delegation
pub mod extensions;
pub mod worker;

// Cross-cutting concerns
pub mod error;
pub mod observability;

pub use cli::Cli;
pub use error::BootstrapError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;

/// Server version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build commit, set through `DEV_SERVER_COMMIT` at compile time.
pub const COMMIT: &str = match option_env!("DEV_SERVER_COMMIT") {
    Some(commit) => commit,
    None => "development",
};

/// Version of the bundled workbench.
pub const WORKBENCH_VERSION: &str = "1.96.0";
