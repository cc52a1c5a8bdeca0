//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize into ConfigFile)
//!     → credentials (merge CLI > environment > file > defaults)
//!     → ServerOptionsBuilder::build (validation.rs semantic checks)
//!     → ServerOptions (validated, immutable)
//!     → shared via Arc with the listener stage
//! ```
//!
//! # Design Decisions
//! - `ServerOptions` can only be obtained from the builder, so an options
//!   value with a certificate but no key never exists
//! - A missing config file is not an error; a malformed one is
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config_file, ConfigError};
pub use schema::{AuthMode, ConfigFile, Endpoint, ServerOptions, ServerOptionsBuilder, TlsPair};
