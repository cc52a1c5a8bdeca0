//! Worker delegation for extension commands.
//!
//! # Data Flow
//! ```text
//! parent: bind IPC socket → spawn self → await ready → send cli → wait → exit code
//! worker: connect → ready → receive cli → run command → exit code
//! ```

pub mod child;
pub mod parent;
pub mod protocol;

pub use parent::WorkerDelegate;
pub use protocol::{ProtocolError, WorkerMessage};
