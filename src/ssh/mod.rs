//! SSH subsystem: host key provisioning and the loopback listener.
//!
//! Optional and independently fallible. A failure here disables SSH for the
//! run and never reaches the HTTP server.

pub mod host_key;
pub mod server;

pub use host_key::{HostKeyGenerator, SshKeygen};
pub use server::SshProvider;
