//! Command-line surface.
//!
//! Parsing syntax is clap's; this module only declares the flags and a few
//! derived accessors. The parsed [`Cli`] is also the payload of the worker
//! `cli` message, so it is serde-capable.

pub mod args;

pub use args::Cli;
