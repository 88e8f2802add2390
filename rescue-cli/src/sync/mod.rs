//! Glue between the CLI and the core sync engine.
//!
//! The core only consumes an online/offline signal; here that signal comes
//! from probing the configured server's health endpoint.

pub mod auto_sync;
pub mod presence;

pub use auto_sync::try_auto_sync;
pub use presence::{probe, spawn_presence_monitor};
