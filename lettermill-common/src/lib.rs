//! Shared domain model and ambient concerns for the lettermill workspace.
//!
//! This crate holds everything both the store and the delivery machinery need
//! to agree on: the queue document model, message content, recipient fields,
//! runtime configuration, and logging setup.

pub mod config;
pub mod document;
pub mod logging;
pub mod message;
pub mod recipients;

/// Control signal broadcast to long-running service loops.
#[derive(Debug, Clone, Copy)]
pub enum Signal {
    Shutdown,
}
