//! Transactional document store for the mail queue.
//!
//! The queue is a watched collection of documents; this crate provides the
//! storage abstraction the delivery machinery runs against:
//! - [`DocumentStore`]: atomic read-modify-write on single documents, the
//!   sole concurrency-correctness mechanism of the system
//! - [`ChangeEvent`]: before/after snapshot pairs delivered on every write
//! - [`MemoryDocumentStore`]: in-memory backend with a broadcast change feed

pub mod backends;
pub mod change;
pub mod error;
pub mod r#trait;
pub mod types;

pub use backends::MemoryDocumentStore;
pub use change::{ChangeEvent, ChangeKind};
pub use error::{Result, SpoolError};
pub use r#trait::{DocumentStore, TransactionFn};
pub use types::QueueDocumentId;
