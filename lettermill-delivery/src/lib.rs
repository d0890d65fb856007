//! Delivery state machine for the watched mail queue
//!
//! This crate drives queue documents through their delivery lifecycle:
//! - Classify change-feed events and interpret the document's current state
//! - Prepare payloads (template merge, recipient resolution, validation)
//! - Execute sends against an abstract outbound transport
//! - Detect stuck workers through lease expiry
//! - Record every outcome on the document itself, transactionally

mod cleanup;
mod directory;
mod error;
mod events;
mod executor;
mod machine;
mod payload;
mod resolver;
mod service;
mod template;
mod transport;

pub use cleanup::sweep_terminal;
pub use directory::{MemoryDirectory, UserDirectory};
pub use error::{DeliveryError, ResolutionError, TransportError, ValidationError};
pub use events::{CollectingSink, DeliveryEvent, EventSink, NullSink};
pub use executor::{DeliveryExecutor, StateUpdate};
pub use machine::QueueStateMachine;
pub use payload::{DeliveryPayload, PayloadPreparer};
pub use resolver::resolve_uids;
pub use service::DeliveryService;
pub use template::{RenderedTemplate, StaticRenderer, TemplateRenderer};
pub use transport::{Mailer, MemoryMailer};
