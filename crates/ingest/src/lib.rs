//! Graph writer service.
//!
//! Consumes inbound annotation messages, upserts data, annotation, lineage,
//! and trust edges into the graph, and publishes each affected data key for
//! the scoring service.

pub mod config;
pub mod publisher;
pub mod subscriber;
pub mod writer;

pub use config::IngestConfig;
pub use publisher::KeyPublisher;
pub use subscriber::StreamSubscriber;
pub use writer::{GraphWriter, IngestError, Writer};
