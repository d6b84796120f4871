//! Message transports.
//!
//! The pipeline never talks to a broker directly; it sees a [`Subscriber`]
//! pumping inbound envelopes onto a channel and a [`Publisher`] pushing
//! outbound envelopes. Concrete transports are selected at runtime from the
//! stream discriminator in configuration.

pub mod factory;
pub mod mock;
pub mod tcp;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use veris_contracts::{PublishWrapper, SubscribeWrapper};

pub use factory::{new_publisher, new_subscriber};

/// Errors raised by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
	#[error("transport I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("frame encoding error: {0}")]
	Encode(#[from] serde_json::Error),

	#[error("publish timed out after {0:?}")]
	Timeout(std::time::Duration),

	#[error("transport is closed")]
	Closed,
}

/// Inbound side of a transport.
///
/// `run` pumps envelopes onto `messages` until the token is cancelled, then
/// drops the sender so downstream consumers observe end-of-stream. Frames
/// that fail to decode are logged and skipped; the pump itself only returns
/// on cancellation or a fatal transport error.
#[async_trait]
pub trait Subscriber: Send {
	async fn run(
		self: Box<Self>,
		messages: mpsc::UnboundedSender<SubscribeWrapper>,
		shutdown: CancellationToken,
	) -> Result<(), TransportError>;
}

/// Outbound side of a transport.
///
/// Publishes are best-effort: one reconnect attempt, then the error is the
/// caller's to log. Delivery is at-least-once end to end; the pipeline is
/// idempotent against duplicates.
#[async_trait]
pub trait Publisher: Send + Sync {
	async fn publish(&self, message: &PublishWrapper) -> Result<(), TransportError>;
	async fn close(&self);
}
