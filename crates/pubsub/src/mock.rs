//! In-process test transport.
//!
//! The mock exists for happy-path development without a broker: publishes
//! are encoded and dropped, factory-built subscriptions emit canned traffic.
//! Tests that need a real end-to-end hand-off use [`channel`], which bridges
//! a publisher to a subscriber through an in-process queue exactly the way
//! the wire would.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use veris_contracts::{PublishWrapper, SubscribeWrapper};

use crate::{Publisher, Subscriber, TransportError};

/// Publisher that encodes and discards every envelope.
pub struct MockPublisher;

#[async_trait]
impl Publisher for MockPublisher {
	async fn publish(&self, message: &PublishWrapper) -> Result<(), TransportError> {
		serde_json::to_vec(message)?;
		Ok(())
	}

	async fn close(&self) {}
}

/// Subscriber that emits a canned test message once a second.
pub struct MockSubscriber;

#[async_trait]
impl Subscriber for MockSubscriber {
	async fn run(
		self: Box<Self>,
		messages: mpsc::UnboundedSender<SubscribeWrapper>,
		shutdown: CancellationToken,
	) -> Result<(), TransportError> {
		loop {
			tokio::select! {
				_ = shutdown.cancelled() => return Ok(()),
				_ = tokio::time::sleep(Duration::from_secs(1)) => {
					let wrapper = SubscribeWrapper {
						message_type: "TestMessage".to_string(),
						content: b"This is a test message".to_vec(),
						..Default::default()
					};
					if messages.send(wrapper).is_err() {
						return Ok(());
					}
				}
			}
		}
	}
}

/// In-process publisher/subscriber pair.
///
/// The publisher re-encodes each envelope through JSON so the subscriber
/// observes the same decode path as a networked transport.
pub fn channel() -> (ChannelPublisher, ChannelSubscriber) {
	let (tx, rx) = mpsc::unbounded_channel();
	(
		ChannelPublisher { tx },
		ChannelSubscriber {
			rx: Mutex::new(rx),
		},
	)
}

pub struct ChannelPublisher {
	tx: mpsc::UnboundedSender<SubscribeWrapper>,
}

#[async_trait]
impl Publisher for ChannelPublisher {
	async fn publish(&self, message: &PublishWrapper) -> Result<(), TransportError> {
		let encoded = serde_json::to_vec(message)?;
		let wrapper: SubscribeWrapper = serde_json::from_slice(&encoded)?;
		self.tx.send(wrapper).map_err(|_| TransportError::Closed)
	}

	async fn close(&self) {}
}

pub struct ChannelSubscriber {
	rx: Mutex<mpsc::UnboundedReceiver<SubscribeWrapper>>,
}

#[async_trait]
impl Subscriber for ChannelSubscriber {
	async fn run(
		self: Box<Self>,
		messages: mpsc::UnboundedSender<SubscribeWrapper>,
		shutdown: CancellationToken,
	) -> Result<(), TransportError> {
		let mut rx = self.rx.lock().await;
		loop {
			tokio::select! {
				_ = shutdown.cancelled() => return Ok(()),
				received = rx.recv() => match received {
					Some(wrapper) => {
						if messages.send(wrapper).is_err() {
							return Ok(());
						}
					}
					None => return Ok(()),
				},
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn channel_pair_bridges_publish_to_subscribe() {
		let (publisher, subscriber) = channel();
		let (tx, mut rx) = mpsc::unbounded_channel();
		let shutdown = CancellationToken::new();
		let pump = tokio::spawn(Box::new(subscriber).run(tx, shutdown.clone()));

		publisher
			.publish(&PublishWrapper::calculate_score("abc"))
			.await
			.unwrap();

		let received = rx.recv().await.unwrap();
		assert_eq!(received.content, b"abc");

		shutdown.cancel();
		pump.await.unwrap().unwrap();
	}
}
