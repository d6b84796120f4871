//! Key intake.
//!
//! Envelopes published by the ingest service carry the affected data key as
//! their payload; this component unwraps them onto the debouncer's key
//! stream.

use async_trait::async_trait;
use tokio::sync::mpsc;
use veris_bootstrap::{BootstrapHandler, Runtime};
use veris_pubsub::Subscriber;

pub struct KeySubscriber {
	subscriber: Box<dyn Subscriber>,
	keys: mpsc::UnboundedSender<String>,
}

impl KeySubscriber {
	pub fn new(subscriber: Box<dyn Subscriber>, keys: mpsc::UnboundedSender<String>) -> Self {
		Self { subscriber, keys }
	}
}

#[async_trait]
impl BootstrapHandler for KeySubscriber {
	fn name(&self) -> &'static str {
		"key-subscriber"
	}

	async fn start(self: Box<Self>, runtime: &Runtime) -> anyhow::Result<()> {
		let (messages_tx, mut messages_rx) = mpsc::unbounded_channel();

		let pump_shutdown = runtime.shutdown_token();
		let subscriber = self.subscriber;
		runtime.spawn(async move {
			if let Err(error) = subscriber.run(messages_tx, pump_shutdown).await {
				tracing::error!(error = %error, "key subscriber failed");
			}
		});

		let keys = self.keys;
		let shutdown = runtime.shutdown_token();
		runtime.spawn(async move {
			loop {
				let wrapper = tokio::select! {
					_ = shutdown.cancelled() => break,
					received = messages_rx.recv() => match received {
						Some(wrapper) => wrapper,
						None => break,
					},
				};

				let key = String::from_utf8_lossy(&wrapper.content).into_owned();
				tracing::debug!(key, "key received");
				if keys.send(key).is_err() {
					break;
				}
			}
			// Dropping `keys` closes the debouncer intake.
			tracing::info!("shutdown received");
		});
		Ok(())
	}
}
