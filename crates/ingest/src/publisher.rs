//! Key publisher.
//!
//! Notifies downstream calculator deployments that a data item is ready for
//! scoring.

use async_trait::async_trait;
use tokio::sync::mpsc;
use veris_bootstrap::{BootstrapHandler, Runtime};
use veris_contracts::PublishWrapper;
use veris_pubsub::Publisher;

pub struct KeyPublisher {
	publisher: Box<dyn Publisher>,
	keys: mpsc::UnboundedReceiver<String>,
}

impl KeyPublisher {
	pub fn new(publisher: Box<dyn Publisher>, keys: mpsc::UnboundedReceiver<String>) -> Self {
		Self { publisher, keys }
	}
}

#[async_trait]
impl BootstrapHandler for KeyPublisher {
	fn name(&self) -> &'static str {
		"key-publisher"
	}

	async fn start(self: Box<Self>, runtime: &Runtime) -> anyhow::Result<()> {
		let shutdown = runtime.shutdown_token();
		let publisher = self.publisher;
		let mut keys = self.keys;
		runtime.spawn(async move {
			loop {
				let key = tokio::select! {
					_ = shutdown.cancelled() => break,
					received = keys.recv() => match received {
						Some(key) => key,
						None => break,
					},
				};

				// Best effort: the transport reconnects on the next publish
				// and the pipeline tolerates re-delivery.
				match publisher.publish(&PublishWrapper::calculate_score(&key)).await {
					Ok(()) => tracing::debug!(key, "CalculateScore published"),
					Err(error) => tracing::error!(key, error = %error, "publish failed"),
				}
			}
			publisher.close().await;
			tracing::info!("shutdown received");
		});
		Ok(())
	}
}
