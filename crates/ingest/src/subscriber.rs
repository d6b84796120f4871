//! Stream intake.

use async_trait::async_trait;
use tokio::sync::mpsc;
use veris_bootstrap::{BootstrapHandler, Runtime};
use veris_contracts::SubscribeWrapper;
use veris_pubsub::Subscriber;

/// Bootstrap component pumping the inbound transport onto the message
/// channel.
pub struct StreamSubscriber {
	subscriber: Box<dyn Subscriber>,
	messages: mpsc::UnboundedSender<SubscribeWrapper>,
}

impl StreamSubscriber {
	pub fn new(
		subscriber: Box<dyn Subscriber>,
		messages: mpsc::UnboundedSender<SubscribeWrapper>,
	) -> Self {
		Self {
			subscriber,
			messages,
		}
	}
}

#[async_trait]
impl BootstrapHandler for StreamSubscriber {
	fn name(&self) -> &'static str {
		"stream-subscriber"
	}

	async fn start(self: Box<Self>, runtime: &Runtime) -> anyhow::Result<()> {
		let shutdown = runtime.shutdown_token();
		let subscriber = self.subscriber;
		let messages = self.messages;
		runtime.spawn(async move {
			if let Err(error) = subscriber.run(messages, shutdown).await {
				tracing::error!(error = %error, "stream subscriber failed");
			}
			tracing::info!("shutdown received");
		});
		Ok(())
	}
}
