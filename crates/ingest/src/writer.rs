//! Graph writer.
//!
//! Turns inbound annotation messages into graph mutations and emits the
//! affected data key onto the internal key stream. Per-message failures are
//! logged and the stream continues; only schema validation at startup is
//! fatal.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::mpsc;
use veris_bootstrap::{BootstrapHandler, Runtime};
use veris_contracts::{AnnotationList, MessageAction, SubscribeWrapper};
use veris_graph::{AnnotationDoc, EdgeKind, GraphError, GraphStore};

/// Errors raised while applying one message to the graph.
#[derive(Debug, Error)]
pub enum IngestError {
	#[error("message payload failed to parse: {0}")]
	Parse(#[from] serde_json::Error),

	#[error(transparent)]
	Graph(#[from] GraphError),

	#[error("mutate message carries no source item")]
	MissingSource,
}

/// Applies annotation messages to the trust graph.
pub struct Writer {
	graph: Arc<dyn GraphStore>,
}

impl Writer {
	pub fn new(graph: Arc<dyn GraphStore>) -> Self {
		Self { graph }
	}

	/// Apply one message. Returns the affected data key, if any, for the
	/// downstream key stream.
	pub async fn handle(&self, wrapper: &SubscribeWrapper) -> Result<Option<String>, IngestError> {
		match &wrapper.action {
			MessageAction::Create | MessageAction::Transit => {
				tracing::debug!(action = %wrapper.action, "handling annotation list");
				self.handle_create_transit(&wrapper.content).await
			}
			MessageAction::Mutate => {
				tracing::debug!("handling mutate");
				self.handle_mutate(&wrapper.content).await
			}
			MessageAction::Other(action) => {
				tracing::debug!(action, "unrecognized action, skipping");
				Ok(None)
			}
		}
	}

	/// All items of a create/transit list describe the same piece of data.
	async fn handle_create_transit(&self, content: &[u8]) -> Result<Option<String>, IngestError> {
		let list: AnnotationList = serde_json::from_slice(content)?;
		if list.items.is_empty() {
			tracing::debug!("items is zero-length");
			return Ok(None);
		}

		let data_ref = list.items[0].key.clone();
		self.graph.upsert_data(&data_ref, Utc::now()).await?;

		for item in list.items {
			let doc = AnnotationDoc::from(item);
			self.graph.insert_annotation(&doc).await?;
			self.graph
				.insert_edge(EdgeKind::Trust, &doc.data_ref, &doc.key)
				.await?;
		}

		Ok(Some(data_ref))
	}

	/// A mutate list carries one source item naming the predecessor data,
	/// plus the annotations of the new version.
	async fn handle_mutate(&self, content: &[u8]) -> Result<Option<String>, IngestError> {
		let list: AnnotationList = serde_json::from_slice(content)?;
		if list.items.is_empty() {
			tracing::debug!("items is zero-length");
			return Ok(None);
		}

		let predecessor = list
			.items
			.iter()
			.find(|item| item.is_source())
			.map(|item| item.key.clone())
			.ok_or(IngestError::MissingSource)?;

		// The predecessor should already exist; creating it here records an
		// orphan root that never received annotations of its own.
		self.graph.upsert_data(&predecessor, Utc::now()).await?;

		let mut successor = None;
		for item in list.items {
			if item.is_source() {
				continue;
			}
			if successor.is_none() {
				self.graph.upsert_data(&item.key, Utc::now()).await?;
				self.graph
					.insert_edge(EdgeKind::Lineage, &item.key, &predecessor)
					.await?;
				successor = Some(item.key.clone());
			}

			let doc = AnnotationDoc::from(item);
			self.graph.insert_annotation(&doc).await?;
			self.graph
				.insert_edge(EdgeKind::Trust, &doc.data_ref, &doc.key)
				.await?;
		}

		Ok(successor)
	}
}

/// Bootstrap component wiring the writer between the message stream and the
/// key stream.
pub struct GraphWriter {
	graph: Arc<dyn GraphStore>,
	messages: mpsc::UnboundedReceiver<SubscribeWrapper>,
	keys: mpsc::UnboundedSender<String>,
}

impl GraphWriter {
	pub fn new(
		graph: Arc<dyn GraphStore>,
		messages: mpsc::UnboundedReceiver<SubscribeWrapper>,
		keys: mpsc::UnboundedSender<String>,
	) -> Self {
		Self {
			graph,
			messages,
			keys,
		}
	}
}

#[async_trait]
impl BootstrapHandler for GraphWriter {
	fn name(&self) -> &'static str {
		"graph-writer"
	}

	async fn start(self: Box<Self>, runtime: &Runtime) -> anyhow::Result<()> {
		// Create the database, graph, and collections on first run; a broken
		// schema is fatal before any message is consumed.
		self.graph.ensure_schema().await?;
		self.graph.validate_schema().await?;

		let writer = Writer::new(self.graph);
		let mut messages = self.messages;
		let keys = self.keys;
		let shutdown = runtime.shutdown_token();

		runtime.spawn(async move {
			loop {
				let wrapper = tokio::select! {
					_ = shutdown.cancelled() => break,
					received = messages.recv() => match received {
						Some(wrapper) => wrapper,
						None => break,
					},
				};

				match writer.handle(&wrapper).await {
					Ok(Some(key)) => {
						if keys.send(key).is_err() {
							break;
						}
					}
					Ok(None) => {}
					Err(error) => {
						tracing::error!(error = %error, "message handling failed");
					}
				}
			}
			// Dropping `keys` closes the downstream stream.
			tracing::info!("shutdown received");
		});
		Ok(())
	}
}
