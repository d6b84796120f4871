//! Scoring engine.
//!
//! A dispatcher drains the work queue under a bounded worker pool. Each
//! worker gathers the annotations bearing on its key, resolves the
//! lower-layer scores that underlie it, computes the weighted confidence,
//! and persists the score vertex with its scoring and stack edges.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use veris_bootstrap::{BootstrapHandler, Runtime};
use veris_contracts::StackLayer;
use veris_graph::{EdgeKind, GraphError, GraphStore, Score};
use veris_policy::WeightPolicy;

use crate::config::EngineSettings;
use crate::queue::{WorkQueue, Workers};

/// Upper bound on concurrently running scoring workers.
pub const WORKER_MAX: usize = 5;

/// Dispatcher backoff while the queue is empty.
const IDLE_BACKOFF: Duration = Duration::from_millis(250);

/// Computes and persists confidence scores.
pub struct Calculator {
	graph: Arc<dyn GraphStore>,
	policy: WeightPolicy,
	settings: EngineSettings,
}

impl Calculator {
	pub fn new(graph: Arc<dyn GraphStore>, policy: WeightPolicy, settings: EngineSettings) -> Self {
		Self {
			graph,
			policy,
			settings,
		}
	}

	/// Score one key. Failures are logged here; the worker slot is the
	/// caller's to release.
	pub async fn score(&self, key: &str) {
		// Settling buffer: the graph writer may still be ingesting the tail
		// of the annotation burst that released this key. Interacts with the
		// debouncer window; see the configuration section.
		tokio::time::sleep(self.settings.latency_floor()).await;

		if let Err(error) = self.score_inner(key).await {
			tracing::error!(key, error = %error, "scoring failed");
		}
	}

	async fn score_inner(&self, key: &str) -> Result<(), GraphError> {
		let annotations = self.graph.annotations_for_scoring(key).await?;
		if annotations.is_empty() {
			tracing::debug!(key, "no annotations to score");
			return Ok(());
		}

		// Direct annotations come first and share the key's own layer.
		let layer = annotations[0].layer.clone();

		// Scores of the tag and host fields of the received annotations.
		let mut tag_field_scores: HashMap<String, Score> = HashMap::new();
		let mut host_field_scores: HashMap<String, Score> = HashMap::new();

		match layer {
			StackLayer::Application => {
				// The confidence of an application-layer sample rests on the
				// CI/CD pipelines that built the apps touching it and the OS
				// images those apps run on.
				for annotation in &annotations {
					if !tag_field_scores.contains_key(&annotation.tag) {
						if let Some(score) =
							self.lookup_score(&annotation.tag, &StackLayer::CiCd).await
						{
							tag_field_scores.insert(annotation.tag.clone(), score);
						}
					}
					if !host_field_scores.contains_key(&annotation.host) {
						if let Some(score) =
							self.lookup_score(&annotation.host, &StackLayer::Os).await
						{
							host_field_scores.insert(annotation.host.clone(), score);
						}
					}
				}
			}
			StackLayer::Os => {
				// OS images are influenced by the hosts they run on.
				for annotation in &annotations {
					if !tag_field_scores.contains_key(&annotation.tag) {
						if let Some(score) =
							self.lookup_score(&annotation.tag, &StackLayer::Host).await
						{
							tag_field_scores.insert(annotation.tag.clone(), score);
						}
					}
				}
			}
			_ => {}
		}

		let Some(score) =
			Score::compute(key, &annotations, &self.policy, &tag_field_scores, &host_field_scores)
		else {
			tracing::debug!(key, "nothing to score");
			return Ok(());
		};

		self.graph.insert_score(&score).await?;
		let score_key = score.key.to_string();
		self.graph.insert_edge(EdgeKind::Scoring, &score_key, key).await?;

		// Record which lower-layer scores influenced this one.
		for lower in tag_field_scores.values().chain(host_field_scores.values()) {
			self.graph
				.insert_edge(EdgeKind::Stack, &lower.key.to_string(), &score_key)
				.await?;
		}

		tracing::debug!(
			key,
			confidence = score.confidence,
			passed = score.passed,
			count = score.count,
			"score persisted"
		);
		Ok(())
	}

	/// Resolve a lower-layer score. Lookup failures and misses are both
	/// recorded as absent; missing lower evidence carries no penalty.
	async fn lookup_score(&self, tag: &str, layer: &StackLayer) -> Option<Score> {
		match self.graph.score_by_tag(tag, layer).await {
			Ok(found) => found,
			Err(error) => {
				tracing::error!(tag, %layer, error = %error, "lower-layer score lookup failed");
				None
			}
		}
	}
}

/// Bootstrap component running the queue filler, the dispatcher, and the
/// worker pool.
pub struct CalculatorHandler {
	calculator: Arc<Calculator>,
	keys: mpsc::UnboundedReceiver<String>,
	queue: Arc<WorkQueue>,
	workers: Arc<Workers>,
}

impl CalculatorHandler {
	pub fn new(calculator: Calculator, keys: mpsc::UnboundedReceiver<String>) -> Self {
		Self {
			calculator: Arc::new(calculator),
			keys,
			queue: Arc::new(WorkQueue::new()),
			workers: Workers::new(),
		}
	}

	/// Worker accounting handle, observable by tests and diagnostics.
	pub fn workers(&self) -> Arc<Workers> {
		self.workers.clone()
	}
}

#[async_trait]
impl BootstrapHandler for CalculatorHandler {
	fn name(&self) -> &'static str {
		"calculator"
	}

	async fn start(self: Box<Self>, runtime: &Runtime) -> anyhow::Result<()> {
		// The scoring side never creates the schema; it refuses to start
		// against a graph the writer has not prepared.
		self.calculator.graph.validate_schema().await?;

		// Queue filler: incoming keys trigger calculation for their data.
		let queue = self.queue.clone();
		let mut keys = self.keys;
		let filler_shutdown = runtime.shutdown_token();
		runtime.spawn(async move {
			loop {
				tokio::select! {
					_ = filler_shutdown.cancelled() => return,
					received = keys.recv() => match received {
						Some(key) => queue.append(key),
						None => return,
					},
				}
			}
		});

		// Dispatcher: drain the queue while respecting the worker bound.
		let calculator = self.calculator;
		let queue = self.queue;
		let workers = self.workers;
		let shutdown = runtime.shutdown_token();
		let worker_runtime = runtime.clone();
		runtime.spawn(async move {
			loop {
				if shutdown.is_cancelled() {
					break;
				}

				if queue.is_empty() {
					tokio::select! {
						_ = shutdown.cancelled() => break,
						_ = tokio::time::sleep(IDLE_BACKOFF) => {}
					}
					continue;
				}

				if workers.count() >= WORKER_MAX {
					tokio::select! {
						_ = shutdown.cancelled() => break,
						_ = workers.freed() => {}
					}
					continue;
				}

				let Some(key) = queue.pop_first() else {
					continue;
				};
				tracing::debug!(
					workers = workers.count(),
					queued = queue.len(),
					key,
					"dispatching score job"
				);

				let slot = workers.acquire();
				let calculator = calculator.clone();
				// In-flight jobs are not cancelled; they run to completion
				// under the completion barrier.
				worker_runtime.spawn(async move {
					calculator.score(&key).await;
					drop(slot);
				});
			}
			tracing::info!("shutdown received");
		});
		Ok(())
	}
}
