//! Projection sweep.
//!
//! Periodically finds records whose confidence is still unset, derives each
//! record's graph fingerprint from its canonical sample projection, and
//! copies the latest confidence back onto the record. Records without a
//! positive score yet are left for a later tick.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use veris_bootstrap::{BootstrapHandler, Runtime};
use veris_contracts::HashKind;
use veris_graph::GraphStore;
use veris_records::RecordStore;

/// Pause between sweeps.
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

pub struct Projector {
	graph: Arc<dyn GraphStore>,
	records: Arc<dyn RecordStore>,
	hash: HashKind,
}

impl Projector {
	pub fn new(graph: Arc<dyn GraphStore>, records: Arc<dyn RecordStore>, hash: HashKind) -> Self {
		Self {
			graph,
			records,
			hash,
		}
	}

	/// Run one sweep over the unscored records. Per-record failures are
	/// logged and skipped. Returns how many records were populated.
	pub async fn sweep(&self) -> usize {
		tracing::debug!("polling...");
		let records = match self.records.find_unscored().await {
			Ok(records) => records,
			Err(error) => {
				tracing::error!(error = %error, "unscored record query failed");
				return 0;
			}
		};
		tracing::debug!(count = records.len(), "records found");

		let mut populated = 0;
		for mut record in records {
			let key = match record.fingerprint(&self.hash) {
				Ok(key) => key,
				Err(error) => {
					tracing::error!(id = %record.id, error = %error, "fingerprint failed");
					continue;
				}
			};

			let score = match self.graph.latest_score(&key).await {
				Ok(score) => score,
				Err(error) => {
					tracing::error!(id = %record.id, error = %error, "score lookup failed");
					continue;
				}
			};

			let Some(score) = score else {
				continue;
			};
			tracing::debug!(key, confidence = score.confidence, "score for record");
			if score.confidence > 0.0 {
				record.confidence = score.confidence;
				if let Err(error) = self.records.update(&record).await {
					tracing::error!(id = %record.id, error = %error, "record update failed");
					continue;
				}
				populated += 1;
			}
		}
		populated
	}
}

/// Bootstrap component running the sweep on a fixed tick.
pub struct ProjectorHandler {
	projector: Projector,
}

impl ProjectorHandler {
	pub fn new(projector: Projector) -> Self {
		Self { projector }
	}
}

#[async_trait]
impl BootstrapHandler for ProjectorHandler {
	fn name(&self) -> &'static str {
		"projector"
	}

	async fn start(self: Box<Self>, runtime: &Runtime) -> anyhow::Result<()> {
		self.projector.graph.validate_schema().await?;

		let projector = self.projector;
		let shutdown = runtime.shutdown_token();
		runtime.spawn(async move {
			loop {
				projector.sweep().await;
				tokio::select! {
					_ = shutdown.cancelled() => break,
					_ = tokio::time::sleep(SWEEP_INTERVAL) => {}
				}
			}
			tracing::info!("shutdown received");
		});
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use chrono::Utc;
	use veris_contracts::StackLayer;
	use veris_graph::{MemoryGraph, Score};
	use veris_records::{MemoryRecords, Record};

	use super::*;

	fn record(id: &str) -> Record {
		Record {
			id: id.to_string(),
			description: "sensor sample".to_string(),
			seed: "s-1".to_string(),
			timestamp: "2024-03-01T12:00:00Z".to_string(),
			..Default::default()
		}
	}

	fn score_for(key: &str, confidence: f64) -> Score {
		Score {
			key: Score::mint_key(),
			data_ref: key.to_string(),
			passed: 1,
			count: 1,
			policy: "default".to_string(),
			confidence,
			timestamp: Utc::now(),
			tag: vec![String::new()],
			layer: StackLayer::Application,
		}
	}

	fn harness() -> (Arc<MemoryGraph>, Arc<MemoryRecords>, Projector) {
		let graph = Arc::new(MemoryGraph::new());
		let records = Arc::new(MemoryRecords::new());
		let projector = Projector::new(graph.clone(), records.clone(), HashKind::Sha256);
		(graph, records, projector)
	}

	#[tokio::test]
	async fn sweep_copies_confidence_onto_record() {
		let (graph, records, projector) = harness();

		let r = record("01GXR9Y2P3Q4R5S6T7U8V9W0X1");
		let fingerprint = r.fingerprint(&HashKind::Sha256).unwrap();
		records.insert(r);
		graph.insert_score(&score_for(&fingerprint, 0.42)).await.unwrap();

		assert_eq!(projector.sweep().await, 1);
		let updated = records.find_by_id("01GXR9Y2P3Q4R5S6T7U8V9W0X1").await.unwrap();
		assert_eq!(updated.confidence, 0.42);
		assert!(records.find_unscored().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn records_without_a_score_wait_for_a_later_tick() {
		let (_graph, records, projector) = harness();
		records.insert(record("01GXR9Y2P3Q4R5S6T7U8V9W0X1"));

		assert_eq!(projector.sweep().await, 0);
		assert_eq!(records.find_unscored().await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn zero_confidence_scores_are_not_projected() {
		let (graph, records, projector) = harness();

		let r = record("01GXR9Y2P3Q4R5S6T7U8V9W0X1");
		let fingerprint = r.fingerprint(&HashKind::Sha256).unwrap();
		records.insert(r);
		graph.insert_score(&score_for(&fingerprint, 0.0)).await.unwrap();

		assert_eq!(projector.sweep().await, 0);
		assert_eq!(records.find_unscored().await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn unsupported_hash_skips_the_record() {
		let graph = Arc::new(MemoryGraph::new());
		let records = Arc::new(MemoryRecords::new());
		let projector = Projector::new(graph, records.clone(), HashKind::Md5);

		records.insert(record("01GXR9Y2P3Q4R5S6T7U8V9W0X1"));
		assert_eq!(projector.sweep().await, 0);
	}

	#[tokio::test]
	async fn latest_score_wins() {
		let (graph, records, projector) = harness();

		let r = record("01GXR9Y2P3Q4R5S6T7U8V9W0X1");
		let fingerprint = r.fingerprint(&HashKind::Sha256).unwrap();
		records.insert(r);
		graph.insert_score(&score_for(&fingerprint, 0.30)).await.unwrap();
		graph.insert_score(&score_for(&fingerprint, 0.70)).await.unwrap();

		projector.sweep().await;
		let updated = records.find_by_id("01GXR9Y2P3Q4R5S6T7U8V9W0X1").await.unwrap();
		assert_eq!(updated.confidence, 0.70);
	}
}
