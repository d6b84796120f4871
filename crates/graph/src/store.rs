//! Abstract graph store.
//!
//! Everything the pipeline needs from a graph engine: schema bootstrap,
//! idempotent vertex creation, edge bookkeeping, and the handful of queries
//! the scoring and projection paths run. Engines are selected at runtime and
//! shared across worker tasks behind `Arc<dyn GraphStore>`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use veris_contracts::StackLayer;

use crate::documents::{AnnotationDoc, EdgeKind, Score};

/// Errors raised by a graph engine.
#[derive(Debug, Error)]
pub enum GraphError {
	/// Expected database, graph, or collection is missing. Fatal at startup.
	#[error("graph schema error: {0}")]
	Schema(String),

	#[error("graph request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("graph document decoding failed: {0}")]
	Decode(#[from] serde_json::Error),

	#[error("graph operation failed: {0}")]
	Engine(String),
}

pub type Result<T> = std::result::Result<T, GraphError>;

/// Operations the pipeline runs against the trust graph.
#[async_trait]
pub trait GraphStore: Send + Sync {
	/// Create the database, graph, and vertex collections when absent.
	async fn ensure_schema(&self) -> Result<()>;

	/// Verify that the declared collections exist; absence is an error.
	async fn validate_schema(&self) -> Result<()>;

	/// Create the data vertex for `key` unless it already exists.
	async fn upsert_data(&self, key: &str, timestamp: DateTime<Utc>) -> Result<()>;

	/// Insert an annotation vertex. A key collision means the producer
	/// re-delivered the annotation; the duplicate is dropped silently.
	async fn insert_annotation(&self, doc: &AnnotationDoc) -> Result<()>;

	/// Append a score vertex.
	async fn insert_score(&self, score: &Score) -> Result<()>;

	/// Insert an edge of `kind` between two vertex keys. Edge inserts are not
	/// deduplicated; downstream queries project on `dataRef` and tolerate
	/// duplicates.
	async fn insert_edge(&self, kind: EdgeKind, from_key: &str, to_key: &str) -> Result<()>;

	/// All annotations whose `dataRef` is `key`.
	async fn annotations_by_data_ref(&self, key: &str) -> Result<Vec<AnnotationDoc>>;

	/// Annotations that bear on `key` for scoring purposes.
	///
	/// Direct annotations come first. When a prior score of `key` has `stack`
	/// neighbours, annotations matching the neighbours' tag sets are unioned
	/// in, excluding application-layer annotations that describe other data.
	async fn annotations_for_scoring(&self, key: &str) -> Result<Vec<AnnotationDoc>>;

	/// Latest score at `layer` whose tag set contains `tag`.
	async fn score_by_tag(&self, tag: &str, layer: &StackLayer) -> Result<Option<Score>>;

	/// Latest score for `key`, across all layers.
	async fn latest_score(&self, key: &str) -> Result<Option<Score>>;

	/// Scores describing `key` at `layer`, resolved through the layer's own
	/// lookup path (tag match for ci/cd, host match for os/host).
	async fn query_score_by_layer(&self, key: &str, layer: &StackLayer) -> Result<Vec<Score>>;

	/// Distinct host names seen across application-layer annotations.
	async fn fetch_hosts(&self) -> Result<Vec<String>>;
}
