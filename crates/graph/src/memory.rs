//! Process-local graph engine.
//!
//! Backs tests and single-binary demos with the same query semantics as the
//! networked engine. Scores are appended in mint order, so "latest" is
//! simply the last matching element.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use veris_contracts::StackLayer;

use crate::documents::{AnnotationDoc, Data, EdgeDoc, EdgeKind, Score, VERTEX_SCORES};
use crate::store::{GraphStore, Result};

/// In-memory graph store.
#[derive(Debug, Default)]
pub struct MemoryGraph {
	state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
	data: HashMap<String, Data>,
	annotations: Vec<AnnotationDoc>,
	scores: Vec<Score>,
	edges: HashMap<&'static str, Vec<EdgeDoc>>,
}

impl MemoryGraph {
	pub fn new() -> Self {
		Self::default()
	}

	/// Edges currently stored in one collection. Test inspection helper.
	pub fn edges(&self, kind: EdgeKind) -> Vec<EdgeDoc> {
		let state = self.state.lock().unwrap();
		state.edges.get(kind.collection()).cloned().unwrap_or_default()
	}

	/// Keys of all data vertices. Test inspection helper.
	pub fn data_keys(&self) -> Vec<String> {
		let state = self.state.lock().unwrap();
		let mut keys: Vec<String> = state.data.keys().cloned().collect();
		keys.sort();
		keys
	}

	/// All score vertices in mint order. Test inspection helper.
	pub fn scores(&self) -> Vec<Score> {
		self.state.lock().unwrap().scores.clone()
	}

	/// Number of annotation vertices. Test inspection helper.
	pub fn annotation_count(&self) -> usize {
		self.state.lock().unwrap().annotations.len()
	}
}

impl State {
	fn latest_score_for(&self, key: &str) -> Option<&Score> {
		self.scores.iter().filter(|s| s.data_ref == key).next_back()
	}

	/// Scores adjacent to `score` over `stack` edges, either direction.
	fn stack_neighbours(&self, score: &Score) -> Vec<&Score> {
		let handle = format!("{}/{}", VERTEX_SCORES, score.key);
		let Some(stack) = self.edges.get(EdgeKind::Stack.collection()) else {
			return Vec::new();
		};

		let mut neighbours = Vec::new();
		for edge in stack {
			let other = if edge.from == handle {
				&edge.to
			} else if edge.to == handle {
				&edge.from
			} else {
				continue;
			};
			let other_key = other.strip_prefix("scores/").unwrap_or(other.as_str());
			if let Some(s) = self.scores.iter().find(|s| s.key.to_string() == other_key) {
				neighbours.push(s);
			}
		}
		neighbours
	}
}

#[async_trait]
impl GraphStore for MemoryGraph {
	async fn ensure_schema(&self) -> Result<()> {
		Ok(())
	}

	async fn validate_schema(&self) -> Result<()> {
		Ok(())
	}

	async fn upsert_data(&self, key: &str, timestamp: DateTime<Utc>) -> Result<()> {
		let mut state = self.state.lock().unwrap();
		state.data.entry(key.to_string()).or_insert_with(|| Data {
			key: key.to_string(),
			timestamp,
		});
		Ok(())
	}

	async fn insert_annotation(&self, doc: &AnnotationDoc) -> Result<()> {
		let mut state = self.state.lock().unwrap();
		if state.annotations.iter().any(|a| a.key == doc.key) {
			tracing::debug!(key = %doc.key, "duplicate annotation dropped");
			return Ok(());
		}
		state.annotations.push(doc.clone());
		Ok(())
	}

	async fn insert_score(&self, score: &Score) -> Result<()> {
		let mut state = self.state.lock().unwrap();
		state.scores.push(score.clone());
		Ok(())
	}

	async fn insert_edge(&self, kind: EdgeKind, from_key: &str, to_key: &str) -> Result<()> {
		let mut state = self.state.lock().unwrap();
		state
			.edges
			.entry(kind.collection())
			.or_default()
			.push(EdgeDoc::new(kind, from_key, to_key));
		Ok(())
	}

	async fn annotations_by_data_ref(&self, key: &str) -> Result<Vec<AnnotationDoc>> {
		let state = self.state.lock().unwrap();
		Ok(state
			.annotations
			.iter()
			.filter(|a| a.data_ref == key)
			.cloned()
			.collect())
	}

	async fn annotations_for_scoring(&self, key: &str) -> Result<Vec<AnnotationDoc>> {
		let state = self.state.lock().unwrap();

		let mut result: Vec<AnnotationDoc> = state
			.annotations
			.iter()
			.filter(|a| a.data_ref == key)
			.cloned()
			.collect();
		let mut seen: HashSet<String> = result.iter().map(|a| a.key.clone()).collect();

		if let Some(score) = state.latest_score_for(key) {
			let neighbour_tags: HashSet<&String> = state
				.stack_neighbours(score)
				.into_iter()
				.flat_map(|s| s.tag.iter())
				.collect();

			for a in &state.annotations {
				if seen.contains(&a.key) || !neighbour_tags.contains(&a.tag) {
					continue;
				}
				// Application annotations describing other data are someone
				// else's evidence; everything else that shares a tag counts.
				if a.layer == StackLayer::Application && a.data_ref != key {
					continue;
				}
				seen.insert(a.key.clone());
				result.push(a.clone());
			}
		}

		Ok(result)
	}

	async fn score_by_tag(&self, tag: &str, layer: &StackLayer) -> Result<Option<Score>> {
		let state = self.state.lock().unwrap();
		Ok(state
			.scores
			.iter()
			.filter(|s| s.layer == *layer && s.tag.iter().any(|t| t == tag))
			.next_back()
			.cloned())
	}

	async fn latest_score(&self, key: &str) -> Result<Option<Score>> {
		let state = self.state.lock().unwrap();
		Ok(state.latest_score_for(key).cloned())
	}

	async fn query_score_by_layer(&self, key: &str, layer: &StackLayer) -> Result<Vec<Score>> {
		let state = self.state.lock().unwrap();
		let found = match layer {
			StackLayer::CiCd => {
				// ci/cd scores are reached through the tag sets of the app
				// score describing this key.
				let app = state
					.scores
					.iter()
					.filter(|s| s.data_ref == key && s.layer == StackLayer::Application)
					.next_back();
				app.and_then(|app| {
					state
						.scores
						.iter()
						.filter(|s| {
							s.layer == StackLayer::CiCd
								&& s.tag.iter().any(|t| app.tag.contains(t))
						})
						.next_back()
				})
			}
			StackLayer::Os | StackLayer::Host => {
				// os/host scores are reached through the host field of the
				// key's annotations.
				let host = state
					.annotations
					.iter()
					.find(|a| a.data_ref == key)
					.map(|a| a.host.clone());
				host.and_then(|host| {
					state
						.scores
						.iter()
						.filter(|s| s.layer == *layer && s.tag.iter().any(|t| *t == host))
						.next_back()
				})
			}
			_ => state
				.scores
				.iter()
				.filter(|s| s.data_ref == key && s.layer == *layer)
				.next_back(),
		};
		Ok(found.cloned().into_iter().collect())
	}

	async fn fetch_hosts(&self) -> Result<Vec<String>> {
		let state = self.state.lock().unwrap();
		let mut hosts = Vec::new();
		for a in &state.annotations {
			if a.layer == StackLayer::Application && !hosts.contains(&a.host) {
				hosts.push(a.host.clone());
			}
		}
		Ok(hosts)
	}
}
