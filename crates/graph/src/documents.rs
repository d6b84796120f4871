//! Graph document model.
//!
//! Three vertex collections (`data`, `annotations`, `scores`) and four edge
//! collections (`trust`, `lineage`, `scoring`, `stack`). Document keys map to
//! the engine's `_key` attribute; edge endpoints are `collection/key`
//! handles.

use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::timestamp::context::ContextV7;
use uuid::{Timestamp, Uuid};
use veris_contracts::{Annotation, HashKind, StackLayer};
use veris_policy::WeightPolicy;

pub const VERTEX_DATA: &str = "data";
pub const VERTEX_ANNOTATIONS: &str = "annotations";
pub const VERTEX_SCORES: &str = "scores";

/// The four edge collections and their endpoint vertex collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
	/// Data → Annotation, one per annotation.
	Trust,
	/// Data (successor) → Data (predecessor), created on mutate.
	Lineage,
	/// Score → Data it scores.
	Scoring,
	/// Lower-layer Score → upper-layer Score it influenced.
	Stack,
}

impl EdgeKind {
	pub fn collection(&self) -> &'static str {
		match self {
			EdgeKind::Trust => "trust",
			EdgeKind::Lineage => "lineage",
			EdgeKind::Scoring => "scoring",
			EdgeKind::Stack => "stack",
		}
	}

	pub fn from_collection(&self) -> &'static str {
		match self {
			EdgeKind::Trust | EdgeKind::Lineage => VERTEX_DATA,
			EdgeKind::Scoring | EdgeKind::Stack => VERTEX_SCORES,
		}
	}

	pub fn to_collection(&self) -> &'static str {
		match self {
			EdgeKind::Trust => VERTEX_ANNOTATIONS,
			EdgeKind::Lineage => VERTEX_DATA,
			EdgeKind::Scoring => VERTEX_DATA,
			EdgeKind::Stack => VERTEX_SCORES,
		}
	}

	pub fn all() -> [EdgeKind; 4] {
		[EdgeKind::Trust, EdgeKind::Lineage, EdgeKind::Scoring, EdgeKind::Stack]
	}
}

impl std::fmt::Display for EdgeKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.collection())
	}
}

/// A document in one of the edge collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDoc {
	#[serde(rename = "_from")]
	pub from: String,
	#[serde(rename = "_to")]
	pub to: String,
}

impl EdgeDoc {
	/// Build the edge document for `kind`, prefixing both keys with their
	/// vertex collections.
	pub fn new(kind: EdgeKind, from_key: &str, to_key: &str) -> Self {
		Self {
			from: format!("{}/{}", kind.from_collection(), from_key),
			to: format!("{}/{}", kind.to_collection(), to_key),
		}
	}
}

/// A document in the `data` vertex collection.
///
/// Created on first mention by any annotation, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Data {
	#[serde(rename = "_key")]
	pub key: String,
	pub timestamp: DateTime<Utc>,
}

/// A document in the `annotations` vertex collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationDoc {
	/// Producer-assigned annotation id.
	#[serde(rename = "_key")]
	pub key: String,
	/// Key of the data being annotated.
	pub data_ref: String,
	pub hash: HashKind,
	pub host: String,
	/// Hash of the source artifact tag that emitted the annotated data.
	pub tag: String,
	pub layer: StackLayer,
	pub kind: String,
	pub signature: String,
	pub is_satisfied: bool,
	pub timestamp: DateTime<Utc>,
}

impl From<Annotation> for AnnotationDoc {
	fn from(a: Annotation) -> Self {
		Self {
			key: a.id,
			data_ref: a.key,
			hash: a.hash,
			host: a.host,
			tag: a.tag,
			layer: a.layer,
			kind: a.kind,
			signature: a.signature,
			is_satisfied: a.is_satisfied,
			timestamp: a.timestamp,
		}
	}
}

/// A document in the `scores` vertex collection. Append-only: every
/// (re)calculation mints a new document under a fresh time-ordered key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
	#[serde(rename = "_key")]
	pub key: Uuid,
	pub data_ref: String,
	/// Number of satisfied annotations considered.
	pub passed: u32,
	/// Total number of annotations considered.
	pub count: u32,
	pub policy: String,
	pub confidence: f64,
	pub timestamp: DateTime<Utc>,
	/// Distinct tag values observed across the annotations, in order of
	/// first appearance.
	pub tag: Vec<String>,
	pub layer: StackLayer,
}

// Shared v7 context so that keys minted within the same millisecond still
// sort in mint order.
static KEY_CONTEXT: LazyLock<Mutex<ContextV7>> = LazyLock::new(|| Mutex::new(ContextV7::new()));

impl Score {
	/// Mint a fresh time-ordered score key.
	pub fn mint_key() -> Uuid {
		Uuid::new_v7(Timestamp::now(&*KEY_CONTEXT))
	}

	/// Compute a confidence score over a set of annotations.
	///
	/// `tag_scores` and `host_scores` carry the lower-layer scores resolved
	/// for the annotations' `tag` and `host` fields; entries that could not
	/// be resolved are simply absent and contribute nothing. Returns `None`
	/// when there is nothing to score.
	pub fn compute(
		data_ref: &str,
		annotations: &[AnnotationDoc],
		policy: &WeightPolicy,
		tag_scores: &HashMap<String, Score>,
		host_scores: &HashMap<String, Score>,
	) -> Option<Score> {
		if annotations.is_empty() {
			return None;
		}

		// All direct annotations for a key share a layer by construction.
		let layer = annotations[0].layer.clone();

		let mut tags: Vec<String> = Vec::new();
		for a in annotations {
			if !tags.contains(&a.tag) {
				tags.push(a.tag.clone());
			}
		}

		let mut total_weight = 0.0_f64;
		let mut passed_weight = 0.0_f64;
		let mut passed = 0_u32;
		let mut total_tag_confidence = 0.0_f64;
		let mut total_host_confidence = 0.0_f64;

		for a in annotations {
			let weight = f64::from(policy.fetch_weight(&a.kind));
			total_weight += weight;
			if a.is_satisfied {
				passed += 1;
				passed_weight += weight;
			}

			if let Some(score) = tag_scores.get(&a.tag) {
				total_tag_confidence += score.confidence;
			}
			if let Some(score) = host_scores.get(&a.host) {
				total_host_confidence += score.confidence;
			}
		}

		if total_weight == 0.0 {
			return None;
		}

		let average_tag_confidence = total_tag_confidence / annotations.len() as f64;
		let average_host_confidence = total_host_confidence / annotations.len() as f64;

		// Lower layers influence the result only when they actually produced
		// a confidence; missing lower evidence carries no penalty.
		let mut confidence = passed_weight / total_weight;
		if average_tag_confidence > 0.0 {
			confidence *= average_tag_confidence;
		}
		if average_host_confidence > 0.0 {
			confidence *= average_host_confidence;
		}
		confidence = (confidence * 100.0).round() / 100.0;

		Some(Score {
			key: Score::mint_key(),
			data_ref: data_ref.to_string(),
			passed,
			count: annotations.len() as u32,
			policy: policy.name.clone(),
			confidence,
			timestamp: Utc::now(),
			tag: tags,
			layer,
		})
	}
}

#[cfg(test)]
mod tests {
	use veris_policy::Weight;

	use super::*;

	fn annotation(id: &str, key: &str, layer: StackLayer, kind: &str, satisfied: bool) -> AnnotationDoc {
		AnnotationDoc {
			key: id.to_string(),
			data_ref: key.to_string(),
			hash: HashKind::Sha256,
			host: String::new(),
			tag: String::new(),
			layer,
			kind: kind.to_string(),
			signature: String::new(),
			is_satisfied: satisfied,
			timestamp: Utc::now(),
		}
	}

	fn policy(weights: &[(&str, u32)]) -> WeightPolicy {
		WeightPolicy {
			name: "default".to_string(),
			weights: weights
				.iter()
				.map(|(k, v)| Weight {
					annotation_key: k.to_string(),
					value: *v,
				})
				.collect(),
		}
	}

	#[test]
	fn weighted_leaf_confidence() {
		let annotations = vec![
			annotation("a1", "K", StackLayer::Host, "tpm", true),
			annotation("a2", "K", StackLayer::Host, "tls", false),
		];
		let score = Score::compute(
			"K",
			&annotations,
			&policy(&[("tpm", 5), ("tls", 3)]),
			&HashMap::new(),
			&HashMap::new(),
		)
		.unwrap();

		assert_eq!(score.passed, 1);
		assert_eq!(score.count, 2);
		assert_eq!(score.confidence, 0.63);
		assert_eq!(score.layer, StackLayer::Host);
		assert_eq!(score.tag, vec![String::new()]);
	}

	#[test]
	fn lower_layer_confidence_influences_composite_score() {
		let mut a = annotation("a1", "K", StackLayer::Application, "src", true);
		a.tag = "T".to_string();
		a.host = "H".to_string();

		let cicd = Score {
			key: Score::mint_key(),
			data_ref: "pipeline".to_string(),
			passed: 4,
			count: 5,
			policy: "default".to_string(),
			confidence: 0.80,
			timestamp: Utc::now(),
			tag: vec!["T".to_string()],
			layer: StackLayer::CiCd,
		};
		let tag_scores = HashMap::from([("T".to_string(), cicd)]);

		let score = Score::compute(
			"K",
			&[a],
			&policy(&[("src", 10)]),
			&tag_scores,
			&HashMap::new(),
		)
		.unwrap();

		// localConfidence 1.0, tagFactor 0.8, hostFactor absent.
		assert_eq!(score.confidence, 0.80);
	}

	#[test]
	fn unknown_kinds_default_to_weight_one() {
		let annotations = vec![
			annotation("a1", "K", StackLayer::Host, "novel", true),
			annotation("a2", "K", StackLayer::Host, "exotic", true),
		];
		let score = Score::compute("K", &annotations, &policy(&[]), &HashMap::new(), &HashMap::new())
			.unwrap();
		assert_eq!(score.confidence, 1.0);
	}

	#[test]
	fn empty_annotations_yield_no_score() {
		assert!(Score::compute("K", &[], &policy(&[]), &HashMap::new(), &HashMap::new()).is_none());
	}

	#[test]
	fn confidence_rounds_to_two_decimals() {
		let annotations = vec![
			annotation("a1", "K", StackLayer::Host, "x", true),
			annotation("a2", "K", StackLayer::Host, "x", false),
			annotation("a3", "K", StackLayer::Host, "x", false),
		];
		let score = Score::compute("K", &annotations, &policy(&[]), &HashMap::new(), &HashMap::new())
			.unwrap();
		// 1/3 rounds half away from zero.
		assert_eq!(score.confidence, 0.33);
	}

	#[test]
	fn distinct_tags_keep_first_appearance_order() {
		let mut a1 = annotation("a1", "K", StackLayer::Host, "x", true);
		a1.tag = "beta".to_string();
		let mut a2 = annotation("a2", "K", StackLayer::Host, "x", true);
		a2.tag = "alpha".to_string();
		let mut a3 = annotation("a3", "K", StackLayer::Host, "x", true);
		a3.tag = "beta".to_string();

		let score = Score::compute("K", &[a1, a2, a3], &policy(&[]), &HashMap::new(), &HashMap::new())
			.unwrap();
		assert_eq!(score.tag, vec!["beta".to_string(), "alpha".to_string()]);
	}

	#[test]
	fn score_keys_are_time_ordered() {
		let a = vec![annotation("a1", "K", StackLayer::Host, "x", true)];
		let p = policy(&[]);
		let first = Score::compute("K", &a, &p, &HashMap::new(), &HashMap::new()).unwrap();
		let second = Score::compute("K", &a, &p, &HashMap::new(), &HashMap::new()).unwrap();
		assert!(second.key > first.key);
	}
}
