//! Annotation wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Annotation kind marking the predecessor reference in a `mutate` message.
pub const KIND_SOURCE: &str = "source";

/// Position of an annotation in the trust stack.
///
/// Application and OS are composite layers: their confidence aggregates the
/// layers underneath them. Anything else is a leaf. The set is open on the
/// wire, so unknown values are carried verbatim rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StackLayer {
	Application,
	Os,
	Host,
	CiCd,
	Other(String),
}

impl StackLayer {
	/// Whether scores at this layer are influenced by lower-layer scores.
	pub fn is_composite(&self) -> bool {
		matches!(self, StackLayer::Application | StackLayer::Os)
	}

	pub fn as_str(&self) -> &str {
		match self {
			StackLayer::Application => "application",
			StackLayer::Os => "os",
			StackLayer::Host => "host",
			StackLayer::CiCd => "cicd",
			StackLayer::Other(s) => s,
		}
	}
}

impl From<String> for StackLayer {
	fn from(value: String) -> Self {
		match value.as_str() {
			"application" => StackLayer::Application,
			"os" => StackLayer::Os,
			"host" => StackLayer::Host,
			"cicd" | "ci/cd" => StackLayer::CiCd,
			_ => StackLayer::Other(value),
		}
	}
}

impl From<StackLayer> for String {
	fn from(value: StackLayer) -> Self {
		value.as_str().to_string()
	}
}

impl std::fmt::Display for StackLayer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Identifier of the hash algorithm used to fingerprint the annotated data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HashKind {
	Sha256,
	Md5,
	None,
	Other(String),
}

impl HashKind {
	pub fn as_str(&self) -> &str {
		match self {
			HashKind::Sha256 => "sha256",
			HashKind::Md5 => "md5",
			HashKind::None => "none",
			HashKind::Other(s) => s,
		}
	}
}

impl From<String> for HashKind {
	fn from(value: String) -> Self {
		match value.as_str() {
			"sha256" => HashKind::Sha256,
			"md5" => HashKind::Md5,
			"none" | "" => HashKind::None,
			_ => HashKind::Other(value),
		}
	}
}

impl From<HashKind> for String {
	fn from(value: HashKind) -> Self {
		value.as_str().to_string()
	}
}

impl Default for HashKind {
	fn default() -> Self {
		HashKind::None
	}
}

/// A single claim made by an annotator about a piece of data.
///
/// `id` is assigned by the producer (a ULID on the wire) and is carried as an
/// opaque string; `key` is the fingerprint of the data sample the claim is
/// about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
	pub id: String,
	pub key: String,
	#[serde(default)]
	pub hash: HashKind,
	#[serde(default)]
	pub host: String,
	#[serde(default)]
	pub tag: String,
	pub layer: StackLayer,
	pub kind: String,
	#[serde(default)]
	pub signature: String,
	#[serde(default)]
	pub is_satisfied: bool,
	#[serde(default = "Utc::now")]
	pub timestamp: DateTime<Utc>,
}

impl Annotation {
	/// Whether this item is the predecessor marker of a `mutate` message.
	pub fn is_source(&self) -> bool {
		self.kind == KIND_SOURCE
	}
}

/// Batch of annotations sharing a single transport envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationList {
	pub items: Vec<Annotation>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn layer_roundtrip() {
		for (text, layer) in [
			("application", StackLayer::Application),
			("os", StackLayer::Os),
			("host", StackLayer::Host),
			("cicd", StackLayer::CiCd),
		] {
			let parsed: StackLayer = serde_json::from_value(serde_json::json!(text)).unwrap();
			assert_eq!(parsed, layer);
			assert_eq!(serde_json::to_value(&parsed).unwrap(), serde_json::json!(text));
		}
	}

	#[test]
	fn layer_accepts_unknown_values() {
		let parsed: StackLayer = serde_json::from_value(serde_json::json!("firmware")).unwrap();
		assert_eq!(parsed, StackLayer::Other("firmware".to_string()));
		assert!(!parsed.is_composite());
	}

	#[test]
	fn cicd_alias() {
		let parsed: StackLayer = serde_json::from_value(serde_json::json!("ci/cd")).unwrap();
		assert_eq!(parsed, StackLayer::CiCd);
	}

	#[test]
	fn annotation_deserializes_camel_case() {
		let a: Annotation = serde_json::from_str(
			r#"{
				"id": "01HQXW8Y4N3T5V6B7C8D9E0F1G",
				"key": "abc123",
				"hash": "sha256",
				"host": "node-1",
				"tag": "build-77",
				"layer": "host",
				"kind": "tpm",
				"signature": "sig",
				"isSatisfied": true,
				"timestamp": "2024-03-01T12:00:00Z"
			}"#,
		)
		.unwrap();
		assert!(a.is_satisfied);
		assert_eq!(a.layer, StackLayer::Host);
		assert_eq!(a.hash, HashKind::Sha256);
		assert!(!a.is_source());
	}
}
