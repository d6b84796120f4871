//! Record model and the canonical sample projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use veris_contracts::{HashKind, derive_hash};

/// Version of the canonical sample encoding.
///
/// The fingerprint is the hash of the encoded sample projection, so any
/// change to the projection or its serialization silently breaks matching
/// against keys already in the graph. Changes must bump this version and
/// keep the old encoder around for data at rest.
pub const SAMPLE_ENCODING_VERSION: u32 = 1;

/// A user-facing record in the companion document store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
	#[serde(default)]
	pub description: String,
	pub id: String,
	#[serde(default)]
	pub seed: String,
	#[serde(default)]
	pub signature: String,
	/// Producer-formatted timestamp, part of the sample projection.
	#[serde(default)]
	pub timestamp: String,
	/// Parsed timestamp used for recency sorting only.
	#[serde(rename = "timestampiso", default = "Utc::now")]
	pub timestamp_iso: DateTime<Utc>,
	#[serde(default)]
	pub confidence: f64,
}

/// The projection of a record onto its sample fields, exactly as the
/// annotator hashed it at the edge. Empty fields are omitted to match the
/// producer encoding.
#[derive(Debug, Serialize)]
struct SampleData<'a> {
	#[serde(skip_serializing_if = "str::is_empty")]
	description: &'a str,
	#[serde(skip_serializing_if = "str::is_empty")]
	id: &'a str,
	#[serde(skip_serializing_if = "str::is_empty")]
	seed: &'a str,
	#[serde(skip_serializing_if = "str::is_empty")]
	signature: &'a str,
	#[serde(skip_serializing_if = "str::is_empty")]
	timestamp: &'a str,
}

#[derive(Debug, Error)]
pub enum FingerprintError {
	#[error("unsupported hash algorithm: {0}")]
	UnsupportedHash(String),
}

impl Record {
	/// Canonical (v1) byte encoding of the record's sample projection.
	pub fn canonical_sample_encoding(&self) -> Vec<u8> {
		let sample = SampleData {
			description: &self.description,
			id: &self.id,
			seed: &self.seed,
			signature: &self.signature,
			timestamp: &self.timestamp,
		};
		// Serialization of this struct cannot fail.
		serde_json::to_vec(&sample).expect("sample projection serializes")
	}

	/// Derive the graph key of this record's data sample.
	///
	/// SHA-256 is the only algorithm currently implemented; the config still
	/// names one so that alternate providers fail loudly instead of
	/// fingerprinting with the wrong function.
	pub fn fingerprint(&self, hash: &HashKind) -> Result<String, FingerprintError> {
		match hash {
			HashKind::Sha256 => Ok(derive_hash(&self.canonical_sample_encoding())),
			other => Err(FingerprintError::UnsupportedHash(other.as_str().to_string())),
		}
	}
}
