//! Root configuration of the projector service.

use serde::{Deserialize, Serialize};
use veris_config::{DatabaseInfo, LoggingInfo};
use veris_contracts::HashKind;
use veris_records::RecordsInfo;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectorConfig {
	/// Graph engine holding the scores.
	pub database: DatabaseInfo,
	/// Companion record store serving the user-facing application.
	pub records: RecordsInfo,
	#[serde(default)]
	pub hash: HashInfo,
	#[serde(default)]
	pub logging: LoggingInfo,
}

/// Hash algorithm used to derive record fingerprints. Must match what the
/// annotator ecosystem hashes with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashInfo {
	#[serde(rename = "type")]
	pub kind: HashKind,
}

impl Default for HashInfo {
	fn default() -> Self {
		Self {
			kind: HashKind::Sha256,
		}
	}
}
