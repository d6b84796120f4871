//! Root configuration of the scoring service.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use veris_config::{DatabaseInfo, LoggingInfo, PubSubInfo};
use veris_policy::PolicyInfo;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringConfig {
	pub database: DatabaseInfo,
	/// Only the subscriber endpoint is used; keys arrive from the ingest
	/// service's key publisher.
	pub stream: PubSubInfo,
	pub policy: PolicyInfo,
	#[serde(default)]
	pub logging: LoggingInfo,
	#[serde(default)]
	pub engine: EngineSettings,
}

/// Tunables of the scoring engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSettings {
	/// Settling buffer slept before each score job, giving the graph writer
	/// time to finish ingesting an annotation burst. Lowering it below the
	/// debouncer window trades completeness of the first score for latency;
	/// the rescore on the next quiet window repairs the difference.
	#[serde(default = "default_latency_floor_ms")]
	pub scoring_latency_floor_ms: u64,
}

fn default_latency_floor_ms() -> u64 {
	1500
}

impl Default for EngineSettings {
	fn default() -> Self {
		Self {
			scoring_latency_floor_ms: default_latency_floor_ms(),
		}
	}
}

impl EngineSettings {
	pub fn latency_floor(&self) -> Duration {
		Duration::from_millis(self.scoring_latency_floor_ms)
	}

	/// Settings with no settling buffer, for tests driving the engine
	/// directly.
	pub fn immediate() -> Self {
		Self {
			scoring_latency_floor_ms: 0,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn latency_floor_defaults_to_1500ms() {
		let settings: EngineSettings = serde_json::from_str("{}").unwrap();
		assert_eq!(settings.latency_floor(), Duration::from_millis(1500));
	}

	#[test]
	fn latency_floor_is_configurable() {
		let settings: EngineSettings =
			serde_json::from_str(r#"{"scoringLatencyFloorMs": 250}"#).unwrap();
		assert_eq!(settings.latency_floor(), Duration::from_millis(250));
	}
}
