//! Root configuration of the ingest service.

use serde::{Deserialize, Serialize};
use veris_config::{DatabaseInfo, LoggingInfo, PubSubInfo};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestConfig {
	pub database: DatabaseInfo,
	/// Subscriber carries inbound annotations; publisher forwards affected
	/// keys to downstream calculator deployments.
	pub stream: PubSubInfo,
	#[serde(default)]
	pub logging: LoggingInfo,
}
