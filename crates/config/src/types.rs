//! Shared configuration sections.
//!
//! Polymorphic sections (database, stream) are adjacently tagged: the `type`
//! field selects the variant and `config` carries the variant payload. serde
//! decodes the discriminator first and the payload second, so an unknown
//! discriminator fails the whole load rather than producing a half-typed
//! section.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Network endpoint of a collaborating service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
	#[serde(default = "default_protocol")]
	pub protocol: String,
	pub host: String,
	pub port: u16,
}

fn default_protocol() -> String {
	"http".to_string()
}

impl ServiceInfo {
	/// Full URI of the endpoint, e.g. `http://localhost:8529`.
	pub fn uri(&self) -> String {
		format!("{}://{}:{}", self.protocol, self.host, self.port)
	}

	/// Bare `host:port` address, for raw socket transports.
	pub fn addr(&self) -> String {
		format!("{}:{}", self.host, self.port)
	}
}

/// Logging section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingInfo {
	#[serde(default)]
	pub min_log_level: String,
}

impl LoggingInfo {
	/// Resolve the configured level, defaulting to INFO when unset.
	pub fn level(&self) -> Result<tracing::Level, ConfigError> {
		match self.min_log_level.to_ascii_lowercase().as_str() {
			"" | "info" => Ok(tracing::Level::INFO),
			"trace" => Ok(tracing::Level::TRACE),
			"debug" => Ok(tracing::Level::DEBUG),
			"warn" | "warning" => Ok(tracing::Level::WARN),
			"error" => Ok(tracing::Level::ERROR),
			other => Err(ConfigError::InvalidLogLevel(other.to_string())),
		}
	}
}

/// Message stream endpoint, selected by the `type` discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "lowercase")]
pub enum StreamInfo {
	/// Newline-delimited JSON frames over TCP.
	Tcp(TcpStreamConfig),
	/// In-process test transport; publishes are dropped, subscriptions emit
	/// canned traffic.
	Mock,
}

/// Configuration for the TCP stream transport.
///
/// A subscriber binds and listens on the endpoint; a publisher connects to
/// it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TcpStreamConfig {
	pub provider: ServiceInfo,
}

/// Publisher/subscriber endpoint pair for one service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PubSubInfo {
	#[serde(default)]
	pub publisher: Option<StreamInfo>,
	#[serde(default)]
	pub subscriber: Option<StreamInfo>,
}

impl PubSubInfo {
	pub fn publisher(&self) -> Result<&StreamInfo, ConfigError> {
		self.publisher.as_ref().ok_or(ConfigError::MissingSection("stream.publisher"))
	}

	pub fn subscriber(&self) -> Result<&StreamInfo, ConfigError> {
		self.subscriber.as_ref().ok_or(ConfigError::MissingSection("stream.subscriber"))
	}
}

/// Graph database endpoint, selected by the `type` discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "lowercase")]
pub enum DatabaseInfo {
	/// ArangoDB over its HTTP API.
	Arango(ArangoConfig),
	/// Process-local graph engine, for tests and single-binary demos.
	Memory,
}

/// ArangoDB connection and graph topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArangoConfig {
	pub database_name: String,
	pub graph_name: String,
	pub provider: ServiceInfo,
	/// Edge definitions of the graph. Declarative so that startup can create
	/// or validate the schema without hard-coding topology in the client.
	#[serde(default)]
	pub edges: Vec<EdgeInfo>,
	/// Vertex collections only require the relevant collection names.
	#[serde(default)]
	pub vertexes: Vec<String>,
}

/// One edge collection definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeInfo {
	pub collection_name: String,
	#[serde(default)]
	pub from: Vec<String>,
	#[serde(default)]
	pub to: Vec<String>,
}
