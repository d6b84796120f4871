//! Configuration loading for the scoring services.
//!
//! Each service defines its own root configuration struct and hydrates it
//! from a JSON file through [`load`]. The shared sections — endpoints,
//! logging, streams, databases — live here so every service decodes them the
//! same way.

pub mod error;
pub mod types;

use std::path::Path;

use serde::de::DeserializeOwned;

pub use error::{ConfigError, Result};
pub use types::{
	ArangoConfig, DatabaseInfo, EdgeInfo, LoggingInfo, PubSubInfo, ServiceInfo, StreamInfo,
	TcpStreamConfig,
};

/// Load a configuration root from a file.
///
/// The format is derived from the file extension; only `json` is currently
/// supported.
pub fn load<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
	let path = path.as_ref();
	let format = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
	if format != "json" {
		return Err(ConfigError::UnsupportedFormat(format.to_string()));
	}

	let raw = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
		path: path.to_path_buf(),
		error,
	})?;
	serde_json::from_str(&raw).map_err(|error| ConfigError::Parse {
		path: path.to_path_buf(),
		error,
	})
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use serde::Deserialize;

	use super::*;

	#[derive(Debug, Deserialize)]
	struct Root {
		logging: LoggingInfo,
	}

	#[test]
	fn loads_json_root() {
		let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
		write!(file, r#"{{"logging": {{"minLogLevel": "debug"}}}}"#).unwrap();

		let root: Root = load(file.path()).unwrap();
		assert_eq!(root.logging.min_log_level, "debug");
	}

	#[test]
	fn rejects_non_json_extension() {
		let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
		let err = load::<Root>(file.path()).unwrap_err();
		assert!(matches!(err, ConfigError::UnsupportedFormat(f) if f == "toml"));
	}
}
