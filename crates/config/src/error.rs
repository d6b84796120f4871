//! Error types for configuration loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading configuration.
///
/// All of these are fatal at startup; nothing in the pipeline starts from a
/// configuration it could not fully decode.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("I/O error reading {path}: {error}")]
	Io {
		path: PathBuf,
		error: std::io::Error,
	},

	#[error("JSON parse error in {path}: {error}")]
	Parse {
		path: PathBuf,
		error: serde_json::Error,
	},

	#[error("unsupported configuration format: {0} (expected 'json')")]
	UnsupportedFormat(String),

	#[error("missing required section: {0}")]
	MissingSection(&'static str),

	#[error("invalid log level: {0}")]
	InvalidLogLevel(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
