//! Record store interface and the in-process engine.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::Record;

/// Record store section of a service configuration, selected by the `type`
/// discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RecordsInfo {
	/// Process-local store, for tests and single-binary demos.
	Memory,
}

/// Build the record store selected by the records discriminator.
pub fn new_records(info: &RecordsInfo) -> Arc<dyn RecordStore> {
	match info {
		RecordsInfo::Memory => Arc::new(MemoryRecords::new()),
	}
}

/// Errors raised by a record store engine.
#[derive(Debug, Error)]
pub enum RecordError {
	#[error("record {0} not found")]
	NotFound(String),

	#[error("record store operation failed: {0}")]
	Engine(String),
}

pub type Result<T> = std::result::Result<T, RecordError>;

/// Operations the projector and the read API run against the record store.
#[async_trait]
pub trait RecordStore: Send + Sync {
	/// Records whose confidence has not been populated yet.
	async fn find_unscored(&self) -> Result<Vec<Record>>;

	async fn find_by_id(&self, id: &str) -> Result<Record>;

	/// Persist the record identified by its `id`.
	async fn update(&self, record: &Record) -> Result<()>;

	async fn count_all(&self) -> Result<u64>;

	/// The `n` most recent records, newest first.
	async fn find_recent(&self, n: usize) -> Result<Vec<Record>>;
}

/// Process-local record store for tests and single-binary demos.
#[derive(Debug, Default)]
pub struct MemoryRecords {
	records: Mutex<Vec<Record>>,
}

impl MemoryRecords {
	pub fn new() -> Self {
		Self::default()
	}

	/// Seed a record, replacing any existing one with the same id.
	pub fn insert(&self, record: Record) {
		let mut records = self.records.lock().unwrap();
		if let Some(existing) = records.iter_mut().find(|r| r.id == record.id) {
			*existing = record;
		} else {
			records.push(record);
		}
	}
}

#[async_trait]
impl RecordStore for MemoryRecords {
	async fn find_unscored(&self) -> Result<Vec<Record>> {
		let records = self.records.lock().unwrap();
		Ok(records.iter().filter(|r| r.confidence == 0.0).cloned().collect())
	}

	async fn find_by_id(&self, id: &str) -> Result<Record> {
		let records = self.records.lock().unwrap();
		records
			.iter()
			.find(|r| r.id == id)
			.cloned()
			.ok_or_else(|| RecordError::NotFound(id.to_string()))
	}

	async fn update(&self, record: &Record) -> Result<()> {
		let mut records = self.records.lock().unwrap();
		match records.iter_mut().find(|r| r.id == record.id) {
			Some(existing) => {
				*existing = record.clone();
				Ok(())
			}
			None => Err(RecordError::NotFound(record.id.clone())),
		}
	}

	async fn count_all(&self) -> Result<u64> {
		Ok(self.records.lock().unwrap().len() as u64)
	}

	async fn find_recent(&self, n: usize) -> Result<Vec<Record>> {
		let records = self.records.lock().unwrap();
		let mut sorted: Vec<Record> = records.clone();
		sorted.sort_by(|a, b| b.timestamp_iso.cmp(&a.timestamp_iso));
		sorted.truncate(n);
		Ok(sorted)
	}
}
