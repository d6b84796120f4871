//! Companion record store.
//!
//! The user-facing application reads records from a document store that the
//! pipeline does not own; the projector only needs the narrow interface
//! here: sweep unscored records, derive each record's graph fingerprint from
//! its canonical sample projection, and write the confidence back.

pub mod record;
pub mod store;

pub use record::{FingerprintError, Record, SAMPLE_ENCODING_VERSION};
pub use store::{MemoryRecords, RecordError, RecordStore, RecordsInfo, new_records};
