//! Projector service.
//!
//! Bridges the trust graph back to the user-facing application: records
//! whose confidence is absent get the latest score of their data sample
//! copied onto them, matched through the canonical sample fingerprint.

pub mod config;
pub mod worker;

pub use config::{HashInfo, ProjectorConfig};
pub use worker::{Projector, ProjectorHandler};
