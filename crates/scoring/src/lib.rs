//! Scoring service.
//!
//! Reads quiescent data keys, and with bounded concurrency computes a
//! layer-aware weighted confidence per key, persisting a score vertex plus
//! scoring and stack edges. Each quiescent batch is scored at most once; a
//! failed job is simply rescored the next time new annotations close the
//! key's quiet window.

pub mod config;
pub mod debounce;
pub mod engine;
pub mod queue;
pub mod subscriber;

pub use config::{EngineSettings, ScoringConfig};
pub use debounce::{Debouncer, KeyMap, POLLING_INTERVAL, TICK_INTERVAL};
pub use engine::{Calculator, CalculatorHandler, WORKER_MAX};
pub use queue::{WorkQueue, WorkerSlot, Workers};
pub use subscriber::KeySubscriber;
