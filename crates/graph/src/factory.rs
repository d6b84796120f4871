//! Graph engine selection from configuration.

use std::sync::Arc;

use veris_config::DatabaseInfo;

use crate::arango::ArangoGraph;
use crate::memory::MemoryGraph;
use crate::store::GraphStore;

/// Build the graph engine selected by the database discriminator.
pub fn new_graph(info: &DatabaseInfo) -> Arc<dyn GraphStore> {
	match info {
		DatabaseInfo::Arango(cfg) => Arc::new(ArangoGraph::new(cfg.clone())),
		DatabaseInfo::Memory => Arc::new(MemoryGraph::new()),
	}
}
