//! Declarative graph topology.
//!
//! The configuration may spell out edge definitions and vertex collections;
//! when it leaves them empty, these defaults describe the trust graph.

use veris_config::EdgeInfo;

use crate::documents::{EdgeKind, VERTEX_ANNOTATIONS, VERTEX_DATA, VERTEX_SCORES};

/// Edge definitions of the trust graph.
pub fn default_edges() -> Vec<EdgeInfo> {
	EdgeKind::all()
		.into_iter()
		.map(|kind| EdgeInfo {
			collection_name: kind.collection().to_string(),
			from: vec![kind.from_collection().to_string()],
			to: vec![kind.to_collection().to_string()],
		})
		.collect()
}

/// Vertex collections of the trust graph.
pub fn default_vertexes() -> Vec<String> {
	vec![
		VERTEX_ANNOTATIONS.to_string(),
		VERTEX_DATA.to_string(),
		VERTEX_SCORES.to_string(),
	]
}
