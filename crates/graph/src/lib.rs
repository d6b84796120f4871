//! Trust graph model and engines.
//!
//! The graph links data vertices to the annotations describing them, to
//! related data (lineage), and to their computed confidence scores. Scores
//! at composite layers reference the lower-layer scores that influenced them
//! through `stack` edges. Consumers treat "latest" as "largest key": score
//! keys are minted time-ordered and prior versions are retained.

pub mod arango;
pub mod documents;
pub mod factory;
pub mod memory;
pub mod schema;
pub mod store;

pub use arango::ArangoGraph;
pub use documents::{
	AnnotationDoc, Data, EdgeDoc, EdgeKind, Score, VERTEX_ANNOTATIONS, VERTEX_DATA, VERTEX_SCORES,
};
pub use factory::new_graph;
pub use memory::MemoryGraph;
pub use store::{GraphError, GraphStore};
