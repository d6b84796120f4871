//! Wire contracts shared between annotation producers and the scoring
//! pipeline.
//!
//! These types mirror what annotators put on the stream: signed, timestamped
//! claims about a piece of data, wrapped in a transport envelope. They are
//! deliberately free of any graph or storage concerns so that producers and
//! consumers only agree on this crate.

pub mod annotation;
pub mod hash;
pub mod message;

pub use annotation::{Annotation, AnnotationList, HashKind, StackLayer, KIND_SOURCE};
pub use hash::derive_hash;
pub use message::{MessageAction, PublishWrapper, SubscribeWrapper, MSG_CALCULATE_SCORE};
