pub mod extract;
pub mod gate;
pub mod normalize;
pub mod persist;
pub mod pipeline;
pub mod queue;
pub mod recovery;
pub mod rules;
pub mod store;
pub mod text;

pub use pipeline::{Outcome, Pipeline};
pub use queue::Ingestor;
pub use store::{MemoryStore, PgStore, SimilarityStore};
