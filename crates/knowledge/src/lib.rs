//! QA knowledge base for Tradewise.
//!
//! Stores question/answer pairs with one embedding per side, searches both
//! channels independently and fuses the two rankings.

pub mod embeddings;
pub mod index;
pub mod ranker;
pub mod retriever;
pub mod types;

pub use embeddings::{create_provider, EmbeddingProvider};
pub use index::{QaIndex, SimilarityIndex};
pub use ranker::{rank, ANSWER_WEIGHT, QUESTION_WEIGHT};
pub use retriever::Retriever;
pub use types::{MatchChannel, QaPair, RankedHit, SearchChannel, SimilarityHit};
