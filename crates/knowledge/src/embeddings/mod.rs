//! Embedding providers for the QA index.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
