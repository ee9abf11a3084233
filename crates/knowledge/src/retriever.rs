//! Retrieval facade: embed once, search both channels, fuse.

use crate::embeddings::EmbeddingProvider;
use crate::index::SimilarityIndex;
use crate::ranker::rank;
use crate::types::{QaPair, RankedHit, SearchChannel};
use std::sync::Arc;
use tradewise_core::AppResult;

const QA_ID_PREFIX: &str = "QA_";

/// Knowledge retrieval over an injected embedder and index.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn SimilarityIndex>,
    top_k: usize,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn SimilarityIndex>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            top_k,
        }
    }

    /// Ranked hits for a query.
    ///
    /// A query starting with `QA_` (any case) is an id lookup: it yields the
    /// single matching pair or nothing.
    pub async fn search(&self, query: &str) -> AppResult<Vec<RankedHit>> {
        let query = query.trim();

        if is_qa_id(query) {
            tracing::debug!("Resolving QA id lookup: {}", query);
            return Ok(self
                .index
                .find_by_qa_id(query)?
                .map(RankedHit::exact)
                .into_iter()
                .collect());
        }

        let embedding = self.embedder.embed(query).await?;
        let question_hits = self
            .index
            .nearest(SearchChannel::Question, &embedding, self.top_k)?;
        let answer_hits = self
            .index
            .nearest(SearchChannel::Answer, &embedding, self.top_k)?;

        let ranked = rank(&question_hits, &answer_hits, self.top_k);
        tracing::info!(
            question_hits = question_hits.len(),
            answer_hits = answer_hits.len(),
            ranked = ranked.len(),
            "Knowledge search complete"
        );
        Ok(ranked)
    }

    /// Embed both sides of a pair and store it.
    pub async fn add_pair(&self, pair: &QaPair) -> AppResult<()> {
        let embeddings = self
            .embedder
            .embed_batch(&[pair.question.clone(), pair.answer.clone()])
            .await?;
        let (question_embedding, answer_embedding) = match embeddings.as_slice() {
            [q, a] => (q, a),
            _ => {
                return Err(tradewise_core::AppError::Knowledge(format!(
                    "Expected 2 embeddings, got {}",
                    embeddings.len()
                )))
            }
        };

        self.index
            .upsert_pair(pair, question_embedding, answer_embedding)?;
        tracing::info!("Stored QA pair {}", pair.qa_id);
        Ok(())
    }

    /// Number of stored pairs.
    pub fn pair_count(&self) -> AppResult<u64> {
        self.index.count()
    }
}

fn is_qa_id(query: &str) -> bool {
    query
        .get(..QA_ID_PREFIX.len())
        .map(|prefix| prefix.eq_ignore_ascii_case(QA_ID_PREFIX))
        .unwrap_or(false)
}
