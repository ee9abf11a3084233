//! The two responders a query can be dispatched to.

use crate::error::ResponderError;
use crate::generator::{SqlDraft, SqlGenerator};
use crate::router::Responder;
use crate::synthesis::Synthesizer;
use std::sync::Arc;
use tradewise_knowledge::{RankedHit, Retriever};
use tradewise_sql::{build_chart_spec, ChartSpec, ExecutionGateway, SchemaCache, MAX_ATTEMPTS};

/// Final output of the database responder.
#[derive(Debug, Clone)]
pub struct DatabaseAnswer {
    pub text: String,

    /// Present when the gateway recommended a chart and one could be built
    pub chart: Option<ChartSpec>,

    /// Attempts used, 1..=MAX_ATTEMPTS
    pub attempts: u32,

    /// Statement that produced the answer
    pub sql: Option<String>,
}

/// Answers from the trading database through the execution gateway.
///
/// Owns the retry budget: each rejected or failed statement is fed back to
/// the generator until [`MAX_ATTEMPTS`] is spent.
pub struct DatabaseResponder {
    generator: Arc<dyn SqlGenerator>,
    gateway: ExecutionGateway,
    schema: Arc<SchemaCache>,
    synthesizer: Arc<dyn Synthesizer>,
}

impl DatabaseResponder {
    pub fn new(
        generator: Arc<dyn SqlGenerator>,
        gateway: ExecutionGateway,
        schema: Arc<SchemaCache>,
        synthesizer: Arc<dyn Synthesizer>,
    ) -> Self {
        Self {
            generator,
            gateway,
            schema,
            synthesizer,
        }
    }

    pub fn gateway(&self) -> &ExecutionGateway {
        &self.gateway
    }

    pub async fn respond(&self, question: &str) -> Result<DatabaseAnswer, ResponderError> {
        let fail = |message: String| ResponderError::new(Responder::Database, message);

        let schema = self.schema.describe().await.map_err(|e| fail(e.to_string()))?;
        let mut feedback: Option<String> = None;

        for attempt in 1..=MAX_ATTEMPTS {
            let draft = self
                .generator
                .draft(question, schema, feedback.as_deref(), attempt)
                .await
                .map_err(|e| fail(e.to_string()))?;

            let sql = match draft {
                SqlDraft::Statement(sql) => sql,
                SqlDraft::Decline(text) => {
                    tracing::debug!(attempt, "Generator answered without a statement");
                    return Ok(DatabaseAnswer {
                        text,
                        chart: None,
                        attempts: attempt,
                        sql: None,
                    });
                }
            };

            tracing::debug!(attempt, sql = %sql, "Executing candidate statement");
            let result = self.gateway.execute(&sql, question, attempt).await;
            if !result.is_success() {
                feedback = Some(result.feedback());
                continue;
            }

            let text = self
                .synthesizer
                .answer_from_results(question, &result.feedback(), result.visualization_recommended)
                .await
                .map_err(|e| fail(e.to_string()))?;

            let chart = result
                .full_rows
                .as_ref()
                .and_then(|rows| build_chart_spec(rows, question));

            return Ok(DatabaseAnswer {
                text,
                chart,
                attempts: attempt,
                sql: Some(sql),
            });
        }

        let last = feedback.unwrap_or_default();
        tracing::warn!("Database responder gave up after {} attempts", MAX_ATTEMPTS);
        Err(fail(format!(
            "Query failed after {} attempts. Last error: {}",
            MAX_ATTEMPTS, last
        )))
    }
}

/// Answers from the Q&A knowledge base. Returns ranked hits, never text.
#[derive(Clone)]
pub struct RetrievalResponder {
    retriever: Retriever,
}

impl RetrievalResponder {
    pub fn new(retriever: Retriever) -> Self {
        Self { retriever }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub async fn respond(&self, question: &str) -> Result<Vec<RankedHit>, ResponderError> {
        let hits = self
            .retriever
            .search(question)
            .await
            .map_err(|e| ResponderError::new(Responder::Retrieval, e.to_string()))?;
        tracing::debug!("Retrieval responder found {} hits", hits.len());
        Ok(hits)
    }
}
