//! Answer synthesis.

use crate::prompting::request_for;
use async_trait::async_trait;
use std::sync::Arc;
use tradewise_core::{AppError, AppResult};
use tradewise_knowledge::RankedHit;
use tradewise_llm::{generate, Generation, LlmClient};
use tradewise_prompt::PromptLibrary;

pub const NO_INFORMATION: &str = "I don't have that information in my knowledge base.";

/// Turns responder output into user-facing text.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Short answer from an execution preview.
    async fn answer_from_results(
        &self,
        question: &str,
        results: &str,
        chart: bool,
    ) -> AppResult<String>;

    /// Direct answer from ranked knowledge hits. Never the hits verbatim.
    async fn condense(&self, question: &str, hits: &[RankedHit]) -> AppResult<String>;

    /// One answer from both responders' outputs.
    async fn combine(&self, question: &str, database: &str, knowledge: &str) -> AppResult<String>;
}

/// Numbered question/answer listing of hits.
pub fn format_hits(hits: &[RankedHit]) -> String {
    if hits.is_empty() {
        return "No relevant information found in knowledge base.".to_string();
    }

    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "[{}] Question: {}\n    Answer: {}",
                i + 1,
                hit.question,
                hit.answer
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Synthesizer backed by the `sql.answer`, `retrieval.synthesize` and
/// `router.combine` prompts.
pub struct LlmSynthesizer {
    client: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
    model: String,
}

impl LlmSynthesizer {
    pub fn new(
        client: Arc<dyn LlmClient>,
        prompts: Arc<PromptLibrary>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            prompts,
            model: model.into(),
        }
    }

    async fn complete(&self, id: &str, variables: &[(&str, String)]) -> AppResult<String> {
        let request = request_for(&self.prompts, id, variables, &self.model)?;
        let text = match generate(self.client.as_ref(), &request, &[]).await? {
            Generation::Text(text) => text,
            Generation::ToolCall(call) => {
                return Err(AppError::Llm(format!(
                    "Unexpected tool call '{}' during synthesis",
                    call.name
                )))
            }
        };

        if text.is_empty() {
            return Err(AppError::Llm(format!("Empty completion for prompt '{}'", id)));
        }
        Ok(text)
    }
}

#[async_trait]
impl Synthesizer for LlmSynthesizer {
    async fn answer_from_results(
        &self,
        question: &str,
        results: &str,
        chart: bool,
    ) -> AppResult<String> {
        self.complete(
            "sql.answer",
            &[
                ("question", question.to_string()),
                ("results", results.to_string()),
                ("chart", if chart { "true" } else { "" }.to_string()),
            ],
        )
        .await
    }

    async fn condense(&self, question: &str, hits: &[RankedHit]) -> AppResult<String> {
        if hits.is_empty() {
            return Ok(NO_INFORMATION.to_string());
        }

        self.complete(
            "retrieval.synthesize",
            &[
                ("question", question.to_string()),
                ("results", format_hits(hits)),
            ],
        )
        .await
    }

    async fn combine(&self, question: &str, database: &str, knowledge: &str) -> AppResult<String> {
        self.complete(
            "router.combine",
            &[
                ("question", question.to_string()),
                ("database", database.to_string()),
                ("knowledge", knowledge.to_string()),
            ],
        )
        .await
    }
}
