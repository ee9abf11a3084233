//! Statement generation for the database responder.

use crate::prompting::request_for;
use async_trait::async_trait;
use std::sync::Arc;
use tradewise_core::AppResult;
use tradewise_llm::{generate, Generation, LlmClient, ToolSpec};
use tradewise_prompt::PromptLibrary;

pub const EXECUTE_TOOL: &str = "validate_and_execute";

/// What the generator produced for one attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlDraft {
    /// A statement to send through the gateway
    Statement(String),

    /// The model answered without a statement (e.g. the question cannot be
    /// expressed against the table)
    Decline(String),
}

/// Produces candidate statements; `feedback` carries the gateway's message
/// from the previous attempt.
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    async fn draft(
        &self,
        question: &str,
        schema: &str,
        feedback: Option<&str>,
        attempt: u32,
    ) -> AppResult<SqlDraft>;
}

/// Generator backed by the `sql.generate` prompt and the execute tool.
pub struct LlmSqlGenerator {
    client: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
    model: String,
    table: String,
}

impl LlmSqlGenerator {
    pub fn new(
        client: Arc<dyn LlmClient>,
        prompts: Arc<PromptLibrary>,
        model: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            client,
            prompts,
            model: model.into(),
            table: table.into(),
        }
    }

    fn tool() -> ToolSpec {
        ToolSpec::new(EXECUTE_TOOL, "Validate and run one read-only SELECT statement")
            .with_parameter("sql_query", "The SELECT statement to run")
    }
}

#[async_trait]
impl SqlGenerator for LlmSqlGenerator {
    async fn draft(
        &self,
        question: &str,
        schema: &str,
        feedback: Option<&str>,
        attempt: u32,
    ) -> AppResult<SqlDraft> {
        let request = request_for(
            &self.prompts,
            "sql.generate",
            &[
                ("table", self.table.clone()),
                ("schema", schema.to_string()),
                ("question", question.to_string()),
                ("feedback", feedback.unwrap_or_default().to_string()),
                ("attempt", attempt.saturating_sub(1).to_string()),
            ],
            &self.model,
        )?;

        match generate(self.client.as_ref(), &request, &[Self::tool()]).await? {
            // a missing argument still goes to the gateway, which rejects it
            Generation::ToolCall(call) => Ok(SqlDraft::Statement(
                call.argument("sql_query").unwrap_or_default().trim().to_string(),
            )),
            Generation::Text(text) => Ok(SqlDraft::Decline(text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradewise_llm::MockLlmClient;

    fn generator(client: Arc<MockLlmClient>) -> LlmSqlGenerator {
        LlmSqlGenerator::new(
            client,
            Arc::new(PromptLibrary::builtin().unwrap()),
            "llama3.2",
            "forex_trades",
        )
    }

    #[tokio::test]
    async fn test_tool_call_becomes_statement() {
        let client = Arc::new(MockLlmClient::scripted([
            r#"{"tool": "validate_and_execute", "arguments": {"sql_query": " SELECT SUM(\"Daily_PnL\") FROM forex_trades "}}"#,
        ]));
        let draft = generator(client.clone())
            .draft("total profit", "TABLE: forex_trades", None, 1)
            .await
            .unwrap();

        assert_eq!(
            draft,
            SqlDraft::Statement("SELECT SUM(\"Daily_PnL\") FROM forex_trades".to_string())
        );
        let request = &client.requests()[0];
        assert!(request.prompt.contains("QUESTION: total profit"));
        assert!(!request.prompt.contains("was rejected"));
    }

    #[tokio::test]
    async fn test_feedback_included_on_retry() {
        let client = Arc::new(MockLlmClient::scripted([
            r#"{"tool": "validate_and_execute", "arguments": {"sql_query": "SELECT 1 FROM forex_trades"}}"#,
        ]));
        generator(client.clone())
            .draft("total profit", "schema", Some("INTENT_VIOLATION: Total query needs SUM()."), 2)
            .await
            .unwrap();

        let prompt = &client.requests()[0].prompt;
        assert!(prompt.contains("Attempt 1 was rejected"));
        assert!(prompt.contains("Total query needs SUM()."));
    }

    #[tokio::test]
    async fn test_plain_text_is_decline() {
        let client = Arc::new(MockLlmClient::scripted(["That data is not in the table."]));
        let draft = generator(client)
            .draft("what is the weather", "schema", None, 1)
            .await
            .unwrap();
        assert_eq!(draft, SqlDraft::Decline("That data is not in the table.".to_string()));
    }
}
