//! LLM-backed chart advisor.

use crate::prompting::request_for;
use async_trait::async_trait;
use std::sync::Arc;
use tradewise_core::AppResult;
use tradewise_llm::LlmClient;
use tradewise_prompt::PromptLibrary;
use tradewise_sql::{ChartAdvisor, ResultSet};

/// Asks the model a YES/NO question about charting a result set.
pub struct LlmChartAdvisor {
    client: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
    model: String,
}

impl LlmChartAdvisor {
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
}

#[async_trait]
impl ChartAdvisor for LlmChartAdvisor {
    async fn advise(&self, intent: &str, rows: &ResultSet) -> AppResult<bool> {
        let request = request_for(
            &self.prompts,
            "chart.advisor",
            &[
                ("question", intent.to_string()),
                ("rows", rows.len().to_string()),
                ("columns", rows.columns.join(", ")),
            ],
            &self.model,
        )?;

        let response = self.client.complete(&request).await?;
        Ok(response.content.to_uppercase().contains("YES"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tradewise_llm::MockLlmClient;
    use tradewise_sql::VisualizationPolicy;

    fn rows() -> ResultSet {
        ResultSet::new(
            vec!["Symbol".into(), "PnL".into()],
            vec![vec![json!("EURUSD"), json!(3)], vec![json!("GBPUSD"), json!(-1)]],
        )
    }

    fn advisor(client: Arc<MockLlmClient>) -> LlmChartAdvisor {
        LlmChartAdvisor::new(client, Arc::new(PromptLibrary::builtin().unwrap()), "llama3.2")
    }

    #[tokio::test]
    async fn test_yes_and_no() {
        let client = Arc::new(MockLlmClient::scripted(["Yes.", "NO"]));
        let advisor = advisor(client.clone());

        assert!(advisor.advise("pnl per symbol", &rows()).await.unwrap());
        assert!(!advisor.advise("pnl per symbol", &rows()).await.unwrap());
        assert!(client.requests()[0].prompt.contains("2 rows, columns: Symbol, PnL"));
    }

    #[tokio::test]
    async fn test_policy_falls_back_when_model_fails() {
        let client = Arc::new(MockLlmClient::default());
        client.push_error("connection refused");
        let policy = VisualizationPolicy::with_advisor(Arc::new(advisor(client)));

        assert!(policy.should_visualize("pnl per symbol", &rows()).await);
    }
}
