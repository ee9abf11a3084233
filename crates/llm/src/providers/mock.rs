//! Scripted LLM provider.
//!
//! Replays a fixed list of responses in order and records every request it
//! receives. Used by tests across the workspace and for offline smoke runs.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use std::collections::VecDeque;
use std::sync::Mutex;
use tradewise_core::{AppError, AppResult};

/// Mock client returning scripted responses.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    responses: Mutex<VecDeque<AppResult<String>>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    /// Create a client that replays `responses` in order.
    pub fn scripted<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(|r| Ok(r.into())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a provider failure as the next response.
    pub fn push_error(&self, message: impl Into<String>) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(Err(AppError::Llm(message.into())));
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl LlmClient for MockLlmClient {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        if let Ok(mut seen) = self.requests.lock() {
            seen.push(request.clone());
        }

        let next = self
            .responses
            .lock()
            .map_err(|_| AppError::Llm("Mock response queue poisoned".to_string()))?
            .pop_front()
            .ok_or_else(|| AppError::Llm("Mock response script exhausted".to_string()))?;

        let content = next?;
        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::default(),
        })
    }
}
