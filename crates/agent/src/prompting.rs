//! Turns prompt definitions into LLM requests.

use std::collections::HashMap;
use tradewise_core::AppResult;
use tradewise_llm::LlmRequest;
use tradewise_prompt::{build_prompt, PromptLibrary};

/// Render prompt `id` with `variables` for `model`.
pub fn request_for(
    prompts: &PromptLibrary,
    id: &str,
    variables: &[(&str, String)],
    model: &str,
) -> AppResult<LlmRequest> {
    let variables: HashMap<String, String> = variables
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    let built = build_prompt(prompts.get(id)?, variables)?;

    let mut request = LlmRequest::new(built.user, model)
        .with_temperature(built.behavior.temperature)
        .with_max_tokens(built.behavior.max_tokens);
    if let Some(system) = built.system {
        request = request.with_system(system);
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_carries_behavior() {
        let prompts = PromptLibrary::builtin().unwrap();
        let request = request_for(
            &prompts,
            "chart.advisor",
            &[
                ("question", "pnl per symbol".to_string()),
                ("rows", "4".to_string()),
                ("columns", "Symbol, PnL".to_string()),
            ],
            "llama3.2",
        )
        .unwrap();

        assert_eq!(request.model, "llama3.2");
        assert_eq!(request.max_tokens, Some(10));
        assert!(request.prompt.contains("4 rows, columns: Symbol, PnL"));
        assert!(request.system.is_none());
    }

    #[test]
    fn test_unknown_prompt() {
        let prompts = PromptLibrary::builtin().unwrap();
        assert!(request_for(&prompts, "nope", &[], "m").is_err());
    }
}
