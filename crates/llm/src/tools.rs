//! Tool-call protocol on top of plain completions.
//!
//! The model is shown a catalogue of tools in the system prompt and either
//! answers in prose or replies with a single JSON object of the form
//! `{"tool": "<name>", "arguments": {...}}`. [`generate`] performs the call and
//! classifies the reply.

use crate::client::{LlmClient, LlmRequest};
use serde::{Deserialize, Serialize};
use tradewise_core::AppResult;

/// Description of a tool the model may invoke.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name the model must echo back
    pub name: String,

    /// What the tool does
    pub description: String,

    /// Argument names with short descriptions
    pub parameters: Vec<(String, String)>,
}

impl ToolSpec {
    /// Create a tool with no parameters.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    /// Add a named parameter.
    pub fn with_parameter(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.parameters.push((name.into(), description.into()));
        self
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the requested tool
    #[serde(rename = "tool")]
    pub name: String,

    /// Arguments as a JSON object
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// String argument by name.
    pub fn argument(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }
}

/// Outcome of a generation: final text or a tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    Text(String),
    ToolCall(ToolCall),
}

/// Render the tool catalogue appended to the system prompt.
pub fn render_tool_catalogue(tools: &[ToolSpec]) -> String {
    let mut out = String::from(
        "You may call one of the following tools. To call a tool, reply with ONLY a JSON \
         object of the form {\"tool\": \"<name>\", \"arguments\": {...}} and nothing else. \
         Otherwise reply with your final answer as plain text.\n\nTOOLS:\n",
    );

    for tool in tools {
        out.push_str(&format!("- {}: {}\n", tool.name, tool.description));
        for (name, description) in &tool.parameters {
            out.push_str(&format!("    * {} - {}\n", name, description));
        }
    }

    out
}

/// Classify raw model output as text or a call to one of `tools`.
///
/// A JSON object naming an unknown tool is treated as text.
pub fn parse_generation(content: &str, tools: &[ToolSpec]) -> Generation {
    let trimmed = strip_code_fence(content.trim());

    if trimmed.starts_with('{') {
        if let Ok(call) = serde_json::from_str::<ToolCall>(trimmed) {
            if tools.iter().any(|t| t.name == call.name) {
                return Generation::ToolCall(call);
            }
            tracing::warn!("Model requested unknown tool '{}'", call.name);
        }
    }

    Generation::Text(content.trim().to_string())
}

/// Strip a surrounding Markdown code fence (```json ... ``` or ``` ... ```).
pub fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Run a completion with a tool catalogue and classify the reply.
///
/// With an empty `tools` slice this is a plain completion returning
/// [`Generation::Text`].
pub async fn generate(
    client: &dyn LlmClient,
    request: &LlmRequest,
    tools: &[ToolSpec],
) -> AppResult<Generation> {
    if tools.is_empty() {
        let response = client.complete(request).await?;
        return Ok(Generation::Text(response.content.trim().to_string()));
    }

    let catalogue = render_tool_catalogue(tools);
    let system = match &request.system {
        Some(system) => format!("{}\n\n{}", system, catalogue),
        None => catalogue,
    };
    let request = request.clone().with_system(system);

    let response = client.complete(&request).await?;
    let generation = parse_generation(&response.content, tools);

    if let Generation::ToolCall(ref call) = generation {
        tracing::debug!("Model invoked tool '{}'", call.name);
    }

    Ok(generation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockLlmClient;

    fn sql_tool() -> ToolSpec {
        ToolSpec::new("validate_and_execute", "Validate and run a SELECT")
            .with_parameter("sql_query", "statement")
    }

    #[test]
    fn test_parse_plain_text() {
        let generation = parse_generation("  Your total profit is 120.5  ", &[sql_tool()]);
        assert_eq!(
            generation,
            Generation::Text("Your total profit is 120.5".to_string())
        );
    }

    #[test]
    fn test_parse_fenced_tool_call() {
        let content = "```json\n{\"tool\": \"validate_and_execute\", \"arguments\": {\"sql_query\": \"SELECT 1 FROM forex_trades\"}}\n```";
        match parse_generation(content, &[sql_tool()]) {
            Generation::ToolCall(call) => {
                assert_eq!(call.name, "validate_and_execute");
                assert_eq!(call.argument("sql_query"), Some("SELECT 1 FROM forex_trades"));
            }
            other => panic!("expected tool call, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_tool_is_text() {
        let content = r#"{"tool": "drop_everything", "arguments": {}}"#;
        assert!(matches!(
            parse_generation(content, &[sql_tool()]),
            Generation::Text(_)
        ));
    }

    #[test]
    fn test_catalogue_lists_parameters() {
        let catalogue = render_tool_catalogue(&[sql_tool()]);
        assert!(catalogue.contains("validate_and_execute"));
        assert!(catalogue.contains("sql_query"));
    }

    #[tokio::test]
    async fn test_generate_appends_catalogue_to_system_prompt() {
        let client = MockLlmClient::scripted([r#"{"tool":"validate_and_execute","arguments":{"sql_query":"SELECT 1"}}"#]);
        let request = LlmRequest::new("q", "m").with_system("You are a SQL agent.");

        let generation = generate(&client, &request, &[sql_tool()]).await.unwrap();
        assert!(matches!(generation, Generation::ToolCall(_)));

        let seen = client.requests();
        let system = seen[0].system.clone().unwrap();
        assert!(system.starts_with("You are a SQL agent."));
        assert!(system.contains("TOOLS:"));
    }
}
