//! LLM integration crate for Tradewise.
//!
//! Provider-agnostic access to language models through the [`LlmClient`]
//! trait, plus the tool-call protocol used by the router and the SQL
//! generation loop: a model either answers with text or asks for a tool.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **Mock**: Scripted responses for tests and offline runs
//!
//! # Example
//! ```no_run
//! use tradewise_llm::{generate, LlmClient, LlmRequest, OllamaClient, ToolSpec};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("What is my total profit?", "llama3.2");
//! let tools = [ToolSpec::new("validate_and_execute", "Run a SELECT statement")
//!     .with_parameter("sql_query", "The statement to run")];
//! let generation = generate(&client, &request, &tools).await?;
//! println!("{:?}", generation);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod tools;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{MockLlmClient, OllamaClient};
pub use tools::{generate, Generation, ToolCall, ToolSpec};
pub use types::ProviderType;
