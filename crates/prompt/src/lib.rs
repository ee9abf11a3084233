//! Prompt system for Tradewise.
//!
//! Structured prompt management with:
//! - YAML prompt definitions (built-in defaults, workspace overrides)
//! - Handlebars rendering of system and user templates

pub mod builder;
pub mod defaults;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{list_prompts, load_prompt, PromptLibrary};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptBehavior, PromptDefinition, PromptOutputSpec};
