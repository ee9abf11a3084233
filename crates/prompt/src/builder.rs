//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
use handlebars::Handlebars;
use std::collections::HashMap;
use tradewise_core::{AppError, AppResult};

/// Build a prompt from a definition and input variables.
///
/// Both the system template (if present) and the user template are rendered
/// with the same variables. Missing variables render as empty strings.
///
/// # Example
/// ```no_run
/// use tradewise_prompt::{build_prompt, PromptLibrary};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let library = PromptLibrary::builtin()?;
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "What is leverage?".to_string());
///
/// let built = build_prompt(library.get("retrieval.synthesize")?, vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::trace!("Building prompt: {}", definition.id);

    let system = match &definition.system {
        Some(template) => Some(render_template(template, &variables)?),
        None => None,
    };
    let user = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt {
        system,
        user,
        behavior: definition.behavior.clone(),
        metadata: BuiltPromptMetadata {
            source_prompt_id: definition.id.clone(),
            resolved_variables: variables,
        },
    })
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text prompts, no HTML escaping
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}
