//! Prompt loader for YAML prompt definitions.
//!
//! Prompts resolve in two layers: a workspace file
//! `.tradewise/prompts/<id>.yml` wins over the built-in definition of the
//! same id.

use crate::defaults;
use crate::types::PromptDefinition;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tradewise_core::{AppError, AppResult};

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(".tradewise/prompts")
}

/// Load a prompt definition by ID.
///
/// # Example
/// ```no_run
/// use tradewise_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "sql.generate")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    if prompt_file.exists() {
        tracing::debug!("Loading prompt override from: {:?}", prompt_file);
        let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to read prompt file {:?}: {}",
                prompt_file, e
            ))
        })?;
        let definition = parse_prompt(&contents)
            .map_err(|e| AppError::Prompt(format!("{:?}: {}", prompt_file, e)))?;
        if definition.id != prompt_id {
            return Err(AppError::Prompt(format!(
                "Prompt file {:?} declares id '{}'",
                prompt_file, definition.id
            )));
        }
        return Ok(definition);
    }

    builtin(prompt_id)
}

/// Look up a built-in prompt by ID.
pub fn builtin(prompt_id: &str) -> AppResult<PromptDefinition> {
    for source in defaults::ALL {
        let definition = parse_prompt(source)?;
        if definition.id == prompt_id {
            return Ok(definition);
        }
    }

    Err(AppError::Prompt(format!("Unknown prompt: {}", prompt_id)))
}

/// List all available prompt IDs (built-in and workspace overrides).
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let mut prompt_ids = Vec::new();

    for source in defaults::ALL {
        prompt_ids.push(parse_prompt(source)?.id);
    }

    let dir = prompts_dir(workspace_path);
    if dir.exists() {
        for entry in walkdir::WalkDir::new(&dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    prompt_ids.push(stem.to_string());
                }
            }
        }
    }

    prompt_ids.sort();
    prompt_ids.dedup();
    Ok(prompt_ids)
}

/// Parse and validate a YAML prompt document.
fn parse_prompt(contents: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents)
        .map_err(|e| AppError::Prompt(format!("Failed to parse prompt YAML: {}", e)))?;
    validate_prompt(&definition)?;
    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

/// Prompts resolved once for a workspace and shared by the responders.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    prompts: BTreeMap<String, PromptDefinition>,
}

impl PromptLibrary {
    /// Built-in prompts only.
    pub fn builtin() -> AppResult<Self> {
        let mut prompts = BTreeMap::new();
        for source in defaults::ALL {
            let definition = parse_prompt(source)?;
            prompts.insert(definition.id.clone(), definition);
        }
        Ok(Self { prompts })
    }

    /// Built-in prompts with workspace overrides applied.
    pub fn load(workspace_path: &Path) -> AppResult<Self> {
        let mut prompts = BTreeMap::new();
        for id in list_prompts(workspace_path)? {
            let definition = load_prompt(workspace_path, &id)?;
            prompts.insert(id, definition);
        }
        tracing::debug!("Prompt library loaded with {} prompts", prompts.len());
        Ok(Self { prompts })
    }

    /// Get a prompt by ID.
    pub fn get(&self, prompt_id: &str) -> AppResult<&PromptDefinition> {
        self.prompts
            .get(prompt_id)
            .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", prompt_id)))
    }
}
