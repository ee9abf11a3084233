//! Validate command handler.

use clap::Args;
use tradewise_agent::setup::build_validator;
use tradewise_core::{config::AppConfig, AppResult};

/// Check a SQL statement against the read-only policy
#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// Statement to check
    pub sql: String,

    /// Question the statement is meant to answer
    #[arg(short, long, default_value = "")]
    pub intent: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ValidateCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let validator = build_validator(config)?;
        let verdict = validator.validate(&self.sql, &self.intent);
        tracing::debug!(valid = verdict.valid, "Validation finished");

        if self.json {
            println!("{}", serde_json::to_string_pretty(&verdict)?);
        } else if verdict.valid {
            println!("VALID");
        } else {
            println!("{}", verdict);
        }
        Ok(())
    }
}
