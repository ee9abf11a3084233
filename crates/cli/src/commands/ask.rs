//! Ask command handler.
//!
//! Routes one question through the query service and prints the answer.
//! A recommended chart is written as an HTML file under `.tradewise/charts`.

use crate::chart::HtmlChartRenderer;
use clap::Args;
use std::path::PathBuf;
use tradewise_agent::{QueryRequest, QueryResponse, QueryService};
use tradewise_core::{config::AppConfig, AppError, AppResult};

/// Ask one question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: Option<String>,

    /// Read the question from a file
    #[arg(short, long, conflicts_with = "question")]
    pub file: Option<PathBuf>,

    /// Do not write a chart file
    #[arg(long)]
    pub no_chart: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let question = self.question()?;
        tracing::debug!("Question: {}", question);

        let service = QueryService::from_config(config)?;
        let response = service.respond(&QueryRequest { query: question }).await;

        let chart_path = match (&response.chart, self.no_chart) {
            (Some(spec), false) => {
                let renderer = HtmlChartRenderer::new(config.tradewise_dir().join("charts"));
                Some(renderer.render(spec)?)
            }
            _ => None,
        };

        if self.json {
            println!("{}", render_json(&response, chart_path.as_ref())?);
            return Ok(());
        }

        if !response.success {
            return Err(AppError::Other(response.response));
        }

        println!("{}", response.response);
        if let Some(path) = chart_path {
            println!();
            println!("Chart: {}", path.display());
        }
        Ok(())
    }

    fn question(&self) -> AppResult<String> {
        let text = match (&self.question, &self.file) {
            (Some(question), _) => question.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)?,
            (None, None) => return Err(AppError::Config("No question provided".to_string())),
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Config("Question is empty".to_string()));
        }
        Ok(text.to_string())
    }
}

fn render_json(response: &QueryResponse, chart_path: Option<&PathBuf>) -> AppResult<String> {
    let mut output = serde_json::to_value(response)?;
    output["chart"] = match chart_path {
        Some(path) => serde_json::Value::String(path.display().to_string()),
        None => serde_json::Value::Null,
    };
    Ok(serde_json::to_string_pretty(&output)?)
}
