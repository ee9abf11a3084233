//! Knowledge command handler.
//!
//! Manages the Q&A knowledge base: add pairs, search, show stats.

use clap::{Args, Subcommand};
use tradewise_agent::setup::open_retriever;
use tradewise_core::{config::AppConfig, AppResult};
use tradewise_knowledge::QaPair;

/// Q&A knowledge base management
#[derive(Args, Debug)]
pub struct KnowledgeCommand {
    #[command(subcommand)]
    pub action: KnowledgeAction,
}

#[derive(Subcommand, Debug)]
pub enum KnowledgeAction {
    /// Add or replace one question/answer pair
    Add(KnowledgeAddCommand),
    /// Search the knowledge base
    Search(KnowledgeSearchCommand),
    /// Show knowledge base statistics
    Stats(KnowledgeStatsCommand),
}

/// Add a question/answer pair
#[derive(Args, Debug)]
pub struct KnowledgeAddCommand {
    /// Pair identifier, e.g. QA_001
    #[arg(long)]
    pub id: String,

    /// Question text
    #[arg(long)]
    pub question: String,

    /// Answer text
    #[arg(long)]
    pub answer: String,

    /// Where the pair came from
    #[arg(long, default_value = "manual")]
    pub source: String,
}

impl KnowledgeAddCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Adding QA pair '{}'", self.id);

        let retriever = open_retriever(config)?;
        let pair = QaPair {
            qa_id: self.id.clone(),
            question: self.question.clone(),
            answer: self.answer.clone(),
            source: self.source.clone(),
        };
        retriever.add_pair(&pair).await?;

        println!("Stored {} ({} pairs total)", pair.qa_id, retriever.pair_count()?);
        Ok(())
    }
}

/// Search the knowledge base
#[derive(Args, Debug)]
pub struct KnowledgeSearchCommand {
    /// Query text, or a QA_ identifier for an exact lookup
    pub query: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeSearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let hits = open_retriever(config)?.search(&self.query).await?;
        tracing::debug!("Search returned {} hits", hits.len());

        if self.json {
            println!("{}", serde_json::to_string_pretty(&hits)?);
            return Ok(());
        }

        if hits.is_empty() {
            println!("No matching pairs.");
            return Ok(());
        }

        for (i, hit) in hits.iter().enumerate() {
            println!(
                "[{}] {} score={:.3} match={}",
                i + 1,
                hit.item_id,
                hit.final_score,
                hit.channel
            );
            println!("    Q: {}", hit.question);
            println!("    A: {}", hit.answer);
        }
        Ok(())
    }
}

/// Show knowledge base stats
#[derive(Args, Debug)]
pub struct KnowledgeStatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeStatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let pairs = open_retriever(config)?.pair_count()?;
        let path = config.knowledge_path();

        if self.json {
            let output = serde_json::json!({
                "path": path.display().to_string(),
                "pairs": pairs,
                "embeddingProvider": config.knowledge.embedding_provider,
                "embeddingModel": config.knowledge.embedding_model,
                "dimensions": config.knowledge.dimensions,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Knowledge base: {}", path.display());
            println!("  Pairs: {}", pairs);
            println!(
                "  Embeddings: {} ({}, {} dims)",
                config.knowledge.embedding_provider,
                config.knowledge.embedding_model,
                config.knowledge.dimensions
            );
        }
        Ok(())
    }
}

impl KnowledgeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            KnowledgeAction::Add(cmd) => cmd.execute(config).await,
            KnowledgeAction::Search(cmd) => cmd.execute(config).await,
            KnowledgeAction::Stats(cmd) => cmd.execute(config).await,
        }
    }
}
