//! Wiring from [`AppConfig`].

use crate::advisor::LlmChartAdvisor;
use crate::generator::LlmSqlGenerator;
use crate::responders::{DatabaseResponder, RetrievalResponder};
use crate::router::RoutingRules;
use crate::service::QueryService;
use crate::synthesis::LlmSynthesizer;
use std::sync::Arc;
use std::time::Duration;
use tradewise_core::{AppConfig, AppError, AppResult};
use tradewise_knowledge::{create_provider, QaIndex, Retriever};
use tradewise_llm::{create_client, LlmClient};
use tradewise_prompt::PromptLibrary;
use tradewise_sql::{
    ConnectionPool, DataStore, ExecutionGateway, PoolOptions, QueryValidator, SchemaCache,
    SqliteStore, VisualizationPolicy,
};

/// LLM client for the active provider.
pub fn create_llm(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    let provider_config = config.get_provider_config(&config.provider);
    let endpoint = provider_config.as_ref().and_then(|p| p.endpoint());
    let api_key = config.resolve_api_key(&config.provider);

    create_client(&config.provider, endpoint, api_key.as_deref()).map_err(AppError::Llm)
}

/// Read-only store over the configured trading database.
pub fn open_store(config: &AppConfig) -> AppResult<Arc<SqliteStore>> {
    let path = config.database_path();
    if !path.exists() {
        return Err(AppError::Database(format!(
            "Trading database not found: {}",
            path.display()
        )));
    }

    let pool = ConnectionPool::open(&path, PoolOptions::from(&config.database))?;
    let timeout = Duration::from_secs(config.database.statement_timeout_secs);
    tracing::debug!("Opened trading database {}", path.display());
    Ok(Arc::new(SqliteStore::new(pool, timeout)))
}

/// Retriever over the configured QA index, created on first use.
pub fn open_retriever(config: &AppConfig) -> AppResult<Retriever> {
    let endpoint = config
        .get_provider_config("ollama")
        .and_then(|p| p.endpoint().map(str::to_string));
    let embedder = create_provider(&config.knowledge, endpoint.as_deref())?;
    let index = QaIndex::open(&config.knowledge_path())?;

    Ok(Retriever::new(
        embedder,
        Arc::new(index),
        config.knowledge.top_k,
    ))
}

pub fn build_validator(config: &AppConfig) -> AppResult<Arc<QueryValidator>> {
    Ok(Arc::new(QueryValidator::with_default_policy(
        config.database.table.as_str(),
    )?))
}

impl QueryService {
    /// Full service for the configured provider, store and index.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        config.validate()?;
        let client = create_llm(config)?;
        Self::with_client(config, client)
    }

    /// Full service over an existing LLM client.
    pub fn with_client(config: &AppConfig, client: Arc<dyn LlmClient>) -> AppResult<Self> {
        let prompts = Arc::new(PromptLibrary::load(&config.workspace)?);
        let model = config.model.as_str();
        let table = config.database.table.as_str();

        let store: Arc<dyn DataStore> = open_store(config)?;
        let advisor = LlmChartAdvisor::new(client.clone(), prompts.clone(), model);
        let gateway = ExecutionGateway::new(
            build_validator(config)?,
            store.clone(),
            VisualizationPolicy::with_advisor(Arc::new(advisor)),
        );

        let synthesizer = Arc::new(LlmSynthesizer::new(client.clone(), prompts.clone(), model));
        let database = DatabaseResponder::new(
            Arc::new(LlmSqlGenerator::new(client, prompts, model, table)),
            gateway,
            Arc::new(SchemaCache::new(store, table)),
            synthesizer.clone(),
        );
        let retrieval = RetrievalResponder::new(open_retriever(config)?);

        tracing::info!(
            provider = %config.provider,
            model = %config.model,
            table = %table,
            "Query service ready"
        );
        Ok(Self::new(RoutingRules::default(), database, retrieval, synthesizer))
    }
}
