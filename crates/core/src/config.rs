//! Configuration management for Tradewise.
//!
//! Configuration is merged from several sources, lowest precedence first:
//! - Built-in defaults
//! - Config file (`.tradewise/config.yaml` or `TRADEWISE_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric: relative data paths are resolved
//! against the workspace root.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .tradewise/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Default LLM provider (e.g., "ollama", "openai")
    pub provider: String,

    /// Default model identifier
    pub model: String,

    /// API key for the LLM provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// Trading data store settings
    pub database: DatabaseConfig,

    /// QA knowledge index settings
    pub knowledge: KnowledgeConfig,

    /// HTTP server settings
    pub server: ServerConfig,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    OpenAI {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
    },
    Claude {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
        #[serde(rename = "apiVersion")]
        api_version: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    /// Custom endpoint for this provider, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            ProviderConfig::Ollama { endpoint, .. } => Some(endpoint.as_str()),
            ProviderConfig::OpenAI { endpoint, .. } | ProviderConfig::Claude { endpoint, .. } => {
                endpoint.as_deref()
            }
        }
    }
}

/// Read-only trading data store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseConfig {
    /// SQLite file holding the trading table (opened read-only)
    pub path: PathBuf,

    /// Table every generated statement must reference
    pub table: String,

    /// Connections opened eagerly when the pool starts
    pub min_connections: usize,

    /// Upper bound on concurrently checked-out connections
    pub max_connections: usize,

    /// Per-statement execution timeout
    pub statement_timeout_secs: u64,

    /// How long to wait for a free connection
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".tradewise/trades.db"),
            table: "forex_trades".to_string(),
            min_connections: 5,
            max_connections: 20,
            statement_timeout_secs: 3,
            acquire_timeout_secs: 30,
        }
    }
}

/// QA knowledge index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KnowledgeConfig {
    /// SQLite file holding QA pairs and their two embeddings
    pub path: PathBuf,

    /// Embedding provider ("mock" or "ollama")
    pub embedding_provider: String,

    /// Embedding model identifier
    pub embedding_model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Hits requested from each channel and kept after fusion
    pub top_k: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".tradewise/knowledge.db"),
            embedding_provider: "mock".to_string(),
            embedding_model: "trigram-v1".to_string(),
            dimensions: 384,
            top_k: 5,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    database: Option<DatabaseConfig>,
    knowledge: Option<KnowledgeConfig>,
    server: Option<ServerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            database: DatabaseConfig::default(),
            knowledge: KnowledgeConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, the config file and defaults.
    ///
    /// Environment variables:
    /// - `TRADEWISE_WORKSPACE`: Override workspace path
    /// - `TRADEWISE_CONFIG`: Path to config file
    /// - `TRADEWISE_PROVIDER`: LLM provider
    /// - `TRADEWISE_MODEL`: Model identifier
    /// - `TRADEWISE_API_KEY`: API key
    /// - `TRADEWISE_DATABASE`: Trading data SQLite file
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Like [`load`](Self::load), with the workspace and config file paths
    /// fixed up front. Both take precedence over their environment
    /// variables and decide which YAML file is merged.
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        match workspace {
            Some(workspace) => config.workspace = workspace,
            None => {
                if let Ok(workspace) = std::env::var("TRADEWISE_WORKSPACE") {
                    config.workspace = PathBuf::from(workspace);
                }
            }
        }

        config.config_file = config_file
            .or_else(|| std::env::var("TRADEWISE_CONFIG").ok().map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.tradewise_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("TRADEWISE_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("TRADEWISE_MODEL") {
            config.model = model;
        }

        if let Ok(database) = std::env::var("TRADEWISE_DATABASE") {
            config.database.path = PathBuf::from(database);
        }

        config.api_key = std::env::var("TRADEWISE_API_KEY").ok();
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> AppResult<Self> {
        let config_file: ConfigFile = serde_yaml::from_str(contents)?;
        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = match provider_config {
                    ProviderConfig::OpenAI { model, .. } => model.clone(),
                    ProviderConfig::Claude { model, .. } => model.clone(),
                    ProviderConfig::Ollama { model, .. } => model.clone(),
                };
            }

            result.llm = Some(llm);
        }

        if let Some(database) = config_file.database {
            result.database = database;
        }

        if let Some(knowledge) = config_file.knowledge {
            result.knowledge = knowledge;
        }

        if let Some(server) = config_file.server {
            result.server = server;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        database: Option<PathBuf>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(database) = database {
            self.database.path = database;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .tradewise directory.
    pub fn tradewise_dir(&self) -> PathBuf {
        self.workspace.join(".tradewise")
    }

    /// Ensure the .tradewise directory exists.
    pub fn ensure_tradewise_dir(&self) -> AppResult<()> {
        let dir = self.tradewise_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .tradewise directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Absolute path of the trading data store.
    pub fn database_path(&self) -> PathBuf {
        self.resolve(&self.database.path)
    }

    /// Absolute path of the QA knowledge index.
    pub fn knowledge_path(&self) -> PathBuf {
        self.resolve(&self.knowledge.path)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Get the configuration block for a provider.
    pub fn get_provider_config(&self, provider: &str) -> Option<ProviderConfig> {
        self.llm
            .as_ref()
            .and_then(|llm| llm.providers.get(provider).cloned())
    }

    /// Resolve API key from environment variable.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        match self.get_provider_config(provider)? {
            ProviderConfig::OpenAI { api_key_env, .. }
            | ProviderConfig::Claude { api_key_env, .. } => std::env::var(&api_key_env).ok(),
            ProviderConfig::Ollama { .. } => None,
        }
    }

    /// Validate configuration for the active provider and the data store.
    pub fn validate(&self) -> AppResult<()> {
        let provider = &self.provider;
        let known_providers = ["openai", "claude", "ollama"];

        if !known_providers.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                known_providers.join(", ")
            )));
        }

        if let Some(
            ProviderConfig::OpenAI { api_key_env, .. } | ProviderConfig::Claude { api_key_env, .. },
        ) = self.get_provider_config(provider)
        {
            if self.api_key.is_none() && std::env::var(&api_key_env).is_err() {
                return Err(AppError::Config(format!(
                    "API key not found in environment variable: {}",
                    api_key_env
                )));
            }
        }

        let db = &self.database;
        if db.max_connections == 0 {
            return Err(AppError::Config(
                "database.maxConnections must be at least 1".to_string(),
            ));
        }
        if db.min_connections > db.max_connections {
            return Err(AppError::Config(format!(
                "database.minConnections ({}) exceeds maxConnections ({})",
                db.min_connections, db.max_connections
            )));
        }
        if db.statement_timeout_secs == 0 {
            return Err(AppError::Config(
                "database.statementTimeoutSecs must be positive".to_string(),
            ));
        }
        if db.table.trim().is_empty() {
            return Err(AppError::Config("database.table cannot be empty".to_string()));
        }

        Ok(())
    }
}
