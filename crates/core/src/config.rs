//! Configuration management for the TIF agent.
//!
//! Configuration is layered, later sources winning:
//! - Built-in defaults
//! - Config file (`.tif/config.yaml` in the workspace, or `--config`)
//! - Environment variables (`TIF_*`)
//! - Command-line flags
//!
//! Credentials and model names live here and are handed to constructors;
//! nothing in the workspace reads them from process-wide state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Directory under the workspace holding config, databases and indexes.
pub const STATE_DIR: &str = ".tif";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .tif/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Active LLM provider ("openai" or "ollama")
    pub provider: String,

    /// Model used by the orchestration agent
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

    /// Tabular data settings
    pub data: DataConfig,

    /// Document index settings
    pub knowledge: KnowledgeConfig,

    /// Agent loop settings
    pub agent: AgentConfig,
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
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        endpoint: Option<String>,
        timeout: Option<u64>,
    },
    Ollama {
        endpoint: String,
        model: String,
        #[serde(rename = "embeddingModel")]
        embedding_model: Option<String>,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    /// Model configured for this provider.
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAI { model, .. } | Self::Ollama { model, .. } => model,
        }
    }

    /// Endpoint override, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::OpenAI { endpoint, .. } => endpoint.as_deref(),
            Self::Ollama { endpoint, .. } => Some(endpoint),
        }
    }

    /// Embedding model, if configured.
    pub fn embedding_model(&self) -> Option<&str> {
        match self {
            Self::OpenAI {
                embedding_model, ..
            }
            | Self::Ollama {
                embedding_model, ..
            } => embedding_model.as_deref(),
        }
    }

    /// Request timeout in seconds, if configured.
    pub fn timeout(&self) -> Option<u64> {
        match self {
            Self::OpenAI { timeout, .. } | Self::Ollama { timeout, .. } => *timeout,
        }
    }
}

/// Where the expenditure records come from and where they are stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// CSV file with the expenditure records (relative to the workspace)
    #[serde(rename = "csvPath", default = "default_csv_path")]
    pub csv_path: PathBuf,

    /// Table the CSV is loaded into
    #[serde(default = "default_table")]
    pub table: String,
}

fn default_csv_path() -> PathBuf {
    PathBuf::from("data/tif_expenditures.csv")
}

fn default_table() -> String {
    "expenditures".to_string()
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
            table: default_table(),
        }
    }
}

/// Document index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Knowledge base name under `.tif/knowledge/`
    #[serde(default = "default_base")]
    pub base: String,

    /// Directory holding the source documents (relative to the workspace)
    #[serde(rename = "documentsDir", default = "default_documents_dir")]
    pub documents_dir: PathBuf,

    /// Number of chunks retrieved per question
    #[serde(rename = "topK", default = "default_top_k")]
    pub top_k: u32,
}

fn default_base() -> String {
    "tif".to_string()
}

fn default_documents_dir() -> PathBuf {
    PathBuf::from("pdfs")
}

fn default_top_k() -> u32 {
    10
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            base: default_base(),
            documents_dir: default_documents_dir(),
            top_k: default_top_k(),
        }
    }
}

/// Agent loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum delegate rounds per question
    #[serde(rename = "maxSteps", default = "default_max_steps")]
    pub max_steps: usize,

    /// Model for natural language to SQL translation (defaults to the agent model)
    #[serde(rename = "translatorModel", default)]
    pub translator_model: Option<String>,

    /// Model for narrating SQL results (defaults to the agent model)
    #[serde(rename = "narratorModel", default)]
    pub narrator_model: Option<String>,

    /// Model for document answer synthesis (defaults to the agent model)
    #[serde(rename = "documentModel", default)]
    pub document_model: Option<String>,
}

fn default_max_steps() -> usize {
    10
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            translator_model: None,
            narrator_model: None,
            document_model: None,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    data: Option<DataConfig>,
    knowledge: Option<KnowledgeConfig>,
    agent: Option<AgentConfig>,
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
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            data: DataConfig::default(),
            knowledge: KnowledgeConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `TIF_WORKSPACE`: Override workspace path
    /// - `TIF_CONFIG`: Path to config file
    /// - `TIF_PROVIDER`: LLM provider
    /// - `TIF_MODEL`: Agent model identifier
    /// - `TIF_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Like [`AppConfig::load`], with workspace and config file given on the
    /// command line taking precedence over `TIF_WORKSPACE` / `TIF_CONFIG`.
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| std::env::var("TIF_WORKSPACE").ok().map(PathBuf::from)) {
            config.workspace = workspace;
        }

        if let Some(config_file) =
            config_file.or_else(|| std::env::var("TIF_CONFIG").ok().map(PathBuf::from))
        {
            config.config_file = Some(config_file);
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.state_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("TIF_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("TIF_MODEL") {
            config.model = model;
        }

        config.api_key = std::env::var("TIF_API_KEY").ok();

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

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

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
                result.model = provider_config.model().to_string();
            }

            result.llm = Some(llm);
        }

        if let Some(data) = config_file.data {
            result.data = data;
        }

        if let Some(knowledge) = config_file.knowledge {
            result.knowledge = knowledge;
        }

        if let Some(agent) = config_file.agent {
            result.agent = agent;
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

    /// Get the path to the .tif directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(STATE_DIR)
    }

    /// Ensure the .tif directory exists.
    pub fn ensure_state_dir(&self) -> AppResult<()> {
        let state_dir = self.state_dir();
        if !state_dir.exists() {
            std::fs::create_dir_all(&state_dir).map_err(|e| {
                AppError::Config(format!("Failed to create {} directory: {}", STATE_DIR, e))
            })?;
        }
        Ok(())
    }

    /// SQLite database holding the loaded expenditure table.
    pub fn database_path(&self) -> PathBuf {
        self.state_dir().join("data").join("tif.sqlite")
    }

    /// Absolute path of the expenditure CSV.
    pub fn csv_path(&self) -> PathBuf {
        self.resolve(&self.data.csv_path)
    }

    /// Absolute path of the source documents directory.
    pub fn documents_dir(&self) -> PathBuf {
        self.resolve(&self.knowledge.documents_dir)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Model for SQL translation.
    pub fn translator_model(&self) -> &str {
        self.agent.translator_model.as_deref().unwrap_or(&self.model)
    }

    /// Model for narrating SQL results.
    pub fn narrator_model(&self) -> &str {
        self.agent.narrator_model.as_deref().unwrap_or(&self.model)
    }

    /// Model for document answer synthesis.
    pub fn document_model(&self) -> &str {
        self.agent.document_model.as_deref().unwrap_or(&self.model)
    }

    /// Get a provider configuration by name.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Endpoint override for the active provider.
    pub fn resolve_endpoint(&self) -> Option<String> {
        self.get_provider_config(&self.provider)
            .and_then(|pc| pc.endpoint())
            .map(str::to_string)
    }

    /// Request timeout for the active provider.
    pub fn resolve_timeout(&self) -> Option<u64> {
        self.get_provider_config(&self.provider)
            .and_then(ProviderConfig::timeout)
    }

    /// Embedding model for the active provider.
    pub fn resolve_embedding_model(&self) -> Option<String> {
        self.get_provider_config(&self.provider)
            .and_then(|pc| pc.embedding_model())
            .map(str::to_string)
    }

    /// Resolve the API key for a provider.
    ///
    /// Order: `TIF_API_KEY`, the provider's `apiKeyEnv`, then
    /// `OPENAI_API_KEY` for the openai provider.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        if let Some(ProviderConfig::OpenAI { api_key_env, .. }) = self.get_provider_config(provider)
        {
            if let Ok(key) = std::env::var(api_key_env) {
                return Some(key);
            }
        }

        if provider.eq_ignore_ascii_case("openai") {
            return std::env::var("OPENAI_API_KEY").ok();
        }

        None
    }

    /// Validate configuration for the active provider.
    pub fn validate(&self) -> AppResult<()> {
        let known_providers = ["openai", "ollama"];

        if !known_providers.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                known_providers.join(", ")
            )));
        }

        if self.agent.max_steps == 0 {
            return Err(AppError::Config(
                "agent.maxSteps must be at least 1".to_string(),
            ));
        }

        if self.knowledge.top_k == 0 {
            return Err(AppError::Config(
                "knowledge.topK must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.agent.max_steps, 10);
        assert_eq!(config.knowledge.top_k, 10);
        assert_eq!(config.data.table, "expenditures");
        assert!(!config.verbose);
    }

    #[test]
    fn test_state_dir_paths() {
        let config = AppConfig::default();
        assert!(config.state_dir().ends_with(".tif"));
        assert!(config.database_path().ends_with(".tif/data/tif.sqlite"));
        assert!(config.csv_path().ends_with("data/tif_expenditures.csv"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            None,
            None,
            Some("ollama".to_string()),
            Some("llama3.2".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.provider, "ollama");
        assert_eq!(overridden.model, "llama3.2");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_role_models_fall_back_to_agent_model() {
        let mut config = AppConfig::default();
        assert_eq!(config.translator_model(), "gpt-4o-mini");

        config.agent.narrator_model = Some("gpt-4-turbo".to_string());
        assert_eq!(config.narrator_model(), "gpt-4-turbo");
        assert_eq!(config.document_model(), "gpt-4o-mini");
    }

    #[test]
    fn test_merge_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
llm:
  activeProvider: ollama
  providers:
    openai:
      apiKeyEnv: OPENAI_API_KEY
      model: gpt-4o
    ollama:
      endpoint: http://localhost:11434
      model: llama3.1
      embeddingModel: nomic-embed-text
logging:
  level: debug
  color: false
knowledge:
  topK: 4
agent:
  maxSteps: 6
  translatorModel: sqlcoder
"#,
        )
        .unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.provider, "ollama");
        assert_eq!(merged.model, "llama3.1");
        assert!(merged.no_color);
        assert_eq!(merged.log_level.as_deref(), Some("debug"));
        assert_eq!(merged.knowledge.top_k, 4);
        assert_eq!(merged.knowledge.base, "tif");
        assert_eq!(merged.agent.max_steps, 6);
        assert_eq!(merged.translator_model(), "sqlcoder");
        assert_eq!(
            merged.resolve_endpoint().as_deref(),
            Some("http://localhost:11434")
        );
        assert_eq!(
            merged.resolve_embedding_model().as_deref(),
            Some("nomic-embed-text")
        );
        assert!(matches!(
            merged.get_provider_config("openai"),
            Some(ProviderConfig::OpenAI { .. })
        ));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_steps() {
        let mut config = AppConfig::default();
        config.agent.max_steps = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ollama() {
        let mut config = AppConfig::default();
        config.provider = "ollama".to_string();
        assert!(config.validate().is_ok());
    }
}
