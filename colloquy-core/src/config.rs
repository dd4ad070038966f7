//! Configuration types for Colloquy

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::conversation::CompactionPolicy;
use crate::error::{ColloquyError, Result};

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Answer all questions to the best of your ability.";

pub const DEFAULT_SUMMARY_INSTRUCTION: &str = "Distill the above chat messages into a single summary message. Include as many specific details as you can.";

/// Main configuration for Colloquy
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ColloquyConfig {
    /// Chat model configuration
    pub llm: LLMProviderConfig,

    /// History and compaction configuration
    pub conversation: ConversationConfig,
}

/// Which provider answers turns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    /// OpenAI chat completions
    OpenAI,
    /// Offline echo, useful without credentials
    Echo,
}

impl std::str::FromStr for LLMProvider {
    type Err = ColloquyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "echo" => Ok(LLMProvider::Echo),
            other => Err(ColloquyError::Configuration(format!(
                "Invalid LLM provider: {}",
                other
            ))),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMProviderConfig {
    /// Provider type
    pub provider: LLMProvider,

    /// Model name (e.g. "gpt-4o"); falls back to the provider's environment
    /// variable, then to the provider default, when unset
    pub model: Option<String>,

    /// API key; falls back to the provider's environment variable when unset
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Custom base URL
    pub base_url: Option<String>,

    /// Sampling temperature (0.0-2.0)
    pub temperature: f32,

    /// Maximum tokens per reply
    pub max_tokens: Option<usize>,

    /// Per-request timeout, e.g. "30s"
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl Default for LLMProviderConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::OpenAI,
            model: None,
            api_key: None,
            base_url: None,
            temperature: 0.2,
            max_tokens: None,
            timeout: None,
        }
    }
}

/// Conversation and compaction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Fixed instruction placed before the history in every prompt
    pub system_prompt: String,

    /// Instruction appended after the history when asking for a summary
    pub summary_instruction: String,

    /// Policies run before each turn, in order
    pub compaction: Vec<CompactionPolicy>,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            summary_instruction: DEFAULT_SUMMARY_INSTRUCTION.to_string(),
            compaction: vec![
                CompactionPolicy::Trim { keep_last: 2 },
                CompactionPolicy::Summarize,
            ],
        }
    }
}

/// Builder for ColloquyConfig
pub struct ConfigBuilder {
    config: ColloquyConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self {
            config: ColloquyConfig::default(),
        }
    }

    /// Set LLM configuration
    pub fn llm(mut self, config: LLMProviderConfig) -> Self {
        self.config.llm = config;
        self
    }

    /// Set conversation configuration
    pub fn conversation(mut self, config: ConversationConfig) -> Self {
        self.config.conversation = config;
        self
    }

    /// Replace the compaction pipeline
    pub fn compaction(mut self, policies: Vec<CompactionPolicy>) -> Self {
        self.config.conversation.compaction = policies;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ColloquyConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ColloquyConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. `colloquy.toml` in the working directory
    /// 3. The file named by `COLLOQUY_CONFIG_PATH`
    /// 4. `COLLOQUY_*` environment variables, nested keys separated by `__`
    ///    (e.g. `COLLOQUY_LLM__MODEL=gpt-4o-mini`)
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is invalid or validation fails.
    pub fn load() -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(ColloquyConfig::default()))
            .merge(Toml::file("colloquy.toml"));

        if let Ok(path) = std::env::var("COLLOQUY_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        let figment = figment.merge(Env::prefixed("COLLOQUY_").split("__"));

        let config: ColloquyConfig = figment.extract().map_err(|e| {
            ColloquyError::Configuration(format!("Failed to load configuration: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ColloquyError::Configuration(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let config: ColloquyConfig = Figment::from(Serialized::defaults(ColloquyConfig::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| {
                ColloquyError::Configuration(format!("Failed to load configuration file: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ColloquyError::Configuration(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self
            .llm
            .model
            .as_deref()
            .is_some_and(|model| model.trim().is_empty())
        {
            return Err(ColloquyError::Configuration(
                "llm.model must not be empty".to_string(),
            ));
        }

        if self.llm.timeout == Some(Duration::ZERO) {
            return Err(ColloquyError::Configuration(
                "llm.timeout must be greater than zero".to_string(),
            ));
        }

        if self.conversation.summary_instruction.trim().is_empty()
            && self
                .conversation
                .compaction
                .iter()
                .any(|p| matches!(p, CompactionPolicy::Summarize))
        {
            return Err(ColloquyError::Configuration(
                "conversation.summary_instruction is required when summarize is configured"
                    .to_string(),
            ));
        }

        Ok(())
    }
}
