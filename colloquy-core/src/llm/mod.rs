//! Chat model seam
//!
//! Everything the conversation core needs from a hosted model lives behind
//! [`LLMProvider`]. Concrete providers are in [`providers`]; [`factory`] builds
//! one from configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ColloquyError, InvocationErrorKind, Result};

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    /// Assistant-authored digest that stands in for earlier turns
    Summary,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Summary => "summary",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn summary(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Summary, content)
    }
}

/// Request to an LLM provider
#[derive(Debug, Clone)]
pub struct LLMRequest {
    /// Messages in the conversation
    pub messages: Vec<Message>,

    /// Temperature for generation (0.0-2.0)
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    pub max_tokens: Option<usize>,
}

impl LLMRequest {
    /// Create a request carrying the given prompt messages
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Create a simple request from a single prompt
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self::new(vec![Message::user(prompt)])
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<usize>) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Response from an LLM provider
#[derive(Debug, Clone)]
pub struct LLMResponse {
    /// Generated content
    pub content: String,

    /// Token usage information
    pub usage: Option<TokenUsage>,
}

/// Token usage information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// Trait for LLM provider implementations.
///
/// Implementors make the actual network call. Failures must be reported as
/// [`ColloquyError::ExternalInvocation`] so callers can tell a model failure
/// from a local one.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a reply for the given prompt messages.
    async fn generate_request(&self, request: &LLMRequest) -> Result<LLMResponse>;

    /// Get model information
    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "unknown".to_string(),
            model_name: "unknown".to_string(),
        }
    }
}

/// Model information
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub provider: String,
    pub model_name: String,
}

/// Offline provider that answers with the latest user message.
///
/// Deterministic and free, so the CLI can run without credentials.
#[derive(Debug, Clone, Default)]
pub struct EchoProvider {
    prefix: String,
}

impl EchoProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend `prefix` to every reply
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl LLMProvider for EchoProvider {
    async fn generate_request(&self, request: &LLMRequest) -> Result<LLMResponse> {
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .ok_or_else(|| {
                ColloquyError::invocation(
                    InvocationErrorKind::InvalidResponse,
                    "echo provider received no user message",
                )
            })?;

        Ok(LLMResponse {
            content: format!("{}{}", self.prefix, last_user.content),
            usage: None,
        })
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "echo".to_string(),
            model_name: "echo".to_string(),
        }
    }
}

pub mod factory;
pub mod providers;

pub use factory::LLMProviderFactory;
