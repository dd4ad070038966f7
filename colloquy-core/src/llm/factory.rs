//! Factory for creating LLM providers from configuration

use crate::config::{LLMProvider as LLMProviderType, LLMProviderConfig};
use crate::error::Result;
use crate::llm::{EchoProvider, LLMProvider};
use std::sync::Arc;

#[cfg(feature = "llm-openai")]
use crate::llm::providers::openai::OpenAIProvider;

/// Factory for creating LLM providers
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    /// Create an LLM provider from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be created (e.g., missing API key)
    pub fn create(config: &LLMProviderConfig) -> Result<Arc<dyn LLMProvider>> {
        match config.provider {
            #[cfg(feature = "llm-openai")]
            LLMProviderType::OpenAI => {
                let provider = OpenAIProvider::resolve(
                    config.api_key.clone(),
                    config.model.clone(),
                    config.base_url.clone(),
                )?;

                let provider = match config.timeout {
                    Some(timeout) => provider.with_timeout(timeout)?,
                    None => provider,
                };

                tracing::info!(model = provider.model(), "Using OpenAI provider");
                Ok(Arc::new(provider))
            }

            #[cfg(not(feature = "llm-openai"))]
            LLMProviderType::OpenAI => Err(crate::error::ColloquyError::Configuration(
                "OpenAI provider requires 'llm-openai' feature".to_string(),
            )),

            LLMProviderType::Echo => {
                tracing::info!("Using offline echo provider");
                Ok(Arc::new(EchoProvider::new()))
            }
        }
    }
}
