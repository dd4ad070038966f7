//! Summarization collaborator

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::DEFAULT_SUMMARY_INSTRUCTION;
use crate::error::{ColloquyError, InvocationErrorKind, Result};
use crate::llm::{LLMProvider, LLMRequest, Message};

/// Produces one message standing in for a sequence of messages
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Distill `messages` into a single message.
    ///
    /// Failures are external invocation failures; the caller must not have
    /// touched its history yet.
    async fn summarize(&self, messages: &[Message]) -> Result<Message>;
}

/// Summarizer backed by a chat model.
///
/// Sends the history followed by a user instruction asking for a digest.
pub struct LlmSummarizer {
    provider: Arc<dyn LLMProvider>,
    instruction: String,
    temperature: Option<f32>,
    max_tokens: Option<usize>,
}

impl LlmSummarizer {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            instruction: DEFAULT_SUMMARY_INSTRUCTION.to_string(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<usize>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, messages: &[Message]) -> Result<Message> {
        let mut prompt = messages.to_vec();
        prompt.push(Message::user(self.instruction.as_str()));

        let request = LLMRequest::new(prompt)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        let response = self.provider.generate_request(&request).await?;

        // An empty digest would silently wipe the history it replaces.
        if response.content.trim().is_empty() {
            return Err(ColloquyError::invocation(
                InvocationErrorKind::InvalidResponse,
                "summarizer returned an empty summary",
            ));
        }

        Ok(Message::assistant(response.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LLMResponse, MessageRole};
    use std::sync::Mutex;

    struct RecordingProvider {
        reply: String,
        seen: Mutex<Vec<Message>>,
    }

    #[async_trait]
    impl LLMProvider for RecordingProvider {
        async fn generate_request(&self, request: &LLMRequest) -> Result<LLMResponse> {
            *self.seen.lock().unwrap() = request.messages.clone();
            Ok(LLMResponse {
                content: self.reply.clone(),
                usage: None,
            })
        }
    }

    #[tokio::test]
    async fn test_history_then_instruction() {
        let provider = Arc::new(RecordingProvider {
            reply: "They greeted each other.".to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let summarizer = LlmSummarizer::new(provider.clone());

        let summary = summarizer
            .summarize(&[Message::user("Hi"), Message::assistant("Hello")])
            .await
            .unwrap();

        assert_eq!(summary.content, "They greeted each other.");

        let seen = provider.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], Message::user("Hi"));
        assert_eq!(seen[2].role, MessageRole::User);
        assert_eq!(seen[2].content, DEFAULT_SUMMARY_INSTRUCTION);
    }

    #[tokio::test]
    async fn test_custom_instruction() {
        let provider = Arc::new(RecordingProvider {
            reply: "short".to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let summarizer = LlmSummarizer::new(provider.clone()).with_instruction("Summarize.");
        assert_eq!(summarizer.instruction(), "Summarize.");

        summarizer.summarize(&[Message::user("Hi")]).await.unwrap();
        let seen = provider.seen.lock().unwrap().clone();
        assert_eq!(seen.last().map(|m| m.content.as_str()), Some("Summarize."));
    }

    #[tokio::test]
    async fn test_empty_summary_is_rejected() {
        let provider = Arc::new(RecordingProvider {
            reply: "   ".to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let summarizer = LlmSummarizer::new(provider);

        let err = summarizer
            .summarize(&[Message::user("Hi")])
            .await
            .unwrap_err();
        assert_eq!(
            err.invocation_kind(),
            Some(InvocationErrorKind::InvalidResponse)
        );
    }
}
