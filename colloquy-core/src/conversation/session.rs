//! Conversation Session

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{ColloquyConfig, DEFAULT_SYSTEM_PROMPT};
use crate::error::Result;
use crate::llm::{LLMProvider, LLMRequest, Message, TokenUsage};

use super::compaction::{CompactionOutcome, CompactionPipeline};
use super::history::SequencedMessage;
use super::registry::SessionRegistry;
use super::summarizer::LlmSummarizer;

/// Everything a successful turn produced
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    /// Assistant reply
    pub reply: String,
    /// What each compaction policy did before the model was called
    pub compactions: Vec<CompactionOutcome>,
    /// Token usage reported by the provider, if any
    pub usage: Option<TokenUsage>,
    /// History length after the turn was recorded
    pub history_len: usize,
}

impl TurnOutcome {
    /// Whether any policy changed the history this turn
    pub fn compacted(&self) -> bool {
        self.compactions.iter().any(|c| c.compacted)
    }
}

/// Answers user input for any number of sessions.
///
/// Owns the session registry, the compaction pipeline and the chat model.
/// Turns on the same session run one at a time; turns on different sessions
/// do not wait for each other.
pub struct ConversationSession {
    registry: SessionRegistry,
    provider: Arc<dyn LLMProvider>,
    pipeline: CompactionPipeline,
    system_prompt: String,
    temperature: Option<f32>,
    max_tokens: Option<usize>,
}

impl ConversationSession {
    /// Start building a session around `provider`
    pub fn builder(provider: Arc<dyn LLMProvider>) -> ConversationSessionBuilder {
        ConversationSessionBuilder::new(provider)
    }

    /// Build from loaded configuration.
    ///
    /// The summarizer, when the pipeline needs one, talks to the same provider.
    pub fn from_config(config: &ColloquyConfig, provider: Arc<dyn LLMProvider>) -> Result<Self> {
        let summarizer = LlmSummarizer::new(Arc::clone(&provider))
            .with_instruction(config.conversation.summary_instruction.clone())
            .with_temperature(Some(config.llm.temperature))
            .with_max_tokens(config.llm.max_tokens);

        let pipeline = CompactionPipeline::new(
            config.conversation.compaction.clone(),
            Some(Arc::new(summarizer)),
        )?;

        Ok(Self::builder(provider)
            .system_prompt(config.conversation.system_prompt.clone())
            .pipeline(pipeline)
            .temperature(Some(config.llm.temperature))
            .max_tokens(config.llm.max_tokens)
            .build())
    }

    /// Answer `input` within `session_id` and return the reply text.
    pub async fn turn(&self, session_id: &str, input: &str) -> Result<String> {
        Ok(self.turn_with_report(session_id, input).await?.reply)
    }

    /// Answer `input` within `session_id`.
    ///
    /// Compaction runs first, then the model sees the system prompt, the
    /// compacted history and the new input. The input and the reply are
    /// recorded only if every step succeeds; on error the session's history
    /// is exactly what it was before the call.
    pub async fn turn_with_report(&self, session_id: &str, input: &str) -> Result<TurnOutcome> {
        let handle = self.registry.get_or_create(session_id).await;
        let mut store = handle.lock().await;
        debug!(session = session_id, history_len = store.len(), "Starting turn");

        let mut working = store.clone();
        let compactions = self.pipeline.run(&mut working).await.inspect_err(|e| {
            warn!(session = session_id, error = %e, "Compaction failed, history unchanged");
        })?;

        let mut prompt = Vec::with_capacity(working.len() + 2);
        if !self.system_prompt.is_empty() {
            prompt.push(Message::system(self.system_prompt.as_str()));
        }
        prompt.extend(working.to_messages());
        prompt.push(Message::user(input));

        let request = LLMRequest::new(prompt)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        let response = self
            .provider
            .generate_request(&request)
            .await
            .inspect_err(|e| {
                warn!(session = session_id, error = %e, "Model invocation failed, history unchanged");
            })?;

        working.append(Message::user(input));
        working.append(Message::assistant(response.content.as_str()));
        *store = working;

        info!(
            session = session_id,
            history_len = store.len(),
            estimated_tokens = store.estimate_tokens(),
            total_tokens = response.usage.map(|u| u.total_tokens),
            "Turn completed"
        );

        Ok(TurnOutcome {
            reply: response.content,
            compactions,
            usage: response.usage,
            history_len: store.len(),
        })
    }

    /// Snapshot of a session's history, creating the session if unknown
    pub async fn history(&self, session_id: &str) -> Vec<SequencedMessage> {
        let handle = self.registry.get_or_create(session_id).await;
        let store = handle.lock().await;
        store.messages().to_vec()
    }

    /// Drop every message in a session
    pub async fn reset(&self, session_id: &str) {
        let handle = self.registry.get_or_create(session_id).await;
        handle.lock().await.clear();
        info!(session = session_id, "Session history cleared");
    }

    /// Ids of all sessions seen so far
    pub async fn session_ids(&self) -> Vec<String> {
        self.registry.session_ids().await
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn pipeline(&self) -> &CompactionPipeline {
        &self.pipeline
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

/// Builder for [`ConversationSession`]
pub struct ConversationSessionBuilder {
    provider: Arc<dyn LLMProvider>,
    pipeline: CompactionPipeline,
    system_prompt: String,
    temperature: Option<f32>,
    max_tokens: Option<usize>,
}

impl ConversationSessionBuilder {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider,
            pipeline: CompactionPipeline::disabled(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn pipeline(mut self, pipeline: CompactionPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: Option<usize>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn build(self) -> ConversationSession {
        ConversationSession {
            registry: SessionRegistry::new(),
            provider: self.provider,
            pipeline: self.pipeline,
            system_prompt: self.system_prompt,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::CompactionPolicy;
    use crate::error::{ColloquyError, InvocationErrorKind};
    use crate::llm::{LLMResponse, MessageRole};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with a fixed string and remembers every prompt it saw.
    struct ScriptedProvider {
        reply: String,
        prompts: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedProvider {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn last_prompt(&self) -> Vec<Message> {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn generate_request(&self, request: &LLMRequest) -> Result<LLMResponse> {
            self.prompts.lock().unwrap().push(request.messages.clone());
            Ok(LLMResponse {
                content: self.reply.clone(),
                usage: Some(TokenUsage {
                    prompt_tokens: 10,
                    completion_tokens: 2,
                    total_tokens: 12,
                }),
            })
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl LLMProvider for FailingProvider {
        async fn generate_request(&self, _request: &LLMRequest) -> Result<LLMResponse> {
            Err(ColloquyError::invocation(
                InvocationErrorKind::RateLimited,
                "quota exceeded",
            ))
        }
    }

    #[tokio::test]
    async fn test_first_turn_records_user_then_assistant() {
        let session = ConversationSession::builder(ScriptedProvider::new("Hello")).build();

        let reply = session.turn("s1", "Hi").await.unwrap();

        assert_eq!(reply, "Hello");
        let history = session.history("s1").await;
        let messages: Vec<_> = history.iter().map(|m| m.message.clone()).collect();
        assert_eq!(
            messages,
            vec![Message::user("Hi"), Message::assistant("Hello")]
        );
    }

    #[tokio::test]
    async fn test_prompt_is_system_history_then_input() {
        let provider = ScriptedProvider::new("ok");
        let session = ConversationSession::builder(provider.clone())
            .system_prompt("Be brief.")
            .build();

        session.turn("s1", "one").await.unwrap();
        session.turn("s1", "two").await.unwrap();

        assert_eq!(
            provider.last_prompt(),
            vec![
                Message::system("Be brief."),
                Message::user("one"),
                Message::assistant("ok"),
                Message::user("two"),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_system_prompt_is_omitted() {
        let provider = ScriptedProvider::new("ok");
        let session = ConversationSession::builder(provider.clone())
            .system_prompt("")
            .build();

        session.turn("s1", "hi").await.unwrap();
        assert_eq!(provider.last_prompt(), vec![Message::user("hi")]);
    }

    #[tokio::test]
    async fn test_failed_model_call_leaves_history_unchanged() {
        let session = ConversationSession::builder(Arc::new(FailingProvider)).build();

        let err = session.turn("s1", "Hi").await.unwrap_err();

        assert_eq!(err.invocation_kind(), Some(InvocationErrorKind::RateLimited));
        assert!(session.history("s1").await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_turn_after_trim_restores_history() {
        let ok = ConversationSession::builder(ScriptedProvider::new("ok")).build();
        for i in 0..3 {
            ok.turn("s1", &format!("q{}", i)).await.unwrap();
        }
        let before = ok.history("s1").await;

        // Same history, now behind a trimming pipeline and a failing model.
        let failing = ConversationSession::builder(Arc::new(FailingProvider))
            .pipeline(
                CompactionPipeline::new(vec![CompactionPolicy::Trim { keep_last: 2 }], None)
                    .unwrap(),
            )
            .build();
        {
            let handle = failing.registry().get_or_create("s1").await;
            let mut store = handle.lock().await;
            for m in &before {
                store.append(m.message.clone());
            }
        }

        assert!(failing.turn("s1", "q3").await.is_err());
        assert_eq!(failing.history("s1").await.len(), before.len());
    }

    #[tokio::test]
    async fn test_trim_runs_before_prompt() {
        let provider = ScriptedProvider::new("ok");
        let session = ConversationSession::builder(provider.clone())
            .system_prompt("")
            .pipeline(
                CompactionPipeline::new(vec![CompactionPolicy::Trim { keep_last: 2 }], None)
                    .unwrap(),
            )
            .build();

        session.turn("s1", "a").await.unwrap();
        session.turn("s1", "b").await.unwrap();
        let outcome = session.turn_with_report("s1", "c").await.unwrap();

        assert!(outcome.compacted());
        assert_eq!(outcome.usage.map(|u| u.total_tokens), Some(12));
        assert_eq!(outcome.history_len, 4);
        assert_eq!(
            provider.last_prompt(),
            vec![Message::user("b"), Message::assistant("ok"), Message::user("c")]
        );
    }

    #[tokio::test]
    async fn test_from_config_uses_default_pipeline() {
        let provider = ScriptedProvider::new("digest");
        let session =
            ConversationSession::from_config(&ColloquyConfig::default(), provider.clone()).unwrap();

        session.turn("demo", "Translate: I love programming.").await.unwrap();
        let outcome = session
            .turn_with_report("demo", "What did I just ask you?")
            .await
            .unwrap();

        // Trim(2) was a no-op on two messages, then summarize collapsed them.
        assert!(!outcome.compactions[0].compacted);
        assert!(outcome.compactions[1].compacted);

        let history = session.history("demo").await;
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].role(), MessageRole::Summary);
        assert_eq!(history[0].content(), "digest");
        assert_eq!(history[1].content(), "What did I just ask you?");
    }

    #[tokio::test]
    async fn test_reset_clears_one_session() {
        let session = ConversationSession::builder(ScriptedProvider::new("ok")).build();
        session.turn("a", "hi").await.unwrap();
        session.turn("b", "hi").await.unwrap();

        session.reset("a").await;

        assert!(session.history("a").await.is_empty());
        assert_eq!(session.history("b").await.len(), 2);
        assert_eq!(session.session_ids().await, vec!["a", "b"]);
    }
}
