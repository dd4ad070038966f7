//! # Colloquy - session-scoped chat history for LLM agents
//!
//! Colloquy keeps a running message history per conversation, bounds it with
//! a configurable compaction pipeline (trim to the last N messages, collapse
//! into a single summary) and routes each turn through a chat model.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use colloquy_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ColloquyConfig::load()?;
//!     let provider = LLMProviderFactory::create(&config.llm)?;
//!     let session = ConversationSession::from_config(&config, provider)?;
//!
//!     let reply = session
//!         .turn("demo", "Translate this sentence from English to French: I love programming.")
//!         .await?;
//!     println!("{}", reply);
//!
//!     let reply = session.turn("demo", "What did I just ask you?").await?;
//!     println!("{}", reply);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `llm-openai` (default): OpenAI chat completions provider

pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{
        ColloquyConfig, ConfigBuilder, ConversationConfig, LLMProvider as LLMProviderType,
        LLMProviderConfig,
    };
    pub use crate::conversation::{
        CompactionOutcome, CompactionPipeline, CompactionPolicy, ConversationSession,
        ConversationSessionBuilder, HistoryStore, LlmSummarizer, SequencedMessage,
        SessionRegistry, Summarizer, TurnOutcome,
    };
    pub use crate::error::{ColloquyError, InvocationErrorKind, Result};
    pub use crate::llm::{
        EchoProvider, LLMProvider, LLMProviderFactory, LLMRequest, LLMResponse, Message,
        MessageRole, TokenUsage,
    };
}
