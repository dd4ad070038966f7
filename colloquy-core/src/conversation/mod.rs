//! Conversation history management
//!
//! Multi-turn conversations keyed by session id, with history compaction
//! before each turn.
//!
//! # Features
//!
//! - Per-session history stores with monotonic sequence numbers
//! - Trim and summarize compaction, run in a configured order
//! - Atomic turns: a failed model or summarizer call leaves history untouched
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use colloquy_core::conversation::{CompactionPipeline, CompactionPolicy, ConversationSession};
//! use colloquy_core::llm::EchoProvider;
//!
//! # async fn run() -> colloquy_core::error::Result<()> {
//! let session = ConversationSession::builder(Arc::new(EchoProvider::new()))
//!     .pipeline(CompactionPipeline::new(vec![CompactionPolicy::Trim { keep_last: 4 }], None)?)
//!     .build();
//!
//! let reply = session.turn("demo", "Hello!").await?;
//! assert_eq!(reply, "Hello!");
//! # Ok(())
//! # }
//! ```

mod compaction;
mod history;
mod registry;
mod session;
mod summarizer;

pub use compaction::{CompactionOutcome, CompactionPipeline, CompactionPolicy, summarize, trim};
pub use history::{HistoryStore, SequencedMessage};
pub use registry::{SessionRegistry, SharedHistory};
pub use session::{ConversationSession, ConversationSessionBuilder, TurnOutcome};
pub use summarizer::{LlmSummarizer, Summarizer};
