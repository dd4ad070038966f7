//! History compaction policies
//!
//! A [`CompactionPipeline`] runs a fixed list of [`CompactionPolicy`] values
//! against a [`HistoryStore`] before every turn. The default list trims to the
//! last two messages and then summarizes. Because trim runs first, summarize
//! never sees more than `keep_last` messages; reorder the list to compress
//! long histories instead.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{ColloquyError, Result};
use crate::llm::Message;

use super::history::HistoryStore;
use super::summarizer::Summarizer;

/// One compaction step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompactionPolicy {
    /// Keep only the last `keep_last` messages
    Trim { keep_last: usize },
    /// Replace the whole history with one summary message
    Summarize,
}

impl CompactionPolicy {
    /// Get the policy name
    pub fn name(&self) -> &'static str {
        match self {
            CompactionPolicy::Trim { .. } => "trim",
            CompactionPolicy::Summarize => "summarize",
        }
    }

    /// Apply this policy to `store`, returning whether it changed anything.
    ///
    /// `summarizer` is only consulted by [`CompactionPolicy::Summarize`].
    pub async fn apply(
        &self,
        store: &mut HistoryStore,
        summarizer: Option<&dyn Summarizer>,
    ) -> Result<bool> {
        match *self {
            CompactionPolicy::Trim { keep_last } => Ok(trim(store, keep_last)),
            CompactionPolicy::Summarize => {
                let summarizer = summarizer.ok_or_else(|| {
                    ColloquyError::Configuration(
                        "summarize policy requires a summarizer".to_string(),
                    )
                })?;
                summarize(store, summarizer).await
            }
        }
    }
}

/// Keep the last `keep_last` messages in their original order.
///
/// No-op (returns `false`) when the store holds `keep_last` messages or fewer.
pub fn trim(store: &mut HistoryStore, keep_last: usize) -> bool {
    let len = store.len();
    if len <= keep_last {
        return false;
    }

    let kept: Vec<Message> = store.messages()[len - keep_last..]
        .iter()
        .map(|m| m.message.clone())
        .collect();
    store.replace_with(kept);

    info!(
        session = store.session_id(),
        before = len,
        after = keep_last,
        "Trimmed conversation history"
    );
    true
}

/// Replace the whole history with a single summary message.
///
/// No-op (returns `false`) on an empty store. The store is left untouched
/// if the summarizer fails.
pub async fn summarize(store: &mut HistoryStore, summarizer: &dyn Summarizer) -> Result<bool> {
    if store.is_empty() {
        return Ok(false);
    }

    let before = store.len();
    let summary = summarizer.summarize(&store.to_messages()).await?;
    store.replace_with([Message::summary(summary.content)]);

    info!(
        session = store.session_id(),
        before,
        "Summarized conversation history"
    );
    Ok(true)
}

/// What one policy did during a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompactionOutcome {
    pub policy: CompactionPolicy,
    pub compacted: bool,
    pub before: usize,
    pub after: usize,
}

/// Ordered list of policies plus the summarizer they may need
#[derive(Clone)]
pub struct CompactionPipeline {
    policies: Vec<CompactionPolicy>,
    summarizer: Option<Arc<dyn Summarizer>>,
}

impl CompactionPipeline {
    /// Build a pipeline.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `policies` contains
    /// [`CompactionPolicy::Summarize`] but no summarizer is given.
    pub fn new(
        policies: Vec<CompactionPolicy>,
        summarizer: Option<Arc<dyn Summarizer>>,
    ) -> Result<Self> {
        let needs_summarizer = policies
            .iter()
            .any(|p| matches!(p, CompactionPolicy::Summarize));
        if needs_summarizer && summarizer.is_none() {
            return Err(ColloquyError::Configuration(
                "compaction pipeline contains summarize but no summarizer was provided"
                    .to_string(),
            ));
        }

        Ok(Self {
            policies,
            summarizer,
        })
    }

    /// Pipeline that never compacts
    pub fn disabled() -> Self {
        Self {
            policies: Vec::new(),
            summarizer: None,
        }
    }

    pub fn policies(&self) -> &[CompactionPolicy] {
        &self.policies
    }

    /// Run every policy in order. Stops at the first failure.
    pub async fn run(&self, store: &mut HistoryStore) -> Result<Vec<CompactionOutcome>> {
        let mut outcomes = Vec::with_capacity(self.policies.len());

        for policy in &self.policies {
            let before = store.len();
            let compacted = policy.apply(store, self.summarizer.as_deref()).await?;
            debug!(
                session = store.session_id(),
                policy = policy.name(),
                compacted,
                "Compaction policy applied"
            );
            outcomes.push(CompactionOutcome {
                policy: *policy,
                compacted,
                before,
                after: store.len(),
            });
        }

        Ok(outcomes)
    }
}

impl std::fmt::Debug for CompactionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompactionPipeline")
            .field("policies", &self.policies)
            .field("has_summarizer", &self.summarizer.is_some())
            .finish()
    }
}
