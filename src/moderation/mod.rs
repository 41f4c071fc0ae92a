//! Comment moderation workflow
//!
//! For one submitted comment the [`Moderator`]:
//!
//! 1. rejects a blank comment before anything else happens
//! 2. pushes `analyzing` to the submitting subscriber
//! 3. runs the moderation structured task
//! 4. records the validated decision in external storage
//! 5. pushes `done`, or `failed` if analysis or recording failed
//!
//! A storage failure is reported to the subscriber only; the caller still
//! receives the decision.

use crate::channels::ChannelRegistry;
use crate::error::{Error, Result};
use crate::llm::TextStream;
use crate::structured::{BestEffort, StructuredTaskExecutor, TaskInput};
use crate::types::{
    CommentAnalysis, CommentSubmission, ModerationDecision, ModerationEvent, SubscriberId,
    ThreadMessage,
};
use std::sync::Arc;

pub mod prompts;
mod store;

pub use store::{HttpModerationStore, MODERATE_PATH, ModerationStore};

/// Message sent to subscribers when analysis fails terminally
pub const ANALYSIS_FAILED: &str = "Failed to analyze comment";

/// What happened to a decision after it was produced
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageOutcome {
    /// Storage accepted the decision
    Stored,
    /// Storage was unreachable or refused; carries the error text
    Failed(String),
}

/// Result of moderating one comment
#[derive(Clone, Debug, PartialEq)]
pub struct ModerationOutcome {
    /// The validated decision
    pub decision: ModerationDecision,
    /// Whether it reached storage
    pub storage: StorageOutcome,
}

impl ModerationOutcome {
    /// Whether the decision was recorded
    pub fn stored(&self) -> bool {
        self.storage == StorageOutcome::Stored
    }
}

/// Runs moderation, analysis, and reply tasks for submitted comments
pub struct Moderator {
    registry: Arc<ChannelRegistry<ModerationEvent>>,
    executor: StructuredTaskExecutor,
    store: Arc<dyn ModerationStore>,
}

impl Moderator {
    /// Create a moderator pushing events through `registry`
    pub fn new(
        registry: Arc<ChannelRegistry<ModerationEvent>>,
        executor: StructuredTaskExecutor,
        store: Arc<dyn ModerationStore>,
    ) -> Self {
        Self {
            registry,
            executor,
            store,
        }
    }

    /// Registry events are pushed through
    pub fn registry(&self) -> &Arc<ChannelRegistry<ModerationEvent>> {
        &self.registry
    }

    /// Moderate one comment
    ///
    /// Events are routed by `user_id`; without one they are dropped. The
    /// comment id only travels in event and storage payloads.
    ///
    /// # Errors
    ///
    /// [`Error::MissingField`] for a blank comment (no events are pushed) and
    /// [`Error::Task`] when the model never produced a valid decision.
    pub async fn moderate(&self, submission: CommentSubmission) -> Result<ModerationOutcome> {
        let input = task_input(&submission)?;
        let subscriber = submission.user_id.as_ref();
        let comment_id = submission.comment_id;

        self.notify(
            subscriber,
            ModerationEvent::Analyzing {
                comment_id: comment_id.clone(),
            },
        );

        let analyzed = self
            .executor
            .run::<ModerationDecision>(&prompts::moderation(), &input)
            .await;
        let decision = match analyzed {
            Ok(decision) => decision,
            Err(error) => {
                tracing::error!(
                    comment_id = ?comment_id,
                    error = %error,
                    "comment analysis failed"
                );
                self.notify(
                    subscriber,
                    ModerationEvent::Failed {
                        comment_id,
                        error: ANALYSIS_FAILED.to_string(),
                    },
                );
                return Err(Error::Task(error));
            }
        };

        tracing::info!(
            comment_id = ?comment_id,
            approved = decision.approved,
            sentiment = ?decision.sentiment,
            "comment analyzed"
        );

        let recorded = self.store.record(comment_id.as_ref(), &decision).await;
        let storage = match recorded {
            Ok(()) => {
                self.notify(
                    subscriber,
                    ModerationEvent::Done {
                        comment_id,
                        decision: decision.clone(),
                    },
                );
                StorageOutcome::Stored
            }
            Err(error) => {
                tracing::warn!(
                    comment_id = ?comment_id,
                    error = %error,
                    "failed to record moderation decision"
                );
                let message = error.to_string();
                self.notify(
                    subscriber,
                    ModerationEvent::Failed {
                        comment_id,
                        error: message.clone(),
                    },
                );
                StorageOutcome::Failed(message)
            }
        };

        Ok(ModerationOutcome { decision, storage })
    }

    /// Analyze a comment, falling back to a neutral analysis on failure
    pub async fn analyze(
        &self,
        submission: &CommentSubmission,
    ) -> Result<BestEffort<CommentAnalysis>> {
        let input = task_input(submission)?;
        let analysis = self
            .executor
            .run_best_effort::<CommentAnalysis>(&prompts::analysis(), &input)
            .await?;
        Ok(analysis)
    }

    /// Stream a suggested reply to a comment
    ///
    /// # Errors
    ///
    /// [`Error::MissingField`] for a blank comment and [`Error::Reply`] when
    /// the model cannot start streaming.
    pub async fn stream_reply(&self, submission: &CommentSubmission) -> Result<TextStream> {
        let input = task_input(submission)?;
        self.executor
            .stream_text(&prompts::reply(), &input)
            .await
            .map_err(Error::Reply)
    }

    /// Push `event` to every subscriber, returning how many accepted it
    pub fn broadcast(&self, event: &ModerationEvent) -> usize {
        self.registry.broadcast(event)
    }

    fn notify(&self, subscriber: Option<&SubscriberId>, event: ModerationEvent) {
        match subscriber {
            Some(id) => {
                self.registry.send_to(id, &event);
            }
            None => {
                tracing::debug!(status = event.status(), "no subscriber for event, dropped");
            }
        }
    }
}

/// Prompt inputs for a submission, or `MissingField` for a blank comment
fn task_input(submission: &CommentSubmission) -> Result<TaskInput> {
    let comment = submission
        .comment
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| Error::MissingField("comment".to_string()))?;

    let thread: Vec<ThreadMessage> = submission.thread.clone().unwrap_or_default();

    Ok(TaskInput::new()
        .with("comment", comment)
        .with("thread", thread))
}
