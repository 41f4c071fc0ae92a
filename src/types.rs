//! Core types and events

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Caller-supplied identity of a live subscriber (user or session id)
///
/// Events are always routed by this identity, never by comment id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct SubscriberId(pub String);

impl SubscriberId {
    /// Create a new SubscriberId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identity
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SubscriberId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SubscriberId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a comment in the storage site
///
/// Accepted as either a JSON number or a string and echoed back unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum CommentId {
    /// Numeric id (WordPress comment ids)
    Number(i64),
    /// Opaque string id
    Text(String),
}

impl std::fmt::Display for CommentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommentId::Number(n) => write!(f, "{}", n),
            CommentId::Text(s) => f.write_str(s),
        }
    }
}

/// One earlier message in the discussion a comment belongs to
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ThreadMessage {
    /// Display name of the author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Message body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ThreadMessage {
    /// Create a message with both author and text
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: Some(author.into()),
            text: Some(text.into()),
        }
    }
}

/// A comment submitted for moderation
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentSubmission {
    /// Comment body (required, must not be blank)
    #[serde(default)]
    pub comment: Option<String>,

    /// Preceding messages in the thread
    #[serde(default)]
    pub thread: Option<Vec<ThreadMessage>>,

    /// Storage id of the comment, echoed in events and the storage payload
    #[serde(default)]
    pub comment_id: Option<CommentId>,

    /// Subscriber that should receive lifecycle events
    #[serde(default)]
    pub user_id: Option<SubscriberId>,
}

impl CommentSubmission {
    /// Submission with only a comment body
    pub fn new(comment: impl Into<String>) -> Self {
        Self {
            comment: Some(comment.into()),
            ..Default::default()
        }
    }

    /// Set the subscriber that receives events
    pub fn for_subscriber(mut self, id: impl Into<SubscriberId>) -> Self {
        self.user_id = Some(id.into());
        self
    }

    /// Set the comment id recorded with the decision
    pub fn with_comment_id(mut self, id: CommentId) -> Self {
        self.comment_id = Some(id);
        self
    }
}

/// Overall tone of a comment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    /// Approving, friendly, enthusiastic
    Positive,
    /// Factual or mixed
    Neutral,
    /// Critical, hostile, upset
    Negative,
}

impl Sentiment {
    /// Wire names of every variant, in declaration order
    pub const ALL: [&'static str; 3] = ["positive", "neutral", "negative"];
}

/// Validated outcome of moderating one comment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ModerationDecision {
    /// Whether the comment may be published
    pub approved: bool,

    /// Why the comment was rejected (empty when approved)
    #[serde(default)]
    pub reason: String,

    /// Overall tone
    pub sentiment: Sentiment,

    /// Short title summarising the comment
    pub title: String,
}

/// Best-effort analysis of a comment with a suggested reply
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CommentAnalysis {
    /// Overall tone
    pub sentiment: Sentiment,

    /// Short title summarising the comment
    pub title: String,

    /// Suggested reply to post under the comment
    pub reply: String,
}

impl CommentAnalysis {
    /// Neutral default used when the model cannot produce a usable answer
    pub fn neutral() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            title: "Untitled".to_string(),
            reply: "Thanks for your comment!".to_string(),
        }
    }
}

/// Lifecycle event pushed to a subscriber while a comment is moderated
///
/// Serialized with a `status` tag, e.g.
/// `{"status":"failed","commentId":42,"error":"..."}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ModerationEvent {
    /// The model is analyzing the comment
    Analyzing {
        /// Comment being moderated
        #[serde(
            rename = "commentId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        comment_id: Option<CommentId>,
    },

    /// The decision was produced and recorded
    Done {
        /// Comment that was moderated
        #[serde(
            rename = "commentId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        comment_id: Option<CommentId>,
        /// The recorded decision
        decision: ModerationDecision,
    },

    /// Analysis or recording failed
    Failed {
        /// Comment that was being moderated
        #[serde(
            rename = "commentId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        comment_id: Option<CommentId>,
        /// What went wrong
        error: String,
    },
}

impl ModerationEvent {
    /// Status tag as it appears on the wire
    pub fn status(&self) -> &'static str {
        match self {
            ModerationEvent::Analyzing { .. } => "analyzing",
            ModerationEvent::Done { .. } => "done",
            ModerationEvent::Failed { .. } => "failed",
        }
    }
}
