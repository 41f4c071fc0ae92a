//! Prompt templates for comment moderation

use crate::structured::PromptTemplate;

const MODERATION: &str = "You are a comment moderator for a blog. Decide whether the current comment \
may be published. Reject spam, advertising, harassment, hate speech, and personal attacks. \
Accept criticism that is civil, even when it is negative.\n\n\
Thread so far:\n{thread}\n\n\
Current comment:\n{comment}";

const ANALYSIS: &str = "You are an AI that analyzes user comments in a discussion thread. \
Given the current comment and its thread, return its sentiment, a short title, and a reply.\n\n\
Thread:\n{thread}\n\n\
Current comment:\n{comment}";

const REPLY: &str = "You are the friendly author of a blog replying to a reader. \
Write a short, warm reply to the current comment, taking the thread into account. \
Reply with the text only.\n\n\
Thread:\n{thread}\n\n\
Current comment:\n{comment}\n\n\
Reply:";

/// Template used by the moderation workflow
pub fn moderation() -> PromptTemplate {
    PromptTemplate::new(MODERATION)
}

/// Template for best-effort sentiment analysis with a suggested reply
pub fn analysis() -> PromptTemplate {
    PromptTemplate::new(ANALYSIS)
}

/// Template for a streamed free-text reply
pub fn reply() -> PromptTemplate {
    PromptTemplate::new(REPLY)
}
