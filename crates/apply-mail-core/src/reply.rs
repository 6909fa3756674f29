//! Reply resolution.
//!
//! Resolves a message's `parent_message_id` into a renderable quoted excerpt
//! using only the messages of the surrounding thread. A parent living in a
//! different thread (subject-split replies) is treated as unresolved, not an
//! error.

use serde::{Deserialize, Serialize};

use crate::models::{Message, SenderRole};

/// A bounded excerpt of the replied-to message, for quoted rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentExcerpt {
    pub parent_id: i64,
    /// Who wrote the parent, for attribution.
    pub sender_role: SenderRole,
    /// Truncated body text, char-boundary safe.
    pub excerpt: String,
    pub truncated: bool,
}

/// Resolve `message`'s parent within `thread_messages`.
///
/// Returns `None` when the message has no parent reference or the referenced
/// id is not part of the given thread set. `excerpt_chars` bounds the quoted
/// text length in characters.
#[must_use]
pub fn resolve_parent(
    message: &Message,
    thread_messages: &[Message],
    excerpt_chars: usize,
) -> Option<ParentExcerpt> {
    let parent_id = message.parent_message_id?;
    let parent = thread_messages.iter().find(|m| m.id == parent_id)?;

    let (excerpt, truncated) = truncate_chars(&parent.body, excerpt_chars);
    Some(ParentExcerpt {
        parent_id: parent.id,
        sender_role: parent.sender_role,
        excerpt,
        truncated,
    })
}

/// Truncate to at most `max_chars` characters, appending an ellipsis when
/// text was cut. Operates on char boundaries so multi-byte UTF-8 never
/// splits.
fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    if text.chars().count() <= max_chars {
        return (text.to_string(), false);
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    (out, true)
}
