//! Row models mapping directly to `SQLite` tables.
//!
//! Enum-valued columns are stored as their text form and parsed back into
//! the core enums on read; booleans are stored as 0/1 integers. The domain
//! type [`Message`] is assembled from a [`MessageRow`] plus its attachment
//! rows.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use apply_mail_core::{
    ActionRequest, ActionType, Attachment, MailError, MailResult, Message, MessageType, SenderRole,
};

// =============================================================================
// Application
// =============================================================================

/// Minimal application/student context, consumed when composing mailbox
/// views and notifications.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ApplicationRow {
    pub id: i64,
    pub student_id: String,
    pub student_name: String,
    pub student_email: String,
    pub university: String,
    pub program: String,
    /// Microseconds since Unix epoch
    pub created_at: i64,
}

// =============================================================================
// Message
// =============================================================================

/// A message row as stored. `SQLite` has no bool; 0/1 integers are used.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MessageRow {
    pub id: i64,
    pub application_id: i64,
    pub sender_type: String,
    pub sender_id: String,
    pub message_type: String,
    pub subject: String,
    pub body: String,
    pub created_at: i64,
    pub is_read: i64,
    pub read_at: Option<i64>,
    pub requires_action: i64,
    pub action_type: Option<String>,
    pub action_deadline: Option<i64>,
    pub action_completed: i64,
    pub parent_message_id: Option<i64>,
    pub email_sent: i64,
    pub email_sent_at: Option<i64>,
}

impl MessageRow {
    #[must_use]
    pub const fn is_read_bool(&self) -> bool {
        self.is_read != 0
    }

    #[must_use]
    pub const fn email_sent_bool(&self) -> bool {
        self.email_sent != 0
    }

    /// Assemble the domain [`Message`] from this row and its attachments.
    ///
    /// Fails with a database error on a corrupt `sender_type`; an unknown
    /// `message_type` degrades to `general` instead.
    pub fn into_message(self, attachments: Vec<Attachment>) -> MailResult<Message> {
        let sender_role = SenderRole::parse(&self.sender_type).ok_or_else(|| {
            MailError::Database(format!(
                "message {} has corrupt sender_type '{}'",
                self.id, self.sender_type
            ))
        })?;

        let action = if self.requires_action != 0 {
            self.action_type
                .as_deref()
                .and_then(ActionType::parse)
                .map(|action_type| ActionRequest {
                    action_type,
                    deadline: self.action_deadline,
                    completed: self.action_completed != 0,
                })
        } else {
            None
        };

        Ok(Message {
            id: self.id,
            application_id: self.application_id,
            sender_role,
            sender_id: self.sender_id,
            message_type: MessageType::parse(&self.message_type),
            subject: self.subject,
            body: self.body,
            created_at: self.created_at,
            is_read: self.is_read != 0,
            read_at: self.read_at,
            action,
            parent_message_id: self.parent_message_id,
            email_sent: self.email_sent != 0,
            email_sent_at: self.email_sent_at,
            attachments,
        })
    }
}

// =============================================================================
// Attachment
// =============================================================================

/// An attachment row. Never mutated or re-parented after creation.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AttachmentRow {
    pub id: i64,
    pub message_id: i64,
    pub file_name: String,
    pub file_url: String,
    pub file_size: i64,
    pub file_type: String,
    pub mime_type: String,
}

impl From<AttachmentRow> for Attachment {
    fn from(row: AttachmentRow) -> Self {
        Self {
            id: row.id,
            message_id: row.message_id,
            file_name: row.file_name,
            file_url: row.file_url,
            file_size: row.file_size,
            file_type: row.file_type,
            mime_type: row.mime_type,
        }
    }
}

// =============================================================================
// Write inputs
// =============================================================================

/// Attachment metadata accompanying an append. The blob itself has already
/// been handed to the attachment store; only the resulting URL and metadata
/// are persisted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAttachment {
    pub file_name: String,
    pub file_url: String,
    pub file_size: i64,
    pub file_type: String,
    pub mime_type: String,
}

/// Input for appending one message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub application_id: i64,
    pub sender_role: SenderRole,
    pub sender_id: String,
    pub message_type: MessageType,
    pub subject: String,
    pub body: String,
    /// Present iff the message requires action.
    pub action: Option<(ActionType, Option<i64>)>,
    pub parent_message_id: Option<i64>,
    pub attachments: Vec<NewAttachment>,
}

impl NewMessage {
    /// Minimal constructor; optional fields default to none.
    #[must_use]
    pub fn new(
        application_id: i64,
        sender_role: SenderRole,
        sender_id: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            application_id,
            sender_role,
            sender_id: sender_id.into(),
            message_type: MessageType::General,
            subject: subject.into(),
            body: body.into(),
            action: None,
            parent_message_id: None,
            attachments: Vec::new(),
        }
    }
}

// =============================================================================
// Mailbox
// =============================================================================

/// Filter for the admin-wide mailbox view. All fields optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailboxFilter {
    pub application_id: Option<i64>,
    pub unread_only: bool,
    pub requires_action_only: bool,
    /// Only messages created strictly after this timestamp.
    pub since_ts: Option<i64>,
    pub limit: Option<usize>,
}

/// A mailbox row: message joined with minimal application/student context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailboxEntry {
    pub message: Message,
    pub student_id: String,
    pub student_name: String,
    pub student_email: String,
    pub university: String,
}
