//! Domain models for the messaging subsystem.
//!
//! A [`Message`] is immutable once sent, apart from three single-owner
//! mutations: `is_read`/`read_at` (reader), `email_sent`/`email_sent_at`
//! (dispatcher), and the `completed` flag inside [`ActionRequest`]
//! (external action workflow). All datetime fields use `i64` microseconds
//! since the Unix epoch.

use serde::{Deserialize, Serialize};

use crate::timestamps::micros_to_naive;

/// Identifier type for messages, applications, and attachments.
pub type MessageId = i64;

// =============================================================================
// SenderRole
// =============================================================================

/// The two-role model: administrators and students.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    Admin,
    Student,
}

impl SenderRole {
    /// The opposite party in a conversation. A viewer's unread count only
    /// considers messages authored by their counterpart.
    #[must_use]
    pub const fn counterpart(self) -> Self {
        match self {
            Self::Admin => Self::Student,
            Self::Student => Self::Admin,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Student => "student",
        }
    }

    /// Parse from the stored text form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Self::Admin),
            "student" => Some(Self::Student),
            _ => None,
        }
    }
}

// =============================================================================
// MessageType
// =============================================================================

/// Informational classification of a message. Does not change control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    General,
    DocumentRequest,
    PaymentRequest,
    StatusUpdate,
    AcceptanceLetter,
    RejectionNotice,
    InterviewInvitation,
    AdditionalInfoRequest,
}

impl MessageType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::DocumentRequest => "document_request",
            Self::PaymentRequest => "payment_request",
            Self::StatusUpdate => "status_update",
            Self::AcceptanceLetter => "acceptance_letter",
            Self::RejectionNotice => "rejection_notice",
            Self::InterviewInvitation => "interview_invitation",
            Self::AdditionalInfoRequest => "additional_info_request",
        }
    }

    /// Parse from the stored text form. Unknown values fall back to `General`
    /// so that a widened enum in a newer writer never breaks older readers.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "document_request" => Self::DocumentRequest,
            "payment_request" => Self::PaymentRequest,
            "status_update" => Self::StatusUpdate,
            "acceptance_letter" => Self::AcceptanceLetter,
            "rejection_notice" => Self::RejectionNotice,
            "interview_invitation" => Self::InterviewInvitation,
            "additional_info_request" => Self::AdditionalInfoRequest,
            _ => Self::General,
        }
    }
}

impl Default for MessageType {
    fn default() -> Self {
        Self::General
    }
}

// =============================================================================
// ActionRequest
// =============================================================================

/// The external step a counterpart must perform before a message is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    UploadDocument,
    MakePayment,
    Respond,
}

impl ActionType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UploadDocument => "upload_document",
            Self::MakePayment => "make_payment",
            Self::Respond => "respond",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upload_document" => Some(Self::UploadDocument),
            "make_payment" => Some(Self::MakePayment),
            "respond" => Some(Self::Respond),
            _ => None,
        }
    }
}

/// Action metadata attached to a message at creation.
///
/// Present if and only if the message requires action; `action_type` cannot
/// exist without the request itself, which rules out the invalid field
/// combinations the loosely-typed source records allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action_type: ActionType,
    /// Deadline in microseconds since epoch, if any.
    pub deadline: Option<i64>,
    /// Set by the external action workflow once fulfilled. Defaults to false.
    pub completed: bool,
}

impl ActionRequest {
    #[must_use]
    pub const fn new(action_type: ActionType, deadline: Option<i64>) -> Self {
        Self {
            action_type,
            deadline,
            completed: false,
        }
    }
}

// =============================================================================
// Attachment
// =============================================================================

/// A file attached to a message. Immutable once created; never re-parented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub message_id: MessageId,
    pub file_name: String,
    pub file_url: String,
    /// Size in bytes as reported by the blob store.
    pub file_size: i64,
    /// File extension, e.g. "pdf".
    pub file_type: String,
    pub mime_type: String,
}

// =============================================================================
// Message
// =============================================================================

/// One conversational turn between an administrator and a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub application_id: i64,
    pub sender_role: SenderRole,
    pub sender_id: String,
    pub message_type: MessageType,
    /// Thread grouping key within an application's mailbox.
    pub subject: String,
    pub body: String,
    /// Microseconds since epoch, assigned by the repository at commit.
    pub created_at: i64,
    pub is_read: bool,
    /// Set exactly once when `is_read` transitions false -> true.
    pub read_at: Option<i64>,
    /// Present iff the message requires an external action.
    pub action: Option<ActionRequest>,
    pub parent_message_id: Option<MessageId>,
    pub email_sent: bool,
    pub email_sent_at: Option<i64>,
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// Whether the sender flagged this message as requiring action.
    #[must_use]
    pub const fn requires_action(&self) -> bool {
        self.action.is_some()
    }

    /// Requires action and the counterpart has not yet completed it.
    #[must_use]
    pub fn has_pending_action(&self) -> bool {
        self.action.is_some_and(|a| !a.completed)
    }

    /// Get `created_at` as `NaiveDateTime`.
    #[must_use]
    pub fn created_at_naive(&self) -> chrono::NaiveDateTime {
        micros_to_naive(self.created_at)
    }

    /// Check the cross-field invariants that storage must preserve.
    ///
    /// Returns the name of the first violated invariant, or `None`.
    #[must_use]
    pub fn invariant_violation(&self) -> Option<&'static str> {
        if self.is_read != self.read_at.is_some() {
            return Some("read_at set iff is_read");
        }
        if self.email_sent != self.email_sent_at.is_some() {
            return Some("email_sent_at set iff email_sent");
        }
        if self.attachments.iter().any(|a| a.message_id != self.id) {
            return Some("attachments owned by this message");
        }
        if self.parent_message_id == Some(self.id) {
            return Some("parent must not be self");
        }
        None
    }
}
