//! The messaging service facade.
//!
//! [`MailService`] ties the pieces together: the send pipeline (normalize,
//! validate, append, dispatch), thread and reply views, read-state, and the
//! admin mailbox. All persistence goes through the repository layer; all
//! notification delivery goes through the [`Notifier`] seam.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use apply_mail_core::config::MAX_SUBJECT_CHARS;
use apply_mail_core::{
    aggregate, resolve_parent, ActionType, Config, GroupingKey, MailError, MailResult, Message,
    MessageType, ParentExcerpt, SenderRole, Thread,
};
use apply_mail_db::{connect, queries, ApplicationRow, DbPool, MailboxEntry, MailboxFilter,
    NewAttachment, NewMessage};

use crate::directory::{ApplicationDirectory, SqliteDirectory};
use crate::dispatch::{self, DispatchResult};
use crate::notifier::Notifier;

/// Input for sending one message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessage {
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

impl SendMessage {
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

/// Outcome of a read-state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadStatus {
    pub message_id: i64,
    pub read: bool,
    /// Set on the first transition and preserved by every later call.
    pub read_at: Option<i64>,
}

/// A message together with its resolved reply context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    pub message: Message,
    /// Present when the message replies to a resolvable parent in its thread.
    pub in_reply_to: Option<ParentExcerpt>,
}

/// The messaging service.
pub struct MailService {
    pool: DbPool,
    config: Config,
    notifier: Arc<dyn Notifier>,
    directory: Arc<dyn ApplicationDirectory>,
}

impl MailService {
    /// Recipient lookup defaults to the applications table behind `pool`.
    #[must_use]
    pub fn new(pool: DbPool, config: Config, notifier: Arc<dyn Notifier>) -> Self {
        let directory = Arc::new(SqliteDirectory::new(pool.clone()));
        Self {
            pool,
            config,
            notifier,
            directory,
        }
    }

    /// Substitute the recipient lookup (test double, external directory).
    #[must_use]
    pub fn with_directory(mut self, directory: Arc<dyn ApplicationDirectory>) -> Self {
        self.directory = directory;
        self
    }

    /// Connect to the configured database and wrap it in a service.
    pub async fn connect(config: Config, notifier: Arc<dyn Notifier>) -> MailResult<Self> {
        let pool = connect(&config.database_url).await?;
        Ok(Self::new(pool, config, notifier))
    }

    #[must_use]
    pub const fn pool(&self) -> &DbPool {
        &self.pool
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Register the application an exchange hangs off.
    pub async fn register_application(
        &self,
        student_id: &str,
        student_name: &str,
        student_email: &str,
        university: &str,
        program: &str,
    ) -> MailResult<ApplicationRow> {
        queries::create_application(
            &self.pool,
            student_id,
            student_name,
            student_email,
            university,
            program,
        )
        .await
    }

    // ── Send pipeline ───────────────────────────────────────────────

    /// Send a message: normalize the subject, enforce size limits, append to
    /// the log, then kick off background notification dispatch.
    ///
    /// The returned message reflects the appended state; dispatch outcome is
    /// observable later via `email_sent`, never here.
    pub async fn send_message(&self, input: SendMessage) -> MailResult<Message> {
        validate_sizes(&self.config, &input)?;

        let new = NewMessage {
            application_id: input.application_id,
            sender_role: input.sender_role,
            sender_id: input.sender_id,
            message_type: input.message_type,
            subject: normalize_subject(input.subject),
            body: input.body,
            action: input.action,
            parent_message_id: input.parent_message_id,
            attachments: input.attachments,
        };

        let message = queries::append_message(&self.pool, new, self.config.max_reply_depth).await?;

        if self.config.dispatch_enabled {
            dispatch::spawn_dispatch(
                self.pool.clone(),
                Arc::clone(&self.notifier),
                Arc::clone(&self.directory),
                message.id,
            );
        }
        Ok(message)
    }

    // ── Views ───────────────────────────────────────────────────────

    /// An application's threads for `viewer`, under the configured grouping.
    pub async fn list_threads(
        &self,
        application_id: i64,
        viewer: SenderRole,
    ) -> MailResult<Vec<Thread>> {
        self.list_threads_with(application_id, self.config.default_grouping, viewer)
            .await
    }

    /// An application's threads for `viewer`, under an explicit grouping.
    pub async fn list_threads_with(
        &self,
        application_id: i64,
        key: GroupingKey,
        viewer: SenderRole,
    ) -> MailResult<Vec<Thread>> {
        let messages = queries::list_by_application(&self.pool, application_id).await?;
        Ok(aggregate(messages, key, viewer))
    }

    /// One message with its reply context resolved inside its own thread.
    ///
    /// A parent outside the thread (or missing entirely) yields no excerpt;
    /// the message itself is always returned.
    pub async fn message_view(&self, message_id: i64, viewer: SenderRole) -> MailResult<MessageView> {
        let message = queries::get_message(&self.pool, message_id).await?;
        let all = queries::list_by_application(&self.pool, message.application_id).await?;
        let threads = aggregate(all, self.config.default_grouping, viewer);

        let thread_messages = threads
            .iter()
            .find(|t| t.messages.iter().any(|m| m.id == message_id))
            .map_or(&[][..], |t| t.messages.as_slice());
        let in_reply_to = resolve_parent(&message, thread_messages, self.config.reply_excerpt_chars);

        Ok(MessageView {
            message,
            in_reply_to,
        })
    }

    /// The admin-wide mailbox, newest first.
    pub async fn mailbox(&self, filter: &MailboxFilter) -> MailResult<Vec<MailboxEntry>> {
        queries::list_mailbox(&self.pool, filter).await
    }

    // ── Mutations ───────────────────────────────────────────────────

    /// Mark a message read from `reader`'s perspective. Idempotent; reading
    /// one's own message is a no-op, and repeat calls return the identical
    /// `read_at`.
    pub async fn mark_message_read(
        &self,
        message_id: i64,
        reader: SenderRole,
    ) -> MailResult<ReadStatus> {
        let message = queries::mark_read(&self.pool, message_id, reader).await?;
        Ok(ReadStatus {
            message_id: message.id,
            read: message.is_read,
            read_at: message.read_at,
        })
    }

    /// Mark a requested action fulfilled. Idempotent.
    pub async fn complete_action(&self, message_id: i64) -> MailResult<Message> {
        queries::mark_action_completed(&self.pool, message_id).await
    }

    /// Re-run dispatch for a message whose notification never went out.
    pub async fn redispatch(&self, message_id: i64) -> MailResult<DispatchResult> {
        dispatch::dispatch(
            &self.pool,
            self.notifier.as_ref(),
            self.directory.as_ref(),
            message_id,
        )
        .await
    }
}

/// Truncate over-long subjects at the character limit.
fn normalize_subject(subject: String) -> String {
    if subject.chars().count() <= MAX_SUBJECT_CHARS {
        return subject;
    }
    let truncated: String = subject.chars().take(MAX_SUBJECT_CHARS).collect();
    tracing::warn!(
        original_chars = subject.chars().count(),
        "subject truncated to {MAX_SUBJECT_CHARS} characters"
    );
    truncated
}

/// Enforce the configured size ceilings. A limit of 0 means unlimited.
fn validate_sizes(config: &Config, input: &SendMessage) -> MailResult<()> {
    let body_bytes = input.body.len();
    if config.max_message_body_bytes > 0 && body_bytes > config.max_message_body_bytes {
        return Err(MailError::SizeLimitExceeded {
            field: "body",
            size_bytes: body_bytes,
            limit_bytes: config.max_message_body_bytes,
        });
    }

    let mut total = body_bytes;
    for attachment in &input.attachments {
        let size = usize::try_from(attachment.file_size).map_err(|_| {
            MailError::InvalidArgument(format!(
                "attachment '{}' has negative size {}",
                attachment.file_name, attachment.file_size
            ))
        })?;
        if config.max_attachment_bytes > 0 && size > config.max_attachment_bytes {
            return Err(MailError::SizeLimitExceeded {
                field: "attachment",
                size_bytes: size,
                limit_bytes: config.max_attachment_bytes,
            });
        }
        total = total.saturating_add(size);
    }

    if config.max_total_message_bytes > 0 && total > config.max_total_message_bytes {
        return Err(MailError::SizeLimitExceeded {
            field: "message",
            size_bytes: total,
            limit_bytes: config.max_total_message_bytes,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(size: i64) -> NewAttachment {
        NewAttachment {
            file_name: "a.pdf".into(),
            file_url: "mem://a.pdf".into(),
            file_size: size,
            file_type: "pdf".into(),
            mime_type: "application/pdf".into(),
        }
    }

    #[test]
    fn short_subject_passes_through() {
        assert_eq!(normalize_subject("Visa".into()), "Visa");
    }

    #[test]
    fn long_subject_truncates_at_char_limit() {
        let long = "é".repeat(MAX_SUBJECT_CHARS + 50);
        let normalized = normalize_subject(long);
        assert_eq!(normalized.chars().count(), MAX_SUBJECT_CHARS);
        // Multibyte input stays valid UTF-8 at the cut.
        assert!(normalized.chars().all(|c| c == 'é'));
    }

    #[test]
    fn body_over_limit_rejected() {
        let config = Config {
            max_message_body_bytes: 10,
            ..Config::default()
        };
        let input = SendMessage::new(1, SenderRole::Admin, "adm-1", "s", "x".repeat(11));
        let err = validate_sizes(&config, &input).expect_err("body over limit");
        assert!(matches!(err, MailError::SizeLimitExceeded { field: "body", .. }));
    }

    #[test]
    fn attachment_over_limit_rejected() {
        let config = Config {
            max_attachment_bytes: 100,
            ..Config::default()
        };
        let mut input = SendMessage::new(1, SenderRole::Admin, "adm-1", "s", "body");
        input.attachments.push(attachment(101));
        let err = validate_sizes(&config, &input).expect_err("attachment over limit");
        assert!(matches!(
            err,
            MailError::SizeLimitExceeded { field: "attachment", .. }
        ));
    }

    #[test]
    fn total_limit_covers_body_plus_attachments() {
        let config = Config {
            max_attachment_bytes: 0,
            max_total_message_bytes: 100,
            ..Config::default()
        };
        let mut input = SendMessage::new(1, SenderRole::Admin, "adm-1", "s", "x".repeat(60));
        input.attachments.push(attachment(60));
        let err = validate_sizes(&config, &input).expect_err("total over limit");
        assert!(matches!(
            err,
            MailError::SizeLimitExceeded { field: "message", .. }
        ));
    }

    #[test]
    fn negative_attachment_size_rejected_even_without_limits() {
        let config = Config {
            max_message_body_bytes: 0,
            max_attachment_bytes: 0,
            max_total_message_bytes: 0,
            ..Config::default()
        };
        let mut input = SendMessage::new(1, SenderRole::Admin, "adm-1", "s", "body");
        input.attachments.push(attachment(-1));
        let err = validate_sizes(&config, &input).expect_err("negative size");
        assert!(matches!(err, MailError::InvalidArgument(_)));
    }

    #[test]
    fn zero_limits_are_unlimited() {
        let config = Config {
            max_message_body_bytes: 0,
            max_attachment_bytes: 0,
            max_total_message_bytes: 0,
            ..Config::default()
        };
        let mut input = SendMessage::new(1, SenderRole::Admin, "adm-1", "s", "x".repeat(1_000_000));
        input.attachments.push(attachment(i64::MAX));
        assert!(validate_sizes(&config, &input).is_ok());
    }
}
