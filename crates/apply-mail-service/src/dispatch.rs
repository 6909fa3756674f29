//! Notification dispatch.
//!
//! Dispatch runs after a message is durably appended and is strictly
//! best-effort: a transport failure is logged and leaves `email_sent` clear,
//! so the message can be re-dispatched later. The sender never observes a
//! dispatch failure.

use std::sync::Arc;

use apply_mail_core::{MailResult, Message};
use apply_mail_db::{queries, DbPool};

use crate::directory::{ApplicationContext, ApplicationDirectory};
use crate::notifier::{Notification, Notifier};

/// What a dispatch attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchResult {
    /// False when the message was already dispatched and nothing was sent.
    pub attempted: bool,
    pub succeeded: bool,
}

/// Dispatch one message's notification, at most once.
///
/// Already-dispatched messages are skipped. On success `email_sent` is set;
/// on transport failure the flag stays clear and the failure is only logged.
/// Errors out only when the message or its application cannot be loaded.
pub async fn dispatch(
    pool: &DbPool,
    notifier: &dyn Notifier,
    directory: &dyn ApplicationDirectory,
    message_id: i64,
) -> MailResult<DispatchResult> {
    let message = queries::get_message(pool, message_id).await?;
    if message.email_sent {
        return Ok(DispatchResult {
            attempted: false,
            succeeded: false,
        });
    }

    let context = directory.application_context(message.application_id).await?;
    let notification = build_notification(&message, &context);

    match notifier.notify(&notification).await {
        Ok(()) => {
            queries::mark_email_sent(pool, message_id).await?;
            tracing::debug!(message_id, "notification dispatched");
            Ok(DispatchResult {
                attempted: true,
                succeeded: true,
            })
        }
        Err(e) => {
            tracing::warn!(message_id, error = %e, "notification dispatch failed");
            Ok(DispatchResult {
                attempted: true,
                succeeded: false,
            })
        }
    }
}

/// Fire-and-forget dispatch on the runtime.
///
/// Load failures inside the task are logged; nothing propagates back to the
/// append caller.
pub fn spawn_dispatch(
    pool: DbPool,
    notifier: Arc<dyn Notifier>,
    directory: Arc<dyn ApplicationDirectory>,
    message_id: i64,
) {
    tokio::spawn(async move {
        if let Err(e) = dispatch(&pool, notifier.as_ref(), directory.as_ref(), message_id).await {
            tracing::warn!(message_id, error = %e, "background dispatch aborted");
        }
    });
}

fn build_notification(message: &Message, context: &ApplicationContext) -> Notification {
    Notification {
        message_id: message.id,
        application_id: message.application_id,
        recipient_name: context.student_name.clone(),
        recipient_email: context.student_email.clone(),
        sender_role: message.sender_role,
        subject: message.subject.clone(),
        body: message.body.clone(),
        requires_action: message.has_pending_action(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apply_mail_core::{MailError, SenderRole};
    use apply_mail_db::{connect_memory, NewMessage};

    use crate::directory::SqliteDirectory;
    use crate::notifier::{FailingNotifier, RecordingNotifier};

    async fn seed() -> (DbPool, i64) {
        let pool = connect_memory().await.expect("memory pool");
        let app = queries::create_application(
            &pool,
            "stu-1",
            "Ada Lovelace",
            "ada@example.edu",
            "Cambridge",
            "Mathematics",
        )
        .await
        .expect("application");
        let msg = queries::append_message(
            &pool,
            NewMessage::new(app.id, SenderRole::Admin, "adm-1", "Visa", "hello"),
            64,
        )
        .await
        .expect("append");
        (pool, msg.id)
    }

    #[tokio::test]
    async fn success_marks_email_sent() {
        let (pool, message_id) = seed().await;
        let notifier = RecordingNotifier::new();
        let directory = SqliteDirectory::new(pool.clone());

        let result = dispatch(&pool, &notifier, &directory, message_id)
            .await
            .expect("dispatch");
        assert!(result.attempted);
        assert!(result.succeeded);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient_email, "ada@example.edu");
        assert_eq!(sent[0].subject, "Visa");

        let message = queries::get_message(&pool, message_id).await.expect("get");
        assert!(message.email_sent);
        assert!(message.email_sent_at.is_some());
    }

    #[tokio::test]
    async fn repeat_dispatch_is_skipped() {
        let (pool, message_id) = seed().await;
        let notifier = RecordingNotifier::new();
        let directory = SqliteDirectory::new(pool.clone());

        dispatch(&pool, &notifier, &directory, message_id)
            .await
            .expect("first");
        let second = dispatch(&pool, &notifier, &directory, message_id)
            .await
            .expect("second");
        assert!(!second.attempted);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn failure_leaves_email_sent_clear() {
        let (pool, message_id) = seed().await;
        let directory = SqliteDirectory::new(pool.clone());

        let result = dispatch(&pool, &FailingNotifier, &directory, message_id)
            .await
            .expect("dispatch resolves despite transport failure");
        assert!(result.attempted);
        assert!(!result.succeeded);

        let message = queries::get_message(&pool, message_id).await.expect("get");
        assert!(!message.email_sent);
        assert!(message.email_sent_at.is_none());

        // A later attempt with a working transport recovers.
        let retry_notifier = RecordingNotifier::new();
        let retry = dispatch(&pool, &retry_notifier, &directory, message_id)
            .await
            .expect("retry");
        assert!(retry.succeeded);
        let message = queries::get_message(&pool, message_id).await.expect("get");
        assert!(message.email_sent);
    }

    #[tokio::test]
    async fn missing_message_errors() {
        let (pool, _) = seed().await;
        let directory = SqliteDirectory::new(pool.clone());
        let err = dispatch(&pool, &RecordingNotifier::new(), &directory, 404)
            .await
            .expect_err("missing message");
        assert!(matches!(err, MailError::MessageNotFound(404)));
    }
}
