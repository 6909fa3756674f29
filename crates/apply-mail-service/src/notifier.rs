//! Notification delivery seam.
//!
//! The dispatcher talks to an abstract [`Notifier`]; production wires in an
//! email or push transport, tests wire in the doubles below. Delivery is
//! best-effort: a failed notify never reaches the sender of the message.

use std::sync::Mutex;

use async_trait::async_trait;

use apply_mail_core::{MailError, MailResult, SenderRole};

/// Everything a transport needs to render one notification.
#[derive(Debug, Clone)]
pub struct Notification {
    pub message_id: i64,
    pub application_id: i64,
    pub recipient_name: String,
    pub recipient_email: String,
    /// Role that authored the message being announced.
    pub sender_role: SenderRole,
    pub subject: String,
    pub body: String,
    pub requires_action: bool,
}

/// Outbound notification transport.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> MailResult<()>;
}

/// Test double that records every notification it is handed.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything delivered so far.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|guard| guard.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> MailResult<()> {
        if let Ok(mut guard) = self.sent.lock() {
            guard.push(notification.clone());
        }
        Ok(())
    }
}

/// Test double whose transport is permanently down.
#[derive(Debug, Default)]
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, notification: &Notification) -> MailResult<()> {
        Err(MailError::Dispatch {
            message_id: notification.message_id,
            reason: "transport unavailable".to_string(),
        })
    }
}
