//! Service layer for Apply Mail
//!
//! Composes the persistence layer and core algorithms into the operations
//! callers use:
//! - the send pipeline (normalize, validate, append, dispatch)
//! - thread and reply views
//! - read-state and action mutations
//! - the admin mailbox
//! - best-effort notification dispatch behind the [`Notifier`] seam

#![forbid(unsafe_code)]

pub mod attachments;
pub mod directory;
pub mod dispatch;
pub mod messaging;
pub mod notifier;

pub use attachments::{store_attachments, AttachmentStore, AttachmentUpload, InMemoryStore, StoredBlob};
pub use directory::{ApplicationContext, ApplicationDirectory, SqliteDirectory, StaticDirectory};
pub use dispatch::DispatchResult;
pub use messaging::{MailService, MessageView, ReadStatus, SendMessage};
pub use notifier::{FailingNotifier, Notification, Notifier, RecordingNotifier};
