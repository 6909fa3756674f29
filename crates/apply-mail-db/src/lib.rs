//! SQLite persistence layer for Apply Mail
//!
//! Owns the append-only message log. Field-level invariants are enforced on
//! write; reads are filtered and ordered but never mutate. All timestamps
//! are stored as `i64` microseconds since the Unix epoch.

#![forbid(unsafe_code)]

pub mod models;
pub mod pool;
pub mod queries;
pub mod schema;

pub use models::{
    ApplicationRow, AttachmentRow, MailboxEntry, MailboxFilter, MessageRow, NewAttachment,
    NewMessage,
};
pub use pool::{connect, connect_memory, DbPool};
pub use schema::create_schema;
