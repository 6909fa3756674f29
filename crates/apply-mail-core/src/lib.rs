//! Core types, configuration, and algorithms for Apply Mail
//!
//! This crate provides:
//! - Configuration management (`Config`, environment parsing)
//! - Data models (`Message`, `Attachment`, `Thread`, role/type enums)
//! - Thread aggregation over flat message logs
//! - Reply resolution within a thread's message set
//! - Common error types

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod models;
pub mod reply;
pub mod threads;
pub mod timestamps;

// Re-export key types for convenience
pub use config::Config;
pub use error::{Error as MailError, Result as MailResult};
pub use models::{
    ActionRequest, ActionType, Attachment, Message, MessageId, MessageType, SenderRole,
};
pub use reply::{resolve_parent, ParentExcerpt};
pub use threads::{aggregate, GroupingKey, Thread};
pub use timestamps::{micros_to_naive, next_created_micros, now_micros};
