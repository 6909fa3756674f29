//! Error types for Apply Mail
//!
//! The taxonomy follows the subsystem contract: validation and not-found
//! errors are caller-visible synchronous failures; dispatch errors are
//! recovered internally and only observable through the `email_sent` flag.

use thiserror::Error;

/// Result type alias for Apply Mail operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Apply Mail
#[derive(Debug, Error)]
pub enum Error {
    // ==========================================================================
    // Resource Not Found Errors
    // ==========================================================================
    #[error("Application not found: {0}")]
    ApplicationNotFound(i64),

    #[error("Message not found: {0}")]
    MessageNotFound(i64),

    // ==========================================================================
    // Validation Errors
    // ==========================================================================
    #[error("Message body must not be empty")]
    EmptyBody,

    #[error("Parent message not found: {parent_id} (application {application_id})")]
    ParentNotFound { parent_id: i64, application_id: i64 },

    #[error(
        "Parent message {parent_id} belongs to application {parent_application_id}, \
         not {application_id}"
    )]
    CrossApplicationParent {
        parent_id: i64,
        parent_application_id: i64,
        application_id: i64,
    },

    #[error("Reply chain exceeds maximum depth of {max_depth}")]
    ReplyChainTooDeep { max_depth: usize },

    #[error("Reply chain revisits message {message_id}")]
    ReplyCycle { message_id: i64 },

    #[error("{field} exceeds size limit: {size_bytes} bytes > {limit_bytes} byte limit")]
    SizeLimitExceeded {
        field: &'static str,
        size_bytes: usize,
        limit_bytes: usize,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ==========================================================================
    // Dispatch Errors (recovered internally, never surfaced to append callers)
    // ==========================================================================
    #[error("Notification dispatch failed for message {message_id}: {reason}")]
    Dispatch { message_id: i64, reason: String },

    // ==========================================================================
    // Infrastructure Errors
    // ==========================================================================
    #[error("Database error: {0}")]
    Database(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error type string (for API responses and logs)
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::ApplicationNotFound(_) | Self::MessageNotFound(_) => "NOT_FOUND",
            Self::EmptyBody
            | Self::ParentNotFound { .. }
            | Self::CrossApplicationParent { .. }
            | Self::ReplyChainTooDeep { .. }
            | Self::ReplyCycle { .. }
            | Self::SizeLimitExceeded { .. }
            | Self::InvalidArgument(_) => "VALIDATION_ERROR",
            Self::Dispatch { .. } => "DISPATCH_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Io(_) => "OS_ERROR",
            Self::Serialization(_) => "TYPE_ERROR",
        }
    }

    /// Returns whether the error is recoverable by the caller (retry with
    /// corrected input, or retry after a transient infrastructure failure).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Io(_) | Self::Serialization(_))
    }

    /// True for the validation family of errors.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyBody
                | Self::ParentNotFound { .. }
                | Self::CrossApplicationParent { .. }
                | Self::ReplyChainTooDeep { .. }
                | Self::ReplyCycle { .. }
                | Self::SizeLimitExceeded { .. }
                | Self::InvalidArgument(_)
        )
    }

    /// True for the not-found family of errors.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::ApplicationNotFound(_) | Self::MessageNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Exhaustive test: every Error variant maps to the correct `error_type` string.
    #[test]
    fn error_type_mapping_exhaustive() {
        let cases: Vec<(Error, &str)> = vec![
            (Error::ApplicationNotFound(1), "NOT_FOUND"),
            (Error::MessageNotFound(1), "NOT_FOUND"),
            (Error::EmptyBody, "VALIDATION_ERROR"),
            (
                Error::ParentNotFound {
                    parent_id: 1,
                    application_id: 2,
                },
                "VALIDATION_ERROR",
            ),
            (
                Error::CrossApplicationParent {
                    parent_id: 1,
                    parent_application_id: 2,
                    application_id: 3,
                },
                "VALIDATION_ERROR",
            ),
            (Error::ReplyChainTooDeep { max_depth: 64 }, "VALIDATION_ERROR"),
            (Error::ReplyCycle { message_id: 1 }, "VALIDATION_ERROR"),
            (
                Error::SizeLimitExceeded {
                    field: "body",
                    size_bytes: 11,
                    limit_bytes: 10,
                },
                "VALIDATION_ERROR",
            ),
            (Error::InvalidArgument("x".into()), "VALIDATION_ERROR"),
            (
                Error::Dispatch {
                    message_id: 1,
                    reason: "x".into(),
                },
                "DISPATCH_ERROR",
            ),
            (Error::Database("x".into()), "DATABASE_ERROR"),
            (Error::Io(std::io::Error::other("x")), "OS_ERROR"),
        ];

        for (err, expected_type) in &cases {
            assert_eq!(
                err.error_type(),
                *expected_type,
                "Error {err:?} should map to {expected_type}"
            );
        }
    }

    #[test]
    fn validation_family_classification() {
        assert!(Error::EmptyBody.is_validation());
        assert!(Error::ReplyCycle { message_id: 3 }.is_validation());
        assert!(!Error::MessageNotFound(1).is_validation());
        assert!(!Error::Database("x".into()).is_validation());
    }

    #[test]
    fn not_found_family_classification() {
        assert!(Error::ApplicationNotFound(9).is_not_found());
        assert!(Error::MessageNotFound(9).is_not_found());
        assert!(!Error::EmptyBody.is_not_found());
    }

    #[test]
    fn recoverable_classification() {
        assert!(Error::EmptyBody.is_recoverable());
        assert!(Error::Database("lock".into()).is_recoverable());
        assert!(!Error::Io(std::io::Error::other("disk")).is_recoverable());
    }

    #[test]
    fn display_includes_context() {
        let err = Error::SizeLimitExceeded {
            field: "attachment",
            size_bytes: 11_000_000,
            limit_bytes: 10_485_760,
        };
        let msg = err.to_string();
        assert!(msg.contains("attachment"));
        assert!(msg.contains("11000000"));
    }
}
