//! Configuration management for Apply Mail
//!
//! Configuration is loaded from `APPLY_MAIL_*` environment variables with
//! sensible defaults; a limit of 0 means unlimited.

use std::env;

use crate::threads::GroupingKey;

/// Default attachment ceiling: 10 MB, matching the upload limit enforced by
/// the surrounding platform before core validation proceeds.
pub const DEFAULT_MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

/// Subjects beyond this many characters are truncated on append.
pub const MAX_SUBJECT_CHARS: usize = 200;

/// Main configuration struct for Apply Mail
#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,

    // Message size limits (bytes). 0 = unlimited.
    pub max_message_body_bytes: usize,
    pub max_attachment_bytes: usize,
    pub max_total_message_bytes: usize,

    // Reply handling
    /// Characters kept when quoting a parent message.
    pub reply_excerpt_chars: usize,
    /// Bound on walking a reply chain before rejecting it as cyclic/degenerate.
    pub max_reply_depth: usize,

    // Threading
    pub default_grouping: GroupingKey,

    // Notifications
    pub dispatch_enabled: bool,

    // Logging
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_message_body_bytes: 0,
            max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
            max_total_message_bytes: 0,
            reply_excerpt_chars: 160,
            max_reply_depth: 64,
            default_grouping: GroupingKey::BySubject,
            dispatch_enabled: true,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_url: env_str("APPLY_MAIL_DATABASE_URL", &defaults.database_url),
            max_message_body_bytes: env_usize(
                "APPLY_MAIL_MAX_MESSAGE_BODY_BYTES",
                defaults.max_message_body_bytes,
            ),
            max_attachment_bytes: env_usize(
                "APPLY_MAIL_MAX_ATTACHMENT_BYTES",
                defaults.max_attachment_bytes,
            ),
            max_total_message_bytes: env_usize(
                "APPLY_MAIL_MAX_TOTAL_MESSAGE_BYTES",
                defaults.max_total_message_bytes,
            ),
            reply_excerpt_chars: env_usize(
                "APPLY_MAIL_REPLY_EXCERPT_CHARS",
                defaults.reply_excerpt_chars,
            ),
            max_reply_depth: env_usize("APPLY_MAIL_MAX_REPLY_DEPTH", defaults.max_reply_depth),
            default_grouping: env_grouping(
                "APPLY_MAIL_DEFAULT_GROUPING",
                defaults.default_grouping,
            ),
            dispatch_enabled: env_bool("APPLY_MAIL_DISPATCH_ENABLED", defaults.dispatch_enabled),
            log_level: env_str("APPLY_MAIL_LOG_LEVEL", &defaults.log_level),
        }
    }
}

fn env_value(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_str(key: &str, default: &str) -> String {
    env_value(key).unwrap_or_else(|| default.to_string())
}

fn parse_bool(value: &str, default: bool) -> bool {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" => true,
        "0" | "false" | "f" | "no" | "n" => false,
        _ => default,
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env_value(key).map_or(default, |v| parse_bool(&v, default))
}

fn env_usize(key: &str, default: usize) -> usize {
    env_value(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_grouping(key: &str, default: GroupingKey) -> GroupingKey {
    env_value(key).map_or(default, |v| match v.trim().to_lowercase().as_str() {
        "application" | "by_application" => GroupingKey::ByApplication,
        "subject" | "by_subject" => GroupingKey::BySubject,
        _ => default,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.max_attachment_bytes, 10 * 1024 * 1024);
        assert_eq!(config.reply_excerpt_chars, 160);
        assert_eq!(config.max_reply_depth, 64);
        assert_eq!(config.default_grouping, GroupingKey::BySubject);
        assert!(config.dispatch_enabled);
        assert_eq!(config.max_message_body_bytes, 0); // unlimited
    }

    #[test]
    fn parse_bool_accepts_common_forms() {
        for v in ["1", "true", "T", "yes", "Y"] {
            assert!(parse_bool(v, false), "{v} should parse true");
        }
        for v in ["0", "false", "F", "no", "N"] {
            assert!(!parse_bool(v, true), "{v} should parse false");
        }
        assert!(parse_bool("maybe", true));
        assert!(!parse_bool("maybe", false));
    }

    #[test]
    fn from_env_without_overrides_matches_defaults() {
        // The test environment does not set APPLY_MAIL_* variables.
        let from_env = Config::from_env();
        let defaults = Config::default();
        assert_eq!(from_env.max_attachment_bytes, defaults.max_attachment_bytes);
        assert_eq!(from_env.default_grouping, defaults.default_grouping);
        assert_eq!(from_env.dispatch_enabled, defaults.dispatch_enabled);
    }
}
