//! Application directory seam.
//!
//! Read-only lookup of the student context behind an application, consumed
//! when composing notifications. Production backs it with the applications
//! table; tests can substitute a static map.

use std::collections::HashMap;

use async_trait::async_trait;

use apply_mail_core::{MailError, MailResult};
use apply_mail_db::{queries, DbPool};

/// Who to notify about activity on an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationContext {
    pub student_id: String,
    pub student_name: String,
    pub student_email: String,
}

/// Read-only application/student lookup.
#[async_trait]
pub trait ApplicationDirectory: Send + Sync {
    async fn application_context(&self, application_id: i64) -> MailResult<ApplicationContext>;
}

/// Directory backed by the applications table.
#[derive(Debug, Clone)]
pub struct SqliteDirectory {
    pool: DbPool,
}

impl SqliteDirectory {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApplicationDirectory for SqliteDirectory {
    async fn application_context(&self, application_id: i64) -> MailResult<ApplicationContext> {
        let row = queries::get_application(&self.pool, application_id).await?;
        Ok(ApplicationContext {
            student_id: row.student_id,
            student_name: row.student_name,
            student_email: row.student_email,
        })
    }
}

/// Fixed in-memory directory, for tests.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    entries: HashMap<i64, ApplicationContext>,
}

impl StaticDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, application_id: i64, context: ApplicationContext) -> Self {
        self.entries.insert(application_id, context);
        self
    }
}

#[async_trait]
impl ApplicationDirectory for StaticDirectory {
    async fn application_context(&self, application_id: i64) -> MailResult<ApplicationContext> {
        self.entries
            .get(&application_id)
            .cloned()
            .ok_or(MailError::ApplicationNotFound(application_id))
    }
}
