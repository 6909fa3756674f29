//! Database schema creation.
//!
//! Creates the applications, messages, and attachments tables plus their
//! indexes. Statements are idempotent (`IF NOT EXISTS`) so schema creation
//! can run on every startup.

use sqlx::SqlitePool;

use apply_mail_core::{MailError, MailResult};

/// SQL statements for creating the database schema
pub const CREATE_TABLES_SQL: &str = r"
-- Applications table: minimal student context for mailbox joins
CREATE TABLE IF NOT EXISTS applications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    student_id TEXT NOT NULL,
    student_name TEXT NOT NULL,
    student_email TEXT NOT NULL,
    university TEXT NOT NULL DEFAULT '',
    program TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_applications_student ON applications(student_id);

-- Messages table: the append-only log
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    application_id INTEGER NOT NULL REFERENCES applications(id),
    sender_type TEXT NOT NULL,
    sender_id TEXT NOT NULL,
    message_type TEXT NOT NULL DEFAULT 'general',
    subject TEXT NOT NULL,
    body TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    is_read INTEGER NOT NULL DEFAULT 0,
    read_at INTEGER,
    requires_action INTEGER NOT NULL DEFAULT 0,
    action_type TEXT,
    action_deadline INTEGER,
    action_completed INTEGER NOT NULL DEFAULT 0,
    parent_message_id INTEGER REFERENCES messages(id),
    email_sent INTEGER NOT NULL DEFAULT 0,
    email_sent_at INTEGER
);
CREATE INDEX IF NOT EXISTS idx_messages_application_created ON messages(application_id, created_at);
CREATE INDEX IF NOT EXISTS idx_messages_application_subject ON messages(application_id, subject);
CREATE INDEX IF NOT EXISTS idx_messages_parent ON messages(parent_message_id);
CREATE INDEX IF NOT EXISTS idx_messages_created_at ON messages(created_at);

-- Attachments table: immutable, owned by exactly one message
CREATE TABLE IF NOT EXISTS attachments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    message_id INTEGER NOT NULL REFERENCES messages(id),
    file_name TEXT NOT NULL,
    file_url TEXT NOT NULL,
    file_size INTEGER NOT NULL,
    file_type TEXT NOT NULL DEFAULT '',
    mime_type TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_attachments_message ON attachments(message_id);
";

/// Create all tables and indexes if they do not exist.
pub async fn create_schema(pool: &SqlitePool) -> MailResult<()> {
    sqlx::raw_sql(CREATE_TABLES_SQL)
        .execute(pool)
        .await
        .map_err(|e| MailError::Database(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::connect_memory;

    #[tokio::test]
    async fn schema_creates_expected_tables() {
        let pool = connect_memory().await.expect("memory pool");
        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .expect("query sqlite_master");

        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert!(names.contains(&"applications"));
        assert!(names.contains(&"messages"));
        assert!(names.contains(&"attachments"));
    }

    #[tokio::test]
    async fn schema_creation_is_idempotent() {
        let pool = connect_memory().await.expect("memory pool");
        create_schema(&pool).await.expect("second run");
        create_schema(&pool).await.expect("third run");
    }
}
