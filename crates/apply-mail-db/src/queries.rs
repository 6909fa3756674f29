//! Repository queries over the message log.
//!
//! Append is the only multi-row write and runs in a single transaction:
//! the message and its attachments become visible together or not at all.
//! The in-place mutations (`is_read`, `email_sent`, `action_completed`) are
//! single-row COALESCE updates, idempotent by construction.

use std::collections::{HashMap, HashSet};

use sqlx::{QueryBuilder, Sqlite};

use apply_mail_core::{
    next_created_micros, now_micros, Attachment, MailError, MailResult, Message, SenderRole,
};

use crate::models::{
    ApplicationRow, AttachmentRow, MailboxEntry, MailboxFilter, MessageRow, NewMessage,
};
use crate::pool::DbPool;

fn map_db(e: sqlx::Error) -> MailError {
    MailError::Database(e.to_string())
}

// =============================================================================
// Applications
// =============================================================================

/// Create an application record (student context for mailbox joins).
pub async fn create_application(
    pool: &DbPool,
    student_id: &str,
    student_name: &str,
    student_email: &str,
    university: &str,
    program: &str,
) -> MailResult<ApplicationRow> {
    let created_at = now_micros();
    let result = sqlx::query(
        "INSERT INTO applications (student_id, student_name, student_email, university, program, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(student_id)
    .bind(student_name)
    .bind(student_email)
    .bind(university)
    .bind(program)
    .bind(created_at)
    .execute(pool)
    .await
    .map_err(map_db)?;

    get_application(pool, result.last_insert_rowid()).await
}

/// Get an application by id.
pub async fn get_application(pool: &DbPool, application_id: i64) -> MailResult<ApplicationRow> {
    sqlx::query_as::<_, ApplicationRow>("SELECT * FROM applications WHERE id = ?")
        .bind(application_id)
        .fetch_optional(pool)
        .await
        .map_err(map_db)?
        .ok_or(MailError::ApplicationNotFound(application_id))
}

// =============================================================================
// Append
// =============================================================================

/// Append a message (and its attachments) to an application's log.
///
/// Validates field-level invariants before writing: non-empty body, an
/// existing application, and a parent reference that resolves to the same
/// application through a bounded, acyclic reply chain. `created_at` comes
/// from the strictly increasing creation clock, so commit order and
/// timestamp order agree.
pub async fn append_message(
    pool: &DbPool,
    new: NewMessage,
    max_reply_depth: usize,
) -> MailResult<Message> {
    if new.body.trim().is_empty() {
        return Err(MailError::EmptyBody);
    }

    get_application(pool, new.application_id).await?;

    if let Some(parent_id) = new.parent_message_id {
        validate_parent_chain(pool, parent_id, new.application_id, max_reply_depth).await?;
    }

    let created_at = next_created_micros();
    let (action_type, action_deadline) = match new.action {
        Some((ty, deadline)) => (Some(ty.as_str()), deadline),
        None => (None, None),
    };

    let mut tx = pool.begin().await.map_err(map_db)?;

    let result = sqlx::query(
        "INSERT INTO messages \
           (application_id, sender_type, sender_id, message_type, subject, body, created_at, \
            is_read, read_at, requires_action, action_type, action_deadline, action_completed, \
            parent_message_id, email_sent, email_sent_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, 0, NULL, ?, ?, ?, 0, ?, 0, NULL)",
    )
    .bind(new.application_id)
    .bind(new.sender_role.as_str())
    .bind(&new.sender_id)
    .bind(new.message_type.as_str())
    .bind(&new.subject)
    .bind(&new.body)
    .bind(created_at)
    .bind(i64::from(new.action.is_some()))
    .bind(action_type)
    .bind(action_deadline)
    .bind(new.parent_message_id)
    .execute(&mut *tx)
    .await
    .map_err(map_db)?;

    let message_id = result.last_insert_rowid();

    for attachment in &new.attachments {
        sqlx::query(
            "INSERT INTO attachments (message_id, file_name, file_url, file_size, file_type, mime_type) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(message_id)
        .bind(&attachment.file_name)
        .bind(&attachment.file_url)
        .bind(attachment.file_size)
        .bind(&attachment.file_type)
        .bind(&attachment.mime_type)
        .execute(&mut *tx)
        .await
        .map_err(map_db)?;
    }

    tx.commit().await.map_err(map_db)?;

    tracing::debug!(message_id, application_id = new.application_id, "message appended");
    get_message(pool, message_id).await
}

/// Walk the reply chain from `parent_id` to its root.
///
/// Rejects a parent that does not exist, that belongs to another
/// application, or whose chain revisits an id / exceeds `max_reply_depth`.
async fn validate_parent_chain(
    pool: &DbPool,
    parent_id: i64,
    application_id: i64,
    max_reply_depth: usize,
) -> MailResult<()> {
    let mut seen: HashSet<i64> = HashSet::new();
    let mut current = Some(parent_id);
    let mut depth = 0usize;

    while let Some(id) = current {
        if !seen.insert(id) {
            return Err(MailError::ReplyCycle { message_id: id });
        }
        depth += 1;
        if depth > max_reply_depth {
            return Err(MailError::ReplyChainTooDeep {
                max_depth: max_reply_depth,
            });
        }

        let row: Option<(Option<i64>, i64)> =
            sqlx::query_as("SELECT parent_message_id, application_id FROM messages WHERE id = ?")
                .bind(id)
                .fetch_optional(pool)
                .await
                .map_err(map_db)?;

        match row {
            None if id == parent_id => {
                return Err(MailError::ParentNotFound {
                    parent_id,
                    application_id,
                });
            }
            // A missing mid-chain ancestor ends the walk; the direct parent
            // has already been verified at this point.
            None => break,
            Some((next_parent, parent_application_id)) => {
                if id == parent_id && parent_application_id != application_id {
                    return Err(MailError::CrossApplicationParent {
                        parent_id,
                        parent_application_id,
                        application_id,
                    });
                }
                current = next_parent;
            }
        }
    }

    Ok(())
}

// =============================================================================
// Reads
// =============================================================================

/// Get a message by id, attachments included.
pub async fn get_message(pool: &DbPool, message_id: i64) -> MailResult<Message> {
    let row = fetch_message_row(pool, message_id)
        .await?
        .ok_or(MailError::MessageNotFound(message_id))?;
    let mut attachments = attachments_for_messages(pool, &[message_id]).await?;
    row.into_message(attachments.remove(&message_id).unwrap_or_default())
}

async fn fetch_message_row(pool: &DbPool, message_id: i64) -> MailResult<Option<MessageRow>> {
    sqlx::query_as::<_, MessageRow>("SELECT * FROM messages WHERE id = ?")
        .bind(message_id)
        .fetch_optional(pool)
        .await
        .map_err(map_db)
}

/// List an application's messages in chronological order.
pub async fn list_by_application(pool: &DbPool, application_id: i64) -> MailResult<Vec<Message>> {
    let rows = sqlx::query_as::<_, MessageRow>(
        "SELECT * FROM messages WHERE application_id = ? ORDER BY created_at ASC, id ASC",
    )
    .bind(application_id)
    .fetch_all(pool)
    .await
    .map_err(map_db)?;

    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut attachments = attachments_for_messages(pool, &ids).await?;

    rows.into_iter()
        .map(|row| {
            let atts = attachments.remove(&row.id).unwrap_or_default();
            row.into_message(atts)
        })
        .collect()
}

/// Count an application's messages (test and audit support).
pub async fn count_by_application(pool: &DbPool, application_id: i64) -> MailResult<i64> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM messages WHERE application_id = ?")
            .bind(application_id)
            .fetch_one(pool)
            .await
            .map_err(map_db)?;
    Ok(count)
}

#[derive(sqlx::FromRow)]
struct MailboxFlatRow {
    #[sqlx(flatten)]
    message: MessageRow,
    student_id: String,
    student_name: String,
    student_email: String,
    university: String,
}

/// List messages across applications, joined with student context, newest
/// first. For the admin-wide mailbox view.
pub async fn list_mailbox(pool: &DbPool, filter: &MailboxFilter) -> MailResult<Vec<MailboxEntry>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT m.id, m.application_id, m.sender_type, m.sender_id, m.message_type, m.subject, \
                m.body, m.created_at, m.is_read, m.read_at, m.requires_action, m.action_type, \
                m.action_deadline, m.action_completed, m.parent_message_id, m.email_sent, \
                m.email_sent_at, \
                a.student_id, a.student_name, a.student_email, a.university \
         FROM messages m \
         JOIN applications a ON a.id = m.application_id \
         WHERE 1 = 1",
    );

    if let Some(application_id) = filter.application_id {
        qb.push(" AND m.application_id = ").push_bind(application_id);
    }
    if filter.unread_only {
        qb.push(" AND m.is_read = 0");
    }
    if filter.requires_action_only {
        qb.push(" AND m.requires_action = 1 AND m.action_completed = 0");
    }
    if let Some(since_ts) = filter.since_ts {
        qb.push(" AND m.created_at > ").push_bind(since_ts);
    }
    qb.push(" ORDER BY m.created_at DESC, m.id DESC");
    if let Some(limit) = filter.limit {
        let limit = i64::try_from(limit)
            .map_err(|_| MailError::InvalidArgument("limit exceeds i64::MAX".into()))?;
        qb.push(" LIMIT ").push_bind(limit);
    }

    let rows: Vec<MailboxFlatRow> = qb
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(map_db)?;

    let ids: Vec<i64> = rows.iter().map(|r| r.message.id).collect();
    let mut attachments = attachments_for_messages(pool, &ids).await?;

    rows.into_iter()
        .map(|row| {
            let atts = attachments.remove(&row.message.id).unwrap_or_default();
            Ok(MailboxEntry {
                message: row.message.into_message(atts)?,
                student_id: row.student_id,
                student_name: row.student_name,
                student_email: row.student_email,
                university: row.university,
            })
        })
        .collect()
}

async fn attachments_for_messages(
    pool: &DbPool,
    message_ids: &[i64],
) -> MailResult<HashMap<i64, Vec<Attachment>>> {
    if message_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT * FROM attachments WHERE message_id IN (");
    let mut separated = qb.separated(", ");
    for id in message_ids {
        separated.push_bind(*id);
    }
    qb.push(") ORDER BY message_id ASC, id ASC");

    let rows: Vec<AttachmentRow> = qb
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(map_db)?;

    let mut grouped: HashMap<i64, Vec<Attachment>> = HashMap::new();
    for row in rows {
        grouped.entry(row.message_id).or_default().push(row.into());
    }
    Ok(grouped)
}

// =============================================================================
// In-place mutations (idempotent, single logical owner each)
// =============================================================================

/// Mark a message read from `reader_role`'s perspective.
///
/// Idempotent: already-read messages and the reader's own sends are returned
/// unchanged. `read_at` is preserved by COALESCE on repeat calls.
pub async fn mark_read(
    pool: &DbPool,
    message_id: i64,
    reader_role: SenderRole,
) -> MailResult<Message> {
    let row = fetch_message_row(pool, message_id)
        .await?
        .ok_or(MailError::MessageNotFound(message_id))?;

    // Only the recipient flips the flag; a sender viewing their own message
    // is a no-op.
    if row.sender_type == reader_role.as_str() || row.is_read_bool() {
        let mut attachments = attachments_for_messages(pool, &[message_id]).await?;
        return row.into_message(attachments.remove(&message_id).unwrap_or_default());
    }

    sqlx::query("UPDATE messages SET is_read = 1, read_at = COALESCE(read_at, ?) WHERE id = ?")
        .bind(now_micros())
        .bind(message_id)
        .execute(pool)
        .await
        .map_err(map_db)?;

    get_message(pool, message_id).await
}

/// Record a successful notification dispatch.
///
/// Sets `email_sent` once; `email_sent_at` is preserved on repeat calls.
pub async fn mark_email_sent(pool: &DbPool, message_id: i64) -> MailResult<()> {
    let result = sqlx::query(
        "UPDATE messages SET email_sent = 1, email_sent_at = COALESCE(email_sent_at, ?) \
         WHERE id = ?",
    )
    .bind(now_micros())
    .bind(message_id)
    .execute(pool)
    .await
    .map_err(map_db)?;

    if result.rows_affected() == 0 {
        return Err(MailError::MessageNotFound(message_id));
    }
    Ok(())
}

/// Mark a requested action as fulfilled (called by the external action
/// workflow). Idempotent.
pub async fn mark_action_completed(pool: &DbPool, message_id: i64) -> MailResult<Message> {
    let row = fetch_message_row(pool, message_id)
        .await?
        .ok_or(MailError::MessageNotFound(message_id))?;

    if row.requires_action == 0 {
        return Err(MailError::InvalidArgument(format!(
            "message {message_id} does not require action"
        )));
    }

    sqlx::query("UPDATE messages SET action_completed = 1 WHERE id = ?")
        .bind(message_id)
        .execute(pool)
        .await
        .map_err(map_db)?;

    get_message(pool, message_id).await
}
