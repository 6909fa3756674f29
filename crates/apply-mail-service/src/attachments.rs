//! Attachment blob storage seam.
//!
//! Blobs are stored before the message append; only the resulting URL plus
//! metadata travel into the repository as a [`NewAttachment`]. Size ceilings
//! are enforced here, before any bytes reach the store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use apply_mail_core::{MailError, MailResult};
use apply_mail_db::NewAttachment;

/// One file handed in alongside a message send.
#[derive(Debug, Clone)]
pub struct AttachmentUpload {
    pub file_name: String,
    pub file_type: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Where a stored blob ended up.
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub url: String,
    pub size: i64,
}

/// Blob storage backend (object store, local disk, in-memory for tests).
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn store(&self, file_name: &str, mime_type: &str, bytes: &[u8]) -> MailResult<StoredBlob>;
}

/// Store `uploads` and return the metadata rows to persist with the message.
///
/// Rejects any upload over `max_attachment_bytes` (0 = unlimited) before
/// touching the store, so a failed batch leaves nothing behind mid-way
/// through validation.
pub async fn store_attachments(
    store: &dyn AttachmentStore,
    uploads: Vec<AttachmentUpload>,
    max_attachment_bytes: usize,
) -> MailResult<Vec<NewAttachment>> {
    for upload in &uploads {
        if max_attachment_bytes > 0 && upload.bytes.len() > max_attachment_bytes {
            return Err(MailError::SizeLimitExceeded {
                field: "attachment",
                size_bytes: upload.bytes.len(),
                limit_bytes: max_attachment_bytes,
            });
        }
    }

    let mut stored = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let blob = store
            .store(&upload.file_name, &upload.mime_type, &upload.bytes)
            .await?;
        stored.push(NewAttachment {
            file_name: upload.file_name,
            file_url: blob.url,
            file_size: blob.size,
            file_type: upload.file_type,
            mime_type: upload.mime_type,
        });
    }
    Ok(stored)
}

/// In-memory store for tests and demos.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs held.
    pub fn len(&self) -> usize {
        self.blobs.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AttachmentStore for InMemoryStore {
    async fn store(&self, file_name: &str, _mime_type: &str, bytes: &[u8]) -> MailResult<StoredBlob> {
        let url = format!("mem://{file_name}");
        let size = i64::try_from(bytes.len())
            .map_err(|_| MailError::InvalidArgument("attachment too large for i64".into()))?;
        self.blobs
            .lock()
            .map_err(|_| MailError::InvalidArgument("attachment store poisoned".into()))?
            .insert(url.clone(), bytes.to_vec());
        Ok(StoredBlob { url, size })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, len: usize) -> AttachmentUpload {
        AttachmentUpload {
            file_name: name.to_string(),
            file_type: "pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            bytes: vec![0u8; len],
        }
    }

    #[tokio::test]
    async fn stores_within_limit() {
        let store = InMemoryStore::new();
        let rows = store_attachments(&store, vec![upload("a.pdf", 10), upload("b.pdf", 20)], 100)
            .await
            .expect("within limit");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].file_url, "mem://a.pdf");
        assert_eq!(rows[1].file_size, 20);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn oversize_upload_stores_nothing() {
        let store = InMemoryStore::new();
        let err = store_attachments(&store, vec![upload("a.pdf", 10), upload("big.pdf", 200)], 100)
            .await
            .expect_err("over limit");
        assert!(matches!(err, MailError::SizeLimitExceeded { field: "attachment", .. }));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn zero_limit_means_unlimited() {
        let store = InMemoryStore::new();
        let rows = store_attachments(&store, vec![upload("big.pdf", 10_000)], 0)
            .await
            .expect("unlimited");
        assert_eq!(rows.len(), 1);
    }
}
