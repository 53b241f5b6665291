use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::leave::error::LeaveError;

/// Opaque-key file store behind the attachment boundary. The lifecycle only
/// ever sees the returned key; file contents are never interpreted.
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StoredAttachment {
    /// Opaque store key to embed in the request's attachment list
    pub key: String,
    pub filename: String,
    pub size: u64,
    pub mime_type: String,
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn store(
        &self,
        bytes: &[u8],
        owner_id: u64,
        category: &str,
        mime_type: &str,
        original_filename: &str,
    ) -> Result<StoredAttachment, LeaveError> {
        let safe_name: String = original_filename
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        let key = format!("{}/{}/{}_{}", owner_id, category, Uuid::new_v4(), safe_name);

        let path = self.root.join(&key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| LeaveError::Dependency {
                detail: format!("attachment dir create failed: {e}"),
            })?;
        }
        fs::write(&path, bytes).map_err(|e| LeaveError::Dependency {
            detail: format!("attachment write failed: {e}"),
        })?;

        Ok(StoredAttachment {
            key,
            filename: safe_name,
            size: bytes.len() as u64,
            mime_type: mime_type.to_string(),
        })
    }

    /// Temporary download URL for a previously stored key.
    pub fn download_url(&self, key: &str, ttl_seconds: u64) -> String {
        let expires = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
            + ttl_seconds;
        format!("/files/{key}?expires={expires}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_url_carries_key_and_expiry() {
        let store = AttachmentStore::new("/tmp/leavehub-test");
        let url = store.download_url("1000/leave/abc_doc.pdf", 600);
        assert!(url.starts_with("/files/1000/leave/abc_doc.pdf?expires="));
    }

    #[test]
    fn filenames_are_sanitized() {
        let store = AttachmentStore::new(std::env::temp_dir().join("leavehub-store-test"));
        let stored = store
            .store(b"data", 1, "leave", "text/plain", "my report (final).txt")
            .unwrap();
        assert!(stored.filename.ends_with(".txt"));
        assert!(!stored.filename.contains(' '));
        assert_eq!(stored.size, 4);
    }
}
