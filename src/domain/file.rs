//! Stored file entity.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{EntryName, FileId, FolderId};

/// A file row.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredFile {
    /// Primary key, also the on-disk file stem.
    pub id: FileId,
    /// Display name (the original upload name).
    pub name: String,
    /// Absolute file path on disk.
    pub storage_path: String,
    /// Virtual path (`/folder/<id><ext>`).
    pub virtual_path: String,
    /// User that uploaded the file.
    pub uploader_user_id: Uuid,
    /// Content length.
    pub size_bytes: i64,
    /// Detected MIME type.
    pub mime_type: String,
    /// Containing folder.
    pub folder_id: Option<FolderId>,
    /// Public URL, when one has been assigned.
    pub access_url: Option<String>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new file row.
#[derive(Debug, Clone)]
pub struct NewFile {
    /// Pre-generated id matching the on-disk name.
    pub id: FileId,
    /// Display name.
    pub name: EntryName,
    /// Uploading user.
    pub uploader_user_id: Uuid,
    /// Containing folder.
    pub folder_id: Option<FolderId>,
    /// Absolute file path on disk.
    pub storage_path: String,
    /// Virtual path.
    pub virtual_path: String,
    /// Content length.
    pub size_bytes: i64,
    /// Detected MIME type.
    pub mime_type: String,
}

/// Partial update of a file row. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct FileChanges {
    /// New display name.
    pub name: Option<EntryName>,
    /// New containing folder.
    pub folder_id: Option<FolderId>,
    /// New disk location.
    pub storage_path: Option<String>,
    /// New virtual path.
    pub virtual_path: Option<String>,
}

/// What a download needs to stream a file back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadInfo {
    /// Name offered to the client.
    pub name: String,
    /// Where the bytes live.
    pub storage_path: String,
    /// Content type header value.
    pub mime_type: String,
    /// Content length.
    pub size_bytes: i64,
}

impl From<StoredFile> for DownloadInfo {
    fn from(file: StoredFile) -> Self {
        Self {
            name: file.name,
            storage_path: file.storage_path,
            mime_type: file.mime_type,
            size_bytes: file.size_bytes,
        }
    }
}
