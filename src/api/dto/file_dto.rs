//! File DTOs for list, get, upload, update and download operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::common_dto::PaginationMeta;
use crate::domain::{FileId, FolderId, StoredFile};

/// Query for `GET /files`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FileListQuery {
    /// Virtual path of the folder to list.
    pub folder_path: String,
}

/// Query for the path-addressed file endpoints.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FilePathQuery {
    /// Virtual file path, e.g. `/docs/<id>.pdf`.
    pub file_path: String,
}

/// Multipart form accepted by `POST /files/upload`. Documentation only;
/// the handler reads the fields as a stream.
#[derive(Debug, ToSchema)]
pub struct UploadForm {
    /// File content. The part's file name becomes the display name.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Uploading user.
    pub uploader_user_id: Uuid,
    /// Virtual path of the target folder.
    pub folder_path: String,
}

/// Request body for `PATCH /files/{id}`. Omitted fields are unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateFileRequest {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Folder to move the file into.
    #[serde(default)]
    #[schema(value_type = Option<Uuid>)]
    pub folder_id: Option<FolderId>,
}

/// File representation returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FileOut {
    /// File identifier.
    #[schema(value_type = Uuid)]
    pub id: FileId,
    /// Display name.
    pub name: String,
    /// Uploading user.
    pub uploader_user_id: Uuid,
    /// Containing folder.
    #[schema(value_type = Option<Uuid>)]
    pub folder_id: Option<FolderId>,
    /// Content length in bytes.
    pub size_bytes: i64,
    /// Detected MIME type.
    pub mime_type: String,
    /// Virtual path.
    pub virtual_path: String,
    /// Public URL, when assigned.
    pub access_url: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<StoredFile> for FileOut {
    fn from(file: StoredFile) -> Self {
        Self {
            id: file.id,
            name: file.name,
            uploader_user_id: file.uploader_user_id,
            folder_id: file.folder_id,
            size_bytes: file.size_bytes,
            mime_type: file.mime_type,
            virtual_path: file.virtual_path,
            access_url: file.access_url,
            created_at: file.created_at,
            updated_at: file.updated_at,
        }
    }
}

/// Paginated list response for `GET /files`.
#[derive(Debug, Serialize, ToSchema)]
pub struct FileListResponse {
    /// Files on this page.
    pub data: Vec<FileOut>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}
