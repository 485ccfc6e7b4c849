//! Folder DTOs for list, get, create and update operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::common_dto::{PaginationMeta, double_option};
use crate::domain::{Folder, FolderId};

/// Filter for `GET /folders`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FolderListQuery {
    /// List children of this folder; top-level folders when omitted.
    #[param(value_type = Option<Uuid>)]
    pub parent_id: Option<FolderId>,
}

/// Query for `GET /folders/by-path`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FolderPathQuery {
    /// Virtual folder path, e.g. `/docs/reports/`.
    pub path: String,
}

/// Request body for `POST /folders`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateFolderRequest {
    /// Folder name (1-100 chars, no `/` or `\`).
    pub name: String,
    /// Parent folder; top level when omitted.
    #[serde(default)]
    #[schema(value_type = Option<Uuid>)]
    pub parent_id: Option<FolderId>,
    /// Creating user.
    pub creator_user_id: Uuid,
    /// Visible to anonymous users. Defaults to `true`.
    #[serde(default = "default_published")]
    pub is_published: bool,
}

/// Request body for `PATCH /folders/{id}`. Omitted fields are unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateFolderRequest {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New parent. `null` moves the folder to the top level.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub parent_id: Option<Option<FolderId>>,
    /// New creator.
    #[serde(default)]
    pub creator_user_id: Option<Uuid>,
    /// New visibility.
    #[serde(default)]
    pub is_published: Option<bool>,
}

/// Folder representation returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FolderOut {
    /// Folder identifier.
    #[schema(value_type = Uuid)]
    pub id: FolderId,
    /// Folder name.
    pub name: String,
    /// Parent folder, `null` at the top level.
    #[schema(value_type = Option<Uuid>)]
    pub parent_id: Option<FolderId>,
    /// Creating user.
    pub creator_user_id: Uuid,
    /// Visible to anonymous users.
    pub is_published: bool,
    /// Canonical virtual path.
    pub virtual_path: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<Folder> for FolderOut {
    fn from(folder: Folder) -> Self {
        Self {
            id: folder.id,
            name: folder.name,
            parent_id: folder.parent_id,
            creator_user_id: folder.creator_user_id,
            is_published: folder.is_published,
            virtual_path: folder.virtual_path,
            created_at: folder.created_at,
            updated_at: folder.updated_at,
        }
    }
}

/// Paginated list response for `GET /folders`.
#[derive(Debug, Serialize, ToSchema)]
pub struct FolderListResponse {
    /// Folders on this page.
    pub data: Vec<FolderOut>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

const fn default_published() -> bool {
    true
}
