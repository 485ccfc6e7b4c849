//! Folder handlers: list, lookup, create, update, delete.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{
    CreateFolderRequest, FolderListQuery, FolderListResponse, FolderOut, FolderPathQuery,
    PaginationMeta, PaginationParams, UpdateFolderRequest,
};
use crate::app_state::AppState;
use crate::domain::{EntryName, FolderId};
use crate::error::{ErrorResponse, StorageError};
use crate::service::{CreateFolder, UpdateFolder};

/// `GET /folders`: List the children of a folder.
///
/// # Errors
///
/// Returns [`StorageError::FolderNotFound`] if `parent_id` is unknown.
#[utoipa::path(
    get,
    path = "/folders",
    tag = "Folders",
    summary = "List folders",
    description = "Returns a page of the direct children of `parent_id`, or of the top-level folders when it is omitted. Ordered by name.",
    params(FolderListQuery, PaginationParams),
    responses(
        (status = 200, description = "Paginated folder list", body = FolderListResponse),
        (status = 404, description = "Parent folder not found", body = ErrorResponse),
    )
)]
pub async fn list_folders(
    State(state): State<AppState>,
    Query(filter): Query<FolderListQuery>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, StorageError> {
    let page = state
        .folder_service
        .list(filter.parent_id, params.page_request())
        .await?;
    let pagination = PaginationMeta::from(&page);
    Ok(Json(FolderListResponse {
        data: page.items.into_iter().map(FolderOut::from).collect(),
        pagination,
    }))
}

/// `GET /folders/by-path`: Get a folder by virtual path.
///
/// # Errors
///
/// Returns [`StorageError::FolderNotFound`] if no folder has that path.
#[utoipa::path(
    get,
    path = "/folders/by-path",
    tag = "Folders",
    summary = "Get folder by path",
    description = "Looks up a folder by virtual path. `docs`, `/docs` and `/docs/` are equivalent.",
    params(FolderPathQuery),
    responses(
        (status = 200, description = "Folder", body = FolderOut),
        (status = 404, description = "Folder not found", body = ErrorResponse),
    )
)]
pub async fn get_folder_by_path(
    State(state): State<AppState>,
    Query(query): Query<FolderPathQuery>,
) -> Result<impl IntoResponse, StorageError> {
    let folder = state.folder_service.get_by_virtual_path(&query.path).await?;
    Ok(Json(FolderOut::from(folder)))
}

/// `GET /folders/{id}`: Get a folder.
///
/// # Errors
///
/// Returns [`StorageError::FolderNotFound`] if the folder does not exist.
#[utoipa::path(
    get,
    path = "/folders/{id}",
    tag = "Folders",
    summary = "Get folder",
    params(
        ("id" = uuid::Uuid, Path, description = "Folder UUID"),
    ),
    responses(
        (status = 200, description = "Folder", body = FolderOut),
        (status = 404, description = "Folder not found", body = ErrorResponse),
    )
)]
pub async fn get_folder(
    State(state): State<AppState>,
    Path(id): Path<FolderId>,
) -> Result<impl IntoResponse, StorageError> {
    let folder = state.folder_service.get(id).await?;
    Ok(Json(FolderOut::from(folder)))
}

/// `POST /folders`: Create a folder.
///
/// # Errors
///
/// Returns [`StorageError`] on an invalid name, unknown parent or taken
/// path.
#[utoipa::path(
    post,
    path = "/folders",
    tag = "Folders",
    summary = "Create folder",
    description = "Creates the folder directory on disk and its metadata row. The virtual path is derived from the parent's path and the name.",
    request_body = CreateFolderRequest,
    responses(
        (status = 201, description = "Folder created", body = FolderOut),
        (status = 400, description = "Invalid name", body = ErrorResponse),
        (status = 404, description = "Parent folder not found", body = ErrorResponse),
        (status = 409, description = "Folder already exists", body = ErrorResponse),
    )
)]
pub async fn create_folder(
    State(state): State<AppState>,
    Json(req): Json<CreateFolderRequest>,
) -> Result<impl IntoResponse, StorageError> {
    let request = CreateFolder {
        name: EntryName::parse(req.name)?,
        parent_id: req.parent_id,
        creator_user_id: req.creator_user_id,
        is_published: req.is_published,
    };
    let folder = state.folder_service.create(request).await?;
    Ok((StatusCode::CREATED, Json(FolderOut::from(folder))))
}

/// `PATCH /folders/{id}`: Rename, move or edit a folder.
///
/// # Errors
///
/// Returns [`StorageError`] on an invalid name, a move into the folder's
/// own subtree, an unknown folder or a taken target path.
#[utoipa::path(
    patch,
    path = "/folders/{id}",
    tag = "Folders",
    summary = "Update folder",
    description = "Omitted fields are unchanged. `parent_id: null` moves the folder to the top level. Renames and moves relocate the directory on disk and rewrite the paths of everything inside it.",
    params(
        ("id" = uuid::Uuid, Path, description = "Folder UUID"),
    ),
    request_body = UpdateFolderRequest,
    responses(
        (status = 200, description = "Folder updated", body = FolderOut),
        (status = 400, description = "Invalid name or move", body = ErrorResponse),
        (status = 404, description = "Folder or parent not found", body = ErrorResponse),
        (status = 409, description = "Target path taken", body = ErrorResponse),
    )
)]
pub async fn update_folder(
    State(state): State<AppState>,
    Path(id): Path<FolderId>,
    Json(req): Json<UpdateFolderRequest>,
) -> Result<impl IntoResponse, StorageError> {
    let request = UpdateFolder {
        name: req.name.map(EntryName::parse).transpose()?,
        parent_id: req.parent_id,
        creator_user_id: req.creator_user_id,
        is_published: req.is_published,
    };
    let folder = state.folder_service.update(id, request).await?;
    Ok(Json(FolderOut::from(folder)))
}

/// `DELETE /folders/{id}`: Delete a folder and everything in it.
///
/// # Errors
///
/// Returns [`StorageError::FolderNotFound`] if the folder does not exist.
#[utoipa::path(
    delete,
    path = "/folders/{id}",
    tag = "Folders",
    summary = "Delete folder",
    description = "Removes the directory tree from disk and deletes the folder with all descendant folders and files.",
    params(
        ("id" = uuid::Uuid, Path, description = "Folder UUID"),
    ),
    responses(
        (status = 204, description = "Folder deleted"),
        (status = 404, description = "Folder not found", body = ErrorResponse),
    )
)]
pub async fn delete_folder(
    State(state): State<AppState>,
    Path(id): Path<FolderId>,
) -> Result<impl IntoResponse, StorageError> {
    state.folder_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Folder routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/folders", get(list_folders).post(create_folder))
        .route("/folders/by-path", get(get_folder_by_path))
        .route(
            "/folders/{id}",
            get(get_folder).patch(update_folder).delete(delete_folder),
        )
}
