//! File handlers: list, get, upload, update, delete and download.

use std::fmt::Write as _;

use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use uuid::Uuid;

use crate::api::dto::{
    FileListQuery, FileListResponse, FileOut, FilePathQuery, PaginationMeta, PaginationParams,
    UpdateFileRequest, UploadForm,
};
use crate::app_state::AppState;
use crate::domain::{DownloadInfo, EntryName, FileId};
use crate::error::{ErrorResponse, StorageError};
use crate::service::{FileService, UpdateFile, UploadRequest};
use crate::storage::StagedUpload;

/// `GET /files`: List the files in a folder.
///
/// # Errors
///
/// Returns [`StorageError::FolderNotFound`] if the folder path is unknown.
#[utoipa::path(
    get,
    path = "/files",
    tag = "Files",
    summary = "List files",
    description = "Returns a page of the files directly inside the folder at `folder_path`, ordered by display name.",
    params(FileListQuery, PaginationParams),
    responses(
        (status = 200, description = "Paginated file list", body = FileListResponse),
        (status = 404, description = "Folder not found", body = ErrorResponse),
    )
)]
pub async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<FileListQuery>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, StorageError> {
    let page = state
        .file_service
        .list_by_folder_path(&query.folder_path, params.page_request())
        .await?;
    let pagination = PaginationMeta::from(&page);
    Ok(Json(FileListResponse {
        data: page.items.into_iter().map(FileOut::from).collect(),
        pagination,
    }))
}

/// `GET /files/{id}`: Get file metadata.
///
/// # Errors
///
/// Returns [`StorageError::FileNotFound`] if the file does not exist.
#[utoipa::path(
    get,
    path = "/files/{id}",
    tag = "Files",
    summary = "Get file",
    params(
        ("id" = uuid::Uuid, Path, description = "File UUID"),
    ),
    responses(
        (status = 200, description = "File metadata", body = FileOut),
        (status = 404, description = "File not found", body = ErrorResponse),
    )
)]
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<FileId>,
) -> Result<impl IntoResponse, StorageError> {
    let file = state.file_service.get(id).await?;
    Ok(Json(FileOut::from(file)))
}

/// `POST /files/upload`: Upload a file into a folder.
///
/// # Errors
///
/// Returns [`StorageError`] on a malformed form, an invalid name, a
/// disallowed extension or an unknown folder.
#[utoipa::path(
    post,
    path = "/files/upload",
    tag = "Files",
    summary = "Upload file",
    description = "Multipart upload. The content streams to disk as it arrives and is stored as `<id><ext>` inside the folder; the part's file name is kept as the display name.",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "File stored", body = FileOut),
        (status = 400, description = "Missing field, invalid name or extension not allowed", body = ErrorResponse),
        (status = 404, description = "Folder not found", body = ErrorResponse),
        (status = 413, description = "Upload exceeds MAX_UPLOAD_BYTES", body = ErrorResponse),
    )
)]
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, StorageError> {
    let service = &state.file_service;
    let mut fields = UploadFields::default();
    let read = read_upload_fields(service, &mut multipart, &mut fields).await;

    let UploadFields {
        file,
        uploader_user_id,
        folder_path,
    } = fields;
    let Some((staged, original_name)) = file else {
        read?;
        return Err(StorageError::InvalidRequest(
            "missing multipart field 'file'".into(),
        ));
    };
    let meta = read.and_then(|()| parse_upload_meta(uploader_user_id, folder_path));
    let (uploader_user_id, folder_path) = match meta {
        Ok(meta) => meta,
        Err(err) => {
            service.discard_upload(staged).await;
            return Err(err);
        }
    };

    let file = service
        .upload(UploadRequest {
            staged,
            original_name,
            uploader_user_id,
            folder_path,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(FileOut::from(file))))
}

/// `PATCH /files/{id}`: Rename or move a file.
///
/// # Errors
///
/// Returns [`StorageError`] on an invalid name, unknown file or folder, or
/// a taken target location.
#[utoipa::path(
    patch,
    path = "/files/{id}",
    tag = "Files",
    summary = "Update file",
    description = "`name` changes the display name only. `folder_id` moves the stored content into another folder and updates its paths.",
    params(
        ("id" = uuid::Uuid, Path, description = "File UUID"),
    ),
    request_body = UpdateFileRequest,
    responses(
        (status = 200, description = "File updated", body = FileOut),
        (status = 400, description = "Invalid name", body = ErrorResponse),
        (status = 404, description = "File or folder not found", body = ErrorResponse),
        (status = 409, description = "Target location taken", body = ErrorResponse),
    )
)]
pub async fn update_file(
    State(state): State<AppState>,
    Path(id): Path<FileId>,
    Json(req): Json<UpdateFileRequest>,
) -> Result<impl IntoResponse, StorageError> {
    let request = UpdateFile {
        name: req.name.map(EntryName::parse).transpose()?,
        folder_id: req.folder_id,
    };
    let file = state.file_service.update(id, request).await?;
    Ok(Json(FileOut::from(file)))
}

/// `DELETE /files/{id}`: Delete a file.
///
/// # Errors
///
/// Returns [`StorageError::FileNotFound`] if the file does not exist.
#[utoipa::path(
    delete,
    path = "/files/{id}",
    tag = "Files",
    summary = "Delete file",
    params(
        ("id" = uuid::Uuid, Path, description = "File UUID"),
    ),
    responses(
        (status = 204, description = "File deleted"),
        (status = 404, description = "File not found", body = ErrorResponse),
    )
)]
pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<FileId>,
) -> Result<impl IntoResponse, StorageError> {
    state.file_service.delete_by_id(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /files/by-path`: Delete a file by virtual path.
///
/// # Errors
///
/// Returns [`StorageError::FileNotFound`] if no file has that path.
#[utoipa::path(
    delete,
    path = "/files/by-path",
    tag = "Files",
    summary = "Delete file by path",
    params(FilePathQuery),
    responses(
        (status = 204, description = "File deleted"),
        (status = 404, description = "File not found", body = ErrorResponse),
    )
)]
pub async fn delete_file_by_path(
    State(state): State<AppState>,
    Query(query): Query<FilePathQuery>,
) -> Result<impl IntoResponse, StorageError> {
    state.file_service.delete_by_path(&query.file_path).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /files/{id}/download`: Stream a file's content.
///
/// # Errors
///
/// Returns [`StorageError::FileNotFound`] if the file or its content is
/// missing.
#[utoipa::path(
    get,
    path = "/files/{id}/download",
    tag = "Files",
    summary = "Download file",
    params(
        ("id" = uuid::Uuid, Path, description = "File UUID"),
    ),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream", body = Vec<u8>),
        (status = 404, description = "File not found", body = ErrorResponse),
    )
)]
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<FileId>,
) -> Result<Response, StorageError> {
    let info = state.file_service.download_info(id).await?;
    stream_download(&state.file_service, info).await
}

/// `GET /files/download/by-path`: Stream a file's content by virtual path.
///
/// # Errors
///
/// Returns [`StorageError::FileNotFound`] if the file or its content is
/// missing.
#[utoipa::path(
    get,
    path = "/files/download/by-path",
    tag = "Files",
    summary = "Download file by path",
    params(FilePathQuery),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream", body = Vec<u8>),
        (status = 404, description = "File not found", body = ErrorResponse),
    )
)]
pub async fn download_file_by_path(
    State(state): State<AppState>,
    Query(query): Query<FilePathQuery>,
) -> Result<Response, StorageError> {
    let info = state
        .file_service
        .download_info_by_path(&query.file_path)
        .await?;
    stream_download(&state.file_service, info).await
}

/// File routes. Upload requests may carry bodies up to `max_upload_bytes`.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/files", get(list_files))
        .route(
            "/files/upload",
            post(upload_file).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/files/by-path", delete(delete_file_by_path))
        .route("/files/download/by-path", get(download_file_by_path))
        .route(
            "/files/{id}",
            get(get_file).patch(update_file).delete(delete_file),
        )
        .route("/files/{id}/download", get(download_file))
}

#[derive(Default)]
struct UploadFields {
    file: Option<(StagedUpload, Option<String>)>,
    uploader_user_id: Option<String>,
    folder_path: Option<String>,
}

/// Reads every multipart field, streaming `file` into staging. Whatever was
/// staged before an error is left in `fields` for the caller to discard.
async fn read_upload_fields(
    service: &FileService,
    multipart: &mut Multipart,
    fields: &mut UploadFields,
) -> Result<(), StorageError> {
    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                if fields.file.is_some() {
                    return Err(StorageError::InvalidRequest(
                        "multipart field 'file' sent more than once".into(),
                    ));
                }
                let original_name = field.file_name().map(str::to_owned);
                let mut writer = service.begin_upload().await?;
                loop {
                    let chunk = match field.chunk().await {
                        Ok(Some(chunk)) => chunk,
                        Ok(None) => break,
                        Err(err) => {
                            writer.abort().await;
                            return Err(err.into());
                        }
                    };
                    if let Err(err) = writer.write_chunk(&chunk).await {
                        writer.abort().await;
                        return Err(err);
                    }
                }
                fields.file = Some((writer.finish().await?, original_name));
            }
            Some("uploader_user_id") => fields.uploader_user_id = Some(field.text().await?),
            Some("folder_path") => fields.folder_path = Some(field.text().await?),
            _ => {}
        }
    }
    Ok(())
}

fn parse_upload_meta(
    uploader_user_id: Option<String>,
    folder_path: Option<String>,
) -> Result<(Uuid, String), StorageError> {
    let Some(raw_uploader) = uploader_user_id else {
        return Err(StorageError::InvalidRequest(
            "missing multipart field 'uploader_user_id'".into(),
        ));
    };
    let uploader = Uuid::parse_str(raw_uploader.trim()).map_err(|err| {
        StorageError::InvalidRequest(format!("invalid uploader_user_id: {err}"))
    })?;
    let Some(folder_path) = folder_path else {
        return Err(StorageError::InvalidRequest(
            "missing multipart field 'folder_path'".into(),
        ));
    };
    Ok((uploader, folder_path))
}

async fn stream_download(
    service: &FileService,
    info: DownloadInfo,
) -> Result<Response, StorageError> {
    let stream = service.open_content(&info).await?;
    let headers = [
        (CONTENT_TYPE, info.mime_type),
        (CONTENT_DISPOSITION, content_disposition(&info.name)),
    ];
    Ok((headers, Body::from_stream(stream)).into_response())
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 UTF-8
/// name.
fn content_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let mut encoded = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || b"-._~".contains(&byte) {
            encoded.push(char::from(byte));
        } else {
            let _ = write!(encoded, "%{byte:02X}");
        }
    }
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}
