//! OpenAPI document for every REST endpoint.

use utoipa::OpenApi;

use super::dto::{
    CreateFolderRequest, FileListResponse, FileOut, FolderListResponse, FolderOut,
    HealthResponse, PaginationMeta, UpdateFileRequest, UpdateFolderRequest, UploadForm,
};
use super::handlers::{file, folder, system};
use crate::error::{ErrorBody, ErrorResponse};

/// Generated API description served at `/api/openapi.json`.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "virtual-storage",
        description = "Virtual folder tree and file storage backed by PostgreSQL and the local filesystem."
    ),
    paths(
        system::healthcheck,
        folder::list_folders,
        folder::get_folder_by_path,
        folder::get_folder,
        folder::create_folder,
        folder::update_folder,
        folder::delete_folder,
        file::list_files,
        file::get_file,
        file::upload_file,
        file::update_file,
        file::delete_file,
        file::delete_file_by_path,
        file::download_file,
        file::download_file_by_path,
    ),
    components(schemas(
        HealthResponse,
        PaginationMeta,
        FolderOut,
        FolderListResponse,
        CreateFolderRequest,
        UpdateFolderRequest,
        FileOut,
        FileListResponse,
        UpdateFileRequest,
        UploadForm,
        ErrorResponse,
        ErrorBody,
    )),
    tags(
        (name = "System", description = "Liveness"),
        (name = "Folders", description = "Folder tree management"),
        (name = "Files", description = "File upload, download and management"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/v1/healthcheck",
            "/folders",
            "/folders/by-path",
            "/folders/{id}",
            "/files",
            "/files/upload",
            "/files/by-path",
            "/files/{id}",
            "/files/{id}/download",
            "/files/download/by-path",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
