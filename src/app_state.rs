//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::StorageConfig;
use crate::persistence::{FileRepository, FolderRepository};
use crate::service::{FileService, FolderService};
use crate::storage::{FileDisk, FolderDisk};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Folder tree operations.
    pub folder_service: Arc<FolderService>,
    /// File operations.
    pub file_service: Arc<FileService>,
}

impl AppState {
    /// Wires the services from repositories and the storage settings in
    /// `config`.
    #[must_use]
    pub fn new(
        config: &StorageConfig,
        folders: Arc<dyn FolderRepository>,
        files: Arc<dyn FileRepository>,
    ) -> Self {
        let folder_disk = FolderDisk::new(&config.storage_base_path);
        let file_disk = FileDisk::new(
            &config.storage_base_path,
            &config.staging_path,
            config.allowed_extensions.clone(),
        );
        Self {
            folder_service: Arc::new(FolderService::new(
                Arc::clone(&folders),
                folder_disk,
                &config.virtual_base_path,
            )),
            file_service: Arc::new(FileService::new(files, folders, file_disk)),
        }
    }
}
