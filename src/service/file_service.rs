//! File service: uploads, moves, downloads and deletes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Bytes;
use futures_util::Stream;
use uuid::Uuid;

use super::folder_service::path_string;
use crate::domain::virtual_path::{file_path, normalize_file_path, normalize_folder_path};
use crate::domain::{
    DownloadInfo, EntryName, FileChanges, FileId, Folder, FolderId, NewFile, Page, PageRequest,
    StoredFile,
};
use crate::error::StorageError;
use crate::persistence::{FileRepository, FolderRepository};
use crate::storage::{FileDisk, StagedUpload, UploadWriter};

/// A completed upload waiting to be attached to a folder.
#[derive(Debug)]
pub struct UploadRequest {
    /// Content already written to staging.
    pub staged: StagedUpload,
    /// Client-supplied file name, if any.
    pub original_name: Option<String>,
    /// Uploading user.
    pub uploader_user_id: Uuid,
    /// Virtual path of the target folder.
    pub folder_path: String,
}

/// Input for [`FileService::update`]. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateFile {
    /// New display name. The on-disk name never changes.
    pub name: Option<EntryName>,
    /// Folder to move the file into.
    pub folder_id: Option<FolderId>,
}

/// File operations.
#[derive(Debug, Clone)]
pub struct FileService {
    files: Arc<dyn FileRepository>,
    folders: Arc<dyn FolderRepository>,
    disk: FileDisk,
}

impl FileService {
    /// Creates a new `FileService`.
    #[must_use]
    pub fn new(
        files: Arc<dyn FileRepository>,
        folders: Arc<dyn FolderRepository>,
        disk: FileDisk,
    ) -> Self {
        Self {
            files,
            folders,
            disk,
        }
    }

    /// Lists the files of the folder at `folder_path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FolderNotFound`] if no folder has that path.
    pub async fn list_by_folder_path(
        &self,
        folder_path: &str,
        request: PageRequest,
    ) -> Result<Page<StoredFile>, StorageError> {
        let folder = self.folder_by_path(folder_path).await?;
        self.files.list_in_folder(folder.id, request).await
    }

    /// Fetches a file by id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FileNotFound`] if no file matches.
    pub async fn get(&self, id: FileId) -> Result<StoredFile, StorageError> {
        self.files.get(id).await
    }

    /// Resolves a file id to what a download needs.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FileNotFound`] if no file matches.
    pub async fn download_info(&self, id: FileId) -> Result<DownloadInfo, StorageError> {
        self.files.get(id).await.map(DownloadInfo::from)
    }

    /// Resolves a virtual file path to what a download needs.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FileNotFound`] if no file matches.
    pub async fn download_info_by_path(&self, path: &str) -> Result<DownloadInfo, StorageError> {
        self.file_by_path(path).await.map(DownloadInfo::from)
    }

    /// Opens the content behind a [`DownloadInfo`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FileNotFound`] if the bytes are missing on
    /// disk.
    pub async fn open_content(
        &self,
        info: &DownloadInfo,
    ) -> Result<impl Stream<Item = std::io::Result<Bytes>> + Send + 'static, StorageError> {
        self.disk.open(Path::new(&info.storage_path)).await
    }

    /// Starts streaming a new upload into staging.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Filesystem`] if staging is not writable.
    pub async fn begin_upload(&self) -> Result<UploadWriter, StorageError> {
        self.disk.begin_upload().await
    }

    /// Drops a staged upload that will not be committed.
    pub async fn discard_upload(&self, staged: StagedUpload) {
        self.disk.discard(staged).await;
    }

    /// Attaches a staged upload to a folder.
    ///
    /// The file is stored as `<id><ext>` inside the folder's directory,
    /// where `ext` comes from the display name. The display name is the
    /// client file name, or the id when none was sent.
    ///
    /// # Errors
    ///
    /// - [`StorageError::FolderNotFound`] if the folder path is unknown.
    /// - [`StorageError::InvalidName`] if the display name is invalid.
    /// - [`StorageError::ExtensionNotAllowed`] if the allow-list rejects it.
    ///
    /// On any error the staged content is removed.
    pub async fn upload(&self, request: UploadRequest) -> Result<StoredFile, StorageError> {
        let prepared = self
            .prepare_upload(&request.folder_path, request.original_name.as_deref())
            .await;
        let (folder, id, name) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => {
                self.disk.discard(request.staged).await;
                return Err(err);
            }
        };

        let file_name = format!("{id}{}", name.extension());
        let size_bytes = i64::try_from(request.staged.size_bytes()).unwrap_or(i64::MAX);
        let stored = self
            .disk
            .commit(request.staged, Path::new(&folder.storage_path), &file_name)
            .await?;

        let row = NewFile {
            id,
            name,
            uploader_user_id: request.uploader_user_id,
            folder_id: Some(folder.id),
            storage_path: path_string(&stored),
            virtual_path: file_path(&folder.virtual_path, &file_name),
            size_bytes,
            mime_type: FileDisk::mime_type_for(&stored),
        };
        match self.files.insert(row).await {
            Ok(file) => {
                tracing::info!(
                    file_id = %file.id,
                    path = %file.virtual_path,
                    size_bytes = file.size_bytes,
                    "file uploaded"
                );
                Ok(file)
            }
            Err(err) => {
                self.remove_quietly(&stored).await;
                Err(err)
            }
        }
    }

    /// Renames a file's display name and/or moves it to another folder.
    ///
    /// # Errors
    ///
    /// - [`StorageError::FileNotFound`] if the file does not exist.
    /// - [`StorageError::FolderNotFound`] if the target folder does not.
    /// - [`StorageError::Conflict`] if the target location is taken.
    pub async fn update(&self, id: FileId, request: UpdateFile) -> Result<StoredFile, StorageError> {
        let current = self.files.get(id).await?;
        let mut changes = FileChanges {
            name: request.name,
            ..FileChanges::default()
        };

        let mut moved: Option<(PathBuf, PathBuf)> = None;
        if let Some(target_id) = request.folder_id
            && current.folder_id != Some(target_id)
        {
            let target = self.folders.get(target_id).await?;
            let old_path = PathBuf::from(&current.storage_path);
            let Some(file_name) = old_path.file_name().map(|n| n.to_string_lossy().into_owned())
            else {
                return Err(StorageError::Internal(format!(
                    "stored path has no file name: {}",
                    current.storage_path
                )));
            };
            let new_virtual = file_path(&target.virtual_path, &file_name);
            if self.files.find_by_virtual_path(&new_virtual).await?.is_some() {
                return Err(StorageError::Conflict(format!(
                    "file already exists: {new_virtual}"
                )));
            }
            let new_path = Path::new(&target.storage_path).join(&file_name);
            self.disk.move_file(&old_path, &new_path).await?;

            changes.folder_id = Some(target_id);
            changes.storage_path = Some(path_string(&new_path));
            changes.virtual_path = Some(new_virtual);
            moved = Some((old_path, new_path));
        }

        match self.files.update(id, changes).await {
            Ok(file) => {
                if moved.is_some() {
                    tracing::info!(file_id = %id, path = %file.virtual_path, "file moved");
                }
                Ok(file)
            }
            Err(err) => {
                if let Some((old_path, new_path)) = &moved
                    && let Err(undo) = self.disk.move_file(new_path, old_path).await
                {
                    tracing::warn!(
                        error = %undo,
                        file_id = %id,
                        "failed to restore file after rejected update"
                    );
                }
                Err(err)
            }
        }
    }

    /// Deletes a file by id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FileNotFound`] if no file matches.
    pub async fn delete_by_id(&self, id: FileId) -> Result<(), StorageError> {
        let file = self.files.get(id).await?;
        self.delete(file).await
    }

    /// Deletes a file by virtual path.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FileNotFound`] if no file matches.
    pub async fn delete_by_path(&self, path: &str) -> Result<(), StorageError> {
        let file = self.file_by_path(path).await?;
        self.delete(file).await
    }

    async fn delete(&self, file: StoredFile) -> Result<(), StorageError> {
        self.disk
            .delete_file(Path::new(&file.storage_path))
            .await?;
        self.files.delete(file.id).await?;
        tracing::info!(file_id = %file.id, path = %file.virtual_path, "file deleted");
        Ok(())
    }

    async fn prepare_upload(
        &self,
        folder_path: &str,
        original_name: Option<&str>,
    ) -> Result<(Folder, FileId, EntryName), StorageError> {
        let folder = self.folder_by_path(folder_path).await?;
        let id = FileId::new();
        let name = match original_name.filter(|n| !n.is_empty()) {
            Some(raw) => EntryName::parse(raw)?,
            None => EntryName::parse(id.to_string())?,
        };
        self.disk.ensure_extension_allowed(&name)?;
        Ok((folder, id, name))
    }

    async fn folder_by_path(&self, path: &str) -> Result<Folder, StorageError> {
        let path = normalize_folder_path(path);
        self.folders
            .find_by_virtual_path(&path)
            .await?
            .ok_or(StorageError::FolderNotFound(path))
    }

    async fn file_by_path(&self, path: &str) -> Result<StoredFile, StorageError> {
        let path = normalize_file_path(path);
        self.files
            .find_by_virtual_path(&path)
            .await?
            .ok_or(StorageError::FileNotFound(path))
    }

    async fn remove_quietly(&self, path: &Path) {
        if let Err(err) = self.disk.delete_file(path).await {
            tracing::warn!(error = %err, path = %path.display(), "failed to remove orphaned file");
        }
    }
}
