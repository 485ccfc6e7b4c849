//! Persistence layer: folder and file metadata.
//!
//! Services talk to [`FolderRepository`] and [`FileRepository`]; the
//! production implementations in [`postgres`] use `sqlx::PgPool`. The
//! in-memory [`memory::MemoryCatalog`] mirrors the same constraints and
//! backs the test suites.

#[cfg(any(test, feature = "testkit"))]
pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::domain::{
    FileChanges, FileId, Folder, FolderChanges, FolderId, NewFile, NewFolder, Page, PageRequest,
    StoredFile,
};
use crate::error::StorageError;

/// Embedded schema migrations from `./migrations`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Folder metadata storage.
///
/// Implementations enforce unique `virtual_path` and `storage_path`, cascade
/// deletes to child folders and files, and list children ordered by name.
#[async_trait]
pub trait FolderRepository: Send + Sync + std::fmt::Debug {
    /// Inserts a folder row.
    ///
    /// # Errors
    ///
    /// [`StorageError::Conflict`] when a path is already taken or the parent
    /// does not exist.
    async fn insert(&self, folder: NewFolder) -> Result<Folder, StorageError>;

    /// Fetches a folder by id.
    ///
    /// # Errors
    ///
    /// [`StorageError::FolderNotFound`] when no row matches.
    async fn get(&self, id: FolderId) -> Result<Folder, StorageError>;

    /// Fetches a folder by canonical virtual path.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    async fn find_by_virtual_path(&self, path: &str) -> Result<Option<Folder>, StorageError>;

    /// Lists the direct children of `parent` (root when `None`).
    ///
    /// # Errors
    ///
    /// Backend failures only.
    async fn list_children(
        &self,
        parent: Option<FolderId>,
        request: PageRequest,
    ) -> Result<Page<Folder>, StorageError>;

    /// Applies a partial update, rewriting descendant paths when the
    /// changes carry a relocation.
    ///
    /// # Errors
    ///
    /// [`StorageError::FolderNotFound`] when no row matches,
    /// [`StorageError::Conflict`] on constraint violations.
    async fn update(&self, id: FolderId, changes: FolderChanges) -> Result<Folder, StorageError>;

    /// Deletes a folder and, by cascade, its subtree.
    ///
    /// # Errors
    ///
    /// [`StorageError::FolderNotFound`] when no row matches.
    async fn delete(&self, id: FolderId) -> Result<(), StorageError>;
}

/// File metadata storage.
#[async_trait]
pub trait FileRepository: Send + Sync + std::fmt::Debug {
    /// Inserts a file row.
    ///
    /// # Errors
    ///
    /// [`StorageError::Conflict`] when a path is already taken or the folder
    /// does not exist.
    async fn insert(&self, file: NewFile) -> Result<StoredFile, StorageError>;

    /// Fetches a file by id.
    ///
    /// # Errors
    ///
    /// [`StorageError::FileNotFound`] when no row matches.
    async fn get(&self, id: FileId) -> Result<StoredFile, StorageError>;

    /// Fetches a file by virtual path.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    async fn find_by_virtual_path(&self, path: &str) -> Result<Option<StoredFile>, StorageError>;

    /// Lists files in a folder ordered by name.
    ///
    /// # Errors
    ///
    /// Backend failures only.
    async fn list_in_folder(
        &self,
        folder: FolderId,
        request: PageRequest,
    ) -> Result<Page<StoredFile>, StorageError>;

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// [`StorageError::FileNotFound`] when no row matches,
    /// [`StorageError::Conflict`] on constraint violations.
    async fn update(&self, id: FileId, changes: FileChanges) -> Result<StoredFile, StorageError>;

    /// Deletes a file row.
    ///
    /// # Errors
    ///
    /// [`StorageError::FileNotFound`] when no row matches.
    async fn delete(&self, id: FileId) -> Result<(), StorageError>;
}
