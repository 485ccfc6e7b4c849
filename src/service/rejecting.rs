//! Repository wrapper that can be switched to reject every write.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::domain::{
    FileChanges, FileId, Folder, FolderChanges, FolderId, NewFile, NewFolder, Page, PageRequest,
    StoredFile,
};
use crate::error::StorageError;
use crate::persistence::memory::MemoryCatalog;
use crate::persistence::{FileRepository, FolderRepository};

/// Delegates to a [`MemoryCatalog`]; once [`reject_writes`] is called,
/// `insert` and `update` fail with [`StorageError::Conflict`].
///
/// [`reject_writes`]: RejectingCatalog::reject_writes
#[derive(Debug)]
pub(crate) struct RejectingCatalog {
    inner: Arc<MemoryCatalog>,
    rejecting: AtomicBool,
}

impl RejectingCatalog {
    pub(crate) fn new(inner: Arc<MemoryCatalog>) -> Self {
        Self {
            inner,
            rejecting: AtomicBool::new(false),
        }
    }

    pub(crate) fn reject_writes(&self) {
        self.rejecting.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(StorageError::Conflict("write rejected".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl FolderRepository for RejectingCatalog {
    async fn insert(&self, folder: NewFolder) -> Result<Folder, StorageError> {
        self.check()?;
        FolderRepository::insert(&*self.inner, folder).await
    }

    async fn get(&self, id: FolderId) -> Result<Folder, StorageError> {
        FolderRepository::get(&*self.inner, id).await
    }

    async fn find_by_virtual_path(&self, path: &str) -> Result<Option<Folder>, StorageError> {
        FolderRepository::find_by_virtual_path(&*self.inner, path).await
    }

    async fn list_children(
        &self,
        parent: Option<FolderId>,
        request: PageRequest,
    ) -> Result<Page<Folder>, StorageError> {
        self.inner.list_children(parent, request).await
    }

    async fn update(&self, id: FolderId, changes: FolderChanges) -> Result<Folder, StorageError> {
        self.check()?;
        FolderRepository::update(&*self.inner, id, changes).await
    }

    async fn delete(&self, id: FolderId) -> Result<(), StorageError> {
        FolderRepository::delete(&*self.inner, id).await
    }
}

#[async_trait]
impl FileRepository for RejectingCatalog {
    async fn insert(&self, file: NewFile) -> Result<StoredFile, StorageError> {
        self.check()?;
        FileRepository::insert(&*self.inner, file).await
    }

    async fn get(&self, id: FileId) -> Result<StoredFile, StorageError> {
        FileRepository::get(&*self.inner, id).await
    }

    async fn find_by_virtual_path(&self, path: &str) -> Result<Option<StoredFile>, StorageError> {
        FileRepository::find_by_virtual_path(&*self.inner, path).await
    }

    async fn list_in_folder(
        &self,
        folder: FolderId,
        request: PageRequest,
    ) -> Result<Page<StoredFile>, StorageError> {
        self.inner.list_in_folder(folder, request).await
    }

    async fn update(&self, id: FileId, changes: FileChanges) -> Result<StoredFile, StorageError> {
        self.check()?;
        FileRepository::update(&*self.inner, id, changes).await
    }

    async fn delete(&self, id: FileId) -> Result<(), StorageError> {
        FileRepository::delete(&*self.inner, id).await
    }
}
