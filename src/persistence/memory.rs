//! In-memory catalog implementing both repository traits.
//!
//! Mirrors the PostgreSQL schema's behaviour: unique paths, cascading
//! deletes, name ordering and subtree relocation. Backs unit and
//! integration tests; not meant for production data.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{FileRepository, FolderRepository};
use crate::domain::{
    FileChanges, FileId, Folder, FolderChanges, FolderId, NewFile, NewFolder, Page, PageRequest,
    StoredFile,
};
use crate::error::StorageError;

#[derive(Debug, Default)]
struct Tables {
    folders: HashMap<FolderId, Folder>,
    files: HashMap<FileId, StoredFile>,
}

impl Tables {
    fn folder_path_taken(
        &self,
        virtual_path: &str,
        storage_path: &str,
        except: Option<FolderId>,
    ) -> bool {
        self.folders.values().any(|f| {
            Some(f.id) != except
                && (f.virtual_path == virtual_path || f.storage_path == storage_path)
        })
    }

    fn file_path_taken(
        &self,
        virtual_path: &str,
        storage_path: &str,
        except: Option<FileId>,
    ) -> bool {
        self.files.values().any(|f| {
            Some(f.id) != except
                && (f.virtual_path == virtual_path || f.storage_path == storage_path)
        })
    }

    /// Ids of `root` and every folder beneath it.
    fn subtree(&self, root: FolderId) -> Vec<FolderId> {
        let mut out = vec![root];
        let mut cursor = 0;
        while let Some(current) = out.get(cursor).copied() {
            out.extend(
                self.folders
                    .values()
                    .filter(|f| f.parent_id == Some(current))
                    .map(|f| f.id),
            );
            cursor += 1;
        }
        out
    }
}

fn paginate<T>(mut items: Vec<T>, request: PageRequest) -> Page<T> {
    let total = items.len() as u64;
    let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(request.limit()).unwrap_or(usize::MAX);
    let items = if offset >= items.len() {
        Vec::new()
    } else {
        items.drain(offset..).take(limit).collect()
    };
    Page {
        items,
        total,
        request,
    }
}

/// Shared in-memory store for folders and files.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    tables: RwLock<Tables>,
}

impl MemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of folder rows.
    pub async fn folder_count(&self) -> usize {
        self.tables.read().await.folders.len()
    }

    /// Number of file rows.
    pub async fn file_count(&self) -> usize {
        self.tables.read().await.files.len()
    }
}

#[async_trait]
impl FolderRepository for MemoryCatalog {
    async fn insert(&self, folder: NewFolder) -> Result<Folder, StorageError> {
        let mut tables = self.tables.write().await;
        if tables.folder_path_taken(&folder.virtual_path, &folder.storage_path, None) {
            return Err(StorageError::Conflict(format!(
                "duplicate folder path {}",
                folder.virtual_path
            )));
        }
        if let Some(parent) = folder.parent_id
            && !tables.folders.contains_key(&parent)
        {
            return Err(StorageError::Conflict(format!(
                "referenced folder does not exist: {parent}"
            )));
        }
        let now = Utc::now();
        let row = Folder {
            id: FolderId::new(),
            name: folder.name.into(),
            storage_path: folder.storage_path,
            virtual_path: folder.virtual_path,
            creator_user_id: folder.creator_user_id,
            parent_id: folder.parent_id,
            access_url: None,
            is_published: folder.is_published,
            created_at: now,
            updated_at: now,
        };
        tables.folders.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get(&self, id: FolderId) -> Result<Folder, StorageError> {
        self.tables
            .read()
            .await
            .folders
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::FolderNotFound(id.to_string()))
    }

    async fn find_by_virtual_path(&self, path: &str) -> Result<Option<Folder>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .folders
            .values()
            .find(|f| f.virtual_path == path)
            .cloned())
    }

    async fn list_children(
        &self,
        parent: Option<FolderId>,
        request: PageRequest,
    ) -> Result<Page<Folder>, StorageError> {
        let tables = self.tables.read().await;
        let mut children: Vec<Folder> = tables
            .folders
            .values()
            .filter(|f| f.parent_id == parent)
            .cloned()
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(paginate(children, request))
    }

    async fn update(&self, id: FolderId, changes: FolderChanges) -> Result<Folder, StorageError> {
        let mut tables = self.tables.write().await;
        let Some(current) = tables.folders.get(&id).cloned() else {
            return Err(StorageError::FolderNotFound(id.to_string()));
        };

        let mut next = current;
        if let Some(name) = changes.name {
            next.name = name.into();
        }
        if let Some(parent) = changes.parent_id {
            if let Some(parent_id) = parent
                && !tables.folders.contains_key(&parent_id)
            {
                return Err(StorageError::Conflict(format!(
                    "referenced folder does not exist: {parent_id}"
                )));
            }
            next.parent_id = parent;
        }
        if let Some(creator) = changes.creator_user_id {
            next.creator_user_id = creator;
        }
        if let Some(published) = changes.is_published {
            next.is_published = published;
        }
        if let Some(relocation) = &changes.relocation {
            next.virtual_path.clone_from(&relocation.new_virtual_path);
            next.storage_path.clone_from(&relocation.new_storage_path);
        }
        if tables.folder_path_taken(&next.virtual_path, &next.storage_path, Some(id)) {
            return Err(StorageError::Conflict(format!(
                "duplicate folder path {}",
                next.virtual_path
            )));
        }

        let now = Utc::now();
        next.updated_at = now;

        if let Some(relocation) = &changes.relocation {
            for folder in tables.folders.values_mut().filter(|f| f.id != id) {
                if let Some(virtual_path) = relocation.rebase_virtual(&folder.virtual_path) {
                    folder.virtual_path = virtual_path;
                    if let Some(storage) = relocation.rebase_storage(&folder.storage_path) {
                        folder.storage_path = storage;
                    }
                    folder.updated_at = now;
                }
            }
            for file in tables.files.values_mut() {
                if let Some(virtual_path) = relocation.rebase_virtual(&file.virtual_path) {
                    file.virtual_path = virtual_path;
                    if let Some(storage) = relocation.rebase_storage(&file.storage_path) {
                        file.storage_path = storage;
                    }
                    file.updated_at = now;
                }
            }
        }

        tables.folders.insert(id, next.clone());
        Ok(next)
    }

    async fn delete(&self, id: FolderId) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        if !tables.folders.contains_key(&id) {
            return Err(StorageError::FolderNotFound(id.to_string()));
        }
        let doomed = tables.subtree(id);
        tables
            .files
            .retain(|_, f| f.folder_id.is_none_or(|folder| !doomed.contains(&folder)));
        for folder in doomed {
            tables.folders.remove(&folder);
        }
        Ok(())
    }
}

#[async_trait]
impl FileRepository for MemoryCatalog {
    async fn insert(&self, file: NewFile) -> Result<StoredFile, StorageError> {
        let mut tables = self.tables.write().await;
        if tables.files.contains_key(&file.id)
            || tables.file_path_taken(&file.virtual_path, &file.storage_path, None)
        {
            return Err(StorageError::Conflict(format!(
                "duplicate file {}",
                file.virtual_path
            )));
        }
        if let Some(folder) = file.folder_id
            && !tables.folders.contains_key(&folder)
        {
            return Err(StorageError::Conflict(format!(
                "referenced folder does not exist: {folder}"
            )));
        }
        let now = Utc::now();
        let row = StoredFile {
            id: file.id,
            name: file.name.into(),
            storage_path: file.storage_path,
            virtual_path: file.virtual_path,
            uploader_user_id: file.uploader_user_id,
            size_bytes: file.size_bytes,
            mime_type: file.mime_type,
            folder_id: file.folder_id,
            access_url: None,
            created_at: now,
            updated_at: now,
        };
        tables.files.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get(&self, id: FileId) -> Result<StoredFile, StorageError> {
        self.tables
            .read()
            .await
            .files
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::FileNotFound(id.to_string()))
    }

    async fn find_by_virtual_path(&self, path: &str) -> Result<Option<StoredFile>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .files
            .values()
            .find(|f| f.virtual_path == path)
            .cloned())
    }

    async fn list_in_folder(
        &self,
        folder: FolderId,
        request: PageRequest,
    ) -> Result<Page<StoredFile>, StorageError> {
        let tables = self.tables.read().await;
        let mut files: Vec<StoredFile> = tables
            .files
            .values()
            .filter(|f| f.folder_id == Some(folder))
            .cloned()
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(paginate(files, request))
    }

    async fn update(&self, id: FileId, changes: FileChanges) -> Result<StoredFile, StorageError> {
        let mut tables = self.tables.write().await;
        let Some(mut next) = tables.files.get(&id).cloned() else {
            return Err(StorageError::FileNotFound(id.to_string()));
        };
        if let Some(name) = changes.name {
            next.name = name.into();
        }
        if let Some(folder) = changes.folder_id {
            if !tables.folders.contains_key(&folder) {
                return Err(StorageError::Conflict(format!(
                    "referenced folder does not exist: {folder}"
                )));
            }
            next.folder_id = Some(folder);
        }
        if let Some(storage_path) = changes.storage_path {
            next.storage_path = storage_path;
        }
        if let Some(virtual_path) = changes.virtual_path {
            next.virtual_path = virtual_path;
        }
        if tables.file_path_taken(&next.virtual_path, &next.storage_path, Some(id)) {
            return Err(StorageError::Conflict(format!(
                "duplicate file {}",
                next.virtual_path
            )));
        }
        next.updated_at = Utc::now();
        tables.files.insert(id, next.clone());
        Ok(next)
    }

    async fn delete(&self, id: FileId) -> Result<(), StorageError> {
        self.tables
            .write()
            .await
            .files
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StorageError::FileNotFound(id.to_string()))
    }
}
