//! Folder service: keeps folder directories and folder rows in step.

use std::path::Path;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::virtual_path::{child_folder_path, is_within, normalize_folder_path};
use crate::domain::{
    EntryName, Folder, FolderChanges, FolderId, NewFolder, Page, PageRequest, Relocation,
};
use crate::error::StorageError;
use crate::persistence::FolderRepository;
use crate::storage::FolderDisk;

/// Input for [`FolderService::create`].
#[derive(Debug, Clone)]
pub struct CreateFolder {
    /// Folder name.
    pub name: EntryName,
    /// Parent folder; `None` creates a top-level folder.
    pub parent_id: Option<FolderId>,
    /// Creating user.
    pub creator_user_id: Uuid,
    /// Visibility flag.
    pub is_published: bool,
}

/// Input for [`FolderService::update`]. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateFolder {
    /// New name.
    pub name: Option<EntryName>,
    /// New parent; `Some(None)` moves the folder to the top level.
    pub parent_id: Option<Option<FolderId>>,
    /// New creator.
    pub creator_user_id: Option<Uuid>,
    /// New visibility.
    pub is_published: Option<bool>,
}

/// Folder operations.
///
/// Every mutation touches the disk first and the repository second, and
/// undoes the disk step when the repository rejects the change.
#[derive(Debug, Clone)]
pub struct FolderService {
    folders: Arc<dyn FolderRepository>,
    disk: FolderDisk,
    virtual_base: String,
}

impl FolderService {
    /// Creates a new `FolderService`. `virtual_base` is normalised.
    #[must_use]
    pub fn new(folders: Arc<dyn FolderRepository>, disk: FolderDisk, virtual_base: &str) -> Self {
        Self {
            folders,
            disk,
            virtual_base: normalize_folder_path(virtual_base),
        }
    }

    /// Lists the children of `parent_id`, or the top-level folders.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FolderNotFound`] if `parent_id` is unknown.
    pub async fn list(
        &self,
        parent_id: Option<FolderId>,
        request: PageRequest,
    ) -> Result<Page<Folder>, StorageError> {
        if let Some(parent) = parent_id {
            self.folders.get(parent).await?;
        }
        self.folders.list_children(parent_id, request).await
    }

    /// Fetches a folder by id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FolderNotFound`] if no folder matches.
    pub async fn get(&self, id: FolderId) -> Result<Folder, StorageError> {
        self.folders.get(id).await
    }

    /// Fetches a folder by virtual path. The path is normalised first.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FolderNotFound`] if no folder matches.
    pub async fn get_by_virtual_path(&self, path: &str) -> Result<Folder, StorageError> {
        let path = normalize_folder_path(path);
        self.folders
            .find_by_virtual_path(&path)
            .await?
            .ok_or(StorageError::FolderNotFound(path))
    }

    /// Creates a folder directory and its row.
    ///
    /// # Errors
    ///
    /// - [`StorageError::FolderNotFound`] if the parent does not exist.
    /// - [`StorageError::FolderAlreadyExists`] if the path is taken.
    /// - [`StorageError::Filesystem`] / [`StorageError::Database`] on backend
    ///   failures.
    pub async fn create(&self, request: CreateFolder) -> Result<Folder, StorageError> {
        let parent_path = match request.parent_id {
            Some(parent) => self.folders.get(parent).await?.virtual_path,
            None => self.virtual_base.clone(),
        };
        let virtual_path = child_folder_path(&parent_path, &request.name);
        if self
            .folders
            .find_by_virtual_path(&virtual_path)
            .await?
            .is_some()
        {
            return Err(StorageError::FolderAlreadyExists(virtual_path));
        }

        let storage_path = self.disk.storage_path_for(&virtual_path);
        self.disk.create_folder(&storage_path).await?;

        let row = NewFolder {
            name: request.name,
            parent_id: request.parent_id,
            creator_user_id: request.creator_user_id,
            is_published: request.is_published,
            storage_path: path_string(&storage_path),
            virtual_path,
        };
        match self.folders.insert(row).await {
            Ok(folder) => {
                tracing::info!(folder_id = %folder.id, path = %folder.virtual_path, "folder created");
                Ok(folder)
            }
            Err(err) => {
                if let Err(cleanup) = self.disk.delete_folder(&storage_path).await {
                    tracing::warn!(
                        error = %cleanup,
                        path = %storage_path.display(),
                        "failed to remove directory after rejected insert"
                    );
                }
                Err(err)
            }
        }
    }

    /// Renames and/or moves a folder and updates its attributes.
    ///
    /// When the virtual path changes, the directory is renamed on disk and
    /// the paths of every descendant folder and file are rewritten.
    ///
    /// # Errors
    ///
    /// - [`StorageError::FolderNotFound`] if the folder or the new parent is
    ///   missing.
    /// - [`StorageError::InvalidRequest`] if the folder would move into
    ///   itself or a descendant.
    /// - [`StorageError::FolderAlreadyExists`] if the target path is taken.
    pub async fn update(
        &self,
        id: FolderId,
        request: UpdateFolder,
    ) -> Result<Folder, StorageError> {
        let current = self.folders.get(id).await?;

        let name = match &request.name {
            Some(name) => name.clone(),
            None => EntryName::parse(current.name.clone())?,
        };
        let parent_id = request.parent_id.unwrap_or(current.parent_id);
        let parent_path = match parent_id {
            Some(parent) if parent == id => {
                return Err(StorageError::InvalidRequest(
                    "a folder cannot be its own parent".into(),
                ));
            }
            Some(parent) => {
                let parent = self.folders.get(parent).await?;
                if is_within(&parent.virtual_path, &current.virtual_path) {
                    return Err(StorageError::InvalidRequest(
                        "a folder cannot be moved into one of its descendants".into(),
                    ));
                }
                parent.virtual_path
            }
            None => self.virtual_base.clone(),
        };
        let new_virtual = child_folder_path(&parent_path, &name);

        let relocation = if new_virtual == current.virtual_path {
            None
        } else {
            if self
                .folders
                .find_by_virtual_path(&new_virtual)
                .await?
                .is_some()
            {
                return Err(StorageError::FolderAlreadyExists(new_virtual));
            }
            let new_storage = self.disk.storage_path_for(&new_virtual);
            self.disk
                .rename_folder(Path::new(&current.storage_path), &new_storage)
                .await?;
            Some(Relocation {
                old_virtual_path: current.virtual_path.clone(),
                new_virtual_path: new_virtual,
                old_storage_path: current.storage_path.clone(),
                new_storage_path: path_string(&new_storage),
            })
        };

        let changes = FolderChanges {
            name: request.name,
            parent_id: request.parent_id,
            creator_user_id: request.creator_user_id,
            is_published: request.is_published,
            relocation: relocation.clone(),
        };
        match self.folders.update(id, changes).await {
            Ok(folder) => {
                if let Some(moved) = &relocation {
                    tracing::info!(
                        folder_id = %id,
                        from = %moved.old_virtual_path,
                        to = %moved.new_virtual_path,
                        "folder moved"
                    );
                }
                Ok(folder)
            }
            Err(err) => {
                if let Some(moved) = &relocation {
                    let undo = self
                        .disk
                        .rename_folder(
                            Path::new(&moved.new_storage_path),
                            Path::new(&moved.old_storage_path),
                        )
                        .await;
                    if let Err(undo) = undo {
                        tracing::warn!(
                            error = %undo,
                            folder_id = %id,
                            "failed to restore directory after rejected update"
                        );
                    }
                }
                Err(err)
            }
        }
    }

    /// Deletes a folder, its directory tree and, by cascade, every
    /// descendant row.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FolderNotFound`] if no folder matches.
    pub async fn delete(&self, id: FolderId) -> Result<(), StorageError> {
        let folder = self.folders.get(id).await?;
        self.disk
            .delete_folder(Path::new(&folder.storage_path))
            .await?;
        self.folders.delete(id).await?;
        tracing::info!(folder_id = %id, path = %folder.virtual_path, "folder deleted");
        Ok(())
    }
}

pub(crate) fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::persistence::memory::MemoryCatalog;
    use crate::service::rejecting::RejectingCatalog;

    struct Fixture {
        _dir: tempfile::TempDir,
        catalog: Arc<MemoryCatalog>,
        service: FolderService,
    }

    fn fixture(base: &str) -> Fixture {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir");
        };
        let catalog = Arc::new(MemoryCatalog::new());
        let service = FolderService::new(Arc::<MemoryCatalog>::clone(&catalog), FolderDisk::new(dir.path()), base);
        Fixture {
            _dir: dir,
            catalog,
            service,
        }
    }

    fn rejecting_fixture() -> (tempfile::TempDir, Arc<RejectingCatalog>, FolderService) {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir");
        };
        let catalog = Arc::new(RejectingCatalog::new(Arc::new(MemoryCatalog::new())));
        let service = FolderService::new(Arc::<RejectingCatalog>::clone(&catalog), FolderDisk::new(dir.path()), "/");
        (dir, catalog, service)
    }

    fn name(raw: &str) -> EntryName {
        let Ok(name) = EntryName::parse(raw) else {
            panic!("valid name {raw}");
        };
        name
    }

    async fn create(service: &FolderService, raw: &str, parent: Option<FolderId>) -> Folder {
        let request = CreateFolder {
            name: name(raw),
            parent_id: parent,
            creator_user_id: Uuid::new_v4(),
            is_published: true,
        };
        match service.create(request).await {
            Ok(folder) => folder,
            Err(err) => panic!("create {raw}: {err}"),
        }
    }

    async fn dir_exists(path: &str) -> bool {
        matches!(tokio::fs::metadata(path).await, Ok(meta) if meta.is_dir())
    }

    #[tokio::test]
    async fn create_builds_paths_and_directory() {
        let fx = fixture("/");
        let docs = create(&fx.service, "docs", None).await;
        let reports = create(&fx.service, "reports", Some(docs.id)).await;

        assert_eq!(docs.virtual_path, "/docs/");
        assert_eq!(reports.virtual_path, "/docs/reports/");
        assert!(dir_exists(&reports.storage_path).await);
    }

    #[tokio::test]
    async fn create_under_virtual_base() {
        let fx = fixture("files");
        let docs = create(&fx.service, "docs", None).await;
        assert_eq!(docs.virtual_path, "/files/docs/");
        assert!(docs.storage_path.ends_with("files/docs"));
    }

    #[tokio::test]
    async fn create_duplicate_is_rejected() {
        let fx = fixture("/");
        create(&fx.service, "docs", None).await;
        let again = fx
            .service
            .create(CreateFolder {
                name: name("docs"),
                parent_id: None,
                creator_user_id: Uuid::new_v4(),
                is_published: false,
            })
            .await;
        assert!(matches!(again, Err(StorageError::FolderAlreadyExists(p)) if p == "/docs/"));
        assert_eq!(fx.catalog.folder_count().await, 1);
    }

    #[tokio::test]
    async fn create_with_unknown_parent_is_not_found() {
        let fx = fixture("/");
        let result = fx
            .service
            .create(CreateFolder {
                name: name("x"),
                parent_id: Some(FolderId::new()),
                creator_user_id: Uuid::new_v4(),
                is_published: true,
            })
            .await;
        assert!(matches!(result, Err(StorageError::FolderNotFound(_))));
    }

    #[tokio::test]
    async fn lookup_by_path_is_normalised() {
        let fx = fixture("/");
        let docs = create(&fx.service, "docs", None).await;
        for raw in ["docs", "/docs", "/docs/", "//docs//"] {
            let Ok(found) = fx.service.get_by_virtual_path(raw).await else {
                panic!("lookup {raw}");
            };
            assert_eq!(found.id, docs.id);
        }
        assert!(matches!(
            fx.service.get_by_virtual_path("/nope/").await,
            Err(StorageError::FolderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn rename_moves_directory_and_descendants() {
        let fx = fixture("/");
        let docs = create(&fx.service, "docs", None).await;
        let inner = create(&fx.service, "inner", Some(docs.id)).await;

        let updated = fx
            .service
            .update(
                docs.id,
                UpdateFolder {
                    name: Some(name("papers")),
                    ..UpdateFolder::default()
                },
            )
            .await;
        let Ok(updated) = updated else {
            panic!("rename");
        };
        assert_eq!(updated.name, "papers");
        assert_eq!(updated.virtual_path, "/papers/");
        assert!(dir_exists(&updated.storage_path).await);
        assert!(!dir_exists(&docs.storage_path).await);

        let Ok(inner) = fx.service.get(inner.id).await else {
            panic!("inner");
        };
        assert_eq!(inner.virtual_path, "/papers/inner/");
        assert!(dir_exists(&inner.storage_path).await);
    }

    #[tokio::test]
    async fn move_to_root_and_back() {
        let fx = fixture("/");
        let a = create(&fx.service, "a", None).await;
        let b = create(&fx.service, "b", Some(a.id)).await;

        let Ok(moved) = fx
            .service
            .update(
                b.id,
                UpdateFolder {
                    parent_id: Some(None),
                    ..UpdateFolder::default()
                },
            )
            .await
        else {
            panic!("move to root");
        };
        assert_eq!(moved.parent_id, None);
        assert_eq!(moved.virtual_path, "/b/");

        let Ok(back) = fx
            .service
            .update(
                b.id,
                UpdateFolder {
                    parent_id: Some(Some(a.id)),
                    ..UpdateFolder::default()
                },
            )
            .await
        else {
            panic!("move back");
        };
        assert_eq!(back.virtual_path, "/a/b/");
    }

    #[tokio::test]
    async fn cannot_move_into_self_or_descendant() {
        let fx = fixture("/");
        let a = create(&fx.service, "a", None).await;
        let child = create(&fx.service, "child", Some(a.id)).await;

        for target in [a.id, child.id] {
            let result = fx
                .service
                .update(
                    a.id,
                    UpdateFolder {
                        parent_id: Some(Some(target)),
                        ..UpdateFolder::default()
                    },
                )
                .await;
            assert!(matches!(result, Err(StorageError::InvalidRequest(_))));
        }
    }

    #[tokio::test]
    async fn rename_onto_existing_folder_conflicts() {
        let fx = fixture("/");
        let a = create(&fx.service, "a", None).await;
        create(&fx.service, "b", None).await;
        let result = fx
            .service
            .update(
                a.id,
                UpdateFolder {
                    name: Some(name("b")),
                    ..UpdateFolder::default()
                },
            )
            .await;
        assert!(matches!(result, Err(StorageError::FolderAlreadyExists(_))));
        assert!(dir_exists(&a.storage_path).await);
    }

    #[tokio::test]
    async fn attribute_only_update_keeps_paths() {
        let fx = fixture("/");
        let a = create(&fx.service, "a", None).await;
        let Ok(updated) = fx
            .service
            .update(
                a.id,
                UpdateFolder {
                    is_published: Some(false),
                    ..UpdateFolder::default()
                },
            )
            .await
        else {
            panic!("update");
        };
        assert!(!updated.is_published);
        assert_eq!(updated.virtual_path, a.virtual_path);
    }

    #[tokio::test]
    async fn delete_removes_tree_and_rows() {
        let fx = fixture("/");
        let a = create(&fx.service, "a", None).await;
        create(&fx.service, "b", Some(a.id)).await;

        assert!(fx.service.delete(a.id).await.is_ok());
        assert_eq!(fx.catalog.folder_count().await, 0);
        assert!(!dir_exists(&a.storage_path).await);
        assert!(matches!(
            fx.service.delete(a.id).await,
            Err(StorageError::FolderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_children_and_unknown_parent() {
        let fx = fixture("/");
        let a = create(&fx.service, "a", None).await;
        create(&fx.service, "z", Some(a.id)).await;
        create(&fx.service, "m", Some(a.id)).await;

        let Ok(page) = fx.service.list(Some(a.id), PageRequest::default()).await else {
            panic!("list");
        };
        let names: Vec<&str> = page.items.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["m", "z"]);
        assert_eq!(page.total, 2);

        assert!(matches!(
            fx.service.list(Some(FolderId::new()), PageRequest::default()).await,
            Err(StorageError::FolderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn rejected_insert_removes_new_directory() {
        let (dir, catalog, service) = rejecting_fixture();
        catalog.reject_writes();

        let result = service
            .create(CreateFolder {
                name: name("docs"),
                parent_id: None,
                creator_user_id: Uuid::new_v4(),
                is_published: true,
            })
            .await;
        assert!(matches!(result, Err(StorageError::Conflict(_))));
        assert!(!dir_exists(&path_string(&dir.path().join("docs"))).await);
    }

    #[tokio::test]
    async fn rejected_update_restores_directory() {
        let (_dir, catalog, service) = rejecting_fixture();
        let docs = create(&service, "docs", None).await;
        let Ok(()) = tokio::fs::write(Path::new(&docs.storage_path).join("f.txt"), b"x").await
        else {
            panic!("write fixture");
        };
        catalog.reject_writes();

        let result = service
            .update(
                docs.id,
                UpdateFolder {
                    name: Some(name("papers")),
                    ..UpdateFolder::default()
                },
            )
            .await;
        assert!(matches!(result, Err(StorageError::Conflict(_))));
        assert!(dir_exists(&docs.storage_path).await);
        assert!(matches!(
            tokio::fs::try_exists(Path::new(&docs.storage_path).join("f.txt")).await,
            Ok(true)
        ));
        let renamed = Path::new(&docs.storage_path).with_file_name("papers");
        assert!(!dir_exists(&path_string(&renamed)).await);

        let Ok(unchanged) = service.get(docs.id).await else {
            panic!("get");
        };
        assert_eq!(unchanged.virtual_path, "/docs/");
    }
}
