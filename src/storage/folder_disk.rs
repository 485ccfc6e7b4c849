//! Directory operations for folders.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::domain::virtual_path;
use crate::error::StorageError;

/// Creates, renames and removes folder directories under a base path.
#[derive(Debug, Clone)]
pub struct FolderDisk {
    base_path: PathBuf,
}

impl FolderDisk {
    /// Creates a folder store rooted at `base_path`.
    #[must_use]
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Maps a virtual folder path to its directory on disk.
    #[must_use]
    pub fn storage_path_for(&self, virtual_path: &str) -> PathBuf {
        virtual_path::physical_path(&self.base_path, virtual_path)
    }

    /// Creates `path` and any missing parents. The leaf must not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FolderAlreadyExists`] if the leaf exists, or
    /// [`StorageError::Filesystem`] on other I/O failures.
    pub async fn create_folder(&self, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        match tokio::fs::create_dir(path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => Err(
                StorageError::FolderAlreadyExists(path.display().to_string()),
            ),
            Err(err) => Err(err.into()),
        }
    }

    /// Removes `path` recursively. A missing directory is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Filesystem`] if removal fails.
    pub async fn delete_folder(&self, path: &Path) -> Result<(), StorageError> {
        match tokio::fs::remove_dir_all(path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Moves a directory, creating the destination's parent if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Conflict`] if `new_path` already exists, or
    /// [`StorageError::Filesystem`] if the rename fails.
    pub async fn rename_folder(
        &self,
        old_path: &Path,
        new_path: &Path,
    ) -> Result<(), StorageError> {
        if tokio::fs::try_exists(new_path).await? {
            return Err(StorageError::Conflict(format!(
                "target directory already exists: {}",
                new_path.display()
            )));
        }
        if let Some(parent) = new_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::rename(old_path, new_path).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn tempdir() -> tempfile::TempDir {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir");
        };
        dir
    }

    async fn is_dir(path: &Path) -> bool {
        matches!(tokio::fs::metadata(path).await, Ok(meta) if meta.is_dir())
    }

    #[test]
    fn storage_path_follows_virtual_segments() {
        let disk = FolderDisk::new("/srv/data");
        assert_eq!(
            disk.storage_path_for("/docs/2024/"),
            PathBuf::from("/srv/data/docs/2024")
        );
    }

    #[tokio::test]
    async fn create_then_create_again_conflicts() {
        let dir = tempdir();
        let disk = FolderDisk::new(dir.path());
        let path = disk.storage_path_for("/a/b/");

        assert!(disk.create_folder(&path).await.is_ok());
        assert!(is_dir(&path).await);
        assert!(matches!(
            disk.create_folder(&path).await,
            Err(StorageError::FolderAlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn delete_is_recursive_and_idempotent() {
        let dir = tempdir();
        let disk = FolderDisk::new(dir.path());
        let path = disk.storage_path_for("/a/");
        let Ok(()) = disk.create_folder(&path.join("inner")).await else {
            panic!("create");
        };
        let Ok(()) = tokio::fs::write(path.join("inner").join("f.txt"), b"x").await else {
            panic!("write fixture");
        };

        assert!(disk.delete_folder(&path).await.is_ok());
        assert!(!is_dir(&path).await);
        assert!(disk.delete_folder(&path).await.is_ok());
    }

    #[tokio::test]
    async fn rename_moves_contents_and_refuses_overwrite() {
        let dir = tempdir();
        let disk = FolderDisk::new(dir.path());
        let old = disk.storage_path_for("/a/");
        let new = disk.storage_path_for("/b/c/");
        let Ok(()) = disk.create_folder(&old).await else {
            panic!("create");
        };
        let Ok(()) = tokio::fs::write(old.join("f.txt"), b"x").await else {
            panic!("write fixture");
        };

        assert!(disk.rename_folder(&old, &new).await.is_ok());
        assert!(matches!(tokio::fs::try_exists(new.join("f.txt")).await, Ok(true)));

        let Ok(()) = disk.create_folder(&old).await else {
            panic!("recreate");
        };
        assert!(matches!(
            disk.rename_folder(&old, &new).await,
            Err(StorageError::Conflict(_))
        ));
    }
}
