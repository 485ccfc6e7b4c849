//! Folder entity and the inputs used to create or change one.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{EntryName, FolderId};

/// A folder row.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Folder {
    /// Primary key.
    pub id: FolderId,
    /// Display name, also the last virtual path segment.
    pub name: String,
    /// Absolute directory path on disk.
    pub storage_path: String,
    /// Canonical virtual path (`/a/b/`).
    pub virtual_path: String,
    /// User that created the folder.
    pub creator_user_id: Uuid,
    /// Containing folder, `None` at the root.
    pub parent_id: Option<FolderId>,
    /// Public URL, when one has been assigned.
    pub access_url: Option<String>,
    /// Visible to anonymous users.
    pub is_published: bool,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new folder row. Paths are computed by the service.
#[derive(Debug, Clone)]
pub struct NewFolder {
    /// Validated name.
    pub name: EntryName,
    /// Containing folder.
    pub parent_id: Option<FolderId>,
    /// Creating user.
    pub creator_user_id: Uuid,
    /// Visibility flag.
    pub is_published: bool,
    /// Directory path on disk.
    pub storage_path: String,
    /// Canonical virtual path.
    pub virtual_path: String,
}

/// Moves a folder subtree from one location to another.
///
/// Applied to the folder itself and, by prefix, to every descendant folder
/// and file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    /// Virtual path before the move.
    pub old_virtual_path: String,
    /// Virtual path after the move.
    pub new_virtual_path: String,
    /// Storage path before the move.
    pub old_storage_path: String,
    /// Storage path after the move.
    pub new_storage_path: String,
}

impl Relocation {
    /// Rewrites a descendant virtual path, if it lies under the old path.
    #[must_use]
    pub fn rebase_virtual(&self, path: &str) -> Option<String> {
        super::virtual_path::rebase(path, &self.old_virtual_path, &self.new_virtual_path)
    }

    /// Rewrites a descendant storage path, if it lies under the old path.
    #[must_use]
    pub fn rebase_storage(&self, path: &str) -> Option<String> {
        let old = format!("{}/", self.old_storage_path.trim_end_matches('/'));
        let new = format!("{}/", self.new_storage_path.trim_end_matches('/'));
        super::virtual_path::rebase(path, &old, &new)
    }
}

/// Partial update of a folder row. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct FolderChanges {
    /// New name.
    pub name: Option<EntryName>,
    /// New parent; `Some(None)` moves the folder to the root.
    pub parent_id: Option<Option<FolderId>>,
    /// New creator.
    pub creator_user_id: Option<Uuid>,
    /// New visibility.
    pub is_published: Option<bool>,
    /// Path rewrite for the folder and its subtree.
    pub relocation: Option<Relocation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relocation() -> Relocation {
        Relocation {
            old_virtual_path: "/a/".into(),
            new_virtual_path: "/b/a2/".into(),
            old_storage_path: "/srv/a".into(),
            new_storage_path: "/srv/b/a2".into(),
        }
    }

    #[test]
    fn rebases_descendants() {
        let r = relocation();
        assert_eq!(r.rebase_virtual("/a/x/"), Some("/b/a2/x/".to_string()));
        assert_eq!(
            r.rebase_storage("/srv/a/x/f.txt"),
            Some("/srv/b/a2/x/f.txt".to_string())
        );
    }

    #[test]
    fn storage_rebase_respects_segment_boundary() {
        let r = relocation();
        assert_eq!(r.rebase_storage("/srv/ab/f.txt"), None);
    }
}
