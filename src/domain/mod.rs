//! Domain layer: identifiers, validated names, entities and path rules.
//!
//! Everything here is storage-agnostic. Repositories persist these types and
//! services compose them; neither the HTTP layer nor the database leaks in.

pub mod file;
pub mod folder;
pub mod ids;
pub mod name;
pub mod page;
pub mod virtual_path;

pub use file::{DownloadInfo, FileChanges, NewFile, StoredFile};
pub use folder::{Folder, FolderChanges, NewFolder, Relocation};
pub use ids::{FileId, FolderId};
pub use name::EntryName;
pub use page::{Page, PageRequest};
