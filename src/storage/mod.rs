//! Disk layer: physical folders and file content under the storage root.
//!
//! All operations go through `tokio::fs` so the runtime is never blocked.
//! Nothing here touches the database; services keep disk and metadata in
//! step.

pub mod file_disk;
pub mod folder_disk;

pub use file_disk::{FileDisk, StagedUpload, UploadWriter};
pub use folder_disk::FolderDisk;
