//! Service layer: business logic orchestration.
//!
//! [`FolderService`] and [`FileService`] keep the disk stores and the
//! metadata repositories consistent. Each multi-step operation performs
//! the disk step first and compensates when the repository step fails.

pub mod file_service;
pub mod folder_service;
#[cfg(test)]
mod rejecting;

pub use file_service::{FileService, UpdateFile, UploadRequest};
pub use folder_service::{CreateFolder, FolderService, UpdateFolder};
