//! # virtual-storage
//!
//! REST service for a virtual folder tree and the files uploaded into it.
//!
//! Folder and file metadata live in PostgreSQL; content lives on the local
//! filesystem under a configurable root, laid out to mirror each folder's
//! virtual path. Every mutation keeps both sides in step and undoes the
//! disk step if the database rejects the change.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── FolderService / FileService (service/)
//!     │
//!     ├── Repositories (persistence/)   PostgreSQL, in-memory for tests
//!     ├── Disk stores (storage/)        STORAGE_BASE_PATH
//!     │
//!     └── Domain types (domain/)        ids, names, virtual paths, pages
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod persistence;
pub mod service;
pub mod storage;
