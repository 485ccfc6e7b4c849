//! Data Transfer Objects for REST request/response serialization.
//!
//! Domain ids serialize as bare UUID strings; timestamps as RFC 3339.

pub mod common_dto;
pub mod file_dto;
pub mod folder_dto;

pub use common_dto::*;
pub use file_dto::*;
pub use folder_dto::*;
