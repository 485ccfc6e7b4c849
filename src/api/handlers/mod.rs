//! REST endpoint handlers organized by resource.

pub mod file;
pub mod folder;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes the folder and file routes.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .merge(folder::routes())
        .merge(file::routes(max_upload_bytes))
}
