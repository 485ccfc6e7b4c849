//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Folder and file endpoints live at the root (`/folders`, `/files`); the
//! health check is `/v1/healthcheck`. With the `swagger-ui` feature the
//! interactive docs are served at `/api/docs`.

pub mod dto;
pub mod handlers;
pub mod openapi;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Builds the API router with all REST endpoints.
pub fn build_router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .merge(handlers::routes(max_upload_bytes))
        .merge(handlers::system::routes())
}

/// Builds the complete application: routes, docs, tracing and CORS layers,
/// bound to `state`.
pub fn build_app(state: AppState, max_upload_bytes: usize) -> Router {
    let router = build_router(max_upload_bytes);

    #[cfg(feature = "swagger-ui")]
    let router = {
        use utoipa::OpenApi;
        router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/api/docs")
                .url("/api/openapi.json", openapi::ApiDoc::openapi()),
        )
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
