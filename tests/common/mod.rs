//! Shared fixtures for the HTTP-level test suites.

#![allow(dead_code, clippy::panic)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use virtual_storage::api;
use virtual_storage::app_state::AppState;
use virtual_storage::config::StorageConfig;
use virtual_storage::persistence::memory::MemoryCatalog;

/// Multipart boundary used by [`multipart_body`].
pub const BOUNDARY: &str = "----virtual-storage-test-boundary";

/// Router over an in-memory catalog and a temporary storage root.
pub struct TestApp {
    /// Owns the storage root for the lifetime of the test.
    pub dir: tempfile::TempDir,
    /// Backing metadata store.
    pub catalog: Arc<MemoryCatalog>,
    /// Effective configuration.
    pub config: StorageConfig,
    /// Fully layered application router.
    pub router: Router,
}

/// A buffered response.
pub struct TestResponse {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl TestResponse {
    /// Parses the body as JSON.
    pub fn json(&self) -> Value {
        match serde_json::from_slice(&self.body) {
            Ok(value) => value,
            Err(err) => panic!(
                "body is not JSON ({err}): {}",
                String::from_utf8_lossy(&self.body)
            ),
        }
    }

    /// Numeric error code from an error body.
    pub fn error_code(&self) -> u64 {
        self.json()["error"]["code"].as_u64().unwrap_or_default()
    }
}

/// Builds an app with default settings plus `overrides`.
pub fn test_app(overrides: &[(&str, &str)]) -> TestApp {
    let Ok(dir) = tempfile::tempdir() else {
        panic!("tempdir");
    };
    let base = dir.path().join("storage");
    let mut env: HashMap<String, String> = HashMap::from([
        ("STORAGE_BASE_PATH".to_string(), base.display().to_string()),
        ("LISTEN_ADDR".to_string(), "127.0.0.1:0".to_string()),
    ]);
    for (key, value) in overrides {
        env.insert((*key).to_string(), (*value).to_string());
    }
    let config = match StorageConfig::from_lookup(|key| env.get(key).cloned()) {
        Ok(config) => config,
        Err(err) => panic!("config: {err}"),
    };

    let catalog = Arc::new(MemoryCatalog::new());
    let state = AppState::new(&config, Arc::<MemoryCatalog>::clone(&catalog), Arc::<MemoryCatalog>::clone(&catalog));
    let router = api::build_app(state, config.max_upload_bytes);
    TestApp {
        dir,
        catalog,
        config,
        router,
    }
}

impl TestApp {
    /// Sends a request through the router and buffers the response.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let Ok(response) = self.router.clone().oneshot(request).await;
        let status = response.status();
        let headers = response.headers().clone();
        let Ok(body) = axum::body::to_bytes(response.into_body(), usize::MAX).await else {
            panic!("read body");
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Sends a bodiless request.
    pub async fn call(&self, method: Method, uri: &str) -> TestResponse {
        self.send(request(method, uri, None, Body::empty())).await
    }

    /// Sends a JSON request.
    pub async fn call_json(&self, method: Method, uri: &str, body: &Value) -> TestResponse {
        self.send(request(
            method,
            uri,
            Some("application/json"),
            Body::from(body.to_string()),
        ))
        .await
    }

    /// Creates a folder through the API and returns its JSON.
    pub async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Value {
        let body = serde_json::json!({
            "name": name,
            "parent_id": parent_id,
            "creator_user_id": Uuid::new_v4(),
        });
        let response = self.call_json(Method::POST, "/folders", &body).await;
        assert_eq!(response.status, StatusCode::CREATED, "create folder {name}");
        response.json()
    }

    /// Uploads `content` as `file_name` into `folder_path`.
    pub async fn upload(&self, folder_path: &str, file_name: &str, content: &[u8]) -> TestResponse {
        let body = multipart_body(&[
            Part::File {
                name: "file",
                file_name,
                content,
            },
            Part::Text {
                name: "uploader_user_id",
                value: &Uuid::new_v4().to_string(),
            },
            Part::Text {
                name: "folder_path",
                value: folder_path,
            },
        ]);
        self.send(multipart_request(body)).await
    }
}

/// Builds a request, panicking on an invalid URI.
pub fn request(method: Method, uri: &str, content_type: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }
    match builder.body(body) {
        Ok(request) => request,
        Err(err) => panic!("request {uri}: {err}"),
    }
}

/// Wraps a multipart body in a `POST /files/upload` request.
pub fn multipart_request(body: Vec<u8>) -> Request<Body> {
    request(
        Method::POST,
        "/files/upload",
        Some(&format!("multipart/form-data; boundary={BOUNDARY}")),
        Body::from(body),
    )
}

/// One multipart form part.
pub enum Part<'a> {
    /// A plain text field.
    Text {
        /// Field name.
        name: &'a str,
        /// Field value.
        value: &'a str,
    },
    /// A file field.
    File {
        /// Field name.
        name: &'a str,
        /// Client-side file name.
        file_name: &'a str,
        /// File content.
        content: &'a [u8],
    },
}

/// Encodes `parts` as `multipart/form-data` with [`BOUNDARY`].
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut out = Vec::new();
    for part in parts {
        out.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text { name, value } => {
                out.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                out.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content,
            } => {
                out.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                out.extend_from_slice(content);
            }
        }
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    out
}

/// Extracts a string field from a JSON object.
pub fn str_field<'a>(value: &'a Value, field: &str) -> &'a str {
    match value[field].as_str() {
        Some(s) => s,
        None => panic!("missing string field {field} in {value}"),
    }
}
