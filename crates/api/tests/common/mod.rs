#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use jigprint_api::config::ServerConfig;
use jigprint_api::router::build_app_router;
use jigprint_api::state::AppState;
use jigprint_api::storage::AssetStorage;

/// A `ServerConfig` with test defaults, storing files under `root`.
pub fn test_config(root: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        max_body_bytes: 10 * 1024 * 1024,
        upload_dir: root.join("uploads"),
        composed_dir: root.join("composed"),
        template_dir: root.join("templates"),
        printer_offline_after: Duration::from_secs(90),
        liveness_sweep_interval: Duration::from_secs(30),
    }
}

/// The production router over `pool`, with storage under `root`.
pub fn build_test_app_in(pool: PgPool, root: &Path) -> Router {
    let config = test_config(root);
    let state = AppState {
        pool,
        storage: Arc::new(AssetStorage::from_config(&config)),
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

/// The production router over `pool`, for tests that never touch files.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_in(pool, &std::env::temp_dir().join("jigprint-api-tests"))
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, Body::empty()).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send_json(app, Method::POST, uri, None, body).await
}

pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send_json(app, Method::PUT, uri, None, body).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, None, Body::empty()).await
}

/// GET with a printer agent key.
pub async fn agent_get(app: Router, uri: &str, key: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(key), Body::empty()).await
}

/// POST JSON with a printer agent key.
pub async fn agent_post(
    app: Router,
    uri: &str,
    key: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send_json(app, Method::POST, uri, Some(key), body).await
}

/// POST a single-file multipart form with the field name `file`.
pub async fn post_file(app: Router, uri: &str, filename: &str, data: &[u8]) -> Response<Body> {
    let boundary = "jigprint-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

async fn send_json(
    app: Router,
    method: Method,
    uri: &str,
    key: Option<&str>,
    body: serde_json::Value,
) -> Response<Body> {
    send(
        app,
        method,
        uri,
        key,
        Body::from(serde_json::to_vec(&body).unwrap()),
    )
    .await
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    key: Option<&str>,
    body: Body,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(key) = key {
        builder = builder.header("x-api-key", key);
    }
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}
