#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use imgbatch_api::config::ServerConfig;
use imgbatch_api::router::build_app_router;
use imgbatch_api::state::AppState;
use imgbatch_db::Ledger;
use imgbatch_events::EventBus;
use imgbatch_pipeline::{FetchError, Fetcher, FsArtifactStore, Pipeline, TransformError, Transformer};
use imgbatch_worker::PipelineRunner;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(output_dir: &TempDir) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_secs: 30,
        fetch_timeout_secs: 2,
        output_dir: output_dir.path().to_path_buf(),
        ..ServerConfig::default()
    }
}

/// Serves a fixed payload after a short delay. URLs containing `fail`
/// answer with a 404.
pub struct StubFetcher;

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        if url.contains("fail") {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: 404,
            });
        }
        Ok(format!("image bytes for {url}").into_bytes())
    }
}

/// Leaves the bytes untouched.
pub struct IdentityTransformer;

#[async_trait]
impl Transformer for IdentityTransformer {
    async fn transform(&self, bytes: Vec<u8>) -> Result<Vec<u8>, TransformError> {
        Ok(bytes)
    }
}

/// A running app plus the handles tests inspect behind its back.
pub struct TestApp {
    pub router: Router,
    pub ledger: Arc<Ledger>,
    pub output: TempDir,
}

/// Build the full application router with the production middleware stack,
/// a stubbed network, and a real artifact store under a temp directory.
pub fn build_test_app() -> TestApp {
    build_test_app_with(|_| {})
}

/// Like [`build_test_app`], letting the caller adjust the configuration.
pub fn build_test_app_with(adjust: impl FnOnce(&mut ServerConfig)) -> TestApp {
    let output = TempDir::new().unwrap();
    let mut config = test_config(&output);
    adjust(&mut config);

    let pipeline = Pipeline::new(
        Arc::new(StubFetcher),
        Arc::new(IdentityTransformer),
        Arc::new(FsArtifactStore::new(output.path())),
    );
    let runner = Arc::new(PipelineRunner::new(
        pipeline,
        Duration::from_secs(config.fetch_timeout_secs),
    ));
    let ledger = Arc::new(Ledger::in_memory());

    let state = AppState::new(
        config.clone(),
        Arc::clone(&ledger),
        runner,
        Arc::new(EventBus::default()),
    );
    let router = build_app_router(state, &config);

    TestApp {
        router,
        ledger,
        output,
    }
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    post_raw(app, uri, body.to_string()).await
}

pub async fn post_raw(app: Router, uri: &str, body: impl Into<Body>) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
