//! Shared helpers for API integration tests.
//!
//! The router is built with [`build_app_router`] over an in-memory state
//! store and scripted collaborators, so no database or network is needed.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chaincast_api::config::ServerConfig;
use chaincast_api::router::build_app_router;
use chaincast_api::state::AppState;
use chaincast_core::catalog::{Catalog, ContentUnit};
use chaincast_core::cursor::RateLimitPolicy;
use chaincast_core::memory_store::MemoryStateStore;
use chaincast_core::ports::{
    ContentGenerator, GenerationError, GenerationRequest, PublishError, Publisher,
};
use chaincast_pipeline::retry::RetryPolicy;
use chaincast_pipeline::{Dispatcher, DispatcherConfig};
use http_body_util::BodyExt;
use tower::ServiceExt;

pub const BOT: &str = "api-test-bot";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        cron_secret: None,
        json_logs: false,
    }
}

pub fn catalog_abc() -> Arc<Catalog> {
    let units = ["Alpha", "Beta", "Gamma"]
        .iter()
        .map(|name| {
            ContentUnit::new(
                *name,
                format!("{}.xyz", name.to_lowercase()),
                format!("@{name}"),
                format!("{name} protocol"),
                "DeFi",
            )
        })
        .collect();
    Arc::new(Catalog::new(units).unwrap())
}

pub fn dispatcher_config(limit: u32) -> DispatcherConfig {
    let policy = RateLimitPolicy::new(limit, chrono::Duration::hours(1)).unwrap();
    let mut config = DispatcherConfig::new(BOT, policy);
    config.retry = RetryPolicy {
        timeout: Duration::from_secs(2),
        backoff: Duration::from_millis(1),
        max_attempts: 2,
    };
    config.thread_delay = Duration::ZERO;
    config.dispatch_budget = config.min_dispatch_budget();
    config
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Returns a fixed sentence about the requested unit, or a scripted error.
#[derive(Default)]
pub struct ScriptedGenerator {
    pub failure: Mutex<Option<GenerationError>>,
}

impl ScriptedGenerator {
    pub fn failing(err: GenerationError) -> Self {
        Self {
            failure: Mutex::new(Some(err)),
        }
    }
}

#[async_trait]
impl ContentGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }
        let unit = &request.unit;
        Ok(format!(
            "{} keeps shipping while others talk, and {} deserves a closer look from anyone \
             following {} this month.",
            unit.name, unit.handle, unit.category
        ))
    }
}

#[derive(Default)]
pub struct ScriptedPublisher {
    pub failure: Mutex<Option<PublishError>>,
    pub next_id: AtomicU64,
}

impl ScriptedPublisher {
    pub fn failing(err: PublishError) -> Self {
        Self {
            failure: Mutex::new(Some(err)),
            ..Self::default()
        }
    }
}

#[async_trait]
impl Publisher for ScriptedPublisher {
    async fn post_segment(
        &self,
        _text: &str,
        _in_reply_to: Option<&str>,
    ) -> Result<String, PublishError> {
        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }
        Ok((self.next_id.fetch_add(1, Ordering::SeqCst) + 9000).to_string())
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStateStore>,
}

impl TestApp {
    /// A fresh router over the same state; `oneshot` consumes the router.
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

pub fn build_test_app_with(
    server: ServerConfig,
    limit: u32,
    generator: ScriptedGenerator,
    publisher: ScriptedPublisher,
) -> TestApp {
    let store = Arc::new(MemoryStateStore::new());
    let dispatcher = Dispatcher::new(
        catalog_abc(),
        store.clone(),
        Arc::new(generator),
        Arc::new(publisher),
        dispatcher_config(limit),
    );
    let state = AppState {
        dispatcher: Arc::new(dispatcher),
        config: Arc::new(server.clone()),
    };
    TestApp {
        router: build_app_router(state, &server),
        store,
    }
}

pub fn build_test_app() -> TestApp {
    build_test_app_with(
        test_config(),
        1,
        ScriptedGenerator::default(),
        ScriptedPublisher::default(),
    )
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn send(app: Router, method: Method, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri).await
}

pub async fn post(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::POST, uri).await
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

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
