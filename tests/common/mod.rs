//! Common test utilities - FakeBackend harness for end-to-end testing
//!
//! Serves the handful of Habits backend routes the client uses, on a random
//! local port, with shared state for setup and assertions.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use habits_combat::backend::BackendClient;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Backend data shared with request handlers
#[derive(Clone, Default)]
pub struct BackendState {
    pub characters: Arc<Mutex<HashMap<String, Value>>>,
    /// `None` makes `/enemies` return 500
    pub enemies: Arc<Mutex<Option<Value>>>,
    pub results: Arc<Mutex<Vec<(String, Value)>>>,
    pub token: Option<String>,
}

impl BackendState {
    fn authorized(&self, headers: &HeaderMap) -> bool {
        match &self.token {
            None => true,
            Some(token) => headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v == format!("Bearer {}", token)),
        }
    }
}

async fn get_character(
    State(state): State<BackendState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    if !state.authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let characters = state.characters.lock().unwrap();
    characters
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn get_enemies(State(state): State<BackendState>) -> Result<Json<Value>, StatusCode> {
    let enemies = state.enemies.lock().unwrap();
    enemies
        .clone()
        .map(Json)
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn post_result(
    State(state): State<BackendState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    if !state.authorized(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    state.results.lock().unwrap().push((id, body));
    StatusCode::CREATED
}

/// Test harness that serves a fake backend on a random port
pub struct FakeBackend {
    pub addr: SocketAddr,
    pub state: BackendState,
    handle: JoinHandle<()>,
}

impl FakeBackend {
    /// Start serving `state`
    pub async fn start(state: BackendState) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let router = Router::new()
            .route("/api/characters/{id}", get(get_character))
            .route("/api/characters/{id}/combat-results", post(post_result))
            .route("/api/enemies", get(get_enemies))
            .with_state(state.clone());

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                eprintln!("Fake backend error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    /// Base URL the client should be configured with
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Client pointed at this backend
    pub fn client(&self) -> BackendClient {
        BackendClient::new(
            &self.base_url(),
            self.state.token.clone(),
            Duration::from_secs(5),
        )
        .expect("Failed to build client")
    }

    pub fn add_character(&self, id: &str, snapshot: Value) {
        self.state
            .characters
            .lock()
            .unwrap()
            .insert(id.to_string(), snapshot);
    }

    pub fn set_enemies(&self, enemies: Option<Value>) {
        *self.state.enemies.lock().unwrap() = enemies;
    }

    pub fn results(&self) -> Vec<(String, Value)> {
        self.state.results.lock().unwrap().clone()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
