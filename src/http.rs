//! HTTP surface for the store commands
//!
//! Endpoints:
//! - `GET  /health`  - liveness and crate version
//! - `GET  /stats`   - stored rows and reserved-key presence
//! - `POST /context` - upload serialized context and public keys
//! - `POST /entry`   - upload one serialized (key, value) row
//! - `POST /lookup`  - encrypted lookup, returns one serialized ciphertext
//!
//! Byte fields travel as JSON arrays, so request bodies are accepted up to
//! [`MAX_BODY_BYTES`]. Failures are `{ "error": ... }` with 400 for malformed
//! input, 404 when the context has not been uploaded and 500 for store
//! failures. A snapshot write that fails after an upload was applied is
//! reported in `snapshot_error` of an otherwise successful response.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::LookupError;
use crate::metrics::Timings;
use crate::store::{FheCommands, MemoryStore, StoreStats};
use crate::table::SerializedEntry;

/// Largest accepted request body
///
/// Public key bundles for the demo preset run to several megabytes once
/// encoded as JSON arrays.
pub const MAX_BODY_BYTES: usize = 128 * 1024 * 1024;

/// Shared server state
pub struct ServerState {
    commands: FheCommands<MemoryStore>,
    snapshot: Option<PathBuf>,
}

impl ServerState {
    /// `snapshot`, when set, is rewritten after every successful upload
    pub fn new(store: MemoryStore, snapshot: Option<PathBuf>) -> Self {
        Self {
            commands: FheCommands::new(store),
            snapshot,
        }
    }

    pub fn commands(&self) -> &FheCommands<MemoryStore> {
        &self.commands
    }

    /// Rewrite the snapshot, returning the failure instead of raising it
    ///
    /// The upload is already in the store at this point; failing the request
    /// would tell the client nothing was written.
    fn persist(&self) -> Option<String> {
        let path = self.snapshot.as_ref()?;
        match self.commands.store().save_snapshot(path) {
            Ok(()) => None,
            Err(e) => {
                warn!("Snapshot write to {} failed: {}", path.display(), e);
                Some(e.to_string())
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContextRequest {
    pub context: Vec<u8>,
    pub public_keys: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LookupRequest {
    pub query: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LookupResponse {
    pub response: Vec<u8>,
    pub processing_time_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_error: Option<String>,
}

impl StatusResponse {
    fn ok(snapshot_error: Option<String>) -> Self {
        Self {
            status: "OK".to_string(),
            snapshot_error,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(err: LookupError) -> ApiError {
    let status = match &err {
        LookupError::MissingReservedKey(_) => StatusCode::NOT_FOUND,
        LookupError::Params(_)
        | LookupError::Codec(_)
        | LookupError::Table { .. }
        | LookupError::Serialization(_)
        | LookupError::ReservedKey(_) => StatusCode::BAD_REQUEST,
        LookupError::Fhe(_)
        | LookupError::Backend(_)
        | LookupError::Store(_)
        | LookupError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

fn internal_error(msg: String) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse { error: msg }),
    )
}

/// Run a store command on the blocking pool
async fn blocking<T, F>(state: Arc<ServerState>, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&ServerState) -> crate::error::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| internal_error(format!("worker failed: {}", e)))?
        .map_err(api_error)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn get_stats(State(state): State<Arc<ServerState>>) -> Result<Json<StoreStats>, ApiError> {
    state.commands.stats().map(Json).map_err(api_error)
}

async fn set_context(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<ContextRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let snapshot_error = blocking(state, move |s| {
        s.commands.set_public_context(&req.context, &req.public_keys)?;
        Ok(s.persist())
    })
    .await?;
    Ok(Json(StatusResponse::ok(snapshot_error)))
}

async fn set_entry(
    State(state): State<Arc<ServerState>>,
    Json(entry): Json<SerializedEntry>,
) -> Result<Json<StatusResponse>, ApiError> {
    let snapshot_error = blocking(state, move |s| {
        s.commands.set_entry(&entry.key, &entry.value)?;
        Ok(s.persist())
    })
    .await?;
    Ok(Json(StatusResponse::ok(snapshot_error)))
}

async fn handle_lookup(
    State(state): State<Arc<ServerState>>,
    Json(req): Json<LookupRequest>,
) -> Result<Json<LookupResponse>, ApiError> {
    let start = Instant::now();

    let (response, timings) = blocking(state, move |s| {
        let mut timings = Timings::new();
        let response = s.commands.lookup_timed(&req.query, &mut timings)?;
        Ok((response, timings))
    })
    .await
    .map_err(|e| {
        warn!("Lookup failed: {}", e.1.error);
        e
    })?;

    let processing_time_ms = start.elapsed().as_millis() as u64;
    info!(
        "Lookup served in {} ms (load {:?}, respond {:?})",
        processing_time_ms,
        timings.get("load").unwrap_or_default(),
        timings.get("respond").unwrap_or_default()
    );

    Ok(Json(LookupResponse {
        response,
        processing_time_ms,
    }))
}

/// Router with every endpoint bound to `state`
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(get_stats))
        .route("/context", post(set_context))
        .route("/entry", post(set_entry))
        .route("/lookup", post(handle_lookup))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Thin client for the endpoints above
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub async fn health(&self) -> eyre::Result<HealthResponse> {
        let resp = self.http.get(self.url("/health")).send().await?;
        Self::parse(resp).await
    }

    pub async fn stats(&self) -> eyre::Result<StoreStats> {
        let resp = self.http.get(self.url("/stats")).send().await?;
        Self::parse(resp).await
    }

    pub async fn set_context(
        &self,
        context: Vec<u8>,
        public_keys: Vec<u8>,
    ) -> eyre::Result<StatusResponse> {
        let body = ContextRequest {
            context,
            public_keys,
        };
        let resp = self.http.post(self.url("/context")).json(&body).send().await?;
        Self::parse(resp).await
    }

    pub async fn set_entry(&self, entry: &SerializedEntry) -> eyre::Result<StatusResponse> {
        let resp = self.http.post(self.url("/entry")).json(entry).send().await?;
        Self::parse(resp).await
    }

    pub async fn lookup(&self, query: Vec<u8>) -> eyre::Result<LookupResponse> {
        let resp = self
            .http
            .post(self.url("/lookup"))
            .json(&LookupRequest { query })
            .send()
            .await?;
        Self::parse(resp).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn parse<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> eyre::Result<T> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json().await?);
        }
        let error = match resp.json::<ErrorResponse>().await {
            Ok(body) => body.error,
            Err(_) => "no error body".to_string(),
        };
        Err(eyre::eyre!("server returned {}: {}", status, error))
    }
}
