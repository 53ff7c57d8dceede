use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{net::TcpListener, sync::broadcast};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{info, warn};

use crate::{
    engine::Engine,
    scenario::{Scenario, ScenarioError},
    snapshot::Snapshot,
    world::TickRecord,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("simulation not initialized; call /api/simulation/reset first")]
    NotInitialized,
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error("simulation failed: {0}")]
    Engine(anyhow::Error),
    #[error("engine state lock poisoned")]
    Poisoned,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::NotInitialized | ApiError::Scenario(_) => StatusCode::BAD_REQUEST,
            ApiError::Engine(_) | ApiError::Poisoned => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Clone)]
pub struct AppState {
    engine: Arc<Mutex<Option<Engine>>>,
    broadcaster: broadcast::Sender<String>,
}

impl AppState {
    pub fn new(engine: Option<Engine>) -> Self {
        let (broadcaster, _) = broadcast::channel::<String>(256);
        Self {
            engine: Arc::new(Mutex::new(engine)),
            broadcaster,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Engine>>, ApiError> {
        self.engine.lock().map_err(|_| ApiError::Poisoned)
    }

    fn publish(&self, snapshot: &Snapshot) {
        if let Ok(payload) = serde_json::to_string(snapshot) {
            // No subscribers is not an error.
            let _ = self.broadcaster.send(payload);
        }
    }
}

pub struct WebServerConfig {
    pub scenario: Option<Scenario>,
    pub host: String,
    pub port: u16,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/simulation/reset", post(reset))
        .route("/api/simulation/step", post(step))
        .route("/api/simulation/state", get(current_state))
        .route("/api/simulation/history", get(history))
        .route("/api/events", get(stream_events))
        .with_state(state)
}

pub async fn run(config: WebServerConfig) -> Result<()> {
    let WebServerConfig {
        scenario,
        host,
        port,
    } = config;

    let engine = scenario
        .as_ref()
        .map(Engine::from_scenario)
        .transpose()
        .context("initial scenario is invalid")?;
    let state = AppState::new(engine);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(target: "sim.web", %addr, "simulation API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!(target: "sim.web", "shutting down");
}

async fn reset(
    State(state): State<AppState>,
    Json(scenario): Json<Scenario>,
) -> Result<Json<Snapshot>, ApiError> {
    let engine = Engine::from_scenario(&scenario).map_err(|err| {
        warn!(target: "sim.web", %err, "rejected scenario");
        err
    })?;
    let snapshot = engine.snapshot();
    *state.lock()? = Some(engine);
    info!(target: "sim.web", scenario = %scenario.name, "simulation reset");
    state.publish(&snapshot);
    Ok(Json(snapshot))
}

/// Upper bound on ticks run by one step request: one simulated day at the
/// default resolution.
pub const MAX_STEPS_PER_REQUEST: u64 = 1_440;

#[derive(Debug, Deserialize)]
struct StepParams {
    steps: Option<u64>,
}

async fn step(
    State(state): State<AppState>,
    Query(params): Query<StepParams>,
) -> Result<Json<Snapshot>, ApiError> {
    let steps = params.steps.unwrap_or(1).clamp(1, MAX_STEPS_PER_REQUEST);
    let engine = state.engine.clone();
    let snapshot = tokio::task::spawn_blocking(move || -> Result<Snapshot, ApiError> {
        let mut guard = engine.lock().map_err(|_| ApiError::Poisoned)?;
        let engine = guard.as_mut().ok_or(ApiError::NotInitialized)?;
        engine.advance(steps).map_err(ApiError::Engine)?;
        Ok(engine.snapshot())
    })
    .await
    .map_err(|err| ApiError::Engine(err.into()))??;
    state.publish(&snapshot);
    Ok(Json(snapshot))
}

async fn current_state(State(state): State<AppState>) -> Result<Json<Snapshot>, ApiError> {
    let guard = state.lock()?;
    let engine = guard.as_ref().ok_or(ApiError::NotInitialized)?;
    Ok(Json(engine.snapshot()))
}

async fn history(State(state): State<AppState>) -> Result<Json<Vec<TickRecord>>, ApiError> {
    let guard = state.lock()?;
    let engine = guard.as_ref().ok_or(ApiError::NotInitialized)?;
    Ok(Json(engine.history().to_vec()))
}

async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.broadcaster.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok(Event::default().data(payload))),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(2))
            .text("keep-alive"),
    )
}
