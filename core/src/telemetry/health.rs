//! Ambient `/health` + `/metrics` HTTP endpoint. The dashboard/gateway
//! that actually renders telemetry is an external collaborator; this is
//! just the liveness/readiness surface an orchestrator polls. Grounded in
//! `backend-rust/src/main.rs`'s `health_check` handler and router setup.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::clock::Clock;
use super::TelemetryAggregator;

#[derive(Clone)]
struct HealthState {
    aggregator: Arc<TelemetryAggregator>,
    clock: Clock,
}

async fn health_check(State(state): State<HealthState>) -> Json<serde_json::Value> {
    let snapshot = state.aggregator.snapshot(&state.clock).await;
    let status = if snapshot.safety.overall_safe && !snapshot.emergency.active { "ok" } else { "degraded" };
    Json(json!({
        "status": status,
        "version": env!("CARGO_PKG_VERSION"),
        "uptimeSecs": snapshot.uptime_s,
        "safetyLevel": snapshot.safety.level,
        "emergencyActive": snapshot.emergency.active,
    }))
}

async fn metrics(State(state): State<HealthState>) -> Json<serde_json::Value> {
    let snapshot = state.aggregator.snapshot(&state.clock).await;
    Json(json!({
        "uptime_s": snapshot.uptime_s,
        "overall_safe": snapshot.safety.overall_safe,
        "alert_level": snapshot.safety.level,
        "active_alerts": snapshot.safety.active_alerts.len(),
        "obstacle_count": snapshot.obstacles.total,
        "max_obstacle_threat": snapshot.obstacles.max_threat,
        "active_lockouts": snapshot.lockouts.len(),
        "emergency_active": snapshot.emergency.active,
    }))
}

/// Serves `/health` and `/metrics` on `port` until the process exits.
pub async fn serve(aggregator: Arc<TelemetryAggregator>, clock: Clock, port: u16) -> std::io::Result<()> {
    let state = HealthState { aggregator, clock };
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    info!(%addr, "health endpoint listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await
}
