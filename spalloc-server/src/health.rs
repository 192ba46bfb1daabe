//! The minimal health/readiness surface (spec §4.8's note: no REST API is
//! implemented here, but the binary needs to be runnable and inspectable).

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use spalloc_store::Store;

#[derive(Clone)]
pub struct HealthState {
    pub store: Store,
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/healthz", get(healthz)).route("/readyz", get(readyz)).with_state(state)
}

async fn healthz() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

/// Ready only once a trivial query against the pool succeeds.
async fn readyz(State(state): State<HealthState>) -> (StatusCode, Json<HealthBody>) {
    match sqlx::query("SELECT 1").execute(state.store.pool()).await {
        Ok(_) => (StatusCode::OK, Json(HealthBody { status: "ready" })),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, Json(HealthBody { status: "not ready" })),
    }
}
