//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub store: StoreHealthResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postgres: Option<PostgresHealthResponse>,
}

#[derive(Debug, Serialize)]
pub struct StoreHealthResponse {
    pub backend: String,
    pub available: bool,
    pub templates: usize,
    pub active_templates: usize,
    pub versions: usize,
}

#[derive(Debug, Serialize)]
pub struct PostgresHealthResponse {
    pub pool_size: u32,
    pub idle_connections: u32,
}

/// GET /health - Liveness plus store statistics
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.service.store();
    let uptime_seconds = state.start_time.elapsed().as_secs();

    let (status, store_health) = match store.stats().await {
        Ok(stats) => (
            "healthy",
            StoreHealthResponse {
                backend: stats.backend_type,
                available: true,
                templates: stats.templates,
                active_templates: stats.active_templates,
                versions: stats.versions,
            },
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Store statistics unavailable");
            (
                "degraded",
                StoreHealthResponse {
                    backend: store.backend_name().to_string(),
                    available: false,
                    templates: 0,
                    active_templates: 0,
                    versions: 0,
                },
            )
        }
    };

    let postgres = state.postgres_pool.as_ref().map(|pool| {
        let inner_pool = pool.pool();
        PostgresHealthResponse {
            pool_size: inner_pool.size(),
            idle_connections: inner_pool.num_idle() as u32,
        }
    });

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        store: store_health,
        postgres,
    })
}
