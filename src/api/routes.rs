use axum::{
    routing::{get, post},
    Router,
};

use crate::server::AppState;

use super::health::health;
use super::metrics::prometheus_metrics;
use super::render::render_template;
use super::template::{
    add_version, create_template, delete_template, get_template, get_version, list_templates,
    list_versions, update_template,
};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health & Metrics
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
        // Template registry (collection also reachable with a trailing slash)
        .route("/api/v1/templates/", post(create_template).get(list_templates))
        .nest(
            "/api/v1/templates",
            Router::new()
                .route("/", post(create_template).get(list_templates))
                .route("/render", post(render_template))
                .route(
                    "/{code}",
                    get(get_template)
                        .patch(update_template)
                        .put(add_version)
                        .delete(delete_template),
                )
                .route("/{code}/versions", get(list_versions))
                .route("/{code}/versions/{version_number}", get(get_version)),
        )
}
