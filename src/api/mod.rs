//! API layer - HTTP endpoint handlers.

mod health;
mod metrics;
mod render;
mod response;
mod routes;
mod template;

pub use health::{health, HealthResponse};
pub use metrics::prometheus_metrics;
pub use render::render_template;
pub use response::{ApiResponse, ApiResult};
pub use routes::api_routes;
pub use template::{
    add_version, create_template, delete_template, get_template, get_version, list_templates,
    list_versions, update_template,
};
