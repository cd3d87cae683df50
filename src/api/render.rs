//! Render endpoint.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::server::AppState;
use crate::telemetry::attributes;
use crate::template::{RenderInput, RenderOutput};

use super::response::{json_body, respond, ApiResult};

/// POST /api/v1/templates/render - Render an inline string or a stored template
#[tracing::instrument(name = "http.render_template", skip(state, body))]
pub async fn render_template(
    State(state): State<AppState>,
    body: Result<Json<RenderInput>, JsonRejection>,
) -> ApiResult<RenderOutput> {
    let input = json_body(body)?;

    let span = tracing::Span::current();
    if let Some(code) = input.template_code.as_deref() {
        let kv = attributes::template_code(code);
        span.set_attribute(kv.key, kv.value);
    }

    let result = state.service.render(input).await;

    let outcome = attributes::render_outcome(if result.is_ok() { "success" } else { "error" });
    span.set_attribute(outcome.key, outcome.value);
    if let Some(number) = result.as_ref().ok().and_then(|o| o.payload.version_number) {
        let kv = attributes::version_number(number);
        span.set_attribute(kv.key, kv.value);
    }

    respond(result?, None)
}
