//! Template registry endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};

use crate::server::AppState;
use crate::template::{
    AddVersionInput, CreateTemplateInput, CreatedTemplate, Template, TemplateDetails,
    TemplateSummary, TemplateVersion, UpdateMetadataInput,
};

use super::response::{json_body, path_params, respond, ApiResult};

/// POST /api/v1/templates - Create a template with its first version
#[tracing::instrument(name = "http.create_template", skip(state, body))]
pub async fn create_template(
    State(state): State<AppState>,
    body: Result<Json<CreateTemplateInput>, JsonRejection>,
) -> ApiResult<CreatedTemplate> {
    let input = json_body(body)?;
    let outcome = state.service.create_template(input).await?;
    respond(outcome, Some("Template created successfully"))
}

/// GET /api/v1/templates - List template summaries
#[tracing::instrument(name = "http.list_templates", skip(state))]
pub async fn list_templates(State(state): State<AppState>) -> ApiResult<Vec<TemplateSummary>> {
    let outcome = state.service.list_templates().await?;
    respond(outcome, None)
}

/// GET /api/v1/templates/{code} - Template metadata and its latest version
#[tracing::instrument(name = "http.get_template", skip(state, path))]
pub async fn get_template(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<TemplateDetails> {
    let code = path_params(path)?;
    let outcome = state.service.get_template(&code).await?;
    respond(outcome, None)
}

/// PATCH /api/v1/templates/{code} - Change metadata without touching versions
#[tracing::instrument(name = "http.update_template", skip(state, path, body))]
pub async fn update_template(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<UpdateMetadataInput>, JsonRejection>,
) -> ApiResult<Template> {
    let code = path_params(path)?;
    let input = json_body(body)?;
    let outcome = state.service.update_template_metadata(&code, input).await?;
    respond(outcome, Some("Template updated successfully"))
}

/// PUT /api/v1/templates/{code} - Append a new version
#[tracing::instrument(name = "http.add_version", skip(state, path, body))]
pub async fn add_version(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<AddVersionInput>, JsonRejection>,
) -> ApiResult<TemplateVersion> {
    let code = path_params(path)?;
    let input = json_body(body)?;
    let outcome = state.service.add_version(&code, input).await?;
    respond(outcome, Some("New template version created"))
}

/// DELETE /api/v1/templates/{code} - Deactivate a template
#[tracing::instrument(name = "http.delete_template", skip(state, path))]
pub async fn delete_template(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<()> {
    let code = path_params(path)?;
    let outcome = state.service.deactivate_template(&code).await?;
    respond(outcome, Some("Template deactivated successfully"))
}

/// GET /api/v1/templates/{code}/versions - Full version history
#[tracing::instrument(name = "http.list_versions", skip(state, path))]
pub async fn list_versions(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Vec<TemplateVersion>> {
    let code = path_params(path)?;
    let outcome = state.service.list_versions(&code).await?;
    respond(outcome, None)
}

/// GET /api/v1/templates/{code}/versions/{version_number}
#[tracing::instrument(name = "http.get_version", skip(state, path))]
pub async fn get_version(
    State(state): State<AppState>,
    path: Result<Path<(String, i32)>, PathRejection>,
) -> ApiResult<TemplateDetails> {
    let (code, version_number) = path_params(path)?;
    let outcome = state.service.get_version(&code, version_number).await?;
    respond(outcome, None)
}
