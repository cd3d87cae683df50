//! Service facade.
//!
//! Orchestrates the store, the version resolver and the renderer for each use
//! case, and is the only place where store and engine errors are translated
//! into the [`StatusKind`] taxonomy consumed by the HTTP layer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::metrics::{RenderMetrics, StoreMetrics, TemplateMetrics};

use super::engine::{RenderError, Renderer, Variables};
use super::resolver::VersionResolver;
use super::store::{StoreError, TemplateRepository};
use super::types::{
    NewTemplate, NewVersion, Template, TemplateMetadataUpdate, TemplateSummary, TemplateVersion,
};

const MAX_CODE_LEN: usize = 100;
const MAX_NAME_LEN: usize = 150;
const MAX_LANGUAGE_LEN: usize = 10;

/// Outcome classification handed to the transport layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusKind {
    Created,
    Ok,
    NotFound,
    Conflict,
    ValidationError,
    InternalError,
}

/// Successful result of a use case
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub status: StatusKind,
    pub payload: T,
}

impl<T> Outcome<T> {
    fn ok(payload: T) -> Self {
        Self {
            status: StatusKind::Ok,
            payload,
        }
    }

    fn created(payload: T) -> Self {
        Self {
            status: StatusKind::Created,
            payload,
        }
    }
}

/// Failed result of a use case
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn status(&self) -> StatusKind {
        match self {
            ServiceError::Validation(_) | ServiceError::Render(_) => StatusKind::ValidationError,
            ServiceError::NotFound(_) => StatusKind::NotFound,
            ServiceError::Conflict(_) => StatusKind::Conflict,
            ServiceError::Internal(_) => StatusKind::InternalError,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateCode(_) => ServiceError::Conflict(err.to_string()),
            StoreError::TemplateNotFound(_)
            | StoreError::VersionNotFound { .. }
            | StoreError::NoVersions(_) => ServiceError::NotFound(err.to_string()),
            StoreError::Database(_) | StoreError::Backend(_) => {
                ServiceError::Internal(err.to_string())
            }
        }
    }
}

/// Result type for service operations
pub type ServiceResult<T> = Result<Outcome<T>, ServiceError>;

/// Distinguish an absent field from an explicit `null`
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Create a template together with its version 1
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTemplateInput {
    pub code: Option<String>,
    pub name: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
    pub subject: Option<String>,
}

/// Partial metadata change. `"description": null` clears the description.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMetadataInput {
    pub name: Option<String>,
    pub language: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// Append a version
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddVersionInput {
    pub body: Option<String>,
    pub subject: Option<String>,
}

/// Render either an inline string or a stored template.
///
/// Exactly one of `template_string` and `template_code` must be set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RenderInput {
    pub template_string: Option<String>,
    pub template_code: Option<String>,
    pub version_number: Option<i32>,
    #[serde(default)]
    pub variables: serde_json::Map<String, Value>,
    /// Pre-escaped values emitted verbatim
    #[serde(default)]
    pub raw_variables: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedTemplate {
    pub template: Template,
    pub version: TemplateVersion,
}

/// A template with one resolved version (`None` only for an empty history)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateDetails {
    #[serde(flatten)]
    pub template: Template,
    pub version: Option<TemplateVersion>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderOutput {
    pub rendered: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_number: Option<i32>,
}

fn required(field: &str, value: Option<String>) -> Result<String, ServiceError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ServiceError::Validation(format!("Missing field: {}", field))),
    }
}

fn validate_code(code: &str) -> Result<(), ServiceError> {
    if code.len() > MAX_CODE_LEN {
        return Err(ServiceError::Validation(format!(
            "code must be at most {} characters",
            MAX_CODE_LEN
        )));
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(ServiceError::Validation(
            "code must contain only alphanumeric, dash, underscore, or dot".to_string(),
        ));
    }

    Ok(())
}

fn validate_len(field: &str, value: &str, max: usize) -> Result<(), ServiceError> {
    if value.trim().is_empty() || value.chars().count() > max {
        return Err(ServiceError::Validation(format!(
            "{} must be 1-{} characters",
            field, max
        )));
    }
    Ok(())
}

fn validate_version_number(version_number: i32) -> Result<(), ServiceError> {
    if version_number < 1 {
        return Err(ServiceError::Validation(
            "version_number must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

/// Use-case orchestration over the store, resolver and renderer
#[derive(Clone)]
pub struct TemplateService {
    store: Arc<dyn TemplateRepository>,
    resolver: VersionResolver,
    renderer: Renderer,
}

impl TemplateService {
    pub fn new(store: Arc<dyn TemplateRepository>, renderer: Renderer) -> Self {
        Self {
            resolver: VersionResolver::new(store.clone()),
            store,
            renderer,
        }
    }

    pub fn store(&self) -> &Arc<dyn TemplateRepository> {
        &self.store
    }

    /// Reject bodies and subjects that would never render
    fn check_syntax(&self, field: &str, source: &str) -> Result<Vec<String>, ServiceError> {
        self.renderer
            .compile(source)
            .map(|compiled| compiled.referenced_variables())
            .map_err(|e| ServiceError::Validation(format!("Invalid {}: {}", field, e)))
    }

    fn new_version(&self, body: Option<String>, subject: Option<String>) -> Result<NewVersion, ServiceError> {
        let body = required("body", body)?;
        let mut variables = self.check_syntax("body", &body)?;
        if let Some(subject) = &subject {
            variables.extend(self.check_syntax("subject", subject)?);
        }
        tracing::debug!(variables = ?variables, "Template source compiled");
        Ok(NewVersion { body, subject })
    }

    /// Map a store failure, logging the ones the client cannot act on
    fn store_error(operation: &'static str, err: StoreError) -> ServiceError {
        if !err.is_not_found() && !matches!(err, StoreError::DuplicateCode(_)) {
            StoreMetrics::record_error(operation);
            tracing::error!(operation, error = %err, "Template store operation failed");
        }
        err.into()
    }

    #[tracing::instrument(name = "service.create_template", skip(self, input), fields(template_code))]
    pub async fn create_template(&self, input: CreateTemplateInput) -> ServiceResult<CreatedTemplate> {
        let code = required("code", input.code)?;
        let name = required("name", input.name)?;
        tracing::Span::current().record("template_code", code.as_str());

        validate_code(&code)?;
        validate_len("name", &name, MAX_NAME_LEN)?;
        if let Some(language) = &input.language {
            validate_len("language", language, MAX_LANGUAGE_LEN)?;
        }
        let version = self.new_version(input.body, input.subject)?;

        let (template, version) = self
            .store
            .create_template_with_first_version(
                NewTemplate {
                    code,
                    name,
                    language: input.language,
                    description: input.description,
                },
                version,
            )
            .await
            .map_err(|e| Self::store_error("create_template", e))?;

        TemplateMetrics::record_created();
        tracing::info!(template_code = %template.code, "Template created");

        Ok(Outcome::created(CreatedTemplate { template, version }))
    }

    #[tracing::instrument(name = "service.list_templates", skip(self))]
    pub async fn list_templates(&self) -> ServiceResult<Vec<TemplateSummary>> {
        let templates = self
            .store
            .list_templates()
            .await
            .map_err(|e| Self::store_error("list_templates", e))?;

        Ok(Outcome::ok(templates))
    }

    /// Template metadata plus its latest version
    #[tracing::instrument(name = "service.get_template", skip(self))]
    pub async fn get_template(&self, code: &str) -> ServiceResult<TemplateDetails> {
        let template = self
            .store
            .get_template(code)
            .await
            .map_err(|e| Self::store_error("get_template", e))?;

        let version = match self.resolver.resolve(code, None).await {
            Ok(version) => Some(version),
            Err(StoreError::NoVersions(_)) => None,
            Err(e) => return Err(Self::store_error("get_template", e)),
        };

        Ok(Outcome::ok(TemplateDetails { template, version }))
    }

    #[tracing::instrument(name = "service.update_template_metadata", skip(self, input))]
    pub async fn update_template_metadata(
        &self,
        code: &str,
        input: UpdateMetadataInput,
    ) -> ServiceResult<Template> {
        let update = TemplateMetadataUpdate {
            name: input.name,
            language: input.language,
            description: input.description,
            is_active: input.is_active,
        };

        if update.is_empty() {
            return Err(ServiceError::Validation(
                "At least one of name, language, description, is_active is required".to_string(),
            ));
        }
        if let Some(name) = &update.name {
            validate_len("name", name, MAX_NAME_LEN)?;
        }
        if let Some(language) = &update.language {
            validate_len("language", language, MAX_LANGUAGE_LEN)?;
        }

        let template = self
            .store
            .update_template_metadata(code, update)
            .await
            .map_err(|e| Self::store_error("update_template_metadata", e))?;

        tracing::info!(template_code = %code, "Template metadata updated");

        Ok(Outcome::ok(template))
    }

    /// Soft delete: the template and its history stay stored but can no
    /// longer be rendered by code.
    #[tracing::instrument(name = "service.deactivate_template", skip(self))]
    pub async fn deactivate_template(&self, code: &str) -> ServiceResult<()> {
        self.store
            .deactivate_template(code)
            .await
            .map_err(|e| Self::store_error("deactivate_template", e))?;

        tracing::info!(template_code = %code, "Template deactivated");

        Ok(Outcome::ok(()))
    }

    #[tracing::instrument(name = "service.add_version", skip(self, input))]
    pub async fn add_version(&self, code: &str, input: AddVersionInput) -> ServiceResult<TemplateVersion> {
        let version = self.new_version(input.body, input.subject)?;

        let created = self
            .store
            .add_version(code, version)
            .await
            .map_err(|e| Self::store_error("add_version", e))?;

        TemplateMetrics::record_version_added();
        tracing::info!(
            template_code = %code,
            version_number = created.version_number,
            "Template version added"
        );

        Ok(Outcome::created(created))
    }

    #[tracing::instrument(name = "service.list_versions", skip(self))]
    pub async fn list_versions(&self, code: &str) -> ServiceResult<Vec<TemplateVersion>> {
        let versions = self
            .store
            .list_versions(code)
            .await
            .map_err(|e| Self::store_error("list_versions", e))?;

        Ok(Outcome::ok(versions))
    }

    /// Template metadata plus one explicit version
    #[tracing::instrument(name = "service.get_version", skip(self))]
    pub async fn get_version(&self, code: &str, version_number: i32) -> ServiceResult<TemplateDetails> {
        validate_version_number(version_number)?;

        let template = self
            .store
            .get_template(code)
            .await
            .map_err(|e| Self::store_error("get_version", e))?;
        let version = self
            .resolver
            .resolve(code, Some(version_number))
            .await
            .map_err(|e| Self::store_error("get_version", e))?;

        Ok(Outcome::ok(TemplateDetails {
            template,
            version: Some(version),
        }))
    }

    #[tracing::instrument(
        name = "service.render",
        skip(self, input),
        fields(template_code = input.template_code.as_deref().unwrap_or("<inline>"))
    )]
    pub async fn render(&self, input: RenderInput) -> ServiceResult<RenderOutput> {
        let started = Instant::now();
        let result = self.render_inner(input).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(ServiceError::Render(_)) => "render_error",
            Err(ServiceError::NotFound(_)) => "not_found",
            Err(ServiceError::Validation(_)) => "validation_error",
            Err(_) => "internal_error",
        };
        RenderMetrics::record(outcome, started.elapsed());

        if let Err(ServiceError::Render(e)) = &result {
            tracing::warn!(error = %e, "Template render failed");
        }

        result
    }

    async fn render_inner(&self, input: RenderInput) -> ServiceResult<RenderOutput> {
        let variables = Variables::from_maps(input.variables, input.raw_variables);

        match (input.template_string, input.template_code) {
            (Some(source), None) => {
                if input.version_number.is_some() {
                    return Err(ServiceError::Validation(
                        "version_number is only valid with template_code".to_string(),
                    ));
                }

                let rendered = self.renderer.render(&source, &variables)?;

                Ok(Outcome::ok(RenderOutput {
                    rendered,
                    subject: None,
                    template_code: None,
                    version_number: None,
                }))
            }
            (None, Some(code)) => {
                if let Some(number) = input.version_number {
                    validate_version_number(number)?;
                }

                let template = self
                    .store
                    .get_template(&code)
                    .await
                    .map_err(|e| Self::store_error("render", e))?;
                if !template.is_active {
                    return Err(ServiceError::NotFound(format!(
                        "Template not found: {} is inactive",
                        code
                    )));
                }

                let version = self
                    .resolver
                    .resolve(&code, input.version_number)
                    .await
                    .map_err(|e| Self::store_error("render", e))?;

                let rendered = self.renderer.render(&version.body, &variables)?;
                let subject = version
                    .subject
                    .as_deref()
                    .map(|subject| self.renderer.render(subject, &variables))
                    .transpose()?;

                Ok(Outcome::ok(RenderOutput {
                    rendered,
                    subject,
                    template_code: Some(code),
                    version_number: Some(version.version_number),
                }))
            }
            (Some(_), Some(_)) => Err(ServiceError::Validation(
                "Provide either template_string or template_code, not both".to_string(),
            )),
            (None, None) => Err(ServiceError::Validation(
                "One of template_string or template_code is required".to_string(),
            )),
        }
    }
}
