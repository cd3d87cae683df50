//! Backend trait for template storage.
//!
//! This module defines the abstraction layer for template persistence,
//! allowing different storage implementations (memory, PostgreSQL) to be
//! used interchangeably.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::template::types::{
    NewTemplate, NewVersion, Template, TemplateMetadataUpdate, TemplateSummary, TemplateVersion,
};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A template with this code already exists
    #[error("Template code already exists: {0}")]
    DuplicateCode(String),

    /// No template with this code (or id)
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// The template exists but has no such version
    #[error("Version {version} not found for template {code}")]
    VersionNotFound { code: String, version: i32 },

    /// The template exists but has no versions at all
    #[error("Template {0} has no versions")]
    NoVersions(String),

    /// PostgreSQL operation failed
    #[error("PostgreSQL error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backend failure not otherwise classified
    #[error("Backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether the error means "the addressed entity does not exist"
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::TemplateNotFound(_)
                | StoreError::VersionNotFound { .. }
                | StoreError::NoVersions(_)
        )
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Statistics about the store backend.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    /// Backend type identifier
    pub backend_type: String,

    /// Number of templates (active and inactive)
    pub templates: usize,

    /// Number of active templates
    pub active_templates: usize,

    /// Number of versions across all templates
    pub versions: usize,
}

/// Backend trait for template storage.
///
/// # Invariants
///
/// - `code` is unique. The uniqueness check and the insert are a single
///   atomic step, so concurrent creators on one code see exactly one success.
/// - Version numbers are assigned `max + 1` (or 1) under a per-template lock,
///   so concurrent `add_version` calls never collide.
/// - Versions are append-only and never modified after insert.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one instance is shared by all
/// request handlers.
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// Backend identifier, e.g. `"memory"` or `"postgres"`
    fn backend_name(&self) -> &'static str;

    /// Insert a bare template.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateCode` if `code` is taken.
    async fn create_template(&self, input: NewTemplate) -> StoreResult<Template>;

    /// Insert a template together with its version 1.
    ///
    /// Either both rows persist or neither does.
    async fn create_template_with_first_version(
        &self,
        template: NewTemplate,
        version: NewVersion,
    ) -> StoreResult<(Template, TemplateVersion)>;

    /// Fetch a template by its business key
    async fn get_template(&self, code: &str) -> StoreResult<Template>;

    /// Fetch a template by storage id (the `template_id` on a version)
    async fn get_template_by_id(&self, id: Uuid) -> StoreResult<Template>;

    /// List template summaries in creation order
    async fn list_templates(&self) -> StoreResult<Vec<TemplateSummary>>;

    /// Change name/language/description/is_active. Code and versions are untouched.
    async fn update_template_metadata(
        &self,
        code: &str,
        update: TemplateMetadataUpdate,
    ) -> StoreResult<Template>;

    /// Soft-delete: set `is_active = false`. Idempotent.
    async fn deactivate_template(&self, code: &str) -> StoreResult<()>;

    /// Append a new version numbered `max + 1` and refresh the template's `updated_at`
    async fn add_version(&self, code: &str, version: NewVersion) -> StoreResult<TemplateVersion>;

    /// Fetch one version by number
    async fn get_version(&self, code: &str, version_number: i32) -> StoreResult<TemplateVersion>;

    /// Fetch the version with the highest number
    async fn get_latest_version(&self, code: &str) -> StoreResult<TemplateVersion>;

    /// All versions, ascending by number
    async fn list_versions(&self, code: &str) -> StoreResult<Vec<TemplateVersion>>;

    /// Get store statistics.
    async fn stats(&self) -> StoreResult<StoreStats>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(StoreError::TemplateNotFound("a".into()).is_not_found());
        assert!(StoreError::VersionNotFound {
            code: "a".into(),
            version: 3
        }
        .is_not_found());
        assert!(StoreError::NoVersions("a".into()).is_not_found());
        assert!(!StoreError::DuplicateCode("a".into()).is_not_found());
        assert!(!StoreError::Backend("boom".into()).is_not_found());
    }

    #[test]
    fn test_error_messages() {
        let err = StoreError::VersionNotFound {
            code: "welcome".into(),
            version: 7,
        };
        assert_eq!(err.to_string(), "Version 7 not found for template welcome");

        let err = StoreError::DuplicateCode("welcome".into());
        assert!(err.to_string().contains("welcome"));
    }
}
