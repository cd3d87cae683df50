//! Template entities and the payloads used to create or change them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Language tag assigned when a creation payload does not carry one
pub const DEFAULT_LANGUAGE: &str = "en";

/// A named, versioned container for reusable text content.
///
/// `code` is the immutable business key; `id` is the storage identity that
/// versions point back to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Generated identifier
    pub id: Uuid,

    /// Unique business key (case-sensitive)
    pub code: String,

    /// Human-readable template name
    pub name: String,

    /// Opaque language tag
    pub language: String,

    /// Template description (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Inactive templates cannot be rendered by code
    pub is_active: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Refreshed on metadata changes and whenever a version is appended
    pub updated_at: DateTime<Utc>,
}

impl Template {
    /// Build a fresh, active template from a creation payload
    pub fn new(input: NewTemplate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            code: input.code,
            name: input.name,
            language: input
                .language
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            description: input.description,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial metadata update. Never touches `code` or versions.
    pub fn apply(&mut self, update: TemplateMetadataUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }

        if let Some(language) = update.language {
            self.language = language;
        }

        if let Some(description) = update.description {
            self.description = description;
        }

        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }

        self.updated_at = Utc::now();
    }
}

/// An immutable, numbered snapshot of a template's body and subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateVersion {
    /// Generated identifier
    pub id: Uuid,

    /// Owning template's `id`
    pub template_id: Uuid,

    /// Positive, unique per template, assigned as `max + 1`
    pub version_number: i32,

    /// Subject line (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Template source
    pub body: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl TemplateVersion {
    pub fn new(template_id: Uuid, version_number: i32, input: NewVersion) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            template_id,
            version_number,
            subject: input.subject,
            body: input.body,
            created_at: now,
            updated_at: now,
        }
    }
}

/// List view of a template
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateSummary {
    pub code: String,
    pub name: String,
    pub language: String,
    pub is_active: bool,
    pub version_count: usize,
    /// Highest version number, if any version exists
    pub latest_version: Option<i32>,
}

/// Payload for inserting a template row
#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub code: String,
    pub name: String,
    pub language: Option<String>,
    pub description: Option<String>,
}

/// Payload for appending a version
#[derive(Debug, Clone)]
pub struct NewVersion {
    pub body: String,
    pub subject: Option<String>,
}

/// Partial metadata update. `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default)]
pub struct TemplateMetadataUpdate {
    pub name: Option<String>,
    pub language: Option<String>,
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl TemplateMetadataUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.language.is_none()
            && self.description.is_none()
            && self.is_active.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_template() -> NewTemplate {
        NewTemplate {
            code: "welcome_email".to_string(),
            name: "Welcome".to_string(),
            language: None,
            description: Some("Sent after signup".to_string()),
        }
    }

    #[test]
    fn test_new_template_defaults() {
        let template = Template::new(new_template());

        assert_eq!(template.language, DEFAULT_LANGUAGE);
        assert!(template.is_active);
        assert_eq!(template.created_at, template.updated_at);
        assert!(!template.id.is_nil());
    }

    #[test]
    fn test_apply_partial_update() {
        let mut template = Template::new(new_template());
        let before = template.updated_at;

        template.apply(TemplateMetadataUpdate {
            name: Some("Welcome v2".to_string()),
            description: Some(None),
            ..Default::default()
        });

        assert_eq!(template.code, "welcome_email");
        assert_eq!(template.name, "Welcome v2");
        assert_eq!(template.language, "en");
        assert!(template.description.is_none());
        assert!(template.is_active);
        assert!(template.updated_at >= before);
    }

    #[test]
    fn test_metadata_update_is_empty() {
        assert!(TemplateMetadataUpdate::default().is_empty());
        assert!(!TemplateMetadataUpdate {
            is_active: Some(false),
            ..Default::default()
        }
        .is_empty());
    }

    #[test]
    fn test_template_serialization_skips_missing_description() {
        let mut input = new_template();
        input.description = None;
        let template = Template::new(input);

        let json = serde_json::to_string(&template).unwrap();
        assert!(!json.contains("description"));
        assert!(json.contains("\"is_active\":true"));
    }
}
