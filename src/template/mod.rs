//! Versioned text templates.
//!
//! This module provides:
//! - Template and version records (`types`)
//! - Storage backends with atomic create and serialized version numbering (`store`)
//! - Version resolution, explicit or latest (`resolver`)
//! - A strict, HTML-escaping rendering engine (`engine`)
//! - The use-case facade consumed by the HTTP layer (`service`)
//!
//! # Example
//!
//! ```ignore
//! let store = create_template_store(&settings.storage, None);
//! let service = TemplateService::new(store, Renderer::new());
//!
//! service.create_template(CreateTemplateInput {
//!     code: Some("welcome_email".into()),
//!     name: Some("Welcome".into()),
//!     body: Some("Hello {{ name }}".into()),
//!     ..Default::default()
//! }).await?;
//!
//! let output = service.render(RenderInput {
//!     template_code: Some("welcome_email".into()),
//!     variables: serde_json::json!({"name": "John"}).as_object().cloned().unwrap_or_default(),
//!     ..Default::default()
//! }).await?;
//! assert_eq!(output.payload.rendered, "Hello John");
//! ```

pub mod engine;
pub mod resolver;
pub mod service;
pub mod store;
pub mod types;

pub use engine::{CompiledTemplate, RenderError, Renderer, RendererConfig, Variable, Variables};
pub use resolver::VersionResolver;
pub use service::{
    AddVersionInput, CreateTemplateInput, CreatedTemplate, Outcome, RenderInput, RenderOutput,
    ServiceError, ServiceResult, StatusKind, TemplateDetails, TemplateService,
    UpdateMetadataInput,
};
pub use store::{
    connect_template_store, create_template_store, MemoryTemplateStore, PostgresTemplateStore,
    StoreError, StoreResult, StoreStats, TemplateRepository,
};
pub use types::{
    NewTemplate, NewVersion, Template, TemplateMetadataUpdate, TemplateSummary, TemplateVersion,
    DEFAULT_LANGUAGE,
};
