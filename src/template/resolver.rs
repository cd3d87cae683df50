//! Version resolution.
//!
//! The single rule for "which version does this request mean": an explicit
//! number selects that version, no number selects the highest-numbered one.

use std::sync::Arc;

use super::store::{StoreResult, TemplateRepository};
use super::types::TemplateVersion;

/// Picks a version for a template code
#[derive(Clone)]
pub struct VersionResolver {
    store: Arc<dyn TemplateRepository>,
}

impl VersionResolver {
    pub fn new(store: Arc<dyn TemplateRepository>) -> Self {
        Self { store }
    }

    /// Resolve `version_number` for `code`, or the latest version when absent.
    ///
    /// # Errors
    ///
    /// `TemplateNotFound`, `VersionNotFound` (explicit number) or
    /// `NoVersions` (latest requested on an empty history).
    pub async fn resolve(
        &self,
        code: &str,
        version_number: Option<i32>,
    ) -> StoreResult<TemplateVersion> {
        match version_number {
            Some(number) => self.store.get_version(code, number).await,
            None => self.store.get_latest_version(code).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::store::{MemoryTemplateStore, StoreError};
    use crate::template::types::{NewTemplate, NewVersion};

    async fn store_with_versions(count: usize) -> Arc<dyn TemplateRepository> {
        let store: Arc<dyn TemplateRepository> = Arc::new(MemoryTemplateStore::new());
        store
            .create_template_with_first_version(
                NewTemplate {
                    code: "receipt".to_string(),
                    name: "Receipt".to_string(),
                    language: None,
                    description: None,
                },
                NewVersion {
                    body: "v1".to_string(),
                    subject: None,
                },
            )
            .await
            .unwrap();

        for i in 2..=count {
            store
                .add_version(
                    "receipt",
                    NewVersion {
                        body: format!("v{}", i),
                        subject: None,
                    },
                )
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_resolve_latest() {
        let resolver = VersionResolver::new(store_with_versions(4).await);

        let version = resolver.resolve("receipt", None).await.unwrap();

        assert_eq!(version.version_number, 4);
        assert_eq!(version.body, "v4");
    }

    #[tokio::test]
    async fn test_resolve_explicit() {
        let resolver = VersionResolver::new(store_with_versions(4).await);

        let version = resolver.resolve("receipt", Some(2)).await.unwrap();

        assert_eq!(version.version_number, 2);
        assert_eq!(version.body, "v2");
    }

    #[tokio::test]
    async fn test_resolve_errors() {
        let resolver = VersionResolver::new(store_with_versions(1).await);

        assert!(matches!(
            resolver.resolve("receipt", Some(5)).await,
            Err(StoreError::VersionNotFound { version: 5, .. })
        ));
        assert!(matches!(
            resolver.resolve("unknown", None).await,
            Err(StoreError::TemplateNotFound(_))
        ));
    }
}
