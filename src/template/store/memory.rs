//! In-memory template store using DashMap.
//!
//! This module provides a memory-based implementation of the
//! `TemplateRepository` trait. State is lost on service restart.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::backend::{StoreError, StoreResult, StoreStats, TemplateRepository};
use crate::template::types::{
    NewTemplate, NewVersion, Template, TemplateMetadataUpdate, TemplateSummary, TemplateVersion,
};

/// A template and its version history, kept together so one map entry lock
/// serializes every change to the template.
#[derive(Debug, Clone)]
struct TemplateRecord {
    template: Template,
    /// Ascending by `version_number`
    versions: Vec<TemplateVersion>,
    /// Insertion order, for stable listing
    sequence: u64,
}

impl TemplateRecord {
    fn next_version_number(&self) -> i32 {
        self.versions
            .iter()
            .map(|v| v.version_number)
            .max()
            .map_or(1, |max| max + 1)
    }

    fn summary(&self) -> TemplateSummary {
        TemplateSummary {
            code: self.template.code.clone(),
            name: self.template.name.clone(),
            language: self.template.language.clone(),
            is_active: self.template.is_active,
            version_count: self.versions.len(),
            latest_version: self.versions.last().map(|v| v.version_number),
        }
    }
}

/// In-memory template store.
///
/// Uses `DashMap` keyed by template code. The entry API makes the duplicate
/// check and insert one atomic step, and `get_mut` holds the entry's write
/// lock while a version number is computed and appended.
pub struct MemoryTemplateStore {
    /// code -> record
    templates: DashMap<String, TemplateRecord>,
    /// template id -> code
    codes_by_id: DashMap<Uuid, String>,
    /// Next insertion sequence
    sequence: AtomicU64,
}

impl Default for MemoryTemplateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTemplateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            templates: DashMap::new(),
            codes_by_id: DashMap::new(),
            sequence: AtomicU64::new(0),
        }
    }

    fn insert_record(
        &self,
        input: NewTemplate,
        first_version: Option<NewVersion>,
    ) -> StoreResult<TemplateRecord> {
        let record = match self.templates.entry(input.code.clone()) {
            Entry::Occupied(_) => return Err(StoreError::DuplicateCode(input.code)),
            Entry::Vacant(vacant) => {
                let template = Template::new(input);
                let versions = first_version
                    .map(|v| vec![TemplateVersion::new(template.id, 1, v)])
                    .unwrap_or_default();
                let record = TemplateRecord {
                    template,
                    versions,
                    sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
                };
                vacant.insert(record.clone());
                record
            }
        };

        self.codes_by_id
            .insert(record.template.id, record.template.code.clone());

        Ok(record)
    }

    fn read<T>(&self, code: &str, f: impl FnOnce(&TemplateRecord) -> StoreResult<T>) -> StoreResult<T> {
        let record = self
            .templates
            .get(code)
            .ok_or_else(|| StoreError::TemplateNotFound(code.to_string()))?;
        f(record.value())
    }
}

#[async_trait]
impl TemplateRepository for MemoryTemplateStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create_template(&self, input: NewTemplate) -> StoreResult<Template> {
        let record = self.insert_record(input, None)?;

        tracing::debug!(template_code = %record.template.code, "Template created");

        Ok(record.template)
    }

    async fn create_template_with_first_version(
        &self,
        template: NewTemplate,
        version: NewVersion,
    ) -> StoreResult<(Template, TemplateVersion)> {
        let mut record = self.insert_record(template, Some(version))?;
        let first = record
            .versions
            .pop()
            .ok_or_else(|| StoreError::Backend("first version was not recorded".to_string()))?;

        tracing::debug!(
            template_code = %record.template.code,
            version_number = first.version_number,
            "Template created with first version"
        );

        Ok((record.template, first))
    }

    async fn get_template(&self, code: &str) -> StoreResult<Template> {
        self.read(code, |record| Ok(record.template.clone()))
    }

    async fn get_template_by_id(&self, id: Uuid) -> StoreResult<Template> {
        let code = self
            .codes_by_id
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::TemplateNotFound(id.to_string()))?;
        self.get_template(&code).await
    }

    async fn list_templates(&self) -> StoreResult<Vec<TemplateSummary>> {
        let mut records: Vec<(u64, TemplateSummary)> = self
            .templates
            .iter()
            .map(|entry| (entry.sequence, entry.summary()))
            .collect();
        records.sort_by_key(|(sequence, _)| *sequence);

        Ok(records.into_iter().map(|(_, summary)| summary).collect())
    }

    async fn update_template_metadata(
        &self,
        code: &str,
        update: TemplateMetadataUpdate,
    ) -> StoreResult<Template> {
        let mut record = self
            .templates
            .get_mut(code)
            .ok_or_else(|| StoreError::TemplateNotFound(code.to_string()))?;

        record.template.apply(update);

        Ok(record.template.clone())
    }

    async fn deactivate_template(&self, code: &str) -> StoreResult<()> {
        let mut record = self
            .templates
            .get_mut(code)
            .ok_or_else(|| StoreError::TemplateNotFound(code.to_string()))?;

        if record.template.is_active {
            record.template.is_active = false;
            record.template.updated_at = Utc::now();
        }

        Ok(())
    }

    async fn add_version(&self, code: &str, version: NewVersion) -> StoreResult<TemplateVersion> {
        let mut record = self
            .templates
            .get_mut(code)
            .ok_or_else(|| StoreError::TemplateNotFound(code.to_string()))?;

        let number = record.next_version_number();
        let created = TemplateVersion::new(record.template.id, number, version);
        record.versions.push(created.clone());
        record.template.updated_at = created.created_at;

        tracing::debug!(
            template_code = %code,
            version_number = number,
            "Template version added"
        );

        Ok(created)
    }

    async fn get_version(&self, code: &str, version_number: i32) -> StoreResult<TemplateVersion> {
        self.read(code, |record| {
            record
                .versions
                .iter()
                .find(|v| v.version_number == version_number)
                .cloned()
                .ok_or_else(|| StoreError::VersionNotFound {
                    code: code.to_string(),
                    version: version_number,
                })
        })
    }

    async fn get_latest_version(&self, code: &str) -> StoreResult<TemplateVersion> {
        self.read(code, |record| {
            record
                .versions
                .iter()
                .max_by_key(|v| v.version_number)
                .cloned()
                .ok_or_else(|| StoreError::NoVersions(code.to_string()))
        })
    }

    async fn list_versions(&self, code: &str) -> StoreResult<Vec<TemplateVersion>> {
        self.read(code, |record| {
            let mut versions = record.versions.clone();
            versions.sort_by_key(|v| v.version_number);
            Ok(versions)
        })
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let mut stats = StoreStats {
            backend_type: "memory".to_string(),
            templates: 0,
            active_templates: 0,
            versions: 0,
        };

        for entry in self.templates.iter() {
            stats.templates += 1;
            if entry.template.is_active {
                stats.active_templates += 1;
            }
            stats.versions += entry.versions.len();
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn new_template(code: &str) -> NewTemplate {
        NewTemplate {
            code: code.to_string(),
            name: format!("Template {}", code),
            language: None,
            description: None,
        }
    }

    fn body(text: &str) -> NewVersion {
        NewVersion {
            body: text.to_string(),
            subject: Some("Subject".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_with_first_version() {
        let store = MemoryTemplateStore::new();

        let (template, version) = store
            .create_template_with_first_version(new_template("welcome"), body("Hi {{ name }}"))
            .await
            .unwrap();

        assert_eq!(version.version_number, 1);
        assert_eq!(version.template_id, template.id);
        assert_eq!(store.get_template("welcome").await.unwrap(), template);
        assert_eq!(store.get_latest_version("welcome").await.unwrap(), version);
    }

    #[tokio::test]
    async fn test_duplicate_code_leaves_state_untouched() {
        let store = MemoryTemplateStore::new();
        store
            .create_template_with_first_version(new_template("dup"), body("first"))
            .await
            .unwrap();

        let err = store
            .create_template_with_first_version(new_template("dup"), body("second"))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::DuplicateCode(ref code) if code == "dup"));
        let versions = store.list_versions("dup").await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].body, "first");
    }

    #[tokio::test]
    async fn test_codes_are_case_sensitive() {
        let store = MemoryTemplateStore::new();
        store.create_template(new_template("Welcome")).await.unwrap();

        assert!(store.create_template(new_template("welcome")).await.is_ok());
    }

    #[tokio::test]
    async fn test_bare_template_has_no_versions() {
        let store = MemoryTemplateStore::new();
        store.create_template(new_template("bare")).await.unwrap();

        assert!(matches!(
            store.get_latest_version("bare").await,
            Err(StoreError::NoVersions(_))
        ));

        let first = store.add_version("bare", body("v1")).await.unwrap();
        assert_eq!(first.version_number, 1);
    }

    #[tokio::test]
    async fn test_versions_increment_and_refresh_updated_at() {
        let store = MemoryTemplateStore::new();
        let (template, _) = store
            .create_template_with_first_version(new_template("t"), body("v1"))
            .await
            .unwrap();

        let v2 = store.add_version("t", body("v2")).await.unwrap();
        let v3 = store.add_version("t", body("v3")).await.unwrap();

        assert_eq!(v2.version_number, 2);
        assert_eq!(v3.version_number, 3);

        let refreshed = store.get_template("t").await.unwrap();
        assert!(refreshed.updated_at >= template.updated_at);
        assert_eq!(refreshed.updated_at, v3.created_at);

        let numbers: Vec<i32> = store
            .list_versions("t")
            .await
            .unwrap()
            .iter()
            .map(|v| v.version_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_get_version_errors() {
        let store = MemoryTemplateStore::new();
        store
            .create_template_with_first_version(new_template("t"), body("v1"))
            .await
            .unwrap();

        assert!(matches!(
            store.get_version("t", 9).await,
            Err(StoreError::VersionNotFound { version: 9, .. })
        ));
        assert!(matches!(
            store.get_version("missing", 1).await,
            Err(StoreError::TemplateNotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_add_version_never_collides() {
        let store = Arc::new(MemoryTemplateStore::new());
        store.create_template(new_template("busy")).await.unwrap();

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .add_version("busy", body(&format!("body {}", i)))
                        .await
                        .unwrap()
                        .version_number
                })
            })
            .collect();

        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap());
        }
        numbers.sort_unstable();

        assert_eq!(numbers, (1..=50).collect::<Vec<i32>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_create_same_code() {
        let store = Arc::new(MemoryTemplateStore::new());

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .create_template_with_first_version(new_template("race"), body("x"))
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(StoreError::DuplicateCode(_)) => duplicates += 1,
                Err(other) => panic!("unexpected error: {}", other),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(duplicates, 9);
    }

    #[tokio::test]
    async fn test_list_in_creation_order() {
        let store = MemoryTemplateStore::new();
        for code in ["zeta", "alpha", "mid"] {
            store
                .create_template_with_first_version(new_template(code), body("x"))
                .await
                .unwrap();
        }
        store.add_version("alpha", body("y")).await.unwrap();

        let list = store.list_templates().await.unwrap();
        let codes: Vec<&str> = list.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, vec!["zeta", "alpha", "mid"]);
        assert_eq!(list[1].version_count, 2);
        assert_eq!(list[1].latest_version, Some(2));
    }

    #[tokio::test]
    async fn test_deactivate_is_idempotent() {
        let store = MemoryTemplateStore::new();
        store
            .create_template_with_first_version(new_template("old"), body("x"))
            .await
            .unwrap();

        store.deactivate_template("old").await.unwrap();
        store.deactivate_template("old").await.unwrap();

        let template = store.get_template("old").await.unwrap();
        assert!(!template.is_active);
        assert_eq!(store.list_versions("old").await.unwrap().len(), 1);
        assert!(matches!(
            store.deactivate_template("missing").await,
            Err(StoreError::TemplateNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_metadata_update_keeps_versions() {
        let store = MemoryTemplateStore::new();
        let (_, v1) = store
            .create_template_with_first_version(new_template("meta"), body("Hello {{ name }}"))
            .await
            .unwrap();

        let updated = store
            .update_template_metadata(
                "meta",
                TemplateMetadataUpdate {
                    name: Some("Renamed".to_string()),
                    language: Some("fr".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.code, "meta");
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.language, "fr");
        assert_eq!(store.list_versions("meta").await.unwrap(), vec![v1]);
    }

    #[tokio::test]
    async fn test_lookup_by_id() {
        let store = MemoryTemplateStore::new();
        let (template, version) = store
            .create_template_with_first_version(new_template("owner"), body("x"))
            .await
            .unwrap();

        let owner = store.get_template_by_id(version.template_id).await.unwrap();
        assert_eq!(owner, template);
        assert!(store.get_template_by_id(Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn test_stats() {
        let store = MemoryTemplateStore::new();
        store
            .create_template_with_first_version(new_template("a"), body("x"))
            .await
            .unwrap();
        store
            .create_template_with_first_version(new_template("b"), body("x"))
            .await
            .unwrap();
        store.add_version("a", body("y")).await.unwrap();
        store.deactivate_template("b").await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.backend_type, "memory");
        assert_eq!(stats.templates, 2);
        assert_eq!(stats.active_templates, 1);
        assert_eq!(stats.versions, 3);
    }
}
