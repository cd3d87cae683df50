//! PostgreSQL-based template store.
//!
//! This module provides a persistent implementation of the
//! `TemplateRepository` trait. Two tables back it:
//!
//! - `templates` - one row per template, `UNIQUE (code)`
//! - `template_versions` - append-only history, `UNIQUE (template_id, version_number)`
//!
//! Duplicate codes are rejected by the unique constraint rather than by a
//! read-then-insert check. Version numbering locks the owning template row
//! (`SELECT ... FOR UPDATE`) for the duration of the insert transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::backend::{StoreError, StoreResult, StoreStats, TemplateRepository};
use crate::template::types::{
    NewTemplate, NewVersion, Template, TemplateMetadataUpdate, TemplateSummary, TemplateVersion,
};

/// PostgreSQL SQLSTATE for unique constraint violations
const UNIQUE_VIOLATION: &str = "23505";

/// Constraint guarding template codes
const CODE_CONSTRAINT: &str = "uq_templates_code";

/// Idempotent schema statements, applied in order at startup
pub const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS templates (
        id UUID PRIMARY KEY,
        code VARCHAR(100) NOT NULL,
        name VARCHAR(150) NOT NULL,
        language VARCHAR(10) NOT NULL DEFAULT 'en',
        description TEXT,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CONSTRAINT uq_templates_code UNIQUE (code)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS template_versions (
        id UUID PRIMARY KEY,
        template_id UUID NOT NULL REFERENCES templates (id) ON DELETE RESTRICT,
        version_number INTEGER NOT NULL CHECK (version_number > 0),
        subject TEXT,
        body TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CONSTRAINT uq_template_versions_number UNIQUE (template_id, version_number)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_templates_created_at ON templates (created_at)",
];

const TEMPLATE_COLUMNS: &str =
    "id, code, name, language, description, is_active, created_at, updated_at";

const VERSION_COLUMNS: &str =
    "id, template_id, version_number, subject, body, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct TemplateRow {
    id: Uuid,
    code: String,
    name: String,
    language: String,
    description: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TemplateRow> for Template {
    fn from(row: TemplateRow) -> Self {
        Template {
            id: row.id,
            code: row.code,
            name: row.name,
            language: row.language,
            description: row.description,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VersionRow {
    id: Uuid,
    template_id: Uuid,
    version_number: i32,
    subject: Option<String>,
    body: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<VersionRow> for TemplateVersion {
    fn from(row: VersionRow) -> Self {
        TemplateVersion {
            id: row.id,
            template_id: row.template_id,
            version_number: row.version_number,
            subject: row.subject,
            body: row.body,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Whether a database error is the template-code unique violation
fn is_duplicate_code(sqlstate: Option<&str>, constraint: Option<&str>) -> bool {
    sqlstate == Some(UNIQUE_VIOLATION) && constraint == Some(CODE_CONSTRAINT)
}

/// Map an insert failure, turning code collisions into `DuplicateCode`
fn classify_insert_error(err: sqlx::Error, code: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if is_duplicate_code(db_err.code().as_deref(), db_err.constraint()) {
            return StoreError::DuplicateCode(code.to_string());
        }
    }
    StoreError::Database(err)
}

/// PostgreSQL-based template store.
pub struct PostgresTemplateStore {
    /// PostgreSQL connection pool
    pool: PgPool,
}

impl PostgresTemplateStore {
    /// Create a new PostgreSQL template store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_template(
        tx: &mut Transaction<'_, Postgres>,
        input: NewTemplate,
    ) -> StoreResult<Template> {
        let template = Template::new(input);

        let row: TemplateRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO templates (id, code, name, language, description, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            TEMPLATE_COLUMNS
        ))
        .bind(template.id)
        .bind(&template.code)
        .bind(&template.name)
        .bind(&template.language)
        .bind(&template.description)
        .bind(template.is_active)
        .bind(template.created_at)
        .bind(template.updated_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| classify_insert_error(e, &template.code))?;

        Ok(row.into())
    }

    /// Lock the template row and return its id
    async fn lock_template(
        tx: &mut Transaction<'_, Postgres>,
        code: &str,
    ) -> StoreResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM templates WHERE code = $1 FOR UPDATE")
            .bind(code)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| StoreError::TemplateNotFound(code.to_string()))
    }

    /// Insert the next version. Caller must hold the template row lock.
    async fn insert_next_version(
        tx: &mut Transaction<'_, Postgres>,
        template_id: Uuid,
        version: NewVersion,
    ) -> StoreResult<TemplateVersion> {
        let row: VersionRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO template_versions (id, template_id, version_number, subject, body, created_at, updated_at)
            SELECT $1, $2, COALESCE(MAX(version_number), 0) + 1, $3, $4, NOW(), NOW()
            FROM template_versions
            WHERE template_id = $2
            RETURNING {}
            "#,
            VERSION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(template_id)
        .bind(&version.subject)
        .bind(&version.body)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row.into())
    }

    async fn template_id(&self, code: &str) -> StoreResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM templates WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::TemplateNotFound(code.to_string()))
    }
}

#[async_trait]
impl TemplateRepository for PostgresTemplateStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn create_template(&self, input: NewTemplate) -> StoreResult<Template> {
        let mut tx = self.pool.begin().await?;
        let template = Self::insert_template(&mut tx, input).await?;
        tx.commit().await?;

        tracing::debug!(template_code = %template.code, "Template created in PostgreSQL");

        Ok(template)
    }

    async fn create_template_with_first_version(
        &self,
        template: NewTemplate,
        version: NewVersion,
    ) -> StoreResult<(Template, TemplateVersion)> {
        // Dropping `tx` on any error path rolls both inserts back
        let mut tx = self.pool.begin().await?;
        let template = Self::insert_template(&mut tx, template).await?;
        let first = Self::insert_next_version(&mut tx, template.id, version).await?;
        tx.commit().await?;

        tracing::debug!(
            template_code = %template.code,
            version_number = first.version_number,
            "Template created with first version in PostgreSQL"
        );

        Ok((template, first))
    }

    async fn get_template(&self, code: &str) -> StoreResult<Template> {
        let row: Option<TemplateRow> = sqlx::query_as(&format!(
            "SELECT {} FROM templates WHERE code = $1",
            TEMPLATE_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Template::from)
            .ok_or_else(|| StoreError::TemplateNotFound(code.to_string()))
    }

    async fn get_template_by_id(&self, id: Uuid) -> StoreResult<Template> {
        let row: Option<TemplateRow> = sqlx::query_as(&format!(
            "SELECT {} FROM templates WHERE id = $1",
            TEMPLATE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Template::from)
            .ok_or_else(|| StoreError::TemplateNotFound(id.to_string()))
    }

    async fn list_templates(&self) -> StoreResult<Vec<TemplateSummary>> {
        let rows: Vec<(String, String, String, bool, i64, Option<i32>)> = sqlx::query_as(
            r#"
            SELECT t.code, t.name, t.language, t.is_active,
                   COUNT(v.id) AS version_count,
                   MAX(v.version_number) AS latest_version
            FROM templates t
            LEFT JOIN template_versions v ON v.template_id = t.id
            GROUP BY t.id
            ORDER BY t.created_at ASC, t.code ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(code, name, language, is_active, version_count, latest_version)| {
                    TemplateSummary {
                        code,
                        name,
                        language,
                        is_active,
                        version_count: version_count as usize,
                        latest_version,
                    }
                },
            )
            .collect())
    }

    async fn update_template_metadata(
        &self,
        code: &str,
        update: TemplateMetadataUpdate,
    ) -> StoreResult<Template> {
        let (set_description, description) = match update.description {
            Some(description) => (true, description),
            None => (false, None),
        };

        let row: Option<TemplateRow> = sqlx::query_as(&format!(
            r#"
            UPDATE templates SET
                name = COALESCE($2, name),
                language = COALESCE($3, language),
                description = CASE WHEN $4 THEN $5 ELSE description END,
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE code = $1
            RETURNING {}
            "#,
            TEMPLATE_COLUMNS
        ))
        .bind(code)
        .bind(update.name)
        .bind(update.language)
        .bind(set_description)
        .bind(description)
        .bind(update.is_active)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Template::from)
            .ok_or_else(|| StoreError::TemplateNotFound(code.to_string()))
    }

    async fn deactivate_template(&self, code: &str) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE templates SET
                updated_at = CASE WHEN is_active THEN NOW() ELSE updated_at END,
                is_active = FALSE
            WHERE code = $1
            "#,
        )
        .bind(code)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::TemplateNotFound(code.to_string()));
        }

        Ok(())
    }

    async fn add_version(&self, code: &str, version: NewVersion) -> StoreResult<TemplateVersion> {
        let mut tx = self.pool.begin().await?;

        let template_id = Self::lock_template(&mut tx, code).await?;
        let created = Self::insert_next_version(&mut tx, template_id, version).await?;

        sqlx::query("UPDATE templates SET updated_at = $2 WHERE id = $1")
            .bind(template_id)
            .bind(created.created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            template_code = %code,
            version_number = created.version_number,
            "Template version added in PostgreSQL"
        );

        Ok(created)
    }

    async fn get_version(&self, code: &str, version_number: i32) -> StoreResult<TemplateVersion> {
        let template_id = self.template_id(code).await?;

        let row: Option<VersionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM template_versions WHERE template_id = $1 AND version_number = $2",
            VERSION_COLUMNS
        ))
        .bind(template_id)
        .bind(version_number)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TemplateVersion::from)
            .ok_or_else(|| StoreError::VersionNotFound {
                code: code.to_string(),
                version: version_number,
            })
    }

    async fn get_latest_version(&self, code: &str) -> StoreResult<TemplateVersion> {
        let template_id = self.template_id(code).await?;

        let row: Option<VersionRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM template_versions
            WHERE template_id = $1
            ORDER BY version_number DESC
            LIMIT 1
            "#,
            VERSION_COLUMNS
        ))
        .bind(template_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TemplateVersion::from)
            .ok_or_else(|| StoreError::NoVersions(code.to_string()))
    }

    async fn list_versions(&self, code: &str) -> StoreResult<Vec<TemplateVersion>> {
        let template_id = self.template_id(code).await?;

        let rows: Vec<VersionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM template_versions WHERE template_id = $1 ORDER BY version_number ASC",
            VERSION_COLUMNS
        ))
        .bind(template_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(TemplateVersion::from).collect())
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let (templates, active_templates, versions): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM templates),
                (SELECT COUNT(*) FROM templates WHERE is_active),
                (SELECT COUNT(*) FROM template_versions)
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StoreStats {
            backend_type: "postgres".to_string(),
            templates: templates as usize,
            active_templates: active_templates as usize,
            versions: versions as usize,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_code_detection() {
        assert!(is_duplicate_code(Some("23505"), Some("uq_templates_code")));
        // Version-number collisions are a different constraint
        assert!(!is_duplicate_code(
            Some("23505"),
            Some("uq_template_versions_number")
        ));
        assert!(!is_duplicate_code(Some("23503"), Some("uq_templates_code")));
        assert!(!is_duplicate_code(None, None));
    }

    #[test]
    fn test_non_database_errors_pass_through() {
        let err = classify_insert_error(sqlx::Error::RowNotFound, "welcome");
        assert!(matches!(err, StoreError::Database(sqlx::Error::RowNotFound)));
    }

    #[test]
    fn test_schema_declares_constraints() {
        let schema = SCHEMA.join("\n");
        assert!(schema.contains("CONSTRAINT uq_templates_code UNIQUE (code)"));
        assert!(schema.contains("UNIQUE (template_id, version_number)"));
        assert!(schema.contains("REFERENCES templates (id)"));
    }
}
