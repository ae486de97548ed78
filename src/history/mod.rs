//! Append-only log of generation requests. One row is written per successful
//! `generate` action; the admin view reads the full log newest-first.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PromptLogEntry {
    pub id: Uuid,
    pub project_type: String,
    pub difficulty: String,
    pub language: String,
    pub topic: String,
    pub requested_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Parameters of one generation request, as submitted on the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptRecord {
    pub project_type: String,
    pub difficulty: String,
    pub language: String,
    pub topic: String,
}

pub async fn record_prompt(
    pool: &PgPool,
    record: &PromptRecord,
    requested_by: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO prompt_log (id, project_type, difficulty, language, topic, requested_by, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, NOW())",
    )
    .bind(Uuid::new_v4())
    .bind(&record.project_type)
    .bind(&record.difficulty)
    .bind(&record.language)
    .bind(&record.topic)
    .bind(requested_by)
    .execute(pool)
    .await
    .context("failed to insert prompt log entry")?;

    Ok(())
}

/// Full read of the log, most recent first. The log is expected to stay small
/// enough for unpaginated inspection.
pub async fn fetch_all_prompts(pool: &PgPool) -> Result<Vec<PromptLogEntry>> {
    sqlx::query_as::<_, PromptLogEntry>(
        "SELECT id, project_type, difficulty, language, topic, requested_by, created_at \
         FROM prompt_log ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await
    .context("failed to fetch prompt log")
}
