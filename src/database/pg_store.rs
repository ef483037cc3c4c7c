use crate::database::store::{QuestionStore, ResultStore, SubmissionStore};
use crate::error::Result;
use crate::models::result::{CompositeResult, FeedbackReport, StoredReport};
use crate::models::submission::SubmissionRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Row};

/// PostgreSQL-backed implementation of all three store traits.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuestionStore for PgStore {
    async fn get_questions(&self, interview_id: &str) -> Result<Option<JsonValue>> {
        let row = sqlx::query(r#"SELECT questions FROM interviews WHERE id = $1"#)
            .bind(interview_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else { return Ok(None) };
        let questions: Option<JsonValue> = row.try_get("questions")?;
        Ok(questions.filter(|q| !q.is_null()))
    }
}

#[async_trait]
impl SubmissionStore for PgStore {
    async fn get_raw_feedback(
        &self,
        interview_id: &str,
        candidate_id: &str,
    ) -> Result<Option<SubmissionRecord>> {
        let row = sqlx::query(
            r#"
            SELECT s.raw_feedback, s.candidate_name, i.interview_type
            FROM interview_submissions s
            LEFT JOIN interviews i ON i.id = s.interview_id
            WHERE s.interview_id = $1 AND s.candidate_id = $2
            "#,
        )
        .bind(interview_id)
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };
        Ok(Some(SubmissionRecord {
            raw: row
                .try_get::<Option<JsonValue>, _>("raw_feedback")?
                .unwrap_or(JsonValue::Null),
            candidate_name: row.try_get("candidate_name")?,
            interview_type: row.try_get("interview_type")?,
        }))
    }

    async fn list_candidates(&self, interview_id: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"SELECT candidate_id FROM interview_submissions WHERE interview_id = $1 ORDER BY submitted_at ASC"#,
        )
        .bind(interview_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("candidate_id").map_err(Into::into))
            .collect()
    }
}

#[async_trait]
impl ResultStore for PgStore {
    async fn upsert(
        &self,
        interview_id: &str,
        candidate_id: &str,
        composite: &CompositeResult,
        feedback: &FeedbackReport,
    ) -> Result<()> {
        let composite_json = serde_json::to_value(composite)?;
        let feedback_json = serde_json::to_value(feedback)?;

        sqlx::query(
            r#"
            INSERT INTO interview_reports (interview_id, candidate_id, composite, feedback, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (interview_id, candidate_id)
            DO UPDATE SET composite = EXCLUDED.composite, feedback = EXCLUDED.feedback, updated_at = NOW()
            "#,
        )
        .bind(interview_id)
        .bind(candidate_id)
        .bind(composite_json)
        .bind(feedback_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, interview_id: &str, candidate_id: &str) -> Result<Option<StoredReport>> {
        let row = sqlx::query(
            r#"SELECT composite, feedback, updated_at FROM interview_reports WHERE interview_id = $1 AND candidate_id = $2"#,
        )
        .bind(interview_id)
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };
        Ok(Some(StoredReport {
            interview_id: interview_id.to_string(),
            candidate_id: candidate_id.to_string(),
            composite: serde_json::from_value(row.try_get("composite")?)?,
            feedback: serde_json::from_value(row.try_get("feedback")?)?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        }))
    }
}
