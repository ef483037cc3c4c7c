//! Storage collaborators consumed by the scoring engine.

use crate::error::Result;
use crate::models::result::{CompositeResult, FeedbackReport, StoredReport};
use crate::models::submission::SubmissionRecord;
use async_trait::async_trait;
use serde_json::Value as JsonValue;

#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Stored question set for the interview, as persisted (array, wrapper
    /// object, or serialized text). `None` when nothing is stored.
    async fn get_questions(&self, interview_id: &str) -> Result<Option<JsonValue>>;
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn get_raw_feedback(
        &self,
        interview_id: &str,
        candidate_id: &str,
    ) -> Result<Option<SubmissionRecord>>;

    /// Candidates with a stored submission for the interview.
    async fn list_candidates(&self, interview_id: &str) -> Result<Vec<String>>;
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Last write wins; a failed write leaves the previous report intact.
    async fn upsert(
        &self,
        interview_id: &str,
        candidate_id: &str,
        composite: &CompositeResult,
        feedback: &FeedbackReport,
    ) -> Result<()>;

    async fn get(&self, interview_id: &str, candidate_id: &str) -> Result<Option<StoredReport>>;
}
