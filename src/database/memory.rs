use crate::database::store::{QuestionStore, ResultStore, SubmissionStore};
use crate::error::{Error, Result};
use crate::models::result::{CompositeResult, FeedbackReport, StoredReport};
use crate::models::submission::SubmissionRecord;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

type Key = (String, String);

/// Map-backed store for tests and local runs.
#[derive(Default)]
pub struct MemoryStore {
    questions: RwLock<HashMap<String, JsonValue>>,
    submissions: RwLock<HashMap<Key, SubmissionRecord>>,
    submission_order: RwLock<Vec<Key>>,
    reports: RwLock<HashMap<Key, StoredReport>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_questions(&self, interview_id: &str, questions: JsonValue) {
        self.questions
            .write()
            .await
            .insert(interview_id.to_string(), questions);
    }

    pub async fn put_submission(
        &self,
        interview_id: &str,
        candidate_id: &str,
        submission: SubmissionRecord,
    ) {
        let key = (interview_id.to_string(), candidate_id.to_string());
        let previous = self.submissions.write().await.insert(key.clone(), submission);
        if previous.is_none() {
            self.submission_order.write().await.push(key);
        }
    }

    /// Makes every subsequent `upsert` fail, as a storage outage would.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl QuestionStore for MemoryStore {
    async fn get_questions(&self, interview_id: &str) -> Result<Option<JsonValue>> {
        Ok(self.questions.read().await.get(interview_id).cloned())
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn get_raw_feedback(
        &self,
        interview_id: &str,
        candidate_id: &str,
    ) -> Result<Option<SubmissionRecord>> {
        let key = (interview_id.to_string(), candidate_id.to_string());
        Ok(self.submissions.read().await.get(&key).cloned())
    }

    async fn list_candidates(&self, interview_id: &str) -> Result<Vec<String>> {
        Ok(self
            .submission_order
            .read()
            .await
            .iter()
            .filter(|(iid, _)| iid == interview_id)
            .map(|(_, cid)| cid.clone())
            .collect())
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn upsert(
        &self,
        interview_id: &str,
        candidate_id: &str,
        composite: &CompositeResult,
        feedback: &FeedbackReport,
    ) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Storage("report store is unavailable".to_string()));
        }
        let report = StoredReport {
            interview_id: interview_id.to_string(),
            candidate_id: candidate_id.to_string(),
            composite: composite.clone(),
            feedback: feedback.clone(),
            updated_at: Utc::now(),
        };
        self.reports
            .write()
            .await
            .insert((interview_id.to_string(), candidate_id.to_string()), report);
        Ok(())
    }

    async fn get(&self, interview_id: &str, candidate_id: &str) -> Result<Option<StoredReport>> {
        let key = (interview_id.to_string(), candidate_id.to_string());
        Ok(self.reports.read().await.get(&key).cloned())
    }
}
