use crate::models::result::{CandidateOutcome, OutcomeStatus};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScorePayload {
    #[validate(length(min = 1, max = 200))]
    pub candidate_name: Option<String>,
    pub persist: Option<bool>,
}

impl ScorePayload {
    pub fn should_persist(&self) -> bool {
        self.persist.unwrap_or(true)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResultsResponse {
    pub interview_id: String,
    pub total: usize,
    pub scored: usize,
    pub failed: usize,
    pub results: Vec<CandidateOutcome>,
}

impl BatchResultsResponse {
    pub fn new(interview_id: String, results: Vec<CandidateOutcome>) -> Self {
        let scored = results
            .iter()
            .filter(|r| r.status == OutcomeStatus::Scored)
            .count();
        Self {
            interview_id,
            total: results.len(),
            scored,
            failed: results.len() - scored,
            results,
        }
    }
}
