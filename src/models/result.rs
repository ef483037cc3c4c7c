use crate::models::answer::ScoredAnswer;
use crate::models::question::{InterviewFormat, QuestionKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionSummary {
    pub total_questions: usize,
    pub answered_questions: usize,
    pub average_score: u8,
    pub time_spent_seconds: u64,
}

/// Pure function of the scored answers; recomputed on every run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeResult {
    pub overall_score: u8,
    pub section_summaries: BTreeMap<QuestionKind, SectionSummary>,
    pub completion_rate: u8,
    pub accuracy: u8,
    pub total_questions: usize,
    pub answered_questions: usize,
}

impl CompositeResult {
    /// Sections that actually carried questions, in canonical order.
    pub fn present_sections(&self) -> impl Iterator<Item = (QuestionKind, &SectionSummary)> {
        self.section_summaries
            .iter()
            .filter(|(_, summary)| summary.total_questions > 0)
            .map(|(kind, summary)| (*kind, summary))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSource {
    Ai,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionFeedback {
    pub section: String,
    pub feedback: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackReport {
    pub overall_performance: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub section_feedback: Vec<SectionFeedback>,
    pub source: FeedbackSource,
}

/// The unified per-candidate record returned by the result assembler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewAnalytics {
    pub id: Uuid,
    pub interview_id: String,
    pub candidate_id: String,
    pub candidate_name: String,
    pub format: InterviewFormat,
    pub answers: Vec<ScoredAnswer>,
    pub composite: CompositeResult,
    pub feedback: FeedbackReport,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredReport {
    pub interview_id: String,
    pub candidate_id: String,
    pub composite: CompositeResult,
    pub feedback: FeedbackReport,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Scored,
    Failed,
}

/// One candidate's entry in a batch run. A failure here never aborts the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateOutcome {
    pub candidate_id: String,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics: Option<InterviewAnalytics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
