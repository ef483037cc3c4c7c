use crate::database::store::{ResultStore, SubmissionStore};
use crate::error::{Error, Result};
use crate::models::question::{InterviewFormat, Question};
use crate::models::result::{
    CandidateOutcome, InterviewAnalytics, OutcomeStatus, StoredReport,
};
use crate::models::submission::RawSubmission;
use crate::services::aggregate_service::AggregateService;
use crate::services::feedback_service::FeedbackService;
use crate::services::grading_service::GradingService;
use crate::services::normalizer_service::NormalizerService;
use crate::services::question_service::QuestionService;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use uuid::Uuid;

const DEFAULT_CANDIDATE_NAME: &str = "Candidate";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineStage {
    Received,
    Normalized,
    Scored,
    Aggregated,
    FeedbackAttached,
    Done,
}

impl PipelineStage {
    fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Received => "received",
            PipelineStage::Normalized => "normalized",
            PipelineStage::Scored => "scored",
            PipelineStage::Aggregated => "aggregated",
            PipelineStage::FeedbackAttached => "feedback_attached",
            PipelineStage::Done => "done",
        }
    }
}

fn enter(stage: PipelineStage, interview_id: &str, candidate_id: &str) {
    tracing::debug!(interview_id, candidate_id, stage = stage.as_str(), "Pipeline stage reached");
}

/// Inputs for one run of the scoring pipeline.
pub struct PipelineInput<'a> {
    pub interview_id: &'a str,
    pub candidate_id: &'a str,
    pub candidate_name: &'a str,
    pub raw: &'a RawSubmission,
    pub questions: &'a [Question],
    /// Declared interview format; inferred from the answers when absent.
    pub format: Option<InterviewFormat>,
}

#[derive(Clone)]
pub struct ResultService {
    questions: QuestionService,
    submissions: Arc<dyn SubmissionStore>,
    results: Arc<dyn ResultStore>,
    feedback: FeedbackService,
    batch_concurrency: usize,
}

impl ResultService {
    pub fn new(
        questions: QuestionService,
        submissions: Arc<dyn SubmissionStore>,
        results: Arc<dyn ResultStore>,
        feedback: FeedbackService,
        batch_concurrency: usize,
    ) -> Self {
        Self {
            questions,
            submissions,
            results,
            feedback,
            batch_concurrency: batch_concurrency.max(1),
        }
    }

    /// Runs every stage in order. An empty submission still reaches `Done`
    /// with zero scores and fallback feedback.
    pub async fn run_pipeline(&self, input: PipelineInput<'_>) -> InterviewAnalytics {
        let PipelineInput {
            interview_id,
            candidate_id,
            candidate_name,
            raw,
            questions,
            format,
        } = input;
        enter(PipelineStage::Received, interview_id, candidate_id);

        let default_kind = format.and_then(|f| f.single_kind());
        let records = NormalizerService::normalize_with_default(raw, questions, default_kind);
        enter(PipelineStage::Normalized, interview_id, candidate_id);

        let scored = GradingService::score_all(&records);
        enter(PipelineStage::Scored, interview_id, candidate_id);

        let format = format.unwrap_or_else(|| AggregateService::infer_format(&scored));
        let composite = AggregateService::aggregate_for(&scored, format);
        enter(PipelineStage::Aggregated, interview_id, candidate_id);

        let feedback = self
            .feedback
            .synthesize(&composite, &scored, candidate_name)
            .await;
        enter(PipelineStage::FeedbackAttached, interview_id, candidate_id);

        let analytics = InterviewAnalytics {
            id: Uuid::new_v4(),
            interview_id: interview_id.to_string(),
            candidate_id: candidate_id.to_string(),
            candidate_name: candidate_name.to_string(),
            format,
            answers: scored,
            composite,
            feedback,
            generated_at: Utc::now(),
        };
        enter(PipelineStage::Done, interview_id, candidate_id);
        analytics
    }

    /// Loads the stored submission and question set, then runs the pipeline.
    /// Only a failing storage read is an error; a missing submission scores
    /// as an empty one.
    pub async fn analyze(
        &self,
        interview_id: &str,
        candidate_id: &str,
        candidate_name: Option<&str>,
    ) -> Result<InterviewAnalytics> {
        let record = self
            .submissions
            .get_raw_feedback(interview_id, candidate_id)
            .await?;

        let (raw, stored_name, format) = match &record {
            Some(record) => (
                RawSubmission::detect(&record.raw),
                record.candidate_name.as_deref(),
                record.interview_type.as_deref().and_then(InterviewFormat::parse),
            ),
            None => {
                tracing::info!(interview_id, candidate_id, "No stored submission, scoring as empty");
                (RawSubmission::Empty, None, None)
            }
        };
        tracing::debug!(
            interview_id,
            candidate_id,
            shape = raw.shape_name(),
            entries = raw.entry_count(),
            "Submission shape detected"
        );

        let questions = self.questions.resolve(interview_id).await;
        let candidate_name = candidate_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .or(stored_name)
            .unwrap_or(DEFAULT_CANDIDATE_NAME);

        Ok(self
            .run_pipeline(PipelineInput {
                interview_id,
                candidate_id,
                candidate_name,
                raw: &raw,
                questions: &questions,
                format,
            })
            .await)
    }

    pub async fn score_interview(
        &self,
        interview_id: &str,
        candidate_id: &str,
        candidate_name: Option<&str>,
        persist: bool,
    ) -> Result<InterviewAnalytics> {
        let analytics = self.analyze(interview_id, candidate_id, candidate_name).await?;

        if persist {
            if let Err(e) = self
                .results
                .upsert(interview_id, candidate_id, &analytics.composite, &analytics.feedback)
                .await
            {
                tracing::error!(interview_id, candidate_id, error = ?e, "Failed to persist interview report");
                return Err(e);
            }
        }

        tracing::info!(
            interview_id,
            candidate_id,
            overall_score = analytics.composite.overall_score,
            completion_rate = analytics.composite.completion_rate,
            feedback_source = ?analytics.feedback.source,
            persisted = persist,
            "Interview scored"
        );
        Ok(analytics)
    }

    pub async fn get_report(&self, interview_id: &str, candidate_id: &str) -> Result<StoredReport> {
        self.results
            .get(interview_id, candidate_id)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "No report for candidate {} in interview {}",
                    candidate_id, interview_id
                ))
            })
    }

    /// Scores candidates concurrently. Results come back in input order.
    pub async fn score_batch(
        &self,
        interview_id: &str,
        candidate_ids: &[String],
        persist: bool,
    ) -> Vec<CandidateOutcome> {
        let futs = candidate_ids
            .iter()
            .cloned()
            .enumerate()
            .map(move |(position, candidate_id)| async move {
                let outcome = match self
                    .score_interview(interview_id, &candidate_id, None, persist)
                    .await
                {
                    Ok(analytics) => CandidateOutcome {
                        candidate_id,
                        status: OutcomeStatus::Scored,
                        analytics: Some(analytics),
                        error: None,
                    },
                    Err(e) => {
                        tracing::warn!(interview_id, candidate_id = %candidate_id, error = ?e, "Batch entry failed");
                        CandidateOutcome {
                            candidate_id,
                            status: OutcomeStatus::Failed,
                            analytics: None,
                            error: Some(e.to_string()),
                        }
                    }
                };
                (position, outcome)
            });

        let mut outcomes: Vec<(usize, CandidateOutcome)> = stream::iter(futs)
            .buffer_unordered(self.batch_concurrency)
            .collect()
            .await;
        outcomes.sort_by_key(|(position, _)| *position);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }

    pub async fn score_all_candidates(
        &self,
        interview_id: &str,
        persist: bool,
    ) -> Result<Vec<CandidateOutcome>> {
        let candidate_ids = self.submissions.list_candidates(interview_id).await?;
        tracing::info!(interview_id, candidates = candidate_ids.len(), "Scoring interview batch");
        Ok(self.score_batch(interview_id, &candidate_ids, persist).await)
    }
}
