use crate::models::answer::ScoredAnswer;
use crate::models::question::QuestionKind;
use crate::models::result::{CompositeResult, FeedbackReport, FeedbackSource, SectionFeedback};
use crate::services::ai_service::FeedbackGenerator;
use crate::utils::json::{first_object_span, parse_model_json, strip_code_fences};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

const REFUSAL_PHRASES: &[&str] = &[
    "i'm sorry",
    "i am sorry",
    "i cannot",
    "i can't",
    "unable to",
    "as an ai",
];
const ANSWER_PREVIEW_CHARS: usize = 300;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FeedbackRejection {
    #[error("response contains a refusal")]
    Refusal,
    #[error("no parseable JSON object in response")]
    NoJson,
    #[error("response JSON does not match the feedback shape: {0}")]
    Shape(String),
    #[error("response is missing {0}")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceTier {
    Good,
    Average,
    NeedsImprovement,
}

impl PerformanceTier {
    pub fn from_score(score: u8) -> Self {
        match score {
            70..=u8::MAX => PerformanceTier::Good,
            50..=69 => PerformanceTier::Average,
            _ => PerformanceTier::NeedsImprovement,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            PerformanceTier::Good => "good",
            PerformanceTier::Average => "average",
            PerformanceTier::NeedsImprovement => "in need of improvement",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelFeedback {
    #[serde(default, alias = "overall_performance", alias = "summary")]
    overall_performance: Option<String>,
    #[serde(default)]
    strengths: Option<Vec<JsonValue>>,
    #[serde(default, alias = "areasForImprovement", alias = "areas_for_improvement", alias = "weaknesses")]
    improvements: Option<Vec<JsonValue>>,
    #[serde(default, alias = "section_feedback", alias = "sections")]
    section_feedback: Option<Vec<JsonValue>>,
}

/// Builds qualitative feedback through the external generator, falling back
/// to a deterministic report whenever that step fails.
#[derive(Clone)]
pub struct FeedbackService {
    generator: Arc<dyn FeedbackGenerator>,
    timeout: Duration,
    max_questions: usize,
}

impl FeedbackService {
    pub fn new(generator: Arc<dyn FeedbackGenerator>, timeout: Duration, max_questions: usize) -> Self {
        Self {
            generator,
            timeout,
            max_questions,
        }
    }

    pub async fn synthesize(
        &self,
        composite: &CompositeResult,
        scored: &[ScoredAnswer],
        candidate_name: &str,
    ) -> FeedbackReport {
        let prompt = Self::build_prompt(composite, scored, candidate_name, self.max_questions);

        let outcome = tokio::time::timeout(self.timeout, self.generator.generate(&prompt)).await;
        let text = match outcome {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::warn!(error = ?e, "Feedback generation failed, using fallback feedback");
                return Self::fallback(composite, candidate_name);
            }
            Err(_) => {
                tracing::warn!(timeout_secs = self.timeout.as_secs_f64(), "Feedback generation timed out, using fallback feedback");
                return Self::fallback(composite, candidate_name);
            }
        };

        match Self::parse_report(&text, composite) {
            Ok(report) => report,
            Err(reason) => {
                tracing::warn!(%reason, "Discarding generated feedback, using fallback feedback");
                Self::fallback(composite, candidate_name)
            }
        }
    }

    pub fn build_prompt(
        composite: &CompositeResult,
        scored: &[ScoredAnswer],
        candidate_name: &str,
        max_questions: usize,
    ) -> String {
        let mut prompt = String::new();
        let _ = writeln!(prompt, "Candidate: {}", candidate_name);
        let _ = writeln!(prompt, "Interview metrics:");
        let _ = writeln!(prompt, "- Overall score: {}/100", composite.overall_score);
        let _ = writeln!(
            prompt,
            "- Completion rate: {}% ({} of {} questions answered)",
            composite.completion_rate, composite.answered_questions, composite.total_questions
        );
        let _ = writeln!(prompt, "- Accuracy on multiple choice and coding: {}%", composite.accuracy);

        let _ = writeln!(prompt, "Sections:");
        for (kind, summary) in composite.present_sections() {
            let _ = writeln!(
                prompt,
                "- {}: average {}/100, {} of {} answered, {}s spent",
                kind.label(),
                summary.average_score,
                summary.answered_questions,
                summary.total_questions,
                summary.time_spent_seconds
            );
        }

        let shown = scored.len().min(max_questions);
        let _ = writeln!(prompt, "Answers (showing {} of {}):", shown, scored.len());
        for answer in scored.iter().take(max_questions) {
            let record = &answer.record;
            let answer_text = record
                .display_answer
                .clone()
                .or_else(|| record.answer_text())
                .map(|t| preview(&t, ANSWER_PREVIEW_CHARS))
                .unwrap_or_else(|| "(no answer)".to_string());
            let _ = writeln!(
                prompt,
                "{}. [{}] Q: {} | A: {} | score {}/100 | {}",
                record.question_index + 1,
                record.kind.as_str(),
                preview(&record.question_text, ANSWER_PREVIEW_CHARS),
                answer_text,
                answer.score,
                answer.evidence.join("; ")
            );
        }
        prompt
    }

    /// Validates untrusted generator output into a complete report.
    pub fn parse_report(
        text: &str,
        composite: &CompositeResult,
    ) -> std::result::Result<FeedbackReport, FeedbackRejection> {
        // Only prose around the JSON object can be a refusal; report text
        // such as "was unable to finish" is legitimate content.
        let cleaned = strip_code_fences(text);
        let surrounding = match first_object_span(&cleaned) {
            Some(span) => cleaned.replacen(span, " ", 1),
            None => cleaned.clone(),
        };
        if is_refusal(&surrounding) {
            return Err(FeedbackRejection::Refusal);
        }

        let value = parse_model_json(text).ok_or(FeedbackRejection::NoJson)?;
        let parsed: ModelFeedback =
            serde_json::from_value(value).map_err(|e| FeedbackRejection::Shape(e.to_string()))?;

        let overall_performance = parsed
            .overall_performance
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(FeedbackRejection::Missing("overallPerformance"))?;
        let strengths = non_empty_strings(parsed.strengths).ok_or(FeedbackRejection::Missing("strengths"))?;
        let improvements =
            non_empty_strings(parsed.improvements).ok_or(FeedbackRejection::Missing("improvements"))?;

        let section_feedback: Vec<SectionFeedback> = parsed
            .section_feedback
            .unwrap_or_default()
            .iter()
            .filter_map(section_entry)
            .collect();
        if section_feedback.is_empty() && composite.present_sections().next().is_some() {
            return Err(FeedbackRejection::Missing("sectionFeedback"));
        }

        Ok(FeedbackReport {
            overall_performance,
            strengths,
            improvements,
            section_feedback,
            source: FeedbackSource::Ai,
        })
    }

    /// Deterministic report derived from the composite metrics alone.
    pub fn fallback(composite: &CompositeResult, candidate_name: &str) -> FeedbackReport {
        let tier = PerformanceTier::from_score(composite.overall_score);

        let overall_performance = if composite.total_questions == 0 {
            format!(
                "No answers were recorded for {}, so the interview could not be assessed. The overall score is 0/100.",
                candidate_name
            )
        } else {
            format!(
                "{} answered {} of {} questions ({}% completion) and achieved an overall score of {}/100, which is {}.",
                candidate_name,
                composite.answered_questions,
                composite.total_questions,
                composite.completion_rate,
                composite.overall_score,
                tier.describe()
            )
        };

        let mut strengths: Vec<String> = match tier {
            PerformanceTier::Good => vec![
                "Consistently strong performance across the interview".to_string(),
                "Clear command of the assessed material".to_string(),
            ],
            PerformanceTier::Average => vec![
                "Solid grasp of the core concepts".to_string(),
                "Reasonable performance in several areas".to_string(),
            ],
            PerformanceTier::NeedsImprovement => vec![
                "Took part in the interview process".to_string(),
                "Has a foundation that can be built on with focused practice".to_string(),
            ],
        };
        let mut improvements: Vec<String> = match tier {
            PerformanceTier::Good => vec![
                "Add more depth and concrete detail to move answers from good to excellent".to_string(),
            ],
            PerformanceTier::Average => vec![
                "Improve consistency across the interview sections".to_string(),
                "Structure answers around concrete examples".to_string(),
            ],
            PerformanceTier::NeedsImprovement => vec![
                "Review the fundamentals covered in this interview".to_string(),
                "Practise answering with specific examples and clear reasoning".to_string(),
            ],
        };

        if composite.total_questions > 0 && composite.completion_rate >= 90 {
            strengths.push("Answered nearly every question".to_string());
        }
        let unanswered = composite
            .total_questions
            .saturating_sub(composite.answered_questions);
        if unanswered > 0 {
            improvements.push(format!("Answer every question; {} were left blank", unanswered));
        }
        for (kind, summary) in composite.present_sections() {
            match PerformanceTier::from_score(summary.average_score) {
                PerformanceTier::Good => strengths.push(format!(
                    "Strong {} section ({}/100)",
                    kind.label().to_lowercase(),
                    summary.average_score
                )),
                PerformanceTier::NeedsImprovement => improvements.push(format!(
                    "Focus on the {} section ({}/100)",
                    kind.label().to_lowercase(),
                    summary.average_score
                )),
                PerformanceTier::Average => {}
            }
        }

        let section_feedback = composite
            .present_sections()
            .map(|(kind, summary)| {
                let (feedback, recommendation) =
                    section_template(kind, PerformanceTier::from_score(summary.average_score));
                SectionFeedback {
                    section: kind.label().to_string(),
                    feedback: format!(
                        "{} Section score {}/100 with {} of {} answered.",
                        feedback, summary.average_score, summary.answered_questions, summary.total_questions
                    ),
                    recommendation: recommendation.to_string(),
                }
            })
            .collect();

        FeedbackReport {
            overall_performance,
            strengths,
            improvements,
            section_feedback,
            source: FeedbackSource::Fallback,
        }
    }
}

fn section_template(kind: QuestionKind, tier: PerformanceTier) -> (&'static str, &'static str) {
    match (kind, tier) {
        (QuestionKind::Behavioral, PerformanceTier::Good) => (
            "Answers were well structured and grounded in concrete examples.",
            "Keep using the situation-task-action-result format and quantify outcomes where possible.",
        ),
        (QuestionKind::Behavioral, PerformanceTier::Average) => (
            "Answers covered the basics but often lacked specific examples or a clear structure.",
            "Frame each answer as situation, task, action and result.",
        ),
        (QuestionKind::Behavioral, PerformanceTier::NeedsImprovement) => (
            "Answers were brief or missing concrete examples.",
            "Prepare several real stories in advance and practise telling them step by step.",
        ),
        (QuestionKind::Mcq, PerformanceTier::Good) => (
            "Strong accuracy on the knowledge questions.",
            "Move on to more advanced material in the same areas.",
        ),
        (QuestionKind::Mcq, PerformanceTier::Average) => (
            "Mixed accuracy on the knowledge questions.",
            "Review the topics behind the missed questions.",
        ),
        (QuestionKind::Mcq, PerformanceTier::NeedsImprovement) => (
            "Low accuracy on the knowledge questions.",
            "Revisit the core concepts before attempting a similar assessment.",
        ),
        (QuestionKind::Coding, PerformanceTier::Good) => (
            "The coding work met most of the evaluation criteria.",
            "Polish solutions further with attention to edge cases and readability.",
        ),
        (QuestionKind::Coding, PerformanceTier::Average) => (
            "The coding solution was partially successful.",
            "Practise similar problems and test against edge cases before submitting.",
        ),
        (QuestionKind::Coding, PerformanceTier::NeedsImprovement) => (
            "The coding task was not solved to the expected standard.",
            "Work through algorithm and data structure exercises regularly.",
        ),
    }
}

fn is_refusal(text: &str) -> bool {
    let lowered = text.to_lowercase().replace('\u{2019}', "'");
    REFUSAL_PHRASES.iter().any(|p| lowered.contains(p))
}

fn non_empty_strings(items: Option<Vec<JsonValue>>) -> Option<Vec<String>> {
    let list: Vec<String> = items?
        .iter()
        .filter_map(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    (!list.is_empty()).then_some(list)
}

fn section_entry(value: &JsonValue) -> Option<SectionFeedback> {
    let field = |key: &str| {
        value
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    Some(SectionFeedback {
        section: field("section")?,
        feedback: field("feedback")?,
        recommendation: field("recommendation")?,
    })
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::result::SectionSummary;
    use crate::services::ai_service::MockFeedbackGenerator;
    use std::collections::BTreeMap;

    fn composite() -> CompositeResult {
        let mut sections = BTreeMap::new();
        sections.insert(
            QuestionKind::Behavioral,
            SectionSummary {
                total_questions: 2,
                answered_questions: 1,
                average_score: 45,
                time_spent_seconds: 300,
            },
        );
        sections.insert(
            QuestionKind::Coding,
            SectionSummary {
                total_questions: 1,
                answered_questions: 1,
                average_score: 85,
                time_spent_seconds: 900,
            },
        );
        CompositeResult {
            overall_score: 48,
            section_summaries: sections,
            completion_rate: 67,
            accuracy: 100,
            total_questions: 3,
            answered_questions: 2,
        }
    }

    fn service(generator: MockFeedbackGenerator) -> FeedbackService {
        FeedbackService::new(Arc::new(generator), Duration::from_millis(200), 10)
    }

    const GOOD_RESPONSE: &str = r#"```json
{
  "overallPerformance": "Promising but uneven.",
  "strengths": ["Solid coding"],
  "improvements": ["Use concrete examples",],
  "sectionFeedback": [
    {"section": "Coding", "feedback": "Clean solution.", "recommendation": "Add tests."},
  ]
}
```"#;

    #[tokio::test]
    async fn uses_generated_feedback_when_valid() {
        let mut generator = MockFeedbackGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_| Ok(GOOD_RESPONSE.to_string()));

        let report = service(generator).synthesize(&composite(), &[], "Alice").await;
        assert_eq!(report.source, FeedbackSource::Ai);
        assert_eq!(report.strengths, vec!["Solid coding".to_string()]);
        assert_eq!(report.section_feedback.len(), 1);
    }

    #[tokio::test]
    async fn generator_error_falls_back_with_every_field() {
        let mut generator = MockFeedbackGenerator::new();
        generator
            .expect_generate()
            .returning(|_| Err(Error::Generator("boom".into())));

        let report = service(generator).synthesize(&composite(), &[], "Alice").await;
        assert_eq!(report.source, FeedbackSource::Fallback);
        assert!(!report.overall_performance.is_empty());
        assert!(!report.strengths.is_empty());
        assert!(!report.improvements.is_empty());
        let sections: Vec<&str> = report.section_feedback.iter().map(|s| s.section.as_str()).collect();
        assert_eq!(sections, vec!["Behavioral", "Coding"]);
    }

    #[test]
    fn refusals_are_discarded() {
        let text = "I'm sorry, but I cannot evaluate this candidate.";
        assert_eq!(
            FeedbackService::parse_report(text, &composite()),
            Err(FeedbackRejection::Refusal)
        );
    }

    #[test]
    fn incomplete_json_is_discarded() {
        let text = r#"{"overallPerformance": "Fine", "strengths": [], "improvements": ["x"]}"#;
        assert_eq!(
            FeedbackService::parse_report(text, &composite()),
            Err(FeedbackRejection::Missing("strengths"))
        );
        assert_eq!(
            FeedbackService::parse_report("plain prose only", &composite()),
            Err(FeedbackRejection::NoJson)
        );
    }

    #[test]
    fn fallback_tiers_follow_overall_score() {
        assert_eq!(PerformanceTier::from_score(70), PerformanceTier::Good);
        assert_eq!(PerformanceTier::from_score(50), PerformanceTier::Average);
        assert_eq!(PerformanceTier::from_score(49), PerformanceTier::NeedsImprovement);

        let report = FeedbackService::fallback(&composite(), "Alice");
        assert!(report.overall_performance.contains("in need of improvement"));
        assert!(report.improvements.iter().any(|i| i.contains("1 were left blank")));
        assert!(report.strengths.iter().any(|s| s.contains("coding section")));
    }

    #[test]
    fn fallback_for_empty_submission_is_complete() {
        let report = FeedbackService::fallback(&CompositeResult::default(), "Bob");
        assert!(!report.strengths.is_empty());
        assert!(!report.improvements.is_empty());
        assert!(report.section_feedback.is_empty());
    }

    fn scored_behavioral(index: usize) -> ScoredAnswer {
        use crate::models::answer::{AnswerRecord, MatchQuality};
        ScoredAnswer {
            record: AnswerRecord {
                question_index: index,
                question_text: format!("Behavioral prompt {}", index + 1),
                kind: QuestionKind::Behavioral,
                raw_answer_value: serde_json::json!("An answer"),
                time_spent_seconds: 30,
                language: None,
                options: None,
                correct_answer: None,
                display_answer: None,
                display_correct_answer: None,
                recorded_score: None,
                solved: None,
            },
            score: 40,
            is_correct: None,
            evidence: vec!["length: 9 chars (+0)".to_string()],
            match_quality: MatchQuality::Fair,
        }
    }

    #[test]
    fn prompt_limits_per_question_summaries() {
        let scored: Vec<ScoredAnswer> = (0..5).map(scored_behavioral).collect();
        let prompt = FeedbackService::build_prompt(&composite(), &scored, "Alice", 2);
        assert!(prompt.contains("Candidate: Alice"));
        assert!(prompt.contains("Behavioral: average 45/100"));
        assert!(prompt.contains("showing 2 of 5"));

        let question_lines = prompt.lines().filter(|l| l.contains("] Q: ")).count();
        assert_eq!(question_lines, 2);
        assert!(prompt.contains("Behavioral prompt 2"));
        assert!(!prompt.contains("Behavioral prompt 3"));
    }

    #[test]
    fn fallback_tolerates_inconsistent_counts() {
        let composite = CompositeResult {
            total_questions: 1,
            answered_questions: 2,
            ..CompositeResult::default()
        };
        let report = FeedbackService::fallback(&composite, "Eve");
        assert!(!report.improvements.iter().any(|i| i.contains("left blank")));
        assert!(!report.strengths.is_empty());
    }

    #[test]
    fn refusal_words_inside_the_report_are_accepted() {
        let text = r#"{"overallPerformance": "The candidate was unable to finish the task.",
            "strengths": ["Clear communication"],
            "improvements": ["I can't stress enough: practise timed problems"],
            "sectionFeedback": [{"section": "Coding", "feedback": "Incomplete.", "recommendation": "Practise."}]}"#;
        let report = FeedbackService::parse_report(text, &composite()).unwrap();
        assert_eq!(report.source, FeedbackSource::Ai);
        assert!(report.overall_performance.contains("unable to finish"));

        let wrapped = format!("I'm sorry, I cannot help with that. {}", text);
        assert_eq!(
            FeedbackService::parse_report(&wrapped, &composite()),
            Err(FeedbackRejection::Refusal)
        );
    }
}
