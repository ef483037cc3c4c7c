use crate::models::answer::{AnswerRecord, MatchQuality, ScoredAnswer};
use crate::models::question::QuestionKind;
use crate::utils::choice;
use once_cell::sync::Lazy;
use regex::Regex;

/// Coding verdicts at or above this count as passing.
pub const CODING_PASS_SCORE: u8 = 70;

const LENGTH_POINTS_CAP: usize = 40;
const EXAMPLE_POINTS: usize = 30;
const STRUCTURE_POINTS: usize = 30;

static EXAMPLE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(for example|example|for instance|instance|time when|situation)\b")
        .expect("valid example marker pattern")
});

static STRUCTURE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(first|firstly|second|then|next|finally|because|therefore|as a result|so that|which led)\b")
        .expect("valid structure marker pattern")
});

pub struct GradingService;

impl GradingService {
    /// Dispatches on the answer kind; unanswered records always score 0.
    pub fn score(record: &AnswerRecord) -> ScoredAnswer {
        if !record.is_answered() {
            return Self::unanswered(record);
        }
        match record.kind {
            QuestionKind::Behavioral => Self::score_behavioral(record),
            QuestionKind::Mcq => Self::score_mcq(record),
            QuestionKind::Coding => Self::score_coding(record),
        }
    }

    pub fn score_all(records: &[AnswerRecord]) -> Vec<ScoredAnswer> {
        records.iter().map(Self::score).collect()
    }

    fn unanswered(record: &AnswerRecord) -> ScoredAnswer {
        let is_correct = match record.kind {
            QuestionKind::Behavioral => None,
            QuestionKind::Mcq | QuestionKind::Coding => Some(false),
        };
        ScoredAnswer {
            record: record.clone(),
            score: 0,
            is_correct,
            evidence: vec!["unanswered".to_string()],
            match_quality: MatchQuality::Poor,
        }
    }

    /// Length up to 40 points, plus 30 for a concrete example and 30 for
    /// sequencing or causal structure.
    fn score_behavioral(record: &AnswerRecord) -> ScoredAnswer {
        let text = record.answer_text().unwrap_or_default();
        let trimmed = text.trim();
        let length = trimmed.chars().count();

        let mut evidence = Vec::new();
        let length_points = (length / 10).min(LENGTH_POINTS_CAP);
        evidence.push(format!("length: {} chars (+{})", length, length_points));

        let mut total = length_points;
        if let Some(m) = EXAMPLE_MARKER.find(trimmed) {
            total += EXAMPLE_POINTS;
            evidence.push(format!("example marker: \"{}\"", m.as_str().to_lowercase()));
        }
        if let Some(m) = STRUCTURE_MARKER.find(trimmed) {
            total += STRUCTURE_POINTS;
            evidence.push(format!("structure marker: \"{}\"", m.as_str().to_lowercase()));
        }

        let score = total.min(100) as u8;
        ScoredAnswer {
            record: record.clone(),
            score,
            is_correct: None,
            evidence,
            match_quality: MatchQuality::from_score(score),
        }
    }

    fn score_mcq(record: &AnswerRecord) -> ScoredAnswer {
        let options = record.options.as_deref();
        let given = choice::token_from_json(&record.raw_answer_value);

        let (score, is_correct, evidence) = match (given, record.correct_answer.as_deref()) {
            (Some(given), Some(correct)) => {
                let matched = choice::choice_key(&given, options) == choice::choice_key(correct, options);
                let shown_correct = record
                    .display_correct_answer
                    .clone()
                    .unwrap_or_else(|| correct.to_string());
                let note = if matched {
                    format!("correct: {}", shown_correct)
                } else {
                    format!(
                        "selected {} but expected {}",
                        record.display_answer.clone().unwrap_or(given),
                        shown_correct
                    )
                };
                (if matched { 100 } else { 0 }, Some(matched), vec![note])
            }
            (Some(_), None) => (0, None, vec!["no correct answer on record".to_string()]),
            (None, _) => (0, Some(false), vec!["selection is not a choice token".to_string()]),
        };

        ScoredAnswer {
            record: record.clone(),
            score,
            is_correct,
            evidence,
            match_quality: if is_correct == Some(true) {
                MatchQuality::Excellent
            } else {
                MatchQuality::Poor
            },
        }
    }

    /// Consumes the upstream judge's verdict; source code is not re-evaluated.
    fn score_coding(record: &AnswerRecord) -> ScoredAnswer {
        let mut evidence = Vec::new();
        let score = match (record.recorded_score, record.solved) {
            (Some(recorded), _) => {
                evidence.push(format!("recorded score: {}", recorded));
                recorded.round().clamp(0.0, 100.0) as u8
            }
            (None, Some(true)) => {
                evidence.push("marked solved".to_string());
                100
            }
            (None, solved) => {
                evidence.push(if solved == Some(false) {
                    "marked unsolved".to_string()
                } else {
                    "no verdict recorded".to_string()
                });
                0
            }
        };
        if let Some(language) = &record.language {
            evidence.push(format!("language: {}", language));
        }

        ScoredAnswer {
            record: record.clone(),
            score,
            is_correct: Some(score >= CODING_PASS_SCORE),
            evidence,
            match_quality: MatchQuality::from_score(score),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value as JsonValue};

    fn record(kind: QuestionKind, value: JsonValue) -> AnswerRecord {
        AnswerRecord {
            question_index: 0,
            question_text: "Question 1".into(),
            kind,
            raw_answer_value: value,
            time_spent_seconds: 30,
            language: None,
            options: None,
            correct_answer: None,
            display_answer: None,
            display_correct_answer: None,
            recorded_score: None,
            solved: None,
        }
    }

    fn mcq(answer: &str, correct: &str) -> AnswerRecord {
        AnswerRecord {
            correct_answer: Some(correct.to_string()),
            ..record(QuestionKind::Mcq, json!(answer))
        }
    }

    #[test]
    fn behavioral_markers_raise_the_score() {
        let with_markers = "For example I first mapped the outage because alerts were noisy.";
        let plain = "I worked on the outage and we eventually got it sorted out fully";
        assert_eq!(with_markers.len(), plain.len());

        let rich = GradingService::score(&record(QuestionKind::Behavioral, json!(with_markers)));
        let bare = GradingService::score(&record(QuestionKind::Behavioral, json!(plain)));
        assert!(rich.score > bare.score);
        assert_eq!(rich.score - bare.score, 60);
        assert!(rich.evidence.iter().any(|e| e.contains("example marker")));
    }

    #[test]
    fn behavioral_length_is_capped() {
        let long = "word ".repeat(200);
        let scored = GradingService::score(&record(QuestionKind::Behavioral, json!(long)));
        assert_eq!(scored.score, 40);
        assert_eq!(scored.match_quality, MatchQuality::Fair);
    }

    #[test]
    fn mcq_is_case_insensitive() {
        let right = GradingService::score(&mcq("b", "B"));
        assert_eq!(right.score, 100);
        assert_eq!(right.is_correct, Some(true));

        let wrong = GradingService::score(&mcq("b", "c"));
        assert_eq!(wrong.score, 0);
        assert_eq!(wrong.is_correct, Some(false));
    }

    #[test]
    fn mcq_ignores_rendered_suffix() {
        let scored = GradingService::score(&mcq("2. Berlin", "b"));
        assert_eq!(scored.score, 100);
    }

    #[test]
    fn coding_prefers_recorded_score() {
        let mut rec = record(QuestionKind::Coding, json!("fn main() {}"));
        rec.recorded_score = Some(85.0);
        rec.solved = Some(false);
        let scored = GradingService::score(&rec);
        assert_eq!(scored.score, 85);
        assert_eq!(scored.is_correct, Some(true));

        let mut solved = record(QuestionKind::Coding, json!("fn main() {}"));
        solved.solved = Some(true);
        assert_eq!(GradingService::score(&solved).score, 100);

        let unknown = record(QuestionKind::Coding, json!("fn main() {}"));
        assert_eq!(GradingService::score(&unknown).score, 0);
    }

    #[test]
    fn unanswered_scores_zero_for_every_kind() {
        for kind in QuestionKind::ALL {
            let mut rec = record(kind, JsonValue::Null);
            rec.recorded_score = Some(90.0);
            rec.correct_answer = Some("a".into());
            let scored = GradingService::score(&rec);
            assert_eq!(scored.score, 0);
            assert_eq!(scored.match_quality, MatchQuality::Poor);
        }
    }
}
