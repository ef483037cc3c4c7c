use crate::models::question::QuestionKind;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Canonical unit produced by the normalizer. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub question_index: usize,
    pub question_text: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    /// The submitted value exactly as received. `null` means unanswered.
    pub raw_answer_value: JsonValue,
    pub time_spent_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_correct_answer: Option<String>,
    /// Verdict recorded upstream by the coding judge, 0..=100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solved: Option<bool>,
}

impl AnswerRecord {
    pub fn is_answered(&self) -> bool {
        match &self.raw_answer_value {
            JsonValue::Null => false,
            JsonValue::String(s) => !s.trim().is_empty(),
            JsonValue::Array(items) => !items.is_empty(),
            JsonValue::Object(map) => !map.is_empty(),
            _ => true,
        }
    }

    /// Textual view of the answer for heuristics and prompts.
    pub fn answer_text(&self) -> Option<String> {
        if !self.is_answered() {
            return None;
        }
        match &self.raw_answer_value {
            JsonValue::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MatchQuality {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl MatchQuality {
    pub fn from_score(score: u8) -> Self {
        match score {
            85..=u8::MAX => MatchQuality::Excellent,
            70..=84 => MatchQuality::Good,
            40..=69 => MatchQuality::Fair,
            _ => MatchQuality::Poor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredAnswer {
    #[serde(flatten)]
    pub record: AnswerRecord,
    pub score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
    pub evidence: Vec<String>,
    pub match_quality: MatchQuality,
}

impl ScoredAnswer {
    pub fn kind(&self) -> QuestionKind {
        self.record.kind
    }

    pub fn is_answered(&self) -> bool {
        self.record.is_answered()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: JsonValue) -> AnswerRecord {
        AnswerRecord {
            question_index: 0,
            question_text: "Question 1".into(),
            kind: QuestionKind::Behavioral,
            raw_answer_value: value,
            time_spent_seconds: 0,
            language: None,
            options: None,
            correct_answer: None,
            display_answer: None,
            display_correct_answer: None,
            recorded_score: None,
            solved: None,
        }
    }

    #[test]
    fn blank_strings_are_unanswered() {
        assert!(!record(json!(null)).is_answered());
        assert!(!record(json!("   ")).is_answered());
        assert!(record(json!("b")).is_answered());
        assert!(record(json!(0)).is_answered());
    }

    #[test]
    fn match_quality_thresholds() {
        assert_eq!(MatchQuality::from_score(100), MatchQuality::Excellent);
        assert_eq!(MatchQuality::from_score(70), MatchQuality::Good);
        assert_eq!(MatchQuality::from_score(69), MatchQuality::Fair);
        assert_eq!(MatchQuality::from_score(0), MatchQuality::Poor);
    }
}
