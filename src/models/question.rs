use serde::{Deserialize, Serialize};

/// The three answer kinds the engine knows how to score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Behavioral,
    Mcq,
    Coding,
}

impl QuestionKind {
    pub const ALL: [QuestionKind; 3] = [
        QuestionKind::Behavioral,
        QuestionKind::Mcq,
        QuestionKind::Coding,
    ];

    /// Lenient parse of the type strings found across stored question sets
    /// and submissions.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().replace(&['-', ' '][..], "_").as_str() {
            "behavioral" | "behavioural" | "behavior" | "soft_skills" | "short_answer" | "text"
            | "open" | "open_ended" => Some(QuestionKind::Behavioral),
            "mcq" | "multiple_choice" | "multiplechoice" | "choice" | "quiz" => {
                Some(QuestionKind::Mcq)
            }
            "coding" | "code" | "technical" | "programming" => Some(QuestionKind::Coding),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::Behavioral => "behavioral",
            QuestionKind::Mcq => "mcq",
            QuestionKind::Coding => "coding",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuestionKind::Behavioral => "Behavioral",
            QuestionKind::Mcq => "Multiple choice",
            QuestionKind::Coding => "Coding",
        }
    }

    /// Weight of this section in a combo interview's overall score.
    pub fn combo_weight(&self) -> f64 {
        match self {
            QuestionKind::Behavioral => 0.3,
            QuestionKind::Mcq => 0.3,
            QuestionKind::Coding => 0.4,
        }
    }
}

/// A question from the interview definition, addressed by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub index: usize,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewFormat {
    Behavioral,
    Mcq,
    Coding,
    Combo,
}

impl InterviewFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_lowercase();
        if matches!(lowered.as_str(), "combo" | "combined" | "mixed" | "full") {
            return Some(InterviewFormat::Combo);
        }
        QuestionKind::parse(&lowered).map(InterviewFormat::from)
    }

    pub fn single_kind(&self) -> Option<QuestionKind> {
        match self {
            InterviewFormat::Behavioral => Some(QuestionKind::Behavioral),
            InterviewFormat::Mcq => Some(QuestionKind::Mcq),
            InterviewFormat::Coding => Some(QuestionKind::Coding),
            InterviewFormat::Combo => None,
        }
    }
}

impl From<QuestionKind> for InterviewFormat {
    fn from(kind: QuestionKind) -> Self {
        match kind {
            QuestionKind::Behavioral => InterviewFormat::Behavioral,
            QuestionKind::Mcq => InterviewFormat::Mcq,
            QuestionKind::Coding => InterviewFormat::Coding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_legacy_type_names() {
        assert_eq!(QuestionKind::parse("multiple_choice"), Some(QuestionKind::Mcq));
        assert_eq!(QuestionKind::parse("Multiple-Choice"), Some(QuestionKind::Mcq));
        assert_eq!(QuestionKind::parse("code"), Some(QuestionKind::Coding));
        assert_eq!(QuestionKind::parse("Behavioural"), Some(QuestionKind::Behavioral));
        assert_eq!(QuestionKind::parse("essay-grid"), None);
    }

    #[test]
    fn parses_interview_formats() {
        assert_eq!(InterviewFormat::parse("combo"), Some(InterviewFormat::Combo));
        assert_eq!(InterviewFormat::parse("technical"), Some(InterviewFormat::Coding));
        assert_eq!(InterviewFormat::parse(""), None);
    }
}
