use crate::database::store::QuestionStore;
use crate::models::question::{Question, QuestionKind};
use crate::utils::choice;
use crate::utils::json::{decode_stored, first_present, first_string, string_list};
use serde_json::Value as JsonValue;
use std::sync::Arc;

const TEXT_KEYS: &[&str] = &["question", "text", "questionText", "question_text", "title", "prompt"];
const TYPE_KEYS: &[&str] = &["type", "questionType", "question_type", "kind"];
const OPTION_KEYS: &[&str] = &["options", "choices"];
const CORRECT_KEYS: &[&str] = &["correctAnswer", "correct_answer", "correctOption", "correct_option"];
const CODING_HINT_KEYS: &[&str] = &["starterCode", "starter_code", "testCases", "test_cases", "language"];

/// Looks up the original question set of an interview by id.
#[derive(Clone)]
pub struct QuestionService {
    store: Arc<dyn QuestionStore>,
}

impl QuestionService {
    pub fn new(store: Arc<dyn QuestionStore>) -> Self {
        Self { store }
    }

    /// Never fails: a missing or unreadable question set is an empty list.
    pub async fn resolve(&self, interview_id: &str) -> Vec<Question> {
        match self.store.get_questions(interview_id).await {
            Ok(Some(stored)) => {
                let questions = Self::parse_question_set(&stored);
                tracing::debug!(interview_id, count = questions.len(), "Question set resolved");
                questions
            }
            Ok(None) => {
                tracing::info!(interview_id, "No stored question set, continuing without context");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(interview_id, error = ?e, "Question store lookup failed, continuing without context");
                Vec::new()
            }
        }
    }

    /// Parses any stored representation into positional questions. Every
    /// stored item keeps its slot so positions line up with answers.
    pub fn parse_question_set(stored: &JsonValue) -> Vec<Question> {
        let Some(decoded) = decode_stored(stored) else {
            return Vec::new();
        };

        let mut slots: Vec<(JsonValue, Option<QuestionKind>)> = Vec::new();
        collect_slots(&decoded, None, &mut slots, 0);

        slots
            .iter()
            .enumerate()
            .map(|(idx, (item, section))| coerce_question(idx, item, *section))
            .collect()
    }
}

fn collect_slots(
    value: &JsonValue,
    section: Option<QuestionKind>,
    slots: &mut Vec<(JsonValue, Option<QuestionKind>)>,
    depth: usize,
) {
    if depth > 3 {
        return;
    }
    match value {
        JsonValue::Array(items) => {
            slots.extend(items.iter().map(|item| (item.clone(), section)));
        }
        JsonValue::String(text) => {
            if let Ok(inner) = serde_json::from_str::<JsonValue>(text) {
                collect_slots(&inner, section, slots, depth + 1);
            }
        }
        JsonValue::Object(map) => {
            if let Some(inner) = map.get("questions") {
                collect_slots(inner, section, slots, depth + 1);
                return;
            }
            let mut found_section = false;
            for kind in QuestionKind::ALL {
                let keys = section_keys(kind);
                if let Some(inner) = keys.iter().find_map(|k| map.get(*k)) {
                    found_section = true;
                    collect_slots(inner, Some(kind), slots, depth + 1);
                }
            }
            if !found_section && first_string(value, TEXT_KEYS).is_some() {
                slots.push((value.clone(), section));
            }
        }
        _ => {}
    }
}

fn section_keys(kind: QuestionKind) -> &'static [&'static str] {
    match kind {
        QuestionKind::Behavioral => &["behavioral", "behavioralQuestions", "behavioral_questions"],
        QuestionKind::Mcq => &["mcq", "mcqQuestions", "mcq_questions"],
        QuestionKind::Coding => &["coding", "codingQuestions", "coding_questions", "codingProblem"],
    }
}

fn coerce_question(index: usize, item: &JsonValue, section: Option<QuestionKind>) -> Question {
    if let Some(text) = item.as_str() {
        return Question {
            index,
            text: text.trim().to_string(),
            kind: section.unwrap_or(QuestionKind::Behavioral),
            options: None,
            correct_answer: None,
        };
    }

    let text = first_string(item, TEXT_KEYS).unwrap_or_default();
    let options = first_present(item, OPTION_KEYS).and_then(string_list);
    let correct_answer = first_present(item, CORRECT_KEYS).and_then(choice::token_from_json);

    let kind = first_string(item, TYPE_KEYS)
        .and_then(|t| QuestionKind::parse(&t))
        .or(section)
        .unwrap_or_else(|| {
            if options.is_some() {
                QuestionKind::Mcq
            } else if first_present(item, CODING_HINT_KEYS).is_some() {
                QuestionKind::Coding
            } else {
                QuestionKind::Behavioral
            }
        });

    Question {
        index,
        text,
        kind,
        options,
        correct_answer,
    }
}
