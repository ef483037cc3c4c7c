use crate::models::question::QuestionKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Row returned by the submission store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub raw: JsonValue,
    #[serde(default)]
    pub candidate_name: Option<String>,
    #[serde(default)]
    pub interview_type: Option<String>,
}

/// Keys whose presence marks a mapping as one answer rather than a collection.
pub const SINGLE_ANSWER_KEYS: &[&str] = &[
    "answer",
    "userAnswer",
    "user_answer",
    "response",
    "selectedOption",
    "selected_option",
    "code",
];

const WRAPPER_KEYS: &[&str] = &["answers", "responses", "submission", "submissions"];

const SECTION_KEYS: &[(QuestionKind, &[&str])] = &[
    (
        QuestionKind::Behavioral,
        &["behavioral", "behavioralAnswers", "behavioral_answers"],
    ),
    (QuestionKind::Mcq, &["mcq", "mcqAnswers", "mcq_answers"]),
    (
        QuestionKind::Coding,
        &["coding", "codingAnswers", "coding_answers", "codingSubmission"],
    ),
];

/// Nesting guard for double-encoded and wrapped payloads.
const MAX_DEPTH: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionSection {
    pub kind: QuestionKind,
    pub entries: Vec<JsonValue>,
}

/// Shape of a stored submission, decided once before any field access.
#[derive(Debug, Clone, PartialEq)]
pub enum RawSubmission {
    /// Ordered list of answers; position is the question index.
    Sequence(Vec<JsonValue>),
    /// Mapping keyed by stringified index, sorted ascending by key.
    IndexedMap(Vec<(usize, JsonValue)>),
    /// One answer object, treated as index 0.
    SingleAnswer(JsonValue),
    /// Legacy combo payload split by section; flattened in section order.
    Sectioned(Vec<SubmissionSection>),
    /// Unparseable or unrecognized input.
    Empty,
}

impl RawSubmission {
    pub fn detect(raw: &JsonValue) -> Self {
        detect_at(raw, 0)
    }

    pub fn from_text(text: &str) -> Self {
        match serde_json::from_str::<JsonValue>(text) {
            Ok(value) => Self::detect(&value),
            Err(e) => {
                tracing::debug!(error = %e, "Submission text is not valid JSON");
                RawSubmission::Empty
            }
        }
    }

    pub fn shape_name(&self) -> &'static str {
        match self {
            RawSubmission::Sequence(_) => "sequence",
            RawSubmission::IndexedMap(_) => "indexed_map",
            RawSubmission::SingleAnswer(_) => "single_answer",
            RawSubmission::Sectioned(_) => "sectioned",
            RawSubmission::Empty => "empty",
        }
    }

    /// Number of logical entries the shape carries.
    pub fn entry_count(&self) -> usize {
        match self {
            RawSubmission::Sequence(items) => items.len(),
            RawSubmission::IndexedMap(items) => items.len(),
            RawSubmission::SingleAnswer(_) => 1,
            RawSubmission::Sectioned(sections) => sections.iter().map(|s| s.entries.len()).sum(),
            RawSubmission::Empty => 0,
        }
    }
}

fn detect_at(raw: &JsonValue, depth: usize) -> RawSubmission {
    if depth > MAX_DEPTH {
        return RawSubmission::Empty;
    }
    match raw {
        JsonValue::Array(items) => RawSubmission::Sequence(items.clone()),
        JsonValue::String(text) => match serde_json::from_str::<JsonValue>(text) {
            Ok(inner @ (JsonValue::Array(_) | JsonValue::Object(_))) => detect_at(&inner, depth + 1),
            _ => RawSubmission::Empty,
        },
        JsonValue::Object(map) => detect_mapping(map, depth),
        _ => RawSubmission::Empty,
    }
}

fn detect_mapping(map: &Map<String, JsonValue>, depth: usize) -> RawSubmission {
    if SINGLE_ANSWER_KEYS.iter().any(|k| map.contains_key(*k)) {
        return RawSubmission::SingleAnswer(JsonValue::Object(map.clone()));
    }

    for key in WRAPPER_KEYS {
        if let Some(inner) = map.get(*key) {
            if inner.is_array() || inner.is_object() {
                return detect_at(inner, depth + 1);
            }
            if inner.is_string() {
                return match detect_at(inner, depth + 1) {
                    RawSubmission::Empty if is_bare_answer(inner) => {
                        RawSubmission::SingleAnswer(inner.clone())
                    }
                    detected => detected,
                };
            }
        }
    }

    let sections: Vec<SubmissionSection> = SECTION_KEYS
        .iter()
        .filter_map(|(kind, keys)| {
            let value = keys.iter().find_map(|k| map.get(*k))?;
            let entries = section_entries(value, depth);
            Some(SubmissionSection { kind: *kind, entries })
        })
        .collect();
    if !sections.is_empty() {
        return RawSubmission::Sectioned(sections);
    }

    // "0", "00" and " 0" name the same slot; the first key in map order wins.
    let mut indexed: Vec<(usize, JsonValue)> = Vec::with_capacity(map.len());
    for (key, value) in map {
        match key.trim().parse::<usize>() {
            Ok(idx) if indexed.iter().any(|(seen, _)| *seen == idx) => {
                tracing::warn!(key = %key, index = idx, "Duplicate submission index, keeping the first entry");
            }
            Ok(idx) => indexed.push((idx, value.clone())),
            Err(_) => tracing::debug!(key = %key, "Skipping non-numeric submission key"),
        }
    }
    if indexed.is_empty() {
        return RawSubmission::Empty;
    }
    indexed.sort_by_key(|(idx, _)| *idx);
    RawSubmission::IndexedMap(indexed)
}

fn section_entries(value: &JsonValue, depth: usize) -> Vec<JsonValue> {
    match detect_at(value, depth + 1) {
        RawSubmission::Sequence(items) => items,
        RawSubmission::IndexedMap(items) => items.into_iter().map(|(_, v)| v).collect(),
        RawSubmission::SingleAnswer(item) => vec![item],
        RawSubmission::Sectioned(nested) => nested.into_iter().flat_map(|s| s.entries).collect(),
        RawSubmission::Empty if is_bare_answer(value) => vec![value.clone()],
        RawSubmission::Empty => Vec::new(),
    }
}

/// A scalar that is an answer in its own right rather than broken JSON text.
fn is_bare_answer(value: &JsonValue) -> bool {
    match value {
        JsonValue::String(text) => {
            let trimmed = text.trim_start();
            !(trimmed.starts_with('[') || trimmed.starts_with('{'))
        }
        JsonValue::Number(_) | JsonValue::Bool(_) => true,
        _ => false,
    }
}
