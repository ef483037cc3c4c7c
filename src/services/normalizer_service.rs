use crate::models::answer::AnswerRecord;
use crate::models::question::{Question, QuestionKind};
use crate::models::submission::RawSubmission;
use crate::utils::choice;
use crate::utils::json::{first_present, first_string, lenient_bool, lenient_f64, string_list};
use serde_json::Value as JsonValue;

/// Answer value fields, in precedence order.
const ANSWER_KEYS: &[&str] = &[
    "answer",
    "userAnswer",
    "user_answer",
    "selectedOption",
    "selected_option",
    "response",
    "code",
];
const QUESTION_TEXT_KEYS: &[&str] = &["questionText", "question_text", "question"];
const NESTED_TEXT_KEYS: &[&str] = &["text", "question", "questionText", "title"];
const TYPE_KEYS: &[&str] = &["type", "questionType", "question_type", "kind"];
const CORRECT_KEYS: &[&str] = &["correctAnswer", "correct_answer", "correctOption", "correct_option"];
const TIME_KEYS: &[&str] = &[
    "timeSpentSeconds",
    "time_spent_seconds",
    "timeSpent",
    "time_spent",
    "duration",
];
const LANGUAGE_KEYS: &[&str] = &["language", "lang"];
const SCORE_KEYS: &[&str] = &["score", "rawScore", "raw_score", "codingScore"];
const SOLVED_KEYS: &[&str] = &["solved", "isSolved", "is_solved", "passed", "allTestsPassed"];

/// One raw entry plus everything known about its position.
struct EntryContext<'a> {
    index: usize,
    entry: &'a JsonValue,
    nested: Option<&'a JsonValue>,
    stored: Option<&'a Question>,
    section: Option<QuestionKind>,
}

impl<'a> EntryContext<'a> {
    fn new(
        index: usize,
        entry: &'a JsonValue,
        questions: &'a [Question],
        section: Option<QuestionKind>,
    ) -> Self {
        let nested = entry.get("question").filter(|q| q.is_object());
        Self {
            index,
            entry,
            nested,
            stored: question_at(questions, index),
            section,
        }
    }

    fn is_object(&self) -> bool {
        self.entry.is_object()
    }
}

type TextResolver = fn(&EntryContext<'_>) -> Option<String>;

/// Question text fallback chain; first hit wins.
const QUESTION_TEXT_CHAIN: [TextResolver; 3] =
    [text_from_entry, text_from_question_set, synthesized_text];

fn text_from_entry(ctx: &EntryContext<'_>) -> Option<String> {
    first_string(ctx.entry, QUESTION_TEXT_KEYS)
        .or_else(|| ctx.nested.and_then(|n| first_string(n, NESTED_TEXT_KEYS)))
}

fn text_from_question_set(ctx: &EntryContext<'_>) -> Option<String> {
    ctx.stored
        .map(|q| q.text.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn synthesized_text(ctx: &EntryContext<'_>) -> Option<String> {
    Some(format!("Question {}", ctx.index + 1))
}

fn resolve_question_text(ctx: &EntryContext<'_>) -> String {
    QUESTION_TEXT_CHAIN
        .iter()
        .find_map(|resolve| resolve(ctx))
        .unwrap_or_default()
}

fn question_at(questions: &[Question], index: usize) -> Option<&Question> {
    questions
        .get(index)
        .filter(|q| q.index == index)
        .or_else(|| questions.iter().find(|q| q.index == index))
}

pub struct NormalizerService;

impl NormalizerService {
    pub fn normalize(raw: &RawSubmission, questions: &[Question]) -> Vec<AnswerRecord> {
        Self::normalize_with_default(raw, questions, None)
    }

    /// `default_kind` applies to entries whose kind cannot be read from the
    /// entry, the question set, or a legacy section.
    pub fn normalize_with_default(
        raw: &RawSubmission,
        questions: &[Question],
        default_kind: Option<QuestionKind>,
    ) -> Vec<AnswerRecord> {
        let contexts: Vec<EntryContext<'_>> = match raw {
            RawSubmission::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(idx, entry)| EntryContext::new(idx, entry, questions, None))
                .collect(),
            RawSubmission::IndexedMap(items) => items
                .iter()
                .map(|(idx, entry)| EntryContext::new(*idx, entry, questions, None))
                .collect(),
            RawSubmission::SingleAnswer(entry) => {
                vec![EntryContext::new(0, entry, questions, None)]
            }
            RawSubmission::Sectioned(sections) => {
                let mut offset = 0;
                let mut contexts = Vec::new();
                for section in sections {
                    for entry in &section.entries {
                        contexts.push(EntryContext::new(offset, entry, questions, Some(section.kind)));
                        offset += 1;
                    }
                }
                contexts
            }
            RawSubmission::Empty => Vec::new(),
        };

        let records: Vec<AnswerRecord> = contexts
            .iter()
            .map(|ctx| build_record(ctx, default_kind))
            .collect();

        tracing::debug!(
            shape = raw.shape_name(),
            entries = raw.entry_count(),
            records = records.len(),
            "Submission normalized"
        );
        records
    }
}

fn build_record(ctx: &EntryContext<'_>, default_kind: Option<QuestionKind>) -> AnswerRecord {
    let raw_answer_value = answer_value(ctx);
    let kind = resolve_kind(ctx, default_kind);
    let options = resolve_options(ctx);
    let correct_answer = resolve_correct_answer(ctx);

    let (display_answer, display_correct_answer) = if kind == QuestionKind::Mcq {
        let opts = options.as_deref().unwrap_or(&[]);
        let shown_answer = choice::token_from_json(&raw_answer_value)
            .map(|token| choice::render(&token, opts).unwrap_or(token));
        let shown_correct = correct_answer
            .as_ref()
            .map(|token| choice::render(token, opts).unwrap_or_else(|| token.clone()));
        (shown_answer, shown_correct)
    } else {
        (None, None)
    };

    AnswerRecord {
        question_index: ctx.index,
        question_text: resolve_question_text(ctx),
        kind,
        raw_answer_value,
        time_spent_seconds: entry_field(ctx, TIME_KEYS)
            .and_then(lenient_f64)
            .map(|secs| secs.max(0.0).round() as u64)
            .unwrap_or(0),
        language: first_string(ctx.entry, LANGUAGE_KEYS),
        options,
        correct_answer,
        display_answer,
        display_correct_answer,
        recorded_score: entry_field(ctx, SCORE_KEYS)
            .and_then(lenient_f64)
            .map(|s| s.clamp(0.0, 100.0)),
        solved: entry_field(ctx, SOLVED_KEYS).and_then(lenient_bool),
    }
}

fn entry_field<'a>(ctx: &EntryContext<'a>, keys: &[&str]) -> Option<&'a JsonValue> {
    first_present(ctx.entry, keys)
}

fn answer_value(ctx: &EntryContext<'_>) -> JsonValue {
    if !ctx.is_object() {
        return ctx.entry.clone();
    }
    first_present(ctx.entry, ANSWER_KEYS)
        .cloned()
        .unwrap_or(JsonValue::Null)
}

fn resolve_kind(ctx: &EntryContext<'_>, default_kind: Option<QuestionKind>) -> QuestionKind {
    let declared = first_string(ctx.entry, TYPE_KEYS)
        .or_else(|| ctx.nested.and_then(|n| first_string(n, TYPE_KEYS)))
        .and_then(|t| QuestionKind::parse(&t));

    declared
        .or_else(|| ctx.stored.map(|q| q.kind))
        .or(ctx.section)
        .or(default_kind)
        .unwrap_or_else(|| infer_kind(ctx))
}

fn infer_kind(ctx: &EntryContext<'_>) -> QuestionKind {
    if first_present(ctx.entry, &["code"]).is_some() || first_present(ctx.entry, LANGUAGE_KEYS).is_some() {
        QuestionKind::Coding
    } else if first_present(ctx.entry, &["selectedOption", "selected_option", "options"]).is_some()
        || ctx.nested.and_then(|n| n.get("options")).is_some()
    {
        QuestionKind::Mcq
    } else {
        QuestionKind::Behavioral
    }
}

fn resolve_options(ctx: &EntryContext<'_>) -> Option<Vec<String>> {
    first_present(ctx.entry, &["options"])
        .and_then(string_list)
        .or_else(|| ctx.nested.and_then(|n| n.get("options")).and_then(string_list))
        .or_else(|| ctx.stored.and_then(|q| q.options.clone()))
}

fn resolve_correct_answer(ctx: &EntryContext<'_>) -> Option<String> {
    first_present(ctx.entry, CORRECT_KEYS)
        .and_then(choice::token_from_json)
        .or_else(|| {
            ctx.nested
                .and_then(|n| first_present(n, CORRECT_KEYS))
                .and_then(choice::token_from_json)
        })
        .or_else(|| ctx.stored.and_then(|q| q.correct_answer.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mcq_question(index: usize) -> Question {
        Question {
            index,
            text: format!("Stored question {}", index + 1),
            kind: QuestionKind::Mcq,
            options: Some(vec!["Paris".into(), "Berlin".into(), "Rome".into()]),
            correct_answer: Some("b".into()),
        }
    }

    fn normalize(raw: JsonValue, questions: &[Question]) -> Vec<AnswerRecord> {
        NormalizerService::normalize(&RawSubmission::detect(&raw), questions)
    }

    #[test]
    fn shape_invariance_for_a_single_answer() {
        let answer = json!({"question": "Tell me about a conflict", "answer": "We talked it through", "timeSpent": 42});
        let as_array = normalize(json!([answer.clone()]), &[]);
        let as_map = normalize(json!({"0": answer.clone()}), &[]);
        let as_single = normalize(answer, &[]);
        assert_eq!(as_array, as_map);
        assert_eq!(as_array, as_single);
        assert_eq!(as_array[0].time_spent_seconds, 42);
    }

    #[test]
    fn numeric_keys_define_order() {
        let raw = json!({"2": {"answer": "A"}, "0": {"answer": "B"}, "1": {"answer": "C"}});
        let values: Vec<JsonValue> = normalize(raw, &[])
            .into_iter()
            .map(|r| r.raw_answer_value)
            .collect();
        assert_eq!(values, vec![json!("B"), json!("C"), json!("A")]);
    }

    #[test]
    fn unanswered_entries_are_kept() {
        let raw = json!([{"answer": "yes"}, {"timeSpent": 3}, null, {"response": ""}]);
        let records = normalize(raw, &[]);
        assert_eq!(records.len(), 4);
        assert_eq!(records[1].raw_answer_value, JsonValue::Null);
        assert!(!records[1].is_answered());
        assert!(!records[2].is_answered());
        assert!(!records[3].is_answered());
    }

    #[test]
    fn answer_field_precedence() {
        let raw = json!([{"response": "r", "userAnswer": "u", "code": "c"}]);
        assert_eq!(normalize(raw, &[])[0].raw_answer_value, json!("u"));
    }

    #[test]
    fn question_text_fallback_chain() {
        let questions = vec![mcq_question(0), mcq_question(1)];
        let raw = json!([
            {"question": "Inline text", "answer": "a"},
            {"answer": "a"},
            {"answer": "a"}
        ]);
        let records = normalize(raw, &questions);
        assert_eq!(records[0].question_text, "Inline text");
        assert_eq!(records[1].question_text, "Stored question 2");
        assert_eq!(records[2].question_text, "Question 3");
    }

    #[test]
    fn renders_choices_against_stored_options() {
        let questions = vec![mcq_question(0), mcq_question(1), mcq_question(2)];
        let raw = json!([{"answer": "2"}, {"selectedOption": "c"}, {"answer": "9"}]);
        let records = normalize(raw, &questions);
        assert_eq!(records[0].kind, QuestionKind::Mcq);
        assert_eq!(records[0].display_answer.as_deref(), Some("2. Berlin"));
        assert_eq!(records[0].display_correct_answer.as_deref(), Some("b. Berlin"));
        assert_eq!(records[1].display_answer.as_deref(), Some("c. Rome"));
        assert_eq!(records[2].display_answer.as_deref(), Some("9"));
        assert_eq!(records[2].raw_answer_value, json!("9"));
    }

    #[test]
    fn legacy_nested_question_supplies_context() {
        let raw = json!([{
            "question": {"text": "Pick one", "options": ["x", "y"], "correctAnswer": 1},
            "answer": 1
        }]);
        let record = &normalize(raw, &[])[0];
        assert_eq!(record.question_text, "Pick one");
        assert_eq!(record.kind, QuestionKind::Mcq);
        assert_eq!(record.correct_answer.as_deref(), Some("2"));
        assert_eq!(record.display_answer.as_deref(), Some("2. y"));
    }

    #[test]
    fn coding_shorthand_carries_verdict() {
        let raw = json!({"code": "print(1)", "language": "python", "score": "85", "solved": true});
        let record = &normalize(raw, &[])[0];
        assert_eq!(record.kind, QuestionKind::Coding);
        assert_eq!(record.language.as_deref(), Some("python"));
        assert_eq!(record.recorded_score, Some(85.0));
        assert_eq!(record.solved, Some(true));
    }

    #[test]
    fn sectioned_combo_uses_running_indices() {
        let raw = json!({
            "behavioral": [{"answer": "story"}, {"answer": ""}],
            "mcq": {"0": {"answer": "a"}},
            "coding": {"code": "fn x() {}"}
        });
        let records = normalize(raw, &[]);
        let kinds: Vec<QuestionKind> = records.iter().map(|r| r.kind).collect();
        let indices: Vec<usize> = records.iter().map(|r| r.question_index).collect();
        assert_eq!(
            kinds,
            vec![
                QuestionKind::Behavioral,
                QuestionKind::Behavioral,
                QuestionKind::Mcq,
                QuestionKind::Coding
            ]
        );
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn scalar_section_values_are_not_dropped() {
        let raw = json!({"behavioral": [{"answer": "story"}], "coding": "fn main() {}"});
        let records = normalize(raw, &[]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].kind, QuestionKind::Coding);
        assert_eq!(records[1].question_index, 1);
        assert_eq!(records[1].raw_answer_value, json!("fn main() {}"));
        assert!(records[1].is_answered());

        let records = normalize(json!({"behavioral": ["I led the migration"], "mcq": "b"}), &[]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].kind, QuestionKind::Mcq);
    }

    #[test]
    fn malformed_input_yields_nothing() {
        assert!(NormalizerService::normalize(&RawSubmission::from_text("[{oops"), &[]).is_empty());
        assert!(normalize(json!("just text"), &[]).is_empty());
        assert!(normalize(json!({"meta": 1}), &[]).is_empty());
    }
}
