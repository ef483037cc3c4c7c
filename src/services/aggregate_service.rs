use crate::models::answer::ScoredAnswer;
use crate::models::question::{InterviewFormat, QuestionKind};
use crate::models::result::{CompositeResult, SectionSummary};
use std::collections::{BTreeMap, BTreeSet};

pub struct AggregateService;

impl AggregateService {
    /// Infers combo weighting when the answers span more than one kind.
    pub fn aggregate(scored: &[ScoredAnswer]) -> CompositeResult {
        Self::aggregate_for(scored, Self::infer_format(scored))
    }

    pub fn infer_format(scored: &[ScoredAnswer]) -> InterviewFormat {
        let kinds: BTreeSet<QuestionKind> = scored.iter().map(|s| s.kind()).collect();
        match kinds.len() {
            1 => kinds
                .into_iter()
                .next()
                .map(InterviewFormat::from)
                .unwrap_or(InterviewFormat::Combo),
            0 => InterviewFormat::Behavioral,
            _ => InterviewFormat::Combo,
        }
    }

    pub fn aggregate_for(scored: &[ScoredAnswer], format: InterviewFormat) -> CompositeResult {
        let total = scored.len();
        let answered = scored.iter().filter(|s| s.is_answered()).count();

        let mut section_summaries = BTreeMap::new();
        for kind in QuestionKind::ALL {
            let section: Vec<&ScoredAnswer> = scored.iter().filter(|s| s.kind() == kind).collect();
            if section.is_empty() {
                continue;
            }
            section_summaries.insert(kind, summarize(&section));
        }

        let spans_kinds = section_summaries.len() > 1;
        let overall_score = if format == InterviewFormat::Combo || spans_kinds {
            weighted_overall(&section_summaries)
        } else {
            rounded_mean(scored.iter().map(|s| s.score))
        };

        CompositeResult {
            overall_score,
            section_summaries,
            completion_rate: percentage(answered, total),
            accuracy: accuracy(scored),
            total_questions: total,
            answered_questions: answered,
        }
    }
}

fn summarize(section: &[&ScoredAnswer]) -> SectionSummary {
    SectionSummary {
        total_questions: section.len(),
        answered_questions: section.iter().filter(|s| s.is_answered()).count(),
        average_score: rounded_mean(section.iter().map(|s| s.score)),
        time_spent_seconds: section.iter().map(|s| s.record.time_spent_seconds).sum(),
    }
}

/// Fixed 0.3/0.3/0.4 weights. A section with no questions contributes 0
/// and still carries its weight.
fn weighted_overall(sections: &BTreeMap<QuestionKind, SectionSummary>) -> u8 {
    let weighted: f64 = QuestionKind::ALL
        .iter()
        .map(|kind| {
            let section_score = sections.get(kind).map(|s| s.average_score).unwrap_or(0);
            kind.combo_weight() * f64::from(section_score)
        })
        .sum();
    weighted.round().clamp(0.0, 100.0) as u8
}

/// Behavioral answers have no pass/fail and are excluded from the ratio.
fn accuracy(scored: &[ScoredAnswer]) -> u8 {
    let gradable: Vec<&ScoredAnswer> = scored
        .iter()
        .filter(|s| s.kind() != QuestionKind::Behavioral)
        .collect();
    let passing = gradable
        .iter()
        .filter(|s| s.is_correct == Some(true))
        .count();
    percentage(passing, gradable.len())
}

fn rounded_mean(scores: impl Iterator<Item = u8>) -> u8 {
    let (sum, count) = scores.fold((0u64, 0u64), |(sum, count), s| (sum + u64::from(s), count + 1));
    if count == 0 {
        return 0;
    }
    (sum as f64 / count as f64).round() as u8
}

fn percentage(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u8
}
