//! # Survey aggregation pivot
//!
//! Visitors answer a fixed questionnaire about a hospital. The summary of a
//! hospital counts, for every selection question, how many answer documents
//! chose each option.
//!
//! The counting runs as one grouping pass in storage. Group output is flat, so
//! each (question, option) pair gets a composite field name `question?option`.
//! [`reshape`] splits those names again and folds the counts into one entry per
//! question, with options in the order the schema declares them.
//!
//! Text questions are validated on submission but never aggregated.

use crate::{CoreError, CoreResult};
use api_shared::{
    SurveyAnswer, SurveyQuestionRes, SurveyQuestionsRes, SurveySummaryEntry, SurveySummaryRes,
};
use moonlight_store::{Accumulator, Document, Group, Predicate, Stage, ID_FIELD};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Separates question and option in an aggregated field name.
pub const COMPOSITE_SEPARATOR: char = '?';

/// Answer documents are keyed by these two fields.
pub const HOSPITAL_ID_FIELD: &str = "hospitalId";
pub const USER_ID_FIELD: &str = "userId";

const TOTAL_COUNT_FIELD: &str = "totalCount";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    Selection,
    Text,
}

impl QuestionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::Selection => "selection",
            QuestionKind::Text => "text",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyQuestion {
    pub kind: QuestionKind,
    pub options: Vec<String>,
    pub max_text_length: Option<u32>,
}

impl SurveyQuestion {
    fn selection(options: &[&str]) -> Self {
        Self {
            kind: QuestionKind::Selection,
            options: options.iter().map(|o| (*o).to_owned()).collect(),
            max_text_length: None,
        }
    }

    fn text(max_len: u32) -> Self {
        Self {
            kind: QuestionKind::Text,
            options: Vec::new(),
            max_text_length: Some(max_len),
        }
    }
}

/// An ordered questionnaire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveySchema {
    questions: Vec<(String, SurveyQuestion)>,
}

const WAITING_OPTIONS: [&str; 4] = ["below15min", "below30min", "below60min", "over60min"];

impl SurveySchema {
    pub fn new(questions: Vec<(String, SurveyQuestion)>) -> Self {
        Self { questions }
    }

    /// The questionnaire the app ships with.
    pub fn standard() -> &'static SurveySchema {
        static SCHEMA: OnceLock<SurveySchema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            let q = |key: &str, question| (key.to_owned(), question);
            SurveySchema::new(vec![
                // space
                q("waitingSpace", SurveyQuestion::selection(&["smallSpace", "average", "bigSpace"])),
                q("parkingDifficulty", SurveyQuestion::selection(&["easy", "hard"])),
                q("cleanliness", SurveyQuestion::selection(&["clean", "average", "no"])),
                // treatment
                q("kindness", SurveyQuestion::selection(&["kind", "average", "no"])),
                q("thoroughness", SurveyQuestion::selection(&["thorough", "average", "no"])),
                q("medicineStrength", SurveyQuestion::selection(&["weak", "average", "strong"])),
                q("ivTreatment", SurveyQuestion::selection(&["do", "dont"])),
                q("whenToVisit", SurveyQuestion::selection(&["littleSick", "verySick"])),
                // checkup
                q("checkupAvailable", SurveyQuestion::selection(&["do", "dont"])),
                q("checkupWaiting", SurveyQuestion::selection(&["below1day", "below7day", "over7day"])),
                q("morningWaiting", SurveyQuestion::selection(&WAITING_OPTIONS)),
                q("afternoonWaiting", SurveyQuestion::selection(&WAITING_OPTIONS)),
                q("tipForVisitors", SurveyQuestion::text(20)),
            ])
        })
    }

    pub fn get(&self, key: &str) -> Option<&SurveyQuestion> {
        self.questions
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, q)| q)
    }

    pub fn questions(&self) -> impl Iterator<Item = (&str, &SurveyQuestion)> {
        self.questions.iter().map(|(k, q)| (k.as_str(), q))
    }

    pub fn selection_questions(&self) -> impl Iterator<Item = (&str, &SurveyQuestion)> {
        self.questions()
            .filter(|(_, q)| q.kind == QuestionKind::Selection)
    }

    pub fn to_response(&self) -> SurveyQuestionsRes {
        SurveyQuestionsRes {
            questions: self
                .questions()
                .map(|(key, q)| {
                    (
                        key.to_owned(),
                        SurveyQuestionRes {
                            kind: q.kind.as_str().to_owned(),
                            options: q.options.clone(),
                            max_text_length: q.max_text_length,
                        },
                    )
                })
                .collect(),
        }
    }

    /// Checks submitted answers against the questionnaire.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidInput` if:
    /// - an answer names a question that does not exist,
    /// - an answer's `type` disagrees with the question,
    /// - a selection answer picks an option the question does not offer,
    /// - a text answer is longer than the question allows.
    pub fn validate(&self, answers: &BTreeMap<String, SurveyAnswer>) -> CoreResult<()> {
        for (key, answer) in answers {
            let question = self
                .get(key)
                .ok_or_else(|| CoreError::InvalidInput(format!("unknown survey question {key}")))?;

            if !answer.kind.is_empty() && answer.kind != question.kind.as_str() {
                return Err(CoreError::InvalidInput(format!(
                    "answer to {key} has type {}, expected {}",
                    answer.kind,
                    question.kind.as_str()
                )));
            }

            match question.kind {
                QuestionKind::Selection => {
                    if !question.options.iter().any(|o| *o == answer.option) {
                        return Err(CoreError::InvalidInput(format!(
                            "{:?} is not an option of {key}",
                            answer.option
                        )));
                    }
                }
                QuestionKind::Text => {
                    let max = question.max_text_length.unwrap_or(u32::MAX) as usize;
                    if answer.text.chars().count() > max {
                        return Err(CoreError::InvalidInput(format!(
                            "answer to {key} exceeds {max} characters"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// PIVOT
// ============================================================================

pub fn composite_key(question: &str, option: &str) -> String {
    format!("{question}{COMPOSITE_SEPARATOR}{option}")
}

/// Splits `question?option`. Anything other than exactly two non-empty parts is rejected.
pub fn split_composite_key(key: &str) -> Option<(&str, &str)> {
    let mut parts = key.split(COMPOSITE_SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(q), Some(o), None) if !q.is_empty() && !o.is_empty() => Some((q, o)),
        _ => None,
    }
}

/// Builds the single grouping pass over one hospital's answer documents.
pub fn build_summary_pipeline(schema: &SurveySchema, hospital_id: &str) -> Vec<Stage> {
    let mut fields = vec![(TOTAL_COUNT_FIELD.to_owned(), Accumulator::Count)];
    for (key, question) in schema.selection_questions() {
        let answer_path = format!("answers.{key}.option");
        for option in &question.options {
            fields.push((
                composite_key(key, option),
                Accumulator::CountWhere(Predicate::eq(answer_path.clone(), option.as_str())),
            ));
        }
    }

    vec![
        Stage::Match(Predicate::eq(HOSPITAL_ID_FIELD, hospital_id)),
        Stage::Group(Group {
            key: Some(HOSPITAL_ID_FIELD.to_owned()),
            fields,
        }),
    ]
}

/// Folds an aggregated row into per-question summaries.
///
/// With no row (no answers yet) the summary is empty with a zero total. With a
/// row, every selection question appears with its options in schema order;
/// composite fields that are malformed, unknown or non-integer are logged and
/// leave their count at zero.
pub fn reshape(hospital_id: &str, row: Option<&Document>, schema: &SurveySchema) -> SurveySummaryRes {
    let mut res = SurveySummaryRes {
        hospital_id: hospital_id.to_owned(),
        total_count: 0,
        summaries: BTreeMap::new(),
    };
    let Some(row) = row else {
        return res;
    };

    res.total_count = match row.get(TOTAL_COUNT_FIELD).and_then(|v| v.as_u64()) {
        Some(n) => n,
        None => {
            tracing::warn!(
                "survey summary total count for {hospital_id} is not an integer: {:?}",
                row.get(TOTAL_COUNT_FIELD)
            );
            0
        }
    };

    for (key, question) in schema.selection_questions() {
        res.summaries.insert(
            key.to_owned(),
            SurveySummaryEntry {
                kind: question.kind.as_str().to_owned(),
                options: question.options.clone(),
                option_counts: vec![0; question.options.len()],
            },
        );
    }

    for (field, value) in row {
        if field == ID_FIELD || field == TOTAL_COUNT_FIELD {
            continue;
        }
        let Some((question, option)) = split_composite_key(field) else {
            tracing::warn!("survey summary key format is wrong: {field}");
            continue;
        };
        let Some(count) = value.as_u64() else {
            tracing::warn!("survey summary value for {field} is not an integer: {value}");
            continue;
        };
        let slot = res.summaries.get_mut(question).and_then(|entry| {
            let idx = entry.options.iter().position(|o| o == option)?;
            entry.option_counts.get_mut(idx)
        });
        match slot {
            Some(slot) => *slot = count,
            None => tracing::warn!("survey summary key {field} is not in the questionnaire"),
        }
    }

    res
}
