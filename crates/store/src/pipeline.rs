//! Aggregation stages, sorting and find options.

use crate::predicate::{compare, lookup, Matcher};
use crate::{Document, Predicate, StoreError, StoreResult};
use rand::seq::SliceRandom;
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    pub(crate) fn apply(&self, docs: &mut [Document]) {
        docs.sort_by(|a, b| {
            let ord = match (lookup(a, &self.field), lookup(b, &self.field)) {
                (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            match self.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub sort: Option<Sort>,
    pub limit: Option<usize>,
}

/// A per-group output field.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    /// Number of documents in the group.
    Count,
    /// Number of documents in the group that satisfy the predicate.
    CountWhere(Predicate),
}

/// Groups documents by `key` (or all together when `None`) and emits one row
/// per group with `_id` set to the key value.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: Option<String>,
    pub fields: Vec<(String, Accumulator)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Predicate),
    /// Uniform random sample without replacement. Fewer documents than `size`
    /// pass through unchanged in random order.
    Sample { size: usize },
    Sort(Sort),
    Limit(usize),
    Group(Group),
}

pub(crate) fn run(mut docs: Vec<Document>, stages: &[Stage]) -> StoreResult<Vec<Document>> {
    for stage in stages {
        docs = match stage {
            Stage::Match(predicate) => {
                let matcher = predicate.compile()?;
                docs.into_iter().filter(|d| matcher.test(d)).collect()
            }
            Stage::Sample { size } => {
                if *size == 0 {
                    return Err(StoreError::InvalidQuery("sample size must be positive".into()));
                }
                let mut rng = rand::thread_rng();
                docs.choose_multiple(&mut rng, *size).cloned().collect()
            }
            Stage::Sort(sort) => {
                sort.apply(&mut docs);
                docs
            }
            Stage::Limit(n) => {
                docs.truncate(*n);
                docs
            }
            Stage::Group(group) => run_group(&docs, group)?,
        };
    }
    Ok(docs)
}

fn run_group(docs: &[Document], group: &Group) -> StoreResult<Vec<Document>> {
    let counters: Vec<(&str, Option<Matcher>)> = group
        .fields
        .iter()
        .map(|(name, acc)| {
            if name == crate::ID_FIELD {
                return Err(StoreError::InvalidQuery(
                    "group output cannot overwrite _id".into(),
                ));
            }
            let matcher = match acc {
                Accumulator::Count => None,
                Accumulator::CountWhere(p) => Some(p.compile()?),
            };
            Ok((name.as_str(), matcher))
        })
        .collect::<StoreResult<_>>()?;

    // Groups keep first-seen order.
    let mut keys: Vec<Value> = Vec::new();
    let mut tallies: Vec<Vec<i64>> = Vec::new();

    for doc in docs {
        let key = group
            .key
            .as_deref()
            .and_then(|k| lookup(doc, k).cloned())
            .unwrap_or(Value::Null);
        let slot = match keys.iter().position(|k| *k == key) {
            Some(i) => i,
            None => {
                keys.push(key);
                tallies.push(vec![0; counters.len()]);
                keys.len() - 1
            }
        };
        for (i, (_, matcher)) in counters.iter().enumerate() {
            if matcher.as_ref().map_or(true, |m| m.test(doc)) {
                tallies[slot][i] += 1;
            }
        }
    }

    Ok(keys
        .into_iter()
        .zip(tallies)
        .map(|(key, counts)| {
            let mut row = Document::new();
            row.insert(crate::ID_FIELD.into(), key);
            for ((name, _), n) in counters.iter().zip(counts) {
                row.insert((*name).to_string(), Value::from(n));
            }
            row
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs(values: Vec<Value>) -> Vec<Document> {
        values
            .into_iter()
            .filter_map(|v| v.as_object().cloned())
            .collect()
    }

    #[test]
    fn sample_caps_size_and_keeps_members() {
        let input = docs((0..20).map(|i| json!({"n": i})).collect());
        let out = run(input, &[Stage::Sample { size: 16 }]).unwrap();
        assert_eq!(out.len(), 16);

        let small = docs(vec![json!({"n": 1}), json!({"n": 2})]);
        let out = run(small, &[Stage::Sample { size: 16 }]).unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn zero_sample_is_rejected() {
        let err = run(Vec::new(), &[Stage::Sample { size: 0 }]).unwrap_err();
        assert!(err.is_caller_error());
    }

    #[test]
    fn group_counts_per_key_with_conditions() {
        let input = docs(vec![
            json!({"hospitalId": "h1", "answers": {"q": {"option": "a"}}}),
            json!({"hospitalId": "h1", "answers": {"q": {"option": "b"}}}),
            json!({"hospitalId": "h2", "answers": {"q": {"option": "a"}}}),
        ]);
        let group = Group {
            key: Some("hospitalId".into()),
            fields: vec![
                ("total".into(), Accumulator::Count),
                (
                    "q?a".into(),
                    Accumulator::CountWhere(Predicate::eq("answers.q.option", "a")),
                ),
            ],
        };
        let out = run(
            input,
            &[Stage::Match(Predicate::eq("hospitalId", "h1")), Stage::Group(group)],
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["_id"], json!("h1"));
        assert_eq!(out[0]["total"], json!(2));
        assert_eq!(out[0]["q?a"], json!(1));
    }

    #[test]
    fn group_over_nothing_emits_no_rows() {
        let group = Group {
            key: None,
            fields: vec![("total".into(), Accumulator::Count)],
        };
        assert!(run(Vec::new(), &[Stage::Group(group)]).unwrap().is_empty());
    }

    #[test]
    fn sort_then_limit() {
        let input = docs(vec![json!({"t": "b"}), json!({"t": "c"}), json!({"t": "a"})]);
        let out = run(
            input,
            &[Stage::Sort(Sort::descending("t")), Stage::Limit(2)],
        )
        .unwrap();
        let order: Vec<&str> = out.iter().filter_map(|d| d["t"].as_str()).collect();
        assert_eq!(order, vec!["c", "b"]);
    }
}
