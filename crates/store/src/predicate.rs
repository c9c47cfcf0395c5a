//! Structural predicates and their evaluation against documents.
//!
//! Field names may be dotted paths (`answers.kindness.option`), which walk
//! nested objects. When a path ends on an array, scalar predicates match if any
//! element matches.

use crate::{Document, StoreError, StoreResult};
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every document.
    All,
    Eq {
        field: String,
        value: Value,
    },
    In {
        field: String,
        values: Vec<Value>,
    },
    /// Plain substring match on string values.
    Contains {
        field: String,
        needle: String,
    },
    /// Regular-expression match on string values.
    Matches {
        field: String,
        pattern: String,
    },
    /// Inclusive range. Strings compare lexicographically, numbers numerically;
    /// a bound of a different type than the field never matches.
    Range {
        field: String,
        gte: Option<Value>,
        lte: Option<Value>,
    },
    /// Inclusive axis-aligned box over a `[lng, lat]` point or a GeoJSON
    /// `{ "type": "Point", "coordinates": [lng, lat] }` value.
    WithinBox {
        field: String,
        south_west: [f64; 2],
        north_east: [f64; 2],
    },
    And(Vec<Predicate>),
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_in<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Predicate::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Predicate::Contains {
            field: field.into(),
            needle: needle.into(),
        }
    }

    pub fn matches(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Predicate::Matches {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    pub fn range(field: impl Into<String>, gte: Option<Value>, lte: Option<Value>) -> Self {
        Predicate::Range {
            field: field.into(),
            gte,
            lte,
        }
    }

    pub fn within_box(field: impl Into<String>, south_west: [f64; 2], north_east: [f64; 2]) -> Self {
        Predicate::WithinBox {
            field: field.into(),
            south_west,
            north_east,
        }
    }

    /// Conjunction that flattens nested `And`s and drops `All`.
    pub fn and(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        let mut flat = Vec::new();
        for p in predicates {
            match p {
                Predicate::All => {}
                Predicate::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Predicate::All,
            1 => flat.remove(0),
            _ => Predicate::And(flat),
        }
    }

    /// Top-level equality constraints, used to seed upserted documents.
    pub fn equalities(&self) -> Vec<(&str, &Value)> {
        match self {
            Predicate::Eq { field, value } => vec![(field.as_str(), value)],
            Predicate::And(inner) => inner.iter().flat_map(Predicate::equalities).collect(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn compile(&self) -> StoreResult<Matcher> {
        Ok(match self {
            Predicate::All => Matcher::All,
            Predicate::Eq { field, value } => Matcher::Eq(field.clone(), value.clone()),
            Predicate::In { field, values } => Matcher::In(field.clone(), values.clone()),
            Predicate::Contains { field, needle } => {
                Matcher::Contains(field.clone(), needle.clone())
            }
            Predicate::Matches { field, pattern } => {
                let re = Regex::new(pattern).map_err(|source| StoreError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })?;
                Matcher::Regex(field.clone(), re)
            }
            Predicate::Range { field, gte, lte } => {
                if gte.is_none() && lte.is_none() {
                    return Err(StoreError::InvalidQuery(format!(
                        "range on {field} has no bounds"
                    )));
                }
                Matcher::Range(field.clone(), gte.clone(), lte.clone())
            }
            Predicate::WithinBox {
                field,
                south_west,
                north_east,
            } => {
                if south_west.iter().chain(north_east).any(|c| !c.is_finite()) {
                    return Err(StoreError::InvalidQuery(format!(
                        "box on {field} has non-finite corners"
                    )));
                }
                Matcher::Box(field.clone(), *south_west, *north_east)
            }
            Predicate::And(inner) => Matcher::And(
                inner
                    .iter()
                    .map(Predicate::compile)
                    .collect::<StoreResult<Vec<_>>>()?,
            ),
        })
    }
}

/// A predicate with its patterns compiled, ready to test many documents.
#[derive(Debug)]
pub(crate) enum Matcher {
    All,
    Eq(String, Value),
    In(String, Vec<Value>),
    Contains(String, String),
    Regex(String, Regex),
    Range(String, Option<Value>, Option<Value>),
    Box(String, [f64; 2], [f64; 2]),
    And(Vec<Matcher>),
}

impl Matcher {
    pub(crate) fn test(&self, doc: &Document) -> bool {
        match self {
            Matcher::All => true,
            Matcher::Eq(field, expected) => any_scalar(doc, field, |v| v == expected),
            Matcher::In(field, values) => any_scalar(doc, field, |v| values.contains(v)),
            Matcher::Contains(field, needle) => {
                any_scalar(doc, field, |v| v.as_str().is_some_and(|s| s.contains(needle)))
            }
            Matcher::Regex(field, re) => {
                any_scalar(doc, field, |v| v.as_str().is_some_and(|s| re.is_match(s)))
            }
            Matcher::Range(field, gte, lte) => any_scalar(doc, field, |v| {
                let lower_ok = gte
                    .as_ref()
                    .map_or(true, |b| matches!(compare(v, b), Some(Ordering::Greater | Ordering::Equal)));
                let upper_ok = lte
                    .as_ref()
                    .map_or(true, |b| matches!(compare(v, b), Some(Ordering::Less | Ordering::Equal)));
                lower_ok && upper_ok
            }),
            Matcher::Box(field, sw, ne) => lookup(doc, field)
                .and_then(point_of)
                .is_some_and(|(lng, lat)| {
                    sw[0] <= lng && lng <= ne[0] && sw[1] <= lat && lat <= ne[1]
                }),
            Matcher::And(inner) => inner.iter().all(|m| m.test(doc)),
        }
    }
}

/// Resolves a dotted path inside a document.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn any_scalar(doc: &Document, path: &str, pred: impl Fn(&Value) -> bool) -> bool {
    match lookup(doc, path) {
        Some(Value::Array(items)) => items.iter().any(&pred),
        Some(v) => pred(v),
        None => false,
    }
}

fn point_of(value: &Value) -> Option<(f64, f64)> {
    let coords = match value {
        Value::Array(_) => value,
        Value::Object(map) => map.get("coordinates")?,
        _ => return None,
    };
    let arr = coords.as_array()?;
    if arr.len() != 2 {
        return None;
    }
    Some((arr[0].as_f64()?, arr[1].as_f64()?))
}

/// Orders two scalar values of the same kind.
pub(crate) fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}
