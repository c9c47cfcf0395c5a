//! Document mutations applied by `update_one`.

use crate::{Document, Predicate, ID_FIELD};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Overwrites the listed top-level fields.
    Set(Document),
    /// Appends `value` to the array at `field` unless already present.
    AddToSet { field: String, value: Value },
    /// Removes every occurrence of `value` from the array at `field`.
    Pull { field: String, value: Value },
}

impl Mutation {
    pub fn add_to_set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Mutation::AddToSet {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn pull(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Mutation::Pull {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Applies the mutation in place, returning whether the document changed.
    pub(crate) fn apply(&self, doc: &mut Document) -> bool {
        match self {
            Mutation::Set(fields) => {
                let mut changed = false;
                for (k, v) in fields {
                    // The identity of a stored document never changes.
                    if k == ID_FIELD && doc.contains_key(ID_FIELD) {
                        continue;
                    }
                    if doc.get(k) != Some(v) {
                        doc.insert(k.clone(), v.clone());
                        changed = true;
                    }
                }
                changed
            }
            Mutation::AddToSet { field, value } => {
                let slot = doc
                    .entry(field.clone())
                    .or_insert_with(|| Value::Array(Vec::new()));
                if !slot.is_array() {
                    tracing::warn!("addToSet on non-array field {field}; replacing with array");
                    *slot = Value::Array(Vec::new());
                }
                match slot.as_array_mut() {
                    Some(items) if !items.contains(value) => {
                        items.push(value.clone());
                        true
                    }
                    _ => false,
                }
            }
            Mutation::Pull { field, value } => match doc.get_mut(field) {
                Some(Value::Array(items)) => {
                    let before = items.len();
                    items.retain(|v| v != value);
                    items.len() != before
                }
                _ => false,
            },
        }
    }

    /// Builds the document an upsert inserts when nothing matched.
    pub(crate) fn seed(&self, predicate: &Predicate) -> Document {
        let mut doc = Document::new();
        for (field, value) in predicate.equalities() {
            // Dotted equality fields cannot be materialised unambiguously.
            if !field.contains('.') {
                doc.insert(field.to_string(), value.clone());
            }
        }
        self.apply(&mut doc);
        doc.entry(ID_FIELD.to_string())
            .or_insert_with(|| Value::String(uuid::Uuid::new_v4().simple().to_string()));
        doc
    }
}
