//! In-memory [`DocumentStore`] with optional JSON-file persistence.
//!
//! ## Storage Layout
//!
//! ```text
//! <data_dir>/
//!   hospitals.json     # [ { "_id": "...", ... }, ... ]
//!   moonlights.json
//!   holidays.json
//!   ...
//! ```
//!
//! Every mutating call stages its change on a copy of the collection, rewrites
//! the collection file through a temporary file and a rename, and only then
//! swaps the copy in. A failed write leaves the in-memory state untouched.

use crate::pipeline::{self, FindOptions, Sort, Stage};
use crate::{
    DeleteResult, Document, DocumentStore, Mutation, Predicate, StoreError, StoreResult,
    UpdateResult,
};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    data_dir: Option<PathBuf>,
}

impl MemoryStore {
    /// An empty store that never touches the filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*.json` collection file in `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if:
    /// - `data_dir` is not an existing directory,
    /// - a collection file cannot be read,
    /// - a collection file is not a JSON array of objects.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        if !data_dir.is_dir() {
            return Err(StoreError::MissingDataDir(data_dir.to_path_buf()));
        }

        let read_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| StoreError::Read { path, source }
        };

        let mut collections = HashMap::new();
        for entry in fs::read_dir(data_dir).map_err(read_err(data_dir))? {
            let path = entry.map_err(read_err(data_dir))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }

            let raw = fs::read_to_string(&path).map_err(read_err(&path))?;
            let docs: Vec<Document> =
                serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
                    path: path.clone(),
                    source,
                })?;
            tracing::info!("loaded {} documents into collection {}", docs.len(), name);
            collections.insert(name.to_string(), docs);
        }

        Ok(Self {
            collections: RwLock::new(collections),
            data_dir: Some(data_dir.to_path_buf()),
        })
    }

    /// Appends documents to a collection, creating it if needed.
    pub fn insert_many(
        &self,
        collection: &str,
        docs: impl IntoIterator<Item = Document>,
    ) -> StoreResult<usize> {
        validate_collection_name(collection)?;
        let mut guard = self.write()?;
        let mut staged = guard.get(collection).cloned().unwrap_or_default();
        let before = staged.len();
        staged.extend(docs);
        let inserted = staged.len() - before;
        self.commit(&mut guard, collection, staged)?;
        Ok(inserted)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<String, Vec<Document>>>> {
        self.collections.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<String, Vec<Document>>>> {
        self.collections.write().map_err(|_| StoreError::LockPoisoned)
    }

    fn filtered(&self, collection: &str, predicate: &Predicate) -> StoreResult<Vec<Document>> {
        validate_collection_name(collection)?;
        let matcher = predicate.compile()?;
        let guard = self.read()?;
        Ok(guard
            .get(collection)
            .map(|docs| docs.iter().filter(|d| matcher.test(d)).cloned().collect())
            .unwrap_or_default())
    }

    /// Persists `staged` and, once written, makes it the live collection.
    fn commit(
        &self,
        guard: &mut HashMap<String, Vec<Document>>,
        collection: &str,
        staged: Vec<Document>,
    ) -> StoreResult<()> {
        self.persist(collection, &staged)?;
        guard.insert(collection.to_string(), staged);
        Ok(())
    }

    fn persist(&self, collection: &str, docs: &[Document]) -> StoreResult<()> {
        let Some(dir) = &self.data_dir else {
            return Ok(());
        };
        let path = dir.join(format!("{collection}.json"));
        let tmp = dir.join(format!(".{collection}.json.tmp"));

        let raw = serde_json::to_string_pretty(docs).map_err(|source| StoreError::Serialise {
            collection: collection.to_string(),
            source,
        })?;
        fs::write(&tmp, raw).map_err(|source| StoreError::Write {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Write { path, source })
    }
}

impl DocumentStore for MemoryStore {
    fn count(&self, collection: &str, predicate: &Predicate) -> StoreResult<u64> {
        Ok(self.filtered(collection, predicate)?.len() as u64)
    }

    fn find_one(
        &self,
        collection: &str,
        predicate: &Predicate,
        sort: Option<&Sort>,
    ) -> StoreResult<Option<Document>> {
        let mut docs = self.filtered(collection, predicate)?;
        if let Some(sort) = sort {
            sort.apply(&mut docs);
        }
        Ok(docs.into_iter().next())
    }

    fn find_many(
        &self,
        collection: &str,
        predicate: &Predicate,
        options: &FindOptions,
    ) -> StoreResult<Vec<Document>> {
        let mut docs = self.filtered(collection, predicate)?;
        if let Some(sort) = &options.sort {
            sort.apply(&mut docs);
        }
        if let Some(limit) = options.limit {
            docs.truncate(limit);
        }
        Ok(docs)
    }

    fn aggregate(&self, collection: &str, stages: &[Stage]) -> StoreResult<Vec<Document>> {
        validate_collection_name(collection)?;
        let docs = self.read()?.get(collection).cloned().unwrap_or_default();
        pipeline::run(docs, stages)
    }

    fn update_one(
        &self,
        collection: &str,
        predicate: &Predicate,
        mutation: &Mutation,
        upsert: bool,
    ) -> StoreResult<UpdateResult> {
        validate_collection_name(collection)?;
        let matcher = predicate.compile()?;
        let mut guard = self.write()?;
        let mut staged = guard.get(collection).cloned().unwrap_or_default();

        if let Some(doc) = staged.iter_mut().find(|d| matcher.test(d)) {
            let changed = mutation.apply(doc);
            if changed {
                self.commit(&mut guard, collection, staged)?;
            }
            return Ok(UpdateResult {
                matched_count: 1,
                modified_count: u64::from(changed),
                ..UpdateResult::default()
            });
        }

        if !upsert {
            return Ok(UpdateResult::default());
        }

        let seeded = mutation.seed(predicate);
        let upserted_id = seeded.get(crate::ID_FIELD).cloned();
        staged.push(seeded);
        self.commit(&mut guard, collection, staged)?;
        Ok(UpdateResult {
            upserted_count: 1,
            upserted_id,
            ..UpdateResult::default()
        })
    }

    fn delete_one(&self, collection: &str, predicate: &Predicate) -> StoreResult<DeleteResult> {
        validate_collection_name(collection)?;
        let matcher = predicate.compile()?;
        let mut guard = self.write()?;
        let Some(docs) = guard.get(collection) else {
            return Ok(DeleteResult::default());
        };
        match docs.iter().position(|d| matcher.test(d)) {
            Some(i) => {
                let mut staged = docs.clone();
                staged.remove(i);
                self.commit(&mut guard, collection, staged)?;
                Ok(DeleteResult { deleted_count: 1 })
            }
            None => Ok(DeleteResult::default()),
        }
    }
}

fn validate_collection_name(name: &str) -> StoreResult<()> {
    let ok = !name.is_empty()
        && !name.starts_with('.')
        && name
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'-'));
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidQuery(format!(
            "invalid collection name {name:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn open_rejects_missing_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let missing = temp_dir.path().join("nope");
        assert!(matches!(
            MemoryStore::open(&missing),
            Err(StoreError::MissingDataDir(_))
        ));
    }

    #[test]
    fn open_loads_collections_and_rejects_bad_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(
            temp_dir.path().join("holidays.json"),
            r#"[{"holidays": ["20261009"]}]"#,
        )
        .unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

        let store = MemoryStore::open(temp_dir.path()).expect("open should succeed");
        assert_eq!(store.count("holidays", &Predicate::All).unwrap(), 1);

        fs::write(temp_dir.path().join("likes.json"), "{}").unwrap();
        assert!(matches!(
            MemoryStore::open(temp_dir.path()),
            Err(StoreError::Parse { .. })
        ));
    }

    #[test]
    fn updates_are_persisted_and_reloaded() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = MemoryStore::open(temp_dir.path()).unwrap();

        let result = store
            .update_one(
                "likes",
                &Predicate::eq("hospitalId", "h1"),
                &Mutation::add_to_set("userIds", "u1"),
                true,
            )
            .unwrap();
        assert_eq!(result.upserted_count, 1);
        assert!(result.upserted_id.is_some());

        let reopened = MemoryStore::open(temp_dir.path()).unwrap();
        let found = reopened
            .find_one("likes", &Predicate::eq("hospitalId", "h1"), None)
            .unwrap()
            .expect("like document should be persisted");
        assert_eq!(found["userIds"], json!(["u1"]));
        assert!(!temp_dir.path().join(".likes.json.tmp").exists());
    }

    #[test]
    fn failed_write_leaves_collection_unchanged() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_dir = temp_dir.path().join("data");
        fs::create_dir(&data_dir).unwrap();
        fs::write(
            data_dir.join("likes.json"),
            r#"[{"hospitalId": "h2", "userIds": ["u9"]}]"#,
        )
        .unwrap();
        let store = MemoryStore::open(&data_dir).unwrap();
        fs::remove_dir_all(&data_dir).unwrap();

        let upsert = store.update_one(
            "likes",
            &Predicate::eq("hospitalId", "h1"),
            &Mutation::add_to_set("userIds", "u1"),
            true,
        );
        assert!(matches!(upsert, Err(StoreError::Write { .. })));
        assert_eq!(
            store.count("likes", &Predicate::eq("hospitalId", "h1")).unwrap(),
            0
        );

        let modify = store.update_one(
            "likes",
            &Predicate::eq("hospitalId", "h2"),
            &Mutation::add_to_set("userIds", "u1"),
            false,
        );
        assert!(modify.is_err());
        let kept = store
            .find_one("likes", &Predicate::eq("hospitalId", "h2"), None)
            .unwrap()
            .expect("existing document should survive");
        assert_eq!(kept["userIds"], json!(["u9"]));

        assert!(store.delete_one("likes", &Predicate::All).is_err());
        assert!(store
            .insert_many("likes", [doc(json!({"hospitalId": "h3"}))])
            .is_err());
        assert_eq!(store.count("likes", &Predicate::All).unwrap(), 1);
    }

    #[test]
    fn update_without_upsert_leaves_store_untouched() {
        let store = MemoryStore::new();
        let result = store
            .update_one(
                "likes",
                &Predicate::eq("hospitalId", "h1"),
                &Mutation::pull("userIds", "u1"),
                false,
            )
            .unwrap();
        assert_eq!(result, UpdateResult::default());
        assert_eq!(store.count("likes", &Predicate::All).unwrap(), 0);
    }

    #[test]
    fn matched_update_reports_modification() {
        let store = MemoryStore::new();
        store
            .insert_many("likes", [doc(json!({"hospitalId": "h1", "userIds": ["u1"]}))])
            .unwrap();
        let first = store
            .update_one(
                "likes",
                &Predicate::eq("hospitalId", "h1"),
                &Mutation::add_to_set("userIds", "u1"),
                true,
            )
            .unwrap();
        assert_eq!((first.matched_count, first.modified_count), (1, 0));
        let second = store
            .update_one(
                "likes",
                &Predicate::eq("hospitalId", "h1"),
                &Mutation::add_to_set("userIds", "u2"),
                true,
            )
            .unwrap();
        assert_eq!((second.matched_count, second.modified_count), (1, 1));
    }

    #[test]
    fn find_many_sorts_and_limits() {
        let store = MemoryStore::new();
        store
            .insert_many(
                "announcements",
                [
                    doc(json!({"timestamp": "2026-01-02"})),
                    doc(json!({"timestamp": "2026-01-03"})),
                    doc(json!({"timestamp": "2026-01-01"})),
                ],
            )
            .unwrap();
        let docs = store
            .find_many(
                "announcements",
                &Predicate::All,
                &FindOptions {
                    sort: Some(Sort::descending("timestamp")),
                    limit: Some(2),
                },
            )
            .unwrap();
        let stamps: Vec<&str> = docs.iter().filter_map(|d| d["timestamp"].as_str()).collect();
        assert_eq!(stamps, vec!["2026-01-03", "2026-01-02"]);
    }

    #[test]
    fn delete_one_removes_first_match_only() {
        let store = MemoryStore::new();
        store
            .insert_many("users", [doc(json!({"k": 1})), doc(json!({"k": 1}))])
            .unwrap();
        let deleted = store.delete_one("users", &Predicate::eq("k", 1)).unwrap();
        assert_eq!(deleted.deleted_count, 1);
        assert_eq!(store.count("users", &Predicate::All).unwrap(), 1);
        let none = store.delete_one("missing", &Predicate::All).unwrap();
        assert_eq!(none.deleted_count, 0);
    }

    #[test]
    fn collection_names_cannot_escape_the_data_dir() {
        let store = MemoryStore::new();
        let err = store.count("../etc", &Predicate::All).unwrap_err();
        assert!(err.is_caller_error());
    }
}
