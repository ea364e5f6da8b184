//! In-memory backend for [`DocumentStore`].
//!
//! Keeps every collection in a `Vec` in insertion order and mimics the
//! MongoDB behaviors the catalog relies on: `$set` merges, `$in` filters,
//! descending sort with limit, unique indexes, and text search that requires
//! a declared text index.

use std::collections::HashMap;

use async_trait::async_trait;
use bson::{oid::ObjectId, Bson, Document};
use parking_lot::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::store::{Collection, DocumentStore, Filter, FindOptions, IndexKind, IndexSpec};

#[derive(Debug, Default)]
struct State {
    collections: HashMap<Collection, Vec<Document>>,
    text_fields: HashMap<Collection, Vec<&'static str>>,
    unique_indexes: HashMap<Collection, Vec<(&'static str, &'static [&'static str])>>,
}

/// Document store held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in a collection.
    pub fn len(&self, collection: Collection) -> usize {
        self.state
            .read()
            .collections
            .get(&collection)
            .map_or(0, Vec::len)
    }

    pub fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection) == 0
    }
}

fn document_id(document: &Document) -> Option<ObjectId> {
    document.get_object_id("_id").ok()
}

fn numeric(value: Option<&Bson>) -> f64 {
    match value {
        Some(Bson::Int32(v)) => f64::from(*v),
        Some(Bson::Int64(v)) => *v as f64,
        Some(Bson::Double(v)) => *v,
        _ => f64::NEG_INFINITY,
    }
}

/// Whole-word, case-insensitive match of any query word, like `$text`
/// without stemming.
fn text_matches(document: &Document, fields: &[&'static str], words: &[String]) -> bool {
    fields.iter().any(|field| {
        document.get_str(field).is_ok_and(|text| {
            text.split(|c: char| !c.is_alphanumeric())
                .filter(|token| !token.is_empty())
                .any(|token| words.iter().any(|word| token.to_lowercase() == *word))
        })
    })
}

/// Values of the indexed fields; a missing field keys as null, as in MongoDB.
fn index_key(document: &Document, fields: &[&str]) -> Vec<Bson> {
    fields
        .iter()
        .map(|field| document.get(*field).cloned().unwrap_or(Bson::Null))
        .collect()
}

impl State {
    /// Fail when `candidate` shares a unique key with any document in
    /// `collection` other than the one with id `replacing`.
    fn check_unique(
        &self,
        collection: Collection,
        candidate: &Document,
        replacing: Option<ObjectId>,
    ) -> StoreResult<()> {
        let Some(indexes) = self.unique_indexes.get(&collection) else {
            return Ok(());
        };
        let existing = self.collections.get(&collection).into_iter().flatten();
        for document in existing {
            if replacing.is_some() && document_id(document) == replacing {
                continue;
            }
            for (name, fields) in indexes {
                if index_key(document, fields) == index_key(candidate, fields) {
                    return Err(StoreError::DuplicateKey(format!(
                        "{collection} index {name}"
                    )));
                }
            }
        }
        Ok(())
    }

    fn matches(&self, collection: Collection, document: &Document, filter: &Filter) -> StoreResult<bool> {
        Ok(match filter {
            Filter::All => true,
            Filter::Eq(field, value) => document.get(field) == Some(value),
            Filter::In(field, values) => document
                .get(field)
                .is_some_and(|found| values.contains(found)),
            Filter::Text(query) => {
                let fields = self
                    .text_fields
                    .get(&collection)
                    .ok_or(StoreError::MissingTextIndex(collection.name()))?;
                let words: Vec<String> = query
                    .split_whitespace()
                    .map(str::to_lowercase)
                    .collect();
                text_matches(document, fields, &words)
            }
            Filter::Contains(field, text) => document
                .get_str(field)
                .is_ok_and(|value| value.to_lowercase().contains(&text.to_lowercase())),
            Filter::Every(filters) => {
                for filter in filters {
                    if !self.matches(collection, document, filter)? {
                        return Ok(false);
                    }
                }
                true
            }
        })
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn ensure_index(&self, index: &IndexSpec) -> StoreResult<()> {
        let mut state = self.state.write();
        match index.kind {
            IndexKind::Text(fields) => {
                state.text_fields.insert(index.collection, fields.to_vec());
            }
            IndexKind::Unique(fields) => {
                let documents = state.collections.get(&index.collection).into_iter().flatten();
                let mut seen = Vec::new();
                for document in documents {
                    let key = index_key(document, fields);
                    if seen.contains(&key) {
                        return Err(StoreError::DuplicateKey(format!(
                            "{} index {}",
                            index.collection, index.name
                        )));
                    }
                    seen.push(key);
                }
                let declared = state.unique_indexes.entry(index.collection).or_default();
                if !declared.iter().any(|(name, _)| *name == index.name) {
                    declared.push((index.name, fields));
                }
            }
            IndexKind::Ascending(_) => {}
        }
        Ok(())
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> StoreResult<Vec<Document>> {
        let state = self.state.read();
        let mut found = Vec::new();
        for document in state.collections.get(&collection).into_iter().flatten() {
            if state.matches(collection, document, filter)? {
                found.push(document.clone());
            }
        }

        if let Some(field) = &options.sort_desc {
            // Stable sort keeps insertion order between equal keys.
            found.sort_by(|a, b| {
                numeric(b.get(field)).total_cmp(&numeric(a.get(field)))
            });
        }
        if let Some(limit) = options.limit.filter(|limit| *limit > 0) {
            found.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(found)
    }

    async fn find_one(
        &self,
        collection: Collection,
        id: ObjectId,
    ) -> StoreResult<Option<Document>> {
        let state = self.state.read();
        Ok(state
            .collections
            .get(&collection)
            .and_then(|documents| {
                documents
                    .iter()
                    .find(|document| document_id(document) == Some(id))
            })
            .cloned())
    }

    async fn insert_one(&self, collection: Collection, document: Document) -> StoreResult<()> {
        if document_id(&document).is_none() {
            return Err(StoreError::MissingId(collection.name()));
        }
        let mut state = self.state.write();
        state.check_unique(collection, &document, None)?;
        state
            .collections
            .entry(collection)
            .or_default()
            .push(document);
        Ok(())
    }

    async fn insert_many(
        &self,
        collection: Collection,
        documents: Vec<Document>,
    ) -> StoreResult<()> {
        if documents.iter().any(|document| document_id(document).is_none()) {
            return Err(StoreError::MissingId(collection.name()));
        }
        // Inserted one at a time so the batch is also checked against itself;
        // like an ordered insert, documents before a duplicate stay.
        let mut state = self.state.write();
        for document in documents {
            state.check_unique(collection, &document, None)?;
            state
                .collections
                .entry(collection)
                .or_default()
                .push(document);
        }
        Ok(())
    }

    async fn update_one(
        &self,
        collection: Collection,
        id: ObjectId,
        changes: Document,
    ) -> StoreResult<Option<Document>> {
        let mut state = self.state.write();
        let Some(mut updated) = state
            .collections
            .get(&collection)
            .and_then(|documents| {
                documents
                    .iter()
                    .find(|document| document_id(document) == Some(id))
            })
            .cloned()
        else {
            return Ok(None);
        };

        for (key, value) in changes {
            updated.insert(key, value);
        }
        state.check_unique(collection, &updated, Some(id))?;

        if let Some(document) = state
            .collections
            .get_mut(&collection)
            .and_then(|documents| {
                documents
                    .iter_mut()
                    .find(|document| document_id(document) == Some(id))
            })
        {
            *document = updated.clone();
        }
        Ok(Some(updated))
    }

    async fn delete_one(
        &self,
        collection: Collection,
        id: ObjectId,
    ) -> StoreResult<Option<Document>> {
        let mut state = self.state.write();
        let Some(documents) = state.collections.get_mut(&collection) else {
            return Ok(None);
        };
        let position = documents
            .iter()
            .position(|document| document_id(document) == Some(id));
        Ok(position.map(|index| documents.remove(index)))
    }

    async fn clear(&self, collection: Collection) -> StoreResult<u64> {
        let removed = self
            .state
            .write()
            .collections
            .remove(&collection)
            .map_or(0, |documents| documents.len());
        Ok(removed as u64)
    }
}
