use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bson::{oid::ObjectId, Bson, Document};

use crate::error::StoreResult;

/// The collections making up the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Authors,
    Books,
    Reviews,
    Sales,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Authors,
        Collection::Books,
        Collection::Reviews,
        Collection::Sales,
    ];

    /// Name of the collection in the datastore.
    pub const fn name(self) -> &'static str {
        match self {
            Collection::Authors => "authors",
            Collection::Books => "books",
            Collection::Reviews => "reviews",
            Collection::Sales => "sales",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Selection criteria for [`DocumentStore::find`].
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Every document in the collection.
    All,
    /// Documents whose `field` equals the value.
    Eq(String, Bson),
    /// Documents whose `field` equals any of the values.
    In(String, Vec<Bson>),
    /// Documents matching any of the words through the collection's text index.
    Text(String),
    /// Documents whose string `field` contains the text, ignoring case.
    Contains(String, String),
    /// Documents matching every filter; no filters matches everything.
    Every(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::Eq(field.into(), value.into())
    }

    pub fn any_of(field: impl Into<String>, values: Vec<Bson>) -> Self {
        Self::In(field.into(), values)
    }

    pub fn contains(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Contains(field.into(), text.into())
    }
}

/// Ordering and limit applied to a find.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Sort descending on this field.
    pub sort_desc: Option<String>,
    pub limit: Option<i64>,
}

impl FindOptions {
    pub fn top(field: impl Into<String>, limit: i64) -> Self {
        Self {
            sort_desc: Some(field.into()),
            limit: Some(limit),
        }
    }
}

/// Kind of index declared on a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// Compound full-text index over the listed fields.
    Text(&'static [&'static str]),
    /// Ascending index over the listed fields.
    Ascending(&'static [&'static str]),
    /// Ascending index rejecting a second document with the same values
    /// for all the listed fields.
    Unique(&'static [&'static str]),
}

/// An index a module needs on one of its collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    pub collection: Collection,
    pub name: &'static str,
    pub kind: IndexKind,
}

/// Thin document store contract. Every catalog operation maps onto exactly
/// one of these calls, so backends stay passthroughs to their driver.
///
/// Documents carry their identity in `_id`.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Check that the backend is reachable.
    async fn ping(&self) -> StoreResult<()>;

    /// Create the index if it does not exist yet.
    async fn ensure_index(&self, index: &IndexSpec) -> StoreResult<()>;

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> StoreResult<Vec<Document>>;

    async fn find_one(&self, collection: Collection, id: ObjectId)
        -> StoreResult<Option<Document>>;

    /// Fails with [`StoreError::DuplicateKey`] when a unique index would be violated.
    ///
    /// [`StoreError::DuplicateKey`]: crate::StoreError::DuplicateKey
    async fn insert_one(&self, collection: Collection, document: Document) -> StoreResult<()>;

    async fn insert_many(&self, collection: Collection, documents: Vec<Document>)
        -> StoreResult<()>;

    /// Merge `changes` into the document and return the post-update state,
    /// or `None` when no document has that id.
    async fn update_one(
        &self,
        collection: Collection,
        id: ObjectId,
        changes: Document,
    ) -> StoreResult<Option<Document>>;

    /// Remove the document and return it, or `None` when it did not exist.
    async fn delete_one(&self, collection: Collection, id: ObjectId)
        -> StoreResult<Option<Document>>;

    /// Remove every document in the collection, returning how many were removed.
    async fn clear(&self, collection: Collection) -> StoreResult<u64>;

    /// Release backend resources. Called once during shutdown.
    async fn shutdown(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// A cheaply clonable handle to a document store, shared by every module.
#[derive(Clone)]
pub struct StoreHandle(Arc<dyn DocumentStore>);

impl StoreHandle {
    pub fn new<S: DocumentStore>(store: S) -> Self {
        Self(Arc::new(store))
    }

    pub async fn ping(&self) -> StoreResult<()> {
        self.0.ping().await
    }

    pub async fn ensure_index(&self, index: &IndexSpec) -> StoreResult<()> {
        tracing::debug!(
            collection = %index.collection,
            index = index.name,
            "ensuring index"
        );
        self.0.ensure_index(index).await
    }

    pub async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> StoreResult<Vec<Document>> {
        self.0.find(collection, filter, options).await
    }

    pub async fn find_one(
        &self,
        collection: Collection,
        id: ObjectId,
    ) -> StoreResult<Option<Document>> {
        self.0.find_one(collection, id).await
    }

    pub async fn insert_one(&self, collection: Collection, document: Document) -> StoreResult<()> {
        self.0.insert_one(collection, document).await
    }

    pub async fn insert_many(
        &self,
        collection: Collection,
        documents: Vec<Document>,
    ) -> StoreResult<()> {
        if documents.is_empty() {
            return Ok(());
        }
        self.0.insert_many(collection, documents).await
    }

    pub async fn update_one(
        &self,
        collection: Collection,
        id: ObjectId,
        changes: Document,
    ) -> StoreResult<Option<Document>> {
        self.0.update_one(collection, id, changes).await
    }

    pub async fn delete_one(
        &self,
        collection: Collection,
        id: ObjectId,
    ) -> StoreResult<Option<Document>> {
        self.0.delete_one(collection, id).await
    }

    pub async fn clear(&self, collection: Collection) -> StoreResult<u64> {
        self.0.clear(collection).await
    }

    pub async fn shutdown(&self) -> StoreResult<()> {
        self.0.shutdown().await
    }
}
