//! Typed access to the catalog collections.
//!
//! [`Repository`] turns the untyped [`StoreHandle`] calls into calls over
//! entity records, encoding and decoding BSON on the way.

use std::marker::PhantomData;

use bson::{oid::ObjectId, Bson, Document};
use bookreview_db::{Collection, Filter, FindOptions, StoreHandle, StoreResult};
use serde::{de::DeserializeOwned, Serialize};

use crate::modules::authors::models::Author;
use crate::modules::books::models::Book;
use crate::modules::reviews::models::Review;
use crate::modules::sales::models::Sale;

/// A record type persisted in one collection.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: Collection;

    fn id(&self) -> ObjectId;
}

/// Parse a path or payload id. Anything that is not a 24-char hex ObjectId
/// cannot name a stored record.
pub fn parse_id(raw: &str) -> Option<ObjectId> {
    ObjectId::parse_str(raw.trim()).ok()
}

pub struct Repository<E> {
    store: StoreHandle,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(store: StoreHandle) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    fn decode(document: Document) -> StoreResult<E> {
        Ok(bson::from_document(document)?)
    }

    fn decode_all(documents: Vec<Document>) -> StoreResult<Vec<E>> {
        documents.into_iter().map(Self::decode).collect()
    }

    pub async fn list(&self) -> StoreResult<Vec<E>> {
        self.find(Filter::All, FindOptions::default()).await
    }

    pub async fn find(&self, filter: Filter, options: FindOptions) -> StoreResult<Vec<E>> {
        let documents = self.store.find(E::COLLECTION, &filter, &options).await?;
        Self::decode_all(documents)
    }

    /// Records whose `_id` is in `ids`.
    pub async fn find_many(&self, ids: &[ObjectId]) -> StoreResult<Vec<E>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = ids.iter().copied().map(Bson::ObjectId).collect();
        self.find(Filter::any_of("_id", ids), FindOptions::default())
            .await
    }

    pub async fn get(&self, id: ObjectId) -> StoreResult<Option<E>> {
        self.store
            .find_one(E::COLLECTION, id)
            .await?
            .map(Self::decode)
            .transpose()
    }

    pub async fn exists(&self, id: ObjectId) -> StoreResult<bool> {
        Ok(self.store.find_one(E::COLLECTION, id).await?.is_some())
    }

    pub async fn insert(&self, entity: &E) -> StoreResult<()> {
        let document = bson::to_document(entity)?;
        self.store.insert_one(E::COLLECTION, document).await
    }

    pub async fn insert_many(&self, entities: &[E]) -> StoreResult<()> {
        let documents = entities
            .iter()
            .map(bson::to_document)
            .collect::<Result<Vec<_>, _>>()?;
        self.store.insert_many(E::COLLECTION, documents).await
    }

    /// Apply a partial change set; `changes` is any serializable struct whose
    /// unset fields are skipped.
    pub async fn update<C: Serialize>(&self, id: ObjectId, changes: &C) -> StoreResult<Option<E>> {
        let changes = bson::to_document(changes)?;
        self.store
            .update_one(E::COLLECTION, id, changes)
            .await?
            .map(Self::decode)
            .transpose()
    }

    pub async fn delete(&self, id: ObjectId) -> StoreResult<Option<E>> {
        self.store
            .delete_one(E::COLLECTION, id)
            .await?
            .map(Self::decode)
            .transpose()
    }

    pub async fn clear(&self) -> StoreResult<u64> {
        self.store.clear(E::COLLECTION).await
    }
}

/// Repositories for every collection, shared as handler state.
#[derive(Clone)]
pub struct Catalog {
    pub authors: Repository<Author>,
    pub books: Repository<Book>,
    pub reviews: Repository<Review>,
    pub sales: Repository<Sale>,
}

impl Catalog {
    pub fn new(store: StoreHandle) -> Self {
        Self {
            authors: Repository::new(store.clone()),
            books: Repository::new(store.clone()),
            reviews: Repository::new(store.clone()),
            sales: Repository::new(store),
        }
    }
}
