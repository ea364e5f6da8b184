//! MongoDB backend for [`DocumentStore`].

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document};
use futures::TryStreamExt;
use mongodb::{
    options::{ClientOptions, FindOneAndUpdateOptions, IndexOptions, ReturnDocument},
    Client, Database, IndexModel,
};

use crate::error::StoreResult;
use crate::store::{Collection, DocumentStore, Filter, FindOptions, IndexKind, IndexSpec};

/// Document store backed by a single long-lived MongoDB client.
#[derive(Clone, Debug)]
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    /// Build a client from a connection string. No round trip happens here;
    /// use [`DocumentStore::ping`] to verify the server is reachable.
    pub async fn connect(uri: &str, default_database: &str) -> StoreResult<Self> {
        let options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(options)?;
        let database = client
            .default_database()
            .unwrap_or_else(|| client.database(default_database));

        tracing::info!(
            target: "bookreview-db",
            database = database.name(),
            "mongodb client created"
        );

        Ok(Self { client, database })
    }

    fn collection(&self, collection: Collection) -> mongodb::Collection<Document> {
        self.database.collection(collection.name())
    }
}

fn filter_document(filter: &Filter) -> Document {
    match filter {
        Filter::All => Document::new(),
        Filter::Eq(field, value) => {
            let mut query = Document::new();
            query.insert(field.clone(), value.clone());
            query
        }
        Filter::In(field, values) => {
            let mut query = Document::new();
            query.insert(field.clone(), doc! { "$in": values.clone() });
            query
        }
        Filter::Text(words) => doc! { "$text": { "$search": words.as_str() } },
        Filter::Contains(field, text) => {
            let mut query = Document::new();
            query.insert(
                field.clone(),
                doc! { "$regex": escape_regex(text), "$options": "i" },
            );
            query
        }
        Filter::Every(filters) if filters.is_empty() => Document::new(),
        Filter::Every(filters) => {
            let clauses: Vec<Document> = filters.iter().map(filter_document).collect();
            doc! { "$and": clauses }
        }
    }
}

/// Match `text` literally inside a `$regex`.
fn escape_regex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn index_keys(kind: &IndexKind) -> Document {
    let mut keys = Document::new();
    match kind {
        IndexKind::Text(fields) => {
            for field in fields.iter() {
                keys.insert(*field, "text");
            }
        }
        IndexKind::Ascending(fields) | IndexKind::Unique(fields) => {
            for field in fields.iter() {
                keys.insert(*field, 1_i32);
            }
        }
    }
    keys
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn ping(&self) -> StoreResult<()> {
        self.database.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    async fn ensure_index(&self, index: &IndexSpec) -> StoreResult<()> {
        let unique = matches!(index.kind, IndexKind::Unique(_));
        let model = IndexModel::builder()
            .keys(index_keys(&index.kind))
            .options(
                IndexOptions::builder()
                    .name(index.name.to_string())
                    .unique(unique.then_some(true))
                    .build(),
            )
            .build();
        self.collection(index.collection)
            .create_index(model, None)
            .await?;
        Ok(())
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> StoreResult<Vec<Document>> {
        let mut find_options = mongodb::options::FindOptions::default();
        find_options.sort = options.sort_desc.as_ref().map(|field| {
            let mut sort = Document::new();
            sort.insert(field.clone(), -1_i32);
            sort.insert("_id", 1_i32);
            sort
        });
        find_options.limit = options.limit;

        let cursor = self
            .collection(collection)
            .find(filter_document(filter), find_options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_one(
        &self,
        collection: Collection,
        id: ObjectId,
    ) -> StoreResult<Option<Document>> {
        Ok(self
            .collection(collection)
            .find_one(doc! { "_id": id }, None)
            .await?)
    }

    async fn insert_one(&self, collection: Collection, document: Document) -> StoreResult<()> {
        self.collection(collection)
            .insert_one(document, None)
            .await?;
        Ok(())
    }

    async fn insert_many(
        &self,
        collection: Collection,
        documents: Vec<Document>,
    ) -> StoreResult<()> {
        self.collection(collection)
            .insert_many(documents, None)
            .await?;
        Ok(())
    }

    async fn update_one(
        &self,
        collection: Collection,
        id: ObjectId,
        changes: Document,
    ) -> StoreResult<Option<Document>> {
        // MongoDB rejects an empty $set.
        if changes.is_empty() {
            return self.find_one(collection, id).await;
        }

        let mut options = FindOneAndUpdateOptions::default();
        options.return_document = Some(ReturnDocument::After);

        Ok(self
            .collection(collection)
            .find_one_and_update(
                doc! { "_id": id },
                doc! { "$set": Bson::Document(changes) },
                options,
            )
            .await?)
    }

    async fn delete_one(
        &self,
        collection: Collection,
        id: ObjectId,
    ) -> StoreResult<Option<Document>> {
        Ok(self
            .collection(collection)
            .find_one_and_delete(doc! { "_id": id }, None)
            .await?)
    }

    async fn clear(&self, collection: Collection) -> StoreResult<u64> {
        let result = self
            .collection(collection)
            .delete_many(Document::new(), None)
            .await?;
        Ok(result.deleted_count)
    }

    async fn shutdown(&self) -> StoreResult<()> {
        self.client.clone().shutdown().await;
        tracing::info!(target: "bookreview-db", "mongodb client shut down");
        Ok(())
    }
}
