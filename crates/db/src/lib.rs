//! Document store access for the book review catalog.
//!
//! Handlers never talk to a driver directly. They go through [`StoreHandle`],
//! which wraps any [`DocumentStore`] implementation: [`MongoStore`] in
//! production and [`MemoryStore`] for tests and local experiments.

pub mod error;
pub mod memory;
pub mod mongo;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use store::{Collection, DocumentStore, Filter, FindOptions, IndexKind, IndexSpec, StoreHandle};

/// Connect to MongoDB and verify the connection with a ping.
///
/// `default_database` is used when the URI does not name a database.
pub async fn connect(uri: &str, default_database: &str) -> StoreResult<StoreHandle> {
    let store = MongoStore::connect(uri, default_database).await?;
    let handle = StoreHandle::new(store);
    handle.ping().await?;
    tracing::info!(target: "bookreview-db", "datastore connection established");
    Ok(handle)
}
