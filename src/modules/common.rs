//! Response shapes and error mapping shared by the catalog modules.

use bookreview_db::StoreError;
use bookreview_http::error::AppError;
use bson::oid::ObjectId;
use serde::Serialize;
use utoipa::ToSchema;

use crate::catalog::{Catalog, Entity, Repository};
use crate::validation::dangling_reference;

/// Confirmation returned by every delete endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedMessage {
    /// e.g. "Book deleted"
    pub message: String,
}

impl DeletedMessage {
    pub fn new(entity: &str) -> Self {
        Self {
            message: format!("{entity} deleted"),
        }
    }
}

/// Map a datastore failure to a 500 carrying only `message`.
pub fn backend(message: &'static str) -> impl FnOnce(StoreError) -> AppError {
    move |err| AppError::internal(message, err)
}

/// Fail with a `not_found` detail on `book` unless the referenced book exists.
pub async fn ensure_book_exists(
    catalog: &Catalog,
    book: ObjectId,
    message: &str,
) -> Result<(), AppError> {
    let exists = catalog
        .books
        .exists(book)
        .await
        .map_err(backend("Failed to fetch book"))?;
    if exists {
        Ok(())
    } else {
        Err(dangling_reference("book", message))
    }
}

/// Fail with 404 `not_found` unless the record being changed exists.
pub async fn ensure_record_exists<E: Entity>(
    repository: &Repository<E>,
    id: ObjectId,
    not_found: &str,
    failure: &'static str,
) -> Result<(), AppError> {
    if repository.exists(id).await.map_err(backend(failure))? {
        Ok(())
    } else {
        Err(AppError::not_found(not_found))
    }
}
