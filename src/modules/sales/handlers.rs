use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bookreview_db::StoreError;
use bookreview_http::{
    error::{AppError, ErrorResponse},
    extract::JsonBody,
};

use super::models::{SalePayload, SaleView, INVALID_SALE};
use crate::catalog::{parse_id, Catalog};
use crate::validation::{FieldErrors, DUPLICATE};
use crate::modules::common::{backend, ensure_book_exists, ensure_record_exists, DeletedMessage};

const NOT_FOUND: &str = "Sale not found";

/// Like [`backend`], except a second figure for the same book and year is a
/// validation error on `year`.
fn write_failure(message: &'static str) -> impl FnOnce(StoreError) -> AppError {
    move |err| match err {
        StoreError::DuplicateKey(_) => {
            let mut errors = FieldErrors::new();
            errors.push("year", DUPLICATE);
            errors.into_error(INVALID_SALE)
        }
        err => backend(message)(err),
    }
}

/// List all sales
#[utoipa::path(
    get,
    path = "/",
    tag = "Sales",
    responses(
        (status = 200, description = "List of sales", body = [SaleView]),
        (status = 500, description = "Datastore failure", body = ErrorResponse),
    )
)]
pub async fn list_sales(
    State(catalog): State<Catalog>,
) -> Result<Json<Vec<SaleView>>, AppError> {
    let sales = catalog
        .sales
        .list()
        .await
        .map_err(backend("Failed to fetch sales"))?;
    Ok(Json(sales.into_iter().map(SaleView::from).collect()))
}

/// Get a sale by id
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Sales",
    params(("id" = String, Path, description = "The sale id")),
    responses(
        (status = 200, description = "Sale data", body = SaleView),
        (status = 404, description = "Sale not found", body = ErrorResponse),
        (status = 500, description = "Datastore failure", body = ErrorResponse),
    )
)]
pub async fn get_sale(
    State(catalog): State<Catalog>,
    Path(id): Path<String>,
) -> Result<Json<SaleView>, AppError> {
    let id = parse_id(&id).ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    let sale = catalog
        .sales
        .get(id)
        .await
        .map_err(backend("Failed to fetch sale"))?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Json(sale.into()))
}

/// Record yearly sales of an existing book
#[utoipa::path(
    post,
    path = "/",
    tag = "Sales",
    request_body = SalePayload,
    responses(
        (status = 201, description = "Sale created", body = SaleView),
        (status = 400, description = "Invalid sale or a year already recorded for the book", body = ErrorResponse),
        (status = 500, description = "Datastore failure", body = ErrorResponse),
    )
)]
pub async fn create_sale(
    State(catalog): State<Catalog>,
    JsonBody(payload): JsonBody<SalePayload>,
) -> Result<(StatusCode, Json<SaleView>), AppError> {
    let sale = payload.into_sale()?;
    ensure_book_exists(&catalog, sale.book, INVALID_SALE).await?;
    catalog
        .sales
        .insert(&sale)
        .await
        .map_err(write_failure("Failed to create sale"))?;

    tracing::info!(sale_id = %sale.id, book_id = %sale.book, "sale created");
    Ok((StatusCode::CREATED, Json(sale.into())))
}

/// Update a sale by id, changing only the supplied fields
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Sales",
    params(("id" = String, Path, description = "The sale id")),
    request_body = SalePayload,
    responses(
        (status = 200, description = "Sale updated", body = SaleView),
        (status = 400, description = "Invalid sale or a year already recorded for the book", body = ErrorResponse),
        (status = 404, description = "Sale not found", body = ErrorResponse),
        (status = 500, description = "Datastore failure", body = ErrorResponse),
    )
)]
pub async fn update_sale(
    State(catalog): State<Catalog>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<SalePayload>,
) -> Result<Json<SaleView>, AppError> {
    let id = parse_id(&id).ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    ensure_record_exists(&catalog.sales, id, NOT_FOUND, "Failed to fetch sale").await?;
    let changes = payload.into_changes()?;
    if let Some(book) = changes.book {
        ensure_book_exists(&catalog, book, INVALID_SALE).await?;
    }
    let sale = catalog
        .sales
        .update(id, &changes)
        .await
        .map_err(write_failure("Failed to update sale"))?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Json(sale.into()))
}

/// Delete a sale by id
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Sales",
    params(("id" = String, Path, description = "The sale id")),
    responses(
        (status = 200, description = "Sale deleted", body = DeletedMessage),
        (status = 404, description = "Sale not found", body = ErrorResponse),
        (status = 500, description = "Datastore failure", body = ErrorResponse),
    )
)]
pub async fn delete_sale(
    State(catalog): State<Catalog>,
    Path(id): Path<String>,
) -> Result<Json<DeletedMessage>, AppError> {
    let id = parse_id(&id).ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    catalog
        .sales
        .delete(id)
        .await
        .map_err(backend("Failed to delete sale"))?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    tracing::info!(sale_id = %id, "sale deleted");
    Ok(Json(DeletedMessage::new("Sale")))
}
