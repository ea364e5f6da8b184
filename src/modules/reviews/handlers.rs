use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bookreview_http::{
    error::{AppError, ErrorResponse},
    extract::JsonBody,
};

use super::models::{ReviewPayload, ReviewView, INVALID_REVIEW};
use crate::catalog::{parse_id, Catalog};
use crate::modules::common::{backend, ensure_book_exists, ensure_record_exists, DeletedMessage};

const NOT_FOUND: &str = "Review not found";

/// List all reviews
#[utoipa::path(
    get,
    path = "/",
    tag = "Reviews",
    responses(
        (status = 200, description = "List of reviews", body = [ReviewView]),
        (status = 500, description = "Datastore failure", body = ErrorResponse),
    )
)]
pub async fn list_reviews(
    State(catalog): State<Catalog>,
) -> Result<Json<Vec<ReviewView>>, AppError> {
    let reviews = catalog
        .reviews
        .list()
        .await
        .map_err(backend("Failed to fetch reviews"))?;
    Ok(Json(reviews.into_iter().map(ReviewView::from).collect()))
}

/// Get a review by id
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Reviews",
    params(("id" = String, Path, description = "The review id")),
    responses(
        (status = 200, description = "Review data", body = ReviewView),
        (status = 404, description = "Review not found", body = ErrorResponse),
        (status = 500, description = "Datastore failure", body = ErrorResponse),
    )
)]
pub async fn get_review(
    State(catalog): State<Catalog>,
    Path(id): Path<String>,
) -> Result<Json<ReviewView>, AppError> {
    let id = parse_id(&id).ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    let review = catalog
        .reviews
        .get(id)
        .await
        .map_err(backend("Failed to fetch review"))?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Json(review.into()))
}

/// Review an existing book
#[utoipa::path(
    post,
    path = "/",
    tag = "Reviews",
    request_body = ReviewPayload,
    responses(
        (status = 201, description = "Review created", body = ReviewView),
        (status = 400, description = "Invalid review or unknown book", body = ErrorResponse),
        (status = 500, description = "Datastore failure", body = ErrorResponse),
    )
)]
pub async fn create_review(
    State(catalog): State<Catalog>,
    JsonBody(payload): JsonBody<ReviewPayload>,
) -> Result<(StatusCode, Json<ReviewView>), AppError> {
    let review = payload.into_review()?;
    ensure_book_exists(&catalog, review.book, INVALID_REVIEW).await?;
    catalog
        .reviews
        .insert(&review)
        .await
        .map_err(backend("Failed to create review"))?;

    tracing::info!(review_id = %review.id, book_id = %review.book, "review created");
    Ok((StatusCode::CREATED, Json(review.into())))
}

/// Update a review by id, changing only the supplied fields
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Reviews",
    params(("id" = String, Path, description = "The review id")),
    request_body = ReviewPayload,
    responses(
        (status = 200, description = "Review updated", body = ReviewView),
        (status = 400, description = "Invalid review or unknown book", body = ErrorResponse),
        (status = 404, description = "Review not found", body = ErrorResponse),
        (status = 500, description = "Datastore failure", body = ErrorResponse),
    )
)]
pub async fn update_review(
    State(catalog): State<Catalog>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<ReviewPayload>,
) -> Result<Json<ReviewView>, AppError> {
    let id = parse_id(&id).ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    ensure_record_exists(&catalog.reviews, id, NOT_FOUND, "Failed to fetch review").await?;
    let changes = payload.into_changes()?;
    if let Some(book) = changes.book {
        ensure_book_exists(&catalog, book, INVALID_REVIEW).await?;
    }
    let review = catalog
        .reviews
        .update(id, &changes)
        .await
        .map_err(backend("Failed to update review"))?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Json(review.into()))
}

/// Delete a review by id
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Reviews",
    params(("id" = String, Path, description = "The review id")),
    responses(
        (status = 200, description = "Review deleted", body = DeletedMessage),
        (status = 404, description = "Review not found", body = ErrorResponse),
        (status = 500, description = "Datastore failure", body = ErrorResponse),
    )
)]
pub async fn delete_review(
    State(catalog): State<Catalog>,
    Path(id): Path<String>,
) -> Result<Json<DeletedMessage>, AppError> {
    let id = parse_id(&id).ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    catalog
        .reviews
        .delete(id)
        .await
        .map_err(backend("Failed to delete review"))?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    tracing::info!(review_id = %id, "review deleted");
    Ok(Json(DeletedMessage::new("Review")))
}
