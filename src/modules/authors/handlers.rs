use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bookreview_http::{
    error::{AppError, ErrorResponse},
    extract::{JsonBody, QueryParams},
};

use super::models::{AuthorPayload, AuthorView};
use super::stats::{self, AuthorStats, AuthorStatsQuery};
use crate::catalog::{parse_id, Catalog};
use crate::modules::common::{backend, ensure_record_exists, DeletedMessage};

const NOT_FOUND: &str = "Author not found";

/// List all authors
#[utoipa::path(
    get,
    path = "/",
    tag = "Authors",
    responses(
        (status = 200, description = "List of authors", body = [AuthorView]),
        (status = 500, description = "Datastore failure", body = ErrorResponse),
    )
)]
pub async fn list_authors(
    State(catalog): State<Catalog>,
) -> Result<Json<Vec<AuthorView>>, AppError> {
    let authors = catalog
        .authors
        .list()
        .await
        .map_err(backend("Failed to fetch authors"))?;
    Ok(Json(authors.into_iter().map(AuthorView::from).collect()))
}

/// Get an author by id
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Authors",
    params(("id" = String, Path, description = "The author id")),
    responses(
        (status = 200, description = "Author data", body = AuthorView),
        (status = 404, description = "Author not found", body = ErrorResponse),
        (status = 500, description = "Datastore failure", body = ErrorResponse),
    )
)]
pub async fn get_author(
    State(catalog): State<Catalog>,
    Path(id): Path<String>,
) -> Result<Json<AuthorView>, AppError> {
    let id = parse_id(&id).ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    let author = catalog
        .authors
        .get(id)
        .await
        .map_err(backend("Failed to fetch author"))?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Json(author.into()))
}

/// Create a new author
#[utoipa::path(
    post,
    path = "/",
    tag = "Authors",
    request_body = AuthorPayload,
    responses(
        (status = 201, description = "Author created", body = AuthorView),
        (status = 400, description = "Invalid author", body = ErrorResponse),
        (status = 500, description = "Datastore failure", body = ErrorResponse),
    )
)]
pub async fn create_author(
    State(catalog): State<Catalog>,
    JsonBody(payload): JsonBody<AuthorPayload>,
) -> Result<(StatusCode, Json<AuthorView>), AppError> {
    let author = payload.into_author()?;
    catalog
        .authors
        .insert(&author)
        .await
        .map_err(backend("Failed to create author"))?;

    tracing::info!(author_id = %author.id, "author created");
    Ok((StatusCode::CREATED, Json(author.into())))
}

/// Update an author by id, changing only the supplied fields
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Authors",
    params(("id" = String, Path, description = "The author id")),
    request_body = AuthorPayload,
    responses(
        (status = 200, description = "Author updated", body = AuthorView),
        (status = 400, description = "Invalid author", body = ErrorResponse),
        (status = 404, description = "Author not found", body = ErrorResponse),
        (status = 500, description = "Datastore failure", body = ErrorResponse),
    )
)]
pub async fn update_author(
    State(catalog): State<Catalog>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<AuthorPayload>,
) -> Result<Json<AuthorView>, AppError> {
    let id = parse_id(&id).ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    ensure_record_exists(&catalog.authors, id, NOT_FOUND, "Failed to fetch author").await?;
    let changes = payload.into_changes()?;
    let author = catalog
        .authors
        .update(id, &changes)
        .await
        .map_err(backend("Failed to update author"))?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Json(author.into()))
}

/// Delete an author by id. Books by the author are kept.
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Authors",
    params(("id" = String, Path, description = "The author id")),
    responses(
        (status = 200, description = "Author deleted", body = DeletedMessage),
        (status = 404, description = "Author not found", body = ErrorResponse),
        (status = 500, description = "Datastore failure", body = ErrorResponse),
    )
)]
pub async fn delete_author(
    State(catalog): State<Catalog>,
    Path(id): Path<String>,
) -> Result<Json<DeletedMessage>, AppError> {
    let id = parse_id(&id).ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    catalog
        .authors
        .delete(id)
        .await
        .map_err(backend("Failed to delete author"))?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    tracing::info!(author_id = %id, "author deleted");
    Ok(Json(DeletedMessage::new("Author")))
}

/// Statistics table of the authors, filtered and sorted on request
#[utoipa::path(
    get,
    path = "/stats",
    tag = "Authors",
    params(AuthorStatsQuery),
    responses(
        (status = 200, description = "One row per matching author", body = [AuthorStats]),
        (status = 400, description = "Unknown sort column or order", body = ErrorResponse),
        (status = 500, description = "Datastore failure", body = ErrorResponse),
    )
)]
pub async fn author_stats(
    State(catalog): State<Catalog>,
    QueryParams(query): QueryParams<AuthorStatsQuery>,
) -> Result<Json<Vec<AuthorStats>>, AppError> {
    let rows = stats::collect_stats(&catalog, &query)
        .await
        .map_err(backend("Failed to compute author statistics"))?;
    Ok(Json(rows))
}
