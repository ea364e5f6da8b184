use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bookreview_db::{Filter, FindOptions};
use bookreview_http::{
    error::{AppError, ErrorResponse},
    extract::{JsonBody, QueryParams},
};
use bson::{oid::ObjectId, Bson};

use super::models::{
    Book, BookPayload, BookView, RatedBook, SearchQuery, TopRatedQuery, TopSalesQuery,
    TopSellingBook, INVALID_BOOK,
};
use super::rankings::{self, SalesContext};
use crate::catalog::{parse_id, Catalog, Entity};
use crate::modules::authors::models::AuthorView;
use crate::modules::common::{backend, ensure_record_exists, DeletedMessage};
use crate::validation::dangling_reference;

const NOT_FOUND: &str = "Book not found";

/// Embed each book's author, loading every referenced author in one query.
/// Books whose author is gone render with a null author.
async fn populate(catalog: &Catalog, books: Vec<Book>) -> Result<Vec<BookView>, AppError> {
    let ids: Vec<ObjectId> = books
        .iter()
        .map(|book| book.author)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let authors: HashMap<ObjectId, AuthorView> = catalog
        .authors
        .find_many(&ids)
        .await
        .map_err(backend("Failed to fetch authors"))?
        .into_iter()
        .map(|author| (author.id(), AuthorView::from(author)))
        .collect();

    // Several books may share an author, so views are cloned out of the map
    Ok(books
        .into_iter()
        .map(|book| {
            let author = authors.get(&book.author).cloned();
            BookView::new(book, author)
        })
        .collect())
}

async fn populate_one(catalog: &Catalog, book: Book) -> Result<BookView, AppError> {
    let author = catalog
        .authors
        .get(book.author)
        .await
        .map_err(backend("Failed to fetch author"))?
        .map(AuthorView::from);
    Ok(BookView::new(book, author))
}

async fn ensure_author_exists(catalog: &Catalog, author: ObjectId) -> Result<(), AppError> {
    let exists = catalog
        .authors
        .exists(author)
        .await
        .map_err(backend("Failed to fetch author"))?;
    if exists {
        Ok(())
    } else {
        Err(dangling_reference("author", INVALID_BOOK))
    }
}

/// List all books with their authors
#[utoipa::path(
    get,
    path = "/",
    tag = "Books",
    responses(
        (status = 200, description = "List of books", body = [BookView]),
        (status = 500, description = "Datastore failure", body = ErrorResponse),
    )
)]
pub async fn list_books(State(catalog): State<Catalog>) -> Result<Json<Vec<BookView>>, AppError> {
    let books = catalog
        .books
        .list()
        .await
        .map_err(backend("Failed to fetch books"))?;
    Ok(Json(populate(&catalog, books).await?))
}

/// Get a book by id
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Books",
    params(("id" = String, Path, description = "The book id")),
    responses(
        (status = 200, description = "Book data", body = BookView),
        (status = 404, description = "Book not found", body = ErrorResponse),
        (status = 500, description = "Datastore failure", body = ErrorResponse),
    )
)]
pub async fn get_book(
    State(catalog): State<Catalog>,
    Path(id): Path<String>,
) -> Result<Json<BookView>, AppError> {
    let id = parse_id(&id).ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    let book = catalog
        .books
        .get(id)
        .await
        .map_err(backend("Failed to fetch book"))?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Json(populate_one(&catalog, book).await?))
}

/// Create a new book for an existing author
#[utoipa::path(
    post,
    path = "/",
    tag = "Books",
    request_body = BookPayload,
    responses(
        (status = 201, description = "Book created", body = BookView),
        (status = 400, description = "Invalid book or unknown author", body = ErrorResponse),
        (status = 500, description = "Datastore failure", body = ErrorResponse),
    )
)]
pub async fn create_book(
    State(catalog): State<Catalog>,
    JsonBody(payload): JsonBody<BookPayload>,
) -> Result<(StatusCode, Json<BookView>), AppError> {
    let book = payload.into_book()?;
    ensure_author_exists(&catalog, book.author).await?;
    catalog
        .books
        .insert(&book)
        .await
        .map_err(backend("Failed to create book"))?;

    tracing::info!(book_id = %book.id, author_id = %book.author, "book created");
    Ok((StatusCode::CREATED, Json(populate_one(&catalog, book).await?)))
}

/// Update a book by id, changing only the supplied fields
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Books",
    params(("id" = String, Path, description = "The book id")),
    request_body = BookPayload,
    responses(
        (status = 200, description = "Book updated", body = BookView),
        (status = 400, description = "Invalid book or unknown author", body = ErrorResponse),
        (status = 404, description = "Book not found", body = ErrorResponse),
        (status = 500, description = "Datastore failure", body = ErrorResponse),
    )
)]
pub async fn update_book(
    State(catalog): State<Catalog>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<BookPayload>,
) -> Result<Json<BookView>, AppError> {
    let id = parse_id(&id).ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    ensure_record_exists(&catalog.books, id, NOT_FOUND, "Failed to fetch book").await?;
    let changes = payload.into_changes()?;
    if let Some(author) = changes.author {
        ensure_author_exists(&catalog, author).await?;
    }
    let book = catalog
        .books
        .update(id, &changes)
        .await
        .map_err(backend("Failed to update book"))?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Json(populate_one(&catalog, book).await?))
}

/// Delete a book by id. Its reviews and sales are kept.
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Books",
    params(("id" = String, Path, description = "The book id")),
    responses(
        (status = 200, description = "Book deleted", body = DeletedMessage),
        (status = 404, description = "Book not found", body = ErrorResponse),
        (status = 500, description = "Datastore failure", body = ErrorResponse),
    )
)]
pub async fn delete_book(
    State(catalog): State<Catalog>,
    Path(id): Path<String>,
) -> Result<Json<DeletedMessage>, AppError> {
    let id = parse_id(&id).ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    catalog
        .books
        .delete(id)
        .await
        .map_err(backend("Failed to delete book"))?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    tracing::info!(book_id = %id, "book deleted");
    Ok(Json(DeletedMessage::new("Book")))
}

/// List the books of one author
#[utoipa::path(
    get,
    path = "/author/{author_id}",
    tag = "Books",
    params(("author_id" = String, Path, description = "The author id")),
    responses(
        (status = 200, description = "Books by the author, possibly none", body = [BookView]),
        (status = 500, description = "Datastore failure", body = ErrorResponse),
    )
)]
pub async fn books_by_author(
    State(catalog): State<Catalog>,
    Path(author_id): Path<String>,
) -> Result<Json<Vec<BookView>>, AppError> {
    // A malformed id cannot match any book
    let Some(author_id) = parse_id(&author_id) else {
        return Ok(Json(Vec::new()));
    };
    let books = catalog
        .books
        .find(
            Filter::eq("author", Bson::ObjectId(author_id)),
            FindOptions::default(),
        )
        .await
        .map_err(backend("Failed to fetch books"))?;
    Ok(Json(populate(&catalog, books).await?))
}

/// Full-text search over book names and summaries
#[utoipa::path(
    get,
    path = "/search",
    tag = "Books",
    params(SearchQuery),
    responses(
        (status = 200, description = "Books matching any of the words", body = [BookView]),
        (status = 400, description = "Missing or blank query", body = ErrorResponse),
        (status = 500, description = "Datastore failure", body = ErrorResponse),
    )
)]
pub async fn search_books(
    State(catalog): State<Catalog>,
    QueryParams(query): QueryParams<SearchQuery>,
) -> Result<Json<Vec<BookView>>, AppError> {
    let terms = query
        .q
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::bad_request("Query parameter 'q' is required"))?;
    let books = catalog
        .books
        .find(Filter::Text(terms), FindOptions::default())
        .await
        .map_err(backend("Failed to search books"))?;
    Ok(Json(populate(&catalog, books).await?))
}

/// Best selling books, highest total sales first
#[utoipa::path(
    get,
    path = "/top-sales",
    tag = "Books",
    params(TopSalesQuery),
    responses(
        (status = 200, description = "Books ordered by total sales, with their sales context", body = [TopSellingBook]),
        (status = 400, description = "Malformed limit", body = ErrorResponse),
        (status = 500, description = "Datastore failure", body = ErrorResponse),
    )
)]
pub async fn top_selling_books(
    State(catalog): State<Catalog>,
    QueryParams(query): QueryParams<TopSalesQuery>,
) -> Result<Json<Vec<TopSellingBook>>, AppError> {
    let books = catalog
        .books
        .find(Filter::All, FindOptions::top("total_sales", query.limit()))
        .await
        .map_err(backend("Failed to fetch books"))?;
    let context = SalesContext::load(&catalog, &books)
        .await
        .map_err(backend("Failed to fetch sales"))?;
    let figures: Vec<(i64, bool)> = books
        .iter()
        .map(|book| {
            (
                context.author_total(book.author),
                context.leads_publication_year(book),
            )
        })
        .collect();

    let views = populate(&catalog, books).await?;
    Ok(Json(
        views
            .into_iter()
            .zip(figures)
            .map(|(book, (author_total_sales, in_top5_pub_year))| TopSellingBook {
                book,
                author_total_sales,
                in_top5_pub_year,
            })
            .collect(),
    ))
}

/// Best rated books by mean review score, with their best and worst review
#[utoipa::path(
    get,
    path = "/top-rated",
    tag = "Books",
    params(TopRatedQuery),
    responses(
        (status = 200, description = "Reviewed books, highest mean score first", body = [RatedBook]),
        (status = 400, description = "Malformed limit", body = ErrorResponse),
        (status = 500, description = "Datastore failure", body = ErrorResponse),
    )
)]
pub async fn top_rated_books(
    State(catalog): State<Catalog>,
    QueryParams(query): QueryParams<TopRatedQuery>,
) -> Result<Json<Vec<RatedBook>>, AppError> {
    let ranked = rankings::top_rated(&catalog, query.limit())
        .await
        .map_err(backend("Failed to rank books"))?;
    let (books, scores): (Vec<Book>, Vec<_>) = ranked
        .into_iter()
        .map(|rated| (rated.book, (rated.avg_score, rated.best, rated.worst)))
        .unzip();

    let views = populate(&catalog, books).await?;
    Ok(Json(
        views
            .into_iter()
            .zip(scores)
            .map(|(book, (avg_score, best, worst))| RatedBook {
                book,
                avg_score,
                best: best.into(),
                worst: worst.into(),
            })
            .collect(),
    ))
}
