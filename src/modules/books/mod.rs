pub mod handlers;
pub mod models;
pub mod rankings;

use async_trait::async_trait;
use axum::{routing::get, Router};
use bookreview_db::{Collection, IndexKind, IndexSpec};
use bookreview_http::error::{ErrorBody, ErrorResponse};
use bookreview_kernel::{InitCtx, Module};
use utoipa::OpenApi;

use crate::catalog::Catalog;
use crate::modules::authors::models::AuthorView;
use crate::modules::reviews::models::ReviewView;
use crate::modules::common::DeletedMessage;

/// Text index backing `GET /search`
pub const BOOKS_TEXT_INDEX: &str = "books_text";

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_books,
        handlers::create_book,
        handlers::get_book,
        handlers::update_book,
        handlers::delete_book,
        handlers::books_by_author,
        handlers::search_books,
        handlers::top_selling_books,
        handlers::top_rated_books,
    ),
    components(schemas(
        models::BookView,
        models::BookPayload,
        models::TopSellingBook,
        models::RatedBook,
        AuthorView,
        ReviewView,
        DeletedMessage,
        ErrorResponse,
        ErrorBody,
    )),
    tags((name = "Books", description = "Books with their authors, search and rankings"))
)]
struct BooksApi;

/// Books module: CRUD over `books` plus author, search and ranking queries
pub struct BooksModule {
    catalog: Catalog,
}

impl BooksModule {
    pub const fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(handlers::list_books).post(handlers::create_book))
            .route("/search", get(handlers::search_books))
            .route("/top-sales", get(handlers::top_selling_books))
            .route("/top-rated", get(handlers::top_rated_books))
            .route("/author/{author_id}", get(handlers::books_by_author))
            .route(
                "/{id}",
                get(handlers::get_book)
                    .put(handlers::update_book)
                    .delete(handlers::delete_book),
            )
            .with_state(self.catalog.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        serde_json::to_value(BooksApi::openapi()).ok()
    }

    fn indexes(&self) -> Vec<IndexSpec> {
        vec![
            IndexSpec {
                collection: Collection::Books,
                name: BOOKS_TEXT_INDEX,
                kind: IndexKind::Text(&["name", "summary"]),
            },
            IndexSpec {
                collection: Collection::Books,
                name: "books_author",
                kind: IndexKind::Ascending(&["author"]),
            },
        ]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(catalog: Catalog) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new(catalog))
}
