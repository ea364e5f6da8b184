pub mod handlers;
pub mod models;
pub mod stats;

use async_trait::async_trait;
use axum::{routing::get, Router};
use bookreview_http::error::{ErrorBody, ErrorResponse};
use bookreview_kernel::{InitCtx, Module};
use utoipa::OpenApi;

use crate::catalog::Catalog;
use crate::modules::common::DeletedMessage;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_authors,
        handlers::create_author,
        handlers::get_author,
        handlers::update_author,
        handlers::delete_author,
        handlers::author_stats,
    ),
    components(schemas(
        models::AuthorView,
        models::AuthorPayload,
        stats::AuthorStats,
        DeletedMessage,
        ErrorResponse,
        ErrorBody,
    )),
    tags((name = "Authors", description = "Author management and statistics"))
)]
struct AuthorsApi;

/// Authors module: CRUD over the `authors` collection plus per-author statistics
pub struct AuthorsModule {
    catalog: Catalog,
}

impl AuthorsModule {
    pub const fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Module for AuthorsModule {
    fn name(&self) -> &'static str {
        "authors"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "authors module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route(
                "/",
                get(handlers::list_authors).post(handlers::create_author),
            )
            .route("/stats", get(handlers::author_stats))
            .route(
                "/{id}",
                get(handlers::get_author)
                    .put(handlers::update_author)
                    .delete(handlers::delete_author),
            )
            .with_state(self.catalog.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        serde_json::to_value(AuthorsApi::openapi()).ok()
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "authors module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "authors module stopped");
        Ok(())
    }
}

/// Create a new instance of the authors module
pub fn create_module(catalog: Catalog) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(AuthorsModule::new(catalog))
}
