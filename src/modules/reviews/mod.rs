pub mod handlers;
pub mod models;

use async_trait::async_trait;
use axum::{routing::get, Router};
use bookreview_db::{Collection, IndexKind, IndexSpec};
use bookreview_http::error::{ErrorBody, ErrorResponse};
use bookreview_kernel::{InitCtx, Module};
use utoipa::OpenApi;

use crate::catalog::Catalog;
use crate::modules::common::DeletedMessage;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_reviews,
        handlers::create_review,
        handlers::get_review,
        handlers::update_review,
        handlers::delete_review,
    ),
    components(schemas(
        models::ReviewView,
        models::ReviewPayload,
        DeletedMessage,
        ErrorResponse,
        ErrorBody,
    )),
    tags((name = "Reviews", description = "Scored reviews of books"))
)]
struct ReviewsApi;

pub struct ReviewsModule {
    catalog: Catalog,
}

impl ReviewsModule {
    pub const fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Module for ReviewsModule {
    fn name(&self) -> &'static str {
        "reviews"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "reviews module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route(
                "/",
                get(handlers::list_reviews).post(handlers::create_review),
            )
            .route(
                "/{id}",
                get(handlers::get_review)
                    .put(handlers::update_review)
                    .delete(handlers::delete_review),
            )
            .with_state(self.catalog.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        serde_json::to_value(ReviewsApi::openapi()).ok()
    }

    fn indexes(&self) -> Vec<IndexSpec> {
        vec![IndexSpec {
            collection: Collection::Reviews,
            name: "reviews_book",
            kind: IndexKind::Ascending(&["book"]),
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "reviews module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "reviews module stopped");
        Ok(())
    }
}

pub fn create_module(catalog: Catalog) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(ReviewsModule::new(catalog))
}
