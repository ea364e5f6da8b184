pub mod handlers;
pub mod models;

use async_trait::async_trait;
use axum::{routing::get, Router};
use bookreview_db::{Collection, IndexKind, IndexSpec};
use bookreview_http::error::{ErrorBody, ErrorResponse};
use bookreview_kernel::{InitCtx, Module};
use utoipa::OpenApi;

use crate::catalog::Catalog;

/// One sales figure per book and year
pub const SALES_BOOK_YEAR_INDEX: &str = "sales_book_year";
use crate::modules::common::DeletedMessage;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_sales,
        handlers::create_sale,
        handlers::get_sale,
        handlers::update_sale,
        handlers::delete_sale,
    ),
    components(schemas(
        models::SaleView,
        models::SalePayload,
        DeletedMessage,
        ErrorResponse,
        ErrorBody,
    )),
    tags((name = "Sales", description = "Yearly sales figures of books"))
)]
struct SalesApi;

/// Sales module: CRUD over the `sales` collection
pub struct SalesModule {
    catalog: Catalog,
}

impl SalesModule {
    pub const fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Module for SalesModule {
    fn name(&self) -> &'static str {
        "sales"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "sales module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route(
                "/",
                get(handlers::list_sales).post(handlers::create_sale),
            )
            .route(
                "/{id}",
                get(handlers::get_sale)
                    .put(handlers::update_sale)
                    .delete(handlers::delete_sale),
            )
            .with_state(self.catalog.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        serde_json::to_value(SalesApi::openapi()).ok()
    }

    fn indexes(&self) -> Vec<IndexSpec> {
        // Also serves lookups by book, its leading field
        vec![IndexSpec {
            collection: Collection::Sales,
            name: SALES_BOOK_YEAR_INDEX,
            kind: IndexKind::Unique(&["book", "year"]),
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "sales module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "sales module stopped");
        Ok(())
    }
}

pub fn create_module(catalog: Catalog) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(SalesModule::new(catalog))
}
