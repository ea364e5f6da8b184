//! Router builder for the book review HTTP server

use axum::{
    extract::Request,
    http::{HeaderValue, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use utoipa::PartialSchema;
use uuid::{Timestamp, Uuid};

use bookreview_kernel::ModuleRegistry;

use crate::error::{ErrorBody, ErrorResponse};

/// Where the Swagger UI is served
pub const DOCS_PATH: &str = "/docs";
/// Where the merged OpenAPI document is served
pub const OPENAPI_JSON_PATH: &str = "/docs/openapi.json";

/// Builder for constructing the main HTTP router
pub struct RouterBuilder {
    router: Router,
}

impl RouterBuilder {
    /// Create a new router builder
    pub fn new() -> Self {
        Self {
            router: Router::new(),
        }
    }

    /// Add a route to the router
    pub fn route(mut self, path: &str, route: axum::routing::MethodRouter) -> Self {
        self.router = self.router.route(path, route);
        self
    }

    /// Mount a module's router under `/api/{module_name}`
    pub fn mount_module(mut self, module_name: &str, module_router: Router) -> Self {
        self.router = self.router.nest(&module_mount_path(module_name), module_router);
        self
    }

    /// Add tracing middleware
    pub fn with_tracing(mut self) -> Self {
        self.router = self.router.layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
        );
        self
    }

    /// Add CORS middleware
    pub fn with_cors(mut self) -> Self {
        self.router = self.router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
        self
    }

    /// Add request ID middleware, echoing the id back on the response
    pub fn with_request_id(mut self) -> Self {
        self.router = self
            .router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7));
        self
    }

    /// Add timeout middleware
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.router = self
            .router
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_millis(timeout_ms),
            ));
        self
    }

    /// Add OpenAPI documentation by collecting specs from all modules
    pub fn with_openapi(mut self, registry: &ModuleRegistry) -> Self {
        let openapi_spec = merged_openapi(registry);

        // Swagger UI at /docs, serving the merged document at /docs/openapi.json
        self.router = self.router.merge(
            utoipa_swagger_ui::SwaggerUi::new(DOCS_PATH)
                .external_url_unchecked(OPENAPI_JSON_PATH, openapi_spec),
        );

        self
    }

    /// Build the final router
    pub fn build(self) -> Router {
        self.router
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Mount point of a module's routes
pub fn module_mount_path(module_name: &str) -> String {
    format!("/api/{}", module_name)
}

/// Join a module-relative OpenAPI path onto the module mount point, the same
/// way `Router::nest` joins routes: the module root maps to the bare prefix.
fn prefixed_path(module_name: &str, path: &str) -> String {
    let mount = module_mount_path(module_name);
    if path == "/" || path.is_empty() {
        mount
    } else {
        format!("{}{}", mount, path)
    }
}

/// Merge every module's OpenAPI fragment into one OpenAPI 3.1 document
pub fn merged_openapi(registry: &ModuleRegistry) -> Value {
    let mut openapi_spec = json!({
        "openapi": "3.1.0",
        "info": {
            "title": "Book Review API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Authors, books, reviews and sales of a book review catalog"
        },
        "paths": {},
        "components": {
            "schemas": {}
        }
    });

    // Shared error response schema
    if let Ok(schema) = serde_json::to_value(ErrorResponse::schema()) {
        openapi_spec["components"]["schemas"]["ErrorResponse"] = schema;
    }
    if let Ok(schema) = serde_json::to_value(ErrorBody::schema()) {
        openapi_spec["components"]["schemas"]["ErrorBody"] = schema;
    }

    openapi_spec["paths"]["/"] = plain_text_get("Liveness message", "Service is running");
    openapi_spec["paths"]["/healthz"] = plain_text_get("Health check", "Datastore reachable");

    for module in registry.modules() {
        let Some(module_spec) = module.openapi() else {
            continue;
        };

        // Merge paths from module, prefixed with its mount point
        if let Some(paths_obj) = module_spec.get("paths").and_then(Value::as_object) {
            for (path, path_item) in paths_obj {
                openapi_spec["paths"][prefixed_path(module.name(), path)] = path_item.clone();
            }
        }

        // Merge schemas from module
        if let Some(schemas_obj) = module_spec
            .get("components")
            .and_then(|components| components.get("schemas"))
            .and_then(Value::as_object)
        {
            for (schema_name, schema_def) in schemas_obj {
                openapi_spec["components"]["schemas"][schema_name] = schema_def.clone();
            }
        }

        // Merge tags from module
        if let Some(tags) = module_spec.get("tags").and_then(Value::as_array) {
            if !openapi_spec["tags"].is_array() {
                openapi_spec["tags"] = json!([]);
            }
            if let Some(all_tags) = openapi_spec["tags"].as_array_mut() {
                all_tags.extend(tags.iter().cloned());
            }
        }
    }

    openapi_spec
}

fn plain_text_get(summary: &str, description: &str) -> Value {
    json!({
        "get": {
            "summary": summary,
            "responses": {
                "200": {
                    "description": description,
                    "content": {
                        "text/plain": {
                            "schema": {
                                "type": "string"
                            }
                        }
                    }
                }
            }
        }
    })
}

/// Request ID generator using time-ordered UUIDs
#[derive(Clone, Copy)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let timestamp = Timestamp::now(uuid::NoContext);
        let request_id = Uuid::new_v7(timestamp)
            .to_string()
            .parse::<HeaderValue>()
            .ok()?;
        Some(RequestId::new(request_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get};
    use bookreview_kernel::Module;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct ShelfModule;

    #[async_trait::async_trait]
    impl Module for ShelfModule {
        fn name(&self) -> &'static str {
            "shelves"
        }

        fn routes(&self) -> Router {
            Router::new()
                .route("/", get(|| async { "all shelves" }))
                .route("/{id}", get(|| async { "one shelf" }))
        }

        fn openapi(&self) -> Option<Value> {
            Some(json!({
                "paths": {
                    "/": { "get": { "responses": { "200": { "description": "ok" } } } },
                    "/{id}": { "get": { "responses": { "200": { "description": "ok" } } } }
                },
                "components": { "schemas": { "Shelf": { "type": "object" } } },
                "tags": [{ "name": "Shelves" }]
            }))
        }
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_module_mounting() {
        let module = ShelfModule;
        let router = RouterBuilder::new()
            .mount_module(module.name(), module.routes())
            .build();

        let response = router.clone().oneshot(get_request("/api/shelves")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router.oneshot(get_request("/api/shelves/7")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_middleware_chain_sets_request_id() {
        let router = RouterBuilder::new()
            .route("/health", get(|| async { "ok" }))
            .with_tracing()
            .with_cors()
            .with_request_id()
            .with_timeout(5000)
            .build();

        let response = router.oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_slow_request_times_out() {
        let router = RouterBuilder::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            )
            .with_timeout(20)
            .build();

        let response = router.oneshot(get_request("/slow")).await.unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[test]
    fn test_openapi_paths_are_prefixed_like_routes() {
        let mut registry = ModuleRegistry::new();
        registry.register_custom(Arc::new(ShelfModule));

        let spec = merged_openapi(&registry);
        let paths = spec["paths"].as_object().unwrap();
        assert!(paths.contains_key("/api/shelves"));
        assert!(paths.contains_key("/api/shelves/{id}"));
        assert!(!paths.contains_key("/api/shelves/"));
        assert!(paths.contains_key("/healthz"));
        assert!(spec["components"]["schemas"]["Shelf"].is_object());
        assert!(spec["components"]["schemas"]["ErrorResponse"].is_object());
        assert_eq!(spec["tags"][0]["name"], "Shelves");
    }

    #[tokio::test]
    async fn test_openapi_document_is_served() {
        let mut registry = ModuleRegistry::new();
        registry.register_custom(Arc::new(ShelfModule));

        let router = RouterBuilder::new().with_openapi(&registry).build();
        let response = router.oneshot(get_request(OPENAPI_JSON_PATH)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let served: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(served["paths"]["/api/shelves/{id}"].is_object());
    }
}
