//! End-to-end tests of the HTTP surface over the in-memory store.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use bookreview_app::build_registry;
use bookreview_db::{
    Collection, DocumentStore, Filter, FindOptions, IndexSpec, MemoryStore, StoreError,
    StoreHandle, StoreResult,
};
use bson::{oid::ObjectId, Document};
use bookreview_kernel::{settings::Settings, InitCtx};
use serde_json::{json, Value};
use tower::ServiceExt;

const MISSING_ID: &str = "65f1c0ffee0000000000beef";

struct TestApp {
    router: Router,
}

impl TestApp {
    async fn new() -> Self {
        let store = StoreHandle::new(MemoryStore::new());
        let registry = build_registry(&store);
        let settings = Settings::default();
        let ctx = InitCtx {
            settings: &settings,
            store: &store,
        };
        registry.init_core_modules(&ctx).await.unwrap();
        registry.init_custom_modules(&ctx).await.unwrap();
        registry.ensure_indexes(&ctx).await.unwrap();

        Self {
            router: bookreview_http::build_router(&registry, &settings, &store),
        }
    }

    async fn raw(&self, method: Method, uri: &str, body: Option<Body>) -> (StatusCode, Vec<u8>) {
        let mut request = Request::builder().method(method).uri(uri);
        if body.is_some() {
            request = request.header(header::CONTENT_TYPE, "application/json");
        }
        let request = request.body(body.unwrap_or_else(Body::empty)).unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 4 * 1024 * 1024)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let body = body.map(|value| Body::from(value.to_string()));
        let (status, bytes) = self.raw(method, uri, body).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(body)).await
    }

    async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, None).await
    }

    async fn create_author(&self, name: &str) -> String {
        let (status, body) = self
            .post(
                "/api/authors",
                json!({ "name": name, "date_of_birth": "1970-01-01", "country": "US" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn create_book(&self, author: &str, name: &str, summary: &str, total_sales: i64) -> String {
        let (status, body) = self
            .post(
                "/api/books",
                json!({
                    "name": name,
                    "summary": summary,
                    "publication_date": "2020-01-01",
                    "author": author,
                    "total_sales": total_sales
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

fn assert_error_shape(body: &Value, code: &str) {
    let error = &body["error"];
    assert_eq!(error["code"], code, "{body}");
    assert!(error["message"].is_string());
    assert!(error["details"].is_array());
    assert!(error["trace_id"].is_string());
    assert!(error["timestamp"].is_string());
}

#[tokio::test]
async fn liveness_and_health() {
    let app = TestApp::new().await;

    let (status, body) = app.raw(Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"Book Review API is running");

    let (status, body) = app.raw(Method::GET, "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn created_author_reads_back_identically() {
    let app = TestApp::new().await;
    let (status, created) = app
        .post(
            "/api/authors",
            json!({
                "name": "A. Doe",
                "date_of_birth": "1970-01-01",
                "country": "US",
                "description": "Writes things."
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = app.get(&format!("/api/authors/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
    assert_eq!(fetched["date_of_birth"], "1970-01-01");
    assert_eq!(fetched["description"], "Writes things.");

    let (_, all) = app.get("/api/authors").await;
    assert_eq!(all, json!([created]));
}

#[tokio::test]
async fn author_dates_accept_timestamps() {
    let app = TestApp::new().await;
    let (status, created) = app
        .post(
            "/api/authors",
            json!({ "name": "B", "date_of_birth": "1980-05-17T00:00:00.000Z", "country": "FR" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["date_of_birth"], "1980-05-17");
    assert_eq!(created["description"], "");
}

#[tokio::test]
async fn invalid_author_lists_every_problem() {
    let app = TestApp::new().await;
    let (status, body) = app.post("/api/authors", json!({ "name": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_shape(&body, "validation_error");
    assert_eq!(
        body["error"]["details"],
        json!([
            { "field": "name", "error": "empty" },
            { "field": "date_of_birth", "error": "required" },
            { "field": "country", "error": "required" }
        ])
    );
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let app = TestApp::new().await;
    let (status, bytes) = app
        .raw(Method::POST, "/api/authors", Some(Body::from("{not json")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_error_shape(&body, "validation_error");
    assert_eq!(body["error"]["details"][0]["field"], "body");

    assert_eq!(body["error"]["details"][0]["error"], "malformed");

    let (status, body) = app
        .post("/api/reviews", json!({ "book": MISSING_ID, "score": "five" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_shape(&body, "validation_error");
}

#[tokio::test]
async fn mistyped_fields_do_not_echo_deserializer_text() {
    let app = TestApp::new().await;
    let (status, body) = app.post("/api/books", json!({ "name": 5 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"]["details"],
        json!([{ "field": "body", "error": "invalid" }])
    );
    let text = body.to_string();
    for leaked in ["invalid type", "expected", "line 1", "deserialize"] {
        assert!(!text.contains(leaked), "{leaked:?} leaked into {text}");
    }

    let (status, body) = app
        .raw(Method::POST, "/api/authors", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"]["details"][0]["error"], "unsupported_content_type");
}

#[tokio::test]
async fn book_without_author_is_rejected() {
    let app = TestApp::new().await;
    let (status, body) = app
        .post(
            "/api/books",
            json!({ "name": "T", "summary": "S", "publication_date": "2020-01-01" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"]["details"],
        json!([{ "field": "author", "error": "required" }])
    );
}

#[tokio::test]
async fn references_must_resolve() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/books",
            json!({
                "name": "T",
                "summary": "S",
                "publication_date": "2020-01-01",
                "author": MISSING_ID
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"]["details"],
        json!([{ "field": "author", "error": "not_found" }])
    );

    let (status, body) = app
        .post("/api/reviews", json!({ "book": "nope", "score": 3 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"]["details"],
        json!([{ "field": "book", "error": "invalid_id" }])
    );

    let (status, _) = app
        .post("/api/sales", json!({ "book": MISSING_ID, "year": 2024, "sales": 10 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_records_are_not_found_for_every_resource() {
    let app = TestApp::new().await;
    for resource in ["authors", "books", "reviews", "sales"] {
        for id in [MISSING_ID, "not-an-object-id"] {
            let uri = format!("/api/{resource}/{id}");

            let (status, body) = app.get(&uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "GET {uri}");
            assert_error_shape(&body, "not_found");

            let (status, _) = app.put(&uri, json!({})).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "PUT {uri}");

            let (status, _) = app.delete(&uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "DELETE {uri}");
        }
    }

    let (_, body) = app.get(&format!("/api/books/{MISSING_ID}")).await;
    assert_eq!(body["error"]["message"], "Book not found");
}

#[tokio::test]
async fn updating_a_missing_record_is_not_found_before_references_are_checked() {
    let app = TestApp::new().await;
    let dangling = "65f1c0ffee0000000000dead";
    let updates = [
        ("books", json!({ "author": dangling })),
        ("reviews", json!({ "book": dangling, "score": 9 })),
        ("sales", json!({ "book": dangling, "year": 2024 })),
        ("authors", json!({ "name": "" })),
    ];
    for (resource, body) in updates {
        let (status, body) = app.put(&format!("/api/{resource}/{MISSING_ID}"), body).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "PUT {resource}: {body}");
        assert_error_shape(&body, "not_found");
    }
}

#[tokio::test]
async fn partial_update_changes_only_supplied_fields() {
    let app = TestApp::new().await;
    let id = app.create_author("A. Doe").await;

    let (status, updated) = app
        .put(&format!("/api/authors/{id}"), json!({ "country": "FR" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["country"], "FR");
    assert_eq!(updated["name"], "A. Doe");
    assert_eq!(updated["date_of_birth"], "1970-01-01");

    let (_, fetched) = app.get(&format!("/api/authors/{id}")).await;
    assert_eq!(fetched, updated);

    let (status, _) = app
        .put(&format!("/api/authors/{id}"), json!({ "name": "" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_twice_is_ok_then_not_found() {
    let app = TestApp::new().await;
    let id = app.create_author("A. Doe").await;
    let uri = format!("/api/authors/{id}");

    let (status, body) = app.delete(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Author deleted" }));

    let (status, _) = app.delete(&uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn books_by_author_embed_the_author() {
    let app = TestApp::new().await;
    let author = app.create_author("A. Doe").await;

    let (status, book) = app
        .post(
            "/api/books",
            json!({
                "name": "T",
                "summary": "S",
                "publication_date": "2020-01-01",
                "author": author
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(book["total_sales"], 0);
    assert_eq!(book["author"]["id"], author.as_str());
    assert_eq!(book["author"]["name"], "A. Doe");

    let other = app.create_author("Someone Else").await;
    app.create_book(&other, "Other", "Unrelated", 0).await;

    let (status, books) = app.get(&format!("/api/books/author/{author}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(books, json!([book]));

    let (status, books) = app.get(&format!("/api/books/author/{MISSING_ID}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(books, json!([]));

    let (status, books) = app.get("/api/books/author/garbage").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(books, json!([]));
}

#[tokio::test]
async fn book_update_checks_the_new_author() {
    let app = TestApp::new().await;
    let author = app.create_author("A. Doe").await;
    let book = app.create_book(&author, "T", "S", 3).await;
    let uri = format!("/api/books/{book}");

    let (status, _) = app.put(&uri, json!({ "author": MISSING_ID })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let next = app.create_author("B. Roe").await;
    let (status, updated) = app.put(&uri, json!({ "author": next, "summary": "S2" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["author"]["name"], "B. Roe");
    assert_eq!(updated["summary"], "S2");
    assert_eq!(updated["name"], "T");
    assert_eq!(updated["total_sales"], 3);
}

#[tokio::test]
async fn deleting_an_author_leaves_books_with_null_author() {
    let app = TestApp::new().await;
    let author = app.create_author("A. Doe").await;
    let book = app.create_book(&author, "T", "S", 0).await;

    let (status, _) = app.delete(&format!("/api/authors/{author}")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, fetched) = app.get(&format!("/api/books/{book}")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(fetched["author"].is_null());

    let (_, all) = app.get("/api/books").await;
    assert_eq!(all.as_array().unwrap().len(), 1);
    assert!(all[0]["author"].is_null());
}

#[tokio::test]
async fn review_scores_outside_one_to_five_are_rejected() {
    let app = TestApp::new().await;
    let author = app.create_author("A. Doe").await;
    let book = app.create_book(&author, "T", "S", 0).await;

    for score in [0, 6] {
        let (status, body) = app
            .post("/api/reviews", json!({ "book": book, "score": score }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "score {score}");
        assert_eq!(
            body["error"]["details"],
            json!([{ "field": "score", "error": "out_of_range" }])
        );
    }

    let (status, review) = app
        .post("/api/reviews", json!({ "book": book, "score": 5 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(review["up_votes"], 0);
    assert_eq!(review["book"], book.as_str());

    let id = review["id"].as_str().unwrap();
    let (status, updated) = app
        .put(&format!("/api/reviews/{id}"), json!({ "up_votes": 40 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["up_votes"], 40);
    assert_eq!(updated["score"], 5);

    let (status, _) = app
        .put(&format!("/api/reviews/{id}"), json!({ "score": 0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sales_crud() {
    let app = TestApp::new().await;
    let author = app.create_author("A. Doe").await;
    let book = app.create_book(&author, "T", "S", 0).await;

    let (status, sale) = app
        .post("/api/sales", json!({ "book": book, "year": 2024, "sales": 1500 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = sale["id"].as_str().unwrap().to_string();
    let uri = format!("/api/sales/{id}");

    let (status, fetched) = app.get(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, sale);

    let (status, updated) = app.put(&uri, json!({ "sales": 1750 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["sales"], 1750);
    assert_eq!(updated["year"], 2024);

    let (status, _) = app.put(&uri, json!({ "sales": -1 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, all) = app.get("/api/sales").await;
    assert_eq!(all, json!([updated]));

    let (status, body) = app.delete(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Sale deleted");
    let (status, _) = app.get(&uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_matches_any_word_in_name_or_summary() {
    let app = TestApp::new().await;
    let author = app.create_author("A. Doe").await;
    let dune = app
        .create_book(&author, "Desert Planet", "Spice and sandworms", 0)
        .await;
    let sea = app
        .create_book(&author, "Deep Water", "A voyage under the sea", 0)
        .await;
    app.create_book(&author, "Gardening", "Tomatoes", 0).await;

    let (status, hits) = app.get("/api/books/search?q=SPICE%20voyage").await;
    assert_eq!(status, StatusCode::OK);
    let mut ids: Vec<&str> = hits
        .as_array()
        .unwrap()
        .iter()
        .map(|book| book["id"].as_str().unwrap())
        .collect();
    ids.sort_unstable();
    let mut expected = vec![dune.as_str(), sea.as_str()];
    expected.sort_unstable();
    assert_eq!(ids, expected);
    assert_eq!(hits[0]["author"]["name"], "A. Doe");

    let (status, hits) = app.get("/api/books/search?q=nothing").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits, json!([]));

    // Words match whole, so "sand" does not find "sandworms"
    let (_, hits) = app.get("/api/books/search?q=sand").await;
    assert_eq!(hits, json!([]));

    for uri in ["/api/books/search", "/api/books/search?q=%20%20"] {
        let (status, body) = app.get(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_error_shape(&body, "bad_request");
    }
}

#[tokio::test]
async fn top_sales_orders_and_limits() {
    let app = TestApp::new().await;
    let author = app.create_author("A. Doe").await;
    for (name, sales) in [("low", 10), ("high", 900), ("mid", 300), ("none", 0)] {
        app.create_book(&author, name, "S", sales).await;
    }

    let (status, top) = app.get("/api/books/top-sales?limit=2").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = top
        .as_array()
        .unwrap()
        .iter()
        .map(|book| book["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["high", "mid"]);
    assert_eq!(top[0]["author"]["name"], "A. Doe");

    let (_, top) = app.get("/api/books/top-sales").await;
    assert_eq!(top.as_array().unwrap().len(), 4);

    let (_, top) = app.get("/api/books/top-sales?limit=0").await;
    assert_eq!(top.as_array().unwrap().len(), 1);

    let (status, _) = app.get("/api/books/top-sales?limit=lots").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn one_sales_figure_per_book_and_year() {
    let app = TestApp::new().await;
    let author = app.create_author("A. Doe").await;
    let book = app.create_book(&author, "T", "S", 0).await;
    let other = app.create_book(&author, "U", "S", 0).await;

    let (status, _) = app
        .post("/api/sales", json!({ "book": book, "year": 2024, "sales": 10 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .post("/api/sales", json!({ "book": book, "year": 2024, "sales": 99 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"]["details"],
        json!([{ "field": "year", "error": "duplicate" }])
    );

    // Same year for another book, then moving it onto the taken pair
    let (status, sale) = app
        .post("/api/sales", json!({ "book": other, "year": 2024, "sales": 5 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/api/sales/{}", sale["id"].as_str().unwrap());
    let (status, body) = app.put(&uri, json!({ "book": book })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"][0]["error"], "duplicate");

    let (_, sales) = app.get("/api/sales").await;
    assert_eq!(sales.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn author_stats_filter_and_sort() {
    let app = TestApp::new().await;
    let (_, ursula) = app
        .post(
            "/api/authors",
            json!({ "name": "Ursula", "date_of_birth": "1929-10-21", "country": "United States" }),
        )
        .await;
    let ursula = ursula["id"].as_str().unwrap().to_string();
    let terry = app.create_author("Terry").await;

    let book = app.create_book(&ursula, "Earthsea", "Wizards", 0).await;
    app.create_book(&ursula, "Dispossessed", "Anarchists", 0).await;
    for score in [5, 4] {
        app.post("/api/reviews", json!({ "book": book, "score": score }))
            .await;
    }
    app.post("/api/sales", json!({ "book": book, "year": 2020, "sales": 300 }))
        .await;

    let (status, rows) = app.get("/api/authors/stats?sort=books&order=desc").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows[0]["id"], ursula.as_str());
    assert_eq!(rows[0]["books_published"], 2);
    assert_eq!(rows[0]["avg_score"], 4.5);
    assert_eq!(rows[0]["total_sales"], 300);
    assert_eq!(rows[1]["id"], terry.as_str());
    assert_eq!(rows[1]["avg_score"], 0.0);

    let (_, rows) = app.get("/api/authors/stats?name=TER").await;
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["name"], "Terry");

    let (_, rows) = app.get("/api/authors/stats?country=united%20states").await;
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["name"], "Ursula");

    let (status, body) = app.get("/api/authors/stats?sort=height").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_shape(&body, "bad_request");
}

#[tokio::test]
async fn top_rated_books_carry_best_and_worst_reviews() {
    let app = TestApp::new().await;
    let author = app.create_author("A. Doe").await;
    let loved = app.create_book(&author, "Loved", "S", 0).await;
    let divisive = app.create_book(&author, "Divisive", "S", 0).await;
    app.create_book(&author, "Unread", "S", 0).await;

    let reviews = [
        (&loved, 5, 0),
        (&divisive, 5, 12),
        (&divisive, 1, 0),
        (&divisive, 1, 7),
    ];
    for (book, score, up_votes) in reviews {
        let (status, _) = app
            .post(
                "/api/reviews",
                json!({ "book": book, "score": score, "up_votes": up_votes }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, ranked) = app.get("/api/books/top-rated").await;
    assert_eq!(status, StatusCode::OK);
    let ranked = ranked.as_array().unwrap();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0]["book"]["id"], loved.as_str());
    assert_eq!(ranked[0]["avg_score"], 5.0);
    assert_eq!(ranked[0]["book"]["author"]["name"], "A. Doe");

    let second = &ranked[1];
    assert_eq!(second["book"]["id"], divisive.as_str());
    assert_eq!(second["best"]["up_votes"], 12);
    assert_eq!(second["worst"]["score"], 1);
    assert_eq!(second["worst"]["up_votes"], 0);

    let (_, ranked) = app.get("/api/books/top-rated?limit=1").await;
    assert_eq!(ranked.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn top_sales_report_author_totals_and_year_leaders() {
    let app = TestApp::new().await;
    let author = app.create_author("A. Doe").await;
    let hit = app.create_book(&author, "Hit", "S", 500).await;
    let minor = app.create_book(&author, "Minor", "S", 20).await;

    // Both books were published in 2020
    for (book, year, sales) in [(&hit, 2020, 400), (&hit, 2021, 100), (&minor, 2020, 20)] {
        let (status, _) = app
            .post("/api/sales", json!({ "book": book, "year": year, "sales": sales }))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, top) = app.get("/api/books/top-sales").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(top[0]["id"], hit.as_str());
    assert_eq!(top[0]["author_total_sales"], 520);
    assert_eq!(top[0]["in_top5_pub_year"], true);
    assert_eq!(top[1]["id"], minor.as_str());
    assert_eq!(top[1]["author_total_sales"], 520);
    assert_eq!(top[1]["in_top5_pub_year"], true);
}

#[tokio::test]
async fn every_route_is_documented() {
    let app = TestApp::new().await;
    let (status, doc) = app.get("/docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["openapi"], "3.1.0");

    let routes = [
        ("get", "/"),
        ("get", "/healthz"),
        ("get", "/api/authors"),
        ("post", "/api/authors"),
        ("get", "/api/authors/{id}"),
        ("put", "/api/authors/{id}"),
        ("delete", "/api/authors/{id}"),
        ("get", "/api/books"),
        ("post", "/api/books"),
        ("get", "/api/books/{id}"),
        ("put", "/api/books/{id}"),
        ("delete", "/api/books/{id}"),
        ("get", "/api/books/author/{author_id}"),
        ("get", "/api/books/search"),
        ("get", "/api/books/top-sales"),
        ("get", "/api/books/top-rated"),
        ("get", "/api/authors/stats"),
        ("get", "/api/reviews"),
        ("post", "/api/reviews"),
        ("get", "/api/reviews/{id}"),
        ("put", "/api/reviews/{id}"),
        ("delete", "/api/reviews/{id}"),
        ("get", "/api/sales"),
        ("post", "/api/sales"),
        ("get", "/api/sales/{id}"),
        ("put", "/api/sales/{id}"),
        ("delete", "/api/sales/{id}"),
    ];
    for (method, path) in routes {
        assert!(
            doc["paths"][path][method].is_object(),
            "{method} {path} missing from the OpenAPI document"
        );
    }

    let documented: usize = doc["paths"]
        .as_object()
        .unwrap()
        .values()
        .map(|item| item.as_object().unwrap().len())
        .sum();
    assert_eq!(documented, routes.len());

    let schemas = [
        "ErrorResponse",
        "AuthorView",
        "AuthorStats",
        "BookView",
        "TopSellingBook",
        "RatedBook",
        "ReviewView",
        "SaleView",
    ];
    for schema in schemas {
        assert!(doc["components"]["schemas"][schema].is_object(), "{schema}");
    }
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .uri("/api/authors")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

/// Store whose every call fails, for the 500 paths.
struct BrokenStore;

fn broken(collection: Collection) -> StoreError {
    StoreError::MissingId(collection.name())
}

#[async_trait::async_trait]
impl DocumentStore for BrokenStore {
    async fn ping(&self) -> StoreResult<()> {
        Err(broken(Collection::Authors))
    }

    async fn ensure_index(&self, index: &IndexSpec) -> StoreResult<()> {
        Err(broken(index.collection))
    }

    async fn find(&self, collection: Collection, _: &Filter, _: &FindOptions) -> StoreResult<Vec<Document>> {
        Err(broken(collection))
    }

    async fn find_one(&self, collection: Collection, _: ObjectId) -> StoreResult<Option<Document>> {
        Err(broken(collection))
    }

    async fn insert_one(&self, collection: Collection, _: Document) -> StoreResult<()> {
        Err(broken(collection))
    }

    async fn insert_many(&self, collection: Collection, _: Vec<Document>) -> StoreResult<()> {
        Err(broken(collection))
    }

    async fn update_one(&self, collection: Collection, _: ObjectId, _: Document) -> StoreResult<Option<Document>> {
        Err(broken(collection))
    }

    async fn delete_one(&self, collection: Collection, _: ObjectId) -> StoreResult<Option<Document>> {
        Err(broken(collection))
    }

    async fn clear(&self, collection: Collection) -> StoreResult<u64> {
        Err(broken(collection))
    }
}

#[tokio::test]
async fn datastore_failures_are_internal_errors_without_details() {
    let store = StoreHandle::new(BrokenStore);
    let registry = build_registry(&store);
    let app = TestApp {
        router: bookreview_http::build_router(&registry, &Settings::default(), &store),
    };

    let cases = [
        ("authors", "Failed to fetch authors", "Failed to fetch author", "Failed to delete author"),
        ("books", "Failed to fetch books", "Failed to fetch book", "Failed to delete book"),
        ("reviews", "Failed to fetch reviews", "Failed to fetch review", "Failed to delete review"),
        ("sales", "Failed to fetch sales", "Failed to fetch sale", "Failed to delete sale"),
    ];
    for (resource, list_message, get_message, delete_message) in cases {
        let item = format!("/api/{resource}/{MISSING_ID}");
        let requests = [
            (app.get(&format!("/api/{resource}")).await, list_message),
            (app.get(&item).await, get_message),
            (app.delete(&item).await, delete_message),
        ];
        for ((status, body), message) in requests {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{resource}: {body}");
            assert_error_shape(&body, "internal_error");
            assert_eq!(body["error"]["message"], message);
            assert_eq!(body["error"]["details"], json!([]));
            assert!(!body.to_string().contains("_id"), "store error leaked: {body}");
        }
    }

    let (status, body) = app.get("/api/books/top-sales").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_error_shape(&body, "internal_error");

    let (status, _) = app.get("/healthz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
