//! HTTP endpoint integration tests, driven through the router with `oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use query_gate::bootstrap::DatabaseLoader;
use query_gate::config::{PoolConfig, ServerConfig};
use query_gate::server::{create_router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::Fixture;

fn router(fixture: &Fixture, allow_upload: bool) -> Router {
    let server_config = ServerConfig {
        allow_upload,
        ..ServerConfig::default()
    };
    let loader = DatabaseLoader::new(&fixture.path, Arc::clone(&fixture.pool));
    let state = AppState::new(
        Arc::clone(&fixture.pool),
        loader,
        &PoolConfig::default(),
        &server_config,
    );
    create_router(state, server_config.max_upload_bytes)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_query(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/execute_query")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_execute_query_ok() {
    let fixture = Fixture::seeded(2).await;

    let (status, body) = send(
        router(&fixture, false),
        post_query(json!({"query": "SELECT 1 AS x"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"columns": ["x"], "rows": [{"x": "1"}], "count": 1})
    );
}

#[tokio::test]
async fn test_execute_query_status_codes() {
    let fixture = Fixture::seeded(2).await;

    let cases = [
        (json!({"query": ""}), StatusCode::BAD_REQUEST, "no query provided"),
        (json!({}), StatusCode::BAD_REQUEST, "no query provided"),
        (
            json!({"query": "DROP TABLE customers"}),
            StatusCode::FORBIDDEN,
            "query contains forbidden keyword: DROP",
        ),
        (
            json!({"query": "EXPLAIN SELECT 1"}),
            StatusCode::FORBIDDEN,
            "only read queries are allowed",
        ),
        (
            json!({"query": "SELECT 1; SELECT 2"}),
            StatusCode::FORBIDDEN,
            "multiple statements are not allowed",
        ),
        (
            json!({"query": "SELECT * FROM nowhere"}),
            StatusCode::BAD_REQUEST,
            "SQL error: no such table: nowhere",
        ),
    ];

    for (request, expected_status, expected_error) in cases {
        let (status, body) = send(router(&fixture, false), post_query(request.clone())).await;
        assert_eq!(status, expected_status, "{request}");
        assert_eq!(body, json!({"error": expected_error}), "{request}");
    }
}

#[tokio::test]
async fn test_execute_query_malformed_json() {
    let fixture = Fixture::seeded(2).await;

    let request = Request::builder()
        .method("POST")
        .uri("/execute_query")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(router(&fixture, false), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("invalid request"));
}

#[tokio::test]
async fn test_list_tables() {
    let fixture = Fixture::seeded(2).await;

    let (status, body) = send(router(&fixture, false), get("/list_tables")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"tables": ["customers", "orders"]}));
}

#[tokio::test]
async fn test_table_schema() {
    let fixture = Fixture::seeded(2).await;

    let (status, body) = send(router(&fixture, false), get("/table_schema/customers")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["table"], "customers");
    assert_eq!(
        body["schema"][1],
        json!({"column": "email", "type": "TEXT", "nullable": false, "primary_key": false})
    );
}

#[tokio::test]
async fn test_table_schema_errors() {
    let fixture = Fixture::seeded(2).await;

    let (status, body) = send(
        router(&fixture, false),
        get("/table_schema/customers%3B%20DROP"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "invalid table name: customers; DROP"}));

    let (status, body) = send(router(&fixture, false), get("/table_schema/ghosts")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "SQL error: no such table: ghosts"}));
}

#[tokio::test]
async fn test_pool_unavailable_is_503() {
    // No database file yet: connections cannot be opened.
    let fixture = Fixture::empty(1);

    let (status, body) = send(
        router(&fixture, false),
        post_query(json!({"query": "SELECT 1"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().starts_with("error: "));
}

#[tokio::test]
async fn test_upload_then_query() {
    let fixture = Fixture::empty(2);

    let upload = Request::builder()
        .method("POST")
        .uri("/upload_sql?filename=seed.sql")
        .body(Body::from(
            "CREATE TABLE pets (name TEXT); INSERT INTO pets VALUES ('rex');",
        ))
        .unwrap();
    let (status, body) = send(router(&fixture, true), upload).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "message": "Database loaded successfully",
            "filename": "seed.sql",
            "tables": ["pets"]
        })
    );

    let (status, body) = send(
        router(&fixture, true),
        post_query(json!({"query": "SELECT name FROM pets"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows"], json!([{"name": "rex"}]));
}

#[tokio::test]
async fn test_upload_rejections() {
    let fixture = Fixture::seeded(2).await;

    let wrong_extension = Request::builder()
        .method("POST")
        .uri("/upload_sql?filename=seed.txt")
        .body(Body::from("CREATE TABLE t (id INTEGER);"))
        .unwrap();
    let (status, body) = send(router(&fixture, true), wrong_extension).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "file must be a .sql file"}));

    let broken = Request::builder()
        .method("POST")
        .uri("/upload_sql?filename=seed.sql")
        .body(Body::from("CREATE TABLE (;"))
        .unwrap();
    let (status, body) = send(router(&fixture, true), broken).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to load SQL: "));

    let disabled = Request::builder()
        .method("POST")
        .uri("/upload_sql?filename=seed.sql")
        .body(Body::from("CREATE TABLE t (id INTEGER);"))
        .unwrap();
    let (status, body) = send(router(&fixture, false), disabled).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({"error": "uploads are disabled"}));

    // The seeded tables survived all three.
    let (_, body) = send(router(&fixture, false), get("/list_tables")).await;
    assert_eq!(body, json!({"tables": ["customers", "orders"]}));
}

#[tokio::test]
async fn test_health_reports_pool_status() {
    let fixture = Fixture::seeded(3).await;

    let (status, body) = send(router(&fixture, false), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["pool"]["capacity"], 3);
    assert_eq!(body["pool"]["in_use"], 0);
}

#[tokio::test]
async fn test_upload_must_be_utf8() {
    let fixture = Fixture::seeded(2).await;

    let request = Request::builder()
        .method("POST")
        .uri("/upload_sql?filename=seed.sql")
        .body(Body::from(vec![0x43, 0x52, 0xff, 0xfe]))
        .unwrap();
    let (status, body) = send(router(&fixture, true), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "script is not valid UTF-8"}));
}
