//! Query execution integration tests.
//!
//! Runs gated queries end to end against a seeded SQLite file and checks
//! the JSON shape of the results.

use pretty_assertions::assert_eq;
use query_gate::error::GateError;
use query_gate::query::QueryExecutor;
use query_gate::safety::Rejection;
use serde_json::json;

use super::common::Fixture;

#[tokio::test]
async fn test_execute_scalar_select() {
    let fixture = Fixture::seeded(4).await;

    let result = QueryExecutor::new(&fixture.pool)
        .execute("SELECT 1 AS x")
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({"columns": ["x"], "rows": [{"x": "1"}], "count": 1})
    );
}

#[tokio::test]
async fn test_zero_rows_is_an_empty_success() {
    let fixture = Fixture::seeded(4).await;

    let result = QueryExecutor::new(&fixture.pool)
        .execute("SELECT * FROM customers WHERE id = 999")
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({"columns": [], "rows": [], "count": 0})
    );
}

#[tokio::test]
async fn test_null_is_distinct_from_text_null() {
    let fixture = Fixture::seeded(4).await;

    let result = QueryExecutor::new(&fixture.pool)
        .execute("SELECT name, 'null' AS literal FROM customers WHERE id = 2")
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_value(&result.rows[0]).unwrap(),
        json!({"name": null, "literal": "null"})
    );
}

#[tokio::test]
async fn test_values_are_rendered_as_text() {
    let fixture = Fixture::seeded(4).await;

    let result = QueryExecutor::new(&fixture.pool)
        .execute("SELECT id, customer_id, total, receipt FROM orders ORDER BY id")
        .await
        .unwrap();

    assert_eq!(result.columns, vec!["id", "customer_id", "total", "receipt"]);
    assert_eq!(
        serde_json::to_value(&result.rows).unwrap(),
        json!([
            {"id": "10", "customer_id": "1", "total": "19.5", "receipt": "3q2+7w=="},
            {"id": "11", "customer_id": "1", "total": "5.0", "receipt": null},
            {"id": "12", "customer_id": "3", "total": "100.25", "receipt": null}
        ])
    );
}

#[tokio::test]
async fn test_join_and_aggregate() {
    let fixture = Fixture::seeded(4).await;

    let result = QueryExecutor::new(&fixture.pool)
        .execute(
            "SELECT c.email, COUNT(o.id) AS orders
             FROM customers c LEFT JOIN orders o ON o.customer_id = c.id
             GROUP BY c.id ORDER BY c.id",
        )
        .await
        .unwrap();

    let counts: Vec<_> = result
        .rows
        .iter()
        .map(|row| row.get("orders").unwrap().unwrap().to_string())
        .collect();
    assert_eq!(counts, vec!["2", "0", "1"]);
}

#[tokio::test]
async fn test_cte_executes() {
    let fixture = Fixture::seeded(4).await;

    let result = QueryExecutor::new(&fixture.pool)
        .execute("WITH t AS (SELECT 1 AS n) SELECT n FROM t")
        .await
        .unwrap();

    assert_eq!(result.columns, vec!["n"]);
    assert_eq!(result.rows[0].get("n"), Some(Some("1")));
}

#[tokio::test]
async fn test_identifier_containing_keyword_executes() {
    let fixture = Fixture::seeded(4).await;

    let result = QueryExecutor::new(&fixture.pool)
        .execute("SELECT updated_at FROM customers WHERE id = 1")
        .await
        .unwrap();

    assert_eq!(result.rows[0].get("updated_at"), Some(Some("2024-05-01")));
}

#[tokio::test]
async fn test_trailing_semicolon_and_comments_execute() {
    let fixture = Fixture::seeded(4).await;

    let result = QueryExecutor::new(&fixture.pool)
        .execute("-- how many?\nSELECT COUNT(*) AS n /* all rows */ FROM customers;")
        .await
        .unwrap();

    assert_eq!(result.rows[0].get("n"), Some(Some("3")));
}

#[tokio::test]
async fn test_rejections() {
    let fixture = Fixture::seeded(4).await;
    let executor = QueryExecutor::new(&fixture.pool);

    let cases = [
        (
            "-- ok\nDROP TABLE customers;",
            Rejection::ForbiddenKeyword("DROP"),
        ),
        (
            "delete from customers",
            Rejection::ForbiddenKeyword("DELETE"),
        ),
        ("EXPLAIN SELECT 1", Rejection::NotReadQuery),
        (
            "SELECT 1; SELECT 2",
            Rejection::MultipleStatements,
        ),
        (
            "SELECT '/*'; DROP TABLE customers; -- */'",
            Rejection::ForbiddenKeyword("DROP"),
        ),
    ];

    for (sql, expected) in cases {
        match executor.execute(sql).await {
            Err(GateError::Rejected(reason)) => assert_eq!(reason, expected, "{sql}"),
            other => panic!("expected rejection for {sql:?}, got {other:?}"),
        }
    }

    // Nothing was opened for rejected input.
    assert_eq!(fixture.pool.status().live, 0);

    let count = executor
        .execute("SELECT COUNT(*) AS n FROM customers")
        .await
        .unwrap();
    assert_eq!(count.rows[0].get("n"), Some(Some("3")));
}

#[tokio::test]
async fn test_empty_query() {
    let fixture = Fixture::seeded(4).await;

    let err = QueryExecutor::new(&fixture.pool)
        .execute("  ")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "no query provided");
}

#[tokio::test]
async fn test_sql_error_message() {
    let fixture = Fixture::seeded(4).await;

    let err = QueryExecutor::new(&fixture.pool)
        .execute("SELECT nope FROM customers")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "SQL error: no such column: nope");
}
