//! Pool behaviour under real SQLite load.

use std::sync::Arc;

use futures::future::join_all;
use query_gate::query::QueryExecutor;

use super::common::Fixture;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_queries_within_capacity() {
    let capacity = 8;
    let fixture = Fixture::seeded(capacity).await;
    let pool = Arc::clone(&fixture.pool);

    let tasks = (0..capacity).map(|i| {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move {
            QueryExecutor::new(&pool)
                .execute(&format!("SELECT {i} AS n, COUNT(*) AS c FROM orders"))
                .await
        })
    });

    for (i, joined) in join_all(tasks).await.into_iter().enumerate() {
        let result = joined.unwrap().unwrap();
        assert_eq!(result.rows[0].get("n"), Some(Some(i.to_string().as_str())));
        assert_eq!(result.rows[0].get("c"), Some(Some("3")));
    }

    let status = pool.status();
    assert!(status.live <= capacity);
    assert_eq!(status.in_use, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_burst_beyond_capacity_queues() {
    let capacity = 3;
    let fixture = Fixture::seeded(capacity).await;
    let pool = Arc::clone(&fixture.pool);

    let tasks = (0..40).map(|_| {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move {
            let result = QueryExecutor::new(&pool)
                .execute("SELECT email FROM customers ORDER BY id")
                .await;
            assert!(pool.status().live <= 3);
            result
        })
    });

    for joined in join_all(tasks).await {
        assert_eq!(joined.unwrap().unwrap().count, 3);
    }
    assert!(pool.status().live <= capacity);
}

#[tokio::test]
async fn test_failing_queries_do_not_leak_connections() {
    let capacity = 4;
    let fixture = Fixture::seeded(capacity).await;
    let executor = QueryExecutor::new(&fixture.pool);

    executor.execute("SELECT 1").await.unwrap();
    let baseline = fixture.pool.status();
    assert_eq!(baseline.idle, 1);

    for _ in 0..25 {
        assert!(executor.execute("SELECT * FROM missing").await.is_err());
    }

    let after = fixture.pool.status();
    assert!(after.live <= capacity);
    assert_eq!(after.in_use, 0);

    // Failures discard; the next success leaves exactly one idle connection again.
    executor.execute("SELECT 1").await.unwrap();
    assert_eq!(fixture.pool.status().idle, baseline.idle);
}
