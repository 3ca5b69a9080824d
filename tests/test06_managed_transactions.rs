use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use libsql_middleware::prelude::*;

async fn fresh_connection() -> Result<LibsqlConnection, LibsqlMiddlewareError> {
    let cap = ConfigAndPool::libsql_builder(":memory:").build().await?;
    let mut conn = cap.get_connection().await?;
    conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, note TEXT);")
        .await?;
    Ok(conn)
}

async fn count_rows(conn: &mut LibsqlConnection) -> Result<i64, LibsqlMiddlewareError> {
    let rs = conn.select("SELECT COUNT(*) AS cnt FROM t", &[]).await?;
    Ok(*rs.results[0].get("cnt").unwrap().as_int().unwrap())
}

#[test]
fn test06_success_path_commits_the_work() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let mut conn = fresh_connection().await?;

        let value = conn
            .transaction(
                |c| {
                    Box::pin(async move {
                        c.insert(
                            "INSERT INTO t (note) VALUES (?1)",
                            &[RowValues::Text("kept".into())],
                        )
                        .await?;
                        Ok(42)
                    })
                },
                1,
            )
            .await?;

        assert_eq!(value, 42);
        assert_eq!(conn.transaction_level(), 0);
        assert_eq!(count_rows(&mut conn).await?, 1);

        Ok::<(), LibsqlMiddlewareError>(())
    })?;
    Ok(())
}

#[test]
fn test06_failed_work_rolls_back_and_propagates() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let mut conn = fresh_connection().await?;

        let result: Result<(), _> = conn
            .transaction(
                |c| {
                    Box::pin(async move {
                        c.insert(
                            "INSERT INTO t (note) VALUES (?1)",
                            &[RowValues::Text("doomed".into())],
                        )
                        .await?;
                        // A constraint violation is not a concurrency error,
                        // so the default policy does not retry it.
                        c.insert(
                            "INSERT INTO t (id, note) VALUES (1, ?1)",
                            &[RowValues::Text("dup".into())],
                        )
                        .await?;
                        Ok(())
                    })
                },
                3,
            )
            .await;

        assert!(matches!(
            result,
            Err(LibsqlMiddlewareError::ExecutionError(_))
        ));
        assert_eq!(conn.transaction_level(), 0);
        assert_eq!(count_rows(&mut conn).await?, 0);

        Ok::<(), LibsqlMiddlewareError>(())
    })?;
    Ok(())
}

#[test]
fn test06_concurrency_errors_retry_up_to_budget() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let mut conn = fresh_connection().await?;
        let tries = Arc::new(AtomicUsize::new(0));

        let tries_in = tries.clone();
        let value = conn
            .transaction(
                move |c| {
                    let tries = tries_in.clone();
                    Box::pin(async move {
                        if tries.fetch_add(1, Ordering::SeqCst) == 0 {
                            // First attempt hits contention; the default
                            // policy classifies this as retryable.
                            return Err(LibsqlMiddlewareError::ExecutionError(
                                "database is locked".to_string(),
                            ));
                        }
                        c.insert(
                            "INSERT INTO t (note) VALUES (?1)",
                            &[RowValues::Text("second try".into())],
                        )
                        .await?;
                        Ok("done")
                    })
                },
                3,
            )
            .await?;

        assert_eq!(value, "done");
        assert_eq!(tries.load(Ordering::SeqCst), 2);
        assert_eq!(conn.transaction_level(), 0);
        assert_eq!(count_rows(&mut conn).await?, 1);

        Ok::<(), LibsqlMiddlewareError>(())
    })?;
    Ok(())
}

#[test]
fn test06_exhausted_attempts_reraise_the_error() -> Result<(), Box<dyn std::error::Error>> {
    struct AlwaysRetry;

    impl TransactionRetryPolicy for AlwaysRetry {
        fn should_retry(
            &self,
            _error: &LibsqlMiddlewareError,
            attempt: usize,
            max_attempts: usize,
        ) -> bool {
            attempt < max_attempts
        }
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let mut conn = fresh_connection().await?;
        let tries = Arc::new(AtomicUsize::new(0));

        let tries_in = tries.clone();
        let result: Result<(), _> = conn
            .transaction_with_policy(
                move |_c| {
                    let tries = tries_in.clone();
                    Box::pin(async move {
                        tries.fetch_add(1, Ordering::SeqCst);
                        Err(LibsqlMiddlewareError::Other("always failing".to_string()))
                    })
                },
                3,
                &AlwaysRetry,
            )
            .await;

        assert!(matches!(result, Err(LibsqlMiddlewareError::Other(_))));
        assert_eq!(tries.load(Ordering::SeqCst), 3);
        assert_eq!(conn.transaction_level(), 0);

        Ok::<(), LibsqlMiddlewareError>(())
    })?;
    Ok(())
}

#[test]
fn test06_zero_attempts_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let mut conn = fresh_connection().await?;

        let result: Result<(), _> = conn
            .transaction(|_c| Box::pin(async move { Ok(()) }), 0)
            .await;

        assert!(matches!(
            result,
            Err(LibsqlMiddlewareError::TransactionError(_))
        ));

        Ok::<(), LibsqlMiddlewareError>(())
    })?;
    Ok(())
}
