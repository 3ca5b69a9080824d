use libsql_middleware::prelude::*;

#[test]
fn test03_pretend_short_circuits_before_the_driver() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let cap = ConfigAndPool::libsql_builder(":memory:").build().await?;
        let mut conn = cap.get_connection().await?;

        // DDL affects no rows, so this leaves the modified flag untouched.
        let changed = conn
            .unprepared("CREATE TABLE t (id INTEGER PRIMARY KEY, note TEXT)")
            .await?;
        assert!(!changed);

        let log = conn
            .pretend(|c| {
                Box::pin(async move {
                    let rs = c.select("SELECT * FROM t", &[]).await?;
                    assert!(rs.results.is_empty());

                    let ok = c
                        .statement(
                            "INSERT INTO t (note) VALUES (?1)",
                            &[RowValues::Text("dry".into())],
                        )
                        .await?;
                    assert!(ok);

                    let affected = c
                        .affecting_statement("DELETE FROM t", &[])
                        .await?;
                    assert_eq!(affected, 0);

                    Ok(())
                })
            })
            .await?;

        // Every intended statement was captured, in order.
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].sql, "SELECT * FROM t");
        assert_eq!(log[1].sql, "INSERT INTO t (note) VALUES (?1)");
        assert_eq!(log[1].bindings, vec![RowValues::Text("dry".into())]);
        assert_eq!(log[2].sql, "DELETE FROM t");

        // Nothing reached the database and no state was mutated.
        assert!(!conn.pretending());
        assert!(!conn.has_modified_records());
        let rs = conn.select("SELECT COUNT(*) AS cnt FROM t", &[]).await?;
        assert_eq!(*rs.results[0].get("cnt").unwrap().as_int().unwrap(), 0);

        Ok::<(), LibsqlMiddlewareError>(())
    })?;
    Ok(())
}

#[test]
fn test03_pretend_scope_restored_on_error() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let cap = ConfigAndPool::libsql_builder(":memory:").build().await?;
        let mut conn = cap.get_connection().await?;

        let result: Result<Vec<LoggedStatement>, _> = conn
            .pretend(|_c| {
                Box::pin(async move {
                    Err::<(), _>(LibsqlMiddlewareError::Other("caller bailed".into()))
                })
            })
            .await;

        assert!(result.is_err());
        assert!(!conn.pretending());

        // The connection still works normally afterwards.
        conn.execute_batch("CREATE TABLE t (id INTEGER);").await?;
        conn.insert("INSERT INTO t (id) VALUES (?1)", &[RowValues::Int(1)])
            .await?;
        let rs = conn.select("SELECT COUNT(*) AS cnt FROM t", &[]).await?;
        assert_eq!(*rs.results[0].get("cnt").unwrap().as_int().unwrap(), 1);

        Ok::<(), LibsqlMiddlewareError>(())
    })?;
    Ok(())
}
