use libsql_middleware::prelude::*;

#[test]
fn test05_generated_ids_come_back_as_integers() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let cap = ConfigAndPool::libsql_builder(":memory:").build().await?;
        let mut conn = cap.get_connection().await?;

        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT);")
            .await?;

        let id = insert_get_id(
            &mut conn,
            "INSERT INTO t (name) VALUES (?1)",
            &[RowValues::Text("alice".into())],
        )
        .await?;
        assert_eq!(id, RowValues::Int(1));

        let id = insert_get_id(
            &mut conn,
            "INSERT INTO t (name) VALUES (?1)",
            &[RowValues::Text("bob".into())],
        )
        .await?;
        assert_eq!(id, RowValues::Int(2));

        // The raw contract value stays a string until post-processing.
        assert_eq!(conn.last_insert_id(), Some("2"));

        Ok::<(), LibsqlMiddlewareError>(())
    })?;
    Ok(())
}

#[test]
fn test05_explicit_rowids_are_tracked() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let cap = ConfigAndPool::libsql_builder(":memory:").build().await?;
        let mut conn = cap.get_connection().await?;

        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT);")
            .await?;
        assert_eq!(conn.last_insert_id(), None);

        conn.insert(
            "INSERT INTO t (id, name) VALUES (?1, ?2)",
            &[RowValues::Int(77), RowValues::Text("carol".into())],
        )
        .await?;
        assert_eq!(conn.last_insert_id(), Some("77"));

        Ok::<(), LibsqlMiddlewareError>(())
    })?;
    Ok(())
}
