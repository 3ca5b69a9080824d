//! Post-processing for insert statements that need the generated id back.

use crate::connection::LibsqlConnection;
use crate::error::LibsqlMiddlewareError;
use crate::types::RowValues;

/// Run an insert and return the id the database assigned to the new row.
///
/// A numeric-looking id comes back as `RowValues::Int`; anything else (e.g.
/// a text primary key) passes through as `RowValues::Text`. `RowValues::Null`
/// means the connection has not observed an insert.
///
/// # Errors
///
/// Propagates the insert failure.
pub async fn insert_get_id(
    conn: &mut LibsqlConnection,
    sql: &str,
    bindings: &[RowValues],
) -> Result<RowValues, LibsqlMiddlewareError> {
    conn.insert(sql, bindings).await?;
    Ok(coerce_insert_id(conn.last_insert_id()))
}

/// Coerce a last-insert-id into its caller-facing value.
#[must_use]
pub fn coerce_insert_id(id: Option<&str>) -> RowValues {
    match id {
        None => RowValues::Null,
        Some(raw) => match raw.parse::<i64>() {
            Ok(numeric) => RowValues::Int(numeric),
            Err(_) => RowValues::Text(raw.to_string()),
        },
    }
}
