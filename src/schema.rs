//! Schema introspection over the plain statement contract.
//!
//! Everything here goes through `select`/`statement` with raw SQL; there is
//! no grammar layer. Objects with the reserved `sqlite_` name prefix are
//! never touched.

use crate::connection::LibsqlConnection;
use crate::error::LibsqlMiddlewareError;

enum SchemaObject {
    Table,
    View,
}

impl SchemaObject {
    fn type_name(&self) -> &'static str {
        match self {
            SchemaObject::Table => "table",
            SchemaObject::View => "view",
        }
    }

    fn drop_keyword(&self) -> &'static str {
        match self {
            SchemaObject::Table => "TABLE",
            SchemaObject::View => "VIEW",
        }
    }
}

/// Schema helper borrowing a connection
pub struct SchemaBuilder<'c> {
    conn: &'c mut LibsqlConnection,
}

impl<'c> SchemaBuilder<'c> {
    pub fn new(conn: &'c mut LibsqlConnection) -> Self {
        Self { conn }
    }

    /// Names of all user tables
    ///
    /// # Errors
    ///
    /// Propagates the underlying `select` failure.
    pub async fn get_tables(&mut self) -> Result<Vec<String>, LibsqlMiddlewareError> {
        self.get_object_names(SchemaObject::Table).await
    }

    /// Names of all user views
    ///
    /// # Errors
    ///
    /// Propagates the underlying `select` failure.
    pub async fn get_views(&mut self) -> Result<Vec<String>, LibsqlMiddlewareError> {
        self.get_object_names(SchemaObject::View).await
    }

    /// Drop all tables from the database
    ///
    /// Foreign key enforcement is disabled for the duration and re-enabled
    /// afterwards, even when a drop fails partway; the drop error is what
    /// the caller sees.
    ///
    /// # Errors
    ///
    /// Propagates the first failing statement.
    pub async fn drop_all_tables(&mut self) -> Result<(), LibsqlMiddlewareError> {
        self.drop_all(SchemaObject::Table).await
    }

    /// Drop all views from the database
    ///
    /// Same foreign-key handling as [`drop_all_tables`](Self::drop_all_tables).
    ///
    /// # Errors
    ///
    /// Propagates the first failing statement.
    pub async fn drop_all_views(&mut self) -> Result<(), LibsqlMiddlewareError> {
        self.drop_all(SchemaObject::View).await
    }

    async fn get_object_names(
        &mut self,
        object: SchemaObject,
    ) -> Result<Vec<String>, LibsqlMiddlewareError> {
        let result_set = self
            .conn
            .select(
                &format!(
                    "SELECT name FROM sqlite_master WHERE type = '{}'",
                    object.type_name()
                ),
                &[],
            )
            .await?;

        Ok(result_set
            .results
            .iter()
            .filter_map(|row| row.get("name").and_then(|v| v.as_text()))
            .map(str::to_string)
            .collect())
    }

    async fn drop_all(&mut self, object: SchemaObject) -> Result<(), LibsqlMiddlewareError> {
        self.conn.statement("PRAGMA foreign_keys = 0", &[]).await?;

        let dropped = self.drop_objects(&object).await;
        let restored = self.conn.statement("PRAGMA foreign_keys = 1", &[]).await;

        // A failed drop wins over a failed restore.
        dropped?;
        restored?;
        Ok(())
    }

    async fn drop_objects(&mut self, object: &SchemaObject) -> Result<(), LibsqlMiddlewareError> {
        let names = match object {
            SchemaObject::Table => self.get_tables().await?,
            SchemaObject::View => self.get_views().await?,
        };

        for name in names {
            if name.starts_with("sqlite_") {
                continue;
            }

            self.conn
                .statement(
                    &format!("DROP {} \"{}\"", object.drop_keyword(), name),
                    &[],
                )
                .await?;
        }

        Ok(())
    }
}
