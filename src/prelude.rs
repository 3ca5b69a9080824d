//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::config::{ConfigAndPool, LibsqlOptions, LibsqlOptionsBuilder};
pub use crate::connection::{
    DatabaseConnection, LibsqlConnection, LoggedStatement, Prepared,
};
pub use crate::error::LibsqlMiddlewareError;
pub use crate::events::{ConnectionEvent, TransactionManager};
pub use crate::processor::insert_get_id;
pub use crate::results::{ObjectRow, ResultSet, Row};
pub use crate::retry::{ConcurrencyRetryPolicy, TransactionRetryPolicy};
pub use crate::schema::SchemaBuilder;
pub use crate::types::{FetchMode, RowValues};
