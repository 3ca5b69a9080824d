//! Async transactional client middleware for libsql.
//!
//! Wraps a pooled libsql session (local file, `:memory:`, or remote/Turso)
//! behind the connection contract an ORM adapter layer programs against:
//! typed-binding statement execution, nested transactions via savepoints,
//! last-insert-id tracking, a dry-run scope, and lifecycle events.
//!
//! ```rust,no_run
//! use libsql_middleware::prelude::*;
//!
//! # async fn demo() -> Result<(), LibsqlMiddlewareError> {
//! let cap = ConfigAndPool::libsql_builder(":memory:").build().await?;
//! let mut conn = cap.get_connection().await?;
//!
//! conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT);")
//!     .await?;
//! conn.insert(
//!     "INSERT INTO t (name) VALUES (?1)",
//!     &[RowValues::Text("alice".into())],
//! )
//! .await?;
//!
//! let rs = conn.select("SELECT name FROM t", &[]).await?;
//! assert_eq!(rs.results[0].get("name").unwrap().as_text(), Some("alice"));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod params;
pub mod prelude;
pub mod processor;
pub mod query;
pub mod results;
pub mod retry;
pub mod schema;
pub mod transaction;
pub mod types;

pub use config::{ConfigAndPool, LibsqlOptions, LibsqlOptionsBuilder};
pub use connection::{DatabaseConnection, LibsqlConnection, LoggedStatement, Prepared};
pub use error::LibsqlMiddlewareError;
pub use events::{ConnectionEvent, TransactionManager};
pub use params::Params;
pub use query::build_result_set;
pub use results::{ObjectRow, ResultSet, Row};
pub use retry::{ConcurrencyRetryPolicy, TransactionRetryPolicy, caused_by_concurrency_error};
pub use schema::SchemaBuilder;
pub use types::{FetchMode, RowValues};
