use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use deadpool_libsql::Object;
use futures_util::future::BoxFuture;
use tracing::{debug, warn};

use crate::error::LibsqlMiddlewareError;
use crate::events::{ConnectionEvent, EventListener, TransactionManager};
use crate::params::Params;
use crate::query::build_result_set;
use crate::results::ResultSet;
use crate::types::{FetchMode, RowValues};

/// A statement the connection intended to run, captured in dry-run scope
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedStatement {
    /// The SQL text
    pub sql: String,
    /// The bindings that would have been sent
    pub bindings: Vec<RowValues>,
}

/// The connection contract the ORM adapter layer programs against.
///
/// Backends implement this trait as alternative variants selected by
/// configuration; [`LibsqlConnection`] is the libsql-backed one.
#[async_trait]
pub trait DatabaseConnection {
    /// Run a select statement and return the materialized rows.
    async fn select(
        &mut self,
        query: &str,
        bindings: &[RowValues],
    ) -> Result<ResultSet, LibsqlMiddlewareError>;

    /// Execute a statement and return whether it succeeded.
    async fn statement(
        &mut self,
        query: &str,
        bindings: &[RowValues],
    ) -> Result<bool, LibsqlMiddlewareError>;

    /// Execute a statement and return the number of rows affected.
    async fn affecting_statement(
        &mut self,
        query: &str,
        bindings: &[RowValues],
    ) -> Result<u64, LibsqlMiddlewareError>;

    /// Run a raw, binding-free statement; returns whether rows changed.
    async fn unprepared(&mut self, query: &str) -> Result<bool, LibsqlMiddlewareError>;

    /// Open a transaction, or a savepoint when one is already open.
    async fn begin_transaction(&mut self) -> Result<(), LibsqlMiddlewareError>;

    /// Commit the current nesting level.
    async fn commit(&mut self) -> Result<(), LibsqlMiddlewareError>;

    /// Roll back to the given nesting level (one level up when `None`).
    async fn rollback(&mut self, to_level: Option<usize>) -> Result<(), LibsqlMiddlewareError>;

    /// Identifier the database assigned to the most recently inserted row.
    fn last_insert_id(&self) -> Option<&str>;
}

/// A libsql-backed database connection with transaction state.
///
/// Owns one pooled session plus the connection-local state layered on it:
/// transaction nesting level, records-modified flag, dry-run scope,
/// last-insert-id, and the configured row shape. Not internally
/// synchronized; use one connection per task.
pub struct LibsqlConnection {
    pub(crate) conn: Object,
    pub(crate) name: String,
    pub(crate) fetch_mode: FetchMode,
    pub(crate) transactions: usize,
    pub(crate) records_modified: bool,
    pub(crate) pretending: bool,
    pub(crate) pretend_log: Vec<LoggedStatement>,
    pub(crate) last_insert_id: Option<String>,
    pub(crate) listeners: Vec<EventListener>,
    pub(crate) transaction_manager: Option<Arc<dyn TransactionManager>>,
}

impl std::fmt::Debug for LibsqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibsqlConnection")
            .field("name", &self.name)
            .field("fetch_mode", &self.fetch_mode)
            .field("transactions", &self.transactions)
            .field("records_modified", &self.records_modified)
            .field("pretending", &self.pretending)
            .field("last_insert_id", &self.last_insert_id)
            .finish_non_exhaustive()
    }
}

impl LibsqlConnection {
    pub(crate) fn new(conn: Object, name: String, fetch_mode: FetchMode) -> Self {
        Self {
            conn,
            name,
            fetch_mode,
            transactions: 0,
            records_modified: false,
            pretending: false,
            pretend_log: Vec::new(),
            last_insert_id: None,
            listeners: Vec::new(),
            transaction_manager: None,
        }
    }

    /// Connection name reported to observers
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Row shape this connection materializes results into
    #[must_use]
    pub fn fetch_mode(&self) -> FetchMode {
        self.fetch_mode
    }

    /// Current transaction nesting level (0 = no transaction)
    #[must_use]
    pub fn transaction_level(&self) -> usize {
        self.transactions
    }

    /// Whether any statement on this connection has modified records
    #[must_use]
    pub fn has_modified_records(&self) -> bool {
        self.records_modified
    }

    /// Mark the connection as having modified records.
    ///
    /// Sticky: once set it stays set for the connection's lifetime.
    pub fn records_have_been_modified(&mut self, modified: bool) {
        if !self.records_modified {
            self.records_modified = modified;
        }
    }

    /// Whether the connection is in dry-run scope
    #[must_use]
    pub fn pretending(&self) -> bool {
        self.pretending
    }

    /// Reconnection hook for interface compatibility.
    ///
    /// The pool hands out live sessions or errors at checkout; there is no
    /// missing-connection state to repair.
    pub fn reconnect_if_missing_connection(&mut self) {}

    /// Register an observer for transaction lifecycle events
    pub fn listen(&mut self, listener: impl Fn(ConnectionEvent, &str) + Send + Sync + 'static) {
        self.listeners.push(Arc::new(listener));
    }

    /// Attach the optional external transaction manager
    pub fn set_transaction_manager(&mut self, manager: Arc<dyn TransactionManager>) {
        self.transaction_manager = Some(manager);
    }

    /// Detach the external transaction manager
    pub fn unset_transaction_manager(&mut self) {
        self.transaction_manager = None;
    }

    pub(crate) fn fire_connection_event(&self, event: ConnectionEvent) {
        for listener in &self.listeners {
            listener(event, &self.name);
        }
    }

    /// Notify the optional transaction manager, swallowing its failures.
    pub(crate) fn notify_manager<F>(&self, notify: F)
    where
        F: FnOnce(&dyn TransactionManager) -> Result<(), LibsqlMiddlewareError>,
    {
        if let Some(manager) = &self.transaction_manager
            && let Err(e) = notify(manager.as_ref())
        {
            warn!(connection = %self.name, error = %e, "transaction manager notification failed");
        }
    }

    fn log_pretended(&mut self, sql: &str, bindings: &[RowValues]) {
        debug!(connection = %self.name, sql, "pretending, statement not sent");
        self.pretend_log.push(LoggedStatement {
            sql: sql.to_string(),
            bindings: bindings.to_vec(),
        });
    }

    fn refresh_last_insert_id(&mut self) {
        // Zero means no row has been inserted on this session yet.
        let rowid = self.conn.last_insert_rowid();
        if rowid != 0 {
            self.last_insert_id = Some(rowid.to_string());
        }
    }

    /// Run `work` in dry-run scope and return the statements it would have
    /// executed.
    ///
    /// While the scope is active, `select` returns an empty set, write paths
    /// report success without doing anything, and nothing reaches the
    /// driver. The scope is restored even when `work` fails.
    ///
    /// # Errors
    ///
    /// Propagates whatever error `work` returns.
    pub async fn pretend<R, F>(
        &mut self,
        work: F,
    ) -> Result<Vec<LoggedStatement>, LibsqlMiddlewareError>
    where
        F: for<'c> FnOnce(
            &'c mut LibsqlConnection,
        ) -> BoxFuture<'c, Result<R, LibsqlMiddlewareError>>,
    {
        let was_pretending = self.pretending;
        self.pretending = true;
        self.pretend_log.clear();

        let result = work(&mut *self).await;

        self.pretending = was_pretending;
        result?;
        Ok(std::mem::take(&mut self.pretend_log))
    }

    /// Run a select statement and return the fully materialized rows.
    ///
    /// # Errors
    ///
    /// Returns `ParameterError` when a binding cannot be adapted and
    /// `ExecutionError` when the engine rejects or fails the statement.
    pub async fn select(
        &mut self,
        query: &str,
        bindings: &[RowValues],
    ) -> Result<ResultSet, LibsqlMiddlewareError> {
        if self.pretending {
            self.log_pretended(query, bindings);
            return Ok(ResultSet::with_capacity(0, self.fetch_mode));
        }

        let started = Instant::now();
        let params = Params::convert(bindings)?;

        let rows = self
            .conn
            .query(query, params.into_vec())
            .await
            .map_err(|e| {
                LibsqlMiddlewareError::ExecutionError(format!(
                    "Failed to execute query: {e} (sql: {query})"
                ))
            })?;

        let result_set = build_result_set(rows, self.fetch_mode).await?;
        debug!(
            connection = %self.name,
            sql = query,
            bindings = bindings.len(),
            rows = result_set.results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "select"
        );
        Ok(result_set)
    }

    /// Run a select statement and return every result set it produces.
    ///
    /// Deliberately unsupported by this backend; the call fails fast rather
    /// than silently returning the first set.
    ///
    /// # Errors
    ///
    /// Always returns `LibsqlMiddlewareError::Unimplemented`.
    pub async fn select_result_sets(
        &mut self,
        _query: &str,
        _bindings: &[RowValues],
    ) -> Result<Vec<ResultSet>, LibsqlMiddlewareError> {
        Err(LibsqlMiddlewareError::Unimplemented(
            "multi-result-set queries are not supported; issue one statement per call".to_string(),
        ))
    }

    /// Run a select statement and stream rows incrementally.
    ///
    /// Deliberately unsupported; `select` materializes the full result set.
    ///
    /// # Errors
    ///
    /// Always returns `LibsqlMiddlewareError::Unimplemented`.
    pub async fn cursor(
        &mut self,
        _query: &str,
        _bindings: &[RowValues],
    ) -> Result<ResultSet, LibsqlMiddlewareError> {
        Err(LibsqlMiddlewareError::Unimplemented(
            "streaming cursors are not supported; use select for a buffered result set"
                .to_string(),
        ))
    }

    async fn execute_raw(
        &mut self,
        query: &str,
        bindings: &[RowValues],
    ) -> Result<u64, LibsqlMiddlewareError> {
        let started = Instant::now();
        let params = Params::convert(bindings)?;

        let affected = self
            .conn
            .execute(query, params.into_vec())
            .await
            .map_err(|e| {
                LibsqlMiddlewareError::ExecutionError(format!(
                    "Failed to execute statement: {e} (sql: {query})"
                ))
            })?;

        self.refresh_last_insert_id();
        debug!(
            connection = %self.name,
            sql = query,
            bindings = bindings.len(),
            affected,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "execute"
        );
        Ok(affected)
    }

    /// Execute a statement and return whether it succeeded.
    ///
    /// Marks the connection's records-modified flag unconditionally.
    ///
    /// # Errors
    ///
    /// Returns `ParameterError` or `ExecutionError` as for
    /// [`select`](Self::select).
    pub async fn statement(
        &mut self,
        query: &str,
        bindings: &[RowValues],
    ) -> Result<bool, LibsqlMiddlewareError> {
        if self.pretending {
            self.log_pretended(query, bindings);
            return Ok(true);
        }

        self.execute_raw(query, bindings).await?;
        self.records_have_been_modified(true);
        Ok(true)
    }

    /// Execute a statement and return the number of rows affected.
    ///
    /// Marks the records-modified flag only when the count is above zero.
    ///
    /// # Errors
    ///
    /// Returns `ParameterError` or `ExecutionError` as for
    /// [`select`](Self::select).
    pub async fn affecting_statement(
        &mut self,
        query: &str,
        bindings: &[RowValues],
    ) -> Result<u64, LibsqlMiddlewareError> {
        if self.pretending {
            self.log_pretended(query, bindings);
            return Ok(0);
        }

        let affected = self.execute_raw(query, bindings).await?;
        self.records_have_been_modified(affected > 0);
        Ok(affected)
    }

    /// Run a raw, binding-free statement; returns whether rows changed.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError` when the engine rejects or fails the
    /// statement.
    pub async fn unprepared(&mut self, query: &str) -> Result<bool, LibsqlMiddlewareError> {
        if self.pretending {
            self.log_pretended(query, &[]);
            return Ok(true);
        }

        let changed = self.execute_raw(query, &[]).await? > 0;
        self.records_have_been_modified(changed);
        Ok(changed)
    }

    /// Execute a batch of SQL statements in one driver call.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError` when any statement in the batch fails.
    pub async fn execute_batch(&mut self, query: &str) -> Result<(), LibsqlMiddlewareError> {
        if self.pretending {
            self.log_pretended(query, &[]);
            return Ok(());
        }

        let _ = self.conn.execute_batch(query).await.map_err(|e| {
            LibsqlMiddlewareError::ExecutionError(format!("Failed to execute batch: {e}"))
        })?;

        self.refresh_last_insert_id();
        self.records_have_been_modified(true);
        Ok(())
    }

    /// Run an insert statement.
    ///
    /// # Errors
    ///
    /// See [`statement`](Self::statement).
    pub async fn insert(
        &mut self,
        query: &str,
        bindings: &[RowValues],
    ) -> Result<bool, LibsqlMiddlewareError> {
        self.statement(query, bindings).await
    }

    /// Run an update statement and return the affected row count.
    ///
    /// # Errors
    ///
    /// See [`affecting_statement`](Self::affecting_statement).
    pub async fn update(
        &mut self,
        query: &str,
        bindings: &[RowValues],
    ) -> Result<u64, LibsqlMiddlewareError> {
        self.affecting_statement(query, bindings).await
    }

    /// Run a delete statement and return the affected row count.
    ///
    /// # Errors
    ///
    /// See [`affecting_statement`](Self::affecting_statement).
    pub async fn delete(
        &mut self,
        query: &str,
        bindings: &[RowValues],
    ) -> Result<u64, LibsqlMiddlewareError> {
        self.affecting_statement(query, bindings).await
    }

    /// Identifier the database assigned to the most recently inserted row
    #[must_use]
    pub fn last_insert_id(&self) -> Option<&str> {
        self.last_insert_id.as_deref()
    }

    /// Prepare a statement for repeated execution on this connection.
    ///
    /// This is a logical prepared form that stores the SQL string; execution
    /// uses the connection within whatever transaction scope is active.
    ///
    /// # Errors
    ///
    /// Never fails today; preparation is deferred to execution.
    pub fn prepare(&self, sql: &str) -> Result<Prepared, LibsqlMiddlewareError> {
        Ok(Prepared {
            sql: sql.to_owned(),
        })
    }

    /// Execute a prepared DML and return the affected row count.
    ///
    /// # Errors
    ///
    /// See [`affecting_statement`](Self::affecting_statement).
    pub async fn execute_prepared(
        &mut self,
        prepared: &Prepared,
        bindings: &[RowValues],
    ) -> Result<u64, LibsqlMiddlewareError> {
        self.affecting_statement(&prepared.sql, bindings).await
    }

    /// Execute a prepared SELECT and return the materialized rows.
    ///
    /// # Errors
    ///
    /// See [`select`](Self::select).
    pub async fn query_prepared(
        &mut self,
        prepared: &Prepared,
        bindings: &[RowValues],
    ) -> Result<ResultSet, LibsqlMiddlewareError> {
        self.select(&prepared.sql, bindings).await
    }
}

/// Prepared statement handle for a [`LibsqlConnection`]
pub struct Prepared {
    sql: String,
}

impl Prepared {
    /// Access the raw SQL string of the prepared statement
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

#[async_trait]
impl DatabaseConnection for LibsqlConnection {
    async fn select(
        &mut self,
        query: &str,
        bindings: &[RowValues],
    ) -> Result<ResultSet, LibsqlMiddlewareError> {
        LibsqlConnection::select(self, query, bindings).await
    }

    async fn statement(
        &mut self,
        query: &str,
        bindings: &[RowValues],
    ) -> Result<bool, LibsqlMiddlewareError> {
        LibsqlConnection::statement(self, query, bindings).await
    }

    async fn affecting_statement(
        &mut self,
        query: &str,
        bindings: &[RowValues],
    ) -> Result<u64, LibsqlMiddlewareError> {
        LibsqlConnection::affecting_statement(self, query, bindings).await
    }

    async fn unprepared(&mut self, query: &str) -> Result<bool, LibsqlMiddlewareError> {
        LibsqlConnection::unprepared(self, query).await
    }

    async fn begin_transaction(&mut self) -> Result<(), LibsqlMiddlewareError> {
        LibsqlConnection::begin_transaction(self).await
    }

    async fn commit(&mut self) -> Result<(), LibsqlMiddlewareError> {
        LibsqlConnection::commit(self).await
    }

    async fn rollback(&mut self, to_level: Option<usize>) -> Result<(), LibsqlMiddlewareError> {
        LibsqlConnection::rollback(self, to_level).await
    }

    fn last_insert_id(&self) -> Option<&str> {
        LibsqlConnection::last_insert_id(self)
    }
}
