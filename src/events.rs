use std::sync::Arc;

use crate::error::LibsqlMiddlewareError;

/// Lifecycle notification fired around transaction commit.
///
/// Carries no payload; observers receive the connection name alongside the
/// event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// About to commit the real (level 1) transaction
    Committing,
    /// A commit or savepoint release finished and the nesting level dropped
    Committed,
}

/// Observer callback registered on a connection.
pub type EventListener = Arc<dyn Fn(ConnectionEvent, &str) + Send + Sync>;

/// External observer of transaction level transitions.
///
/// Injected as an optional collaborator; every notification is best-effort.
/// A failing manager is logged and never alters the connection's own state
/// or the outcome of the commit/rollback that triggered it.
pub trait TransactionManager: Send + Sync {
    /// A nesting level was opened on `connection`; `level` is the new depth.
    ///
    /// # Errors
    ///
    /// Implementations may fail; the connection logs and discards the error.
    fn on_begin(&self, connection: &str, level: usize) -> Result<(), LibsqlMiddlewareError> {
        let _ = (connection, level);
        Ok(())
    }

    /// A commit happened on `connection`: `committed_level` was closed,
    /// `current_level` is the depth after the decrement.
    ///
    /// # Errors
    ///
    /// Implementations may fail; the connection logs and discards the error.
    fn on_commit(
        &self,
        connection: &str,
        committed_level: usize,
        current_level: usize,
    ) -> Result<(), LibsqlMiddlewareError> {
        let _ = (connection, committed_level, current_level);
        Ok(())
    }

    /// `connection` rolled back to `to_level`.
    ///
    /// # Errors
    ///
    /// Implementations may fail; the connection logs and discards the error.
    fn on_rollback(&self, connection: &str, to_level: usize) -> Result<(), LibsqlMiddlewareError> {
        let _ = (connection, to_level);
        Ok(())
    }
}
