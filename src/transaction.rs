//! Nested transaction control for [`LibsqlConnection`].
//!
//! The engine natively supports a single top-level transaction; nesting is
//! layered on it with named savepoints. Level 1 is the real transaction,
//! level `n > 1` is the savepoint `trans{n}`.

use futures_util::future::BoxFuture;
use tracing::warn;

use crate::connection::LibsqlConnection;
use crate::error::LibsqlMiddlewareError;
use crate::events::ConnectionEvent;
use crate::retry::{ConcurrencyRetryPolicy, TransactionRetryPolicy};

fn savepoint_name(level: usize) -> String {
    format!("trans{level}")
}

fn compile_savepoint(name: &str) -> String {
    format!("SAVEPOINT {name}")
}

fn compile_savepoint_release(name: &str) -> String {
    format!("RELEASE SAVEPOINT {name}")
}

fn compile_savepoint_rollback(name: &str) -> String {
    format!("ROLLBACK TO SAVEPOINT {name}")
}

impl LibsqlConnection {
    /// Open a transaction, or a savepoint when one is already open.
    ///
    /// Level 0 issues a real `BEGIN`; level `L >= 1` issues
    /// `SAVEPOINT trans{L+1}`. The nesting level is incremented only after
    /// the engine accepted the statement.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError` when the engine rejects the BEGIN or
    /// savepoint statement.
    pub async fn begin_transaction(&mut self) -> Result<(), LibsqlMiddlewareError> {
        if self.transactions == 0 {
            let _ = self.conn.execute_batch("BEGIN").await.map_err(|e| {
                LibsqlMiddlewareError::ExecutionError(format!("Failed to begin transaction: {e}"))
            })?;
        } else {
            let sql = compile_savepoint(&savepoint_name(self.transactions + 1));
            self.conn.execute(&sql, ()).await.map_err(|e| {
                LibsqlMiddlewareError::ExecutionError(format!("Failed to create savepoint: {e}"))
            })?;
        }

        self.transactions += 1;
        let level = self.transactions;
        self.notify_manager(|manager| manager.on_begin(&self.name, level));
        Ok(())
    }

    /// Commit the current nesting level.
    ///
    /// At level 1 this fires the `Committing` event and commits the real
    /// transaction; at deeper levels it releases the savepoint for the
    /// level being closed. The `Committed` event fires unconditionally
    /// after the level drops, and the optional transaction manager is told
    /// about the transition best-effort.
    ///
    /// # Errors
    ///
    /// Returns `TransactionError` when no transaction is active, and
    /// `ExecutionError` when the engine rejects the COMMIT or RELEASE.
    pub async fn commit(&mut self) -> Result<(), LibsqlMiddlewareError> {
        match self.transactions {
            0 => {
                return Err(LibsqlMiddlewareError::TransactionError(
                    "commit with no active transaction".to_string(),
                ));
            }
            1 => {
                self.fire_connection_event(ConnectionEvent::Committing);
                let _ = self.conn.execute_batch("COMMIT").await.map_err(|e| {
                    LibsqlMiddlewareError::ExecutionError(format!(
                        "Failed to commit transaction: {e}"
                    ))
                })?;
            }
            level => {
                let sql = compile_savepoint_release(&savepoint_name(level));
                self.conn.execute(&sql, ()).await.map_err(|e| {
                    LibsqlMiddlewareError::ExecutionError(format!(
                        "Failed to release savepoint: {e}"
                    ))
                })?;
            }
        }

        let committed_level = self.transactions;
        self.transactions -= 1;
        let current_level = self.transactions;

        self.notify_manager(|manager| {
            manager.on_commit(&self.name, committed_level, current_level)
        });
        self.fire_connection_event(ConnectionEvent::Committed);
        Ok(())
    }

    /// Roll back to the given nesting level, one level up when `None`.
    ///
    /// `to_level == 0` rolls back the real transaction regardless of how
    /// deep nesting went; `to_level == k > 0` rolls back to the savepoint
    /// `trans{k+1}`, discarding every level above `k`.
    ///
    /// # Errors
    ///
    /// Returns `TransactionError` when no transaction is active or
    /// `to_level` is not below the current level, and `ExecutionError` when
    /// the engine rejects the ROLLBACK.
    pub async fn rollback(
        &mut self,
        to_level: Option<usize>,
    ) -> Result<(), LibsqlMiddlewareError> {
        if self.transactions == 0 {
            return Err(LibsqlMiddlewareError::TransactionError(
                "rollback with no active transaction".to_string(),
            ));
        }

        let to_level = to_level.unwrap_or(self.transactions - 1);
        if to_level >= self.transactions {
            return Err(LibsqlMiddlewareError::TransactionError(format!(
                "cannot roll back to level {to_level} from level {}",
                self.transactions
            )));
        }

        if to_level == 0 {
            let _ = self.conn.execute_batch("ROLLBACK").await.map_err(|e| {
                LibsqlMiddlewareError::ExecutionError(format!(
                    "Failed to rollback transaction: {e}"
                ))
            })?;
        } else {
            let sql = compile_savepoint_rollback(&savepoint_name(to_level + 1));
            self.conn.execute(&sql, ()).await.map_err(|e| {
                LibsqlMiddlewareError::ExecutionError(format!(
                    "Failed to rollback to savepoint: {e}"
                ))
            })?;
        }

        self.transactions = to_level;
        self.notify_manager(|manager| manager.on_rollback(&self.name, to_level));
        Ok(())
    }

    /// Run `work` inside a managed transaction with the default retry
    /// policy.
    ///
    /// Equivalent to [`transaction_with_policy`] with
    /// [`ConcurrencyRetryPolicy`].
    ///
    /// # Errors
    ///
    /// See [`transaction_with_policy`].
    ///
    /// [`transaction_with_policy`]: Self::transaction_with_policy
    pub async fn transaction<R, F>(
        &mut self,
        work: F,
        attempts: usize,
    ) -> Result<R, LibsqlMiddlewareError>
    where
        F: for<'c> FnMut(
            &'c mut LibsqlConnection,
        ) -> BoxFuture<'c, Result<R, LibsqlMiddlewareError>>,
    {
        self.transaction_with_policy(work, attempts, &ConcurrencyRetryPolicy)
            .await
    }

    /// Run `work` inside a managed transaction, retrying per `policy`.
    ///
    /// Begins a transaction, runs `work`, commits on success. A failure
    /// inside `work` rolls the opened level back and consults the policy; a
    /// failure during commit consults the policy's commit-side answer.
    /// Either way, exhausting `attempts` re-raises the error from the final
    /// attempt. Retry decisions are made by inspecting the typed error
    /// value, never by the error reaching the caller.
    ///
    /// # Errors
    ///
    /// Returns `TransactionError` when `attempts` is zero, otherwise the
    /// error from the final failed attempt.
    pub async fn transaction_with_policy<R, F>(
        &mut self,
        mut work: F,
        attempts: usize,
        policy: &dyn TransactionRetryPolicy,
    ) -> Result<R, LibsqlMiddlewareError>
    where
        F: for<'c> FnMut(
            &'c mut LibsqlConnection,
        ) -> BoxFuture<'c, Result<R, LibsqlMiddlewareError>>,
    {
        if attempts == 0 {
            return Err(LibsqlMiddlewareError::TransactionError(
                "a transaction needs at least one attempt".to_string(),
            ));
        }

        for current_attempt in 1..=attempts {
            self.begin_transaction().await?;

            let value = match work(&mut *self).await {
                Ok(value) => value,
                Err(err) => {
                    if let Err(rollback_err) = self.rollback(None).await {
                        warn!(
                            connection = %self.name,
                            error = %rollback_err,
                            "rollback after failed transaction work also failed"
                        );
                    }
                    if policy.should_retry(&err, current_attempt, attempts) {
                        continue;
                    }
                    return Err(err);
                }
            };

            match self.commit().await {
                Ok(()) => return Ok(value),
                Err(err) => {
                    // The engine refused the commit; the level it covered is
                    // gone either way.
                    self.transactions = self.transactions.saturating_sub(1);
                    if policy.should_retry_commit(&err, current_attempt, attempts) {
                        continue;
                    }
                    return Err(err);
                }
            }
        }

        Err(LibsqlMiddlewareError::TransactionError(
            "transaction attempts exhausted".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn savepoint_names_follow_nesting_level() {
        assert_eq!(savepoint_name(2), "trans2");
        assert_eq!(savepoint_name(3), "trans3");
    }

    #[test]
    fn savepoint_grammar() {
        assert_eq!(compile_savepoint("trans2"), "SAVEPOINT trans2");
        assert_eq!(
            compile_savepoint_release("trans2"),
            "RELEASE SAVEPOINT trans2"
        );
        assert_eq!(
            compile_savepoint_rollback("trans3"),
            "ROLLBACK TO SAVEPOINT trans3"
        );
    }

    #[test]
    fn savepoint_names_never_collide_within_a_stack() {
        let names: Vec<String> = (2..=8).map(savepoint_name).collect();
        let mut deduped = names.clone();
        deduped.dedup();
        assert_eq!(names, deduped);
    }
}
