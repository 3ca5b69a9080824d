use crate::error::LibsqlMiddlewareError;

/// Retry/abort decision for the managed transaction loop.
///
/// The loop hands each failure to the policy as a typed error value; the
/// policy inspects the error kind and the attempt count and answers whether
/// to run another attempt. Exhausted attempts always re-raise the original
/// error regardless of the answer.
pub trait TransactionRetryPolicy: Send + Sync {
    /// Decide whether the work closure's failure warrants another attempt.
    fn should_retry(
        &self,
        error: &LibsqlMiddlewareError,
        attempt: usize,
        max_attempts: usize,
    ) -> bool;

    /// Decide whether a commit failure warrants another attempt.
    ///
    /// Defaults to the same answer as [`should_retry`](Self::should_retry).
    fn should_retry_commit(
        &self,
        error: &LibsqlMiddlewareError,
        attempt: usize,
        max_attempts: usize,
    ) -> bool {
        self.should_retry(error, attempt, max_attempts)
    }
}

/// Default policy: retry only contention errors, up to the attempt budget.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcurrencyRetryPolicy;

impl TransactionRetryPolicy for ConcurrencyRetryPolicy {
    fn should_retry(
        &self,
        error: &LibsqlMiddlewareError,
        attempt: usize,
        max_attempts: usize,
    ) -> bool {
        attempt < max_attempts && caused_by_concurrency_error(error)
    }
}

/// Classify an error as lock/busy contention.
///
/// The driver does not expose a stable structured code for contention across
/// local and remote transports, so this matches the engine's message text.
#[must_use]
pub fn caused_by_concurrency_error(error: &LibsqlMiddlewareError) -> bool {
    let message = match error {
        LibsqlMiddlewareError::LibsqlError(e) => e.to_string(),
        LibsqlMiddlewareError::ExecutionError(msg)
        | LibsqlMiddlewareError::TransactionError(msg) => msg.clone(),
        _ => return false,
    };
    let message = message.to_ascii_lowercase();

    ["database is locked", "database table is locked", "busy"]
        .iter()
        .any(|needle| message.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_execution_error_is_concurrency() {
        let err = LibsqlMiddlewareError::ExecutionError(
            "Failed to execute DML: database is locked".to_string(),
        );
        assert!(caused_by_concurrency_error(&err));
    }

    #[test]
    fn constraint_violation_is_not_concurrency() {
        let err = LibsqlMiddlewareError::ExecutionError(
            "UNIQUE constraint failed: t.id".to_string(),
        );
        assert!(!caused_by_concurrency_error(&err));
    }

    #[test]
    fn policy_respects_attempt_budget() {
        let locked = LibsqlMiddlewareError::ExecutionError("database is locked".to_string());
        let policy = ConcurrencyRetryPolicy;

        assert!(policy.should_retry(&locked, 1, 3));
        assert!(!policy.should_retry(&locked, 3, 3));
        assert!(policy.should_retry_commit(&locked, 2, 3));
    }

    #[test]
    fn non_retryable_kinds_never_retry() {
        let err = LibsqlMiddlewareError::Unimplemented("cursor".to_string());
        let policy = ConcurrencyRetryPolicy;
        assert!(!policy.should_retry(&err, 1, 5));
    }
}
