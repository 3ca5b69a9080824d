use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibsqlMiddlewareError {
    #[error(transparent)]
    LibsqlError(#[from] deadpool_libsql::libsql::Error),

    #[error(transparent)]
    PoolError(#[from] deadpool::managed::PoolError<deadpool_libsql::ConnectionError>),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Transaction error: {0}")]
    TransactionError(String),

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),

    #[error("Other database error: {0}")]
    Other(String),
}
