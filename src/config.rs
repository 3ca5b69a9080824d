use deadpool_libsql::{Manager, Pool};
use serde::Deserialize;
use tracing::debug;

use crate::connection::LibsqlConnection;
use crate::error::LibsqlMiddlewareError;
use crate::types::FetchMode;

const REMOTE_SCHEMES: [&str; 5] = ["libsql://", "https://", "wss://", "http://", "ws://"];
const PLAINTEXT_SCHEMES: [&str; 2] = ["http://", "ws://"];

fn default_secure() -> bool {
    true
}

fn default_name() -> String {
    "libsql".to_string()
}

/// Connection options for a libsql database.
///
/// Deserializes from the adapter-facing config surface: `libsql_url`
/// (endpoint), `token` (credential), `secure` (defaults to true when
/// absent). The endpoint is either a remote URL (`libsql://`, `https://`,
/// `wss://`, and their plaintext counterparts) or a local file path /
/// `:memory:`.
#[derive(Debug, Clone, Deserialize)]
pub struct LibsqlOptions {
    /// Endpoint URL or local path
    #[serde(alias = "libsql_url")]
    pub url: String,
    /// Credential for remote endpoints
    #[serde(default, alias = "token")]
    pub auth_token: Option<String>,
    /// Refuse plaintext transport to remote endpoints
    #[serde(default = "default_secure")]
    pub secure: bool,
    /// Connection name reported to observers
    #[serde(default = "default_name")]
    pub name: String,
    /// Connection-wide default row shape
    #[serde(default)]
    pub fetch_mode: FetchMode,
}

impl LibsqlOptions {
    /// Start building options for the given endpoint
    #[must_use]
    pub fn builder(url: impl Into<String>) -> LibsqlOptionsBuilder {
        LibsqlOptionsBuilder {
            url: url.into(),
            auth_token: None,
            secure: default_secure(),
            name: default_name(),
            fetch_mode: FetchMode::default(),
        }
    }

    fn is_remote(&self) -> bool {
        REMOTE_SCHEMES
            .iter()
            .any(|scheme| self.url.starts_with(scheme))
    }

    fn check_secure_transport(&self) -> Result<(), LibsqlMiddlewareError> {
        if self.secure
            && PLAINTEXT_SCHEMES
                .iter()
                .any(|scheme| self.url.starts_with(scheme))
        {
            return Err(LibsqlMiddlewareError::ConfigError(format!(
                "secure transport required but endpoint uses a plaintext scheme: {}",
                self.url
            )));
        }
        Ok(())
    }
}

/// Builder for [`LibsqlOptions`]
#[derive(Debug, Clone)]
pub struct LibsqlOptionsBuilder {
    url: String,
    auth_token: Option<String>,
    secure: bool,
    name: String,
    fetch_mode: FetchMode,
}

impl LibsqlOptionsBuilder {
    #[must_use]
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn fetch_mode(mut self, fetch_mode: FetchMode) -> Self {
        self.fetch_mode = fetch_mode;
        self
    }

    /// Finish building the options without opening anything
    #[must_use]
    pub fn options(self) -> LibsqlOptions {
        LibsqlOptions {
            url: self.url,
            auth_token: self.auth_token,
            secure: self.secure,
            name: self.name,
            fetch_mode: self.fetch_mode,
        }
    }

    /// Build the pool for these options
    ///
    /// # Errors
    ///
    /// Returns `LibsqlMiddlewareError` when the database or pool cannot be
    /// created; see [`ConfigAndPool::new_libsql`].
    pub async fn build(self) -> Result<ConfigAndPool, LibsqlMiddlewareError> {
        ConfigAndPool::new_libsql(self.options()).await
    }
}

/// Configuration and connection pool for a libsql database
///
/// Holds the pool plus the connection-wide defaults every checked-out
/// connection inherits.
#[derive(Clone, Debug)]
pub struct ConfigAndPool {
    pool: Pool,
    name: String,
    fetch_mode: FetchMode,
}

impl ConfigAndPool {
    /// Start building a pool for the given endpoint
    #[must_use]
    pub fn libsql_builder(url: impl Into<String>) -> LibsqlOptionsBuilder {
        LibsqlOptions::builder(url)
    }

    /// Asynchronous initializer for `ConfigAndPool` using `deadpool_libsql`
    ///
    /// Local endpoints open a file (or `:memory:`) via the embedded engine;
    /// remote endpoints perform the handshake against the server. Either
    /// failure surfaces immediately as `ConnectionError`; there is no
    /// silent retry.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when secure transport is required but the
    /// endpoint is plaintext, `ConnectionError` when the database, pool, or
    /// initial checkout fails.
    pub async fn new_libsql(options: LibsqlOptions) -> Result<Self, LibsqlMiddlewareError> {
        let remote = options.is_remote();

        let db = if remote {
            options.check_secure_transport()?;
            deadpool_libsql::libsql::Builder::new_remote(
                options.url.clone(),
                options.auth_token.clone().unwrap_or_default(),
            )
            .build()
            .await
            .map_err(|e| {
                LibsqlMiddlewareError::ConnectionError(format!(
                    "Failed to create remote libsql database: {e}"
                ))
            })?
        } else {
            deadpool_libsql::libsql::Builder::new_local(options.url.clone())
                .build()
                .await
                .map_err(|e| {
                    LibsqlMiddlewareError::ConnectionError(format!(
                        "Failed to create libsql database: {e}"
                    ))
                })?
        };

        let manager = Manager::from_libsql_database(db);

        let pool = Pool::builder(manager).build().map_err(|e| {
            LibsqlMiddlewareError::ConnectionError(format!("Failed to create libsql pool: {e}"))
        })?;

        // Test the connection
        let conn = pool.get().await.map_err(|e| {
            LibsqlMiddlewareError::ConnectionError(format!("Failed to get libsql connection: {e}"))
        })?;

        if !remote {
            // WAL for better concurrency on local files (ignore result for in-memory databases)
            let _ = conn.execute("PRAGMA journal_mode = WAL", ()).await;
        }

        debug!(endpoint = %options.url, remote, name = %options.name, "libsql pool ready");

        Ok(ConfigAndPool {
            pool,
            name: options.name,
            fetch_mode: options.fetch_mode,
        })
    }

    /// Check a connection out of the pool
    ///
    /// # Errors
    ///
    /// Returns `LibsqlMiddlewareError::PoolError` if the pool fails to
    /// provide a connection.
    pub async fn get_connection(&self) -> Result<LibsqlConnection, LibsqlMiddlewareError> {
        let conn = self.pool.get().await?;
        Ok(LibsqlConnection::new(
            conn,
            self.name.clone(),
            self.fetch_mode,
        ))
    }

    /// Connection name the pool stamps onto checked-out connections
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}
