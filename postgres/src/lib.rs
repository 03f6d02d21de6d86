//! `PostgreSQL` store for the boxoffice booking service.
//!
//! [`PgStore`] implements every relational contract from `boxoffice-core`:
//!
//! - [`RelationalStore`](boxoffice_core::store::RelationalStore): booking transactions
//!   that lock the event row with `SELECT ... FOR UPDATE`
//! - [`UserRepository`](boxoffice_core::store::UserRepository)
//! - [`EventRepository`](boxoffice_core::store::EventRepository)
//! - [`NotificationLogStore`](boxoffice_core::store::NotificationLogStore)
//!
//! Queries are checked at runtime (`sqlx::query`), so building the crate does
//! not need a live database.
//!
//! # Example
//!
//! ```ignore
//! use boxoffice_postgres::{PgStore, PgStoreOptions};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PgStore::connect("postgres://localhost/boxoffice", &PgStoreOptions::default()).await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod events;
mod notifications;
mod transaction;
mod users;

pub use transaction::PgBookingTransaction;

use boxoffice_core::store::StoreError;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// Connection pool settings.
#[derive(Debug, Clone)]
pub struct PgStoreOptions {
    /// Upper bound on pooled connections
    pub max_connections: u32,
    /// Connections kept open when idle
    pub min_connections: u32,
    /// How long to wait for a connection before failing
    pub connect_timeout: Duration,
    /// Server-side `statement_timeout` for every connection
    pub statement_timeout: Duration,
}

impl Default for PgStoreOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 2,
            connect_timeout: Duration::from_secs(30),
            statement_timeout: Duration::from_secs(30),
        }
    }
}

/// `PostgreSQL`-backed store.
///
/// Cloning shares the underlying pool.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect a new pool.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the URL is invalid or the
    /// database cannot be reached within `connect_timeout`.
    pub async fn connect(database_url: &str, options: &PgStoreOptions) -> Result<Self, StoreError> {
        let statement_timeout = format!("{}ms", options.statement_timeout.as_millis());
        let connect_options = PgConnectOptions::from_str(database_url)
            .map_err(|e| StoreError::Unavailable(format!("Invalid database URL: {e}")))?
            .options([("statement_timeout", statement_timeout.as_str())]);

        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .min_connections(options.min_connections)
            .acquire_timeout(options.connect_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to connect: {e}")))?;

        tracing::info!(
            max_connections = options.max_connections,
            min_connections = options.min_connections,
            "PostgreSQL pool connected"
        );

        Ok(Self { pool })
    }

    /// Apply the schema migrations shipped with this crate.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
        tracing::info!("Database migrations complete");
        Ok(())
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close every pooled connection. Waits for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Map a sqlx error onto the store error taxonomy.
pub(crate) fn store_error(err: sqlx::Error) -> StoreError {
    let mapped = match &err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(err.to_string())
        }
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::UniqueViolation(db.message().to_string())
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Decode(err.to_string())
        }
        _ => StoreError::Database(err.to_string()),
    };

    let kind = match &mapped {
        StoreError::Unavailable(_) => "unavailable",
        StoreError::Database(_) => "database",
        StoreError::UniqueViolation(_) => "unique_violation",
        StoreError::Decode(_) => "decode",
    };
    metrics::counter!("store_errors_total", "kind" => kind).increment(1);

    mapped
}
