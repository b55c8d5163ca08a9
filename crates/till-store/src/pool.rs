//! # Database Handle
//!
//! Connection pool setup for the SQLite substrate and the entry point to
//! every repository.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Handle                                    │
//! │                                                                         │
//! │  App Startup                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreConfig::new(path) / from_env() / in_memory()                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │  DocumentStore                          │                           │
//! │  │  ├── SqlitePool    (readers)            │                           │
//! │  │  ├── writer lock   (one StoreTx at once)│                           │
//! │  │  └── AuditSink                          │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.products() / db.sales() / db.reports() / ...                       │
//! │  (cheap handles sharing the same store)                                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! The file database runs in WAL mode, so readers see either the state
//! before or after a committed write unit and never wait for one.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::audit::{AuditSink, TracingSink};
use crate::document::DocumentStore;
use crate::error::{StoreError, StoreResult};
use crate::migrations;
use crate::repository::catalog::{BrandRepository, CategoryRepository};
use crate::repository::customer::CustomerRepository;
use crate::repository::product::ProductRepository;
use crate::repository::report::ReportRepository;
use crate::repository::sale::{SaleService, SaleServiceConfig};
use crate::repository::settings::SettingsRepository;
use crate::repository::user::UserRepository;

/// Environment variable naming the database file.
pub const ENV_DB_PATH: &str = "TILL_DB_PATH";

/// Environment variable overriding the pool size.
pub const ENV_MAX_CONNECTIONS: &str = "TILL_MAX_CONNECTIONS";

const DEFAULT_DB_PATH: &str = "till.db";

// =============================================================================
// Configuration
// =============================================================================

/// Store configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = StoreConfig::new("/path/to/till.db")
///     .max_connections(5)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the SQLite database file. Ignored for in-memory stores.
    pub database_path: PathBuf,

    /// Keep everything in memory (tests, demos).
    pub in_memory: bool,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// How long to wait for a free connection.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection. `None` keeps connections.
    /// Default: 10 minutes
    pub idle_timeout: Option<Duration>,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl StoreConfig {
    /// Creates a configuration for a database file (created if missing).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            database_path: path.into(),
            in_memory: false,
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            run_migrations: true,
        }
    }

    /// Creates an in-memory configuration (for testing).
    ///
    /// An in-memory database lives exactly as long as its connection, so the
    /// pool holds a single connection that never expires.
    pub fn in_memory() -> Self {
        StoreConfig {
            database_path: PathBuf::from(":memory:"),
            in_memory: true,
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None,
            run_migrations: true,
        }
    }

    /// Reads `TILL_DB_PATH` and `TILL_MAX_CONNECTIONS`, falling back to
    /// defaults for anything missing or unparsable.
    pub fn from_env() -> Self {
        let path = std::env::var(ENV_DB_PATH).unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
        let mut config = StoreConfig::new(path);

        if let Ok(raw) = std::env::var(ENV_MAX_CONNECTIONS) {
            match raw.parse::<u32>() {
                Ok(max) if max > 0 => config.max_connections = max,
                _ => warn!(value = %raw, "Ignoring invalid {}", ENV_MAX_CONNECTIONS),
            }
        }

        config
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn connect_options(&self) -> StoreResult<SqliteConnectOptions> {
        let options = if self.in_memory {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| StoreError::Connection(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        };

        // NORMAL synchronous: a crash may lose the last commit, never corrupt
        Ok(options.synchronous(SqliteSynchronous::Normal))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main handle: owns the pool and the document store, hands out
/// repositories.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(StoreConfig::from_env()).await?;
///
/// let page = db.products().list(&ProductFilter::page(1, 20)).await?;
/// let sale = db.sales().create_sale(&request).await?;
/// let stats = db.reports().dashboard_stats().await;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    store: DocumentStore,
}

impl Database {
    /// Opens the pool with the default [`TracingSink`].
    pub async fn new(config: StoreConfig) -> StoreResult<Self> {
        Database::with_sink(config, Arc::new(TracingSink)).await
    }

    /// Opens the pool with a custom audit sink.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite (WAL, NORMAL synchronous)
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn with_sink(config: StoreConfig, sink: Arc<dyn AuditSink>) -> StoreResult<Self> {
        info!(
            path = %config.database_path.display(),
            in_memory = config.in_memory,
            "Initializing store"
        );

        let connect_options = config.connect_options()?;
        debug!("Connection options configured");

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout);
        if config.in_memory {
            pool_options = pool_options.max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        info!(max_connections = config.max_connections, "Store pool created");

        let db = Database {
            store: DocumentStore::new(pool.clone(), sink),
            pool,
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies pending migrations. Idempotent.
    pub async fn run_migrations(&self) -> StoreResult<()> {
        info!("Running store migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// The underlying pool. Prefer the document store and repositories.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Raw collection access.
    pub fn documents(&self) -> DocumentStore {
        self.store.clone()
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.store.clone())
    }

    pub fn categories(&self) -> CategoryRepository {
        CategoryRepository::new(self.store.clone())
    }

    pub fn brands(&self) -> BrandRepository {
        BrandRepository::new(self.store.clone())
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.store.clone())
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.store.clone())
    }

    pub fn settings(&self) -> SettingsRepository {
        SettingsRepository::new(self.store.clone())
    }

    /// Sale service with the default configuration (totals verified).
    pub fn sales(&self) -> SaleService {
        SaleService::new(self.store.clone(), SaleServiceConfig::default())
    }

    pub fn sales_with(&self, config: SaleServiceConfig) -> SaleService {
        SaleService::new(self.store.clone(), config)
    }

    pub fn reports(&self) -> ReportRepository {
        ReportRepository::new(self.store.clone())
    }

    /// Closes the pool. Every later operation fails (writes) or reads empty.
    pub async fn close(&self) {
        info!("Closing store pool");
        self.pool.close().await;
    }

    /// Whether the database answers queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
