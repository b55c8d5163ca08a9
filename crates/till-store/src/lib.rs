//! # till-store: Document Store and Sale Service for Till
//!
//! Local persistence for the till: named JSON collections on an SQLite
//! key-value table, the repositories built on them, and the sale
//! transaction service that keeps sales and stock consistent.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till Data Flow                                   │
//! │                                                                         │
//! │  Checkout screen (SaleRequest)                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    till-store (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │ SaleService   │    │ Repositories  │    │  Migrations  │   │   │
//! │  │   │ (sale.rs)     │    │ products,     │    │  (embedded)  │   │   │
//! │  │   │ create / get  │───►│ customers, .. │    │ 001_document │   │   │
//! │  │   │ / list        │    │ reports       │    │ _store.sql   │   │   │
//! │  │   └───────┬───────┘    └───────┬───────┘    └──────────────┘   │   │
//! │  │           ▼                    ▼                                │   │
//! │  │   ┌─────────────────────────────────────────┐                  │   │
//! │  │   │ DocumentStore + StoreTx (writer lock)   │──► AuditSink     │   │
//! │  │   └─────────────────────────────────────────┘                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  SQLite: storage(key, value, updated_at)                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Database handle, pool creation and configuration
//! - [`document`] - Collections, queries and write units
//! - [`repository`] - Repositories and the sale service
//! - [`migrations`] - Embedded schema migrations
//! - [`audit`] - Audit sink collaborator
//! - [`seed`] - Demo data
//! - [`error`] - Store and service error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use till_core::{Percent, SaleDraft};
//! use till_store::{Database, StoreConfig};
//!
//! let db = Database::new(StoreConfig::from_env()).await?;
//!
//! let product = db.products().get_by_id(1).await.unwrap();
//! let request = SaleDraft::new()
//!     .line(product.id, 2, product.price)
//!     .tax_rate(Percent::from_percentage(8.5))
//!     .build();
//!
//! let sale = db.sales().create_sale(&request).await?;
//! let stats = db.reports().dashboard_stats().await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod audit;
pub mod document;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod seed;

// =============================================================================
// Re-exports
// =============================================================================

pub use audit::{AuditEvent, AuditSink, NoopSink, TracingSink};
pub use document::{Collection, DocumentStore, Query, Record, SortOrder, StoreTx};
pub use error::{ServiceError, ServiceResult, StoreError, StoreResult};
pub use pool::{Database, StoreConfig};
pub use seed::{seed_demo_data, SeedOptions, SeedReport, ADMIN_EMAIL};

// Repository re-exports for convenience
pub use repository::catalog::{BrandRepository, CategoryRepository};
pub use repository::customer::CustomerRepository;
pub use repository::product::ProductRepository;
pub use repository::report::ReportRepository;
pub use repository::sale::{SaleService, SaleServiceConfig, TotalsPolicy};
pub use repository::settings::SettingsRepository;
pub use repository::user::UserRepository;

#[cfg(test)]
pub(crate) mod test_support {
    //! Shared fixtures for the in-crate tests.

    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    use till_core::{Money, NewProduct, Product};

    use crate::audit::{AuditEvent, AuditSink};
    use crate::document::Record;
    use crate::pool::{Database, StoreConfig};

    pub async fn test_db() -> Database {
        Database::new(StoreConfig::in_memory())
            .await
            .expect("in-memory database")
    }

    pub async fn test_db_with_sink(sink: Arc<RecordingSink>) -> Database {
        Database::with_sink(StoreConfig::in_memory(), sink)
            .await
            .expect("in-memory database")
    }

    /// A record from a JSON object literal.
    pub fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            other => panic!("expected a JSON object, got {}", other),
        }
    }

    pub async fn add_product(
        db: &Database,
        name: &str,
        code: &str,
        price_cents: i64,
        stock: i64,
    ) -> Product {
        db.products()
            .create(NewProduct::new(name, code, Money::from_cents(price_cents)).with_stock(stock, 0))
            .await
            .expect("create product")
    }

    /// Keeps every event it receives.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        events: Mutex<Vec<AuditEvent>>,
    }

    impl RecordingSink {
        pub fn new() -> Arc<Self> {
            Arc::new(RecordingSink::default())
        }

        pub fn events(&self) -> Vec<AuditEvent> {
            self.events.lock().expect("sink lock").clone()
        }
    }

    impl AuditSink for RecordingSink {
        fn record(&self, event: &AuditEvent) {
            self.events.lock().expect("sink lock").push(event.clone());
        }
    }
}
