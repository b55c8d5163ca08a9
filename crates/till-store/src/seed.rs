//! # Demo Data Seeding
//!
//! Fills an empty store with a small, deterministic catalog so the till is
//! usable on first launch.
//!
//! ```text
//! seed_demo_data(db, options)
//!      │
//!      ▼
//! INITIALIZED set? ──yes──► skip (SeedReport::skipped)
//!      │ no
//!      ▼
//! one write unit:
//!   INITIALIZED set now? ──yes──► skip (another seeder won)
//!   categories ─► brands ─► products (codes {CAT}-{NNN}) ─► customers
//!   ─► settings ─► admin user (only with a password) ─► INITIALIZED
//!      │
//!      ▼
//! COMMIT (all or nothing)
//! ```
//!
//! Product data is derived from the product index, so two seeded stores
//! hold the same catalog.

use serde_json::Value;
use std::env;
use tracing::info;

use till_core::{Money, NewCatalogEntry, NewCustomer, NewProduct, NewUser, Role};

use crate::document::{record_id, to_record, Collection, Record, StoreTx};
use crate::error::{ServiceResult, StoreError};
use crate::pool::Database;
use crate::repository::user::create_in;

/// Environment variable holding the admin password to seed.
pub const ENV_ADMIN_PASSWORD: &str = "TILL_ADMIN_PASSWORD";

/// Login seeded for the admin account.
pub const ADMIN_EMAIL: &str = "admin@till.local";

/// Categories: (code, name, products).
const CATEGORIES: &[(&str, &str, &[&str])] = &[
    (
        "BEV",
        "Beverages",
        &[
            "Cola", "Lemon Soda", "Sparkling Water", "Orange Juice", "Apple Juice",
            "Iced Tea", "Cold Brew", "Energy Drink",
        ],
    ),
    (
        "SNK",
        "Snacks",
        &[
            "Salted Chips", "Pretzels", "Chocolate Bar", "Gummy Bears", "Trail Mix",
            "Popcorn", "Oat Cookies", "Rice Crackers",
        ],
    ),
    (
        "DRY",
        "Dairy",
        &[
            "Whole Milk", "Oat Milk", "Cheddar", "Mozzarella", "Greek Yogurt", "Butter",
            "Cream Cheese", "Eggs Dozen",
        ],
    ),
    (
        "FRZ",
        "Frozen",
        &[
            "Vanilla Ice Cream", "Frozen Pizza", "Fish Sticks", "Frozen Peas",
            "Waffles", "Sorbet", "Veggie Burgers", "Berry Mix",
        ],
    ),
    (
        "GRO",
        "Grocery",
        &[
            "Spaghetti", "Basmati Rice", "Canned Tomatoes", "Peanut Butter", "Honey",
            "Rolled Oats", "Flour", "Olive Oil",
        ],
    ),
];

const BRANDS: &[&str] = &["Acme", "Northfield", "Green Valley", "Harbor & Co"];

/// Customers: (name, email, phone).
const CUSTOMERS: &[(&str, &str, &str)] = &[
    ("Walk-in Regular", "", ""),
    ("Ana Torres", "ana.torres@example.com", "555-0101"),
    ("Ben Okafor", "ben.okafor@example.com", "555-0102"),
    ("Chen Wei", "", "555-0103"),
];

const SETTINGS: &[(&str, &str)] = &[
    ("store_name", "Till Demo Store"),
    ("currency", "USD"),
    ("default_tax_rate", "0"),
];

/// What to seed.
#[derive(Debug, Clone)]
pub struct SeedOptions {
    /// Number of products to create (capped at the size of the catalog).
    pub product_count: usize,
    /// Password for the admin account. No admin is created without one.
    pub admin_password: Option<String>,
}

impl Default for SeedOptions {
    fn default() -> Self {
        SeedOptions {
            product_count: 24,
            admin_password: None,
        }
    }
}

impl SeedOptions {
    /// Defaults, with the admin password read from `TILL_ADMIN_PASSWORD`.
    pub fn from_env() -> Self {
        SeedOptions {
            admin_password: env::var(ENV_ADMIN_PASSWORD).ok().filter(|p| !p.is_empty()),
            ..Default::default()
        }
    }

    pub fn product_count(mut self, count: usize) -> Self {
        self.product_count = count;
        self
    }

    pub fn admin_password(mut self, password: impl Into<String>) -> Self {
        self.admin_password = Some(password.into());
        self
    }
}

/// What a seeding run wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// The store was already initialized; nothing was written.
    pub skipped: bool,
    pub categories: usize,
    pub brands: usize,
    pub products: usize,
    pub customers: usize,
    pub admin_created: bool,
}

impl SeedReport {
    fn skipped() -> Self {
        SeedReport {
            skipped: true,
            ..Default::default()
        }
    }
}

/// Seeds demo data once. A store that is already initialized is left alone.
pub async fn seed_demo_data(db: &Database, options: &SeedOptions) -> ServiceResult<SeedReport> {
    let store = db.documents();
    if store.is_initialized().await {
        info!("Store already initialized, skipping seed");
        return Ok(SeedReport::skipped());
    }

    let mut tx = store.begin().await?;
    if tx.is_initialized().await? {
        info!("Store initialized by a concurrent seed, skipping");
        return Ok(SeedReport::skipped());
    }

    let mut report = SeedReport::default();

    let mut category_ids = Vec::with_capacity(CATEGORIES.len());
    for (_, name, _) in CATEGORIES {
        let fields = to_record(Collection::Categories, &NewCatalogEntry::new(*name))?;
        category_ids.push(insert_seed(&mut tx, Collection::Categories, fields).await?);
    }
    report.categories = category_ids.len();

    let mut brand_ids = Vec::with_capacity(BRANDS.len());
    for name in BRANDS {
        let fields = to_record(Collection::Brands, &NewCatalogEntry::new(*name))?;
        brand_ids.push(insert_seed(&mut tx, Collection::Brands, fields).await?);
    }
    report.brands = brand_ids.len();

    let catalog = CATEGORIES
        .iter()
        .zip(&category_ids)
        .flat_map(|((code, _, names), category_id)| {
            names.iter().map(move |name| (*code, *name, *category_id))
        })
        .take(options.product_count);

    for (index, (code, name, category_id)) in catalog.enumerate() {
        let product = demo_product(index, code, name)
            .with_category(category_id)
            .with_brand(brand_ids[index % brand_ids.len()]);

        let mut fields = to_record(Collection::Products, &product)?;
        fields.insert("is_active".to_string(), Value::from(1));
        insert_seed(&mut tx, Collection::Products, fields).await?;
        report.products += 1;
    }

    for (name, email, phone) in CUSTOMERS {
        let mut customer = NewCustomer::new(*name);
        if !email.is_empty() {
            customer = customer.with_email(*email);
        }
        if !phone.is_empty() {
            customer = customer.with_phone(*phone);
        }
        let fields = to_record(Collection::Customers, &customer)?;
        insert_seed(&mut tx, Collection::Customers, fields).await?;
        report.customers += 1;
    }

    for (key, value) in SETTINGS {
        let mut fields = Record::new();
        fields.insert("key".to_string(), Value::from(*key));
        fields.insert("value".to_string(), Value::from(*value));
        insert_seed(&mut tx, Collection::Settings, fields).await?;
    }

    if let Some(password) = &options.admin_password {
        create_in(
            &mut tx,
            NewUser {
                name: "Administrator".to_string(),
                email: ADMIN_EMAIL.to_string(),
                password: password.clone(),
                role: Role::Admin,
            },
        )
        .await?;
        report.admin_created = true;
    }

    tx.mark_initialized();
    tx.commit().await?;

    info!(
        categories = report.categories,
        brands = report.brands,
        products = report.products,
        customers = report.customers,
        admin = report.admin_created,
        "Demo data seeded"
    );
    Ok(report)
}

async fn insert_seed(tx: &mut StoreTx, collection: Collection, fields: Record) -> ServiceResult<i64> {
    let record = tx.insert(collection, fields).await?;
    let id = record_id(&record)
        .ok_or_else(|| StoreError::Internal(format!("seeded {} record has no id", collection)))?;
    Ok(id)
}

/// Deterministic product data for the `index`-th seeded product.
fn demo_product(index: usize, category_code: &str, name: &str) -> NewProduct {
    let seed = index as i64 + 1;

    // $1.99 - $9.98
    let price = Money::from_cents(199 + (seed * 17) % 800);
    // 60-79% of price
    let cost = Money::from_cents(price.cents() * (60 + seed % 20) / 100);
    let stock = 2 + (seed * 13) % 80;

    let mut product = NewProduct::new(name, format!("{}-{:03}", category_code, seed), price)
        .with_stock(stock, 10)
        .with_barcode(format!("590{:010}", seed));
    product.cost = cost;
    product
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;
    use till_core::ProductFilter;

    #[tokio::test]
    async fn test_seed_writes_catalog_once() {
        let db = test_db().await;

        let first = seed_demo_data(&db, &SeedOptions::default()).await.unwrap();
        assert!(!first.skipped);
        assert_eq!(first.categories, 5);
        assert_eq!(first.brands, 4);
        assert_eq!(first.products, 24);
        assert_eq!(first.customers, 4);
        assert!(!first.admin_created);
        assert!(db.documents().is_initialized().await);
        assert!(db.users().list().await.is_empty());

        let second = seed_demo_data(&db, &SeedOptions::default()).await.unwrap();
        assert!(second.skipped);

        let products = db.products().list(&ProductFilter::page(1, 100)).await.unwrap();
        assert_eq!(products.meta.total, 24);
        assert!(products
            .data
            .iter()
            .all(|v| v.category.is_some() && v.brand.is_some()));
        assert_eq!(db.settings().get("currency").await.as_deref(), Some("USD"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_seeds_write_catalog_once() {
        let db = test_db().await;
        let options = SeedOptions::default();

        let (a, b) = tokio::join!(seed_demo_data(&db, &options), seed_demo_data(&db, &options));
        let reports = [a.unwrap(), b.unwrap()];

        assert_eq!(reports.iter().filter(|r| !r.skipped).count(), 1);
        assert_eq!(db.documents().get_collection(Collection::Products).await.len(), 24);
        assert_eq!(db.documents().get_collection(Collection::Categories).await.len(), 5);
        assert_eq!(db.documents().get_collection(Collection::Customers).await.len(), 4);
    }

    #[tokio::test]
    async fn test_write_unit_sees_initialized_flag() {
        let db = test_db().await;
        let store = db.documents();

        let mut tx = store.begin().await.unwrap();
        assert!(!tx.is_initialized().await.unwrap());
        tx.mark_initialized();
        assert!(tx.is_initialized().await.unwrap());
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert!(tx.is_initialized().await.unwrap());
        drop(tx);

        let report = seed_demo_data(&db, &SeedOptions::default()).await.unwrap();
        assert!(report.skipped);
        assert!(store.get_collection(Collection::Products).await.is_empty());
    }

    #[tokio::test]
    async fn test_product_count_is_capped_by_catalog() {
        let db = test_db().await;
        let report = seed_demo_data(&db, &SeedOptions::default().product_count(1000))
            .await
            .unwrap();
        assert_eq!(report.products, 40);
    }

    #[tokio::test]
    async fn test_admin_seeded_only_with_password() {
        let db = test_db().await;
        let report = seed_demo_data(
            &db,
            &SeedOptions::default()
                .product_count(3)
                .admin_password("change-me-now"),
        )
        .await
        .unwrap();

        assert!(report.admin_created);
        let admin = db.users().authenticate(ADMIN_EMAIL, "change-me-now").await;
        assert_eq!(admin.map(|u| u.role), Some(Role::Admin));
    }

    #[tokio::test]
    async fn test_failed_seed_writes_nothing() {
        let db = test_db().await;
        let err = seed_demo_data(&db, &SeedOptions::default().admin_password("short"))
            .await
            .unwrap_err();
        assert!(err.is_validation());

        assert!(!db.documents().is_initialized().await);
        assert!(db.categories().list().await.is_empty());
        assert!(db
            .products()
            .list(&ProductFilter::default())
            .await
            .unwrap()
            .data
            .is_empty());
    }

    #[test]
    fn test_demo_products_are_deterministic_and_valid() {
        let a = demo_product(4, "SNK", "Popcorn");
        let b = demo_product(4, "SNK", "Popcorn");
        assert_eq!(a.code, "SNK-005");
        assert_eq!(a.price, b.price);
        assert_eq!(a.stock_quantity, b.stock_quantity);
        assert!(a.cost < a.price);
        assert!(a.stock_quantity >= 2);
        assert!(till_core::validation::validate_code(&a.code).is_ok());
    }
}
