//! # Product Repository
//!
//! Product read model (filtering, search, pagination, category/brand
//! resolution) and the stock mutation primitives.
//!
//! ## Listing Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  products collection                                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  is_active only ──► search name/code/barcode ──► category / brand       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  sort by name (case-insensitive) ──► page ──► attach category + brand   │
//! │                                                                         │
//! │  12 products, page 2, size 5 ──► items 6..=10, last_page 3              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stock Floor
//! `reduce_stock` never takes stock below zero. A reduction larger than the
//! stock on hand clamps at zero, logs a warning and emits a
//! `stock/reduce_stock_clamped` audit event.

use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use till_core::validation::{
    validate_amount, validate_code, validate_name, validate_search_query, validate_stock_level,
};
use till_core::{
    Brand, Category, CoreError, NewProduct, Paginated, Product, ProductFilter, ProductPatch,
    ProductView, ValidationError,
};

use crate::audit::AuditEvent;
use crate::document::{
    decode_records, from_record, record_id, to_record, Collection, DocumentStore, Query, Record,
    SortOrder, StoreTx,
};
use crate::error::ServiceResult;

const PRODUCTS: Collection = Collection::Products;

/// Repository for products and stock.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let page = repo.list(&ProductFilter::page(1, 20).search("cola")).await?;
/// let remaining = repo.reduce_stock(product_id, 2).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    store: DocumentStore,
}

impl ProductRepository {
    pub fn new(store: DocumentStore) -> Self {
        ProductRepository { store }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Lists active products, filtered, sorted by name and paginated, each
    /// with its category and brand resolved.
    pub async fn list(&self, filter: &ProductFilter) -> ServiceResult<Paginated<ProductView>> {
        let search = validate_search_query(filter.search.as_deref().unwrap_or(""))?;

        let mut query = Query::new()
            .search(search.as_str(), ["name", "code", "barcode"])
            .order_by("name", SortOrder::Asc);
        if let Some(category_id) = filter.category_id {
            query = query.filter("category_id", json!(category_id));
        }
        if let Some(brand_id) = filter.brand_id {
            query = query.filter("brand_id", json!(brand_id));
        }

        let products: Vec<Product> =
            decode_records(PRODUCTS, self.store.query(PRODUCTS, &query).await)
                .into_iter()
                .filter(|product: &Product| product.is_active)
                .collect();

        let categories: HashMap<i64, Category> = self
            .store
            .get_typed::<Category>(Collection::Categories)
            .await
            .into_iter()
            .map(|category| (category.id, category))
            .collect();
        let brands: HashMap<i64, Brand> = self
            .store
            .get_typed::<Brand>(Collection::Brands)
            .await
            .into_iter()
            .map(|brand| (brand.id, brand))
            .collect();

        let page = filter.page.paginate(products).map(|product| {
            let category = product.category_id.and_then(|id| categories.get(&id).cloned());
            let brand = product.brand_id.and_then(|id| brands.get(&id).cloned());
            ProductView {
                product,
                category,
                brand,
            }
        });

        debug!(
            search = %search,
            total = page.meta.total,
            returned = page.data.len(),
            "Listed products"
        );
        Ok(page)
    }

    /// Gets a product by id, including soft-deleted ones.
    pub async fn get_by_id(&self, id: i64) -> Option<Product> {
        let record = self.store.get_by_id(PRODUCTS, id).await?;
        decode_records(PRODUCTS, vec![record]).pop()
    }

    /// Active products at or below their minimum stock.
    pub async fn low_stock(&self) -> Vec<Product> {
        self.store
            .get_typed::<Product>(PRODUCTS)
            .await
            .into_iter()
            .filter(|product| product.is_active && product.is_low_stock())
            .collect()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Creates a product.
    ///
    /// ## Validation
    /// - Name and code well formed
    /// - Price, cost, stock and minimum stock not negative
    /// - No other active product has the same code
    pub async fn create(&self, input: NewProduct) -> ServiceResult<Product> {
        validate_name("name", &input.name)?;
        validate_code(&input.code)?;
        validate_amount("price", input.price)?;
        validate_amount("cost", input.cost)?;
        validate_stock_level(input.stock_quantity)?;
        validate_stock_level(input.min_stock)?;

        let input = NewProduct {
            name: input.name.trim().to_string(),
            code: input.code.trim().to_string(),
            ..input
        };

        let mut tx = self.store.begin().await?;

        if code_taken(tx.records(PRODUCTS).await?, &input.code, None) {
            return Err(ValidationError::duplicate("code", input.code).into());
        }

        let mut fields = to_record(PRODUCTS, &input)?;
        fields.insert("is_active".to_string(), Value::from(1));

        let record = tx.insert(PRODUCTS, fields).await?;
        tx.commit().await?;

        let product: Product = from_record(PRODUCTS, record)?;
        info!(id = product.id, code = %product.code, "Product created");
        Ok(product)
    }

    /// Merges the set fields of `patch` into a product.
    pub async fn update(&self, id: i64, patch: ProductPatch) -> ServiceResult<Product> {
        if let Some(name) = &patch.name {
            validate_name("name", name)?;
        }
        if let Some(code) = &patch.code {
            validate_code(code)?;
        }
        if let Some(price) = patch.price {
            validate_amount("price", price)?;
        }
        if let Some(cost) = patch.cost {
            validate_amount("cost", cost)?;
        }
        if let Some(min_stock) = patch.min_stock {
            validate_stock_level(min_stock)?;
        }

        let mut tx = self.store.begin().await?;

        if tx.get_by_id(PRODUCTS, id).await?.is_none() {
            return Err(CoreError::ProductNotFound(id).into());
        }
        if let Some(code) = &patch.code {
            if code_taken(tx.records(PRODUCTS).await?, code.trim(), Some(id)) {
                return Err(ValidationError::duplicate("code", code.trim()).into());
            }
        }

        let fields = to_record(PRODUCTS, &patch)?;
        let record = tx.update(PRODUCTS, fields, "id", &json!(id)).await?;
        tx.commit().await?;

        debug!(id, "Product updated");
        Ok(from_record(PRODUCTS, record)?)
    }

    /// Reduces stock by `quantity`, flooring at zero. Returns the new stock.
    pub async fn reduce_stock(&self, product_id: i64, quantity: i64) -> ServiceResult<i64> {
        if quantity < 0 {
            return Err(ValidationError::Negative {
                field: "quantity".to_string(),
            }
            .into());
        }

        let mut tx = self.store.begin().await?;
        let remaining = reduce_stock_in(&mut tx, product_id, quantity).await?;
        tx.commit().await?;
        Ok(remaining)
    }

    /// Overwrites the stock level.
    pub async fn set_stock(&self, product_id: i64, quantity: i64) -> ServiceResult<i64> {
        validate_stock_level(quantity)?;

        let mut tx = self.store.begin().await?;
        if tx.get_by_id(PRODUCTS, product_id).await?.is_none() {
            return Err(CoreError::ProductNotFound(product_id).into());
        }
        tx.update(PRODUCTS, stock_fields(quantity), "id", &json!(product_id))
            .await?;
        tx.commit().await?;

        info!(product_id, quantity, "Stock set");
        Ok(quantity)
    }

    /// Hides a product from listings. It stays resolvable by id, so past
    /// sale items keep their product reference.
    pub async fn soft_delete(&self, product_id: i64) -> ServiceResult<()> {
        let mut tx = self.store.begin().await?;
        if tx.get_by_id(PRODUCTS, product_id).await?.is_none() {
            return Err(CoreError::ProductNotFound(product_id).into());
        }

        let mut fields = Record::new();
        fields.insert("is_active".to_string(), Value::from(0));
        tx.update(PRODUCTS, fields, "id", &json!(product_id)).await?;
        tx.commit().await?;

        info!(product_id, "Product soft-deleted");
        Ok(())
    }
}

// =============================================================================
// Write-unit helpers
// =============================================================================

/// Stock reduction inside an open write unit. Used by `reduce_stock` and by
/// the sale service, which reduces every line in the same unit.
pub(crate) async fn reduce_stock_in(
    tx: &mut StoreTx,
    product_id: i64,
    quantity: i64,
) -> ServiceResult<i64> {
    let record = tx
        .get_by_id(PRODUCTS, product_id)
        .await?
        .ok_or(CoreError::ProductNotFound(product_id))?;

    let current = record
        .get("stock_quantity")
        .and_then(Value::as_i64)
        .unwrap_or(0);
    let remaining = current - quantity;

    if remaining < 0 {
        warn!(
            product_id,
            current,
            requested = quantity,
            "Stock reduction exceeds stock on hand, clamping at zero"
        );
        tx.audit(AuditEvent::new(
            "stock",
            "reduce_stock_clamped",
            json!({ "product_id": product_id, "current": current, "requested": quantity }),
        ));
    }

    let new_quantity = remaining.max(0);
    tx.update(PRODUCTS, stock_fields(new_quantity), "id", &json!(product_id))
        .await?;

    debug!(product_id, from = current, to = new_quantity, "Stock reduced");
    Ok(new_quantity)
}

fn stock_fields(quantity: i64) -> Record {
    let mut fields = Record::new();
    fields.insert("stock_quantity".to_string(), Value::from(quantity));
    fields
}

/// Whether an active product other than `except` already uses `code`.
fn code_taken(records: &[Record], code: &str, except: Option<i64>) -> bool {
    records.iter().any(|record| {
        let active = record.get("is_active").and_then(flag_value).unwrap_or(true);
        let same_code = record
            .get("code")
            .and_then(Value::as_str)
            .map_or(false, |existing| existing.eq_ignore_ascii_case(code));

        active && same_code && record_id(record) != except
    })
}

/// A stored flag: `1`/`0` or a legacy `true`/`false`.
fn flag_value(value: &Value) -> Option<bool> {
    value.as_i64().map(|v| v != 0).or_else(|| value.as_bool())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{add_product, record, test_db, test_db_with_sink, RecordingSink};
    use crate::ServiceError;
    use till_core::{Money, NewCatalogEntry};

    #[tokio::test]
    async fn test_second_page_of_twelve_products() {
        let db = test_db().await;
        // inserted out of order so the page comes from sorting, not insertion
        for n in (1..=12).rev() {
            add_product(&db, &format!("Product {:02}", n), &format!("P{:02}", n), 100, 5).await;
        }

        let page = db.products().list(&ProductFilter::page(2, 5)).await.unwrap();
        let names: Vec<_> = page.data.iter().map(|v| v.product.name.as_str()).collect();

        assert_eq!(
            names,
            vec!["Product 06", "Product 07", "Product 08", "Product 09", "Product 10"]
        );
        assert_eq!(page.meta.current_page, 2);
        assert_eq!(page.meta.last_page, 3);
        assert_eq!(page.meta.per_page, 5);
        assert_eq!(page.meta.total, 12);
    }

    #[tokio::test]
    async fn test_list_resolves_category_and_brand() {
        let db = test_db().await;
        let drinks = db.categories().create(NewCatalogEntry::new("Drinks")).await.unwrap();
        let acme = db.brands().create(NewCatalogEntry::new("Acme")).await.unwrap();

        let repo = db.products();
        repo.create(
            NewProduct::new("Cola", "COLA", Money::from_cents(150))
                .with_category(drinks.id)
                .with_brand(acme.id),
        )
        .await
        .unwrap();
        repo.create(NewProduct::new("Orphan", "ORPH", Money::from_cents(100)).with_category(999))
            .await
            .unwrap();

        let page = repo.list(&ProductFilter::default()).await.unwrap();
        assert_eq!(page.data.len(), 2);

        let cola = &page.data[0];
        assert_eq!(cola.category.as_ref().map(|c| c.name.as_str()), Some("Drinks"));
        assert_eq!(cola.brand.as_ref().map(|b| b.name.as_str()), Some("Acme"));

        let orphan = &page.data[1];
        assert!(orphan.category.is_none());
        assert!(orphan.brand.is_none());

        let by_category = repo
            .list(&ProductFilter::default().category(drinks.id))
            .await
            .unwrap();
        assert_eq!(by_category.meta.total, 1);

        let by_brand = repo.list(&ProductFilter::default().brand(acme.id + 1)).await.unwrap();
        assert_eq!(by_brand.meta.total, 0);
        assert_eq!(by_brand.meta.last_page, 0);
    }

    #[tokio::test]
    async fn test_search_covers_name_code_and_barcode() {
        let db = test_db().await;
        let repo = db.products();
        repo.create(NewProduct::new("Sparkling Water", "H2O-1", Money::from_cents(99)))
            .await
            .unwrap();
        repo.create(
            NewProduct::new("Lemonade", "LEM", Money::from_cents(199)).with_barcode("5449000000996"),
        )
        .await
        .unwrap();

        let by_name = repo.list(&ProductFilter::default().search("WATER")).await.unwrap();
        assert_eq!(by_name.meta.total, 1);

        let by_code = repo.list(&ProductFilter::default().search("lem")).await.unwrap();
        assert_eq!(by_code.meta.total, 1);

        let by_barcode = repo.list(&ProductFilter::default().search("54490")).await.unwrap();
        assert_eq!(by_barcode.data[0].product.code, "LEM");
    }

    #[tokio::test]
    async fn test_soft_deleted_product_is_hidden_but_resolvable() {
        let db = test_db().await;
        let product = add_product(&db, "Old Stock", "OLD", 100, 1).await;

        db.products().soft_delete(product.id).await.unwrap();

        let page = db.products().list(&ProductFilter::default()).await.unwrap();
        assert!(page.data.is_empty());

        let resolved = db.products().get_by_id(product.id).await.unwrap();
        assert!(!resolved.is_active);
    }

    #[tokio::test]
    async fn test_integer_active_flags() {
        let db = test_db().await;
        let stored = vec![
            record(json!({
                "id": 1, "name": "Active Tea", "code": "TEA", "price": 2.5,
                "stock_quantity": 4, "min_stock": 0, "is_active": 1,
                "created_at": "2026-01-05T10:00:00Z"
            })),
            record(json!({
                "id": 2, "name": "Retired Tea", "code": "OLD-TEA", "price": 2.0,
                "stock_quantity": 4, "min_stock": 0, "is_active": 0,
                "created_at": "2026-01-05T10:00:00Z"
            })),
            record(json!({
                "id": 3, "name": "Legacy Tea", "code": "LEG-TEA", "price": 3.0,
                "stock_quantity": 4, "min_stock": 0, "is_active": true,
                "created_at": "2026-01-05T10:00:00Z"
            })),
        ];
        assert!(db.documents().save_collection(PRODUCTS, stored).await);

        let repo = db.products();
        let page = repo.list(&ProductFilter::default()).await.unwrap();
        let codes: Vec<_> = page.data.iter().map(|v| v.product.code.as_str()).collect();
        assert_eq!(codes, vec!["TEA", "LEG-TEA"]);

        assert!(repo.get_by_id(1).await.unwrap().is_active);
        assert!(!repo.get_by_id(2).await.unwrap().is_active);

        // an inactive product's code is free, an active one's is not
        assert!(repo
            .create(NewProduct::new("New Tea", "old-tea", Money::from_cents(100)))
            .await
            .is_ok());
        assert!(repo
            .create(NewProduct::new("Copy Tea", "tea", Money::from_cents(100)))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_flags_are_written_as_integers() {
        let db = test_db().await;
        let product = add_product(&db, "Jam", "JAM", 350, 2).await;

        let stored = db.documents().get_by_id(PRODUCTS, product.id).await.unwrap();
        assert_eq!(stored["is_active"], json!(1));

        db.products().soft_delete(product.id).await.unwrap();
        let stored = db.documents().get_by_id(PRODUCTS, product.id).await.unwrap();
        assert_eq!(stored["is_active"], json!(0));
    }

    #[test]
    fn test_flag_value() {
        assert_eq!(flag_value(&json!(1)), Some(true));
        assert_eq!(flag_value(&json!(0)), Some(false));
        assert_eq!(flag_value(&json!(false)), Some(false));
        assert_eq!(flag_value(&json!("1")), None);
    }

    #[tokio::test]
    async fn test_reduce_stock_floors_at_zero_and_reports_it() {
        let sink = RecordingSink::new();
        let db = test_db_with_sink(sink.clone()).await;
        let product = add_product(&db, "Gum", "GUM", 50, 3).await;

        let repo = db.products();
        assert_eq!(repo.reduce_stock(product.id, 2).await.unwrap(), 1);
        assert!(sink.events().is_empty());

        assert_eq!(repo.reduce_stock(product.id, 5).await.unwrap(), 0);
        assert_eq!(repo.get_by_id(product.id).await.unwrap().stock_quantity, 0);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].operation, "reduce_stock_clamped");
        assert_eq!(events[0].data["requested"], 5);
    }

    #[tokio::test]
    async fn test_stock_primitives_reject_bad_input() {
        let db = test_db().await;
        let product = add_product(&db, "Tea", "TEA", 250, 4).await;
        let repo = db.products();

        assert!(repo.reduce_stock(product.id, -1).await.unwrap_err().is_validation());
        assert!(repo.set_stock(product.id, -1).await.unwrap_err().is_validation());

        let missing = repo.reduce_stock(404, 1).await.unwrap_err();
        assert!(matches!(
            missing,
            ServiceError::Core(CoreError::ProductNotFound(404))
        ));

        assert_eq!(repo.set_stock(product.id, 40).await.unwrap(), 40);
        assert_eq!(repo.get_by_id(product.id).await.unwrap().stock_quantity, 40);
    }

    #[tokio::test]
    async fn test_duplicate_active_code_rejected() {
        let db = test_db().await;
        let first = add_product(&db, "Cola", "COLA", 150, 1).await;
        let repo = db.products();

        let err = repo
            .create(NewProduct::new("Cola again", "cola", Money::from_cents(150)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Core(CoreError::Validation(ValidationError::Duplicate { .. }))
        ));

        // the code frees up once the old product is retired
        repo.soft_delete(first.id).await.unwrap();
        assert!(repo
            .create(NewProduct::new("Cola v2", "COLA", Money::from_cents(160)))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_update_merges_patch() {
        let db = test_db().await;
        let product = add_product(&db, "Coffee", "COF", 300, 10).await;

        let updated = db
            .products()
            .update(
                product.id,
                ProductPatch {
                    price: Some(Money::from_cents(350)),
                    min_stock: Some(12),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.price.cents(), 350);
        assert_eq!(updated.name, "Coffee");
        assert_eq!(updated.stock_quantity, 10);
        assert!(updated.is_low_stock());
        assert_eq!(db.products().low_stock().await.len(), 1);

        let missing = db.products().update(999, ProductPatch::default()).await;
        assert!(matches!(
            missing,
            Err(ServiceError::Core(CoreError::ProductNotFound(999)))
        ));
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let db = test_db().await;
        let err = db
            .products()
            .create(NewProduct::new("  ", "OK", Money::from_cents(1)))
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let err = db
            .products()
            .create(NewProduct::new("Fine", "bad code", Money::from_cents(1)))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(db.documents().get_collection(PRODUCTS).await.is_empty());
    }
}
