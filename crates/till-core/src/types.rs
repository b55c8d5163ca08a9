//! # Catalog and People Types
//!
//! Entity types stored in the `products`, `categories`, `brands`,
//! `customers`, `users` and `settings` collections, plus the input and patch
//! shapes the add/edit flows submit.
//!
//! Field names follow the stored record shape (snake_case JSON). Ids are
//! integers assigned by the store; `created_at` is stamped on insert.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

fn default_true() -> bool {
    true
}

/// Record flags are stored as `1`/`0`; older records carry `true`/`false`.
/// Both decode to `bool`, any non-zero integer counting as set.
mod flag {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StoredFlag {
        Bool(bool),
        Int(i64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(match StoredFlag::deserialize(deserializer)? {
            StoredFlag::Bool(set) => set,
            StoredFlag::Int(value) => value != 0,
        })
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
///
/// ## Invariants
/// - `stock_quantity >= 0` after every mutation
/// - `is_active == false` means soft-deleted: hidden from listings but still
///   a valid join target for historical sale items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// Business identifier (SKU-like).
    pub code: String,
    pub barcode: Option<String>,
    #[ts(as = "f64")]
    pub price: Money,
    #[serde(default)]
    #[ts(as = "f64")]
    pub cost: Money,
    #[serde(default)]
    pub stock_quantity: i64,
    /// Threshold at or below which the product counts as low stock.
    #[serde(default)]
    pub min_stock: i64,
    pub category_id: Option<i64>,
    pub brand_id: Option<i64>,
    #[serde(default)]
    pub description: String,
    pub image_url: Option<String>,
    /// Stored as `1`/`0`.
    #[serde(default = "default_true", deserialize_with = "flag::deserialize")]
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Whether `stock_quantity <= min_stock`.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.min_stock
    }

    /// Checks if the requested quantity can be sold from current stock.
    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.stock_quantity >= quantity
    }
}

/// Fields submitted by the add-product flow.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub code: String,
    pub barcode: Option<String>,
    #[ts(as = "f64")]
    pub price: Money,
    #[serde(default)]
    #[ts(as = "f64")]
    pub cost: Money,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default)]
    pub min_stock: i64,
    pub category_id: Option<i64>,
    pub brand_id: Option<i64>,
    #[serde(default)]
    pub description: String,
    pub image_url: Option<String>,
}

impl NewProduct {
    /// Minimal product input; remaining fields take their defaults.
    pub fn new(name: impl Into<String>, code: impl Into<String>, price: Money) -> Self {
        NewProduct {
            name: name.into(),
            code: code.into(),
            barcode: None,
            price,
            cost: Money::zero(),
            stock_quantity: 0,
            min_stock: 0,
            category_id: None,
            brand_id: None,
            description: String::new(),
            image_url: None,
        }
    }

    pub fn with_stock(mut self, stock_quantity: i64, min_stock: i64) -> Self {
        self.stock_quantity = stock_quantity;
        self.min_stock = min_stock;
        self
    }

    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_brand(mut self, brand_id: i64) -> Self {
        self.brand_id = Some(brand_id);
        self
    }

    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }
}

/// Partial update for a product. Only `Some` fields are merged into the
/// stored record. Stock changes go through the stock primitives instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<f64>")]
    pub price: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<f64>")]
    pub cost: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_stock: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A product with its category and brand resolved.
///
/// `category` / `brand` are `None` when the id is unset or dangling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub category: Option<Category>,
    pub brand: Option<Brand>,
}

// =============================================================================
// Category / Brand
// =============================================================================

/// A product category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A product brand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Brand {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for creating or renaming a category or brand.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCatalogEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl NewCatalogEntry {
    pub fn new(name: impl Into<String>) -> Self {
        NewCatalogEntry {
            name: name.into(),
            description: String::new(),
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer that can be attached to sales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCustomer {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl NewCustomer {
    pub fn new(name: impl Into<String>) -> Self {
        NewCustomer {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

// =============================================================================
// User
// =============================================================================

/// Access level of a staff account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    #[default]
    Cashier,
}

/// A staff account. The password hash is kept by the store and never leaves
/// it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for creating a staff account. `password` is plaintext and is hashed
/// before it reaches the store.
#[derive(Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

// =============================================================================
// Setting
// =============================================================================

/// A key-value application setting. `key` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Setting {
    pub id: i64,
    pub key: String,
    pub value: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}
