//! # till-core: Pure Business Logic for Till
//!
//! This crate holds the sale arithmetic, entity types and validation rules
//! of the Till point-of-sale core. Nothing here touches storage.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Till Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  UI (mobile / web checkout)                     │   │
//! │  │    Product list ──► Cart ──► Checkout ──► Receipt / Dashboard  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ serde JSON                             │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  totals   │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │ SaleTotals│  │   rules   │  │   │
//! │  │   │ Customer  │  │  Percent  │  │ SaleDraft │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐                                 │   │
//! │  │   │   sale    │  │   page    │                                 │   │
//! │  │   │ SaleReq.  │  │ Paginated │                                 │   │
//! │  │   │CompleteS. │  │  filters  │                                 │   │
//! │  │   └───────────┘  └───────────┘                                 │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  till-store (Storage Layer)                     │   │
//! │  │        Document collections, repositories, sale service        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Catalog and people entities (Product, Customer, User, ...)
//! - [`sale`] - Sale records, the sale request and its joined views
//! - [`money`] - Money and Percent with integer arithmetic
//! - [`totals`] - The sale totals formula and settlement rule
//! - [`page`] - Pagination and list filters
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use till_core::money::{Money, Percent};
//! use till_core::totals::{SaleTotals, Settlement};
//!
//! let totals = SaleTotals::compute(
//!     Money::from_cents(10000),
//!     Percent::from_percentage(10.0),
//!     Percent::from_percentage(8.5),
//!     Money::from_cents(500),
//! );
//! assert_eq!(totals.grand_total.to_string(), "$102.65");
//!
//! let settlement = Settlement::derive(totals.grand_total, Some(Money::from_cents(12000)));
//! assert_eq!(settlement.change_amount.cents(), 1735);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod page;
pub mod sale;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Percent};
pub use page::{CustomerFilter, PageMeta, PageRequest, Paginated, ProductFilter, SaleFilter};
pub use sale::*;
pub use totals::{SaleDraft, SaleTotals, Settlement};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items in a single sale.
pub const MAX_SALE_ITEMS: usize = 100;

/// Maximum quantity on a single line.
///
/// ## Business Reason
/// Catches a fat-fingered 1000 instead of 10 at the till.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Page size used when a listing does not ask for one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Upper bound for any requested page size.
pub const MAX_PAGE_SIZE: usize = 100;

/// How far (in cents) a submitted amount may drift from the recomputed one.
pub const TOTAL_TOLERANCE_CENTS: i64 = 1;
