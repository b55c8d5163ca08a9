//! # Repositories
//!
//! Typed access to the document store, one repository per aggregate.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Database                                                               │
//! │   ├── products()    ProductRepository   list, stock, soft delete       │
//! │   ├── categories()  CategoryRepository  ┐ catalog entries              │
//! │   ├── brands()      BrandRepository     ┘                              │
//! │   ├── customers()   CustomerRepository                                 │
//! │   ├── users()       UserRepository      argon2 password hashes         │
//! │   ├── settings()    SettingsRepository  key → value                    │
//! │   ├── sales()       SaleService         create / get / list            │
//! │   └── reports()     ReportRepository    dashboard figures              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every repository is a cheap clone of the same `DocumentStore`.

pub mod catalog;
pub mod customer;
pub mod product;
pub mod report;
pub mod sale;
pub mod settings;
pub mod user;
