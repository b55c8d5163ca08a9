//! # Seed Data Generator
//!
//! Populates a till database with the demo catalog.
//!
//! ## Usage
//! ```bash
//! # Seed ./till.db with the default catalog
//! cargo run -p till-store --bin seed
//!
//! # Fewer products, custom path
//! cargo run -p till-store --bin seed -- --count 10 --db ./data/till.db
//!
//! # Also create the admin account
//! TILL_ADMIN_PASSWORD=... cargo run -p till-store --bin seed
//! ```
//!
//! A database that has already been seeded is left untouched.

use std::env;
use till_store::{seed_demo_data, Database, SeedOptions, StoreConfig, ADMIN_EMAIL};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,till=debug,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut config = StoreConfig::from_env();
    let mut options = SeedOptions::from_env();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    options.product_count = args[i + 1].parse().unwrap_or(options.product_count);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config = StoreConfig::new(&args[i + 1]);
                    i += 1;
                }
            }
            "--admin-password" => {
                if i + 1 < args.len() {
                    options.admin_password = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Till Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>             Number of products to create (default: 24)");
                println!("  -d, --db <PATH>             Database file path (default: $TILL_DB_PATH or ./till.db)");
                println!("      --admin-password <PW>   Create {} (or set TILL_ADMIN_PASSWORD)", ADMIN_EMAIL);
                println!("  -h, --help                  Show this help message");
                return Ok(());
            }
            other => {
                eprintln!("Ignoring unknown argument: {}", other);
            }
        }
        i += 1;
    }

    println!("🌱 Till Seed Data Generator");
    println!("===========================");
    println!("Database: {}", config.database_path.display());
    println!("Products: {}", options.product_count);
    println!();

    let db = Database::new(config).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let start = std::time::Instant::now();
    let report = seed_demo_data(&db, &options).await?;

    if report.skipped {
        println!("⚠ Database is already initialized");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        db.close().await;
        return Ok(());
    }

    println!();
    println!("✓ Seeded in {:?}", start.elapsed());
    println!("  Categories: {}", report.categories);
    println!("  Brands:     {}", report.brands);
    println!("  Products:   {}", report.products);
    println!("  Customers:  {}", report.customers);
    if report.admin_created {
        println!("  Admin:      {}", ADMIN_EMAIL);
    } else {
        println!("  Admin:      not created (no password given)");
    }

    let low_stock = db.products().low_stock().await;
    println!("  Low stock:  {}", low_stock.len());

    db.close().await;
    println!();
    println!("✓ Seed complete!");

    Ok(())
}
