//! # Seed Data Generator
//!
//! Fills an existing account with a demo catalog and, optionally, a run of
//! past POS sales so the analytics and history pages have something to
//! show.
//!
//! ## Usage
//! ```bash
//! # Sign up through the app first, then:
//! cargo run -p tillbook-db --bin seed -- --user owner@shop.in
//!
//! # More products, plus 40 demo checkouts
//! cargo run -p tillbook-db --bin seed -- --user owner@shop.in --count 200 --sales 40
//!
//! # Specify database path
//! cargo run -p tillbook-db --bin seed -- --user owner@shop.in --db ./data/tillbook.db
//! ```
//!
//! ## Generated Products
//! Names are drawn per category; each product gets:
//! - Price: ₹10.00 - ₹499.00
//! - Stock: 0 - 60 (so some land under the low-stock threshold)
//! - Threshold: 10, or 5 for electronics

use std::env;

use chrono::{Duration, Utc};
use tillbook_core::checkout::{plan_checkout, CheckoutRequest};
use tillbook_core::validation::ProductDraft;
use tillbook_core::{CartItem, PaymentMethod, Product, ProductCategory};
use tillbook_db::{Database, DbConfig};

const CATALOG: &[(ProductCategory, &[&str])] = &[
    (
        ProductCategory::Beverages,
        &["Masala Chai", "Filter Coffee", "Mango Lassi", "Cola", "Lemon Soda", "Mineral Water"],
    ),
    (
        ProductCategory::Snacks,
        &["Samosa", "Banana Chips", "Bhujia", "Salted Peanuts", "Biscuits", "Chocolate Bar"],
    ),
    (
        ProductCategory::Electronics,
        &["USB Cable", "Phone Charger", "Earphones", "Power Bank", "AA Batteries"],
    ),
    (
        ProductCategory::Clothing,
        &["Cotton T-Shirt", "Handkerchief", "Socks", "Cap"],
    ),
    (
        ProductCategory::General,
        &["Notebook", "Ball Pen", "Umbrella", "Matchbox", "Candles"],
    ),
];

const CUSTOMERS: &[Option<&str>] = &[None, Some("Priya"), None, Some("Rahul"), Some("Ananya"), None];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 26;
    let mut sales: usize = 0;
    let mut db_path = String::from("./tillbook_dev.db");
    let mut user_email: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(count);
                    i += 1;
                }
            }
            "--sales" | "-s" => {
                if i + 1 < args.len() {
                    sales = args[i + 1].parse().unwrap_or(sales);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--user" | "-u" => {
                if i + 1 < args.len() {
                    user_email = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let Some(user_email) = user_email else {
        print_help();
        return Err("--user is required".into());
    };

    println!("🌱 Tillbook Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!("Account:  {}", user_email);
    println!("Products: {}", count);
    println!("Sales:    {}", sales);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let Some(account) = db.users().find_credentials(&user_email).await? else {
        println!("⚠ No account for {}", user_email);
        println!("  Sign up through the app first, then run the seed again.");
        return Ok(());
    };
    let user_id = account.user.id;

    let existing = db.products().count(&user_id).await?;
    if existing > 0 {
        println!("⚠ Account already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    println!();
    println!("Generating products...");
    let start = std::time::Instant::now();

    let mut products: Vec<Product> = Vec::with_capacity(count);
    'outer: for round in 0.. {
        for (category, names) in CATALOG {
            for name in names.iter() {
                if products.len() >= count {
                    break 'outer;
                }
                let draft = generate_product(*category, name, round, products.len());
                match db.products().insert(&user_id, &draft).await {
                    Ok(p) => products.push(p),
                    Err(e) => eprintln!("Failed to insert {}: {}", draft.name, e),
                }
            }
        }
        if products.is_empty() {
            break;
        }
    }

    println!("✓ Generated {} products in {:?}", products.len(), start.elapsed());

    if sales > 0 && !products.is_empty() {
        println!();
        println!("Generating sales...");
        let now = Utc::now();
        let checkout = db.checkout();

        for n in 0..sales {
            let lines: Vec<CartItem> = (0..(1 + n % 3))
                .map(|k| {
                    let product = &products[(n * 7 + k * 3) % products.len()];
                    CartItem::from_product(product, 1 + ((n + k) % 3) as i64)
                })
                .collect();

            let request = CheckoutRequest {
                payment_method: PaymentMethod::ALL[n % PaymentMethod::ALL.len()],
                customer: CUSTOMERS[n % CUSTOMERS.len()].map(str::to_string),
                customer_email: None,
            };
            // Spread sales over the past weeks, oldest first
            let at = now - Duration::hours(((sales - n) * 9) as i64);

            let plan = plan_checkout(&user_id, &dedupe(lines), &request, at)?;
            checkout.commit(&plan, true).await?;
        }
        println!("✓ Generated {} sales", sales);
    }

    let low = db.products().low_stock(&user_id).await?;
    println!();
    println!("  Low stock: {} products", low.len());
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn print_help() {
    println!("Tillbook Seed Data Generator");
    println!();
    println!("Usage: seed --user <EMAIL> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -u, --user <EMAIL> Existing account to fill (required)");
    println!("  -c, --count <N>    Number of products to generate (default: 26)");
    println!("  -s, --sales <N>    Number of demo checkouts (default: 0)");
    println!("  -d, --db <PATH>    Database file path (default: ./tillbook_dev.db)");
    println!("  -h, --help         Show this help message");
}

/// Generates one catalog entry from its position in the run.
fn generate_product(category: ProductCategory, name: &str, round: usize, seed: usize) -> ProductDraft {
    let name = if round == 0 {
        name.to_string()
    } else {
        format!("{} #{}", name, round + 1)
    };

    ProductDraft {
        name,
        category,
        price_cents: 1_000 + ((seed * 1_733) % 490) as i64 * 100,
        stock: ((seed * 13) % 61) as i64,
        low_stock_threshold: if category == ProductCategory::Electronics { 5 } else { 10 },
        description: None,
        barcode: Some(format!("890{:010}", seed)),
    }
}

/// Merges repeated products so each appears on one line.
fn dedupe(lines: Vec<CartItem>) -> Vec<CartItem> {
    let mut merged: Vec<CartItem> = Vec::with_capacity(lines.len());
    for line in lines {
        match merged.iter_mut().find(|l| l.product_id == line.product_id) {
            Some(existing) => existing.quantity += line.quantity,
            None => merged.push(line),
        }
    }
    merged
}
