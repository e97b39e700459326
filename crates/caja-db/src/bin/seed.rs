//! # Seed Data Generator
//!
//! Fills a development database with an admin, two cashiers and a small
//! grocery catalog.
//!
//! ## Usage
//! ```bash
//! cargo run -p caja-db --bin seed
//! cargo run -p caja-db --bin seed -- --db ./data/caja.db
//! ```
//!
//! Accounts created (change the passwords before real use):
//!
//! | username | password    | role   |
//! |----------|-------------|--------|
//! | admin    | admin123    | ADMIN  |
//! | cajero1  | cajero123   | CAJERO |
//! | cajero2  | cajero123   | CAJERO |

use std::env;

use anyhow::Context;
use caja_core::password::hash_password;
use caja_core::{NewProduct, Role};
use caja_db::repository::user::UserRecord;
use caja_db::{Database, DbConfig};

const ACCOUNTS: &[(&str, &str, &str, Role)] = &[
    ("admin", "admin@caja.local", "admin123", Role::Admin),
    ("cajero1", "cajero1@caja.local", "cajero123", Role::Cashier),
    ("cajero2", "cajero2@caja.local", "cajero123", Role::Cashier),
];

/// (code, name, category, price in cents, stock)
const CATALOG: &[(&str, &str, &str, i64, i64)] = &[
    ("BEB-COCA-500", "Coca-Cola 500ml", "Bebidas", 500, 48),
    ("BEB-COCA-1500", "Coca-Cola 1.5L", "Bebidas", 1150, 24),
    ("BEB-AGUA-600", "Agua mineral 600ml", "Bebidas", 300, 60),
    ("BEB-JUGO-1L", "Jugo de naranja 1L", "Bebidas", 890, 12),
    ("SNK-PAPAS-45", "Papas fritas 45g", "Snacks", 350, 40),
    ("SNK-CHOC-40", "Chocolate con leche 40g", "Snacks", 420, 8),
    ("SNK-GALL-120", "Galletas de avena 120g", "Snacks", 610, 30),
    ("LAC-LECHE-1L", "Leche entera 1L", "Lacteos", 780, 36),
    ("LAC-YOG-200", "Yogur natural 200g", "Lacteos", 450, 5),
    ("LAC-QUESO-250", "Queso fresco 250g", "Lacteos", 1890, 10),
    ("ABA-ARROZ-1K", "Arroz 1kg", "Abarrotes", 1290, 25),
    ("ABA-AZUC-1K", "Azucar 1kg", "Abarrotes", 990, 3),
    ("ABA-ACEITE-900", "Aceite vegetal 900ml", "Abarrotes", 2150, 14),
    ("PAN-MOLDE-500", "Pan de molde 500g", "Panaderia", 1350, 18),
    ("LIM-JABON-3", "Jabon de tocador x3", "Limpieza", 1680, 0),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./caja_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-d" | "--db" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "-h" | "--help" => {
                println!("Caja POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./caja_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => eprintln!("Ignoring unknown argument: {other}"),
        }
        i += 1;
    }

    println!("🌱 Caja POS Seed Data Generator");
    println!("===============================");
    println!("Database: {db_path}");
    println!();

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {db_path}"))?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing_users = db.users().count().await?;
    if existing_users > 0 {
        println!("⚠ Database already has {existing_users} users, skipping accounts");
    } else {
        for (username, email, password, role) in ACCOUNTS {
            let user = db
                .users()
                .create(UserRecord {
                    username: username.to_string(),
                    email: email.to_string(),
                    password_hash: hash_password(password)?,
                    role: *role,
                })
                .await
                .with_context(|| format!("creating user {username}"))?;
            println!("  + {} ({})", user.username, user.role);
        }
    }

    let existing_products = db.products().count().await?;
    if existing_products > 0 {
        println!("⚠ Database already has {existing_products} products, skipping catalog");
    } else {
        for (code, name, category, price_cents, stock) in CATALOG {
            db.products()
                .create(NewProduct {
                    code: code.to_string(),
                    name: name.to_string(),
                    description: None,
                    price_cents: *price_cents,
                    stock: *stock,
                    category: Some(category.to_string()),
                })
                .await
                .with_context(|| format!("creating product {code}"))?;
        }
        println!("  + {} products", CATALOG.len());
    }

    db.close().await;
    println!();
    println!("✓ Seed complete!");
    Ok(())
}
