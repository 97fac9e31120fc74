//! # Seed Data Generator
//!
//! Populates a database with an admin account and a small demo shop.
//!
//! ## Usage
//! ```bash
//! # Defaults: ./data/market.db, admin / admin123
//! cargo run -p market-db --bin seed
//!
//! cargo run -p market-db --bin seed -- --db ./data/market.db \
//!     --admin-login boss --admin-password s3cret-pass
//! ```
//!
//! ## Generated Data
//! - One SUPER-ADMIN user
//! - Branch `B001` with sale point "Kassa 1"
//! - An active supplier
//! - Categories with a few products each, stocked at the demo branch

use std::env;

use market_core::{
    Branch, Category, ClientType, CreateBranch, CreateCategory, CreateProduct, CreateRemainder,
    CreateSalePoint, CreateSupplier, CreateUser, Product, Remainder, SalePoint, Supplier,
};
use market_db::{Database, DbConfig, ListParams};

/// Category title and its products as (title, price in tiyin).
const CATALOG: &[(&str, &[(&str, i64)])] = &[
    (
        "Ichimliklar",
        &[
            ("Coca-Cola 0.5L", 8_000_00),
            ("Fanta 1L", 12_000_00),
            ("Hydrolife 1.5L", 4_500_00),
            ("Nestle Qulupnay sharbati", 15_000_00),
        ],
    ),
    (
        "Sut mahsulotlari",
        &[
            ("Musaffo sut 1L", 11_000_00),
            ("Qatiq 0.5L", 7_500_00),
            ("Tvorog 200g", 14_000_00),
        ],
    ),
    (
        "Non va shirinliklar",
        &[
            ("Patir non", 5_000_00),
            ("Yupqa lavash", 3_000_00),
            ("Shokoladli pechenye", 9_500_00),
        ],
    ),
];

struct Args {
    db_path: String,
    admin_login: String,
    admin_password: String,
}

fn parse_args() -> Option<Args> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args {
        db_path: String::from("./data/market.db"),
        admin_login: String::from("admin"),
        admin_password: String::from("admin123"),
    };

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1).cloned();
        match (args[i].as_str(), value) {
            ("--db" | "-d", Some(v)) => {
                parsed.db_path = v;
                i += 1;
            }
            ("--admin-login", Some(v)) => {
                parsed.admin_login = v;
                i += 1;
            }
            ("--admin-password", Some(v)) => {
                parsed.admin_password = v;
                i += 1;
            }
            ("--help" | "-h", _) => {
                println!("Market POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>              Database file path (default: ./data/market.db)");
                println!("      --admin-login <LOGIN>    Admin login (default: admin)");
                println!("      --admin-password <PASS>  Admin password (default: admin123)");
                println!("  -h, --help                   Show this help message");
                return None;
            }
            _ => {}
        }
        i += 1;
    }

    Some(parsed)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Some(args) = parse_args() else {
        return Ok(());
    };

    println!("🌱 Market POS Seed Data Generator");
    println!("=================================");
    println!("Database: {}", args.db_path);
    println!();

    let db = Database::new(DbConfig::new(&args.db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.store::<Branch>().get_list(&ListParams::default().page(1, 0)).await?;
    if existing.count > 0 {
        println!("⚠ Database already has {} branches", existing.count);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let admin = db
        .users()
        .create(&CreateUser {
            first_name: "Admin".to_string(),
            last_name: "Market".to_string(),
            login: args.admin_login.clone(),
            password: args.admin_password.clone(),
            active: true,
            client_type: ClientType::SuperAdmin,
        })
        .await?;
    println!("✓ Admin user '{}' ({})", admin.login, admin.id);

    let branch = db
        .store::<Branch>()
        .create(&CreateBranch {
            branch_code: "B001".to_string(),
            name: "Chilonzor filiali".to_string(),
            address: "Toshkent, Chilonzor 9-kvartal".to_string(),
            phone: "+998712000000".to_string(),
        })
        .await?;
    let sale_point = db
        .store::<SalePoint>()
        .create(&CreateSalePoint {
            branch_id: branch.id.clone(),
            name: "Kassa 1".to_string(),
        })
        .await?;
    println!("✓ Branch {} with sale point '{}'", branch.branch_code, sale_point.name);

    let supplier = db
        .store::<Supplier>()
        .create(&CreateSupplier {
            name: "Toshkent Ulgurji Savdo".to_string(),
            phone_number: "+998901112233".to_string(),
            is_active: true,
        })
        .await?;
    println!("✓ Supplier '{}'", supplier.name);

    let mut products = 0;
    for (category_idx, (title, items)) in CATALOG.iter().enumerate() {
        let category = db
            .store::<Category>()
            .create(&CreateCategory {
                title: title.to_string(),
                parent_id: None,
            })
            .await?;

        for (item_idx, (name, price)) in items.iter().enumerate() {
            // EAN-13 shaped, checksum not computed
            let barcode = format!("478{:010}", category_idx * 100 + item_idx);

            db.store::<Product>()
                .create(&CreateProduct {
                    photo: None,
                    title: name.to_string(),
                    category_id: Some(category.id.clone()),
                    barcode: barcode.clone(),
                    price: *price,
                })
                .await?;

            db.store::<Remainder>()
                .create(&CreateRemainder {
                    branch_id: branch.id.clone(),
                    category_id: Some(category.id.clone()),
                    product_name: name.to_string(),
                    barcode,
                    price_income: *price,
                    quantity: 20 + (item_idx as i64) * 5,
                })
                .await?;

            products += 1;
        }
    }
    println!("✓ {} products stocked across {} categories", products, CATALOG.len());

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}
