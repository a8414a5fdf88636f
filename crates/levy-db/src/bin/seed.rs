//! # Seed Data Generator
//!
//! Populates a database with demo geography and an Australian tax class,
//! then prints two example breakdowns.
//!
//! ## Usage
//! ```bash
//! # Uses LEVY_DATABASE_PATH (default: levy.db)
//! cargo run -p levy-db --bin seed
//!
//! # Specify database path
//! cargo run -p levy-db --bin seed -- --db ./data/levy_dev.db
//!
//! # More logging
//! RUST_LOG=levy_db=debug cargo run -p levy-db --bin seed
//! ```
//!
//! ## Seeded Rules
//! Marketplace default class "Australia":
//! - GST 10% (country AU, priority 1)
//! - NSW Levy 2% compound (AU / NSW, priority 2)
//! - Shipping GST 10% on shipping (country AU, priority 1)

use anyhow::Context;
use levy_core::{
    City, Country, GeoScope, Jurisdiction, Money, NewTaxClass, NewTaxClassOption, OrderContext,
    State,
};
use levy_db::{LevyConfig, TaxClassQuery, TaxService};
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const COUNTRIES: &[(&str, &str)] = &[("AU", "Australia"), ("US", "United States")];

const STATES: &[(&str, &str, &str)] = &[
    ("NSW", "AU", "New South Wales"),
    ("VIC", "AU", "Victoria"),
    ("CA", "US", "California"),
];

const CITIES: &[(&str, &str, &str)] = &[("SYD", "NSW", "Sydney"), ("MEL", "VIC", "Melbourne")];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = LevyConfig::load().context("invalid LEVY_* environment")?;

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Levy Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path");
                println!("                     (default: $LEVY_DATABASE_PATH or levy.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(path = %config.database_path.display(), "Seeding database");

    let service = TaxService::connect(&config)
        .await
        .context("could not open the rule store")?;

    let existing = service.list_classes(&TaxClassQuery::new()).await?;
    if existing.total > 0 {
        info!(classes = existing.total, "Database already has tax classes, skipping seed");
    } else {
        seed_geography(&service).await?;
        seed_australia(&service).await?;
        info!("Seed complete");
    }

    let nsw = OrderContext::new(
        Money::from_cents(100_000),
        Money::from_cents(5_000),
        Jurisdiction::country("AU").with_state("NSW"),
    );
    let us = OrderContext::new(
        Money::from_cents(100_000),
        Money::from_cents(5_000),
        Jurisdiction::country("US"),
    );

    for (label, order) in [("AU / NSW", &nsw), ("US", &us)] {
        let breakdown = service.compute_tax(order).await?;
        println!("# {}", label);
        println!("{}", serde_json::to_string_pretty(&breakdown)?);
    }

    service.database().close().await;
    Ok(())
}

async fn seed_geography(service: &TaxService) -> anyhow::Result<()> {
    let geo = service.database().geography();

    for (id, name) in COUNTRIES {
        geo.insert_country(&Country {
            id: id.to_string(),
            name: name.to_string(),
        })
        .await?;
    }
    for (id, country_id, name) in STATES {
        geo.insert_state(&State {
            id: id.to_string(),
            country_id: country_id.to_string(),
            name: name.to_string(),
        })
        .await?;
    }
    for (id, state_id, name) in CITIES {
        geo.insert_city(&City {
            id: id.to_string(),
            state_id: state_id.to_string(),
            name: name.to_string(),
        })
        .await?;
    }

    info!(
        countries = COUNTRIES.len(),
        states = STATES.len(),
        cities = CITIES.len(),
        "Geography seeded"
    );
    Ok(())
}

async fn seed_australia(service: &TaxService) -> anyhow::Result<()> {
    let class = service
        .create_class(NewTaxClass {
            name: "Australia".to_string(),
            vendor_id: None,
            is_activated: true,
        })
        .await?;

    let options = [
        ("GST", GeoScope::country("AU"), 1, false, false, 10.0),
        ("NSW Levy", GeoScope::country("AU").with_state("NSW"), 2, true, false, 2.0),
        ("Shipping GST", GeoScope::country("AU"), 1, false, true, 10.0),
    ];

    for (tax_name, scope, priority, is_compound, is_shipping, rate) in options {
        service
            .create_option(NewTaxClassOption {
                class_id: class.id.clone(),
                tax_name: tax_name.to_string(),
                scope,
                priority,
                is_compound,
                is_shipping,
                rate,
            })
            .await
            .with_context(|| format!("could not create option {}", tax_name))?;
    }

    info!(class_id = %class.id, options = 3, "Australian tax class seeded");
    Ok(())
}
