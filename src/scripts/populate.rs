//! populate - seed the analytics database with synthetic sales history

use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use sales_analytics::config::{AppConfig, SeedConfig};
use sales_analytics::seed::ddl;
use sales_analytics::seed::{SeedOrchestrator, SeedPlan};
use sales_analytics::store::PostgresStore;

#[derive(Parser)]
#[command(name = "populate")]
#[command(version, about = "Seed the analytics database with synthetic sales data", long_about = None)]
struct Cli {
    /// Number of stores to create
    #[arg(long)]
    stores: Option<usize>,

    /// Number of products in the catalog
    #[arg(long)]
    products: Option<usize>,

    /// Number of add-on items in the catalog
    #[arg(long)]
    items: Option<usize>,

    /// Number of customers to create
    #[arg(long)]
    customers: Option<usize>,

    /// Months of sales history ending today
    #[arg(long)]
    months: Option<u32>,

    /// RNG seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Apply the bundled schema before seeding
    #[arg(long)]
    init_schema: bool,
}

impl Cli {
    fn apply(&self, mut seed: SeedConfig) -> SeedConfig {
        if let Some(stores) = self.stores {
            seed.stores = stores;
        }
        if let Some(products) = self.products {
            seed.products = products;
        }
        if let Some(items) = self.items {
            seed.items = items;
        }
        if let Some(customers) = self.customers {
            seed.customers = customers;
        }
        if let Some(months) = self.months {
            seed.months = months;
        }
        if self.seed.is_some() {
            seed.rng_seed = self.seed;
        }
        seed
    }
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .filter_module("sqlx", log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        log::error!("Seeding failed: {:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    let seed = cli.apply(config.seed.clone());
    seed.validate()?;

    let options = config.connect_options()?;
    log::info!("Connecting to PostgreSQL...");
    let store = PostgresStore::connect(options, &config.database).await?;
    let mut session = store.seed_session().await?;

    if cli.init_schema {
        ddl::init_schema(&mut session).await?;
    }

    let rng = match seed.rng_seed {
        Some(value) => {
            log::info!("Using RNG seed {}", value);
            ChaCha8Rng::seed_from_u64(value)
        }
        None => ChaCha8Rng::from_os_rng(),
    };

    let plan = SeedPlan::new(seed, chrono::Local::now().naive_local());
    log::info!(
        "Seeding {} stores, {} products, {} customers and {} month(s) of sales",
        plan.config.stores,
        plan.config.products,
        plan.config.customers,
        plan.config.months
    );

    let result = SeedOrchestrator::new(&mut session, rng, plan).run().await;
    drop(session);
    store.close().await;

    let report = result?;
    log::info!("Report: {}", serde_json::to_string(&report)?);
    Ok(())
}
