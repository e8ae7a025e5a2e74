use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use travel_listings::logging::init_logger;
use travel_listings::{seed, ListingConfig, ListingService, MemoryStore};

#[derive(Parser)]
#[command(name = "seed")]
#[command(about = "Seeds a listing store with sample users, properties, bookings and reviews")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Seed for the random stay lengths, ratings and comments
    #[arg(long)]
    rng_seed: Option<u64>,

    /// Date the first check-in is offset from (defaults to today, UTC)
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Print every seeded property with its bookings as JSON
    #[arg(long)]
    dump: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ListingConfig::from_file(path)
            .with_context(|| format!("failed to load config file '{}'", path))?,
        None => ListingConfig::default(),
    };
    init_logger(&config.logging, args.verbose)?;

    let rng_seed = args.rng_seed.or(config.seed.rng_seed);
    let mut rng = match rng_seed {
        Some(value) => StdRng::seed_from_u64(value),
        None => StdRng::from_entropy(),
    };
    let today = args.today.unwrap_or_else(|| Utc::now().date_naive());

    let store = Arc::new(MemoryStore::new());
    let report = seed(&*store, &config.seed, today, &mut rng)
        .await
        .context("seeding failed")?;

    println!(
        "Seeded {} users, {} properties, {} bookings, {} reviews",
        report.hosts.len() + report.guests.len(),
        report.properties.len(),
        report.bookings.len(),
        report.reviews.len()
    );

    if args.dump {
        let service = ListingService::new(Arc::clone(&store), config.api.clone());
        for property in &report.properties {
            let detail = service.get_property(property.id).await?;
            println!("{}", serde_json::to_string_pretty(&detail)?);
        }
    }

    Ok(())
}
