//! fhe-lookup-remote: client for fhe-lookup-server
//!
//! Generates keys locally, uploads the public context and the encrypted
//! table, sends one encrypted query and decrypts the answer. The secret key
//! never leaves this process.

use std::path::PathBuf;

use clap::Parser;
use eyre::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use fhe_lookup::http::ApiClient;
use fhe_lookup::lookup::{setup, SlotCodec};
use fhe_lookup::metrics::Timings;
use fhe_lookup::params::ParamArgs;
use fhe_lookup::serialize::{ciphertext_from_bytes, ciphertext_to_bytes};
use fhe_lookup::table::read_table;

#[derive(Parser)]
#[command(name = "fhe-lookup-remote")]
#[command(about = "Upload an encrypted table and query it remotely")]
#[command(version)]
struct Args {
    /// Server URL
    #[arg(long, default_value = "http://127.0.0.1:3000")]
    server: String,

    /// Two-column CSV table to upload
    #[arg(long, default_value = "data/countries_dataset.csv")]
    db_filename: PathBuf,

    /// Query key
    #[arg(long)]
    query: String,

    #[command(flatten)]
    params: ParamArgs,

    /// Seed for deterministic key generation
    #[arg(long)]
    seed: Option<u64>,

    /// Print phase timings
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.debug { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let api = ApiClient::new(&args.server);
    let health = api
        .health()
        .await
        .with_context(|| format!("Server not reachable at {}", args.server))?;
    info!("Server {} is {}", health.version, health.status);

    let params = args.params.to_params();
    params
        .validate()
        .map_err(|e| eyre::eyre!("Invalid parameters: {}", e))?;
    let codec = SlotCodec::for_params(&params);
    let rows = read_table(&args.db_filename, &codec)
        .with_context(|| format!("Failed to load table {}", args.db_filename.display()))?;

    let mut rng = match args.seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::from_entropy(),
    };
    let mut timings = Timings::new();

    let (client, table) = tokio::task::block_in_place(|| {
        setup(&params, &rows, &mut rng, &mut timings)
    })?;

    let status = api
        .set_context(client.public_context_bytes()?, client.public_keys_bytes()?)
        .await
        .with_context(|| "Failed to upload public context")?;
    if let Some(err) = status.snapshot_error {
        warn!("Server did not persist its snapshot: {}", err);
    }

    let pb = ProgressBar::new(table.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );
    for entry in &table.entries {
        api.set_entry(&entry.to_serialized())
            .await
            .with_context(|| "Failed to upload row")?;
        pb.inc(1);
    }
    pb.finish_with_message("Uploaded");

    let stats = api.stats().await?;
    info!("Server holds {} rows", stats.entries);

    let query = ciphertext_to_bytes(&client.query(&args.query)?);
    let reply = api.lookup(query).await.with_context(|| "Lookup failed")?;
    info!("Server processing time: {} ms", reply.processing_time_ms);

    let response = ciphertext_from_bytes(&reply.response, client.context())?;
    match client.extract(&response)? {
        Some(value) => println!("Query result: {}", value),
        None => println!("Query result: {} not in the database.", args.query),
    }

    if args.debug {
        println!();
        println!("Timings:");
        println!("{}", timings);
    }

    Ok(())
}
