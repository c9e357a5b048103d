//! fhe-lookup: interactive encrypted country/capital lookup
//!
//! Encrypts a two-column table, asks for one key and prints the matching
//! value, computed homomorphically over the encrypted table.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use eyre::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use fhe_lookup::algebra::SlotDecryptor;
use fhe_lookup::comparator::{Comparator, Selector};
use fhe_lookup::lookup::{respond, setup, LookupClient, SlotCodec};
use fhe_lookup::metrics::Timings;
use fhe_lookup::params::ParamArgs;
use fhe_lookup::table::{check_unique_keys, read_table};

const NOT_FOUND: &str = "Country name not in the database.\
\n*** Please make sure to enter the name of a European Country\
\n*** with the first letter in upper case.";

#[derive(Parser)]
#[command(name = "fhe-lookup")]
#[command(about = "Privacy preserving search over an encrypted key/value table")]
#[command(version)]
struct Args {
    #[command(flatten)]
    params: ParamArgs,

    /// Size of the worker thread pool
    #[arg(long, default_value = "1")]
    nthreads: usize,

    /// Two-column CSV table
    #[arg(long, default_value = "data/countries_dataset.csv")]
    db_filename: PathBuf,

    /// Log per-entry progress and print phase timings
    #[arg(long)]
    debug: bool,

    /// Seed for deterministic key generation
    #[arg(long)]
    seed: Option<u64>,

    /// Also write the encrypted table to this file
    #[arg(long)]
    table_out: Option<PathBuf>,

    /// Query key (prompted for when absent)
    #[arg(long)]
    query: Option<String>,

    /// Run the encrypted integer comparison on X and Y instead of a lookup
    #[arg(long, num_args = 2, value_names = ["X", "Y"], allow_negative_numbers = true)]
    compare: Option<Vec<i16>>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.debug { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.nthreads.max(1))
        .build_global()
        .map_err(|e| eyre::eyre!("Failed to build thread pool: {}", e))?;

    println!();
    println!("=== Privacy Preserving Search ===");
    println!("Educational demonstration only: parameters are not tuned for security.");
    println!();

    let params = args.params.to_params();
    params
        .validate()
        .map_err(|e| eyre::eyre!("Invalid parameters: {}", e))?;

    let codec = SlotCodec::for_params(&params);
    let rows = read_table(&args.db_filename, &codec)
        .with_context(|| format!("Failed to load table {}", args.db_filename.display()))?;
    if let Err(e) = check_unique_keys(&rows) {
        warn!("{}; matching values will be summed", e);
    }
    info!("Loaded {} rows from {}", rows.len(), args.db_filename.display());

    let mut rng = match args.seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::from_entropy(),
    };
    let mut timings = Timings::new();

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message("Generating keys and encrypting the table...");
    pb.enable_steady_tick(Duration::from_millis(100));

    let (client, table) = setup(&params, &rows, &mut rng, &mut timings)
        .with_context(|| "Failed to initialise the encrypted table")?;

    pb.finish_with_message("Encrypted table ready");

    if let Some(path) = &args.table_out {
        timings
            .time("save table", || table.save(path))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Encrypted table written to {}", path.display());
    }

    println!("Number of slots: {}", params.slot_count());
    println!("Multiplicative depth per lookup: {}", params.lookup_depth());
    println!();
    println!("Initialization Completed - Ready for Queries");
    println!("--------------------------------------------");

    if let Some(operands) = &args.compare {
        if let [x, y] = operands.as_slice() {
            run_compare(&client, *x, *y, &mut timings)?;
        }
    } else {
        let query = match &args.query {
            Some(q) => q.clone(),
            None => prompt("Please enter the name of a European Country: ")?,
        };
        run_lookup(&client, &table.entries, &query, &mut timings)?;
    }

    if args.debug {
        println!();
        println!("Timings:");
        println!("{}", timings);
    }

    Ok(())
}

fn prompt(message: &str) -> Result<String> {
    print!("\n{}", message);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn run_lookup(
    client: &LookupClient,
    entries: &[fhe_lookup::table::EncryptedEntry],
    query: &str,
    timings: &mut Timings,
) -> Result<()> {
    println!("Looking for the Capital of {}", query);
    println!("This may take a few minutes ...");

    let encrypted_query = timings
        .time("encrypt query", || client.query(query))
        .with_context(|| format!("Cannot encode query {:?}", query))?;

    let evaluator = client.evaluator();
    let response = timings
        .time("lookup", || respond(&evaluator, entries, &encrypted_query))
        .with_context(|| "Encrypted lookup failed")?;

    let result = timings
        .time("decrypt", || client.extract(&response))
        .with_context(|| "Failed to decrypt the result")?;

    println!();
    println!("Query result: {}", result.as_deref().unwrap_or(NOT_FOUND));
    Ok(())
}

fn run_compare(client: &LookupClient, x: i16, y: i16, timings: &mut Timings) -> Result<()> {
    let evaluator = client.evaluator();
    let comparator = Comparator::new(&evaluator)?;

    let a = comparator.encrypt_operand(x)?;
    let b = comparator.encrypt_negated_operand(y)?;

    for (name, selector) in [("equality", Selector::AllBits), ("sign", Selector::SignBit)] {
        let mask = comparator.encrypt_selector(selector)?;
        let out = timings
            .time("compare", || comparator.compare(&a, &b, &mask))
            .with_context(|| "Encrypted comparison failed")?;
        let slots = client.keys().decrypt(&out)?;
        let value = slots.first().copied().unwrap_or(0);

        match selector {
            Selector::AllBits => println!(
                "{} {} {}: {} bit(s) of x - y set ({})",
                name,
                x,
                y,
                value,
                if value == 0 { "equal" } else { "different" }
            ),
            Selector::SignBit => println!(
                "{} {} {}: sign bit {} ({})",
                name,
                x,
                y,
                value,
                if value == 1 { "x < y" } else { "x >= y" }
            ),
        }
    }
    Ok(())
}
