//! fhe-lookup-server: encrypted key/value store over HTTP
//!
//! Holds serialized ciphertexts only. Clients upload their public context and
//! encrypted rows, then send encrypted queries; lookups run on the blocking
//! pool.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use eyre::{Context, Result};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use fhe_lookup::http::{router, ServerState};
use fhe_lookup::store::MemoryStore;

#[derive(Parser)]
#[command(name = "fhe-lookup-server")]
#[command(about = "Encrypted lookup server")]
#[command(version)]
struct Args {
    /// Server bind address
    #[arg(long, default_value = "0.0.0.0:3000")]
    bind: String,

    /// Store snapshot, loaded at startup and rewritten after every upload
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Verbose logging
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

    info!("Encrypted lookup server");
    info!("Bind address: {}", args.bind);

    let load_start = Instant::now();
    let store = match &args.snapshot {
        Some(path) if path.exists() => MemoryStore::load_snapshot(path)
            .with_context(|| format!("Failed to load snapshot: {}", path.display()))?,
        Some(path) => {
            info!("Snapshot {} not found, starting empty", path.display());
            MemoryStore::new()
        }
        None => MemoryStore::new(),
    };
    info!("Store ready: {} keys ({:.2?})", store.len()?, load_start.elapsed());

    let state = Arc::new(ServerState::new(store, args.snapshot.clone()));
    let app = router(state);

    info!("Starting server on {}", args.bind);
    let listener = tokio::net::TcpListener::bind(&args.bind).await?;

    println!();
    println!("=== Encrypted Lookup Server Running ===");
    println!("Listening on: http://{}", args.bind);
    println!();
    println!("Endpoints:");
    println!("  GET  /health   - Health check");
    println!("  GET  /stats    - Stored rows and context status");
    println!("  POST /context  - Upload context and public keys");
    println!("  POST /entry    - Upload one encrypted row");
    println!("  POST /lookup   - Encrypted lookup");
    println!();

    axum::serve(listener, app).await?;

    Ok(())
}
