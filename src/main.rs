//! crashd Node Binary
//!
//! Runs the full stack: engine, RocksDB round history, the croupier
//! driver, and the HTTP/WebSocket API.

use clap::Parser;
use crashd::api::{ApiServer, ApiServerConfig};
use crashd::bank::InMemoryBank;
use crashd::clock::SystemClock;
use crashd::config::NodeConfig;
use crashd::croupier::Croupier;
use crashd::engine::CrashGame;
use crashd::metrics::EngineMetrics;
use crashd::store::RoundStore;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "crashd")]
#[command(about = "Provably fair crash game daemon", long_about = None)]
struct Args {
    /// Path to TOML config file (flags below override it)
    #[arg(long)]
    config: Option<String>,

    /// API server host
    #[arg(long)]
    host: Option<String>,

    /// API server port
    #[arg(long)]
    port: Option<u16>,

    /// Database directory
    #[arg(long)]
    db_path: Option<String>,

    /// Operator account allowed to commit rounds and change limits
    #[arg(long)]
    operator: Option<String>,

    /// Run without the built-in croupier (rounds driven externally)
    #[arg(long)]
    no_croupier: bool,

    /// House liquidity minted into escrow at startup; winning payouts
    /// exceed the stakes backing them and draw on this float
    #[arg(long, default_value = "100000000")]
    house_float: u64,

    /// Node ID
    #[arg(long, default_value = "crashd-node-1")]
    node_id: String,

    /// Network name
    #[arg(long, default_value = "crashd-devnet")]
    network: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,crashd=debug".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => NodeConfig::load(path)?,
        None => NodeConfig::default(),
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(db_path) = args.db_path {
        config.storage.data_directory = db_path;
    }
    if args.no_croupier {
        config.croupier.enabled = false;
    }
    config.validate()?;

    let operator = args
        .operator
        .unwrap_or_else(|| config.croupier.operator_id.clone());

    info!("🎰 Starting crashd");
    info!("   Node ID: {}", args.node_id);
    info!("   Network: {}", args.network);
    info!("   Operator: {}", operator);
    info!("   Database: {}", config.storage.data_directory);

    let store = RoundStore::open(&config.storage.data_directory)?;
    let bank = Arc::new(InMemoryBank::new());
    bank.deposit(crashd::bank::ESCROW_ACCOUNT, args.house_float);
    let clock = Arc::new(SystemClock);
    let metrics = Arc::new(EngineMetrics::new()?);

    let game = Arc::new(CrashGame::open(
        config.game.clone(),
        operator,
        bank.clone(),
        clock,
        store.clone(),
        metrics.clone(),
    )?);

    info!(
        "   Resuming at round {} ({} units burned to date)",
        game.current_round_id(),
        game.total_burned()
    );

    let croupier = if config.croupier.enabled {
        Some(Croupier::spawn(game.clone(), config.croupier.clone()))
    } else {
        info!("   Croupier disabled; rounds must be driven via the API");
        None
    };

    let api_config =
        ApiServerConfig::from_server_config(&config.server, args.node_id, args.network);
    let server = ApiServer::new(api_config, game, store, metrics, Some(bank));
    server.run().await?;

    if let Some(croupier) = croupier {
        croupier.stop();
    }

    info!("crashd shut down");
    Ok(())
}
