//! Merit daemon: mine a development chain or verify a saved state record.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use merit_crypto::{generate_keypair, BlsScheme};
use merit_node::{
    init_logging, read_state, write_state, Engine, LogFormat, Miner, NodeConfig,
    ShutdownController,
};
use merit_types::NetworkId;

#[derive(Parser)]
#[command(name = "merit-daemon", about = "Merit chain daemon")]
struct Cli {
    /// Network: "live", "test", "dev", or a raw network id.
    /// When a config file is provided, defaults to the file's network value.
    #[arg(long, env = "MERIT_NETWORK")]
    network: Option<String>,

    /// Threads for the proof search.
    #[arg(long, env = "MERIT_WORK_THREADS")]
    work_threads: Option<usize>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "MERIT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "MERIT_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Mine blocks on a fresh chain, attesting to each tip as the local
    /// validator, and write the resulting state record.
    Mine {
        /// Number of blocks to mine.
        #[arg(long, default_value_t = 10)]
        blocks: u64,

        /// Where to write the state record (stdout if omitted).
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replay a saved state record and report what it contains.
    Verify {
        #[arg(long)]
        state: PathBuf,
    },
}

fn parse_network(s: &str) -> NetworkId {
    match s.to_lowercase().as_str() {
        "live" => NetworkId::live(),
        "test" => NetworkId::test(),
        "dev" => NetworkId::dev(),
        _ => NetworkId::new(s),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = path.to_str().context("config path is not valid UTF-8")?;
            NodeConfig::from_toml_file(path).with_context(|| format!("loading {path}"))?
        }
        None => NodeConfig::default(),
    };
    if let Some(network) = &cli.network {
        config.network = parse_network(network);
    }
    if let Some(threads) = cli.work_threads {
        config.work_threads = threads;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    Ok(config)
}

async fn mine(config: NodeConfig, blocks: u64, out: Option<PathBuf>) -> anyhow::Result<()> {
    let params = config.chain_params();
    let validator = match config.validator_keypair()? {
        Some(keypair) => keypair,
        None => {
            let keypair = generate_keypair()?;
            tracing::info!(validator = %keypair.public, "no validator_seed configured, using a fresh key");
            keypair
        }
    };

    tracing::info!(
        network = %params.network_id,
        difficulty = %params.initial_difficulty,
        threads = config.work_threads,
        blocks,
        "mining"
    );

    let engine = Arc::new(Engine::new(BlsScheme, params, config.work_threads));
    let miner = Miner::new(Arc::clone(&engine)).with_validator(validator);

    let shutdown = Arc::new(ShutdownController::new());
    let signals = {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move { shutdown.wait_for_signal().await })
    };
    let mined = miner.run(Some(blocks), shutdown.subscribe()).await?;
    signals.abort();

    let snapshot = engine.snapshot()?;
    match out {
        Some(path) => {
            write_state(&path, &snapshot)?;
            tracing::info!(mined, path = %path.display(), "state record written");
        }
        None => println!("{}", serde_json::to_string_pretty(&snapshot.to_json()?)?),
    }
    Ok(())
}

fn verify(config: NodeConfig, state: PathBuf) -> anyhow::Result<()> {
    let snapshot = read_state(&state).with_context(|| format!("reading {}", state.display()))?;
    let (merit, consensus) = snapshot
        .restore(config.chain_params())
        .context("state record does not replay")?;

    tracing::info!(height = merit.height(), "state record verified");
    println!("height:     {}", merit.height());
    println!("tip:        {}", merit.tip().hash());
    println!("difficulty: {}", merit.difficulty());
    let removed: Vec<_> = consensus.removed().collect();
    if removed.is_empty() {
        println!("removed:    none");
    } else {
        for key in removed {
            println!("removed:    {key}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format, &config.log_level);
    if let Some(path) = &cli.config {
        tracing::info!("Loaded config from {}", path.display());
    }

    match cli.command {
        Command::Mine { blocks, out } => mine(config, blocks, out).await?,
        Command::Verify { state } => verify(config, state)?,
    }

    tracing::info!("Merit daemon exited cleanly");
    Ok(())
}
