use std::path::PathBuf;

use anyhow::{Context, ensure};
use clap::Parser;
use kinesync_loopback::input::WanderInput;
use kinesync_loopback::{LinkConfig, Loopback};
use kinesync_sim::SimConfig;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Headless prediction/reconciliation loop over a simulated lossy link.
#[derive(Parser, Debug)]
#[command(name = "kinesync-loopback", version)]
struct Args {
    /// TOML simulation config; defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fixed ticks to run.
    #[arg(long, default_value_t = 1000)]
    ticks: u64,

    /// Connected players, each driven by a seeded random walk.
    #[arg(long, default_value_t = 2)]
    players: u16,

    /// One-way latency in ticks.
    #[arg(long, default_value_t = 3)]
    latency: u64,

    /// Probability that an unreliable packet is dropped.
    #[arg(long, default_value_t = 0.0)]
    loss: f64,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Log level used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    ensure!(
        (0.0..=1.0).contains(&args.loss),
        "--loss must be within [0, 1], got {}",
        args.loss
    );

    let config = match &args.config {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SimConfig::default(),
    };

    info!(
        tick_rate_hz = config.tick_rate_hz,
        players = args.players,
        latency = args.latency,
        loss = args.loss,
        seed = args.seed,
        "starting loopback"
    );

    let mut loopback = Loopback::new(config, LinkConfig::new(args.latency, args.loss), args.seed);
    for index in 0..args.players {
        let input = WanderInput::new(args.seed.wrapping_add(u64::from(index)), 25);
        loopback.connect(&format!("bot-{index}"), Box::new(input));
    }

    loopback.run(args.ticks);

    for (player_id, stats) in loopback.prediction_stats() {
        info!(
            player_id,
            predicted = stats.ticks_predicted,
            converged = stats.converged,
            smoothed = stats.smoothed,
            snapped = stats.snapped,
            replayed = stats.ticks_replayed,
            error = ?loopback.last_snapshot_error(player_id),
            "prediction summary"
        );
    }
    info!("final server digest {:016x}", loopback.server_digest());

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}
