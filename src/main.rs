//! Three-Body Fair CLI
//!
//! Runs a demo round against in-memory collaborators, inspects the entropy
//! source, and audits published verification bundles.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use three_body_fair::{
    VERSION,
    config::FairnessConfig,
    physics::{simulate, Schedule, TIME_STEP},
    proof::{generate_audit_report, parse_bundle, verify_bundle, GameInfo, Payout, SpinMode},
    session::{MemoryCache, MemorySessionStore, SessionService},
};

#[derive(Parser, Debug)]
#[command(name = "three-body-fair", version)]
#[command(about = "Provably-fair spins from three-body physics entropy")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create, reveal and verify one round with in-memory storage
    Demo {
        /// Player seed for the demo round
        #[arg(long, default_value = "demo-client-seed")]
        client_seed: String,
    },

    /// Run the entropy source on a seed and print the digest
    Simulate {
        /// Seed string
        seed: String,

        /// Simulated time units
        #[arg(long, default_value_t = Schedule::HOUSE_SEED.duration)]
        duration: f64,
    },

    /// Verify a published bundle and print the audit report
    VerifyBundle {
        /// Path to the bundle JSON file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("three-body-fair failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when a verification ran and failed.
async fn run(command: Command) -> Result<bool> {
    match command {
        Command::Demo { client_seed } => demo_round(&client_seed).await,
        Command::Simulate { seed, duration } => {
            simulate_seed(&seed, duration);
            Ok(true)
        }
        Command::VerifyBundle { path } => verify_bundle_file(&path),
    }
}

/// Demo function to exercise the full lifecycle.
async fn demo_round(client_seed: &str) -> Result<bool> {
    info!("Three-Body Fair v{}", VERSION);

    let config = FairnessConfig::from_env().context("Failed to load configuration")?;
    let service = SessionService::from_config(Arc::new(MemorySessionStore::new()), &config)
        .context("Invalid outcome configuration")?
        .with_cache(Arc::new(MemoryCache::new()));

    info!("=== Creating Session ===");
    let created = service.create().await?;
    info!("Session: {}", created.session_id);
    info!("Commitment: {}", created.commitment);
    info!("Expires: {}", created.expires_at);

    info!("=== Revealing ===");
    let outcome = service.reveal(created.session_id, client_seed).await?;
    info!("House seed: {}", outcome.house_seed);
    info!("Entropy: {}", outcome.proof.entropy_hex);
    let reels = service.deriver().config().reel_count;
    for (row, symbols) in outcome.symbols.chunks(reels).enumerate() {
        info!("Row {}: {}", row, symbols.join(" "));
    }

    info!("=== Verifying ===");
    let verified = service.verify_session(created.session_id, None).await?;
    info!(
        "Commitment: {}, entropy: {}, signature: {}",
        verified.verification.checks.commitment_valid,
        verified.verification.checks.entropy_valid,
        verified.verification.checks.signature_valid,
    );

    println!("{}", serde_json::to_string_pretty(&outcome.proof)?);

    let game = GameInfo {
        id: "three-body-fair-demo".to_string(),
        math_version: VERSION.to_string(),
        reel_strips_hash: None,
    };
    let payout = Payout { bet: 0.0, win: 0.0, currency: "DEMO".to_string() };
    let bundle = service
        .export_bundle(created.session_id, game, SpinMode::Demo, payout)
        .await?;
    println!("{}", serde_json::to_string_pretty(&bundle)?);

    let stats = service.stats().await?;
    info!("Sessions: {} total, {} revealed", stats.total, stats.revealed);

    Ok(verified.verification.valid)
}

fn simulate_seed(seed: &str, duration: f64) {
    let schedule = Schedule { duration, time_step: TIME_STEP };
    info!("Simulating {} steps of {}", schedule.steps(), schedule.time_step);

    let out = simulate(seed.as_bytes(), schedule);
    println!("entropy: {}", out.entropy_hex);
    for (i, angles) in out.theta_angles.iter().enumerate() {
        println!(
            "body {}: theta={:.6} phi={:.6} r={:.6}",
            i, angles.theta, angles.phi, angles.r
        );
    }
}

fn verify_bundle_file(path: &Path) -> Result<bool> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let bundle = parse_bundle(&json).with_context(|| format!("Failed to parse {}", path.display()))?;

    let output = verify_bundle(&bundle);
    print!("{}", generate_audit_report(&bundle, &output, chrono::Utc::now()));
    info!("{}", output.summary);

    Ok(output.ok)
}
