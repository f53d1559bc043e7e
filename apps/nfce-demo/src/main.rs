//! # nfce-demo Entry Point
//!
//! ## Startup Sequence
//! 1. Initialize tracing (stderr, so stdout stays the coupon)
//! 2. Parse CLI flags
//! 3. Load the station profile
//! 4. Issue the coupon through `nfce-core`
//! 5. Print text or JSON

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Local;
use clap::Parser;
use nfce_core::locale::try_parse_locale_decimal;
use nfce_core::{PaymentMethod, Quantity};
use nfce_demo::render::{render_json, render_text};
use nfce_demo::{issue_coupon, AppResult, CouponRequest, StationProfile};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nfce-demo")]
#[command(about = "Prints a mock NFC-e fuel coupon with its access key and Pix code")]
#[command(version)]
struct Cli {
    /// Fuel code or name prefix from the station profile
    #[arg(short, long, default_value = "1")]
    fuel: String,

    /// Dispensed volume, pt-BR decimal ("40,123")
    #[arg(short, long, default_value = "40,000")]
    liters: String,

    /// cash | debit | credit | pix
    #[arg(short, long, default_value = "pix")]
    payment: String,

    /// Print the coupon as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Path to station.toml
    #[arg(short, long, env = "NFCE_CONFIG")]
    config: Option<PathBuf>,

    /// Seed for the access key nonce and Pix txid (reproducible output)
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "Coupon failed");
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> AppResult<()> {
    let profile = StationProfile::load(cli.config)?;
    info!(station = %profile.station.name, "Station profile ready");

    let liters = Quantity::from_decimal(try_parse_locale_decimal(&cli.liters)?);
    let payment: PaymentMethod = cli.payment.parse()?;

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let request = CouponRequest {
        fuel: cli.fuel,
        liters,
        payment,
        issued_at: Local::now().naive_local(),
    };
    let coupon = issue_coupon(&profile, &request, &mut rng)?;

    if cli.json {
        println!("{}", render_json(&coupon)?);
    } else {
        print!("{}", render_text(&coupon));
    }

    Ok(())
}

/// Initializes the tracing subscriber for logging.
///
/// ## Log Levels
/// - `RUST_LOG` wins when set
/// - Otherwise `info`, with `debug` for the nfce crates so every lenient
///   fallback in the core is visible
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,nfce=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
