use clap::{Parser, Subcommand};
use coupon_sdk::CouponClass;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod batch;
mod config;
mod error;
mod server;
mod signer;

use config::{IssuerConfig, DEFAULT_KEY_PATH};
use server::IssuerState;

#[derive(Parser)]
#[command(name = "issuer")]
#[command(about = "Signs allowlist coupons and serves them to mint clients")]
struct Cli {
    /// Key file to sign with, overriding COUPON_KEY_PATH
    #[arg(long, global = true)]
    key_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign a coupon for every allowlist entry and write <class>Coupons.json
    Generate {
        /// JSON object mapping addresses to allotted quantities
        #[arg(short, long)]
        allowlist: PathBuf,
        #[arg(short, long, default_value = "presale")]
        class: CouponClass,
        /// Output directory (defaults to COUPON_OUT_DIR)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Create a new signing key file
    Keygen {
        #[arg(short, long, default_value = DEFAULT_KEY_PATH)]
        out: PathBuf,
    },
    /// Print the issuer address the ledger must be configured with
    Address,
    /// Serve previously generated coupons over HTTP
    Serve {
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "issuer=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let mut config = IssuerConfig::from_env()?;
    if let Some(path) = cli.key_file {
        config = config.with_key_path(path);
    }

    match cli.command {
        Commands::Generate {
            allowlist,
            class,
            out,
        } => {
            if let Some(dir) = out {
                config = config.with_out_dir(dir);
            }
            let signer = signer::load_signer(&config)?;

            let summary = batch::run(&signer, class, &allowlist, &config.out_dir)?;
            for raw in &summary.skipped {
                warn!("Skipped {}", raw);
            }
            info!(
                "Issued {} {} coupons for issuer {}",
                summary.issued,
                class,
                signer.address().to_checksum()
            );
            println!("{}", summary.output.display());
            println!("sha256 {}", summary.pin);
        }
        Commands::Keygen { out } => {
            let signer = signer::generate_key_file(&out)?;
            println!("{}", signer.address().to_checksum());
        }
        Commands::Address => {
            let signer = signer::load_signer(&config)?;
            println!("{}", signer.address().to_checksum());
        }
        Commands::Serve { dir } => {
            if let Some(dir) = dir {
                config = config.with_out_dir(dir);
            }
            let signer = signer::load_signer(&config)?;

            info!("Starting coupon issuer");
            let state = Arc::new(IssuerState::load(signer.address(), &config.out_dir)?);
            server::run(state, &config).await?;
        }
    }

    Ok(())
}
