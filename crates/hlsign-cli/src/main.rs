//! hlsign - sign Hyperliquid exchange actions from the command line.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use hlsign_cli::commands::{self, OrderParams};
use hlsign_cli::{init_logging, CliConfig, LogFormat};
use hlsign_core::{BuilderInfo, Cloid, KeyManager, NonceManager, Signer, Tif};
use tracing::info;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via HLSIGN_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log format on stderr (default: json when RUST_ENV=production, else text)
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the address of the configured key
    Address,
    /// Print the action hash and phantom agent of an exchange action
    Hash {
        /// Action JSON file ("-" for stdin)
        action: PathBuf,
        #[arg(long)]
        nonce: Option<u64>,
    },
    /// Sign an exchange (L1) action
    SignL1 {
        action: PathBuf,
        #[arg(long)]
        nonce: Option<u64>,
    },
    /// Sign a user-signed action (nonce taken from the action)
    SignUser { action: PathBuf },
    /// Sign a multiSig envelope action as the outer signer
    SignMultisig {
        action: PathBuf,
        #[arg(long)]
        nonce: Option<u64>,
    },
    /// Print the EIP-712 typed data for an action without signing
    TypedData {
        action: PathBuf,
        #[arg(long)]
        nonce: Option<u64>,
    },
    /// Build and sign a single limit order
    Order {
        #[arg(long)]
        coin: String,
        #[arg(long, value_enum)]
        side: Side,
        #[arg(long)]
        sz: f64,
        #[arg(long)]
        px: f64,
        #[arg(long, value_enum, default_value_t = TifArg::Gtc)]
        tif: TifArg,
        #[arg(long)]
        reduce_only: bool,
        /// Client order id, 0x + 32 hex digits
        #[arg(long)]
        cloid: Option<String>,
        /// Builder address; requires --builder-fee
        #[arg(long, requires = "builder_fee")]
        builder: Option<String>,
        /// Builder fee in tenths of a basis point
        #[arg(long)]
        builder_fee: Option<u64>,
        #[arg(long)]
        nonce: Option<u64>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Side {
    Buy,
    Sell,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TifArg {
    Alo,
    Ioc,
    Gtc,
}

impl From<TifArg> for Tif {
    fn from(tif: TifArg) -> Self {
        match tif {
            TifArg::Alo => Tif::Alo,
            TifArg::Ioc => Tif::Ioc,
            TifArg::Gtc => Tif::Gtc,
        }
    }
}

fn load_signer(config: &CliConfig) -> Result<Signer> {
    let key_manager = KeyManager::load(&config.key.to_source(), config.expected_address()?)?;
    Ok(Signer::new(Arc::new(key_manager), config.is_mainnet()))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.log_format.unwrap_or_else(LogFormat::from_env))?;
    info!("hlsign v{}", env!("CARGO_PKG_VERSION"));

    let config = CliConfig::load(args.config)?;
    info!(network = ?config.network, "Configuration loaded");

    let nonces = NonceManager::with_system_clock();
    let nonce_or_now = |nonce: Option<u64>| nonce.unwrap_or_else(|| nonces.next());

    match args.command {
        Command::Address => print_json(&commands::address(&load_signer(&config)?)),
        Command::Hash { action, nonce } => {
            let action = commands::read_action(&action)?;
            print_json(&commands::hash(&config, &action, nonce_or_now(nonce))?)
        }
        Command::SignL1 { action, nonce } => {
            let signer = load_signer(&config)?;
            let action = commands::read_action(&action)?;
            print_json(&commands::sign_l1(&signer, &config, action, nonce_or_now(nonce))?)
        }
        Command::SignUser { action } => {
            let signer = load_signer(&config)?;
            let action = commands::read_action(&action)?;
            print_json(&commands::sign_user(&signer, &config, action)?)
        }
        Command::SignMultisig { action, nonce } => {
            let signer = load_signer(&config)?;
            let action = commands::read_action(&action)?;
            print_json(&commands::sign_multi_sig(
                &signer,
                &config,
                action,
                nonce_or_now(nonce),
            )?)
        }
        Command::TypedData { action, nonce } => {
            let action = commands::read_action(&action)?;
            print_json(&commands::typed_data(&config, action, nonce_or_now(nonce))?)
        }
        Command::Order {
            coin,
            side,
            sz,
            px,
            tif,
            reduce_only,
            cloid,
            builder,
            builder_fee,
            nonce,
        } => {
            let signer = load_signer(&config)?;
            let cloid = cloid.as_deref().map(Cloid::from_str).transpose()?;
            let builder = match (builder, builder_fee) {
                (Some(address), Some(fee)) => Some(BuilderInfo::new(&address, fee)?),
                _ => None,
            };
            let params = OrderParams {
                coin,
                is_buy: matches!(side, Side::Buy),
                sz,
                limit_px: px,
                tif: tif.into(),
                reduce_only,
                cloid,
                builder,
            };
            print_json(&commands::order(&signer, &config, params, nonce_or_now(nonce))?)
        }
    }
}
