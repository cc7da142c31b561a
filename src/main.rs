use caroney::args::{Args, Command};
use caroney::cache::LedgerCache;
use caroney::{commands, ledger_store, Config, Mode, Result};
use chrono::Local;
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error ({}): {e}", e.error_type());
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().caroney_home().path();

    // When CARONEY_IN_TEST_MODE is set and non-empty the ledger is an in-memory sheet with seed
    // data, otherwise it is the Google sheet named in the config.
    let mode = Mode::from_env();
    let today = Local::now().date_naive();

    let _: () = match args.command() {
        Command::Init(init_args) => {
            commands::init(home, init_args.client_secret(), init_args.sheet_url())
                .await?
                .print()
        }

        Command::Auth(auth_args) => {
            let config = Config::load(home).await?;
            if auth_args.verify() {
                commands::auth_verify(&config).await?.print()
            } else {
                commands::auth(&config).await?.print()
            }
        }

        Command::Add(add_args) => {
            let (_, mut cache) = open(home, mode).await?;
            commands::add(&mut cache, add_args, today).await?.print()
        }

        Command::Update(update_args) => {
            let (_, mut cache) = open(home, mode).await?;
            commands::update(&mut cache, update_args).await?.print()
        }

        Command::Delete(delete_args) => {
            let (_, mut cache) = open(home, mode).await?;
            commands::delete(&mut cache, delete_args).await?.print()
        }

        Command::List(list_args) => {
            let (_, mut cache) = open(home, mode).await?;
            commands::list(&mut cache, list_args, today).await?.print()
        }

        Command::Export(export_args) => {
            let (config, mut cache) = open(home, mode).await?;
            commands::export(&config, &mut cache, export_args, today)
                .await?
                .print()
        }
    };
    Ok(())
}

/// Loads the config and opens a cache over the ledger store for `mode`.
async fn open(home: &Path, mode: Mode) -> Result<(Config, LedgerCache)> {
    let config = Config::load(home).await?;
    let store = ledger_store(&config, mode).await?;
    Ok((config, LedgerCache::new(store)))
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => EnvFilter::from_default_env(),
        // Without RUST_LOG only this crate logs, at the requested level.
        None => EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
