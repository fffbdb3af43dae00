pub mod batch;
pub mod classify;
pub mod cli;
pub mod compare;
pub mod dataset;
pub mod error;
pub mod export;
pub mod normalize;
pub mod preview;
pub mod profile;
pub mod scan;
pub mod store;
pub mod table;
pub mod unify;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_reconcile", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Detect(args) => classify::execute(&args),
        Commands::Compare(args) => compare::execute(&args),
        Commands::Unify(args) => unify::execute(&args),
        Commands::Profile(args) => profile::execute(&args),
        Commands::Scan(args) => scan::execute(&args),
        Commands::Export(args) => export::execute(&args),
        Commands::Batch(args) => batch::execute(&args),
        Commands::Preview(args) => preview::execute(&args),
    }
}
