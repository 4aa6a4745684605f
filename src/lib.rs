pub mod apply;
pub mod cache;
pub mod cli;
pub mod data;
pub mod duplicates;
pub mod error;
pub mod import_cmd;
pub mod infer;
pub mod io_utils;
pub mod mapping;
pub mod preview;
pub mod profile;
pub mod schema;
pub mod session;
pub mod store;
pub mod table;
pub mod tabular;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, debug};

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("object_import", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    debug!("Parsed command line: {:?}", cli.command);
    match cli.command {
        Commands::Parse(args) => preview::execute(&args),
        Commands::Map(args) => import_cmd::execute_map(&args),
        Commands::Duplicates(args) => import_cmd::execute_duplicates(&args),
        Commands::Import(args) => import_cmd::execute_import(&args),
    }
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
