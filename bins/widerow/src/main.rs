use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod record;
mod rows;

#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

#[derive(Parser)]
#[clap(version, about = "Read and write records in a local wide-column store")]
#[clap(propagate_version = true)]
struct Cli {
    /// Path to the RocksDB database directory
    #[clap(long, short = 'p')]
    db_dir: PathBuf,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List column families in the store
    Families,
    /// Encode a JSON record and write it to a row
    Put(record::Put),
    /// Read and decode a record from a row
    Get(record::Get),
    /// Dump the raw columns of a row
    Scan(rows::Scan),
}

fn main() {
    widerow_core::telemetry::init_cli_subscriber("warn");

    let cli = Cli::parse();
    debug!(db_dir = ?cli.db_dir, "starting");

    let result = match &cli.command {
        Commands::Families => rows::run_families(&cli.db_dir),
        Commands::Put(args) => record::run_put(&cli.db_dir, args),
        Commands::Get(args) => record::run_get(&cli.db_dir, args),
        Commands::Scan(args) => rows::run_scan(&cli.db_dir, args),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }
}
