//! my-closet command line front end
//!
//! Opens the catalog in the user's data directory and runs one repository
//! operation per invocation.

use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use my_closet::{logging, ClosetConfig, FileUriResolver, Repository};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "my-closet")]
#[command(about = "Catalog your clothes, categories and outfits", long_about = None)]
struct Cli {
    /// Directory holding the database and photos (MY_CLOSET_DATA_DIR wins if set)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: commands::Command,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClosetConfig::resolve(cli.data_dir.as_deref())?;
    debug!(data_dir = %config.data_dir.display(), "resolved configuration");

    // One store handle for the whole process, handed to the repository
    let repo = Repository::open(&config, Arc::new(FileUriResolver))?;
    repo.initialize_default_categories()?;

    let output = commands::Output { json: cli.json };
    commands::execute(&repo, cli.command, &output)
}
