use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use lockpool::config::{CheckRequest, InRequest, OutRequest};
use lockpool::error::Result;
use lockpool::output::{self, Format};

#[derive(Parser)]
#[command(
    name = "lockpool",
    version,
    about = "Pool of reusable locks stored in a git branch"
)]
struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value = "json")]
    format: Format,
    /// Increase log verbosity (repeatable)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

/// Each command reads its JSON request from stdin.
#[derive(Subcommand)]
enum Commands {
    /// List versions of the pool, oldest first
    Check,
    /// Fetch the lock changed at a version into a directory
    In {
        /// Directory to write `name` and `metadata` into
        dest: PathBuf,
    },
    /// Claim, release, remove, or add a lock
    Out {
        /// Directory that lock sources in params are relative to
        sources: PathBuf,
    },
}

fn read_request<T: serde::de::DeserializeOwned>() -> Result<T> {
    let input = std::io::read_to_string(std::io::stdin())?;
    Ok(serde_json::from_str(&input)?)
}

fn run(cli: Cli, format: Format) -> Result<()> {
    match cli.command {
        Commands::Check => {
            let request: CheckRequest = read_request()?;
            lockpool::commands::check::run(&request, format)
        }
        Commands::In { dest } => {
            let request: InRequest = read_request()?;
            lockpool::commands::fetch::run(&request, &dest, format)
        }
        Commands::Out { sources } => {
            let request: OutRequest = read_request()?;
            lockpool::commands::out::run(&request, &sources, format)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    lockpool::logging::setup_logger(cli.verbose);
    if let Some(sha) = lockpool::build_info::git_sha() {
        log::debug!("lockpool build {sha}");
    }

    let format = cli.format;
    if let Err(e) = run(cli, format) {
        eprintln!("{}", output::error_message(e.code(), &e.to_string(), format));
        std::process::exit(e.exit_code());
    }
}
