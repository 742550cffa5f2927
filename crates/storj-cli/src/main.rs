//! Uplink CLI binary (§6): `mb`/`rb`/`cp`/`cat`/`ls`/`rm` over `sj://` URLs
//! against a local, durable satellite+storage-node stack.

mod commands;
mod config;
mod error;
mod network;
mod url;
mod workspace;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use config::{Config, ConfigOverrides};
use error::CliError;
use workspace::Workspace;

#[derive(Debug, Parser)]
#[command(name = "storj", about = "Uplink command-line client", version)]
struct Cli {
    /// Path to the config file (default: platform per-user config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a bucket: `mb sj://bucket/`
    Mb { url: String },
    /// Delete a bucket: `rb sj://bucket/`
    Rb { url: String },
    /// Upload, download, or copy an object. `-` denotes stdin/stdout.
    Cp { src: String, dst: String },
    /// Stream an object to stdout: `cat sj://bucket/obj`
    Cat { url: String },
    /// List objects: `ls sj://bucket[/prefix]`
    Ls { url: String },
    /// Delete an object: `rm sj://bucket/obj`
    Rm { url: String },
}

#[tokio::main]
async fn main() {
    storj_logging::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref(), cli.overrides).map_err(CliError::Other)?;
    let default_dir = directories::ProjectDirs::from("io", "storj", "storj-cli")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    let workspace = Workspace::open(&config, &default_dir).map_err(CliError::Other)?;

    match cli.command {
        Command::Mb { url } => commands::mb(&workspace, &url).await,
        Command::Rb { url } => commands::rb(&workspace, &url).await,
        Command::Cp { src, dst } => commands::cp(&workspace, &src, &dst).await,
        Command::Cat { url } => commands::cat(&workspace, &url).await,
        Command::Ls { url } => {
            let names = commands::ls(&workspace, &url).await?;
            for name in names {
                println!("{name}");
            }
            Ok(())
        }
        Command::Rm { url } => commands::rm(&workspace, &url).await,
    }
}
