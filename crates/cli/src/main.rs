mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::Session;

/// dexrule - declare and run Java to dex build pipelines
#[derive(Parser)]
#[command(name = "dexrule")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Toolchain file (default: $DEXRULE_TOOLCHAIN, then built-in paths)
  #[arg(long, global = true)]
  toolchain: Option<PathBuf>,

  /// Directory module outputs are written below
  #[arg(long, global = true, default_value = "out")]
  out_dir: PathBuf,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// List the registered build rules
  Rules {
    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Show the steps the given modules declare
  Plan {
    /// Module files
    #[arg(required = true)]
    modules: Vec<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
  },

  /// Write the given modules' steps as a Ninja file
  Gen {
    /// Module files
    #[arg(required = true)]
    modules: Vec<PathBuf>,

    /// Ninja file to write
    #[arg(short, long, default_value = "build.ninja")]
    output: PathBuf,
  },

  /// Build the given modules locally
  Run {
    /// Module files
    #[arg(required = true)]
    modules: Vec<PathBuf>,

    /// Maximum number of commands running at once (default: CPU count)
    #[arg(short, long)]
    jobs: Option<usize>,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let session = Session::new(cli.toolchain.as_deref(), cli.out_dir)?;

  match cli.command {
    Commands::Rules { json } => cmd::cmd_rules(&session, json),
    Commands::Plan { modules, json } => cmd::cmd_plan(&session, &modules, json, cli.verbose),
    Commands::Gen { modules, output } => cmd::cmd_gen(&session, &modules, &output),
    Commands::Run { modules, jobs } => cmd::cmd_run(&session, &modules, jobs),
  }
}
