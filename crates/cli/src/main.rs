//! shipwright: cross-compile, stamp and publish release binaries.

mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use shipwright_lib::consts::{CONFIG_FILE, VERSION_OVERRIDE_ENV};

use cmd::{RunArgs, cmd_info, cmd_plan, cmd_run, cmd_tasks};
use output::OutputFormat;

/// Cross-compile, stamp and publish release binaries
#[derive(Parser)]
#[command(name = "shipwright")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Path to the project file; its directory is the project root
  #[arg(short, long, global = true, default_value = CONFIG_FILE)]
  config: PathBuf,

  /// Raise log verbosity (-v info, -vv debug)
  #[arg(short, long, global = true, action = ArgAction::Count)]
  verbose: u8,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run tasks and everything they depend on
  Run(RunArgs),

  /// Show the execution waves of tasks without running them
  Plan {
    /// Tasks to plan (default: build-all)
    tasks: Vec<String>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// List every task with its dependencies
  Tasks {
    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Show the host platform, target matrix and release version
  Info {
    /// Explicit release version
    #[arg(long, env = VERSION_OVERRIDE_ENV)]
    release_version: Option<String>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },
}

fn init_logging(verbose: u8) {
  let default = match verbose {
    0 => "warn",
    1 => "info",
    _ => "debug",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  match cli.command {
    Commands::Run(args) => cmd_run(&cli.config, args),
    Commands::Plan { tasks, output } => cmd_plan(&cli.config, &tasks, output),
    Commands::Tasks { output } => cmd_tasks(&cli.config, output),
    Commands::Info {
      release_version,
      output,
    } => cmd_info(&cli.config, release_version.as_deref(), output),
  }
}
