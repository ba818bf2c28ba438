mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lamina_lib::config::Settings;
use lamina_lib::manifest::EventType;
use lamina_lib::platform::Architecture;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cmd::EnvCommand;
use crate::output::{OutputFormat, print_error};

/// lamina - keeps serverless function manifests in step with their sources
#[derive(Parser)]
#[command(name = "lamina")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Workspace holding one directory per function
  #[arg(long, global = true, value_name = "DIR")]
  workspace: Option<PathBuf>,

  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// List every function attributable to a source file
  List {
    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Show the configuration of the function built from a source file
  Show {
    source: PathBuf,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Configure a source file as a function
  Register {
    source: PathBuf,

    /// Trigger kind (api, storage, stream, queue, schedule, generic)
    #[arg(short, long)]
    event_type: Option<EventType>,

    /// Function name (derived from the source path if omitted)
    #[arg(short, long)]
    name: Option<String>,

    /// Target architecture
    #[arg(long)]
    arch: Option<Architecture>,
  },

  /// Remove the function configured for a source file
  Unregister { source: PathBuf },

  /// Report whether a function needs rebuilding
  Freshness { source: PathBuf },

  /// Show build freshness for every function
  Status {
    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Check every manifest's private metadata
  Validate {
    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Rewrite a function's private metadata
  Repair {
    /// Function directory name
    name: String,

    /// Source file the function is built from
    #[arg(short, long)]
    source: PathBuf,

    #[arg(short, long)]
    event_type: Option<EventType>,
  },

  /// Import the legacy workspace-wide registry
  Migrate,

  /// Manage environment variables
  #[command(subcommand)]
  Env(EnvCommand),

  /// Change a function's target architecture
  Arch { source: PathBuf, architecture: Architecture },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let settings = Settings::resolve(cli.workspace);
  debug!(workspace = %settings.workspace, defaults = ?settings.defaults, "resolved settings");

  let result = match cli.command {
    Commands::List { output } => cmd::cmd_list(&settings, output),
    Commands::Show { source, output } => cmd::cmd_show(&settings, &source, output),
    Commands::Register {
      source,
      event_type,
      name,
      arch,
    } => cmd::cmd_register(&settings, source, event_type, name, arch),
    Commands::Unregister { source } => cmd::cmd_unregister(&settings, &source),
    Commands::Freshness { source } => cmd::cmd_freshness(&settings, &source),
    Commands::Status { output } => cmd::cmd_status(&settings, output),
    Commands::Validate { output } => cmd::cmd_validate(&settings, output),
    Commands::Repair {
      name,
      source,
      event_type,
    } => cmd::cmd_repair(&settings, &name, &source, event_type),
    Commands::Migrate => cmd::cmd_migrate(&settings),
    Commands::Env(command) => cmd::cmd_env(&settings, command),
    Commands::Arch { source, architecture } => cmd::cmd_arch(&settings, &source, architecture),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{:#}", e));
      ExitCode::FAILURE
    }
  }
}
