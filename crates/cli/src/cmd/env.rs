use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use lamina_lib::config::Settings;
use lamina_lib::manifest::EnvironmentOrigin;

use super::{lookup, registry};
use crate::output::print_success;

#[derive(Subcommand, Debug)]
pub enum EnvCommand {
  /// Replace a function's environment variables
  Set {
    source: PathBuf,

    /// Variables as KEY=VALUE; an empty list clears them
    #[arg(value_parser = parse_assignment)]
    vars: Vec<(String, String)>,

    /// Label of the external source the values were synced from
    #[arg(long)]
    origin: Option<String>,
  },
}

pub fn cmd_env(settings: &Settings, command: EnvCommand) -> Result<()> {
  match command {
    EnvCommand::Set { source, vars, origin } => cmd_set(settings, &source, vars, origin),
  }
}

fn cmd_set(settings: &Settings, source: &Path, vars: Vec<(String, String)>, origin: Option<String>) -> Result<()> {
  let registry = registry(settings);
  let Some(config) = lookup(&registry, source)? else {
    return Ok(());
  };

  let variables: BTreeMap<String, String> = vars.into_iter().collect();
  let origin = match origin {
    Some(label) => EnvironmentOrigin::External { label },
    None => EnvironmentOrigin::Manual,
  };

  registry
    .store()
    .update_environment(&config.function_dir, &variables, &origin)
    .with_context(|| format!("Failed to update environment of {}", config.name))?;
  print_success(&format!("Set {} variable(s) on {}", variables.len(), config.name));
  Ok(())
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
  match raw.split_once('=') {
    Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
    _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
  }
}
