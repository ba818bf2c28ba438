use std::path::Path;

use anyhow::{Context, Result};
use lamina_lib::config::Settings;
use lamina_lib::platform::Architecture;

use super::{lookup, registry};
use crate::output::{print_info, print_success};

pub fn cmd_arch(settings: &Settings, source: &Path, architecture: Architecture) -> Result<()> {
  let registry = registry(settings);
  let Some(config) = lookup(&registry, source)? else {
    return Ok(());
  };

  if config.architecture == architecture {
    print_info(&format!("{} already targets {}", config.name, architecture));
    return Ok(());
  }

  registry
    .store()
    .update_architecture(&config.function_dir, architecture)
    .with_context(|| format!("Failed to update architecture of {}", config.name))?;
  print_success(&format!(
    "{} now targets {} (GOARCH={})",
    config.name,
    architecture,
    architecture.goarch()
  ));
  Ok(())
}
