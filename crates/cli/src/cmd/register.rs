use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lamina_lib::config::Settings;
use lamina_lib::manifest::EventType;
use lamina_lib::platform::Architecture;
use lamina_lib::registry::{NewFunction, absolute_source};

use super::list::print_configuration;
use super::registry;
use crate::output::{print_info, print_success};

pub fn cmd_register(
  settings: &Settings,
  source: PathBuf,
  event_type: Option<EventType>,
  name: Option<String>,
  architecture: Option<Architecture>,
) -> Result<()> {
  let request = NewFunction {
    event_type,
    name,
    architecture,
    ..NewFunction::new(source)
  };

  let config = registry(settings)
    .register(&request)
    .with_context(|| format!("Failed to register {}", request.source_file.display()))?;
  print_configuration(&config);
  Ok(())
}

pub fn cmd_unregister(settings: &Settings, source: &Path) -> Result<()> {
  let source = absolute_source(source)?;
  match registry(settings).unregister(&source)? {
    Some(dir) => print_success(&format!("Removed {}", dir.display())),
    None => print_info(&format!("No function is configured for {}", source.display())),
  }
  Ok(())
}
