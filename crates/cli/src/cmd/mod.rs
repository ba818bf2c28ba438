mod arch;
mod env;
mod freshness;
mod list;
mod migrate;
mod register;
mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use lamina_lib::config::Settings;
use lamina_lib::manifest::{FunctionConfiguration, ManifestStore};
use lamina_lib::registry::{FunctionRegistry, absolute_source};

use crate::output::print_info;

pub use arch::cmd_arch;
pub use env::{EnvCommand, cmd_env};
pub use freshness::{cmd_freshness, cmd_status};
pub use list::{cmd_list, cmd_show};
pub use migrate::cmd_migrate;
pub use register::{cmd_register, cmd_unregister};
pub use validate::{cmd_repair, cmd_validate};

fn registry(settings: &Settings) -> FunctionRegistry {
  FunctionRegistry::new(settings.workspace.clone(), ManifestStore::new(settings.defaults.clone()))
}

/// The function configured for `source`, or `None` after telling the user there is none.
fn lookup(registry: &FunctionRegistry, source: &Path) -> Result<Option<FunctionConfiguration>> {
  let source = absolute_source(source).with_context(|| format!("Invalid source path {}", source.display()))?;
  let found = registry.find_by_source_file(&source);
  if found.is_none() {
    print_info(&format!("No function is configured for {}", source.display()));
  }
  Ok(found)
}
