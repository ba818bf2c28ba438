//! Settings resolved once at startup and handed to each component.

use std::path::PathBuf;

use tracing::warn;

use crate::consts::{DEFAULT_MEMORY_SIZE, DEFAULT_RUNTIME, DEFAULT_TIMEOUT};
use crate::platform::Architecture;
use crate::platform::paths::workspace_dir;
use crate::workspace::WorkspacePath;

pub const DEFAULT_RUNTIME_ENV: &str = "LAMINA_DEFAULT_RUNTIME";
pub const DEFAULT_ARCH_ENV: &str = "LAMINA_DEFAULT_ARCH";
pub const DEFAULT_MEMORY_ENV: &str = "LAMINA_DEFAULT_MEMORY";
pub const DEFAULT_TIMEOUT_ENV: &str = "LAMINA_DEFAULT_TIMEOUT";

/// Values used for new functions and for fields no manifest declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDefaults {
  pub runtime: String,
  pub architecture: Architecture,
  pub memory_size: u32,
  pub timeout: u32,
}

impl Default for FunctionDefaults {
  fn default() -> Self {
    Self {
      runtime: DEFAULT_RUNTIME.to_string(),
      architecture: Architecture::default(),
      memory_size: DEFAULT_MEMORY_SIZE,
      timeout: DEFAULT_TIMEOUT,
    }
  }
}

impl FunctionDefaults {
  /// Built-in defaults with `LAMINA_DEFAULT_*` overrides applied.
  ///
  /// Unparseable overrides are logged and ignored.
  pub fn from_env() -> Self {
    let mut defaults = Self::default();

    if let Ok(runtime) = std::env::var(DEFAULT_RUNTIME_ENV)
      && !runtime.trim().is_empty()
    {
      defaults.runtime = runtime.trim().to_string();
    }

    if let Ok(arch) = std::env::var(DEFAULT_ARCH_ENV) {
      match Architecture::from_tag(&arch) {
        Some(arch) => defaults.architecture = arch,
        None => warn!(var = DEFAULT_ARCH_ENV, value = %arch, "ignoring unknown architecture"),
      }
    }

    if let Some(memory) = read_u32(DEFAULT_MEMORY_ENV) {
      defaults.memory_size = memory;
    }

    if let Some(timeout) = read_u32(DEFAULT_TIMEOUT_ENV) {
      defaults.timeout = timeout;
    }

    defaults
  }
}

fn read_u32(var: &str) -> Option<u32> {
  let value = std::env::var(var).ok()?;
  match value.trim().parse() {
    Ok(n) => Some(n),
    Err(_) => {
      warn!(var, value = %value, "ignoring non-numeric override");
      None
    }
  }
}

#[derive(Debug, Clone)]
pub struct Settings {
  pub workspace: WorkspacePath,
  pub defaults: FunctionDefaults,
}

impl Settings {
  /// Resolves settings: an explicit workspace wins over `LAMINA_WORKSPACE`
  /// and the data directory default.
  pub fn resolve(workspace_override: Option<PathBuf>) -> Self {
    let workspace = workspace_override.unwrap_or_else(workspace_dir);
    Self {
      workspace: WorkspacePath::new(workspace),
      defaults: FunctionDefaults::from_env(),
    }
  }
}
