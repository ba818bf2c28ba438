//! Mapping between source files and function identity.
//!
//! Every lookup scans the workspace: one directory per function, each with a
//! manifest whose private metadata names the source file it was created
//! from. Workspaces hold tens of functions, so a linear scan per lookup is
//! fine.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::consts::{DEFAULT_FUNCTION_NAME, GENERIC_DIR_NAMES};
use crate::events::{self, EventError};
use crate::freshness::{BuildFreshnessOracle, FileStat, Freshness};
use crate::manifest::{EventType, FunctionConfiguration, ManifestError, ManifestStore};
use crate::platform::Architecture;
use crate::validate::{MetadataState, classify};
use crate::workspace::{WorkspacePath, manifest_path};

#[derive(Debug, Error)]
pub enum RegistryError {
  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error(transparent)]
  Event(#[from] EventError),

  #[error("cannot resolve source file {}: {source}", path.display())]
  InvalidSource { path: PathBuf, source: io::Error },

  #[error("failed to create function directory {}: {source}", path.display())]
  CreateDir { path: PathBuf, source: io::Error },

  #[error("failed to remove function directory {}: {source}", path.display())]
  Remove { path: PathBuf, source: io::Error },
}

/// A function directory whose manifest could not be read.
#[derive(Debug)]
pub struct ScanFailure {
  pub function_dir: PathBuf,
  pub error: ManifestError,
}

/// Outcome of scanning a workspace.
///
/// Per-directory problems are collected here instead of aborting the scan.
#[derive(Debug, Default)]
pub struct ScanReport {
  /// Functions whose manifest carries private metadata.
  pub functions: Vec<FunctionConfiguration>,
  /// Readable manifests without private metadata.
  pub unattributed: Vec<PathBuf>,
  pub failures: Vec<ScanFailure>,
}

/// Request to register a source file as a function.
#[derive(Debug, Clone, Default)]
pub struct NewFunction {
  pub source_file: PathBuf,
  pub event_type: Option<EventType>,
  pub name: Option<String>,
  pub architecture: Option<Architecture>,
  pub runtime: Option<String>,
}

impl NewFunction {
  pub fn new(source_file: impl Into<PathBuf>) -> Self {
    Self {
      source_file: source_file.into(),
      ..Default::default()
    }
  }
}

#[derive(Debug, Clone)]
pub struct FunctionRegistry {
  workspace: WorkspacePath,
  store: ManifestStore,
}

impl FunctionRegistry {
  pub fn new(workspace: WorkspacePath, store: ManifestStore) -> Self {
    Self { workspace, store }
  }

  pub fn workspace(&self) -> &WorkspacePath {
    &self.workspace
  }

  pub fn store(&self) -> &ManifestStore {
    &self.store
  }

  /// Scan every function directory that holds a manifest.
  ///
  /// Only manifests with complete private metadata are attributed to a
  /// source file; the rest are reported as unattributed.
  pub fn scan(&self) -> ScanReport {
    let mut report = ScanReport::default();

    for dir in self.workspace.function_dirs() {
      match self.read_function(&dir) {
        Ok(Some((config, MetadataState::Valid))) => report.functions.push(config),
        Ok(Some((_, state))) => {
          info!(dir = %dir.display(), ?state, "skipping manifest without complete private metadata");
          report.unattributed.push(dir);
        }
        Ok(None) => {}
        Err(error) => {
          warn!(dir = %dir.display(), %error, "skipping unreadable function");
          report.failures.push(ScanFailure { function_dir: dir, error });
        }
      }
    }

    debug!(
      workspace = %self.workspace,
      functions = report.functions.len(),
      unattributed = report.unattributed.len(),
      failures = report.failures.len(),
      "scanned workspace"
    );
    report
  }

  /// Every function attributable to a source file.
  pub fn list_all(&self) -> Vec<FunctionConfiguration> {
    self.scan().functions
  }

  /// The function whose complete private metadata names exactly `source_file`.
  ///
  /// `None` means the file is not configured yet. An incomplete block naming
  /// the file is not trusted and only logged.
  pub fn find_by_source_file(&self, source_file: &Path) -> Option<FunctionConfiguration> {
    self.workspace.function_dirs().into_iter().find_map(|dir| {
      match self.read_function(&dir) {
        Ok(Some((config, state))) if config.is_for_source(source_file) => {
          if state == MetadataState::Valid {
            return Some(config);
          }
          warn!(
            dir = %dir.display(),
            source = %source_file.display(),
            ?state,
            "ignoring incomplete metadata that names this source; run validate and repair"
          );
          None
        }
        Ok(_) => None,
        Err(error) => {
          warn!(dir = %dir.display(), %error, "skipping unreadable function");
          None
        }
      }
    })
  }

  pub fn find_by_name(&self, name: &str) -> Result<Option<FunctionConfiguration>, ManifestError> {
    Ok(
      self
        .read_function(&self.workspace.function_dir(name))?
        .map(|(config, _)| config),
    )
  }

  fn read_function(&self, dir: &Path) -> Result<Option<(FunctionConfiguration, MetadataState)>, ManifestError> {
    let manifest = match self.store.load(dir) {
      Ok(manifest) => manifest,
      Err(e) if e.is_not_found() => return Ok(None),
      Err(e) => return Err(e),
    };
    let config = self.store.configuration_from(&manifest, dir, None)?;
    Ok(Some((config, classify(&manifest))))
  }

  /// Configure a source file as a function.
  ///
  /// An already-registered source has its metadata refreshed in place.
  /// Otherwise a function directory is created under a name derived from the
  /// source path, suffixed when taken, and a manifest and test event are written.
  pub fn register(&self, request: &NewFunction) -> Result<FunctionConfiguration, RegistryError> {
    let source_file = absolute_source(&request.source_file)?;
    let source_dir = source_file.parent().map(Path::to_path_buf).unwrap_or_default();

    if let Some(existing) = self.find_by_source_file(&source_file) {
      let event_type = request.event_type.unwrap_or(existing.event_type);
      self
        .store
        .write_metadata(&existing.function_dir, &source_file, &source_dir, event_type)?;
      if let Some(architecture) = request.architecture
        && architecture != existing.architecture
      {
        self.store.update_architecture(&existing.function_dir, architecture)?;
      }
      info!(function = %existing.name, source = %source_file.display(), "refreshed existing function");
      return Ok(self.store.extract_configuration(&existing.function_dir, None)?);
    }

    let base = match &request.name {
      Some(name) => sanitize_function_name(name),
      None => derive_function_name(&source_file),
    };
    let name = unclaimed_name(&self.workspace, &base);
    let function_dir = self.workspace.function_dir(&name);

    fs::create_dir_all(&function_dir).map_err(|e| RegistryError::CreateDir {
      path: function_dir.clone(),
      source: e,
    })?;

    let event_type = request.event_type.unwrap_or_default();
    let mut template = self.store.template_config(&name, &source_file, event_type);
    template.source_dir = source_dir;
    if let Some(architecture) = request.architecture {
      template.architecture = architecture;
    }
    if let Some(runtime) = &request.runtime {
      template.runtime = runtime.clone();
    }

    self.store.create_manifest(&function_dir, &template)?;
    events::write_test_event(&function_dir, event_type, false)?;

    info!(function = %name, source = %source_file.display(), %event_type, "registered function");
    Ok(self.store.extract_configuration(&function_dir, None)?)
  }

  /// Delete the function configured for `source_file`. The source itself is untouched.
  ///
  /// Returns the removed directory, or `None` when nothing was registered.
  pub fn unregister(&self, source_file: &Path) -> Result<Option<PathBuf>, RegistryError> {
    let Some(config) = self.find_by_source_file(source_file) else {
      info!(source = %source_file.display(), "no function registered, nothing to remove");
      return Ok(None);
    };

    fs::remove_dir_all(&config.function_dir).map_err(|e| RegistryError::Remove {
      path: config.function_dir.clone(),
      source: e,
    })?;

    info!(function = %config.name, "removed function");
    Ok(Some(config.function_dir))
  }

  /// Every attributable function paired with its build freshness.
  pub fn status<S: FileStat>(&self, oracle: &BuildFreshnessOracle<S>) -> Vec<(FunctionConfiguration, Freshness)> {
    self
      .list_all()
      .into_iter()
      .map(|config| {
        let freshness = oracle.check(&config);
        (config, freshness)
      })
      .collect()
  }
}

/// First of `base`, `base-2`, `base-3`, … with no manifest on disk.
pub fn unclaimed_name(workspace: &WorkspacePath, base: &str) -> String {
  let mut candidate = base.to_string();
  let mut n = 2;
  while manifest_path(&workspace.function_dir(&candidate)).exists() {
    candidate = format!("{}-{}", base, n);
    n += 1;
  }
  candidate
}

/// Absolute form of a source path; canonical when the file exists.
pub fn absolute_source(path: &Path) -> Result<PathBuf, RegistryError> {
  let resolved = if path.exists() {
    dunce::canonicalize(path)
  } else {
    std::path::absolute(path)
  };
  resolved.map_err(|e| RegistryError::InvalidSource {
    path: path.to_path_buf(),
    source: e,
  })
}

/// Candidate function name for a source file.
///
/// Uses the parent directory's name, or the grandparent's when the parent is
/// a generic container such as `cmd`.
pub fn derive_function_name(source_file: &Path) -> String {
  let parent = source_file.parent();
  let dir_name = |p: Option<&Path>| p.and_then(Path::file_name).map(|n| n.to_string_lossy().into_owned());

  let candidate = match dir_name(parent) {
    Some(name) if GENERIC_DIR_NAMES.contains(&name.as_str()) => dir_name(parent.and_then(Path::parent)),
    other => other,
  };

  sanitize_function_name(&candidate.unwrap_or_default())
}

/// Replace characters outside `[A-Za-z0-9_-]` with `-`, trim dashes, lowercase.
pub fn sanitize_function_name(raw: &str) -> String {
  let replaced: String = raw
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
        c
      } else {
        '-'
      }
    })
    .collect();

  let trimmed = replaced.trim_matches('-').to_lowercase();
  if trimmed.is_empty() {
    DEFAULT_FUNCTION_NAME.to_string()
  } else {
    trimmed
  }
}
