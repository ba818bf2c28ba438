//! One-time migration from the workspace-wide legacy registry.
//!
//! The legacy file held every function's configuration in one JSON document.
//! Migration turns each entry into a per-function manifest and then renames
//! the legacy file to a backup, so a second run finds nothing to do.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::consts::LEGACY_BACKUP_SUFFIX;
use crate::events;
use crate::manifest::{EventType, ManifestStore};
use crate::platform::Architecture;
use crate::registry::{FunctionRegistry, derive_function_name, sanitize_function_name, unclaimed_name};
use crate::validate::{MetadataState, MetadataValidator, RepairRequest, classify};
use crate::workspace::WorkspacePath;

#[derive(Debug, Error)]
pub enum MigrationError {
  #[error("failed to read legacy registry {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("failed to parse legacy registry {}: {source}", path.display())]
  Parse { path: PathBuf, source: serde_json::Error },

  #[error("failed to back up legacy registry {} to {}: {source}", from.display(), to.display())]
  Backup { from: PathBuf, to: PathBuf, source: io::Error },
}

/// One function as the legacy registry described it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyEntry {
  #[serde(alias = "name")]
  pub function_name: Option<String>,
  pub source_file: Option<String>,
  pub source_dir: Option<String>,
  pub event_type: Option<String>,
  pub runtime: Option<String>,
  pub architecture: Option<String>,
  pub memory_size: Option<u32>,
  pub timeout: Option<u32>,
  pub environment: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationFailure {
  pub entry: String,
  pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
  pub legacy_path: Option<PathBuf>,
  pub backup_path: Option<PathBuf>,
  pub created: Vec<String>,
  pub repaired: Vec<String>,
  pub failures: Vec<MigrationFailure>,
}

impl MigrationReport {
  /// True when there was no legacy registry to migrate.
  pub fn is_noop(&self) -> bool {
    self.legacy_path.is_none()
  }
}

/// Flatten the accepted legacy shapes into `(map key, raw entry)` pairs.
///
/// Accepts a bare array, `{"functions": [...]}`, `{"functions": {...}}` or a
/// bare object keyed by source file or function name. Entries are left raw so
/// one malformed entry cannot spoil the others.
pub fn legacy_entries(value: Value) -> Vec<(Option<String>, Value)> {
  let value = match value {
    Value::Object(mut map) if map.get("functions").is_some_and(|f| f.is_array() || f.is_object()) => {
      map.remove("functions").unwrap_or_default()
    }
    other => other,
  };

  match value {
    Value::Array(items) => items.into_iter().map(|item| (None, item)).collect(),
    Value::Object(map) => map.into_iter().map(|(key, item)| (Some(key), item)).collect(),
    _ => Vec::new(),
  }
}

/// Human label for a legacy entry, used in logs and failure reports.
fn entry_label(index: usize, key: Option<&str>, raw: &Value) -> String {
  let field = |name: &str| raw.get(name).and_then(Value::as_str).map(str::to_string);
  key
    .map(str::to_string)
    .or_else(|| field("functionName"))
    .or_else(|| field("name"))
    .or_else(|| field("sourceFile"))
    .unwrap_or_else(|| format!("entry #{}", index + 1))
}

#[derive(Debug, Clone)]
pub struct Migrator {
  workspace: WorkspacePath,
  store: ManifestStore,
}

impl Migrator {
  pub fn new(workspace: WorkspacePath, store: ManifestStore) -> Self {
    Self { workspace, store }
  }

  /// Migrate the legacy registry if one exists.
  ///
  /// Per-entry failures are collected in the report. The legacy file is
  /// renamed to a backup afterwards even when some entries failed.
  pub fn migrate(&self) -> Result<MigrationReport, MigrationError> {
    let legacy_path = self.workspace.legacy_registry_path();
    if !legacy_path.is_file() {
      return Ok(MigrationReport::default());
    }

    let content = fs::read_to_string(&legacy_path).map_err(|e| MigrationError::Read {
      path: legacy_path.clone(),
      source: e,
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|e| MigrationError::Parse {
      path: legacy_path.clone(),
      source: e,
    })?;
    let entries = legacy_entries(value);

    info!(path = %legacy_path.display(), entries = entries.len(), "migrating legacy registry");

    let mut report = MigrationReport {
      legacy_path: Some(legacy_path.clone()),
      ..Default::default()
    };

    for (index, (key, raw)) in entries.into_iter().enumerate() {
      let label = entry_label(index, key.as_deref(), &raw);

      let outcome = serde_json::from_value::<LegacyEntry>(raw)
        .map_err(|e| format!("malformed entry: {}", e))
        .and_then(|entry| self.migrate_entry(key.as_deref(), &entry));

      match outcome {
        Ok(Outcome::Created(name)) => report.created.push(name),
        Ok(Outcome::Repaired(name)) => report.repaired.push(name),
        Err(error) => {
          warn!(entry = %label, %error, "failed to migrate legacy entry");
          report.failures.push(MigrationFailure { entry: label, error });
        }
      }
    }

    let backup_path = backup_path_for(&legacy_path);
    fs::rename(&legacy_path, &backup_path).map_err(|e| MigrationError::Backup {
      from: legacy_path.clone(),
      to: backup_path.clone(),
      source: e,
    })?;
    info!(backup = %backup_path.display(), "legacy registry backed up");
    report.backup_path = Some(backup_path);

    Ok(report)
  }

  fn migrate_entry(&self, key: Option<&str>, entry: &LegacyEntry) -> Result<Outcome, String> {
    let key_is_path = key.is_some_and(|k| Path::new(k).is_absolute());
    let source_file = entry
      .source_file
      .clone()
      .filter(|s| !s.is_empty())
      .or_else(|| key.filter(|_| key_is_path).map(str::to_string))
      .map(PathBuf::from);

    let base = match (&entry.function_name, key.filter(|_| !key_is_path), &source_file) {
      (Some(name), _, _) => sanitize_function_name(name),
      (None, Some(key), _) => sanitize_function_name(key),
      (None, None, Some(source)) => derive_function_name(source),
      (None, None, None) => return Err("entry has neither a function name nor a source file".to_string()),
    };

    let event_type = entry.event_type.as_deref().and_then(EventType::from_tag);
    let source_dir = entry
      .source_dir
      .clone()
      .filter(|s| !s.is_empty())
      .map(PathBuf::from)
      .or_else(|| source_file.as_deref().and_then(Path::parent).map(Path::to_path_buf));
    let request = RepairRequest {
      source_file: source_file.clone(),
      source_dir: source_dir.clone(),
      event_type,
    };

    let registry = FunctionRegistry::new(self.workspace.clone(), self.store.clone());
    if let Some(existing) = source_file.as_deref().and_then(|s| registry.find_by_source_file(s)) {
      self.repair(&existing.function_dir, &request)?;
      return Ok(Outcome::Repaired(existing.name));
    }

    let candidate = self.workspace.function_dir(&base);
    let name = match self.claim(&candidate, source_file.as_deref()) {
      Claim::Repairable => {
        self.repair(&candidate, &request)?;
        return Ok(Outcome::Repaired(base));
      }
      Claim::Free => base,
      Claim::Taken => {
        let name = unclaimed_name(&self.workspace, &base);
        info!(taken = %base, using = %name, "function name already belongs to another source");
        name
      }
    };

    let function_dir = self.workspace.function_dir(&name);
    let event_type = event_type.unwrap_or_default();
    let mut template = self
      .store
      .template_config(&name, source_file.as_deref().unwrap_or(Path::new("")), event_type);
    if let Some(dir) = source_dir {
      template.source_dir = dir;
    }
    if let Some(runtime) = entry.runtime.clone().filter(|r| !r.is_empty()) {
      template.runtime = runtime;
    }
    if let Some(arch) = entry.architecture.as_deref().and_then(Architecture::from_tag) {
      template.architecture = arch;
    }
    if let Some(memory) = entry.memory_size {
      template.memory_size = memory;
    }
    if let Some(timeout) = entry.timeout {
      template.timeout = timeout;
    }
    template.environment = entry
      .environment
      .iter()
      .map(|(k, v)| {
        let value = match v {
          Value::String(s) => s.clone(),
          other => other.to_string(),
        };
        (k.clone(), value)
      })
      .collect();

    self
      .store
      .create_manifest(&function_dir, &template)
      .map_err(|e| e.to_string())?;
    events::write_test_event(&function_dir, event_type, false).map_err(|e| e.to_string())?;
    Ok(Outcome::Created(name))
  }

  /// Whether the manifest at `function_dir` may take on the legacy entry.
  ///
  /// Only manifests with no trustworthy identity, or one naming the same
  /// source, are rewritten. Unreadable manifests are left alone.
  fn claim(&self, function_dir: &Path, source_file: Option<&Path>) -> Claim {
    let manifest = match self.store.load(function_dir) {
      Ok(manifest) => manifest,
      Err(e) if e.is_not_found() => return Claim::Free,
      Err(_) => return Claim::Taken,
    };

    match classify(&manifest) {
      MetadataState::NoMetadata | MetadataState::Incomplete { .. } => Claim::Repairable,
      MetadataState::Valid | MetadataState::Absent => {
        let claimed = manifest.private_metadata().and_then(|m| m.source_file);
        match (claimed, source_file) {
          (Some(claimed), Some(source)) if Path::new(&claimed) == source => Claim::Repairable,
          _ => Claim::Taken,
        }
      }
    }
  }

  fn repair(&self, function_dir: &Path, request: &RepairRequest) -> Result<(), String> {
    let validator = MetadataValidator::new(self.workspace.clone(), self.store.clone());
    validator.repair(function_dir, request).map_err(|e| e.to_string())?;

    let event_type = self
      .store
      .extract_configuration(function_dir, None)
      .map_err(|e| e.to_string())?
      .event_type;
    events::write_test_event(function_dir, event_type, false).map_err(|e| e.to_string())?;
    Ok(())
  }
}

enum Claim {
  Free,
  Repairable,
  Taken,
}

enum Outcome {
  Created(String),
  Repaired(String),
}

/// `<file>.bak`, or `<file>.bak.N` for the first N not already taken.
fn backup_path_for(legacy_path: &Path) -> PathBuf {
  let mut base = legacy_path.as_os_str().to_os_string();
  base.push(LEGACY_BACKUP_SUFFIX);
  let base = PathBuf::from(base);

  if !base.exists() {
    return base;
  }

  let mut n = 1;
  loop {
    let mut candidate = base.as_os_str().to_os_string();
    candidate.push(format!(".{}", n));
    let candidate = PathBuf::from(candidate);
    if !candidate.exists() {
      return candidate;
    }
    n += 1;
  }
}
