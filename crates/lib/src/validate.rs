//! Private metadata validation and repair.
//!
//! Each function manifest is in one of four states:
//!
//! - `Absent`: no manifest file; nothing to do here
//! - `NoMetadata`: manifest without a `Metadata.Lamina` block
//! - `Incomplete`: block present but a required field is missing
//! - `Valid`: all required fields present
//!
//! `repair` takes the middle two to `Valid` by writing a complete replacement block.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::consts::{DEFAULT_BUILD_METHOD, SCHEMA_VERSION};
use crate::manifest::{EventType, Manifest, ManifestError, ManifestStore, PrivateMetadata, missing_required_fields, timestamp};
use crate::workspace::{WorkspacePath, function_name, manifest_path};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum MetadataState {
  Absent,
  NoMetadata,
  Incomplete { missing: Vec<&'static str> },
  Valid,
}

impl MetadataState {
  pub fn needs_repair(&self) -> bool {
    matches!(self, Self::NoMetadata | Self::Incomplete { .. })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum IssueKind {
  MissingMetadata,
  IncompleteMetadata { missing: Vec<&'static str> },
  OutdatedSchema { found: String },
  Unparseable { message: String },
  MissingResource,
}

/// One problem found in one function's manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
  pub function: String,
  pub manifest_path: PathBuf,
  #[serde(flatten)]
  pub kind: IssueKind,
}

impl ValidationIssue {
  pub fn description(&self) -> String {
    match &self.kind {
      IssueKind::MissingMetadata => "manifest has no private metadata".to_string(),
      IssueKind::IncompleteMetadata { missing } => format!("private metadata is missing {}", missing.join(", ")),
      IssueKind::OutdatedSchema { found } => {
        format!("metadata schema {} is older than {}", found, SCHEMA_VERSION)
      }
      IssueKind::Unparseable { message } => message.clone(),
      IssueKind::MissingResource => "manifest has no function resource".to_string(),
    }
  }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
  pub checked: usize,
  pub valid: usize,
  pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
  pub fn is_clean(&self) -> bool {
    self.issues.is_empty()
  }
}

/// Best-known values for a repair.
///
/// Unknown paths become empty strings. An unknown event type falls back to the
/// recorded one, then to the manifest's trigger, then to `generic`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairRequest {
  pub source_file: Option<PathBuf>,
  pub source_dir: Option<PathBuf>,
  pub event_type: Option<EventType>,
}

/// State of an already-parsed manifest.
pub fn classify(manifest: &Manifest) -> MetadataState {
  match manifest.metadata_block() {
    None => MetadataState::NoMetadata,
    Some(block) => {
      let missing = missing_required_fields(block);
      if missing.is_empty() {
        MetadataState::Valid
      } else {
        MetadataState::Incomplete { missing }
      }
    }
  }
}

#[derive(Debug, Clone)]
pub struct MetadataValidator {
  workspace: WorkspacePath,
  store: ManifestStore,
}

impl MetadataValidator {
  pub fn new(workspace: WorkspacePath, store: ManifestStore) -> Self {
    Self { workspace, store }
  }

  /// State of the manifest in `function_dir`.
  pub fn inspect(&self, function_dir: &Path) -> Result<MetadataState, ManifestError> {
    match self.store.load(function_dir) {
      Ok(manifest) => Ok(classify(&manifest)),
      Err(e) if e.is_not_found() => Ok(MetadataState::Absent),
      Err(e) => Err(e),
    }
  }

  /// Check every function manifest in the workspace.
  pub fn validate(&self) -> ValidationReport {
    let mut report = ValidationReport::default();

    for dir in self.workspace.function_dirs() {
      let path = manifest_path(&dir);
      let issue = |kind| ValidationIssue {
        function: function_name(&dir),
        manifest_path: path.clone(),
        kind,
      };

      let manifest = match self.store.load(&dir) {
        Ok(manifest) => manifest,
        Err(e) if e.is_not_found() => continue,
        Err(e) => {
          warn!(dir = %dir.display(), error = %e, "manifest failed to load");
          report.checked += 1;
          report.issues.push(issue(IssueKind::Unparseable { message: e.to_string() }));
          continue;
        }
      };
      report.checked += 1;

      if manifest.function_logical_id().is_none() {
        report.issues.push(issue(IssueKind::MissingResource));
        continue;
      }

      match classify(&manifest) {
        MetadataState::NoMetadata => report.issues.push(issue(IssueKind::MissingMetadata)),
        MetadataState::Incomplete { missing } => {
          report.issues.push(issue(IssueKind::IncompleteMetadata { missing }))
        }
        MetadataState::Valid => {
          report.valid += 1;
          let version = manifest.private_metadata().and_then(|m| m.version).unwrap_or_default();
          if version != SCHEMA_VERSION {
            report.issues.push(issue(IssueKind::OutdatedSchema { found: version }));
          }
        }
        MetadataState::Absent => {}
      }
    }

    debug!(
      checked = report.checked,
      valid = report.valid,
      issues = report.issues.len(),
      "validated workspace"
    );
    report
  }

  /// Write a complete replacement metadata block.
  ///
  /// Architecture and runtime are taken from the deployment section, the
  /// build method is kept when one was recorded. Without a requested event
  /// type the recorded or trigger-inferred one is kept.
  pub fn repair(&self, function_dir: &Path, request: &RepairRequest) -> Result<(), ManifestError> {
    let manifest = self.store.load(function_dir)?;
    let previous = manifest.private_metadata().unwrap_or_default();
    let defaults = self.store.defaults();

    let source_dir = request
      .source_dir
      .clone()
      .or_else(|| request.source_file.as_deref().and_then(Path::parent).map(Path::to_path_buf));
    let event_type = request
      .event_type
      .or_else(|| previous.event_type.as_deref().and_then(EventType::from_tag))
      .or_else(|| manifest.inferred_event_type())
      .unwrap_or_default();
    let path_string = |p: Option<&Path>| p.map(|p| p.to_string_lossy().into_owned()).unwrap_or_default();

    let metadata = PrivateMetadata {
      source_file: Some(path_string(request.source_file.as_deref())),
      source_dir: Some(path_string(source_dir.as_deref())),
      event_type: Some(event_type.as_str().to_string()),
      last_modified: Some(timestamp()),
      version: Some(SCHEMA_VERSION.to_string()),
      build_method: Some(
        previous
          .build_method
          .filter(|m| !m.is_empty())
          .unwrap_or_else(|| DEFAULT_BUILD_METHOD.to_string()),
      ),
      architecture: Some(
        manifest
          .declared_architecture()
          .unwrap_or(defaults.architecture)
          .as_str()
          .to_string(),
      ),
      runtime: Some(manifest.declared_runtime().unwrap_or_else(|| defaults.runtime.clone())),
      environment: None,
    };

    self.store.replace_metadata(function_dir, &metadata)?;
    info!(dir = %function_dir.display(), "repaired private metadata");
    Ok(())
  }
}
