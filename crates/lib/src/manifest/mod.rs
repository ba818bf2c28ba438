//! Per-function manifest storage.
//!
//! A function's `template.yaml` is the single source of truth for both its
//! deployment description and the tool-private metadata under
//! `Metadata.Lamina`. Every mutation here re-reads the file immediately before
//! merging and then rewrites the whole document. There is no lock and no
//! version check: an external edit landing between that read and the write is
//! lost.

mod document;
mod template;
mod types;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde_yaml::{Mapping, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::FunctionDefaults;
use crate::consts::{DEFAULT_BUILD_METHOD, DEFAULT_CODE_URI, SCHEMA_VERSION};
use crate::platform::Architecture;
use crate::workspace::{function_name, manifest_path};

pub use document::Manifest;
pub use template::{TemplateConfig, logical_id, trigger_skeleton};
pub use types::{
  ConfigFallback, EnvironmentOrigin, EnvironmentProvenance, EnvironmentSource, EventType, FunctionConfiguration,
  PrivateMetadata, REQUIRED_METADATA_FIELDS, missing_required_fields,
};

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("manifest not found: {}", path.display())]
  NotFound { path: PathBuf },

  #[error("failed to parse manifest {}: {message}", path.display())]
  Parse { path: PathBuf, message: String },

  #[error("manifest {} has no function resource", path.display())]
  MissingResource { path: PathBuf },

  #[error("manifest already exists: {}", path.display())]
  AlreadyExists { path: PathBuf },

  #[error("failed to read manifest {}: {source}", path.display())]
  Read { path: PathBuf, source: std::io::Error },

  #[error("failed to write manifest {}: {source}", path.display())]
  Write { path: PathBuf, source: std::io::Error },

  #[error("failed to serialize manifest {}: {source}", path.display())]
  Serialize { path: PathBuf, source: serde_yaml::Error },

  #[error("failed to create directory {}: {source}", path.display())]
  CreateDir { path: PathBuf, source: std::io::Error },
}

impl ManifestError {
  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::NotFound { .. })
  }
}

/// Current time in the format written to `lastModified`.
pub fn timestamp() -> String {
  Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Read/merge/write access to function manifests.
#[derive(Debug, Clone, Default)]
pub struct ManifestStore {
  defaults: FunctionDefaults,
}

impl ManifestStore {
  pub fn new(defaults: FunctionDefaults) -> Self {
    Self { defaults }
  }

  pub fn defaults(&self) -> &FunctionDefaults {
    &self.defaults
  }

  pub fn load(&self, function_dir: &Path) -> Result<Manifest, ManifestError> {
    Manifest::load(&manifest_path(function_dir))
  }

  pub fn metadata(&self, function_dir: &Path) -> Result<Option<PrivateMetadata>, ManifestError> {
    Ok(self.load(function_dir)?.private_metadata())
  }

  /// Build the normalized view of a function.
  ///
  /// Each field resolves from private metadata, then the deployment section,
  /// then `fallback`, then the built-in default. Missing metadata is not an
  /// error; only an unreadable manifest or one without a function resource is.
  pub fn extract_configuration(
    &self,
    function_dir: &Path,
    fallback: Option<&ConfigFallback>,
  ) -> Result<FunctionConfiguration, ManifestError> {
    let manifest = self.load(function_dir)?;
    self.configuration_from(&manifest, function_dir, fallback)
  }

  pub fn configuration_from(
    &self,
    manifest: &Manifest,
    function_dir: &Path,
    fallback: Option<&ConfigFallback>,
  ) -> Result<FunctionConfiguration, ManifestError> {
    let logical_id = manifest
      .function_logical_id()
      .ok_or_else(|| ManifestError::MissingResource {
        path: manifest.path().to_path_buf(),
      })?;

    let empty = ConfigFallback::default();
    let fallback = fallback.unwrap_or(&empty);
    let has_metadata = manifest.metadata_block().is_some();
    let meta = manifest.private_metadata().unwrap_or_default();
    let non_empty = |s: &Option<String>| s.as_deref().filter(|s| !s.is_empty()).map(str::to_string);

    let source_file = non_empty(&meta.source_file)
      .map(PathBuf::from)
      .or_else(|| fallback.source_file.clone());
    let source_dir = non_empty(&meta.source_dir)
      .map(PathBuf::from)
      .or_else(|| fallback.source_dir.clone())
      .or_else(|| source_file.as_deref().and_then(Path::parent).map(Path::to_path_buf));

    let event_type = meta
      .event_type
      .as_deref()
      .and_then(EventType::from_tag)
      .or_else(|| manifest.inferred_event_type())
      .or(fallback.event_type)
      .unwrap_or_default();

    let runtime = non_empty(&meta.runtime)
      .or_else(|| manifest.declared_runtime())
      .or_else(|| fallback.runtime.clone())
      .unwrap_or_else(|| self.defaults.runtime.clone());

    let architecture = meta
      .architecture
      .as_deref()
      .and_then(Architecture::from_tag)
      .or_else(|| manifest.declared_architecture())
      .or(fallback.architecture)
      .unwrap_or(self.defaults.architecture);

    let memory_size = manifest
      .declared_memory_size()
      .or(fallback.memory_size)
      .unwrap_or(self.defaults.memory_size);
    let timeout = manifest
      .declared_timeout()
      .or(fallback.timeout)
      .unwrap_or(self.defaults.timeout);

    let workspace = function_dir.parent().map(Path::to_path_buf).unwrap_or_default();

    Ok(FunctionConfiguration {
      name: function_name(function_dir),
      workspace,
      function_dir: function_dir.to_path_buf(),
      manifest_path: manifest.path().to_path_buf(),
      logical_id,
      source_file,
      source_dir,
      event_type,
      runtime,
      architecture,
      memory_size,
      timeout,
      environment: manifest.declared_environment(),
      build_method: non_empty(&meta.build_method).unwrap_or_else(|| DEFAULT_BUILD_METHOD.to_string()),
      schema_version: meta.version,
      code_uri: manifest
        .declared_code_uri()
        .unwrap_or_else(|| DEFAULT_CODE_URI.to_string()),
      has_metadata,
    })
  }

  /// Merge source linkage into the private metadata, leaving every other key
  /// of the document untouched. Stamps `lastModified` and the schema version.
  pub fn write_metadata(
    &self,
    function_dir: &Path,
    source_file: &Path,
    source_dir: &Path,
    event_type: EventType,
  ) -> Result<(), ManifestError> {
    let mut manifest = self.load(function_dir)?;
    let runtime = manifest.declared_runtime();
    let architecture = manifest.declared_architecture();

    let block = manifest.metadata_block_mut();
    set(block, "sourceFile", source_file.to_string_lossy());
    set(block, "sourceDir", source_dir.to_string_lossy());
    set(block, "eventType", event_type.as_str());
    set(block, "lastModified", timestamp());
    set(block, "version", SCHEMA_VERSION);
    set_if_absent(block, "buildMethod", DEFAULT_BUILD_METHOD);
    if let Some(runtime) = runtime {
      set_if_absent(block, "runtime", runtime);
    }
    if let Some(architecture) = architecture {
      set_if_absent(block, "architecture", architecture.as_str());
    }

    manifest.save()?;
    debug!(path = %manifest.path().display(), source = %source_file.display(), "wrote private metadata");
    Ok(())
  }

  /// Replace the whole private metadata block.
  pub fn replace_metadata(&self, function_dir: &Path, metadata: &PrivateMetadata) -> Result<(), ManifestError> {
    let mut manifest = self.load(function_dir)?;
    manifest.replace_metadata_block(metadata.to_mapping());
    manifest.save()?;
    debug!(path = %manifest.path().display(), "replaced private metadata");
    Ok(())
  }

  /// Replace the function's environment variables and record where they came from.
  ///
  /// The new set wholly replaces the old one.
  pub fn update_environment(
    &self,
    function_dir: &Path,
    variables: &BTreeMap<String, String>,
    origin: &EnvironmentOrigin,
  ) -> Result<(), ManifestError> {
    let mut manifest = self.load(function_dir)?;
    let path = manifest.path().to_path_buf();

    let properties = manifest
      .function_properties_mut()
      .ok_or_else(|| ManifestError::MissingResource { path: path.clone() })?;

    if variables.is_empty() {
      properties.remove("Environment");
    } else {
      let vars: Mapping = variables
        .iter()
        .map(|(k, v)| (Value::from(k.as_str()), Value::from(v.as_str())))
        .collect();
      let mut environment = Mapping::new();
      environment.insert(Value::from("Variables"), Value::Mapping(vars));
      properties.insert(Value::from("Environment"), Value::Mapping(environment));
    }

    let provenance = match origin {
      EnvironmentOrigin::Manual => EnvironmentProvenance {
        last_updated: timestamp(),
        source: EnvironmentSource::Manual,
        origin_label: None,
        variable_count: variables.len(),
      },
      EnvironmentOrigin::External { label } => EnvironmentProvenance {
        last_updated: timestamp(),
        source: EnvironmentSource::ExternalSync,
        origin_label: Some(label.clone()),
        variable_count: variables.len(),
      },
    };
    let provenance = serde_yaml::to_value(&provenance).map_err(|e| ManifestError::Serialize {
      path: path.clone(),
      source: e,
    })?;
    manifest
      .metadata_block_mut()
      .insert(Value::from("environment"), provenance);

    manifest.save()?;
    info!(path = %path.display(), count = variables.len(), "updated environment variables");
    Ok(())
  }

  /// Point the function at a different architecture.
  ///
  /// Updates the deployment section and, when present, the private metadata,
  /// so both keep agreeing.
  pub fn update_architecture(&self, function_dir: &Path, architecture: Architecture) -> Result<(), ManifestError> {
    let mut manifest = self.load(function_dir)?;
    let path = manifest.path().to_path_buf();

    let properties = manifest
      .function_properties_mut()
      .ok_or_else(|| ManifestError::MissingResource { path: path.clone() })?;
    properties.insert(
      Value::from("Architectures"),
      Value::Sequence(vec![Value::from(architecture.as_str())]),
    );

    if manifest.metadata_block().is_some() {
      let block = manifest.metadata_block_mut();
      set(block, "architecture", architecture.as_str());
      set(block, "lastModified", timestamp());
    }

    manifest.save()?;
    info!(path = %path.display(), %architecture, "updated architecture");
    Ok(())
  }

  /// Write a brand-new manifest for a function. Refuses to overwrite.
  pub fn create_manifest(&self, function_dir: &Path, config: &TemplateConfig) -> Result<Manifest, ManifestError> {
    let path = manifest_path(function_dir);
    if path.exists() {
      return Err(ManifestError::AlreadyExists { path });
    }

    fs::create_dir_all(function_dir).map_err(|e| ManifestError::CreateDir {
      path: function_dir.to_path_buf(),
      source: e,
    })?;

    let manifest = Manifest::new(path, template::render(config, &timestamp()));
    manifest.save()?;
    info!(path = %manifest.path().display(), event_type = %config.event_type, "created manifest");
    Ok(manifest)
  }

  /// Template inputs for `name`, with unset values taken from the defaults.
  pub fn template_config(&self, name: &str, source_file: &Path, event_type: EventType) -> TemplateConfig {
    TemplateConfig {
      name: name.to_string(),
      source_file: source_file.to_path_buf(),
      source_dir: source_file.parent().map(Path::to_path_buf).unwrap_or_default(),
      event_type,
      runtime: self.defaults.runtime.clone(),
      architecture: self.defaults.architecture,
      memory_size: self.defaults.memory_size,
      timeout: self.defaults.timeout,
      environment: BTreeMap::new(),
    }
  }
}

fn set(block: &mut Mapping, key: &str, value: impl Into<String>) {
  block.insert(Value::from(key), Value::String(value.into()));
}

fn set_if_absent(block: &mut Mapping, key: &str, value: impl Into<String>) {
  if !block.get(key).is_some_and(Value::is_string) {
    set(block, key, value);
  }
}
