//! Permissive in-memory form of a manifest.
//!
//! The whole YAML tree is retained so that a write re-emits every key this
//! tool does not interpret.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use crate::consts::{FUNCTION_RESOURCE_TYPES, METADATA_KEY};
use crate::platform::Architecture;

use super::ManifestError;
use super::types::{EventType, PrivateMetadata};

/// A parsed manifest together with the path it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
  path: PathBuf,
  root: Mapping,
}

impl Manifest {
  pub fn new(path: PathBuf, root: Mapping) -> Self {
    Self { path, root }
  }

  /// Load a manifest from disk.
  ///
  /// Fails with `NotFound` when the file is absent and `Parse` when it is not
  /// a YAML mapping.
  pub fn load(path: &Path) -> Result<Self, ManifestError> {
    let content = fs::read_to_string(path).map_err(|e| {
      if e.kind() == io::ErrorKind::NotFound {
        ManifestError::NotFound { path: path.to_path_buf() }
      } else {
        ManifestError::Read {
          path: path.to_path_buf(),
          source: e,
        }
      }
    })?;

    Self::parse(path, &content)
  }

  pub fn parse(path: &Path, content: &str) -> Result<Self, ManifestError> {
    let value: Value = serde_yaml::from_str(content).map_err(|e| ManifestError::Parse {
      path: path.to_path_buf(),
      message: e.to_string(),
    })?;

    match value {
      Value::Mapping(root) => Ok(Self::new(path.to_path_buf(), root)),
      other => Err(ManifestError::Parse {
        path: path.to_path_buf(),
        message: format!("expected a mapping at the document root, found {}", kind_name(&other)),
      }),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn root(&self) -> &Mapping {
    &self.root
  }

  pub fn to_yaml(&self) -> Result<String, ManifestError> {
    serde_yaml::to_string(&self.root).map_err(|e| ManifestError::Serialize {
      path: self.path.clone(),
      source: e,
    })
  }

  /// Write the whole document, replacing the file atomically.
  pub fn save(&self) -> Result<(), ManifestError> {
    let content = self.to_yaml()?;
    let write_err = |e| ManifestError::Write {
      path: self.path.clone(),
      source: e,
    };

    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent).map_err(write_err)?;
    }

    let mut temp_name = self.path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = self.path.with_file_name(temp_name);

    fs::write(&temp_path, &content).map_err(write_err)?;
    fs::rename(&temp_path, &self.path).map_err(write_err)?;

    Ok(())
  }

  /// The raw `Metadata.Lamina` block, if present and a mapping.
  pub fn metadata_block(&self) -> Option<&Mapping> {
    self
      .root
      .get("Metadata")
      .and_then(|m| m.get(METADATA_KEY))
      .and_then(Value::as_mapping)
  }

  pub fn private_metadata(&self) -> Option<PrivateMetadata> {
    self.metadata_block().map(PrivateMetadata::from_mapping)
  }

  /// The `Metadata.Lamina` block, created (or reset when not a mapping) on demand.
  pub fn metadata_block_mut(&mut self) -> &mut Mapping {
    let metadata = ensure_mapping(
      self
        .root
        .entry(Value::from("Metadata"))
        .or_insert_with(|| Value::Mapping(Mapping::new())),
    );
    ensure_mapping(
      metadata
        .entry(Value::from(METADATA_KEY))
        .or_insert_with(|| Value::Mapping(Mapping::new())),
    )
  }

  pub fn replace_metadata_block(&mut self, block: Mapping) {
    *self.metadata_block_mut() = block;
  }

  /// Logical id of the function resource.
  pub fn function_logical_id(&self) -> Option<String> {
    let resources = self.root.get("Resources")?.as_mapping()?;
    resources.iter().find_map(|(id, resource)| {
      let kind = resource.get("Type")?.as_str()?;
      if FUNCTION_RESOURCE_TYPES.contains(&kind) {
        id.as_str().map(str::to_string)
      } else {
        None
      }
    })
  }

  /// `Properties` of the function resource.
  pub fn function_properties(&self) -> Option<&Mapping> {
    let id = self.function_logical_id()?;
    self
      .root
      .get("Resources")?
      .get(id.as_str())?
      .get("Properties")?
      .as_mapping()
  }

  /// `Properties` of the function resource, created when the resource has none.
  pub fn function_properties_mut(&mut self) -> Option<&mut Mapping> {
    let id = self.function_logical_id()?;
    let resource = self
      .root
      .get_mut("Resources")?
      .as_mapping_mut()?
      .get_mut(id.as_str())?
      .as_mapping_mut()?;

    Some(ensure_mapping(
      resource
        .entry(Value::from("Properties"))
        .or_insert_with(|| Value::Mapping(Mapping::new())),
    ))
  }

  /// `Globals.Function`, consulted when the resource leaves a field unset.
  fn globals_function(&self) -> Option<&Mapping> {
    self.root.get("Globals")?.get("Function")?.as_mapping()
  }

  fn declared(&self, key: &str) -> Option<&Value> {
    self
      .function_properties()
      .and_then(|p| p.get(key))
      .or_else(|| self.globals_function().and_then(|g| g.get(key)))
  }

  pub fn declared_runtime(&self) -> Option<String> {
    self.declared("Runtime").and_then(Value::as_str).map(str::to_string)
  }

  pub fn declared_architecture(&self) -> Option<Architecture> {
    self
      .declared("Architectures")
      .and_then(Value::as_sequence)
      .and_then(|seq| seq.first())
      .and_then(Value::as_str)
      .and_then(Architecture::from_tag)
  }

  pub fn declared_memory_size(&self) -> Option<u32> {
    self.declared("MemorySize").and_then(as_u32)
  }

  pub fn declared_timeout(&self) -> Option<u32> {
    self.declared("Timeout").and_then(as_u32)
  }

  pub fn declared_code_uri(&self) -> Option<String> {
    self.declared("CodeUri").and_then(Value::as_str).map(str::to_string)
  }

  /// `Environment.Variables` with scalar values rendered as strings.
  pub fn declared_environment(&self) -> BTreeMap<String, String> {
    let Some(vars) = self
      .function_properties()
      .and_then(|p| p.get("Environment"))
      .and_then(|e| e.get("Variables"))
      .and_then(Value::as_mapping)
    else {
      return BTreeMap::new();
    };

    vars
      .iter()
      .filter_map(|(k, v)| Some((k.as_str()?.to_string(), scalar_to_string(v)?)))
      .collect()
  }

  /// Event type implied by the first trigger with a recognized `Type`.
  pub fn inferred_event_type(&self) -> Option<EventType> {
    self
      .function_properties()?
      .get("Events")?
      .as_mapping()?
      .values()
      .filter_map(|trigger| trigger.get("Type").and_then(Value::as_str))
      .find_map(EventType::from_trigger_type)
  }
}

fn ensure_mapping(value: &mut Value) -> &mut Mapping {
  if !value.is_mapping() {
    *value = Value::Mapping(Mapping::new());
  }
  match value {
    Value::Mapping(map) => map,
    _ => unreachable!("value was just replaced with a mapping"),
  }
}

fn as_u32(value: &Value) -> Option<u32> {
  match value {
    Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

fn scalar_to_string(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    Value::Null => Some(String::new()),
    _ => None,
  }
}

fn kind_name(value: &Value) -> &'static str {
  match value {
    Value::Null => "an empty document",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Sequence(_) => "a sequence",
    Value::Mapping(_) => "a mapping",
    Value::Tagged(_) => "a tagged value",
  }
}
