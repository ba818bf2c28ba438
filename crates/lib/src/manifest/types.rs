use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::platform::Architecture;
use crate::workspace::BuildPaths;

/// Kind of trigger a function is wired to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
  Api,
  Storage,
  Stream,
  Queue,
  Schedule,
  #[default]
  Generic,
}

impl EventType {
  pub const ALL: [EventType; 6] = [
    Self::Api,
    Self::Storage,
    Self::Stream,
    Self::Queue,
    Self::Schedule,
    Self::Generic,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Api => "api",
      Self::Storage => "storage",
      Self::Stream => "stream",
      Self::Queue => "queue",
      Self::Schedule => "schedule",
      Self::Generic => "generic",
    }
  }

  /// Parses a stored tag, accepting the spellings older manifests used.
  pub fn from_tag(tag: &str) -> Option<Self> {
    match tag.trim().to_ascii_lowercase().as_str() {
      "api" | "apigateway" | "http" => Some(Self::Api),
      "storage" | "s3" => Some(Self::Storage),
      "stream" | "dynamodb" | "kinesis" => Some(Self::Stream),
      "queue" | "sqs" => Some(Self::Queue),
      "schedule" | "cloudwatch" | "eventbridge" => Some(Self::Schedule),
      "generic" => Some(Self::Generic),
      _ => None,
    }
  }

  /// Maps a trigger's `Type` discriminator to an event type.
  pub fn from_trigger_type(trigger_type: &str) -> Option<Self> {
    match trigger_type {
      "Api" | "HttpApi" => Some(Self::Api),
      "S3" => Some(Self::Storage),
      "DynamoDB" | "Kinesis" => Some(Self::Stream),
      "SQS" => Some(Self::Queue),
      "Schedule" | "ScheduleV2" => Some(Self::Schedule),
      _ => None,
    }
  }
}

impl fmt::Display for EventType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for EventType {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::from_tag(s).ok_or_else(|| {
      let known: Vec<_> = Self::ALL.iter().map(|e| e.as_str()).collect();
      format!("unknown event type '{}' (expected one of: {})", s, known.join(", "))
    })
  }
}

/// Where the current environment variable set came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentOrigin {
  Manual,
  External { label: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnvironmentSource {
  Manual,
  ExternalSync,
}

/// Provenance sub-block recorded by `update_environment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentProvenance {
  pub last_updated: String,
  pub source: EnvironmentSource,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub origin_label: Option<String>,
  pub variable_count: usize,
}

/// The tool-owned block under `Metadata.Lamina`.
///
/// Every field is optional so partially written or hand-edited blocks still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateMetadata {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source_file: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source_dir: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub event_type: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_modified: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub version: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub build_method: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub architecture: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub runtime: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub environment: Option<EnvironmentProvenance>,
}

/// Keys that must hold a string for a block to count as complete.
pub const REQUIRED_METADATA_FIELDS: [&str; 4] = ["sourceFile", "sourceDir", "eventType", "version"];

impl PrivateMetadata {
  /// Reads a block leniently: non-string values are treated as absent.
  pub fn from_mapping(map: &Mapping) -> Self {
    let text = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);

    Self {
      source_file: text("sourceFile"),
      source_dir: text("sourceDir"),
      event_type: text("eventType"),
      last_modified: text("lastModified"),
      version: text("version"),
      build_method: text("buildMethod"),
      architecture: text("architecture"),
      runtime: text("runtime"),
      environment: map
        .get("environment")
        .and_then(|v| serde_yaml::from_value(v.clone()).ok()),
    }
  }

  pub fn to_mapping(&self) -> Mapping {
    match serde_yaml::to_value(self) {
      Ok(Value::Mapping(map)) => map,
      _ => Mapping::new(),
    }
  }
}

/// Fields that are missing or not strings in a raw metadata block.
pub fn missing_required_fields(map: &Mapping) -> Vec<&'static str> {
  REQUIRED_METADATA_FIELDS
    .into_iter()
    .filter(|key| !map.get(*key).is_some_and(Value::is_string))
    .collect()
}

/// Caller-supplied values used when neither the private metadata nor the
/// deployment section provides a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFallback {
  pub source_file: Option<PathBuf>,
  pub source_dir: Option<PathBuf>,
  pub event_type: Option<EventType>,
  pub runtime: Option<String>,
  pub architecture: Option<Architecture>,
  pub memory_size: Option<u32>,
  pub timeout: Option<u32>,
}

/// Normalized, read-only view of one function.
///
/// Computed from the manifest on every read and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionConfiguration {
  pub name: String,
  pub workspace: PathBuf,
  pub function_dir: PathBuf,
  pub manifest_path: PathBuf,
  pub logical_id: String,
  pub source_file: Option<PathBuf>,
  pub source_dir: Option<PathBuf>,
  pub event_type: EventType,
  pub runtime: String,
  pub architecture: Architecture,
  pub memory_size: u32,
  pub timeout: u32,
  pub environment: BTreeMap<String, String>,
  pub build_method: String,
  pub schema_version: Option<String>,
  pub code_uri: String,
  pub has_metadata: bool,
}

impl FunctionConfiguration {
  pub fn build_paths(&self) -> BuildPaths {
    BuildPaths::resolve(&self.function_dir, Some(&self.code_uri))
  }

  /// True when this configuration was produced from `source_file`'s metadata.
  pub fn is_for_source(&self, source_file: &Path) -> bool {
    self.has_metadata && self.source_file.as_deref().map(Path::as_os_str) == Some(source_file.as_os_str())
  }
}
