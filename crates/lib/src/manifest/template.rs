//! Generation of brand-new manifests.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_yaml::{Mapping, Value};

use crate::consts::{DEFAULT_BUILD_METHOD, DEFAULT_CODE_URI, METADATA_KEY, SCHEMA_VERSION};
use crate::platform::Architecture;

use super::types::{EventType, PrivateMetadata};

/// Everything needed to write a new manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateConfig {
  pub name: String,
  pub source_file: PathBuf,
  pub source_dir: PathBuf,
  pub event_type: EventType,
  pub runtime: String,
  pub architecture: Architecture,
  pub memory_size: u32,
  pub timeout: u32,
  pub environment: BTreeMap<String, String>,
}

fn mapping<const N: usize>(entries: [(&str, Value); N]) -> Value {
  Value::Mapping(entries.into_iter().map(|(k, v)| (Value::from(k), v)).collect())
}

/// `Foo-bar_baz` → `FooBarBazFunction`, a valid CloudFormation logical id.
pub fn logical_id(name: &str) -> String {
  let mut id: String = name
    .split(|c: char| !c.is_ascii_alphanumeric())
    .filter(|part| !part.is_empty())
    .map(|part| {
      let mut chars = part.chars();
      match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
      }
    })
    .collect();

  if !id.starts_with(|c: char| c.is_ascii_alphabetic()) {
    id.insert_str(0, "Fn");
  }
  id.push_str("Function");
  id
}

/// Trigger entry written for each event type; unknown kinds get a schedule.
pub fn trigger_skeleton(event_type: EventType) -> (&'static str, Value) {
  match event_type {
    EventType::Api => (
      "Api",
      mapping([
        ("Type", Value::from("Api")),
        (
          "Properties",
          mapping([("Path", Value::from("/{proxy+}")), ("Method", Value::from("any"))]),
        ),
      ]),
    ),
    EventType::Storage => (
      "Upload",
      mapping([
        ("Type", Value::from("S3")),
        (
          "Properties",
          mapping([
            ("Bucket", mapping([("Ref", Value::from("SourceBucket"))])),
            ("Events", Value::from("s3:ObjectCreated:*")),
          ]),
        ),
      ]),
    ),
    EventType::Stream => (
      "Stream",
      mapping([
        ("Type", Value::from("DynamoDB")),
        (
          "Properties",
          mapping([
            (
              "Stream",
              Value::from("arn:aws:dynamodb:us-east-1:123456789012:table/my-table/stream/2024-01-01T00:00:00.000"),
            ),
            ("StartingPosition", Value::from("TRIM_HORIZON")),
            ("BatchSize", Value::from(100)),
          ]),
        ),
      ]),
    ),
    EventType::Queue => (
      "Queue",
      mapping([
        ("Type", Value::from("SQS")),
        (
          "Properties",
          mapping([
            ("Queue", Value::from("arn:aws:sqs:us-east-1:123456789012:my-queue")),
            ("BatchSize", Value::from(10)),
          ]),
        ),
      ]),
    ),
    EventType::Schedule | EventType::Generic => (
      "Schedule",
      mapping([
        ("Type", Value::from("Schedule")),
        (
          "Properties",
          mapping([
            ("Schedule", Value::from("rate(5 minutes)")),
            ("Enabled", Value::from(false)),
          ]),
        ),
      ]),
    ),
  }
}

/// Build the document for a new function, private metadata included.
pub fn render(config: &TemplateConfig, timestamp: &str) -> Mapping {
  let (trigger_name, trigger) = trigger_skeleton(config.event_type);

  let mut properties = Mapping::new();
  properties.insert(Value::from("CodeUri"), Value::from(DEFAULT_CODE_URI));
  properties.insert(Value::from("Handler"), Value::from("bootstrap"));
  properties.insert(Value::from("Runtime"), Value::from(config.runtime.as_str()));
  properties.insert(Value::from("MemorySize"), Value::from(config.memory_size));
  properties.insert(Value::from("Timeout"), Value::from(config.timeout));
  properties.insert(
    Value::from("Architectures"),
    Value::Sequence(vec![Value::from(config.architecture.as_str())]),
  );
  if !config.environment.is_empty() {
    let vars: Mapping = config
      .environment
      .iter()
      .map(|(k, v)| (Value::from(k.as_str()), Value::from(v.as_str())))
      .collect();
    properties.insert(Value::from("Environment"), mapping([("Variables", Value::Mapping(vars))]));
  }
  properties.insert(Value::from("Events"), mapping([(trigger_name, trigger)]));

  let mut resources = Mapping::new();
  resources.insert(
    Value::from(logical_id(&config.name)),
    mapping([
      ("Type", Value::from("AWS::Serverless::Function")),
      ("Properties", Value::Mapping(properties)),
    ]),
  );
  if config.event_type == EventType::Storage {
    resources.insert(
      Value::from("SourceBucket"),
      mapping([("Type", Value::from("AWS::S3::Bucket"))]),
    );
  }

  let metadata = PrivateMetadata {
    source_file: Some(config.source_file.to_string_lossy().into_owned()),
    source_dir: Some(config.source_dir.to_string_lossy().into_owned()),
    event_type: Some(config.event_type.as_str().to_string()),
    last_modified: Some(timestamp.to_string()),
    version: Some(SCHEMA_VERSION.to_string()),
    build_method: Some(DEFAULT_BUILD_METHOD.to_string()),
    architecture: Some(config.architecture.as_str().to_string()),
    runtime: Some(config.runtime.clone()),
    environment: None,
  };

  let mut root = Mapping::new();
  root.insert(Value::from("AWSTemplateFormatVersion"), Value::from("2010-09-09"));
  root.insert(Value::from("Transform"), Value::from("AWS::Serverless-2016-10-31"));
  root.insert(Value::from("Description"), Value::from(format!("{} function", config.name)));
  root.insert(
    Value::from("Metadata"),
    mapping([(METADATA_KEY, Value::Mapping(metadata.to_mapping()))]),
  );
  root.insert(Value::from("Resources"), Value::Mapping(resources));
  root
}
