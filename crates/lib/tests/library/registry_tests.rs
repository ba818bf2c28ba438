use lamina_lib::manifest::EventType;
use lamina_lib::registry::NewFunction;
use lamina_lib::validate::{IssueKind, MetadataValidator, RepairRequest};

use super::common::Fixture;

const BARE: &str = r#"AWSTemplateFormatVersion: '2010-09-09'
Transform: AWS::Serverless-2016-10-31
Resources:
  LegacyFunction:
    Type: AWS::Serverless::Function
    Properties:
      CodeUri: build/
      Handler: bootstrap
      Runtime: provided.al2
      Architectures:
        - arm64
"#;

#[test]
fn only_attributed_functions_are_listed_until_repaired() {
  let fx = Fixture::new();
  let orders = fx.source("orders/main.go");
  let legacy = fx.source("legacy/main.go");

  let mut request = NewFunction::new(&orders);
  request.event_type = Some(EventType::Queue);
  fx.registry.register(&request).unwrap();
  let bare_dir = fx.raw_manifest("legacy", BARE);

  let listed = fx.registry.list_all();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].name, "orders");
  assert_eq!(listed[0].event_type, EventType::Queue);

  let validator = MetadataValidator::new(fx.registry.workspace().clone(), fx.registry.store().clone());
  let report = validator.validate();
  assert_eq!(report.checked, 2);
  assert_eq!(report.issues.len(), 1);
  assert_eq!(report.issues[0].function, "legacy");
  assert_eq!(report.issues[0].kind, IssueKind::MissingMetadata);

  validator
    .repair(
      &bare_dir,
      &RepairRequest {
        source_file: Some(legacy.clone()),
        source_dir: None,
        event_type: Some(EventType::Api),
      },
    )
    .unwrap();

  assert!(validator.validate().is_clean());
  let listed = fx.registry.list_all();
  assert_eq!(listed.len(), 2);

  let repaired = fx.registry.find_by_source_file(&legacy).unwrap();
  assert_eq!(repaired.name, "legacy");
  assert_eq!(repaired.architecture.as_str(), "arm64");
  assert_eq!(repaired.runtime, "provided.al2");
}

#[test]
fn registering_twice_keeps_one_function() {
  let fx = Fixture::new();
  let source = fx.source("billing/cmd/main.go");

  let first = fx.registry.register(&NewFunction::new(&source)).unwrap();
  let mut again = NewFunction::new(&source);
  again.event_type = Some(EventType::Schedule);
  let second = fx.registry.register(&again).unwrap();

  assert_eq!(first.function_dir, second.function_dir);
  assert_eq!(second.name, "billing");
  assert_eq!(second.event_type, EventType::Schedule);
  assert_eq!(fx.registry.list_all().len(), 1);
}

#[test]
fn name_collisions_get_numeric_suffixes() {
  let fx = Fixture::new();
  let a = fx.source("a/worker/main.go");
  let b = fx.source("b/worker/main.go");

  let first = fx.registry.register(&NewFunction::new(&a)).unwrap();
  let second = fx.registry.register(&NewFunction::new(&b)).unwrap();

  assert_eq!(first.name, "worker");
  assert_eq!(second.name, "worker-2");
  assert_eq!(fx.registry.find_by_source_file(&b).unwrap().name, "worker-2");
}

#[test]
fn unregister_removes_only_the_function_directory() {
  let fx = Fixture::new();
  let source = fx.source("reports/main.go");
  let config = fx.registry.register(&NewFunction::new(&source)).unwrap();

  let removed = fx.registry.unregister(&source).unwrap();
  assert_eq!(removed, Some(config.function_dir.clone()));
  assert!(!config.function_dir.exists());
  assert!(source.exists());
  assert!(fx.registry.find_by_source_file(&source).is_none());

  assert_eq!(fx.registry.unregister(&source).unwrap(), None);
}

#[test]
fn corrupt_manifest_does_not_hide_the_rest() {
  let fx = Fixture::new();
  let source = fx.source("healthy/main.go");
  fx.registry.register(&NewFunction::new(&source)).unwrap();
  fx.raw_manifest("broken", "Resources: [unterminated\n");

  let report = fx.registry.scan();
  assert_eq!(report.functions.len(), 1);
  assert_eq!(report.failures.len(), 1);
  assert!(fx.registry.find_by_source_file(&source).is_some());
}

#[test]
fn source_only_metadata_is_not_attributed() {
  let fx = Fixture::new();
  let half = fx.source("half/main.go");
  let dir = fx.raw_manifest(
    "half",
    &format!(
      "Metadata:\n  Lamina:\n    sourceFile: {}\nResources:\n  HalfFunction:\n    Type: AWS::Serverless::Function\n",
      half.display()
    ),
  );

  assert!(fx.registry.find_by_source_file(&half).is_none());
  assert!(fx.registry.list_all().is_empty());
  assert_eq!(fx.registry.unregister(&half).unwrap(), None);
  assert!(dir.join("template.yaml").exists());

  let validator = MetadataValidator::new(fx.registry.workspace().clone(), fx.registry.store().clone());
  let report = validator.validate();
  assert!(matches!(report.issues[0].kind, IssueKind::IncompleteMetadata { .. }));

  validator
    .repair(
      &dir,
      &RepairRequest {
        source_file: Some(half.clone()),
        source_dir: None,
        event_type: None,
      },
    )
    .unwrap();
  assert_eq!(fx.registry.find_by_source_file(&half).unwrap().function_dir, dir);
}
