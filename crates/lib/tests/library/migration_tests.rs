use std::fs;

use lamina_lib::manifest::EventType;
use lamina_lib::migrate::Migrator;
use lamina_lib::registry::NewFunction;
use lamina_lib::validate::MetadataValidator;
use lamina_lib::workspace::event_path;
use serde_json::json;

use super::common::Fixture;

#[test]
fn legacy_registry_migrates_once() {
  let fx = Fixture::new();
  let api = fx.source("api/main.go");
  let ingest = fx.source("ingest/cmd/main.go");
  fs::write(
    fx.workspace().join("lamina-functions.json"),
    json!({
      "functions": [
        { "functionName": "api", "sourceFile": api, "eventType": "api", "memorySize": 512 },
        { "sourceFile": ingest, "eventType": "sqs", "architecture": "arm64", "timeout": 90 }
      ]
    })
    .to_string(),
  )
  .unwrap();

  let migrator = Migrator::new(fx.registry.workspace().clone(), fx.registry.store().clone());
  let report = migrator.migrate().unwrap();
  assert!(!report.is_noop());
  assert_eq!(report.created, vec!["api".to_string(), "ingest".to_string()]);
  assert!(report.failures.is_empty());
  assert!(!fx.workspace().join("lamina-functions.json").exists());
  assert!(fx.workspace().join("lamina-functions.json.bak").exists());

  let api_config = fx.registry.find_by_source_file(&api).unwrap();
  assert_eq!(api_config.event_type, EventType::Api);
  assert_eq!(api_config.memory_size, 512);
  assert!(event_path(&api_config.function_dir).exists());

  let ingest_config = fx.registry.find_by_source_file(&ingest).unwrap();
  assert_eq!(ingest_config.event_type, EventType::Queue);
  assert_eq!(ingest_config.architecture.as_str(), "arm64");
  assert_eq!(ingest_config.timeout, 90);

  let validator = MetadataValidator::new(fx.registry.workspace().clone(), fx.registry.store().clone());
  assert!(validator.validate().is_clean());

  let rerun = migrator.migrate().unwrap();
  assert!(rerun.is_noop());
  assert_eq!(fx.registry.list_all().len(), 2);
}

#[test]
fn migration_repairs_existing_manifests() {
  let fx = Fixture::new();
  let source = fx.source("legacy/main.go");
  let dir = fx.raw_manifest(
    "legacy",
    "Resources:\n  LegacyFunction:\n    Type: AWS::Lambda::Function\n    Properties:\n      Runtime: provided.al2\n",
  );
  fs::write(
    fx.workspace().join("lamina-functions.json"),
    json!([{ "name": "legacy", "sourceFile": source, "eventType": "s3" }]).to_string(),
  )
  .unwrap();

  let report = Migrator::new(fx.registry.workspace().clone(), fx.registry.store().clone())
    .migrate()
    .unwrap();
  assert_eq!(report.repaired, vec!["legacy".to_string()]);

  let config = fx.registry.find_by_source_file(&source).unwrap();
  assert_eq!(config.function_dir, dir);
  assert_eq!(config.event_type, EventType::Storage);
  assert_eq!(config.runtime, "provided.al2");
}

#[test]
fn existing_backup_is_not_overwritten() {
  let fx = Fixture::new();
  fs::write(fx.workspace().join("lamina-functions.json.bak"), "old backup").unwrap();
  fs::write(fx.workspace().join("lamina-functions.json"), "[]").unwrap();

  let report = Migrator::new(fx.registry.workspace().clone(), fx.registry.store().clone())
    .migrate()
    .unwrap();
  assert_eq!(
    report.backup_path,
    Some(fx.workspace().join("lamina-functions.json.bak.1"))
  );
  assert_eq!(
    fs::read_to_string(fx.workspace().join("lamina-functions.json.bak")).unwrap(),
    "old backup"
  );
}

#[test]
fn one_malformed_entry_does_not_block_the_rest() {
  let fx = Fixture::new();
  let good = fx.source("good/main.go");
  let bad = fx.source("bad/main.go");
  fs::write(
    fx.workspace().join("lamina-functions.json"),
    json!([
      { "sourceFile": bad, "memorySize": "512" },
      { "sourceFile": good, "eventType": "api" }
    ])
    .to_string(),
  )
  .unwrap();

  let report = Migrator::new(fx.registry.workspace().clone(), fx.registry.store().clone())
    .migrate()
    .unwrap();
  assert_eq!(report.created, vec!["good".to_string()]);
  assert_eq!(report.failures.len(), 1);
  assert_eq!(report.failures[0].entry, bad.display().to_string());
  assert!(fx.workspace().join("lamina-functions.json.bak").exists());

  assert_eq!(fx.registry.find_by_source_file(&good).unwrap().event_type, EventType::Api);
  assert!(fx.registry.find_by_source_file(&bad).is_none());
}

#[test]
fn entries_sharing_a_derived_name_stay_separate() {
  let fx = Fixture::new();
  let first = fx.source("a/api/main.go");
  let second = fx.source("b/api/main.go");
  fs::write(
    fx.workspace().join("lamina-functions.json"),
    json!([{ "sourceFile": first }, { "sourceFile": second, "eventType": "sqs" }]).to_string(),
  )
  .unwrap();

  let report = Migrator::new(fx.registry.workspace().clone(), fx.registry.store().clone())
    .migrate()
    .unwrap();
  assert_eq!(report.created, vec!["api".to_string(), "api-2".to_string()]);

  let first_config = fx.registry.find_by_source_file(&first).unwrap();
  let second_config = fx.registry.find_by_source_file(&second).unwrap();
  assert_eq!(first_config.name, "api");
  assert_eq!(second_config.name, "api-2");
  assert_eq!(second_config.event_type, EventType::Queue);
  assert_eq!(fx.registry.list_all().len(), 2);
}

#[test]
fn migration_leaves_other_sources_functions_alone() {
  let fx = Fixture::new();
  let registered = fx.source("one/api/main.go");
  let legacy = fx.source("two/api/main.go");
  fx.registry.register(&NewFunction::new(&registered)).unwrap();
  fs::write(
    fx.workspace().join("lamina-functions.json"),
    json!([{ "name": "api", "sourceFile": legacy }]).to_string(),
  )
  .unwrap();

  let report = Migrator::new(fx.registry.workspace().clone(), fx.registry.store().clone())
    .migrate()
    .unwrap();
  assert_eq!(report.created, vec!["api-2".to_string()]);
  assert_eq!(fx.registry.find_by_source_file(&registered).unwrap().name, "api");
  assert_eq!(fx.registry.find_by_source_file(&legacy).unwrap().name, "api-2");
}
