//! CLI smoke tests for lamina.
//!
//! Each test drives the binary against a throwaway workspace passed with
//! `--workspace`, so nothing touches the user's data directory.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

struct Env {
  temp: TempDir,
}

impl Env {
  fn new() -> Self {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("functions")).unwrap();
    Self { temp }
  }

  fn workspace(&self) -> PathBuf {
    self.temp.path().join("functions")
  }

  /// Create a Go entry point under `src/` and return its canonical path.
  fn source(&self, relative: &str) -> PathBuf {
    let path = self.temp.path().join("src").join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "package main\n").unwrap();
    dunce::canonicalize(path).unwrap()
  }

  fn cmd(&self) -> Command {
    let mut cmd = cargo_bin_cmd!("lamina");
    cmd
      .arg("--workspace")
      .arg(self.workspace())
      .env_remove("RUST_LOG")
      .env_remove("LAMINA_DEFAULT_ARCH")
      .env_remove("LAMINA_DEFAULT_RUNTIME");
    cmd
  }

  fn register(&self, source: &Path, extra: &[&str]) {
    self.cmd().arg("register").arg(source).args(extra).assert().success();
  }
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  cargo_bin_cmd!("lamina")
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  cargo_bin_cmd!("lamina")
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("lamina"));
}

#[test]
fn unknown_event_type_is_rejected() {
  let env = Env::new();
  let source = env.source("api/main.go");
  env
    .cmd()
    .args(["register", "--event-type", "carrier-pigeon"])
    .arg(&source)
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown event type"));
}

// =============================================================================
// Registration lifecycle
// =============================================================================

#[test]
fn empty_workspace_lists_nothing() {
  let env = Env::new();
  env
    .cmd()
    .arg("list")
    .assert()
    .success()
    .stdout(predicate::str::contains("No functions"));
}

#[test]
fn register_then_list_and_show() {
  let env = Env::new();
  let source = env.source("orders/main.go");
  env.register(&source, &["--event-type", "queue"]);

  assert!(env.workspace().join("orders/template.yaml").exists());
  assert!(env.workspace().join("orders/event.json").exists());

  env
    .cmd()
    .arg("list")
    .assert()
    .success()
    .stdout(predicate::str::contains("orders [queue, x86_64]"));

  let output = env.cmd().args(["show", "-o", "json"]).arg(&source).output().unwrap();
  assert!(output.status.success());
  let config: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(config["name"], "orders");
  assert_eq!(config["event_type"], "queue");
  assert_eq!(config["logical_id"], "OrdersFunction");
}

#[test]
fn show_unconfigured_source_is_informational() {
  let env = Env::new();
  let source = env.source("nothing/main.go");
  env
    .cmd()
    .arg("show")
    .arg(&source)
    .assert()
    .success()
    .stdout(predicate::str::contains("No function is configured"));
}

#[test]
fn unregister_removes_function() {
  let env = Env::new();
  let source = env.source("reports/main.go");
  env.register(&source, &[]);

  env
    .cmd()
    .arg("unregister")
    .arg(&source)
    .assert()
    .success()
    .stdout(predicate::str::contains("Removed"));
  assert!(!env.workspace().join("reports").exists());
  assert!(source.exists());
}

// =============================================================================
// Mutations
// =============================================================================

#[test]
fn env_set_and_arch_update_the_manifest() {
  let env = Env::new();
  let source = env.source("mailer/main.go");
  env.register(&source, &[]);

  env
    .cmd()
    .args(["env", "set"])
    .arg(&source)
    .args(["SMTP_HOST=mail.internal", "RETRIES=3", "--origin", "vault"])
    .assert()
    .success();
  env.cmd().arg("arch").arg(&source).arg("arm64").assert().success();

  let manifest = fs::read_to_string(env.workspace().join("mailer/template.yaml")).unwrap();
  assert!(manifest.contains("SMTP_HOST: mail.internal"));
  assert!(manifest.contains("external-sync"));
  assert!(manifest.contains("arm64"));

  env
    .cmd()
    .arg("freshness")
    .arg(&source)
    .assert()
    .success()
    .stderr(predicate::str::contains("build output is missing"));
}

#[test]
fn freshness_reports_packaged_archive() {
  let env = Env::new();
  let source = env.source("billing/main.go");
  env.register(&source, &[]);
  let build = env.workspace().join("billing/build");
  fs::create_dir_all(&build).unwrap();
  fs::write(build.join("bootstrap"), "binary").unwrap();
  fs::write(build.join("function.zip"), "zip").unwrap();

  env
    .cmd()
    .arg("freshness")
    .arg(&source)
    .assert()
    .success()
    .stdout(predicate::str::contains("Last build"))
    .stdout(predicate::str::contains("function.zip"));
}

#[test]
fn invalid_env_assignment_fails() {
  let env = Env::new();
  let source = env.source("mailer/main.go");
  env
    .cmd()
    .args(["env", "set"])
    .arg(&source)
    .arg("NOEQUALS")
    .assert()
    .failure();
}

// =============================================================================
// Validation, repair and migration
// =============================================================================

#[test]
fn validate_then_repair_bare_manifest() {
  let env = Env::new();
  let source = env.source("legacy/main.go");
  let dir = env.workspace().join("legacy");
  fs::create_dir_all(&dir).unwrap();
  fs::write(
    dir.join("template.yaml"),
    "Resources:\n  LegacyFunction:\n    Type: AWS::Serverless::Function\n    Properties:\n      Runtime: provided.al2\n",
  )
  .unwrap();

  env
    .cmd()
    .arg("validate")
    .assert()
    .success()
    .stderr(predicate::str::contains("legacy: manifest has no private metadata"));

  env
    .cmd()
    .args(["repair", "legacy", "--source"])
    .arg(&source)
    .args(["--event-type", "api"])
    .assert()
    .success();

  env
    .cmd()
    .arg("validate")
    .assert()
    .success()
    .stdout(predicate::str::contains("no issues"));
}

#[test]
fn repair_unknown_function_fails() {
  let env = Env::new();
  let source = env.source("ghost/main.go");
  env
    .cmd()
    .args(["repair", "ghost", "--source"])
    .arg(&source)
    .assert()
    .failure()
    .stderr(predicate::str::contains("No manifest found"));
}

#[test]
fn repair_rejects_names_outside_the_workspace() {
  let env = Env::new();
  let source = env.source("escape/main.go");
  let outside = env.temp.path().join("x");
  fs::create_dir_all(&outside).unwrap();
  fs::write(
    outside.join("template.yaml"),
    "Resources:\n  XFunction:\n    Type: AWS::Serverless::Function\n",
  )
  .unwrap();

  env
    .cmd()
    .args(["repair", "../x", "--source"])
    .arg(&source)
    .assert()
    .failure()
    .stderr(predicate::str::contains("Invalid function name"));
  assert!(!fs::read_to_string(outside.join("template.yaml")).unwrap().contains("Lamina"));
}

#[test]
fn migrate_runs_once() {
  let env = Env::new();
  let source = env.source("ingest/cmd/main.go");
  fs::write(
    env.workspace().join("lamina-functions.json"),
    serde_json::json!([{ "sourceFile": source, "eventType": "sqs" }]).to_string(),
  )
  .unwrap();

  env
    .cmd()
    .arg("migrate")
    .assert()
    .success()
    .stdout(predicate::str::contains("Migrated 1 function(s)"));
  env
    .cmd()
    .arg("migrate")
    .assert()
    .success()
    .stdout(predicate::str::contains("nothing to migrate"));

  env
    .cmd()
    .args(["status", "-o", "json"])
    .assert()
    .success()
    .stdout(predicate::str::contains("\"name\": \"ingest\""));
}
