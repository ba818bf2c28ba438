use std::path::Path;

use anyhow::{Context, Result, bail};
use lamina_lib::config::Settings;
use lamina_lib::manifest::EventType;
use lamina_lib::registry::absolute_source;
use lamina_lib::validate::{MetadataValidator, RepairRequest};
use lamina_lib::workspace::{is_valid_function_name, manifest_path};

use super::registry;
use crate::output::{OutputFormat, print_info, print_json, print_success, print_warning};

pub fn cmd_validate(settings: &Settings, output: OutputFormat) -> Result<()> {
  let registry = registry(settings);
  let validator = MetadataValidator::new(registry.workspace().clone(), registry.store().clone());
  let report = validator.validate();

  if output.is_json() {
    return print_json(&report);
  }

  for issue in &report.issues {
    print_warning(&format!("{}: {}", issue.function, issue.description()));
  }

  if report.is_clean() {
    print_success(&format!("{} manifest(s) checked, no issues", report.checked));
  } else {
    print_info(&format!(
      "{} manifest(s) checked, {} issue(s); fix with 'lamina repair <name> --source <file>'",
      report.checked,
      report.issues.len()
    ));
  }
  Ok(())
}

pub fn cmd_repair(settings: &Settings, name: &str, source: &Path, event_type: Option<EventType>) -> Result<()> {
  if !is_valid_function_name(name) {
    bail!("Invalid function name '{}'", name);
  }

  let registry = registry(settings);
  let function_dir = registry.workspace().function_dir(name);
  if !manifest_path(&function_dir).exists() {
    bail!("No manifest found for function '{}' in {}", name, registry.workspace());
  }

  let source_file = absolute_source(source)?;
  let request = RepairRequest {
    source_file: Some(source_file),
    source_dir: None,
    event_type,
  };

  let validator = MetadataValidator::new(registry.workspace().clone(), registry.store().clone());
  validator
    .repair(&function_dir, &request)
    .with_context(|| format!("Failed to repair {}", name))?;
  print_success(&format!("Repaired metadata for {}", name));
  Ok(())
}
