use std::path::Path;

use anyhow::Result;
use lamina_lib::config::Settings;
use lamina_lib::manifest::FunctionConfiguration;

use super::{lookup, registry};
use crate::output::{OutputFormat, print_info, print_json, print_stat, print_success, print_warning, symbols};

pub fn cmd_list(settings: &Settings, output: OutputFormat) -> Result<()> {
  let report = registry(settings).scan();

  if output.is_json() {
    return print_json(&report.functions);
  }

  for failure in &report.failures {
    print_warning(&format!("Skipped {}: {}", failure.function_dir.display(), failure.error));
  }

  if report.functions.is_empty() {
    print_info(&format!("No functions in {}", settings.workspace));
    return Ok(());
  }

  for config in &report.functions {
    let source = config
      .source_file
      .as_ref()
      .map(|p| p.display().to_string())
      .unwrap_or_default();
    println!(
      "{} [{}, {}] {} {}",
      config.name,
      config.event_type,
      config.architecture,
      symbols::ARROW,
      source
    );
  }

  if !report.unattributed.is_empty() {
    print_warning(&format!(
      "{} manifest(s) have no source linkage; run 'lamina validate'",
      report.unattributed.len()
    ));
  }
  print_info(&format!("{} function(s) total", report.functions.len()));
  Ok(())
}

pub fn cmd_show(settings: &Settings, source: &Path, output: OutputFormat) -> Result<()> {
  let Some(config) = lookup(&registry(settings), source)? else {
    return Ok(());
  };

  if output.is_json() {
    print_json(&config)
  } else {
    print_configuration(&config);
    Ok(())
  }
}

pub(super) fn print_configuration(config: &FunctionConfiguration) {
  print_success(&format!("{} ({})", config.name, config.logical_id));
  if let Some(source) = &config.source_file {
    print_stat("Source", &source.display().to_string());
  }
  print_stat("Manifest", &config.manifest_path.display().to_string());
  print_stat("Event type", config.event_type.as_str());
  print_stat("Runtime", &config.runtime);
  print_stat(
    "Architecture",
    &format!("{} (GOARCH={})", config.architecture, config.architecture.goarch()),
  );
  print_stat("Memory", &format!("{} MB", config.memory_size));
  print_stat("Timeout", &format!("{}s", config.timeout));
  print_stat("Build method", &config.build_method);
  if !config.environment.is_empty() {
    let keys: Vec<&str> = config.environment.keys().map(String::as_str).collect();
    print_stat("Environment", &keys.join(", "));
  }
}
