use std::path::Path;
use std::time::SystemTime;

use anyhow::Result;
use lamina_lib::config::Settings;
use lamina_lib::freshness::{BuildFreshnessOracle, Freshness};
use lamina_lib::manifest::FunctionConfiguration;
use serde::Serialize;

use super::{lookup, registry};
use crate::output::{OutputFormat, format_age, print_info, print_json, print_stat, print_success, print_warning};

pub fn cmd_freshness(settings: &Settings, source: &Path) -> Result<()> {
  let Some(config) = lookup(&registry(settings), source)? else {
    return Ok(());
  };

  let freshness = BuildFreshnessOracle::new().check(&config);
  match &freshness {
    Freshness::Fresh => print_success(&format!("{} is up to date", config.name)),
    Freshness::Stale { reason } => print_warning(&format!("{} needs rebuilding: {}", config.name, reason)),
  }
  if let Some(age) = artifact_age(&config) {
    print_stat("Last build", &format!("{} ago", format_age(age)));
  }
  let archive = config.build_paths().archive;
  if archive.is_file() {
    print_stat("Archive", &archive.display().to_string());
  }
  Ok(())
}

#[derive(Serialize)]
struct StatusItem<'a> {
  name: &'a str,
  source_file: Option<&'a Path>,
  #[serde(flatten)]
  freshness: &'a Freshness,
}

pub fn cmd_status(settings: &Settings, output: OutputFormat) -> Result<()> {
  let status = registry(settings).status(&BuildFreshnessOracle::new());

  if output.is_json() {
    let items: Vec<StatusItem> = status
      .iter()
      .map(|(config, freshness)| StatusItem {
        name: &config.name,
        source_file: config.source_file.as_deref(),
        freshness,
      })
      .collect();
    return print_json(&items);
  }

  if status.is_empty() {
    print_info(&format!("No functions in {}", settings.workspace));
    return Ok(());
  }

  for (config, freshness) in &status {
    match freshness {
      Freshness::Fresh => print_success(&config.name),
      Freshness::Stale { reason } => print_warning(&format!("{}: {}", config.name, reason)),
    }
  }

  let stale = status.iter().filter(|(_, f)| f.is_stale()).count();
  print_info(&format!("{} of {} function(s) need rebuilding", stale, status.len()));
  Ok(())
}

fn artifact_age(config: &FunctionConfiguration) -> Option<std::time::Duration> {
  let modified = std::fs::metadata(config.build_paths().artifact).ok()?.modified().ok()?;
  SystemTime::now().duration_since(modified).ok()
}
