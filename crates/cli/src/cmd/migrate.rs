use anyhow::{Context, Result};
use lamina_lib::config::Settings;
use lamina_lib::migrate::Migrator;

use super::registry;
use crate::output::{print_info, print_stat, print_success, print_warning};

pub fn cmd_migrate(settings: &Settings) -> Result<()> {
  let registry = registry(settings);
  let migrator = Migrator::new(registry.workspace().clone(), registry.store().clone());
  let report = migrator.migrate().context("Migration failed")?;

  if report.is_noop() {
    print_info("No legacy registry found, nothing to migrate");
    return Ok(());
  }

  print_success(&format!(
    "Migrated {} function(s)",
    report.created.len() + report.repaired.len()
  ));
  if !report.created.is_empty() {
    print_stat("Created", &report.created.join(", "));
  }
  if !report.repaired.is_empty() {
    print_stat("Repaired", &report.repaired.join(", "));
  }
  for failure in &report.failures {
    print_warning(&format!("{}: {}", failure.entry, failure.error));
  }
  if let Some(backup) = &report.backup_path {
    print_stat("Backup", &backup.display().to_string());
  }
  Ok(())
}
