//! Workspace-level scenarios run against real temporary directories.

mod library {
  pub mod common;
  mod freshness_tests;
  mod migration_tests;
  mod registry_tests;
}
