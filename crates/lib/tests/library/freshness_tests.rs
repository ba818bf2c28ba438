use lamina_lib::freshness::{BuildFreshnessOracle, Freshness, StaleReason};
use lamina_lib::platform::Architecture;
use lamina_lib::registry::NewFunction;

use super::common::{Fixture, set_age, write_aged};

#[test]
fn fresh_build_goes_stale_when_the_manifest_changes() {
  let fx = Fixture::new();
  let source = fx.source("thumbnails/main.go");
  let config = fx.registry.register(&NewFunction::new(&source)).unwrap();
  let build = config.build_paths();
  let oracle = BuildFreshnessOracle::new();

  assert_eq!(
    oracle.check(&config),
    Freshness::Stale {
      reason: StaleReason::BuildOutputMissing
    }
  );

  set_age(&source, 600);
  set_age(&config.manifest_path, 600);
  write_aged(&build.artifact, "binary", 60);
  assert_eq!(oracle.check(&config), Freshness::Fresh);

  fx.registry
    .store()
    .update_architecture(&config.function_dir, Architecture::Arm64)
    .unwrap();
  let config = fx.registry.find_by_source_file(&source).unwrap();
  assert_eq!(config.architecture, Architecture::Arm64);
  assert_eq!(
    oracle.check(&config).reason(),
    Some(&StaleReason::ManifestNewer)
  );
}

#[test]
fn touched_source_needs_rebuild() {
  let fx = Fixture::new();
  let source = fx.source("mailer/main.go");
  let config = fx.registry.register(&NewFunction::new(&source)).unwrap();

  set_age(&config.manifest_path, 600);
  write_aged(&config.build_paths().artifact, "binary", 300);
  set_age(&source, 10);

  let oracle = BuildFreshnessOracle::new();
  assert!(oracle.needs_rebuild(&config));
  assert_eq!(oracle.check(&config).reason(), Some(&StaleReason::SourceNewer));
}

#[test]
fn deleted_source_is_stale() {
  let fx = Fixture::new();
  let source = fx.source("gone/main.go");
  let config = fx.registry.register(&NewFunction::new(&source)).unwrap();
  write_aged(&config.build_paths().artifact, "binary", 0);
  std::fs::remove_file(&source).unwrap();

  let oracle = BuildFreshnessOracle::new();
  assert_eq!(oracle.check(&config).reason(), Some(&StaleReason::SourceMissing));
}

#[test]
fn status_pairs_every_listed_function() {
  let fx = Fixture::new();
  fx.registry.register(&NewFunction::new(fx.source("one/main.go"))).unwrap();
  fx.registry.register(&NewFunction::new(fx.source("two/main.go"))).unwrap();

  let status = fx.registry.status(&BuildFreshnessOracle::new());
  assert_eq!(status.len(), 2);
  assert!(status.iter().all(|(_, freshness)| freshness.is_stale()));
}
