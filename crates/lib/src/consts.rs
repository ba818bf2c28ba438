//! Fixed names shared across the crate.

pub const APP_NAME: &str = "lamina";

/// Manifest file inside every function directory.
pub const MANIFEST_FILENAME: &str = "template.yaml";

/// Key under the template's top-level `Metadata` section owned by this tool.
pub const METADATA_KEY: &str = "Lamina";

/// Current private metadata schema version.
pub const SCHEMA_VERSION: &str = "2.0";

pub const BUILD_DIR: &str = "build";
pub const ARTIFACT_NAME: &str = "bootstrap";
pub const ARCHIVE_NAME: &str = "function.zip";
pub const EVENT_FILENAME: &str = "event.json";

/// Workspace-wide registry used before per-function manifests existed.
pub const LEGACY_REGISTRY_FILENAME: &str = "lamina-functions.json";
pub const LEGACY_BACKUP_SUFFIX: &str = ".bak";

/// Directory names too generic to identify a function (`cmd/main.go`).
pub const GENERIC_DIR_NAMES: &[&str] = &["cmd"];

pub const DEFAULT_FUNCTION_NAME: &str = "function";
pub const DEFAULT_RUNTIME: &str = "provided.al2023";
pub const DEFAULT_MEMORY_SIZE: u32 = 128;
pub const DEFAULT_TIMEOUT: u32 = 30;
pub const DEFAULT_BUILD_METHOD: &str = "go-build";
pub const DEFAULT_CODE_URI: &str = "build/";

pub const FUNCTION_RESOURCE_TYPES: &[&str] = &["AWS::Serverless::Function", "AWS::Lambda::Function"];
