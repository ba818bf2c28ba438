//! lamina-lib: Core types and logic for Lamina
//!
//! This crate keeps per-function serverless manifests in a workspace and
//! reconciles them with the source files they were generated from:
//! - `ManifestStore`: reads and merges `template.yaml` plus its private metadata
//! - `FunctionRegistry`: discovers, registers and removes function directories
//! - `BuildFreshnessOracle`: decides whether a function needs rebuilding
//! - `MetadataValidator` / `Migrator`: repair incomplete metadata and import
//!   the legacy workspace-wide registry

pub mod config;
pub mod consts;
pub mod events;
pub mod freshness;
pub mod manifest;
pub mod migrate;
pub mod platform;
pub mod registry;
pub mod validate;
pub mod workspace;
