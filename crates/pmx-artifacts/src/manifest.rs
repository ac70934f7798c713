use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const MANIFEST_SCHEMA_VERSION: i32 = 1;

/// Record of a single module run, written next to its outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: i32,
    pub run_id: Uuid,
    pub module_name: String,
    /// Identity of the module header in the run's inputs.
    pub module_identity: Uuid,
    pub config_hash: String,
    /// "succeeded" or "failed"
    pub outcome: String,
    pub failure_reason: Option<String>,
    pub elapsed_ms: u64,
    pub cpu_ms: Option<u64>,
    pub created_at_utc: DateTime<Utc>,
    pub artifacts: ManifestArtifacts,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestArtifacts {
    pub manifest_json: String,
    pub summary_file: Option<String>,
    /// Explicitly routed outputs as `tag -> absolute path`.
    pub routed: Vec<(String, String)>,
    pub resources: Vec<String>,
}

pub struct RunManifestArgs<'a> {
    pub run_id: Uuid,
    pub module_name: &'a str,
    pub module_identity: Uuid,
    pub config_hash: &'a str,
    pub succeeded: bool,
    pub failure_reason: Option<String>,
    pub elapsed_ms: u64,
    pub cpu_ms: Option<u64>,
}

impl RunManifest {
    pub fn new(args: RunManifestArgs<'_>) -> Self {
        Self {
            schema_version: MANIFEST_SCHEMA_VERSION,
            run_id: args.run_id,
            module_name: args.module_name.to_string(),
            module_identity: args.module_identity,
            config_hash: args.config_hash.to_string(),
            outcome: if args.succeeded { "succeeded" } else { "failed" }.to_string(),
            failure_reason: args.failure_reason,
            elapsed_ms: args.elapsed_ms,
            cpu_ms: args.cpu_ms,
            created_at_utc: Utc::now(),
            artifacts: ManifestArtifacts {
                manifest_json: MANIFEST_FILE.to_string(),
                ..ManifestArtifacts::default()
            },
        }
    }

    pub fn succeeded(&self) -> bool {
        self.outcome == "succeeded"
    }
}

/// Write `<dir>/manifest.json`, creating `dir`. Overwrites a previous manifest.
pub fn write_run_manifest(dir: &Path, manifest: &RunManifest) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("create run dir failed: {}", dir.display()))?;

    let manifest_path = dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(manifest).context("serialize manifest failed")?;
    fs::write(&manifest_path, format!("{json}\n"))
        .with_context(|| format!("write manifest failed: {}", manifest_path.display()))?;

    Ok(manifest_path)
}

pub fn read_run_manifest(path: &Path) -> Result<RunManifest> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read manifest failed: {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse manifest failed: {}", path.display()))
}
