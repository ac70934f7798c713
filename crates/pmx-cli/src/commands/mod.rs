//! Command handlers for the `pmx` binary.
//!
//! Shared utilities used by multiple command paths live here.

pub mod run;

use anyhow::{Context, Result};
use pmx_config::{
    load_layered_yaml, load_layered_yaml_from_strings, report_unused_keys, LoadedConfig,
    PmxConfig, UnusedKeyPolicy,
};
use pmx_runtime::{ModuleRegistry, RegistryError};
use std::path::PathBuf;
use std::process::ExitCode;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// clap value parser for `KEY=VALUE` arguments. The key must be non-empty;
/// the value may contain further `=`.
pub fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (k, v) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let k = k.trim();
    if k.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((k.to_string(), v.to_string()))
}

/// Load layered config (defaults when no path is given), warn on unused
/// keys, and apply environment overrides.
pub fn load_config(paths: &[PathBuf]) -> Result<(LoadedConfig, PmxConfig)> {
    let loaded = if paths.is_empty() {
        load_layered_yaml_from_strings(&["{}"])?
    } else {
        load_layered_yaml(paths)?
    };

    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    if !report.is_clean() {
        eprintln!(
            "WARN: CONFIG_UNUSED_KEYS unused_leaf_keys={}",
            report.unused_leaf_pointers.len()
        );
        for p in report.unused_leaf_pointers.iter().take(50) {
            eprintln!("  unused={}", p);
        }
    }

    let mut cfg = PmxConfig::from_loaded(&loaded).context("invalid pmx config")?;
    cfg.apply_env_overrides();
    Ok((loaded, cfg))
}

/// Modules this binary can run.
#[cfg(not(feature = "testkit"))]
pub fn catalogue() -> Result<ModuleRegistry, RegistryError> {
    pmx_modules::builtin_registry()
}

/// Modules this binary can run, including the fault-injection modules.
#[cfg(feature = "testkit")]
pub fn catalogue() -> Result<ModuleRegistry, RegistryError> {
    pmx_testkit::reference_registry()
}

pub fn list_modules() -> Result<ExitCode> {
    let registry = catalogue()?;
    for spec in registry.list() {
        println!(
            "module={} version={} description={}",
            spec.name, spec.version, spec.description
        );
    }
    Ok(ExitCode::SUCCESS)
}
