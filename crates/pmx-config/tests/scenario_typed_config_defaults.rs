use anyhow::Result;
use pmx_config::*;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn scenario_empty_config_takes_defaults() -> Result<()> {
    let loaded = load_layered_yaml_from_strings(&["{}"])?;
    let cfg = PmxConfig::from_loaded(&loaded)?;

    assert_eq!(cfg, PmxConfig::default());
    assert!(!cfg.reporting.is_active());
    assert_eq!(cfg.reporting.host, HOST_DISABLED);
    assert_eq!(cfg.run.summary_file, DEFAULT_SUMMARY_FILE);
    Ok(())
}

#[test]
fn scenario_layered_files_build_reporting_config() -> Result<()> {
    let tmp = tempdir()?;
    let base = tmp.path().join("base.yaml");
    let site = tmp.path().join("site.yaml");
    fs::write(&base, "reporting:\n  enabled: true\nrun:\n  output_dir: /tmp/pmx\n")?;
    fs::write(&site, "reporting:\n  host: hv.lab:8080\n  timeout_ms: 2500\n")?;

    let loaded = load_layered_yaml(&[&base, &site])?;
    let cfg = PmxConfig::from_loaded(&loaded)?;

    assert!(cfg.reporting.is_active());
    assert_eq!(cfg.reporting.timeout_ms, 2500);
    assert_eq!(cfg.reporting.service_path, DEFAULT_SERVICE_PATH);
    assert_eq!(cfg.run.output_dir, PathBuf::from("/tmp/pmx"));
    Ok(())
}

#[test]
fn scenario_missing_file_is_an_error() {
    let err = load_layered_yaml(&["/definitely/not/here.yaml"]).unwrap_err();
    assert!(format!("{err:#}").contains("failed to read yaml path"));
}

#[test]
fn scenario_wrong_type_is_a_schema_error() -> Result<()> {
    let loaded = load_layered_yaml_from_strings(&["reporting:\n  enabled: maybe\n"])?;
    assert!(PmxConfig::from_loaded(&loaded).is_err());
    Ok(())
}
