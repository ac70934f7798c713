use pmx_config::{load_layered_yaml_from_strings, report_unused_keys, UnusedKeyPolicy};

const YAML: &str = r#"
reporting:
  host: none
run:
  output_dir: out
hypervisor_ip: 10.0.0.1
legacy:
  foo: 1
"#;

#[test]
fn warn_mode_reports_unused_keys_without_error() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn).unwrap();

    assert_eq!(
        report.unused_leaf_pointers,
        vec!["/hypervisor_ip".to_string(), "/legacy/foo".to_string()]
    );
}

#[test]
fn fail_mode_errors_on_unused_keys() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();
    let err = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap_err();
    assert!(format!("{err:?}").contains("CONFIG_UNUSED_KEYS"));
}

#[test]
fn consumed_keys_are_clean() {
    let loaded = load_layered_yaml_from_strings(&["reporting:\n  enabled: false\n"]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap();
    assert!(report.is_clean());

    let empty = load_layered_yaml_from_strings(&["{}"]).unwrap();
    assert!(report_unused_keys(&empty.config_json, UnusedKeyPolicy::Fail)
        .unwrap()
        .is_clean());
}
