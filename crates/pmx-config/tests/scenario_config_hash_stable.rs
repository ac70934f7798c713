//! Config hash stability: same layers -> same hash, key order irrelevant,
//! overlays take effect.

use pmx_config::load_layered_yaml_from_strings;

const BASE_YAML: &str = r#"
reporting:
  enabled: true
  host: "hv.lab:8080"
run:
  output_dir: "/data/out"
"#;

const BASE_YAML_REORDERED: &str = r#"
run:
  output_dir: "/data/out"
reporting:
  host: "hv.lab:8080"
  enabled: true
"#;

const OVERLAY_YAML: &str = r#"
reporting:
  host: none
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
}

#[test]
fn reordered_keys_produce_same_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
}

#[test]
fn overlay_overrides_and_changes_hash() {
    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let merged = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();

    assert_ne!(base.config_hash, merged.config_hash);
    assert_eq!(
        merged.config_json.pointer("/reporting/host").and_then(|v| v.as_str()),
        Some("none")
    );
    assert_eq!(
        merged.config_json.pointer("/reporting/enabled").and_then(|v| v.as_bool()),
        Some(true)
    );
}

#[test]
fn hash_is_64_hex_chars() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(loaded.config_hash.len(), 64);
    assert!(loaded.config_hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn non_mapping_root_is_rejected() {
    assert!(load_layered_yaml_from_strings(&["- a\n- b\n"]).is_err());
    assert!(load_layered_yaml_from_strings(&["reporting: [unclosed"]).is_err());
}
