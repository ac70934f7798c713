use anyhow::Result;
use pmx_artifacts::*;
use pmx_params::{LeafParam, ParamCollection, ParamValue};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn outputs_with_file(src: PathBuf) -> ParamCollection {
    let mut report = LeafParam::file("report").with_output_tag("rep");
    report.set_value(ParamValue::File(src)).unwrap();
    ParamCollection::new("Outputs")
        .with_child(LeafParam::int_value("x", 10))
        .with_child(report)
        .with_child(LeafParam::int_value("Execution Time", 4).internal())
}

#[test]
fn scenario_no_destinations_falls_back_to_output_dir() -> Result<()> {
    let tmp = tempdir()?;
    let src = tmp.path().join("work").join("report.csv");
    fs::create_dir_all(src.parent().unwrap())?;
    fs::write(&src, "a,b\n1,2\n")?;

    let out_dir = tmp.path().join("out");
    let outputs = outputs_with_file(src.clone());
    let report = route_outputs(
        &outputs,
        &BTreeMap::new(),
        &out_dir,
        "output.txt",
        &mut FileOutputWriter,
    );

    assert!(report.fell_back);
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
    assert_eq!(report.resources, vec![out_dir.join("report.csv")]);
    assert_eq!(fs::read_to_string(out_dir.join("report.csv"))?, "a,b\n1,2\n");

    let summary = fs::read_to_string(out_dir.join("output.txt"))?;
    let expected = format!("x=10\nrep={}\n", src.display());
    assert_eq!(summary, expected);
    assert_eq!(report.summary_path, Some(out_dir.join("output.txt")));
    Ok(())
}

#[test]
fn scenario_absolute_destination_skips_fallback() -> Result<()> {
    let tmp = tempdir()?;
    let dest = tmp.path().join("explicit").join("x.txt");
    let out_dir = tmp.path().join("out");
    let outputs = ParamCollection::new("Outputs")
        .with_child(LeafParam::int_value("x", 10).with_output_tag("x"));

    let mut requested = BTreeMap::new();
    requested.insert("x".to_string(), dest.clone());
    let report = route_outputs(&outputs, &requested, &out_dir, "output.txt", &mut FileOutputWriter);

    assert!(!report.fell_back);
    assert_eq!(report.written, vec![("x".to_string(), dest.clone())]);
    assert_eq!(fs::read_to_string(&dest)?, "10\n");
    assert!(!out_dir.join("output.txt").exists());
    Ok(())
}
