use pmx_params::*;
use pmx_reconcile::*;
use uuid::Uuid;

fn labels(c: &ParamCollection) -> Vec<String> {
    let mut out = Vec::new();
    for child in c.children() {
        out.push(child.label().to_string());
        if let Some(inner) = child.as_collection() {
            for l in labels(inner) {
                out.push(format!("{}/{}", child.label(), l));
            }
        }
    }
    out
}

#[test]
fn scenario_structure_never_changes() {
    // Newer module definition: "sigma" renamed to "blur", "mask" added.
    let mut dest = ParamCollection::new("Inputs")
        .with_child(HeaderParam::new("Algorithm", "Demo"))
        .with_child(LeafParam::float("blur"))
        .with_child(LeafParam::file("mask"))
        .with_child(ParamCollection::new("advanced").with_child(LeafParam::int_value("iterations", 10)));

    // Older saved configuration.
    let saved_id = Uuid::new_v4();
    let source = ParamCollection::new("Inputs")
        .with_child(HeaderParam::new("Algorithm", "Demo").with_identity(saved_id))
        .with_child(LeafParam::float_value("sigma", 2.0))
        .with_child(
            ParamCollection::new("advanced")
                .with_child(LeafParam::int_value("iterations", 25))
                .with_child(LeafParam::bool_value("legacy", true)),
        );

    let before_labels = labels(&dest);
    let before_count = dest.node_count();

    let r = reconcile(&mut dest, &source);

    assert!(r.is_clean(), "{}", r.render());
    assert_eq!(labels(&dest), before_labels);
    assert_eq!(dest.node_count(), before_count);

    assert_eq!(dest.header("Algorithm").unwrap().identity(), saved_id);
    assert_eq!(dest.collection("advanced").unwrap().int("iterations").unwrap(), 25);
    assert_eq!(dest.leaf("blur").unwrap().value(), None);

    assert_eq!(
        r.dropped,
        vec!["Inputs/sigma".to_string(), "Inputs/advanced/legacy".to_string()]
    );
}

#[test]
fn scenario_matching_ignores_position() {
    let mut dest = ParamCollection::new("p")
        .with_child(LeafParam::int("x"))
        .with_child(LeafParam::int("y"));
    let source = ParamCollection::new("p")
        .with_child(LeafParam::int_value("y", 2))
        .with_child(LeafParam::int_value("x", 1));

    let r = reconcile(&mut dest, &source);

    assert!(r.is_clean());
    assert_eq!(dest.children()[0].label(), "x");
    assert_eq!(dest.int("x").unwrap(), 1);
    assert_eq!(dest.int("y").unwrap(), 2);
}
