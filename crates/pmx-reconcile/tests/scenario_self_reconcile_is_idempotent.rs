use pmx_params::*;
use pmx_reconcile::*;

fn module_tree() -> ParamCollection {
    ParamCollection::new("Inputs")
        .with_child(HeaderParam::new("Algorithm", "edu.example.Demo"))
        .with_child(LeafParam::text_value("a", "5"))
        .with_child(LeafParam::float_value("thresh", 0.5))
        .with_child(
            ParamCollection::new("advanced")
                .with_child(LeafParam::int_value("iterations", 10))
                .with_child(LeafParam::bool_value("verbose", false)),
        )
}

#[test]
fn scenario_self_reconcile_is_idempotent() {
    let mut dest = module_tree();
    let source = dest.clone();

    let r = reconcile(&mut dest, &source);

    assert!(r.is_clean());
    assert_eq!(r.render(), "");
    assert!(r.dropped.is_empty());
    assert_eq!(dest, source);
}

#[test]
fn scenario_reconcile_twice_is_stable() {
    let mut dest = module_tree();
    let mut source = module_tree();
    source.leaf_mut("thresh").unwrap().set_value(0.9).unwrap();

    let first = reconcile(&mut dest, &source);
    let after_first = dest.clone();
    let second = reconcile(&mut dest, &source);

    assert_eq!(first, second);
    assert_eq!(dest, after_first);
}
