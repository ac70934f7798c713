use pmx_params::{ParamCollection, ParamNode};

use crate::{MergeReport, Mismatch, MismatchKind};

fn record(report: &mut MergeReport, kind: MismatchKind, label: &str, path: String) {
    report.mismatches.push(Mismatch {
        kind,
        label: label.to_string(),
        path,
    });
}

/// Merge `source` into `dest`. See the crate docs for the rules.
///
/// Every destination child whose label matches a source child receives that
/// source child, not only the first; with unique sibling labels (the normal
/// case) this is a single match.
pub fn reconcile(dest: &mut ParamCollection, source: &ParamCollection) -> MergeReport {
    let mut report = MergeReport::clean();
    let root = dest.label().to_string();
    reconcile_into(dest, source, &root, &mut report);
    report
}

/// Merge a single matched pair. Useful when the roots themselves are the
/// pair (e.g. one saved node against one live node).
pub fn reconcile_nodes(dest: &mut ParamNode, source: &ParamNode) -> MergeReport {
    let mut report = MergeReport::clean();
    let path = dest.label().to_string();
    apply_pair(dest, source, path, &mut report);
    report
}

fn reconcile_into(
    dest: &mut ParamCollection,
    source: &ParamCollection,
    path: &str,
    report: &mut MergeReport,
) {
    for src in source.children() {
        let mut matched = false;
        for dst in dest.children_mut() {
            if !dst.matches(src) {
                continue;
            }
            matched = true;
            let child_path = format!("{path}/{}", dst.label());
            apply_pair(dst, src, child_path, report);
        }
        if !matched {
            report.dropped.push(format!("{path}/{}", src.label()));
        }
    }
}

fn apply_pair(dst: &mut ParamNode, src: &ParamNode, path: String, report: &mut MergeReport) {
    match (src, dst) {
        (ParamNode::Header(s), ParamNode::Header(d)) => {
            d.set_identity(s.identity());
            report.applied += 1;
        }
        (ParamNode::Header(s), _) => {
            record(report, MismatchKind::IncompatibleTypes, s.label(), path);
        }
        (ParamNode::Collection(s), ParamNode::Collection(d)) => {
            report.applied += 1;
            reconcile_into(d, s, &path, report);
        }
        (ParamNode::Collection(s), _) => {
            record(report, MismatchKind::IncompatibleTypes, s.label(), path);
        }
        (ParamNode::Leaf(s), ParamNode::Leaf(d)) => {
            // A saved leaf without a value carries nothing to adopt.
            let Some(v) = s.value() else {
                return;
            };
            match d.set_value(v.clone()) {
                Ok(()) => report.applied += 1,
                Err(_) => record(report, MismatchKind::IncompatibleValues, s.label(), path),
            }
        }
        (ParamNode::Leaf(s), _) => {
            record(report, MismatchKind::IncompatibleValues, s.label(), path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmx_params::{HeaderParam, LeafParam, ParamValue};

    #[test]
    fn leaf_against_header_is_a_value_mismatch() {
        let mut dest = ParamCollection::new("root").with_child(HeaderParam::new("Algorithm", "a"));
        let source = ParamCollection::new("root").with_child(LeafParam::int_value("Algorithm", 1));
        let r = reconcile(&mut dest, &source);
        assert_eq!(r.mismatches.len(), 1);
        assert_eq!(r.mismatches[0].kind, MismatchKind::IncompatibleValues);
        assert_eq!(r.mismatches[0].path, "root/Algorithm");
    }

    #[test]
    fn valueless_source_leaf_keeps_destination() {
        let mut dest = ParamCollection::new("root").with_child(LeafParam::int_value("n", 4));
        let source = ParamCollection::new("root").with_child(LeafParam::int("n"));
        let r = reconcile(&mut dest, &source);
        assert!(r.is_clean());
        assert_eq!(r.applied, 0);
        assert_eq!(dest.leaf("n").unwrap().value(), Some(&ParamValue::Int(4)));
    }

    #[test]
    fn reconcile_nodes_handles_root_pair() {
        let mut dest = ParamNode::from(LeafParam::float_value("thresh", 0.5));
        let source = ParamNode::from(LeafParam::text_value("thresh", "0.75"));
        let r = reconcile_nodes(&mut dest, &source);
        assert!(r.is_clean());
        assert_eq!(dest.as_leaf().unwrap().value(), Some(&ParamValue::Float(0.75)));
    }
}
