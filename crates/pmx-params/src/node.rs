use crate::{
    xml_escape, IncompatibleValue, InvalidParameter, InvalidReason, LookupError, ParamValue,
    SerializeError, ValueKind,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Fields shared by every node variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMeta {
    /// Matching key across trees. Unique among siblings by convention only.
    pub label: String,
    /// Display name; defaults to the label.
    pub name: String,
    #[serde(default)]
    pub hidden: bool,
    /// External key (CLI flag) used to route this output to an explicit path.
    #[serde(default)]
    pub output_tag: Option<String>,
    /// Bookkeeping nodes (performance, headers added by the runtime) that are
    /// never written to the summary file.
    #[serde(default)]
    pub internal: bool,
}

impl NodeMeta {
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            name: label.clone(),
            label,
            hidden: false,
            output_tag: None,
            internal: false,
        }
    }
}

macro_rules! meta_builders {
    ($($ty:ty),+ $(,)?) => {$(
        impl $ty {
            pub fn with_name(mut self, name: impl Into<String>) -> Self {
                self.meta.name = name.into();
                self
            }

            pub fn with_output_tag(mut self, tag: impl Into<String>) -> Self {
                self.meta.output_tag = Some(tag.into());
                self
            }

            pub fn hidden(mut self) -> Self {
                self.meta.hidden = true;
                self
            }

            pub fn internal(mut self) -> Self {
                self.meta.internal = true;
                self
            }

            pub fn label(&self) -> &str {
                &self.meta.label
            }

            pub fn set_label(&mut self, label: impl Into<String>) {
                self.meta.label = label.into();
            }
        }
    )+};
}

meta_builders!(LeafParam, HeaderParam, ParamCollection);

// ---------------------------------------------------------------------------
// Leaf
// ---------------------------------------------------------------------------

/// A single typed value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeafParam {
    pub meta: NodeMeta,
    pub kind: ValueKind,
    #[serde(default)]
    value: Option<ParamValue>,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl LeafParam {
    pub fn new(label: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            meta: NodeMeta::new(label),
            kind,
            value: None,
            mandatory: false,
            min: None,
            max: None,
        }
    }

    pub fn int(label: impl Into<String>) -> Self {
        Self::new(label, ValueKind::Int)
    }

    pub fn float(label: impl Into<String>) -> Self {
        Self::new(label, ValueKind::Float)
    }

    pub fn boolean(label: impl Into<String>) -> Self {
        Self::new(label, ValueKind::Bool)
    }

    pub fn text(label: impl Into<String>) -> Self {
        Self::new(label, ValueKind::Text)
    }

    pub fn file(label: impl Into<String>) -> Self {
        Self::new(label, ValueKind::File)
    }

    pub fn int_value(label: impl Into<String>, v: i64) -> Self {
        Self {
            value: Some(ParamValue::Int(v)),
            ..Self::int(label)
        }
    }

    pub fn float_value(label: impl Into<String>, v: f64) -> Self {
        Self {
            value: Some(ParamValue::Float(v)),
            ..Self::float(label)
        }
    }

    pub fn bool_value(label: impl Into<String>, v: bool) -> Self {
        Self {
            value: Some(ParamValue::Bool(v)),
            ..Self::boolean(label)
        }
    }

    pub fn text_value(label: impl Into<String>, v: impl Into<String>) -> Self {
        Self {
            value: Some(ParamValue::Text(v.into())),
            ..Self::text(label)
        }
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn with_bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn value(&self) -> Option<&ParamValue> {
        self.value.as_ref()
    }

    /// Store `v` after coercing it into this leaf's declared shape.
    /// On failure the current value is left untouched.
    pub fn set_value(&mut self, v: impl Into<ParamValue>) -> Result<(), IncompatibleValue> {
        let v = v.into();
        match v.coerce_to(self.kind) {
            Some(coerced) => {
                self.value = Some(coerced);
                Ok(())
            }
            None => Err(IncompatibleValue {
                label: self.meta.label.clone(),
                expected: self.kind,
                got: v.kind(),
            }),
        }
    }

    pub fn clear_value(&mut self) {
        self.value = None;
    }

    pub fn validate_at(&self, path: &str) -> Result<(), InvalidParameter> {
        let v = match &self.value {
            Some(v) => v,
            None if self.mandatory => {
                return Err(InvalidParameter {
                    path: path.to_string(),
                    reason: InvalidReason::Missing,
                })
            }
            None => return Ok(()),
        };

        if v.kind() != self.kind {
            return Err(InvalidParameter {
                path: path.to_string(),
                reason: InvalidReason::WrongShape {
                    expected: self.kind,
                    got: v.kind(),
                },
            });
        }

        if let Some(x) = v.numeric() {
            if let Some(min) = self.min {
                if x < min {
                    return Err(InvalidParameter {
                        path: path.to_string(),
                        reason: InvalidReason::BelowMinimum { min, got: x },
                    });
                }
            }
            if let Some(max) = self.max {
                if x > max {
                    return Err(InvalidParameter {
                        path: path.to_string(),
                        reason: InvalidReason::AboveMaximum { max, got: x },
                    });
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Identity token plus the class/type descriptor of the module that owns the tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderParam {
    pub meta: NodeMeta,
    identity: Uuid,
    pub class_name: String,
}

impl HeaderParam {
    pub fn new(label: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            meta: NodeMeta::new(label),
            identity: Uuid::new_v4(),
            class_name: class_name.into(),
        }
    }

    pub fn with_identity(mut self, identity: Uuid) -> Self {
        self.identity = identity;
        self
    }

    pub fn identity(&self) -> Uuid {
        self.identity
    }

    pub fn set_identity(&mut self, identity: Uuid) {
        self.identity = identity;
    }

    fn to_xml(&self) -> String {
        format!(
            "<header label=\"{}\" class=\"{}\" uuid=\"{}\"/>",
            xml_escape(&self.meta.label),
            xml_escape(&self.class_name),
            self.identity
        )
    }
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// Ordered children. Order is insertion order and drives summary/CLI ordering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamCollection {
    pub meta: NodeMeta,
    #[serde(default)]
    children: Vec<ParamNode>,
}

impl ParamCollection {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            meta: NodeMeta::new(label),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: impl Into<ParamNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn push(&mut self, child: impl Into<ParamNode>) -> &mut Self {
        self.children.push(child.into());
        self
    }

    pub fn children(&self) -> &[ParamNode] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [ParamNode] {
        &mut self.children
    }

    /// Removes the children matching `pred`, preserving order of the rest.
    pub fn retain(&mut self, pred: impl FnMut(&ParamNode) -> bool) {
        self.children.retain(pred);
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// First child with `label`.
    pub fn get(&self, label: &str) -> Option<&ParamNode> {
        self.children.iter().find(|c| c.label() == label)
    }

    pub fn get_mut(&mut self, label: &str) -> Option<&mut ParamNode> {
        self.children.iter_mut().find(|c| c.label() == label)
    }

    pub fn leaf(&self, label: &str) -> Result<&LeafParam, LookupError> {
        match self.get(label) {
            Some(ParamNode::Leaf(l)) => Ok(l),
            Some(_) => Err(LookupError::WrongVariant {
                label: label.to_string(),
                expected: "leaf",
            }),
            None => Err(LookupError::NotFound {
                label: label.to_string(),
            }),
        }
    }

    pub fn leaf_mut(&mut self, label: &str) -> Result<&mut LeafParam, LookupError> {
        match self.get_mut(label) {
            Some(ParamNode::Leaf(l)) => Ok(l),
            Some(_) => Err(LookupError::WrongVariant {
                label: label.to_string(),
                expected: "leaf",
            }),
            None => Err(LookupError::NotFound {
                label: label.to_string(),
            }),
        }
    }

    pub fn header(&self, label: &str) -> Result<&HeaderParam, LookupError> {
        match self.get(label) {
            Some(ParamNode::Header(h)) => Ok(h),
            Some(_) => Err(LookupError::WrongVariant {
                label: label.to_string(),
                expected: "header",
            }),
            None => Err(LookupError::NotFound {
                label: label.to_string(),
            }),
        }
    }

    pub fn header_mut(&mut self, label: &str) -> Result<&mut HeaderParam, LookupError> {
        match self.get_mut(label) {
            Some(ParamNode::Header(h)) => Ok(h),
            Some(_) => Err(LookupError::WrongVariant {
                label: label.to_string(),
                expected: "header",
            }),
            None => Err(LookupError::NotFound {
                label: label.to_string(),
            }),
        }
    }

    pub fn collection(&self, label: &str) -> Result<&ParamCollection, LookupError> {
        match self.get(label) {
            Some(ParamNode::Collection(c)) => Ok(c),
            Some(_) => Err(LookupError::WrongVariant {
                label: label.to_string(),
                expected: "collection",
            }),
            None => Err(LookupError::NotFound {
                label: label.to_string(),
            }),
        }
    }

    pub fn int(&self, label: &str) -> Result<i64, LookupError> {
        self.leaf(label)?
            .value()
            .and_then(ParamValue::as_int)
            .ok_or(LookupError::NoValue {
                label: label.to_string(),
                expected: ValueKind::Int,
            })
    }

    pub fn float(&self, label: &str) -> Result<f64, LookupError> {
        self.leaf(label)?
            .value()
            .and_then(ParamValue::as_float)
            .ok_or(LookupError::NoValue {
                label: label.to_string(),
                expected: ValueKind::Float,
            })
    }

    pub fn boolean(&self, label: &str) -> Result<bool, LookupError> {
        self.leaf(label)?
            .value()
            .and_then(ParamValue::as_bool)
            .ok_or(LookupError::NoValue {
                label: label.to_string(),
                expected: ValueKind::Bool,
            })
    }

    pub fn text(&self, label: &str) -> Result<&str, LookupError> {
        self.leaf(label)?
            .value()
            .and_then(ParamValue::as_text)
            .ok_or(LookupError::NoValue {
                label: label.to_string(),
                expected: ValueKind::Text,
            })
    }

    pub fn file(&self, label: &str) -> Result<&Path, LookupError> {
        match self.leaf(label)?.value() {
            Some(ParamValue::File(p)) => Ok(p.as_path()),
            _ => Err(LookupError::NoValue {
                label: label.to_string(),
                expected: ValueKind::File,
            }),
        }
    }

    /// Validate this collection and every descendant. Stops at the first failure.
    pub fn validate(&self) -> Result<(), InvalidParameter> {
        self.validate_at(&self.meta.label)
    }

    pub fn validate_at(&self, path: &str) -> Result<(), InvalidParameter> {
        for child in &self.children {
            let child_path = format!("{path}/{}", child.label());
            child.validate_at(&child_path)?;
        }
        Ok(())
    }

    /// Total node count including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(ParamNode::node_count).sum::<usize>()
    }

    fn to_xml(&self) -> String {
        let mut out = format!("<collection label=\"{}\">", xml_escape(&self.meta.label));
        for child in self.children.iter().filter(|c| !c.is_hidden()) {
            match child {
                ParamNode::Leaf(l) => match l.value() {
                    Some(v) => out.push_str(&format!(
                        "<param label=\"{}\">{}</param>",
                        xml_escape(l.label()),
                        xml_escape(&v.to_string())
                    )),
                    None => out.push_str(&format!("<param label=\"{}\"/>", xml_escape(l.label()))),
                },
                ParamNode::Header(h) => out.push_str(&h.to_xml()),
                ParamNode::Collection(c) => out.push_str(&c.to_xml()),
            }
        }
        out.push_str("</collection>");
        out
    }
}

// ---------------------------------------------------------------------------
// ParamNode
// ---------------------------------------------------------------------------

/// Closed set of node variants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum ParamNode {
    Leaf(LeafParam),
    Header(HeaderParam),
    Collection(ParamCollection),
}

impl ParamNode {
    pub fn meta(&self) -> &NodeMeta {
        match self {
            ParamNode::Leaf(l) => &l.meta,
            ParamNode::Header(h) => &h.meta,
            ParamNode::Collection(c) => &c.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut NodeMeta {
        match self {
            ParamNode::Leaf(l) => &mut l.meta,
            ParamNode::Header(h) => &mut h.meta,
            ParamNode::Collection(c) => &mut c.meta,
        }
    }

    pub fn label(&self) -> &str {
        &self.meta().label
    }

    pub fn name(&self) -> &str {
        &self.meta().name
    }

    /// Label equality; the only matching rule used across trees.
    pub fn matches(&self, other: &ParamNode) -> bool {
        self.label() == other.label()
    }

    pub fn is_hidden(&self) -> bool {
        self.meta().hidden
    }

    pub fn is_internal(&self) -> bool {
        self.meta().internal
    }

    pub fn output_tag(&self) -> Option<&str> {
        self.meta().output_tag.as_deref()
    }

    /// Key written in front of `=` in the summary file.
    pub fn summary_tag(&self) -> &str {
        self.output_tag().unwrap_or_else(|| self.label())
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            ParamNode::Leaf(_) => "leaf",
            ParamNode::Header(_) => "header",
            ParamNode::Collection(_) => "collection",
        }
    }

    pub fn as_leaf(&self) -> Option<&LeafParam> {
        match self {
            ParamNode::Leaf(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_leaf_mut(&mut self) -> Option<&mut LeafParam> {
        match self {
            ParamNode::Leaf(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_header(&self) -> Option<&HeaderParam> {
        match self {
            ParamNode::Header(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&ParamCollection> {
        match self {
            ParamNode::Collection(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_collection_mut(&mut self) -> Option<&mut ParamCollection> {
        match self {
            ParamNode::Collection(c) => Some(c),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), InvalidParameter> {
        self.validate_at(self.label())
    }

    pub fn validate_at(&self, path: &str) -> Result<(), InvalidParameter> {
        match self {
            ParamNode::Leaf(l) => l.validate_at(path),
            ParamNode::Header(_) => Ok(()),
            ParamNode::Collection(c) => c.validate_at(path),
        }
    }

    /// Flat value for the summary file.
    ///
    /// Leaves render their value, headers and collections render an XML
    /// element. A leaf without a value cannot be rendered.
    pub fn serialized_value(&self) -> Result<String, SerializeError> {
        match self {
            ParamNode::Leaf(l) => l.value().map(|v| v.to_string()).ok_or(SerializeError {
                label: l.meta.label.clone(),
            }),
            ParamNode::Header(h) => Ok(h.to_xml()),
            ParamNode::Collection(c) => Ok(c.to_xml()),
        }
    }

    /// String identity of a node as sent to the aggregator.
    pub fn identity_string(&self) -> String {
        match self {
            ParamNode::Header(h) => h.identity().to_string(),
            ParamNode::Leaf(l) => l
                .value()
                .map(|v| v.to_string())
                .unwrap_or_else(|| l.meta.label.clone()),
            ParamNode::Collection(c) => c.meta.label.clone(),
        }
    }

    pub fn node_count(&self) -> usize {
        match self {
            ParamNode::Collection(c) => c.node_count(),
            _ => 1,
        }
    }
}

impl From<LeafParam> for ParamNode {
    fn from(v: LeafParam) -> Self {
        ParamNode::Leaf(v)
    }
}

impl From<HeaderParam> for ParamNode {
    fn from(v: HeaderParam) -> Self {
        ParamNode::Header(v)
    }
}

impl From<ParamCollection> for ParamNode {
    fn from(v: ParamCollection) -> Self {
        ParamNode::Collection(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ParamCollection {
        ParamCollection::new("Inputs")
            .with_child(HeaderParam::new("Algorithm", "demo"))
            .with_child(LeafParam::text_value("a", "5"))
            .with_child(LeafParam::float_value("thresh", 0.5).with_bounds(Some(0.0), Some(1.0)))
            .with_child(
                ParamCollection::new("advanced")
                    .with_child(LeafParam::int("iterations").mandatory()),
            )
    }

    #[test]
    fn set_value_refuses_incompatible_shape_and_keeps_previous() {
        let mut leaf = LeafParam::float_value("thresh", 0.5);
        let err = leaf.set_value("high").unwrap_err();
        assert_eq!(err.label, "thresh");
        assert_eq!(err.expected, ValueKind::Float);
        assert_eq!(err.got, ValueKind::Text);
        assert_eq!(leaf.value(), Some(&ParamValue::Float(0.5)));
    }

    #[test]
    fn validate_reports_path_of_first_failure() {
        let tree = sample();
        let err = tree.validate().unwrap_err();
        assert_eq!(err.path, "Inputs/advanced/iterations");
        assert_eq!(err.reason, InvalidReason::Missing);
    }

    #[test]
    fn validate_checks_bounds() {
        let mut tree = sample();
        tree.get_mut("advanced")
            .and_then(ParamNode::as_collection_mut)
            .unwrap()
            .leaf_mut("iterations")
            .unwrap()
            .set_value(3_i64)
            .unwrap();
        assert!(tree.validate().is_ok());

        tree.leaf_mut("thresh").unwrap().set_value(1.5).unwrap();
        let err = tree.validate().unwrap_err();
        assert_eq!(err.path, "Inputs/thresh");
        assert!(matches!(err.reason, InvalidReason::AboveMaximum { .. }));
    }

    #[test]
    fn lookups_distinguish_missing_and_wrong_variant() {
        let tree = sample();
        assert_eq!(tree.text("a").unwrap(), "5");
        assert!(matches!(tree.leaf("nope"), Err(LookupError::NotFound { .. })));
        assert!(matches!(
            tree.leaf("Algorithm"),
            Err(LookupError::WrongVariant { expected: "leaf", .. })
        ));
        assert!(matches!(tree.int("a"), Err(LookupError::NoValue { .. })));
    }

    #[test]
    fn serialized_values() {
        let tree = sample();
        assert_eq!(tree.get("thresh").unwrap().serialized_value().unwrap(), "0.5");
        let header = tree.get("Algorithm").unwrap().serialized_value().unwrap();
        assert!(header.starts_with("<header label=\"Algorithm\" class=\"demo\""));
        let nested = ParamNode::from(tree.collection("advanced").unwrap().clone());
        assert_eq!(
            nested.serialized_value().unwrap(),
            "<collection label=\"advanced\"><param label=\"iterations\"/></collection>"
        );
        let err = ParamNode::from(LeafParam::int("x")).serialized_value().unwrap_err();
        assert_eq!(err.label, "x");
    }

    #[test]
    fn summary_tag_falls_back_to_label() {
        let tagged = ParamNode::from(LeafParam::int("x").with_output_tag("outX"));
        let plain = ParamNode::from(LeafParam::int("y"));
        assert_eq!(tagged.summary_tag(), "outX");
        assert_eq!(plain.summary_tag(), "y");
    }

    #[test]
    fn json_roundtrip_preserves_identity() {
        let tree = sample();
        let json = serde_json::to_string(&tree).unwrap();
        let back: ParamCollection = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree);
        assert_eq!(back.node_count(), 6);
    }
}
