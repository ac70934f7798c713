use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Declared shape of a leaf parameter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Int,
    Float,
    Bool,
    Text,
    File,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Bool => "bool",
            ValueKind::Text => "text",
            ValueKind::File => "file",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime value carried by a leaf.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    File(PathBuf),
}

impl ParamValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            ParamValue::Int(_) => ValueKind::Int,
            ParamValue::Float(_) => ValueKind::Float,
            ParamValue::Bool(_) => ValueKind::Bool,
            ParamValue::Text(_) => ValueKind::Text,
            ParamValue::File(_) => ValueKind::File,
        }
    }

    /// Convert into `target` if the shapes are compatible.
    ///
    /// Accepted conversions:
    /// - identity
    /// - int -> float
    /// - float -> int only when the float is a finite whole number
    /// - text -> int/float/bool when it parses (surrounding whitespace ignored)
    /// - text <-> file
    /// - int/float/bool -> text
    ///
    /// Returns `None` for everything else.
    pub fn coerce_to(&self, target: ValueKind) -> Option<ParamValue> {
        if self.kind() == target {
            return Some(self.clone());
        }
        match (self, target) {
            (ParamValue::Int(i), ValueKind::Float) => Some(ParamValue::Float(*i as f64)),
            (ParamValue::Float(x), ValueKind::Int) => {
                if x.is_finite() && x.fract() == 0.0 && x.abs() < i64::MAX as f64 {
                    Some(ParamValue::Int(*x as i64))
                } else {
                    None
                }
            }
            (ParamValue::Text(s), ValueKind::Int) => s.trim().parse::<i64>().ok().map(ParamValue::Int),
            (ParamValue::Text(s), ValueKind::Float) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|x| x.is_finite())
                .map(ParamValue::Float),
            (ParamValue::Text(s), ValueKind::Bool) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(ParamValue::Bool(true)),
                "false" => Some(ParamValue::Bool(false)),
                _ => None,
            },
            (ParamValue::Text(s), ValueKind::File) => Some(ParamValue::File(PathBuf::from(s))),
            (ParamValue::File(p), ValueKind::Text) => Some(ParamValue::Text(p.display().to_string())),
            (ParamValue::Int(_) | ParamValue::Float(_) | ParamValue::Bool(_), ValueKind::Text) => {
                Some(ParamValue::Text(self.to_string()))
            }
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParamValue::Float(x) => Some(*x),
            ParamValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric view used by bounds checks.
    pub(crate) fn numeric(&self) -> Option<f64> {
        match self {
            ParamValue::Int(i) => Some(*i as f64),
            ParamValue::Float(x) => Some(*x),
            _ => None,
        }
    }
}

/// Flat representation written into summary files.
impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Float(x) => write!(f, "{x}"),
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Text(s) => f.write_str(s),
            ParamValue::File(p) => write!(f, "{}", p.display()),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

impl From<PathBuf> for ParamValue {
    fn from(v: PathBuf) -> Self {
        ParamValue::File(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_parses_into_numbers_when_well_formed() {
        let v = ParamValue::from(" 5 ");
        assert_eq!(v.coerce_to(ValueKind::Int), Some(ParamValue::Int(5)));
        assert_eq!(v.coerce_to(ValueKind::Float), Some(ParamValue::Float(5.0)));
        assert_eq!(ParamValue::from("high").coerce_to(ValueKind::Float), None);
        assert_eq!(ParamValue::from("nan").coerce_to(ValueKind::Float), None);
    }

    #[test]
    fn float_to_int_requires_whole_number() {
        assert_eq!(ParamValue::Float(4.0).coerce_to(ValueKind::Int), Some(ParamValue::Int(4)));
        assert_eq!(ParamValue::Float(4.5).coerce_to(ValueKind::Int), None);
        assert_eq!(ParamValue::Float(f64::NAN).coerce_to(ValueKind::Int), None);
    }

    #[test]
    fn bool_never_becomes_a_number() {
        assert_eq!(ParamValue::Bool(true).coerce_to(ValueKind::Int), None);
        assert_eq!(ParamValue::Int(1).coerce_to(ValueKind::Bool), None);
    }

    #[test]
    fn display_is_flat() {
        assert_eq!(ParamValue::Int(10).to_string(), "10");
        assert_eq!(ParamValue::Float(0.5).to_string(), "0.5");
        assert_eq!(ParamValue::Bool(false).to_string(), "false");
        assert_eq!(ParamValue::File(PathBuf::from("/tmp/a.nii")).to_string(), "/tmp/a.nii");
    }
}
