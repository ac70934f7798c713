use crate::ValueKind;

/// A value could not be coerced into a leaf's declared shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncompatibleValue {
    pub label: String,
    pub expected: ValueKind,
    pub got: ValueKind,
}

impl std::fmt::Display for IncompatibleValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "incompatible value for parameter '{}': expected {}, got {}",
            self.label, self.expected, self.got
        )
    }
}

impl std::error::Error for IncompatibleValue {}

/// Why a node failed validation.
#[derive(Clone, Debug, PartialEq)]
pub enum InvalidReason {
    /// Mandatory leaf has no value.
    Missing,
    BelowMinimum { min: f64, got: f64 },
    AboveMaximum { max: f64, got: f64 },
    /// Stored value does not have the declared shape (only reachable through
    /// deserialized trees; `set_value` refuses these).
    WrongShape { expected: ValueKind, got: ValueKind },
}

/// Output of a failed `validate()` call. `path` is the slash-joined label
/// path from the validated root down to the failing node.
#[derive(Clone, Debug, PartialEq)]
pub struct InvalidParameter {
    pub path: String,
    pub reason: InvalidReason,
}

impl std::fmt::Display for InvalidParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            InvalidReason::Missing => write!(f, "{}: value required", self.path),
            InvalidReason::BelowMinimum { min, got } => {
                write!(f, "{}: value {got} is below minimum {min}", self.path)
            }
            InvalidReason::AboveMaximum { max, got } => {
                write!(f, "{}: value {got} is above maximum {max}", self.path)
            }
            InvalidReason::WrongShape { expected, got } => {
                write!(f, "{}: expected {expected} value, found {got}", self.path)
            }
        }
    }
}

impl std::error::Error for InvalidParameter {}

/// A node's value could not be rendered for the summary file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SerializeError {
    pub label: String,
}

impl std::fmt::Display for SerializeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "parameter '{}' has no value to serialize", self.label)
    }
}

impl std::error::Error for SerializeError {}

/// Lookup helpers on collections failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupError {
    NotFound { label: String },
    /// A node with the label exists but is not the requested variant.
    WrongVariant { label: String, expected: &'static str },
    /// Leaf exists but holds no value (or a value of another shape).
    NoValue { label: String, expected: ValueKind },
}

impl std::fmt::Display for LookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { label } => write!(f, "parameter '{label}' not found"),
            Self::WrongVariant { label, expected } => {
                write!(f, "parameter '{label}' is not a {expected}")
            }
            Self::NoValue { label, expected } => {
                write!(f, "parameter '{label}' has no {expected} value")
            }
        }
    }
}

impl std::error::Error for LookupError {}
