/// Which compatibility check failed for a matched pair.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum MismatchKind {
    /// Header vs non-header, or collection vs non-collection.
    IncompatibleTypes,
    /// Source leaf value could not be stored in the destination.
    IncompatibleValues,
}

/// One matched pair that could not be merged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mismatch {
    pub kind: MismatchKind,
    pub label: String,
    /// Slash-joined destination path of the matched node.
    pub path: String,
}

impl std::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            MismatchKind::IncompatibleTypes => write!(
                f,
                "Incompatible parameter types for matched parameters: {}",
                self.label
            ),
            MismatchKind::IncompatibleValues => write!(
                f,
                "Incompatible parameter values for matched parameters: {}",
                self.label
            ),
        }
    }
}

/// Outcome of one reconciliation pass. Entries are in traversal order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub mismatches: Vec<Mismatch>,
    /// Matched pairs that were applied (identity, value, or recursion).
    pub applied: usize,
    /// Paths of source children with no destination counterpart.
    pub dropped: Vec<String>,
}

impl MergeReport {
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn extend(&mut self, other: MergeReport) {
        self.mismatches.extend(other.mismatches);
        self.applied += other.applied;
        self.dropped.extend(other.dropped);
    }

    /// One line per mismatch, each newline-terminated. Empty for a clean merge.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for m in &self.mismatches {
            out.push_str(&m.to_string());
            out.push('\n');
        }
        out
    }
}
