use pmx_params::{ParamCollection, ParamNode};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Written in place of a value that could not be serialized, followed by the
/// node's display name.
pub const UNREALIZED_MARKER: &str = "UNABLE TO REALIZE VARIABLE";

/// IO failure while producing the summary file.
#[derive(Debug)]
pub struct SummaryWriteError {
    pub path: PathBuf,
    pub source: std::io::Error,
}

impl std::fmt::Display for SummaryWriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "write summary failed: {}: {}", self.path.display(), self.source)
    }
}

impl std::error::Error for SummaryWriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// What went into a summary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SummaryStats {
    pub lines: usize,
    /// Labels whose value was replaced by `UNREALIZED_MARKER`.
    pub unrealized: Vec<String>,
}

/// True for nodes that belong in the summary.
pub fn is_summarized(node: &ParamNode) -> bool {
    !node.is_hidden() && !node.is_internal()
}

/// Render the summary text for the direct children of `outputs`.
///
/// A node whose value cannot be serialized produces a marker line instead;
/// the remaining nodes are still rendered.
pub fn render_summary(outputs: &ParamCollection) -> (String, SummaryStats) {
    let mut text = String::new();
    let mut stats = SummaryStats::default();

    for node in outputs.children().iter().filter(|n| is_summarized(n)) {
        let tag = node.summary_tag();
        match node.serialized_value() {
            Ok(v) => text.push_str(&format!("{tag}={v}\n")),
            Err(e) => {
                warn!(label = node.label(), error = %e, "summary value unavailable");
                text.push_str(&format!("{tag}={UNREALIZED_MARKER}{}\n", node.name()));
                stats.unrealized.push(node.label().to_string());
            }
        }
        stats.lines += 1;
    }

    (text, stats)
}

/// Write the summary to `destination`, creating parent directories.
/// Overwrites an existing file.
pub fn write_summary(
    outputs: &ParamCollection,
    destination: &Path,
) -> Result<SummaryStats, SummaryWriteError> {
    let (text, stats) = render_summary(outputs);

    let io_err = |source| SummaryWriteError {
        path: destination.to_path_buf(),
        source,
    };

    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    fs::write(destination, text).map_err(io_err)?;

    Ok(stats)
}
