//! Output routing: explicit per-tag destinations, or the fallback dump into
//! the run's output directory.

use anyhow::{Context, Result};
use pmx_params::{ParamCollection, ParamNode, ParamValue};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{is_summarized, write_summary};

/// Per-type write routine for output parameters.
pub trait OutputWriter {
    /// Write a single output to an explicit destination.
    fn write_output(&mut self, node: &ParamNode, dest: &Path) -> Result<()>;

    /// Write every resource-backed output under `dir`.
    fn save_resources(&mut self, outputs: &ParamCollection, dir: &Path) -> Result<Vec<PathBuf>>;
}

/// Default writer: file outputs are copied, every other value is written as
/// its flat text representation.
#[derive(Debug, Default)]
pub struct FileOutputWriter;

impl OutputWriter for FileOutputWriter {
    fn write_output(&mut self, node: &ParamNode, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create output dir failed: {}", parent.display()))?;
        }
        match node.as_leaf().and_then(|l| l.value()) {
            Some(ParamValue::File(src)) => {
                fs::copy(src, dest).with_context(|| {
                    format!("copy output {} -> {} failed", src.display(), dest.display())
                })?;
            }
            _ => {
                let text = node.serialized_value()?;
                fs::write(dest, format!("{text}\n"))
                    .with_context(|| format!("write output failed: {}", dest.display()))?;
            }
        }
        Ok(())
    }

    fn save_resources(&mut self, outputs: &ParamCollection, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for node in outputs.children().iter().filter(|n| is_summarized(n)) {
            let Some(ParamValue::File(src)) = node.as_leaf().and_then(|l| l.value()) else {
                continue;
            };
            let file_name = src
                .file_name()
                .map(|f| f.to_os_string())
                .unwrap_or_else(|| node.label().into());
            let dest = dir.join(file_name);
            if dest == *src {
                continue;
            }
            self.write_output(node, &dest)?;
            written.push(dest);
        }
        Ok(written)
    }
}

/// Something the routing step refused or failed to do. Never fatal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoutingDiagnostic {
    /// Explicit destinations must be absolute; nothing was written.
    RelativePath { tag: String, path: PathBuf },
    /// A destination was supplied for a tag no output carries.
    UnknownTag { tag: String },
    WriteFailed { tag: String, message: String },
    FallbackFailed { message: String },
}

impl std::fmt::Display for RoutingDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RelativePath { tag, path } => write!(
                f,
                "Argument for {tag} Absolute path required for output files (got {})",
                path.display()
            ),
            Self::UnknownTag { tag } => write!(f, "no output parameter uses tag '{tag}'"),
            Self::WriteFailed { tag, message } => write!(f, "writing output {tag} failed: {message}"),
            Self::FallbackFailed { message } => write!(f, "writing run outputs failed: {message}"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoutingReport {
    /// (tag, destination) pairs written explicitly.
    pub written: Vec<(String, PathBuf)>,
    pub diagnostics: Vec<RoutingDiagnostic>,
    /// True when no explicit destination applied and everything went to the output dir.
    pub fell_back: bool,
    pub resources: Vec<PathBuf>,
    pub summary_path: Option<PathBuf>,
}

/// Route outputs to the destinations requested per output tag.
///
/// - absolute destination: `writer.write_output` is called with it
/// - relative destination: rejected with a diagnostic, the rest continue
/// - no destination supplied for any output: all resources plus the summary
///   file are written under `output_dir`
pub fn route_outputs(
    outputs: &ParamCollection,
    requested: &BTreeMap<String, PathBuf>,
    output_dir: &Path,
    summary_file: &str,
    writer: &mut dyn OutputWriter,
) -> RoutingReport {
    let mut report = RoutingReport::default();
    let mut supplied_any = false;

    for node in outputs.children() {
        let Some(tag) = node.output_tag() else {
            continue;
        };
        let Some(dest) = requested.get(tag) else {
            continue;
        };
        supplied_any = true;

        if !dest.is_absolute() {
            let d = RoutingDiagnostic::RelativePath {
                tag: tag.to_string(),
                path: dest.clone(),
            };
            warn!("{d}");
            report.diagnostics.push(d);
            continue;
        }

        match writer.write_output(node, dest) {
            Ok(()) => {
                info!(tag, dest = %dest.display(), "output written");
                report.written.push((tag.to_string(), dest.clone()));
            }
            Err(e) => {
                let d = RoutingDiagnostic::WriteFailed {
                    tag: tag.to_string(),
                    message: format!("{e:#}"),
                };
                warn!("{d}");
                report.diagnostics.push(d);
            }
        }
    }

    for tag in requested.keys() {
        if !outputs.children().iter().any(|n| n.output_tag() == Some(tag.as_str())) {
            let d = RoutingDiagnostic::UnknownTag { tag: tag.clone() };
            warn!("{d}");
            report.diagnostics.push(d);
        }
    }

    if !supplied_any {
        report.fell_back = true;
        if let Err(e) = fs::create_dir_all(output_dir) {
            report.diagnostics.push(RoutingDiagnostic::FallbackFailed {
                message: format!("create {} failed: {e}", output_dir.display()),
            });
            return report;
        }
        match writer.save_resources(outputs, output_dir) {
            Ok(paths) => report.resources = paths,
            Err(e) => report.diagnostics.push(RoutingDiagnostic::FallbackFailed {
                message: format!("{e:#}"),
            }),
        }
        let summary_path = output_dir.join(summary_file);
        match write_summary(outputs, &summary_path) {
            Ok(_) => report.summary_path = Some(summary_path),
            Err(e) => {
                warn!(error = %e, "summary write failed");
                report.diagnostics.push(RoutingDiagnostic::FallbackFailed {
                    message: e.to_string(),
                });
            }
        }
    }

    report
}
