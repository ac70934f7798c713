use anyhow::{Context, Result};
use pmx_params::{HeaderParam, LeafParam, ParamCollection, ParamValue};
use pmx_reconcile::{reconcile, MergeReport};
use tracing::warn;
use uuid::Uuid;

use crate::{ModuleContext, ModuleSpec, Monitor, PerformanceRecord, ProcessingModule};

/// Label of the header node that heads both trees.
pub const ALGORITHM_HEADER: &str = "Algorithm";
/// Label of the internal output node holding the run's wall time in ms.
pub const EXECUTION_TIME: &str = "Execution Time";

pub const INPUTS_LABEL: &str = "Inputs";
pub const OUTPUTS_LABEL: &str = "Outputs";

/// A module body together with its input and output trees.
///
/// Layout:
/// - inputs:  `[Header "Algorithm", <module inputs>]`
/// - outputs: `[Header "Algorithm", <module outputs>, "Execution Time" (internal)]`
///
/// Both headers carry the same identity at construction.
pub struct AlgorithmDescriptor {
    module: Box<dyn ProcessingModule>,
    spec: ModuleSpec,
    inputs: ParamCollection,
    outputs: ParamCollection,
}

impl AlgorithmDescriptor {
    pub fn new(module: Box<dyn ProcessingModule>) -> Self {
        let spec = module.spec();
        let header = HeaderParam::new(ALGORITHM_HEADER, spec.name.clone())
            .with_name(format!("{} {}", spec.name, spec.version));

        let mut inputs = ParamCollection::new(INPUTS_LABEL).with_child(header.clone());
        for node in module.create_inputs() {
            inputs.push(node);
        }

        let mut outputs = ParamCollection::new(OUTPUTS_LABEL).with_child(header);
        for node in module.create_outputs() {
            outputs.push(node);
        }
        outputs.push(LeafParam::int(EXECUTION_TIME).internal());

        Self {
            module,
            spec,
            inputs,
            outputs,
        }
    }

    pub fn spec(&self) -> &ModuleSpec {
        &self.spec
    }

    /// Identity token of the input header.
    pub fn identity(&self) -> Uuid {
        self.inputs
            .header(ALGORITHM_HEADER)
            .map(|h| h.identity())
            .unwrap_or_else(|_| Uuid::nil())
    }

    pub fn inputs(&self) -> &ParamCollection {
        &self.inputs
    }

    pub fn inputs_mut(&mut self) -> &mut ParamCollection {
        &mut self.inputs
    }

    pub fn outputs(&self) -> &ParamCollection {
        &self.outputs
    }

    pub fn outputs_mut(&mut self) -> &mut ParamCollection {
        &mut self.outputs
    }

    /// Outputs without internal bookkeeping nodes.
    pub fn output_plugin_specific(&self) -> ParamCollection {
        let mut out = self.outputs.clone();
        out.retain(|n| !n.is_internal());
        out
    }

    /// Merge previously saved trees into this descriptor: inputs first, then
    /// outputs. Mismatches are logged and returned; nothing is rolled back.
    pub fn reconcile_and_merge(
        &mut self,
        saved_inputs: &ParamCollection,
        saved_outputs: &ParamCollection,
    ) -> MergeReport {
        let mut report = reconcile(&mut self.inputs, saved_inputs);
        report.extend(reconcile(&mut self.outputs, saved_outputs));
        for m in &report.mismatches {
            warn!(module = %self.spec.name, path = %m.path, "{m}");
        }
        report
    }

    /// Merge a saved input tree given as JSON. The input header's identity
    /// (possibly restored from the saved tree) is carried over to the output
    /// header, so reports and manifests name the same run.
    pub fn load_inputs_json(&mut self, raw: &str) -> Result<MergeReport> {
        let saved: ParamCollection =
            serde_json::from_str(raw).context("saved inputs are not a parameter tree")?;
        let report = reconcile(&mut self.inputs, &saved);
        for m in &report.mismatches {
            warn!(module = %self.spec.name, path = %m.path, "{m}");
        }
        let identity = self.identity();
        if let Ok(header) = self.outputs.header_mut(ALGORITHM_HEADER) {
            header.set_identity(identity);
        }
        Ok(report)
    }

    /// Store the run's wall time in the internal output node.
    pub fn record_performance(&mut self, perf: &PerformanceRecord) {
        let ms = i64::try_from(perf.wall_ms).unwrap_or(i64::MAX);
        if let Ok(leaf) = self.outputs.leaf_mut(EXECUTION_TIME) {
            // The node is declared Int; an Int value always fits.
            let _ = leaf.set_value(ParamValue::Int(ms));
        }
    }

    pub(crate) fn execute(&mut self, monitor: &Monitor) -> Result<()> {
        let mut ctx = ModuleContext {
            monitor,
            inputs: &self.inputs,
            outputs: &mut self.outputs,
        };
        self.module.execute(&mut ctx)
    }
}

impl std::fmt::Debug for AlgorithmDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlgorithmDescriptor")
            .field("spec", &self.spec)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}
