use pmx_params::{ParamCollection, ParamNode};

use crate::Monitor;

/// Module identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleSpec {
    /// Registry key and header class name.
    pub name: String,
    pub version: String,
    pub description: String,
}

impl ModuleSpec {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let name = name.into();
        debug_assert!(!name.trim().is_empty(), "ModuleSpec name must not be empty");
        Self {
            name,
            version: version.into(),
            description: description.into(),
        }
    }
}

/// What a module body sees while it runs.
///
/// Inputs are read-only; the body fills in `outputs`. The monitor is
/// advisory: long bodies should poll [`Monitor::check`] and report progress.
pub struct ModuleContext<'a> {
    pub monitor: &'a Monitor,
    pub inputs: &'a ParamCollection,
    pub outputs: &'a mut ParamCollection,
}

/// A processing module: declared parameter trees plus an opaque body.
///
/// `create_inputs`/`create_outputs` return the module's own parameters; the
/// descriptor adds the algorithm header and bookkeeping nodes around them.
/// Errors and panics from `execute` are contained by the controller.
pub trait ProcessingModule: Send {
    fn spec(&self) -> ModuleSpec;

    fn create_inputs(&self) -> Vec<ParamNode>;

    fn create_outputs(&self) -> Vec<ParamNode>;

    fn execute(&mut self, ctx: &mut ModuleContext<'_>) -> anyhow::Result<()>;
}
