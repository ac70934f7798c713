use anyhow::{bail, Context, Result};
use pmx_params::{LeafParam, ParamCollection, ParamNode};
use pmx_runtime::{ModuleContext, ModuleSpec, ProcessingModule};

pub struct FailingModule;

impl ProcessingModule for FailingModule {
    fn spec(&self) -> ModuleSpec {
        ModuleSpec::new("FailingModule", "1.0.0", "fails after a partial write")
    }

    fn create_inputs(&self) -> Vec<ParamNode> {
        Vec::new()
    }

    fn create_outputs(&self) -> Vec<ParamNode> {
        vec![
            LeafParam::int("partial").with_output_tag("partial").into(),
            LeafParam::int("final").with_output_tag("final").mandatory().into(),
        ]
    }

    fn execute(&mut self, ctx: &mut ModuleContext<'_>) -> Result<()> {
        ctx.outputs.leaf_mut("partial")?.set_value(1_i64)?;
        bail!("failing module gave up after partial output")
    }
}

pub struct PanickingModule;

impl ProcessingModule for PanickingModule {
    fn spec(&self) -> ModuleSpec {
        ModuleSpec::new("PanickingModule", "1.0.0", "panics mid-body")
    }

    fn create_inputs(&self) -> Vec<ParamNode> {
        Vec::new()
    }

    fn create_outputs(&self) -> Vec<ParamNode> {
        vec![LeafParam::int("never").into()]
    }

    fn execute(&mut self, _ctx: &mut ModuleContext<'_>) -> Result<()> {
        panic!("panicking module hit an impossible state")
    }
}

/// Writes a ratio outside its declared `[0, 1]` bounds.
pub struct InvalidOutputModule;

impl ProcessingModule for InvalidOutputModule {
    fn spec(&self) -> ModuleSpec {
        ModuleSpec::new("InvalidOutputModule", "1.0.0", "produces an out-of-range ratio")
    }

    fn create_inputs(&self) -> Vec<ParamNode> {
        Vec::new()
    }

    fn create_outputs(&self) -> Vec<ParamNode> {
        let stats = ParamCollection::new("stats")
            .with_child(LeafParam::float("ratio").with_bounds(Some(0.0), Some(1.0)));
        vec![stats.into()]
    }

    fn execute(&mut self, ctx: &mut ModuleContext<'_>) -> Result<()> {
        let stats = ctx
            .outputs
            .get_mut("stats")
            .and_then(|n| n.as_collection_mut())
            .context("stats collection missing")?;
        stats.leaf_mut("ratio")?.set_value(2.5)?;
        Ok(())
    }
}
