use anyhow::{Context, Result};
use pmx_params::{LeafParam, ParamNode};
use pmx_runtime::{ModuleContext, ModuleSpec, ProcessingModule};
use std::thread;
use std::time::Duration;
use tracing::debug;

pub struct DoubleIt;

impl ProcessingModule for DoubleIt {
    fn spec(&self) -> ModuleSpec {
        ModuleSpec::new("DoubleIt", "1.0.0", "x = 2 * a")
    }

    fn create_inputs(&self) -> Vec<ParamNode> {
        vec![LeafParam::text("a").with_name("Operand").mandatory().into()]
    }

    fn create_outputs(&self) -> Vec<ParamNode> {
        vec![LeafParam::int("x")
            .with_name("Doubled")
            .with_output_tag("x")
            .mandatory()
            .into()]
    }

    fn execute(&mut self, ctx: &mut ModuleContext<'_>) -> Result<()> {
        let raw = ctx.inputs.text("a")?;
        let a: i64 = raw
            .trim()
            .parse()
            .with_context(|| format!("input a is not an integer: {raw:?}"))?;
        let x = a.checked_mul(2).context("input a overflows when doubled")?;
        ctx.outputs.leaf_mut("x")?.set_value(x)?;
        ctx.monitor.set_progress(1, 1);
        Ok(())
    }
}

/// Inputs: `steps` (default 20) and `step_ms` (default 10).
pub struct SlowModule;

impl ProcessingModule for SlowModule {
    fn spec(&self) -> ModuleSpec {
        ModuleSpec::new("SlowModule", "1.0.0", "sleeps in steps, reporting progress")
    }

    fn create_inputs(&self) -> Vec<ParamNode> {
        vec![
            LeafParam::int_value("steps", 20)
                .with_bounds(Some(0.0), None)
                .into(),
            LeafParam::int_value("step_ms", 10)
                .with_bounds(Some(0.0), Some(10_000.0))
                .into(),
        ]
    }

    fn create_outputs(&self) -> Vec<ParamNode> {
        vec![LeafParam::int("completed_steps")
            .with_output_tag("steps")
            .into()]
    }

    fn execute(&mut self, ctx: &mut ModuleContext<'_>) -> Result<()> {
        let steps = u64::try_from(ctx.inputs.int("steps")?).context("steps must be >= 0")?;
        let step_ms = u64::try_from(ctx.inputs.int("step_ms")?).context("step_ms must be >= 0")?;

        for i in 0..steps {
            ctx.monitor.check()?;
            ctx.monitor.set_progress(i, steps);
            ctx.monitor.set_status(format!("step {}/{steps}", i + 1));
            thread::sleep(Duration::from_millis(step_ms));
        }
        ctx.monitor.set_progress(steps, steps);
        debug!(steps, "slow module done");

        let done = i64::try_from(steps).context("steps overflow")?;
        ctx.outputs.leaf_mut("completed_steps")?.set_value(done)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin_registry;
    use pmx_runtime::{Controller, ControllerConfig, FailureReason};

    #[test]
    fn builtin_registry_lists_shipped_modules() {
        let reg = builtin_registry().unwrap();
        let names: Vec<&str> = reg.list().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["DoubleIt", "SlowModule"]);
    }

    #[test]
    fn double_it_rejects_non_integer_operand() {
        let mut d = builtin_registry().unwrap().instantiate("DoubleIt").unwrap();
        d.inputs_mut().leaf_mut("a").unwrap().set_value("twelve").unwrap();
        let outcome = Controller::new(ControllerConfig::default()).run(&mut d).unwrap();

        match outcome.failure() {
            Some(FailureReason::Error(e)) => {
                assert!(format!("{e:#}").contains("input a is not an integer"))
            }
            other => panic!("expected module error, got {other:?}"),
        }
        assert!(outcome.outputs().leaf("x").unwrap().value().is_none());
    }
}
