//! Errors, panics and invalid outputs all end in `Failed` with the monitor
//! stopped exactly once; the caller's thread keeps running.

use anyhow::Result;
use pmx_params::InvalidReason;
use pmx_runtime::{
    AlgorithmDescriptor, Controller, ControllerConfig, ExecutionResult, FailureReason, RunState,
};
use pmx_testkit::{FailingModule, InvalidOutputModule, PanickingModule};

fn interactive() -> ControllerConfig {
    ControllerConfig {
        interactive: true,
        ..ControllerConfig::default()
    }
}

#[test]
fn scenario_error_keeps_partial_outputs() -> Result<()> {
    let mut d = AlgorithmDescriptor::new(Box::new(FailingModule));
    let mut c = Controller::new(interactive());
    let outcome = c.run(&mut d)?;

    assert!(!outcome.completed);
    assert_eq!(c.state(), RunState::Failed);
    assert_eq!(c.monitor().stop_count(), 1);
    match &outcome.result {
        ExecutionResult::Failed {
            reason: FailureReason::Error(e),
            partial_outputs,
        } => {
            assert!(e.to_string().contains("gave up"));
            assert_eq!(partial_outputs.int("partial")?, 1);
            assert!(partial_outputs.leaf("final")?.value().is_none());
        }
        other => panic!("unexpected result: {other:?}"),
    }
    Ok(())
}

#[test]
fn scenario_panic_is_contained_like_an_error() -> Result<()> {
    let mut d = AlgorithmDescriptor::new(Box::new(PanickingModule));
    let mut c = Controller::new(interactive());
    let outcome = c.run(&mut d)?;

    assert!(!outcome.succeeded());
    assert!(!outcome.completed);
    assert_eq!(c.monitor().stop_count(), 1);
    assert!(!c.monitor().is_running());
    match outcome.failure() {
        Some(FailureReason::Panic(msg)) => assert!(msg.contains("impossible state")),
        other => panic!("unexpected failure: {other:?}"),
    }
    // Performance is still captured for a crashed body.
    assert!(c.performance().is_some());
    Ok(())
}

#[test]
fn scenario_out_of_bounds_output_fails_validation() -> Result<()> {
    let mut d = AlgorithmDescriptor::new(Box::new(InvalidOutputModule));
    let mut c = Controller::new(interactive());
    let outcome = c.run(&mut d)?;

    assert!(!outcome.completed);
    match outcome.failure() {
        Some(FailureReason::Validation(invalid)) => {
            assert_eq!(invalid.path, "Outputs/stats/ratio");
            assert!(matches!(invalid.reason, InvalidReason::AboveMaximum { .. }));
        }
        other => panic!("unexpected failure: {other:?}"),
    }
    Ok(())
}
