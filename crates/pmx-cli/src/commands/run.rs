//! `pmx run`: configure, execute, route outputs, write the manifest.

use anyhow::{Context, Result};
use pmx_artifacts::{
    route_outputs, write_run_manifest, FileOutputWriter, RunManifest, RunManifestArgs,
};
use pmx_runtime::{Controller, ControllerConfig, Monitor};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use super::{catalogue, load_config};

/// The run finished but did not succeed.
const EXIT_RUN_FAILED: u8 = 1;

pub struct RunArgs {
    pub module: String,
    pub config_paths: Vec<PathBuf>,
    pub saved: Option<PathBuf>,
    pub sets: Vec<(String, String)>,
    pub outputs: Vec<(String, String)>,
    pub out_dir: Option<PathBuf>,
    pub interactive: bool,
    pub timeout_ms: Option<u64>,
}

/// Errors before the module body starts (config, unknown module, bad input
/// values) are returned as `Err`; a failed run is exit code 1. Outputs are
/// routed whatever the outcome, so a failed run still leaves its partial
/// outputs behind.
pub fn run_module(args: RunArgs) -> Result<ExitCode> {
    let (loaded, mut cfg) = load_config(&args.config_paths)?;
    if let Some(dir) = args.out_dir {
        cfg.run.output_dir = dir;
    }
    if args.interactive {
        cfg.run.interactive = true;
    }

    let registry = catalogue()?;
    let mut descriptor = registry.instantiate(&args.module)?;

    if let Some(path) = &args.saved {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read saved inputs failed: {}", path.display()))?;
        let report = descriptor.load_inputs_json(&raw)?;
        eprint!("{}", report.render());
    }

    for (label, value) in &args.sets {
        descriptor
            .inputs_mut()
            .leaf_mut(label)
            .with_context(|| format!("--set {label}: no such input"))?
            .set_value(value.as_str())
            .with_context(|| format!("--set {label}={value}"))?;
    }

    let requested: BTreeMap<String, PathBuf> = args
        .outputs
        .into_iter()
        .map(|(tag, path)| (tag, PathBuf::from(path)))
        .collect();

    let run_id = Uuid::new_v4();
    let out_dir = cfg.run.output_dir.clone();
    info!(%run_id, module = %args.module, out_dir = %out_dir.display(), "pmx run");

    let mut controller = Controller::new(ControllerConfig::from_config(&cfg));
    let watchdog = args
        .timeout_ms
        .map(|ms| spawn_watchdog(controller.monitor(), Duration::from_millis(ms)));
    let outcome = controller.run(&mut descriptor);
    if let Some((done, handle)) = watchdog {
        drop(done);
        let _ = handle.join();
    }
    let outcome = outcome?;

    let mut manifest = RunManifest::new(RunManifestArgs {
        run_id,
        module_name: &descriptor.spec().name,
        module_identity: descriptor.identity(),
        config_hash: &loaded.config_hash,
        succeeded: outcome.succeeded(),
        failure_reason: outcome.failure().map(|r| r.to_string()),
        elapsed_ms: outcome.performance.wall_ms,
        cpu_ms: outcome.performance.cpu_ms,
    });

    let routed = route_outputs(
        outcome.outputs(),
        &requested,
        &out_dir,
        &cfg.run.summary_file,
        &mut FileOutputWriter,
    );
    for d in &routed.diagnostics {
        eprintln!("{d}");
    }
    manifest.artifacts.routed = routed
        .written
        .iter()
        .map(|(tag, p)| (tag.clone(), p.display().to_string()))
        .collect();
    manifest.artifacts.resources = routed
        .resources
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    manifest.artifacts.summary_file = routed
        .summary_path
        .or_else(|| outcome.summary_path.clone())
        .map(|p| p.display().to_string());

    let manifest_path = write_run_manifest(&out_dir, &manifest)?;

    println!("run_id={run_id}");
    println!("module={}", manifest.module_name);
    println!("outcome={}", manifest.outcome);
    println!("elapsed_ms={}", manifest.elapsed_ms);
    println!("manifest={}", manifest_path.display());
    if let Some(reason) = &manifest.failure_reason {
        println!("failure={reason}");
    }

    if outcome.succeeded() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_RUN_FAILED))
    }
}

/// Stops `monitor` once `timeout` elapses, unless the returned sender is
/// dropped first.
fn spawn_watchdog(monitor: Monitor, timeout: Duration) -> (mpsc::Sender<()>, JoinHandle<()>) {
    let (done_tx, done_rx) = mpsc::channel::<()>();
    let handle = thread::spawn(move || {
        if let Err(RecvTimeoutError::Timeout) = done_rx.recv_timeout(timeout) {
            if monitor.stop() {
                warn!(timeout_ms = timeout.as_millis() as u64, "run timed out; monitor stopped");
            }
        }
    });
    (done_tx, handle)
}
