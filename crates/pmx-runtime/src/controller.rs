use pmx_artifacts::write_summary;
use pmx_config::{PmxConfig, ReportingConfig};
use pmx_params::{InvalidParameter, ParamCollection};
use pmx_report::{report_to_aggregator, Aggregator, HttpAggregator, ReportOutcome, ReportingError};
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Once;
use std::thread;
use tracing::{error, info, warn};

use crate::{AlgorithmDescriptor, Cancelled, Monitor, PerformanceRecord};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Controller settings, taken from the typed config.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerConfig {
    pub reporting: ReportingConfig,
    /// Interactive callers surface validation errors themselves; otherwise
    /// they are also written to stderr.
    pub interactive: bool,
    /// Where the summary goes when reporting is active.
    pub output_dir: PathBuf,
    pub summary_file: String,
}

impl ControllerConfig {
    pub fn from_config(cfg: &PmxConfig) -> Self {
        Self {
            reporting: cfg.reporting.clone(),
            interactive: cfg.run.interactive,
            output_dir: cfg.run.output_dir.clone(),
            summary_file: cfg.run.summary_file.clone(),
        }
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_dir.join(&self.summary_file)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from_config(&PmxConfig::default())
    }
}

#[derive(Debug)]
pub enum ControllerError {
    /// A controller executes at most one run.
    AlreadyRan { state: RunState },
}

impl std::fmt::Display for ControllerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyRan { state } => {
                write!(f, "controller already used (state={state:?}); create a new one per run")
            }
        }
    }
}

impl std::error::Error for ControllerError {}

/// Why a run failed.
#[derive(Debug)]
pub enum FailureReason {
    /// The body returned an error.
    Error(anyhow::Error),
    /// The body honored a stop request.
    Cancelled,
    /// The body panicked; the payload message if it was a string.
    Panic(String),
    /// The body returned but the output tree is invalid.
    Validation(InvalidParameter),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error(e) => write!(f, "module error: {e:#}"),
            Self::Cancelled => f.write_str("module cancelled"),
            Self::Panic(msg) => write!(f, "module panicked: {msg}"),
            Self::Validation(e) => write!(f, "output validation failed: {e}"),
        }
    }
}

#[derive(Debug)]
pub enum ExecutionResult {
    Succeeded {
        outputs: ParamCollection,
    },
    Failed {
        reason: FailureReason,
        partial_outputs: ParamCollection,
    },
}

#[derive(Debug)]
pub struct RunOutcome {
    pub result: ExecutionResult,
    /// True only when the body finished and the outputs validated.
    pub completed: bool,
    pub performance: PerformanceRecord,
    /// Summary written for the aggregator, if any.
    pub summary_path: Option<PathBuf>,
    pub report: ReportOutcome,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.result, ExecutionResult::Succeeded { .. })
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.result {
            ExecutionResult::Failed { reason, .. } => Some(reason),
            ExecutionResult::Succeeded { .. } => None,
        }
    }

    pub fn outputs(&self) -> &ParamCollection {
        match &self.result {
            ExecutionResult::Succeeded { outputs } => outputs,
            ExecutionResult::Failed {
                partial_outputs, ..
            } => partial_outputs,
        }
    }
}

/// Runs one module execution through its lifecycle:
/// `Idle -> Running -> {Succeeded, Failed}`.
pub struct Controller {
    config: ControllerConfig,
    monitor: Monitor,
    state: RunState,
    completed: bool,
    aggregator: Option<Box<dyn Aggregator>>,
    performance: Option<PerformanceRecord>,
}

impl Controller {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            monitor: Monitor::new(),
            state: RunState::Idle,
            completed: false,
            aggregator: None,
            performance: None,
        }
    }

    /// Use `aggregator` instead of the HTTP binding built from the config.
    pub fn with_aggregator(mut self, aggregator: impl Aggregator + 'static) -> Self {
        self.aggregator = Some(Box::new(aggregator));
        self
    }

    /// Handle for progress observers and watchdogs.
    pub fn monitor(&self) -> Monitor {
        self.monitor.clone()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn performance(&self) -> Option<&PerformanceRecord> {
        self.performance.as_ref()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Execute the descriptor's module. Body failures never escape: they
    /// end in `ExecutionResult::Failed`. Only reuse of the controller is an error.
    ///
    /// A monitor stopped through [`Monitor::stop`] (a watchdog timeout, say)
    /// ends the run cancelled even if the body returned normally; a stop
    /// requested before `run` skips the body.
    pub fn run(&mut self, descriptor: &mut AlgorithmDescriptor) -> Result<RunOutcome, ControllerError> {
        if self.state != RunState::Idle {
            return Err(ControllerError::AlreadyRan { state: self.state });
        }
        self.state = RunState::Running;
        self.completed = false;

        let module = descriptor.spec().name.clone();
        let identity = descriptor.identity();
        info!(%module, %identity, "module run started");

        self.monitor.start();
        let (body, panic_trace) = if self.monitor.is_stop_requested() {
            warn!(%module, %identity, "stop requested before start; body skipped");
            (Ok(Err(anyhow::Error::new(Cancelled))), None)
        } else {
            catch_panic(|| descriptor.execute(&self.monitor))
        };

        let (performance, ended_here) = self.monitor.conclude();
        descriptor.record_performance(&performance);
        self.performance = Some(performance.clone());

        let failure = match body {
            Ok(Ok(())) if !ended_here => {
                warn!(%module, %identity, "monitor stopped during run");
                Some(FailureReason::Cancelled)
            }
            Ok(Ok(())) => None,
            Ok(Err(e)) if e.downcast_ref::<Cancelled>().is_some() => {
                warn!(%module, %identity, "module stopped on request");
                Some(FailureReason::Cancelled)
            }
            Ok(Err(e)) => {
                let trace = Backtrace::force_capture();
                error!(%module, %identity, backtrace = %trace, "module execution failed: {e:?}");
                Some(FailureReason::Error(e))
            }
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                let trace = panic_trace.unwrap_or_else(|| "<no backtrace captured>".to_string());
                error!(%module, %identity, backtrace = %trace, "module execution panicked: {msg}");
                Some(FailureReason::Panic(msg))
            }
        };

        let failure = failure.or_else(|| match descriptor.outputs().validate() {
            Ok(()) => None,
            Err(invalid) => {
                error!(%module, %identity, "output validation failed: {invalid}");
                if !self.config.interactive {
                    eprintln!("{module}: {invalid}");
                }
                Some(FailureReason::Validation(invalid))
            }
        });

        let outputs = descriptor.outputs().clone();
        let (result, summary_path, report) = match failure {
            Some(reason) => {
                self.state = RunState::Failed;
                let result = ExecutionResult::Failed {
                    reason,
                    partial_outputs: outputs,
                };
                (result, None, ReportOutcome::Skipped)
            }
            None => {
                self.state = RunState::Succeeded;
                self.completed = true;
                let (summary_path, report) = self.summarize_and_report(&outputs);
                (ExecutionResult::Succeeded { outputs }, summary_path, report)
            }
        };

        info!(
            %module,
            state = ?self.state,
            wall_ms = performance.wall_ms,
            cpu_ms = ?performance.cpu_ms,
            "module run finished"
        );

        Ok(RunOutcome {
            result,
            completed: self.completed,
            performance,
            summary_path,
            report,
        })
    }

    fn summarize_and_report(&self, outputs: &ParamCollection) -> (Option<PathBuf>, ReportOutcome) {
        let reporting = &self.config.reporting;
        if !reporting.is_active() {
            return (None, ReportOutcome::Skipped);
        }

        let path = self.config.summary_path();
        if let Err(e) = write_summary(outputs, &path) {
            warn!(error = %e, "summary not written; aggregator report skipped");
            return (None, ReportOutcome::Failed(ReportingError::SummaryNotWritten(e.to_string())));
        }

        let report = match &self.aggregator {
            Some(agg) => report_to_aggregator(outputs, &path, reporting, agg.as_ref()),
            None => match HttpAggregator::from_config(reporting) {
                Ok(http) => report_to_aggregator(outputs, &path, reporting, &http),
                Err(e) => {
                    warn!(error = %e, "aggregator client unavailable");
                    ReportOutcome::Failed(e)
                }
            },
        };
        (Some(path), report)
    }
}

// ---- panic capture ----

thread_local! {
    static CAPTURING: Cell<bool> = const { Cell::new(false) };
    static PANIC_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

// Panics on a thread running a module body record a backtrace for the
// controller's log; every other panic goes to the previous hook.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if CAPTURING.with(Cell::get) {
                let trace = Backtrace::force_capture().to_string();
                PANIC_TRACE.with(|t| *t.borrow_mut() = Some(trace));
            } else {
                previous(info);
            }
        }));
    });
}

fn catch_panic<R>(body: impl FnOnce() -> R) -> (thread::Result<R>, Option<String>) {
    install_panic_hook();
    let outer = CAPTURING.with(|c| c.replace(true));
    let result = panic::catch_unwind(AssertUnwindSafe(body));
    CAPTURING.with(|c| c.set(outer));
    let trace = PANIC_TRACE.with(|t| t.borrow_mut().take());
    (result, trace)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
