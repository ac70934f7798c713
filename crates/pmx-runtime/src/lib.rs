//! pmx-runtime
//!
//! Execution lifecycle for a single processing module:
//! - `AlgorithmDescriptor` pairs a module body with its input/output trees.
//! - `Controller::run` drives `Idle -> Running -> {Succeeded, Failed}`:
//!   body errors and panics are contained, the monitor is stopped exactly
//!   once, performance is recorded, outputs are validated, and on success the
//!   summary is written and (optionally) reported to the aggregator.
//! - `ModuleRegistry` maps module names to factories.
//!
//! Runs are synchronous on the caller's thread. The `Monitor` is the only
//! state shared with other threads.

mod controller;
mod descriptor;
mod module;
mod monitor;
mod registry;

pub use controller::*;
pub use descriptor::*;
pub use module::*;
pub use monitor::*;
pub use registry::*;
