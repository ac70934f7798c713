//! pmx-testkit
//!
//! Fault-injection modules for scenario tests. Each one drives a single
//! failure path through the controller:
//!
//! - `FailingModule`: writes a partial output, then returns an error
//! - `PanickingModule`: panics mid-body
//! - `InvalidOutputModule`: finishes with an out-of-bounds output
//!
//! The shipped modules are re-exported so scenarios need one import.
//! Never link this crate into a production binary without an explicit
//! `testkit` feature.

mod modules;

pub use modules::*;
pub use pmx_modules::{DoubleIt, SlowModule};

use pmx_runtime::{ModuleRegistry, RegistryError};

/// Shipped modules followed by the fault-injection modules.
pub fn reference_registry() -> Result<ModuleRegistry, RegistryError> {
    let mut reg = ModuleRegistry::new();
    pmx_modules::register_builtins(&mut reg)?;
    reg.register(|| Box::new(FailingModule))?;
    reg.register(|| Box::new(PanickingModule))?;
    reg.register(|| Box::new(InvalidOutputModule))?;
    Ok(reg)
}
