//! pmx-modules
//!
//! Processing modules shipped with the `pmx` binary.
//!
//! - `DoubleIt`: parses text input `a`, writes `x = 2 * a`
//! - `SlowModule`: steps with progress, honors stop requests

mod modules;

pub use modules::*;

use pmx_runtime::{ModuleRegistry, RegistryError};

/// Registry holding the shipped modules.
pub fn builtin_registry() -> Result<ModuleRegistry, RegistryError> {
    let mut reg = ModuleRegistry::new();
    register_builtins(&mut reg)?;
    Ok(reg)
}

/// Add the shipped modules to an existing registry.
pub fn register_builtins(reg: &mut ModuleRegistry) -> Result<(), RegistryError> {
    reg.register(|| Box::new(DoubleIt))?;
    reg.register(|| Box::new(SlowModule))?;
    Ok(())
}
