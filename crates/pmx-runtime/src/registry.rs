//! Module registry: catalogue of available processing modules.
//!
//! Each entry is the module's [`ModuleSpec`] plus a `Send + Sync` factory
//! that produces a fresh module on demand. [`ModuleRegistry::instantiate`]
//! wraps that module in a new [`AlgorithmDescriptor`], so no parameter tree
//! is ever shared between runs.
//!
//! Insertion order is preserved in `list()` output.

use crate::{AlgorithmDescriptor, ModuleSpec, ProcessingModule};

// ---------------------------------------------------------------------------
// Factory type alias
// ---------------------------------------------------------------------------

pub type ModuleFactory = Box<dyn Fn() -> Box<dyn ProcessingModule> + Send + Sync>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateName { name: String },
    UnknownModule { name: String },
    /// The module's spec name is empty or whitespace.
    EmptyName,
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateName { name } => write!(f, "module '{name}' is already registered"),
            Self::UnknownModule { name } => write!(f, "no module named '{name}' is registered"),
            Self::EmptyName => write!(f, "module name must not be empty"),
        }
    }
}

impl std::error::Error for RegistryError {}

// ---------------------------------------------------------------------------
// ModuleRegistry
// ---------------------------------------------------------------------------

struct RegistryEntry {
    spec: ModuleSpec,
    factory: ModuleFactory,
}

/// Names are compared case-sensitively.
#[derive(Default)]
pub struct ModuleRegistry {
    entries: Vec<RegistryEntry>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module factory. The registry key is the `spec().name` of
    /// one instance the factory produces at registration.
    pub fn register<F>(&mut self, factory: F) -> Result<(), RegistryError>
    where
        F: Fn() -> Box<dyn ProcessingModule> + Send + Sync + 'static,
    {
        let spec = factory().spec();
        if spec.name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.contains(&spec.name) {
            return Err(RegistryError::DuplicateName { name: spec.name });
        }
        self.entries.push(RegistryEntry {
            spec,
            factory: Box::new(factory),
        });
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.spec.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Specs in insertion order.
    pub fn list(&self) -> Vec<&ModuleSpec> {
        self.entries.iter().map(|e| &e.spec).collect()
    }

    pub fn lookup(&self, name: &str) -> Result<&ModuleSpec, RegistryError> {
        self.entry(name).map(|e| &e.spec)
    }

    /// A fresh descriptor (new module instance, new trees) for `name`.
    pub fn instantiate(&self, name: &str) -> Result<AlgorithmDescriptor, RegistryError> {
        let entry = self.entry(name)?;
        Ok(AlgorithmDescriptor::new((entry.factory)()))
    }

    fn entry(&self, name: &str) -> Result<&RegistryEntry, RegistryError> {
        self.entries
            .iter()
            .find(|e| e.spec.name == name)
            .ok_or_else(|| RegistryError::UnknownModule {
                name: name.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ModuleContext;
    use pmx_params::{LeafParam, ParamNode};

    struct Named(&'static str);

    impl ProcessingModule for Named {
        fn spec(&self) -> ModuleSpec {
            ModuleSpec::new(self.0, "1.0.0", "test module")
        }

        fn create_inputs(&self) -> Vec<ParamNode> {
            vec![LeafParam::int("n").into()]
        }

        fn create_outputs(&self) -> Vec<ParamNode> {
            Vec::new()
        }

        fn execute(&mut self, _ctx: &mut ModuleContext<'_>) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut reg = ModuleRegistry::new();
        reg.register(|| Box::new(Named("alpha"))).unwrap();
        let err = reg.register(|| Box::new(Named("alpha")));
        assert_eq!(
            err,
            Err(RegistryError::DuplicateName {
                name: "alpha".to_string()
            })
        );
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn list_preserves_insertion_order() {
        let mut reg = ModuleRegistry::new();
        reg.register(|| Box::new(Named("zeta"))).unwrap();
        reg.register(|| Box::new(Named("alpha"))).unwrap();
        let names: Vec<&str> = reg.list().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn instantiate_builds_fresh_trees() {
        let mut reg = ModuleRegistry::new();
        reg.register(|| Box::new(Named("alpha"))).unwrap();
        let a = reg.instantiate("alpha").unwrap();
        let b = reg.instantiate("alpha").unwrap();
        assert_ne!(a.identity(), b.identity());
        assert!(a.inputs().get("n").is_some());
        assert!(matches!(
            reg.instantiate("missing"),
            Err(RegistryError::UnknownModule { .. })
        ));
    }
}
