//! Registry of exposed type descriptors.

use std::ptr;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use lunabridge_core::{RegistrationError, Type};

/// Name-indexed table of registered [`Type`]s.
#[derive(Default)]
pub struct TypeRegistry {
    by_name: FxHashMap<&'static str, &'static Type>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type and every ancestor it has.
    ///
    /// Registering the same descriptor again is a no-op. A different
    /// descriptor reusing a registered name is rejected, as is a parent chain
    /// that never reaches a root.
    pub fn register(&mut self, ty: &'static Type) -> Result<(), RegistrationError> {
        let chain = Self::chain(ty)?;

        for link in &chain {
            if let Some(existing) = self.by_name.get(link.name()) {
                if !ptr::eq(*existing, *link) {
                    return Err(RegistrationError::DuplicateType(link.name().to_string()));
                }
            }
        }

        for link in chain {
            if self.by_name.insert(link.name(), link).is_none() {
                debug!(
                    target: "lunabridge::registry",
                    ty = link.name(),
                    parent = link.parent().map(Type::name),
                    "registered type"
                );
            }
        }
        Ok(())
    }

    /// Collect `ty` and its ancestors, rejecting cycles.
    fn chain(ty: &'static Type) -> Result<Vec<&'static Type>, RegistrationError> {
        let mut seen = FxHashSet::default();
        let mut chain = Vec::new();
        let mut current = Some(ty);
        while let Some(link) = current {
            if !seen.insert(link as *const Type) {
                return Err(RegistrationError::CyclicAncestry(ty.name().to_string()));
            }
            chain.push(link);
            current = link.parent();
        }
        Ok(chain)
    }

    /// Look a registered type up by name.
    pub fn by_name(&self, name: &str) -> Option<&'static Type> {
        self.by_name.get(name).copied()
    }

    /// Whether this exact descriptor is registered.
    pub fn contains(&self, ty: &Type) -> bool {
        self.by_name
            .get(ty.name())
            .is_some_and(|existing| ptr::eq(*existing, ty))
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Iterate over every registered type, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &'static Type> + '_ {
        self.by_name.values().copied()
    }
}
