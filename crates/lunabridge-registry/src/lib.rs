//! Process-wide registries for the lunabridge scripting bridge.
//!
//! Two tables live for the whole process:
//!
//! - [`TypeRegistry`] - every [`Type`](lunabridge_core::Type) exposed to
//!   scripts, keyed by name.
//! - [`ModuleRegistry`] - the live singleton of each module type, held weakly
//!   so a module dies with the last script state using it.
//!
//! Both are written while modules are being opened and read afterwards. The
//! global instances sit behind an `RwLock`; readers never contend once
//! initialization is over.

mod modules;
mod types;

use std::sync::{OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use modules::ModuleRegistry;
pub use types::TypeRegistry;

static TYPES: OnceLock<RwLock<TypeRegistry>> = OnceLock::new();
static MODULES: OnceLock<RwLock<ModuleRegistry>> = OnceLock::new();

/// The process-wide type registry.
pub fn types() -> &'static RwLock<TypeRegistry> {
    TYPES.get_or_init(|| RwLock::new(TypeRegistry::new()))
}

/// The process-wide module registry.
pub fn modules() -> &'static RwLock<ModuleRegistry> {
    MODULES.get_or_init(|| RwLock::new(ModuleRegistry::new()))
}

/// Read access that survives a panic in another writer.
///
/// Registry writes are single insertions, so a poisoned lock still guards a
/// consistent table.
pub fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

/// Write access that survives a panic in another writer.
pub fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
