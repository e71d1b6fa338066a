//! Registry of live module singletons.
//!
//! Entries are weak: the registry never keeps a module alive. Each script
//! state that opens a module holds one strong reference through its module
//! proxy, so the singleton is destroyed once the last such state closes.

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use lunabridge_core::{
    MODULE_TYPE, Module, Object, RegistrationError, StaticType, StrongRef, Type, TypeHash, WeakRef,
};

/// Weak map from module type to its live instance.
#[derive(Default)]
pub struct ModuleRegistry {
    instances: FxHashMap<TypeHash, WeakRef<dyn Object>>,
}

impl ModuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `module` as the instance of its type.
    ///
    /// A different live instance already registered for the type is replaced
    /// with a warning; the old instance stays alive for its current holders.
    pub fn register_instance<M: Module>(
        &mut self,
        module: &StrongRef<M>,
    ) -> Result<(), RegistrationError> {
        let ty = module.type_info();
        if !ty.is_a(&MODULE_TYPE) {
            return Err(RegistrationError::NotAModule(ty.name().to_string()));
        }

        if let Some(existing) = self.instance_by_type(ty) {
            if existing.ptr_eq(module) {
                return Ok(());
            }
            warn!(
                target: "lunabridge::module",
                module = module.name(),
                kind = %module.kind(),
                "replacing live module instance"
            );
        }

        debug!(
            target: "lunabridge::module",
            module = module.name(),
            kind = %module.kind(),
            identity = %module.identity(),
            "registered module instance"
        );
        self.instances
            .insert(ty.hash(), module.downgrade().into_object());
        Ok(())
    }

    /// The live instance registered for `ty` (+1), if any.
    pub fn instance_by_type(&self, ty: &Type) -> Option<StrongRef<dyn Object>> {
        self.instances.get(&ty.hash())?.upgrade()
    }

    /// The live instance of `T` (+1), if any.
    pub fn get<T: Module + StaticType>(&self) -> Option<StrongRef<T>> {
        self.instance_by_type(T::static_type())?.downcast::<T>()
    }

    /// The live instance of `T` (+1), or a registration error naming it.
    pub fn require<T: Module + StaticType>(&self) -> Result<StrongRef<T>, RegistrationError> {
        self.get::<T>()
            .ok_or_else(|| RegistrationError::MissingModule(T::static_type().name().to_string()))
    }

    /// Retain the live instance of `T`, or construct and register a new one.
    ///
    /// The returned handle is the caller's reference either way.
    pub fn acquire<T, F>(&mut self, ctor: F) -> Result<StrongRef<T>, RegistrationError>
    where
        T: Module + StaticType,
        F: FnOnce() -> T,
    {
        if let Some(existing) = self.get::<T>() {
            return Ok(existing);
        }
        let module = StrongRef::new(ctor());
        self.register_instance(&module)?;
        Ok(module)
    }

    /// Number of live registered instances.
    pub fn live_count(&self) -> usize {
        self.instances.values().filter(|w| !w.is_dead()).count()
    }

    /// Drop entries whose instance has been destroyed.
    pub fn prune(&mut self) {
        self.instances.retain(|_, weak| !weak.is_dead());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lunabridge_core::{ModuleKind, OBJECT_TYPE, impl_object};

    static TIMER_MODULE: Type = Type::new("TimerModule", Some(&MODULE_TYPE));
    static NOT_A_MODULE: Type = Type::new("Plain", Some(&OBJECT_TYPE));

    struct TimerModule;
    impl_object!(TimerModule, TIMER_MODULE);

    impl Module for TimerModule {
        fn kind(&self) -> ModuleKind {
            ModuleKind::Timer
        }

        fn name(&self) -> &'static str {
            "lunabridge.timer.test"
        }
    }

    struct Plain;
    impl_object!(Plain, NOT_A_MODULE);

    impl Module for Plain {
        fn kind(&self) -> ModuleKind {
            ModuleKind::System
        }

        fn name(&self) -> &'static str {
            "plain"
        }
    }

    #[test]
    fn acquire_reuses_live_instance() {
        let mut registry = ModuleRegistry::new();
        let mut constructed = 0;

        let first = registry
            .acquire(|| {
                constructed += 1;
                TimerModule
            })
            .unwrap();
        let second = registry
            .acquire(|| {
                constructed += 1;
                TimerModule
            })
            .unwrap();

        assert_eq!(constructed, 1);
        assert!(first.ptr_eq(&second));
        assert_eq!(first.ref_count(), 2);
    }

    #[test]
    fn registry_does_not_keep_modules_alive() {
        let mut registry = ModuleRegistry::new();
        let module = registry.acquire(|| TimerModule).unwrap();
        assert_eq!(registry.live_count(), 1);

        assert!(module.release());
        assert_eq!(registry.live_count(), 0);
        assert!(registry.get::<TimerModule>().is_none());

        registry.prune();
        assert!(registry.instances.is_empty());
    }

    #[test]
    fn dead_instance_is_reconstructed() {
        let mut registry = ModuleRegistry::new();
        let first = registry.acquire(|| TimerModule).unwrap();
        drop(first);
        assert_eq!(registry.live_count(), 0);

        let second = registry.acquire(|| TimerModule).unwrap();
        assert_eq!(second.ref_count(), 1);
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn non_module_type_is_rejected() {
        let mut registry = ModuleRegistry::new();
        let err = registry
            .register_instance(&StrongRef::new(Plain))
            .unwrap_err();
        assert_eq!(err, RegistrationError::NotAModule("Plain".into()));
    }

    #[test]
    fn require_reports_missing_module() {
        let registry = ModuleRegistry::new();
        let err = registry.require::<TimerModule>().unwrap_err();
        assert_eq!(err.to_string(), "required module 'TimerModule' is not registered");
    }

    #[test]
    fn second_instance_replaces_first() {
        let mut registry = ModuleRegistry::new();
        let a = StrongRef::new(TimerModule);
        let b = StrongRef::new(TimerModule);
        registry.register_instance(&a).unwrap();
        registry.register_instance(&b).unwrap();

        let current = registry.get::<TimerModule>().unwrap();
        assert!(current.ptr_eq(&b));
        assert_eq!(a.ref_count(), 1);
    }
}
