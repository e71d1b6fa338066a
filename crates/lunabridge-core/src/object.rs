//! Reference-counted native objects.
//!
//! Every engine entity exposed to scripts implements [`Object`] and is owned
//! through [`StrongRef`] handles. The count is atomic: audio, decoder and
//! filesystem workers hold their own references next to the script thread.
//!
//! The object is destroyed exactly when the last strong reference goes away;
//! its `Drop` implementation is the teardown and runs before the memory is
//! reclaimed. Teardown must not call back into the object through other
//! handles, since none remain.
//!
//! ```
//! use lunabridge_core::{impl_object, StrongRef, Type, OBJECT_TYPE};
//!
//! static COUNTER: Type = Type::new("Counter", Some(&OBJECT_TYPE));
//!
//! struct Counter;
//! impl_object!(Counter, COUNTER);
//!
//! let a = StrongRef::new(Counter);
//! let b = a.retain();
//! assert_eq!(a.ref_count(), 2);
//! assert!(!b.release());
//! assert!(a.release());
//! ```

use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

use crate::Type;

/// Upcasting support for [`Object`] trait objects.
///
/// Implemented for every sized `Any + Send + Sync` type.
pub trait AsAny: Any + Send + Sync {
    /// Borrow as `&dyn Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Convert a shared handle into an `Arc<dyn Any>` for downcasting.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A native object that can cross into the script heap.
pub trait Object: AsAny {
    /// Dynamic type of this object.
    fn type_info(&self) -> &'static Type;
}

/// Static type of a concrete object, used by typed lookups.
pub trait StaticType {
    /// The descriptor shared by every instance.
    fn static_type() -> &'static Type;
}

/// Implement [`Object`] and [`StaticType`] for a concrete type.
#[macro_export]
macro_rules! impl_object {
    ($ty:ty, $desc:path) => {
        impl $crate::Object for $ty {
            fn type_info(&self) -> &'static $crate::Type {
                &$desc
            }
        }

        impl $crate::StaticType for $ty {
            fn static_type() -> &'static $crate::Type {
                &$desc
            }
        }
    };
}

/// Address-based identity of a live native object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl ObjectId {
    /// Raw address value.
    pub fn as_usize(self) -> usize {
        self.0
    }

    /// Identity as a script integer key.
    pub fn as_i64(self) -> i64 {
        self.0 as i64
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({:#x})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Owning handle to a native object.
///
/// Cloning (or [`retain`](Self::retain)) increments the count; dropping (or
/// [`release`](Self::release)) decrements it.
pub struct StrongRef<T: ?Sized + Object> {
    inner: Arc<T>,
}

impl<T: Object> StrongRef<T> {
    /// Allocate a new object with a count of one.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }

    /// Erase the concrete type.
    pub fn into_object(self) -> StrongRef<dyn Object> {
        let inner: Arc<dyn Object> = self.inner;
        StrongRef { inner }
    }

    /// Erased copy of this handle (+1).
    pub fn to_object(&self) -> StrongRef<dyn Object> {
        self.retain().into_object()
    }
}

impl<T: ?Sized + Object> StrongRef<T> {
    /// Increment the count and return the new handle.
    pub fn retain(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Decrement the count.
    ///
    /// Returns `true` if the object no longer exists once this returns, in
    /// which case its teardown has already completed.
    pub fn release(self) -> bool {
        let weak = Arc::downgrade(&self.inner);
        drop(self.inner);
        weak.strong_count() == 0
    }

    /// Current number of strong references.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Address-based identity, stable for the object's lifetime.
    pub fn identity(&self) -> ObjectId {
        ObjectId(Arc::as_ptr(&self.inner) as *const () as usize)
    }

    /// Whether both handles refer to the same object.
    pub fn ptr_eq<U: ?Sized + Object>(&self, other: &StrongRef<U>) -> bool {
        self.identity() == other.identity()
    }

    /// Create a non-owning handle.
    pub fn downgrade(&self) -> WeakRef<T> {
        WeakRef {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl StrongRef<dyn Object> {
    /// Typed copy of this handle (+1) if the object is a `U`.
    pub fn downcast<U: Object>(&self) -> Option<StrongRef<U>> {
        <dyn Object as AsAny>::into_any(Arc::clone(&self.inner))
            .downcast::<U>()
            .ok()
            .map(|inner| StrongRef { inner })
    }

    /// Borrow the object as a `U`.
    pub fn downcast_ref<U: Object>(&self) -> Option<&U> {
        AsAny::as_any(&*self.inner).downcast_ref::<U>()
    }
}

impl<T: ?Sized + Object> Clone for StrongRef<T> {
    fn clone(&self) -> Self {
        self.retain()
    }
}

impl<T: ?Sized + Object> Deref for StrongRef<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: ?Sized + Object> fmt::Debug for StrongRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrongRef")
            .field("type", &self.inner.type_info().name())
            .field("identity", &self.identity())
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

/// Non-owning handle to a native object.
pub struct WeakRef<T: ?Sized + Object> {
    inner: Weak<T>,
}

impl<T: ?Sized + Object> WeakRef<T> {
    /// Retain the object if it is still alive.
    pub fn upgrade(&self) -> Option<StrongRef<T>> {
        self.inner.upgrade().map(|inner| StrongRef { inner })
    }

    /// Whether the object has been destroyed.
    pub fn is_dead(&self) -> bool {
        self.inner.strong_count() == 0
    }
}

impl<T: Object> WeakRef<T> {
    /// Erase the concrete type.
    pub fn into_object(self) -> WeakRef<dyn Object> {
        let inner: Weak<dyn Object> = self.inner;
        WeakRef { inner }
    }
}

impl<T: ?Sized + Object> Clone for WeakRef<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T: ?Sized + Object> fmt::Debug for WeakRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakRef")
            .field("alive", &!self.is_dead())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::OBJECT_TYPE;

    static PROBE: Type = Type::new("Probe", Some(&OBJECT_TYPE));
    static OTHER: Type = Type::new("Other", Some(&OBJECT_TYPE));

    struct Probe {
        drops: Arc<AtomicUsize>,
    }
    impl_object!(Probe, PROBE);

    impl Drop for Probe {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Other;
    impl_object!(Other, OTHER);

    fn probe() -> (StrongRef<Probe>, Arc<AtomicUsize>) {
        let drops = Arc::new(AtomicUsize::new(0));
        (
            StrongRef::new(Probe {
                drops: Arc::clone(&drops),
            }),
            drops,
        )
    }

    #[test]
    fn retain_and_release_track_count() {
        let (obj, drops) = probe();
        assert_eq!(obj.ref_count(), 1);

        let extra = obj.retain();
        assert_eq!(obj.ref_count(), 2);

        assert!(!extra.release());
        assert_eq!(obj.ref_count(), 1);
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        assert!(obj.release());
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn destroyed_exactly_once_across_threads() {
        let (obj, drops) = probe();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let r = obj.retain();
                std::thread::spawn(move || {
                    let local = r.retain();
                    drop(local);
                    r.release()
                })
            })
            .collect();
        let destroyed_by_worker = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|d| *d)
            .count();
        assert_eq!(destroyed_by_worker, 0);
        assert!(obj.release());
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn identity_is_shared_by_all_handles() {
        let (obj, _) = probe();
        let erased = obj.to_object();
        assert_eq!(obj.identity(), erased.identity());
        assert!(obj.ptr_eq(&erased));
    }

    #[test]
    fn downcast_checks_concrete_type() {
        let (obj, _) = probe();
        let erased = obj.to_object();
        assert!(erased.downcast::<Probe>().is_some());
        assert!(erased.downcast::<Other>().is_none());
        assert!(erased.downcast_ref::<Probe>().is_some());
        assert_eq!(obj.ref_count(), 2);
    }

    #[test]
    fn weak_ref_does_not_keep_alive() {
        let (obj, drops) = probe();
        let weak = obj.downgrade();
        assert!(weak.upgrade().is_some());
        drop(obj);
        assert!(weak.is_dead());
        assert!(weak.upgrade().is_none());
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn type_info_through_erased_handle() {
        let erased = StrongRef::new(Other).into_object();
        assert_eq!(erased.type_info().name(), "Other");
        assert_eq!(<Other as StaticType>::static_type().name(), "Other");
    }
}
