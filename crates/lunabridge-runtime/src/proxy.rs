//! The script-heap handle of a native object.
//!
//! A [`Proxy`] is Lua full userdata owning one strong reference to its
//! object. The reference is given up at exactly one of two points:
//!
//! - an explicit release, which takes it out of the proxy, or
//! - collection of the userdata, which drops the proxy and the reference
//!   still inside it.
//!
//! After a release the proxy stays in the heap but refers to nothing; every
//! method except the `Object` base methods fails with
//! [`NativeError::Released`].

use std::fmt;

use mlua::{AnyUserData, MetaMethod, UserData, UserDataMethods, Value};
use tracing::trace;

use lunabridge_core::{NativeError, NativeResult, Object, StrongRef, Type};

use crate::register::lookup_method;

/// Lua-side handle pairing a type descriptor with a native object.
pub struct Proxy {
    ty: Option<&'static Type>,
    object: Option<StrongRef<dyn Object>>,
}

impl Proxy {
    /// Wrap a reference the caller hands over.
    pub(crate) fn new(ty: &'static Type, object: StrongRef<dyn Object>) -> Self {
        Self {
            ty: Some(ty),
            object: Some(object),
        }
    }

    /// Descriptor the object was exposed as, `None` once released.
    pub fn type_info(&self) -> Option<&'static Type> {
        self.ty
    }

    /// The wrapped object, `None` once released.
    pub fn object(&self) -> Option<&StrongRef<dyn Object>> {
        self.object.as_ref()
    }

    pub fn is_released(&self) -> bool {
        self.object.is_none()
    }

    /// Type and object of a live proxy.
    pub fn live(&self) -> NativeResult<(&'static Type, &StrongRef<dyn Object>)> {
        match (self.ty, self.object.as_ref()) {
            (Some(ty), Some(object)) => Ok((ty, object)),
            _ => Err(NativeError::Released),
        }
    }

    /// Clear both fields and hand the reference to the caller.
    pub(crate) fn take(&mut self) -> Option<StrongRef<dyn Object>> {
        self.ty = None;
        self.object.take()
    }
}

impl Drop for Proxy {
    fn drop(&mut self) {
        if let Some(object) = &self.object {
            trace!(
                target: "lunabridge::proxy",
                ty = object.type_info().name(),
                identity = %object.identity(),
                "collecting proxy"
            );
        }
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.live() {
            Ok((ty, object)) => write!(f, "{}: {}", ty.name(), object.identity()),
            Err(_) => f.write_str("Object: NULL"),
        }
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("type", &self.ty.map(Type::name))
            .field("object", &self.object)
            .finish()
    }
}

impl UserData for Proxy {
    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::Index, |lua, this, key: Value| {
            lookup_method(lua, this.type_info(), &key)
        });

        methods.add_meta_function(MetaMethod::Eq, |_, (a, b): (AnyUserData, AnyUserData)| {
            let equal = match (a.borrow::<Proxy>(), b.borrow::<Proxy>()) {
                (Ok(a), Ok(b)) => match (a.object(), b.object()) {
                    (Some(x), Some(y)) => x.ptr_eq(y),
                    _ => false,
                },
                _ => false,
            };
            Ok(equal)
        });

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| Ok(this.to_string()));
    }
}
