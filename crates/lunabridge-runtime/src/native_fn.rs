//! Native functions callable from Lua.
//!
//! A native function receives a [`CallContext`], reads its arguments, pushes
//! its results and returns how many of the pushed values are results. Errors
//! are returned, never raised: [`wrap_function`] runs the function through
//! the exception bridge and raises only after the native frame is gone.

use std::fmt;
use std::sync::Arc;

use mlua::{Function, Lua, MultiValue, Value};
use tracing::trace;

use lunabridge_core::{NativeResult, TypeHash};

use crate::call_context::CallContext;
use crate::exception::{CallPhase, catch_native, raise};

/// Trait for callable native functions.
pub trait NativeCallable {
    /// Call this function with the given context.
    fn call(&self, ctx: &mut CallContext<'_>) -> NativeResult<usize>;
}

impl<F> NativeCallable for F
where
    F: Fn(&mut CallContext<'_>) -> NativeResult<usize>,
{
    fn call(&self, ctx: &mut CallContext<'_>) -> NativeResult<usize> {
        (self)(ctx)
    }
}

/// Type-erased native function.
///
/// The callable is shared, so cloning is cheap and every clone calls the
/// same implementation.
#[derive(Clone)]
pub struct NativeFn {
    inner: Arc<dyn NativeCallable + Send + Sync>,
}

impl NativeFn {
    /// Wrap a function or closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> NativeResult<usize> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Wrap any other [`NativeCallable`].
    pub fn from_callable<C>(callable: C) -> Self
    where
        C: NativeCallable + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(callable),
        }
    }

    /// Call this native function with the given context.
    pub fn call(&self, ctx: &mut CallContext<'_>) -> NativeResult<usize> {
        self.inner.call(ctx)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn").finish_non_exhaustive()
    }
}

/// A named entry of a module or method table.
#[derive(Debug, Clone)]
pub struct FunctionReg {
    pub name: &'static str,
    pub func: NativeFn,
}

impl FunctionReg {
    pub fn new<F>(name: &'static str, f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> NativeResult<usize> + Send + Sync + 'static,
    {
        Self {
            name,
            func: NativeFn::new(f),
        }
    }

    /// Hash of this function installed under `namespace`.
    pub fn hash(&self, namespace: &str) -> TypeHash {
        TypeHash::from_function(namespace, self.name)
    }
}

/// Expose a native function as a Lua function.
///
/// `name` is used in argument error messages.
pub fn wrap_function(lua: &Lua, name: &'static str, func: NativeFn) -> mlua::Result<Function> {
    lua.create_function(move |lua, args: MultiValue| {
        let mut ctx = CallContext::new(lua, name, args.into_iter().collect());
        let result = catch_native(|| func.call(&mut ctx));
        trace!(
            target: "lunabridge::call",
            function = name,
            phase = ?CallPhase::after(&result),
            "native part done"
        );
        match result {
            Ok(count) => Ok(ctx.take_results(count).into_iter().collect::<MultiValue>()),
            Err(err) => {
                drop(ctx);
                Err(raise(err))
            }
        }
    })
}

/// Call a Lua function from native code, collecting every result.
pub fn call_function(function: &Function, args: Vec<Value>) -> mlua::Result<Vec<Value>> {
    let results: MultiValue = function.call(args.into_iter().collect::<MultiValue>())?;
    Ok(results.into_iter().collect())
}
