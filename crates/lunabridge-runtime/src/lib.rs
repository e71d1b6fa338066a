//! Lua glue of the lunabridge scripting bridge.
//!
//! This crate connects the engine-independent core to an `mlua` state:
//!
//! - [`Proxy`] userdata and the per-state identity cache
//!   ([`push_existing`], [`push_new`], [`release_proxy`])
//! - argument marshaling through [`CallContext`]
//! - the exception bridge ([`catch_native`], [`raise`]) used by every
//!   [`NativeFn`]
//! - module and type registration ([`register_module`], [`register_type`])
//! - pinned thread, registry [`Reference`]s and deprecation tracking
//!
//! # Example
//!
//! ```
//! use lunabridge_runtime::{BridgeConfig, CallContext, NativeFn, init_state, wrap_function};
//!
//! let lua = mlua::Lua::new();
//! let root = init_state(&lua, BridgeConfig::default()).unwrap();
//!
//! let twice = wrap_function(&lua, "twice", NativeFn::new(|ctx: &mut CallContext<'_>| {
//!     let n = ctx.check_number(1)?;
//!     ctx.push_number(n * 2.0);
//!     Ok(1)
//! })).unwrap();
//! root.set("twice", twice).unwrap();
//!
//! let n: f64 = lua.load("return luna.twice(21)").eval().unwrap();
//! assert_eq!(n, 42.0);
//! ```

mod call_context;
mod config;
mod deprecation;
mod enums;
mod error;
mod exception;
mod namespace;
mod native_fn;
mod object_registry;
mod pinned;
mod proxy;
mod register;
mod variant;

pub use call_context::{CallContext, assert_nil_error};
pub use config::{BridgeConfig, DEFAULT_ROOT_NAMESPACE, config, init_state};
pub use deprecation::{ApiKind, DeprecationInfo, DeprecationKind, deprecations, mark_deprecated};
pub use enums::ScriptEnum;
pub use error::{BridgeError, LuaResultExt};
pub use exception::{CallPhase, catch_native, catch_native_finally, raise};
pub use namespace::{
    ModuleOpener, convert_object, get_function, get_root, insist, insist_global, insist_root,
    preload, require,
};
pub use native_fn::{FunctionReg, NativeCallable, NativeFn, call_function, wrap_function};
pub use object_registry::{live_proxy_count, push_existing, push_new, push_object, release_proxy};
pub use pinned::{Reference, insist_pinned_thread, pinned_thread};
pub use proxy::Proxy;
pub use register::{
    TypeOpener, WrappedModule, get_module, opt_module, register_module, register_type,
};
pub use variant::{push_variant, script_type_name, value_to_variant};
