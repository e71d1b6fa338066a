//! Lua scripting bridge for a 2D game framework.
//!
//! Native engine objects cross into Lua as typed proxies; module singletons
//! are shared by every state that opens them. The work is split across:
//!
//! - [`lunabridge_core`] - type descriptors, reference-counted objects,
//!   modules, variants and errors
//! - [`lunabridge_registry`] - process-wide type and module registries
//! - [`lunabridge_runtime`] - proxies, marshaling, the exception bridge and
//!   registration against an `mlua` state
//! - [`lunabridge_modules`] - the `data`, `event` and `thread` subsystems
//!
//! # Example
//!
//! ```
//! let lua = lunabridge::new_state().unwrap();
//! let n: i64 = lua
//!     .load("local c = luna.thread.newChannel() c:push(7) return c:pop()")
//!     .eval()
//!     .unwrap();
//! assert_eq!(n, 7);
//! ```

use mlua::Lua;
use tracing::debug;

pub use lunabridge_core;
pub use lunabridge_modules;
pub use lunabridge_registry;
pub use lunabridge_runtime;

pub mod prelude {
    pub use lunabridge_core::{
        ConversionError, MODULE_TYPE, Module, ModuleKind, NativeError, NativeResult, OBJECT_TYPE,
        Object, RegistrationError, StaticType, StrongRef, Type, Variant, WeakRef, impl_object,
    };
    pub use lunabridge_runtime::{
        BridgeConfig, BridgeError, CallContext, FunctionReg, NativeFn, ScriptEnum, TypeOpener,
        WrappedModule, get_module, init_state, push_object, register_module, register_type,
    };

    pub use crate::{new_state, new_state_with};
}

/// A state with the default configuration and every module opened.
pub fn new_state() -> mlua::Result<Lua> {
    new_state_with(lunabridge_runtime::BridgeConfig::default())
}

/// A state with `config` and every module opened.
pub fn new_state_with(config: lunabridge_runtime::BridgeConfig) -> mlua::Result<Lua> {
    let lua = Lua::new();
    lunabridge_runtime::init_state(&lua, config)?;
    lunabridge_modules::open_all(&lua)?;
    debug!(target: "lunabridge::state", "state ready");
    Ok(lua)
}
