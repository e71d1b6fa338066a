//! Module and type registration.
//!
//! Each state keeps two tables in the Lua registry:
//!
//! - `lunabridge.types` maps a type name to its method table. Method lookup on
//!   a proxy walks the object's type chain through these tables, so a
//!   `ByteData` proxy finds methods installed for `Data` and `Object`.
//! - `lunabridge.modules` maps a module type name to the proxy holding the
//!   state's reference to the module singleton.
//!
//! Descriptors and module instances are also recorded in the process-wide
//! registries, so other modules and other states can find them.

use mlua::{AnyUserData, Lua, Table, Value};
use tracing::{debug, info};

use lunabridge_core::{
    Module, NativeError, NativeResult, OBJECT_TYPE, RegistrationError, StaticType, StrongRef,
    Type,
};
use lunabridge_registry::{modules, types};

use crate::call_context::CallContext;
use crate::error::LuaResultExt;
use crate::exception::raise;
use crate::namespace::{insist, insist_root};
use crate::native_fn::{FunctionReg, wrap_function};
use crate::object_registry::{push_new, release_proxy};
use crate::proxy::Proxy;

const TYPES_KEY: &str = "lunabridge.types";
const MODULES_KEY: &str = "lunabridge.modules";

/// Callback registering one type and its methods in a state.
pub type TypeOpener = fn(&Lua) -> mlua::Result<()>;

/// Everything needed to expose one module.
pub struct WrappedModule<M: Module> {
    /// The caller's reference to the singleton; registration consumes it.
    pub module: StrongRef<M>,
    /// Namespace name under the root table.
    pub name: &'static str,
    /// Descriptor of the module type.
    pub ty: &'static Type,
    /// Free functions installed in the namespace.
    pub functions: Vec<FunctionReg>,
    /// Openers for the types the module exposes.
    pub types: &'static [TypeOpener],
}

fn registration_error(err: RegistrationError) -> mlua::Error {
    raise(err.into())
}

fn register_descriptor(ty: &'static Type) -> mlua::Result<()> {
    lunabridge_registry::write(types())
        .register(ty)
        .map_err(registration_error)
}

/// The state's method tables, created with the `Object` base methods.
pub(crate) fn types_table(lua: &Lua) -> mlua::Result<Table> {
    if let Some(table) = lua.named_registry_value::<Option<Table>>(TYPES_KEY)? {
        return Ok(table);
    }
    let table = lua.create_table()?;
    lua.set_named_registry_value(TYPES_KEY, table.clone())?;

    register_descriptor(&OBJECT_TYPE)?;
    let base = lua.create_table()?;
    for reg in object_methods() {
        base.raw_set(reg.name, wrap_function(lua, reg.name, reg.func)?)?;
    }
    table.raw_set(OBJECT_TYPE.name(), base)?;
    Ok(table)
}

fn modules_table(lua: &Lua) -> mlua::Result<Table> {
    if let Some(table) = lua.named_registry_value::<Option<Table>>(MODULES_KEY)? {
        return Ok(table);
    }
    let table = lua.create_table()?;
    lua.set_named_registry_value(MODULES_KEY, table.clone())?;
    Ok(table)
}

/// Register `ty` and install `methods` into its method table.
///
/// Methods are merged into an existing table, so a type can be opened by
/// several modules.
pub fn register_type(lua: &Lua, ty: &'static Type, methods: Vec<FunctionReg>) -> mlua::Result<()> {
    register_descriptor(ty)?;
    let types = types_table(lua)?;
    let table = match types.raw_get::<Option<Table>>(ty.name())? {
        Some(table) => table,
        None => {
            let table = lua.create_table()?;
            types.raw_set(ty.name(), table.clone())?;
            table
        }
    };
    let count = methods.len();
    for reg in methods {
        table.raw_set(reg.name, wrap_function(lua, reg.name, reg.func)?)?;
    }
    debug!(target: "lunabridge::registry", ty = ty.name(), methods = count, "opened type");
    Ok(())
}

/// Resolve `key` on a proxy of type `ty`.
///
/// A released proxy (`ty` is `None`) only resolves the `Object` base
/// methods; any other key fails as use after release.
pub(crate) fn lookup_method(lua: &Lua, ty: Option<&'static Type>, key: &Value) -> mlua::Result<Value> {
    let types = types_table(lua)?;
    for link in ty.unwrap_or(&OBJECT_TYPE).ancestors() {
        if let Some(methods) = types.raw_get::<Option<Table>>(link.name())? {
            let found: Value = methods.raw_get(key.clone())?;
            if !found.is_nil() {
                return Ok(found);
            }
        }
    }
    match ty {
        Some(_) => Ok(Value::Nil),
        None => Err(raise(NativeError::Released)),
    }
}

/// Expose a module in a state.
///
/// Registers the module type and instance, keeps the caller's reference in
/// the state's module table, creates or reuses `<root>.<name>`, installs the
/// functions and runs the type openers. Returns the namespace table.
pub fn register_module<M: Module>(lua: &Lua, wrapped: WrappedModule<M>) -> mlua::Result<Table> {
    let WrappedModule {
        module,
        name,
        ty,
        functions,
        types,
    } = wrapped;
    debug_assert!(module.type_info().is_a(ty));

    types_table(lua)?;
    register_descriptor(ty)?;
    lunabridge_registry::write(modules())
        .register_instance(&module)
        .map_err(registration_error)?;

    let kind = module.kind();
    let implementation = module.name();
    let proxy = push_new(lua, ty, module.into_object())?;
    modules_table(lua)?.raw_set(ty.name(), proxy)?;

    let namespace = insist(lua, &insist_root(lua)?, name)?;
    for reg in functions {
        namespace.set(reg.name, wrap_function(lua, reg.name, reg.func)?)?;
    }
    for opener in types {
        opener(lua)?;
    }

    info!(
        target: "lunabridge::module",
        module = name,
        implementation,
        kind = %kind,
        "registered module"
    );
    Ok(namespace)
}

/// The state's instance of module `T` (+1).
pub fn get_module<T: Module + StaticType>(lua: &Lua) -> NativeResult<StrongRef<T>> {
    let ty = T::static_type();
    let entry = modules_table(lua)
        .into_native()?
        .raw_get::<Option<AnyUserData>>(ty.name())
        .into_native()?;
    let Some(userdata) = entry else {
        return Err(NativeError::MissingModule(ty.name().to_string()));
    };

    let proxy = userdata.borrow::<Proxy>().into_native()?;
    let object = proxy.live()?.1.retain();
    drop(proxy);

    object
        .downcast::<T>()
        .ok_or_else(|| NativeError::IncorrectModule(ty.name().to_string()))
}

/// The state's instance of module `T` (+1), if it was opened.
pub fn opt_module<T: Module + StaticType>(lua: &Lua) -> Option<StrongRef<T>> {
    get_module::<T>(lua).ok()
}

// ============================================================================
// Object base methods
// ============================================================================

fn object_methods() -> Vec<FunctionReg> {
    vec![
        FunctionReg::new("type", object_type),
        FunctionReg::new("typeOf", object_type_of),
        FunctionReg::new("release", object_release),
    ]
}

fn self_proxy(ctx: &CallContext<'_>) -> NativeResult<AnyUserData> {
    match ctx.arg(1) {
        Value::UserData(ud) if ud.is::<Proxy>() => Ok(ud),
        _ => Err(ctx.type_error(1, OBJECT_TYPE.name())),
    }
}

fn object_type(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    let ud = self_proxy(ctx)?;
    let name = ud
        .borrow::<Proxy>()
        .into_native()?
        .type_info()
        .map_or(OBJECT_TYPE.name(), Type::name);
    ctx.push_string(name)?;
    Ok(1)
}

fn object_type_of(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    self_proxy(ctx)?;
    let name = ctx.check_string(2)?;
    let target = lunabridge_registry::read(types()).by_name(&name);
    let is = match (ctx.type_of(1), target) {
        (Some(ty), Some(target)) => ty.is_a(target),
        _ => false,
    };
    ctx.push_boolean(is);
    Ok(1)
}

fn object_release(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    let ud = self_proxy(ctx)?;
    let released = release_proxy(ctx.lua(), &ud).into_native()?;
    ctx.push_boolean(released);
    Ok(1)
}
