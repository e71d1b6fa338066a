//! Namespace tables and cross-module lookups.
//!
//! Every module installs itself as `<root>.<name>`, where the root table name
//! comes from the state's [`BridgeConfig`](crate::BridgeConfig).

use mlua::{Function, Lua, Table, Value};

use lunabridge_core::NativeResult;

use crate::call_context::assert_nil_error;
use crate::config::config;
use crate::error::LuaResultExt;
use crate::native_fn::call_function;

/// Opener run by `require` for a preloaded module.
pub type ModuleOpener = fn(&Lua) -> mlua::Result<Table>;

/// `table[key]` as a table, creating it if absent.
pub fn insist(lua: &Lua, table: &Table, key: &str) -> mlua::Result<Table> {
    if let Value::Table(existing) = table.get::<Value>(key)? {
        return Ok(existing);
    }
    let fresh = lua.create_table()?;
    table.set(key, fresh.clone())?;
    Ok(fresh)
}

/// Global `key` as a table, creating it if absent.
pub fn insist_global(lua: &Lua, key: &str) -> mlua::Result<Table> {
    insist(lua, &lua.globals(), key)
}

/// The root namespace table, creating it if absent.
pub fn insist_root(lua: &Lua) -> mlua::Result<Table> {
    insist_global(lua, &config(lua).root_namespace)
}

/// The root namespace table, if it exists.
pub fn get_root(lua: &Lua) -> mlua::Result<Option<Table>> {
    match lua.globals().get::<Value>(config(lua).root_namespace)? {
        Value::Table(root) => Ok(Some(root)),
        _ => Ok(None),
    }
}

/// `<root>.<module>.<function>`.
pub fn get_function(lua: &Lua, module: &str, function: &str) -> mlua::Result<Function> {
    let found = match get_root(lua)? {
        Some(root) => match root.get::<Value>(module)? {
            Value::Table(namespace) => match namespace.get::<Value>(function)? {
                Value::Function(f) => Some(f),
                _ => None,
            },
            _ => None,
        },
        None => None,
    };
    found.ok_or_else(|| {
        mlua::Error::RuntimeError(format!(
            "Could not find function {}.{module}.{function}",
            config(lua).root_namespace
        ))
    })
}

/// Make `require(name)` run `opener`.
pub fn preload(lua: &Lua, name: &str, opener: ModuleOpener) -> mlua::Result<()> {
    let package: Table = lua.globals().get("package")?;
    let preload: Table = package.get("preload")?;
    let loader = lua.create_function(move |lua, _: mlua::MultiValue| opener(lua))?;
    preload.set(name, loader)
}

/// Call the script-level `require`.
pub fn require(lua: &Lua, name: &str) -> mlua::Result<Value> {
    let require: Function = lua.globals().get("require")?;
    require.call::<Value>(name)
}

/// Coerce `args` through `<root>.<module>.<function>`.
///
/// Used where a native function accepts either an object or what its
/// constructor accepts, such as a string where `ByteData` is expected. A nil
/// first result fails with the function's error message.
pub fn convert_object(
    lua: &Lua,
    args: Vec<Value>,
    module: &str,
    function: &str,
) -> NativeResult<Value> {
    let f = get_function(lua, module, function).into_native()?;
    let results = call_function(&f, args).into_native()?;
    assert_nil_error(&results, 1)?;
    Ok(results.into_iter().next().unwrap_or(Value::Nil))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insist_reuses_existing_table() {
        let lua = Lua::new();
        let a = insist_global(&lua, "luna").unwrap();
        a.set("marker", 1).unwrap();
        let b = insist_root(&lua).unwrap();
        assert_eq!(b.get::<i64>("marker").unwrap(), 1);
    }

    #[test]
    fn get_root_is_none_before_creation() {
        let lua = Lua::new();
        assert!(get_root(&lua).unwrap().is_none());
        insist_root(&lua).unwrap();
        assert!(get_root(&lua).unwrap().is_some());
    }

    #[test]
    fn missing_function_names_full_path() {
        let lua = Lua::new();
        let err = get_function(&lua, "data", "newByteData").unwrap_err();
        assert!(
            err.to_string()
                .contains("Could not find function luna.data.newByteData")
        );
    }

    #[test]
    fn convert_object_reports_nil_error() {
        let lua = Lua::new();
        lua.load("luna = { fs = { open = function(p) if p == 'ok' then return 1 end return nil, 'no such file' end } }")
            .exec()
            .unwrap();

        let ok = convert_object(&lua, vec![Value::String(lua.create_string("ok").unwrap())], "fs", "open")
            .unwrap();
        assert_eq!(ok, Value::Integer(1));

        let err = convert_object(&lua, vec![Value::Nil], "fs", "open").unwrap_err();
        assert_eq!(err.to_string(), "no such file");
    }

    #[test]
    fn preload_feeds_require() {
        let lua = Lua::new();
        preload(&lua, "luna.answer", |lua| {
            let t = lua.create_table()?;
            t.set("value", 42)?;
            Ok(t)
        })
        .unwrap();
        let module = require(&lua, "luna.answer").unwrap();
        let Value::Table(module) = module else {
            panic!("require did not return a table");
        };
        assert_eq!(module.get::<i64>("value").unwrap(), 42);
    }
}
