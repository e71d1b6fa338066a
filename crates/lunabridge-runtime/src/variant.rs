//! Conversion between Lua values and [`Variant`]s.

use std::ffi::c_void;
use std::sync::Arc;

use mlua::{LightUserData, Lua, Value};
use rustc_hash::FxHashSet;

use lunabridge_core::{ConversionError, Variant};

use crate::object_registry::push_existing;
use crate::proxy::Proxy;

/// Convert a Lua value into a [`Variant`].
///
/// `seen` holds the tables currently being converted; a table reached again
/// while it is still being converted fails with
/// [`ConversionError::RecursiveTable`]. A table shared by two branches is
/// converted twice. Proxies are retained into the variant when
/// `allow_userdata` is set and rejected otherwise.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn value_to_variant(
    value: &Value,
    allow_userdata: bool,
    seen: &mut FxHashSet<usize>,
) -> Result<Variant, ConversionError> {
    match value {
        Value::Nil => Ok(Variant::Nil),
        Value::Boolean(b) => Ok(Variant::Boolean(*b)),
        Value::Integer(i) => Ok(Variant::Number(*i as f64)),
        Value::Number(n) => Ok(Variant::Number(*n)),
        Value::String(s) => Ok(Variant::String(s.as_bytes().to_vec())),
        Value::LightUserData(p) => Ok(Variant::LightUserData(p.0 as usize)),
        Value::UserData(ud) => {
            if !allow_userdata {
                return Err(ConversionError::UserdataNotAllowed);
            }
            let proxy = ud
                .borrow::<Proxy>()
                .map_err(|_| ConversionError::Unsupported {
                    type_name: "userdata".into(),
                })?;
            let object = proxy
                .object()
                .ok_or_else(|| ConversionError::Unsupported {
                    type_name: "released object".into(),
                })?;
            Ok(Variant::Object(object.retain()))
        }
        Value::Table(table) => {
            let id = value.to_pointer() as usize;
            if !seen.insert(id) {
                return Err(ConversionError::RecursiveTable);
            }
            let mut pairs = Vec::new();
            for pair in table.clone().pairs::<Value, Value>() {
                let (k, v) = pair.map_err(|_| ConversionError::Unsupported {
                    type_name: "table".into(),
                })?;
                let key = value_to_variant(&k, allow_userdata, seen)?;
                let val = value_to_variant(&v, allow_userdata, seen)?;
                pairs.push((key, val));
            }
            seen.remove(&id);
            Ok(Variant::Table(Arc::new(pairs)))
        }
        other => Err(ConversionError::Unsupported {
            type_name: script_type_name(other).to_string(),
        }),
    }
}

/// The name Lua's own `type()` gives `value`; mlua splits numbers into
/// "integer" and "number".
pub fn script_type_name(value: &Value) -> &'static str {
    match value {
        Value::Integer(_) | Value::Number(_) => "number",
        other => other.type_name(),
    }
}

/// Convert a [`Variant`] back into a Lua value.
///
/// Objects go through the identity cache, so an object round-trips to the
/// proxy already used for it in this state.
pub fn push_variant(lua: &Lua, variant: &Variant) -> mlua::Result<Value> {
    Ok(match variant {
        Variant::Nil => Value::Nil,
        Variant::Boolean(b) => Value::Boolean(*b),
        Variant::Number(n) => number_value(*n),
        Variant::String(s) => Value::String(lua.create_string(s)?),
        Variant::LightUserData(p) => Value::LightUserData(LightUserData(*p as *mut c_void)),
        Variant::Object(object) => {
            Value::UserData(push_existing(lua, object.type_info(), object)?)
        }
        Variant::Table(pairs) => {
            let table = lua.create_table_with_capacity(0, pairs.len())?;
            for (k, v) in pairs.iter() {
                table.raw_set(push_variant(lua, k)?, push_variant(lua, v)?)?;
            }
            Value::Table(table)
        }
    })
}

/// Integral numbers go back as Lua integers, so table keys stay integers.
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Value::Integer(n as i64)
    } else {
        Value::Number(n)
    }
}
