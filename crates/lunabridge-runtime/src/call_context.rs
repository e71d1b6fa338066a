//! Call context bridging Lua and native Rust functions.
//!
//! [`CallContext`] gives a native function its arguments and collects the
//! values it returns. Argument indices are 1-based, matching what scripts see
//! in error messages.
//!
//! ## Argument Access
//!
//! Accessors come in families:
//!
//! - `check_*` fails with an argument error on a type mismatch
//! - `opt_*` returns a default for a missing or nil argument
//! - `to_*` never fails and falls back to a neutral value
//! - `*_clamped` saturates numbers into a range instead of failing
//!
//! ```ignore
//! let volume = ctx.opt_number_clamped01(2, 1.0)?;
//! let source = ctx.check_type::<Source>(1)?;
//! ```
//!
//! ## Results
//!
//! `push_*` appends a value. The function returns how many of the most
//! recently pushed values are its results.

use mlua::{Function, IntoLua, Lua, Table, Value};
use rustc_hash::FxHashSet;

use lunabridge_core::{
    ConversionError, NativeError, NativeResult, Object, StaticType, StrongRef, Type, Variant,
};

use crate::enums::ScriptEnum;
use crate::error::LuaResultExt;
use crate::object_registry::{push_existing, push_new, push_object};
use crate::proxy::Proxy;
use crate::variant::{push_variant, script_type_name, value_to_variant};

/// Context for one native function call.
pub struct CallContext<'lua> {
    lua: &'lua Lua,
    function: &'static str,
    args: Vec<Value>,
    results: Vec<Value>,
}

impl<'lua> CallContext<'lua> {
    /// Create a context for a call to `function` with `args`.
    pub fn new(lua: &'lua Lua, function: &'static str, args: Vec<Value>) -> Self {
        Self {
            lua,
            function,
            args,
            results: Vec::new(),
        }
    }

    /// The calling state.
    pub fn lua(&self) -> &'lua Lua {
        self.lua
    }

    /// Name the function was registered under.
    pub fn function_name(&self) -> &'static str {
        self.function
    }

    // ========================================================================
    // Arguments
    // ========================================================================

    /// Number of arguments passed.
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// Argument `idx`, or nil past the end.
    pub fn arg(&self, idx: usize) -> Value {
        idx.checked_sub(1)
            .and_then(|i| self.args.get(i))
            .cloned()
            .unwrap_or(Value::Nil)
    }

    /// All arguments.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Whether argument `idx` is absent or nil.
    pub fn is_none_or_nil(&self, idx: usize) -> bool {
        self.arg(idx).is_nil()
    }

    /// Require between `min` and `max` arguments.
    pub fn assert_argc(&self, min: usize, max: Option<usize>) -> NativeResult<()> {
        let got = self.arg_count();
        if got < min {
            return Err(NativeError::ArgumentCount {
                message: format!(
                    "Incorrect number of arguments. Got [{got}], expected at least [{min}]"
                ),
            });
        }
        if let Some(max) = max {
            if got > max {
                return Err(NativeError::ArgumentCount {
                    message: format!(
                        "Incorrect number of arguments. Got [{got}], expected at most [{max}]"
                    ),
                });
            }
        }
        Ok(())
    }

    /// Argument error for `idx` carrying `source`.
    pub fn arg_error(&self, idx: usize, source: ConversionError) -> NativeError {
        NativeError::Argument {
            index: idx,
            function: self.function.to_string(),
            source,
        }
    }

    /// Type mismatch error for `idx`, naming what was found there.
    pub fn type_error(&self, idx: usize, expected: &str) -> NativeError {
        NativeError::type_error(idx, self.function, expected, self.describe(idx))
    }

    /// Script-facing description of argument `idx`'s type.
    fn describe(&self, idx: usize) -> String {
        if idx == 0 || idx > self.arg_count() {
            return "no value".to_string();
        }
        let value = self.arg(idx);
        if let Value::UserData(ud) = &value {
            let name = match ud.borrow::<Proxy>() {
                Ok(proxy) => proxy.type_info().map_or("released object", Type::name),
                Err(_) => "userdata",
            };
            return name.to_string();
        }
        script_type_name(&value).to_string()
    }

    // ========================================================================
    // Booleans
    // ========================================================================

    /// Truthiness of argument `idx`: only nil and false are false.
    pub fn to_boolean(&self, idx: usize) -> bool {
        !matches!(self.arg(idx), Value::Nil | Value::Boolean(false))
    }

    pub fn check_boolean(&self, idx: usize) -> NativeResult<bool> {
        match self.arg(idx) {
            Value::Boolean(b) => Ok(b),
            _ => Err(self.type_error(idx, "boolean")),
        }
    }

    /// Argument `idx` if it is a boolean, otherwise `default`.
    pub fn opt_boolean(&self, idx: usize, default: bool) -> bool {
        match self.arg(idx) {
            Value::Boolean(b) => b,
            _ => default,
        }
    }

    // ========================================================================
    // Numbers
    // ========================================================================

    /// Numeric value of `value`, coercing numeric strings as Lua does.
    fn number_of(&self, value: &Value) -> Option<f64> {
        match value {
            Value::Integer(i) => Some(*i as f64),
            Value::Number(n) => Some(*n),
            Value::String(_) => self.lua.coerce_number(value.clone()).ok().flatten(),
            _ => None,
        }
    }

    pub fn check_number(&self, idx: usize) -> NativeResult<f64> {
        self.number_of(&self.arg(idx))
            .ok_or_else(|| self.type_error(idx, "number"))
    }

    pub fn opt_number(&self, idx: usize, default: f64) -> NativeResult<f64> {
        if self.is_none_or_nil(idx) {
            Ok(default)
        } else {
            self.check_number(idx)
        }
    }

    /// Argument `idx` as a number, or 0 if it is not one.
    pub fn to_number(&self, idx: usize) -> f64 {
        self.number_of(&self.arg(idx)).unwrap_or(0.0)
    }

    pub fn check_float(&self, idx: usize) -> NativeResult<f32> {
        self.check_number(idx).map(|n| n as f32)
    }

    pub fn opt_float(&self, idx: usize, default: f32) -> NativeResult<f32> {
        self.opt_number(idx, default as f64).map(|n| n as f32)
    }

    pub fn to_float(&self, idx: usize) -> f32 {
        self.to_number(idx) as f32
    }

    /// Argument `idx` truncated toward zero, saturating at the `i32` range.
    pub fn check_int(&self, idx: usize) -> NativeResult<i32> {
        self.check_number(idx).map(|n| n as i32)
    }

    pub fn opt_int(&self, idx: usize, default: i32) -> NativeResult<i32> {
        if self.is_none_or_nil(idx) {
            Ok(default)
        } else {
            self.check_int(idx)
        }
    }

    pub fn to_int(&self, idx: usize) -> i32 {
        self.to_number(idx) as i32
    }

    /// Argument `idx` truncated toward zero, saturating at the `i64` range.
    pub fn check_i64(&self, idx: usize) -> NativeResult<i64> {
        match self.arg(idx) {
            Value::Integer(i) => Ok(i),
            _ => self.check_number(idx).map(|n| n as i64),
        }
    }

    /// Argument `idx` as a size; negative and non-finite values are an error.
    pub fn check_size(&self, idx: usize) -> NativeResult<usize> {
        let n = self.check_number(idx)?;
        if n < 0.0 || !n.is_finite() {
            return Err(self.arg_error(
                idx,
                ConversionError::NumberRange {
                    value: n,
                    target_type: "size",
                },
            ));
        }
        Ok(n as usize)
    }

    /// Argument `idx` saturated into `[min, max]`.
    pub fn check_number_clamped(&self, idx: usize, min: f64, max: f64) -> NativeResult<f64> {
        self.check_number(idx).map(|n| clamp(n, min, max))
    }

    pub fn opt_number_clamped(
        &self,
        idx: usize,
        min: f64,
        max: f64,
        default: f64,
    ) -> NativeResult<f64> {
        self.opt_number(idx, default).map(|n| clamp(n, min, max))
    }

    pub fn check_number_clamped01(&self, idx: usize) -> NativeResult<f64> {
        self.check_number_clamped(idx, 0.0, 1.0)
    }

    pub fn opt_number_clamped01(&self, idx: usize, default: f64) -> NativeResult<f64> {
        self.opt_number_clamped(idx, 0.0, 1.0, default)
    }

    // ========================================================================
    // Strings
    // ========================================================================

    /// Argument `idx` as a UTF-8 string; numbers are formatted as Lua does.
    pub fn check_string(&self, idx: usize) -> NativeResult<String> {
        let value = self.arg(idx);
        let s = match &value {
            Value::String(s) => s.clone(),
            Value::Integer(_) | Value::Number(_) => self
                .lua
                .coerce_string(value.clone())
                .into_native()?
                .ok_or_else(|| self.type_error(idx, "string"))?,
            _ => return Err(self.type_error(idx, "string")),
        };
        let text = s
            .to_str()
            .map_err(|_| self.arg_error(idx, ConversionError::InvalidUtf8))?;
        Ok(text.to_string())
    }

    pub fn opt_string(&self, idx: usize, default: &str) -> NativeResult<String> {
        if self.is_none_or_nil(idx) {
            Ok(default.to_string())
        } else {
            self.check_string(idx)
        }
    }

    /// Argument `idx` as raw bytes; Lua strings may hold any byte.
    pub fn check_bytes(&self, idx: usize) -> NativeResult<Vec<u8>> {
        match self.arg(idx) {
            Value::String(s) => Ok(s.as_bytes().to_vec()),
            Value::Integer(_) | Value::Number(_) => self.check_string(idx).map(String::into_bytes),
            _ => Err(self.type_error(idx, "string")),
        }
    }

    /// Argument `idx` as a string with invalid UTF-8 replaced, if it is one.
    pub fn to_string_lossy(&self, idx: usize) -> Option<String> {
        match self.arg(idx) {
            Value::String(s) => Some(s.to_string_lossy().to_string()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    // ========================================================================
    // Objects
    // ========================================================================

    /// Object of argument `idx` (+1), which must derive from `ty`.
    ///
    /// Fails with a type error for non-proxies and unrelated types and with
    /// [`NativeError::Released`] for released proxies.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn check_object(&self, idx: usize, ty: &'static Type) -> NativeResult<StrongRef<dyn Object>> {
        let value = self.arg(idx);
        let Value::UserData(ud) = &value else {
            return Err(self.type_error(idx, ty.name()));
        };
        let proxy = ud
            .borrow::<Proxy>()
            .map_err(|_| self.type_error(idx, ty.name()))?;
        let (actual, object) = proxy.live()?;
        if !actual.is_a(ty) {
            return Err(self.type_error(idx, ty.name()));
        }
        Ok(object.retain())
    }

    /// Object of argument `idx` as a `T` (+1).
    pub fn check_type<T: Object + StaticType>(&self, idx: usize) -> NativeResult<StrongRef<T>> {
        self.check_object(idx, T::static_type())?
            .downcast::<T>()
            .ok_or_else(|| self.type_error(idx, T::static_type().name()))
    }

    /// Object of argument `idx` as a `T`, or `None` for anything else,
    /// including released proxies.
    pub fn to_type<T: Object + StaticType>(&self, idx: usize) -> Option<StrongRef<T>> {
        self.check_type::<T>(idx).ok()
    }

    /// Whether argument `idx` is a live proxy deriving from `ty`.
    pub fn is_type(&self, idx: usize, ty: &Type) -> bool {
        self.type_of(idx).is_some_and(|actual| actual.is_a(ty))
    }

    /// Type of the live proxy at argument `idx`.
    pub fn type_of(&self, idx: usize) -> Option<&'static Type> {
        let value = self.arg(idx);
        let Value::UserData(ud) = &value else {
            return None;
        };
        let ty = ud.borrow::<Proxy>().ok()?.type_info();
        ty
    }

    // ========================================================================
    // Enums
    // ========================================================================

    pub fn check_enum<E: ScriptEnum>(&self, idx: usize) -> NativeResult<E> {
        let name = self.check_string(idx)?;
        E::from_name(&name).ok_or_else(|| NativeError::InvalidEnum {
            enum_name: E::NAME,
            value: name,
            options: E::names(),
        })
    }

    pub fn opt_enum<E: ScriptEnum>(&self, idx: usize, default: E) -> NativeResult<E> {
        if self.is_none_or_nil(idx) {
            Ok(default)
        } else {
            self.check_enum(idx)
        }
    }

    // ========================================================================
    // Table flags
    // ========================================================================

    /// Field `key` of the table at `idx`; a missing table reads as empty.
    fn flag_field(&self, idx: usize, key: &str) -> NativeResult<Value> {
        match self.arg(idx) {
            Value::Table(table) => table.get::<Value>(key).into_native(),
            Value::Nil => Ok(Value::Nil),
            _ => Err(self.type_error(idx, "table")),
        }
    }

    pub fn bool_flag(&self, idx: usize, key: &str, default: bool) -> NativeResult<bool> {
        Ok(match self.flag_field(idx, key)? {
            Value::Nil => default,
            Value::Boolean(b) => b,
            _ => true,
        })
    }

    pub fn int_flag(&self, idx: usize, key: &str, default: i32) -> NativeResult<i32> {
        let field = self.flag_field(idx, key)?;
        Ok(self.number_of(&field).map_or(default, |n| n as i32))
    }

    pub fn number_flag(&self, idx: usize, key: &str, default: f64) -> NativeResult<f64> {
        let field = self.flag_field(idx, key)?;
        Ok(self.number_of(&field).unwrap_or(default))
    }

    pub fn check_bool_flag(&self, idx: usize, key: &str) -> NativeResult<bool> {
        match self.flag_field(idx, key)? {
            Value::Boolean(b) => Ok(b),
            _ => Err(NativeError::runtime(format!(
                "Expected boolean field '{key}' in table"
            ))),
        }
    }

    pub fn check_int_flag(&self, idx: usize, key: &str) -> NativeResult<i32> {
        let field = self.flag_field(idx, key)?;
        self.number_of(&field)
            .map(|n| n as i32)
            .ok_or_else(|| NativeError::runtime(format!("Expected integer field '{key}' in table")))
    }

    /// Require every key of the table at `idx` to be a name of `E`.
    pub fn check_table_fields<E: ScriptEnum>(&self, idx: usize) -> NativeResult<()> {
        let table = self.check_table(idx)?;
        for pair in table.pairs::<Value, Value>() {
            let (key, _) = pair.into_native()?;
            let Value::String(name) = key else {
                return Err(self.type_error(idx, "table with string keys"));
            };
            let name = name.to_string_lossy().to_string();
            if E::from_name(&name).is_none() {
                return Err(NativeError::InvalidEnum {
                    enum_name: E::NAME,
                    value: name,
                    options: E::names(),
                });
            }
        }
        Ok(())
    }

    // ========================================================================
    // Tables, functions and other values
    // ========================================================================

    pub fn check_table(&self, idx: usize) -> NativeResult<Table> {
        match self.arg(idx) {
            Value::Table(table) => Ok(table),
            _ => Err(self.type_error(idx, "table")),
        }
    }

    pub fn assert_function(&self, idx: usize) -> NativeResult<Function> {
        match self.arg(idx) {
            Value::Function(f) => Ok(f),
            _ => Err(self.type_error(idx, "function")),
        }
    }

    /// Fail if argument `idx` is nil, with the message at `idx + 1`.
    ///
    /// Matches the `value, err = f()` convention of Lua functions.
    pub fn assert_nil_error(&self, idx: usize) -> NativeResult<()> {
        assert_nil_error(&self.args, idx)
    }

    /// Raw length of argument `idx`: bytes of a string, border of a table.
    pub fn obj_len(&self, idx: usize) -> usize {
        match self.arg(idx) {
            Value::String(s) => s.as_bytes().len(),
            Value::Table(t) => t.raw_len(),
            _ => 0,
        }
    }

    /// Argument `idx` as a [`Variant`].
    pub fn check_variant(&self, idx: usize, allow_userdata: bool) -> NativeResult<Variant> {
        let mut seen = FxHashSet::default();
        value_to_variant(&self.arg(idx), allow_userdata, &mut seen)
            .map_err(|err| self.arg_error(idx, err))
    }

    // ========================================================================
    // Results
    // ========================================================================

    pub fn push_value(&mut self, value: Value) {
        self.results.push(value);
    }

    /// Push anything mlua can convert.
    pub fn push(&mut self, value: impl IntoLua) -> NativeResult<()> {
        let value = value.into_lua(self.lua).into_native()?;
        self.results.push(value);
        Ok(())
    }

    pub fn push_nil(&mut self) {
        self.results.push(Value::Nil);
    }

    pub fn push_boolean(&mut self, b: bool) {
        self.results.push(Value::Boolean(b));
    }

    pub fn push_number(&mut self, n: f64) {
        self.results.push(Value::Number(n));
    }

    pub fn push_int(&mut self, i: i64) {
        self.results.push(Value::Integer(i));
    }

    pub fn push_string(&mut self, s: &str) -> NativeResult<()> {
        self.push_bytes(s.as_bytes())
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) -> NativeResult<()> {
        let s = self.lua.create_string(bytes).into_native()?;
        self.results.push(Value::String(s));
        Ok(())
    }

    /// Push `object` through the state's identity cache.
    pub fn push_object<T: Object>(&mut self, object: &StrongRef<T>) -> NativeResult<()> {
        let ud = push_object(self.lua, object).into_native()?;
        self.results.push(Value::UserData(ud));
        Ok(())
    }

    /// Push an erased object as `ty` through the identity cache.
    pub fn push_existing(&mut self, ty: &'static Type, object: &StrongRef<dyn Object>) -> NativeResult<()> {
        let ud = push_existing(self.lua, ty, object).into_native()?;
        self.results.push(Value::UserData(ud));
        Ok(())
    }

    /// Push a fresh proxy owning `object`, bypassing the identity cache.
    pub fn push_new<T: Object>(&mut self, object: StrongRef<T>) -> NativeResult<()> {
        let ty = object.type_info();
        let ud = push_new(self.lua, ty, object.into_object()).into_native()?;
        self.results.push(Value::UserData(ud));
        Ok(())
    }

    pub fn push_variant(&mut self, variant: &Variant) -> NativeResult<()> {
        let value = push_variant(self.lua, variant).into_native()?;
        self.results.push(value);
        Ok(())
    }

    pub fn push_enum<E: ScriptEnum>(&mut self, value: E) -> NativeResult<()> {
        self.push_string(value.to_name())
    }

    /// The last `count` pushed values, in push order.
    pub fn take_results(&mut self, count: usize) -> Vec<Value> {
        let start = self.results.len().saturating_sub(count);
        self.results.split_off(start)
    }
}

/// Fail if `values[idx]` (1-based) is nil, using the message after it.
pub fn assert_nil_error(values: &[Value], idx: usize) -> NativeResult<()> {
    let at = |i: usize| {
        i.checked_sub(1)
            .and_then(|i| values.get(i))
            .cloned()
            .unwrap_or(Value::Nil)
    };
    if !at(idx).is_nil() {
        return Ok(());
    }
    match at(idx + 1) {
        Value::String(s) => Err(NativeError::runtime(s.to_string_lossy().to_string())),
        _ => Err(NativeError::runtime("assertion failed!")),
    }
}

fn clamp(n: f64, min: f64, max: f64) -> f64 {
    n.max(min).min(max)
}

#[cfg(test)]
mod tests {
    use lunabridge_core::{OBJECT_TYPE, impl_object};

    use super::*;
    use crate::object_registry::release_proxy;

    static SHAPE: Type = Type::new("Shape", Some(&OBJECT_TYPE));
    static CIRCLE: Type = Type::new("Circle", Some(&SHAPE));
    static SOUND: Type = Type::new("Sound", Some(&OBJECT_TYPE));

    struct Circle;
    impl_object!(Circle, CIRCLE);

    struct Sound;
    impl_object!(Sound, SOUND);

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Align {
        Left,
        Center,
    }

    impl crate::ScriptEnum for Align {
        const NAME: &'static str = "align mode";
        const VARIANTS: &'static [(&'static str, Self)] =
            &[("left", Align::Left), ("center", Align::Center)];
    }

    fn ctx<'a>(lua: &'a Lua, code: &str) -> CallContext<'a> {
        let args: mlua::MultiValue = lua.load(code).eval().unwrap();
        CallContext::new(lua, "test", args.into_iter().collect())
    }

    #[test]
    fn clamped_numbers_saturate() {
        let lua = Lua::new();
        let c = ctx(&lua, "return -5, 0.5, 5");
        assert_eq!(c.check_number_clamped(1, 0.0, 1.0).unwrap(), 0.0);
        assert_eq!(c.check_number_clamped(2, 0.0, 1.0).unwrap(), 0.5);
        assert_eq!(c.check_number_clamped(3, 0.0, 1.0).unwrap(), 1.0);
        assert_eq!(c.opt_number_clamped01(4, 0.25).unwrap(), 0.25);
    }

    #[test]
    fn ints_truncate_toward_zero() {
        let lua = Lua::new();
        let c = ctx(&lua, "return 2.9, -2.9, 1e20, '7'");
        assert_eq!(c.check_int(1).unwrap(), 2);
        assert_eq!(c.check_int(2).unwrap(), -2);
        assert_eq!(c.check_int(3).unwrap(), i32::MAX);
        assert_eq!(c.check_int(4).unwrap(), 7);
        assert_eq!(c.opt_int(5, 9).unwrap(), 9);
    }

    #[test]
    fn type_mismatch_messages() {
        let lua = Lua::new();
        let c = ctx(&lua, "return {}, nil");
        assert_eq!(
            c.check_number(1).unwrap_err().to_string(),
            "bad argument #1 to 'test' (number expected, got table)"
        );
        assert_eq!(
            c.check_string(3).unwrap_err().to_string(),
            "bad argument #3 to 'test' (string expected, got no value)"
        );
    }

    #[test]
    fn numbers_coerce_to_strings() {
        let lua = Lua::new();
        let c = ctx(&lua, "return 42, 'x'");
        assert_eq!(c.check_string(1).unwrap(), "42");
        assert_eq!(c.opt_string(3, "dflt").unwrap(), "dflt");
        assert!(c.check_number(2).is_err());
    }

    #[test]
    fn booleans() {
        let lua = Lua::new();
        let c = ctx(&lua, "return false, 0, nil");
        assert!(!c.to_boolean(1));
        assert!(c.to_boolean(2));
        assert!(!c.to_boolean(3));
        assert!(c.check_boolean(2).is_err());
        assert!(c.opt_boolean(3, true));
    }

    #[test]
    fn check_object_accepts_descendants() {
        let lua = Lua::new();
        let circle = StrongRef::new(Circle);
        let sound = StrongRef::new(Sound);
        let args = vec![
            Value::UserData(push_object(&lua, &circle).unwrap()),
            Value::UserData(push_object(&lua, &sound).unwrap()),
        ];
        let c = CallContext::new(&lua, "draw", args);

        assert!(c.check_object(1, &SHAPE).is_ok());
        assert!(c.check_type::<Circle>(1).is_ok());
        assert!(c.is_type(1, &OBJECT_TYPE));
        assert_eq!(
            c.check_object(2, &SHAPE).unwrap_err().to_string(),
            "bad argument #2 to 'draw' (Shape expected, got Sound)"
        );
        assert!(c.to_type::<Circle>(2).is_none());
    }

    #[test]
    fn released_proxy_fails_check() {
        let lua = Lua::new();
        let circle = StrongRef::new(Circle);
        let ud = push_object(&lua, &circle).unwrap();
        release_proxy(&lua, &ud).unwrap();

        let c = CallContext::new(&lua, "draw", vec![Value::UserData(ud)]);
        let err = c.check_type::<Circle>(1).unwrap_err();
        assert!(matches!(err, NativeError::Released));
        assert!(c.to_type::<Circle>(1).is_none());
        assert!(c.type_of(1).is_none());
    }

    #[test]
    fn enum_errors_list_options() {
        let lua = Lua::new();
        let c = ctx(&lua, "return 'center', 'justify'");
        assert_eq!(c.check_enum::<Align>(1).unwrap(), Align::Center);
        assert_eq!(
            c.check_enum::<Align>(2).unwrap_err().to_string(),
            "Invalid align mode 'justify', expected one of: 'left', 'center'"
        );
        assert_eq!(c.opt_enum(3, Align::Left).unwrap(), Align::Left);
    }

    #[test]
    fn table_flags() {
        let lua = Lua::new();
        let c = ctx(&lua, "return { vsync = false, msaa = 4, scale = 1.5 }");
        assert!(!c.bool_flag(1, "vsync", true).unwrap());
        assert!(c.bool_flag(1, "resizable", true).unwrap());
        assert_eq!(c.int_flag(1, "msaa", 0).unwrap(), 4);
        assert_eq!(c.number_flag(1, "scale", 1.0).unwrap(), 1.5);
        assert_eq!(c.check_int_flag(1, "msaa").unwrap(), 4);
        assert_eq!(
            c.check_bool_flag(1, "msaa").unwrap_err().to_string(),
            "Expected boolean field 'msaa' in table"
        );
        assert!(c.bool_flag(2, "vsync", true).unwrap());
    }

    #[test]
    fn table_fields_must_be_enum_names() {
        let lua = Lua::new();
        let c = ctx(&lua, "return { left = 1 }, { right = 1 }");
        assert!(c.check_table_fields::<Align>(1).is_ok());
        assert!(
            c.check_table_fields::<Align>(2)
                .unwrap_err()
                .to_string()
                .starts_with("Invalid align mode 'right'")
        );
    }

    #[test]
    fn argc_bounds() {
        let lua = Lua::new();
        let c = ctx(&lua, "return 1, 2, 3");
        assert!(c.assert_argc(1, Some(3)).is_ok());
        assert!(c.assert_argc(4, None).unwrap_err().to_string().contains("at least [4]"));
        assert!(c.assert_argc(0, Some(2)).unwrap_err().to_string().contains("at most [2]"));
    }

    #[test]
    fn nil_error_uses_following_message() {
        let lua = Lua::new();
        let c = ctx(&lua, "return nil, 'file not found'");
        assert_eq!(c.assert_nil_error(1).unwrap_err().to_string(), "file not found");
        let c = ctx(&lua, "return 1");
        assert!(c.assert_nil_error(1).is_ok());
    }

    #[test]
    fn obj_len_of_strings_and_tables() {
        let lua = Lua::new();
        let c = ctx(&lua, "return 'abcd', {1, 2, 3}, 5");
        assert_eq!(c.obj_len(1), 4);
        assert_eq!(c.obj_len(2), 3);
        assert_eq!(c.obj_len(3), 0);
    }

    #[test]
    fn take_results_returns_last_values() {
        let lua = Lua::new();
        let mut c = CallContext::new(&lua, "test", Vec::new());
        c.push_number(1.0);
        c.push_boolean(true);
        c.push_string("x").unwrap();
        let results = c.take_results(2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], Value::Boolean(true));
    }

    #[test]
    fn recursive_variant_is_an_argument_error() {
        let lua = Lua::new();
        let c = ctx(&lua, "local t = {} t[1] = t return t");
        assert_eq!(
            c.check_variant(1, false).unwrap_err().to_string(),
            "bad argument #1 to 'test' (cannot convert recursive table)"
        );
    }

    #[test]
    fn object_variants_keep_objects_alive() {
        let lua = Lua::new();
        let circle = StrongRef::new(Circle);
        let ud = push_object(&lua, &circle).unwrap();
        let c = CallContext::new(&lua, "push", vec![Value::UserData(ud)]);

        let variant = c.check_variant(1, true).unwrap();
        assert_eq!(circle.ref_count(), 3);
        assert!(matches!(
            c.check_variant(1, false).unwrap_err(),
            NativeError::Argument {
                source: ConversionError::UserdataNotAllowed,
                ..
            }
        ));
        drop(variant);
        assert_eq!(circle.ref_count(), 2);
    }
}
