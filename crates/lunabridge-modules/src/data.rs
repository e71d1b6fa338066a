//! Data module: raw byte containers and encodings.
//!
//! Types:
//!
//! - `Data` - abstract base of every byte container
//! - `ByteData` - owned, fixed-size, writable bytes
//! - `DataView` - a window into another `Data`
//!
//! Functions live in `<root>.data`: `newByteData`, `newDataView`, `encode`,
//! `decode`.

use std::sync::{PoisonError, RwLock};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use mlua::{Lua, Table};

use lunabridge_core::{
    MODULE_TYPE, Module, ModuleKind, NativeError, NativeResult, OBJECT_TYPE, Object, StrongRef,
    Type, impl_object,
};
use lunabridge_registry::modules;
use lunabridge_runtime::{
    CallContext, FunctionReg, ScriptEnum, WrappedModule, raise, register_module, register_type,
};

pub static DATA_TYPE: Type = Type::new("Data", Some(&OBJECT_TYPE));
pub static BYTE_DATA_TYPE: Type = Type::new("ByteData", Some(&DATA_TYPE));
pub static DATA_VIEW_TYPE: Type = Type::new("DataView", Some(&DATA_TYPE));
pub static DATA_MODULE_TYPE: Type = Type::new("DataModule", Some(&MODULE_TYPE));

// =============================================================================
// ENUMS
// =============================================================================

/// What `encode` and `decode` return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerType {
    Data,
    String,
}

impl ScriptEnum for ContainerType {
    const NAME: &'static str = "container type";
    const VARIANTS: &'static [(&'static str, Self)] = &[
        ("data", ContainerType::Data),
        ("string", ContainerType::String),
    ];
}

/// Text encodings of binary data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeFormat {
    Base64,
    Hex,
}

impl ScriptEnum for EncodeFormat {
    const NAME: &'static str = "encode format";
    const VARIANTS: &'static [(&'static str, Self)] = &[
        ("base64", EncodeFormat::Base64),
        ("hex", EncodeFormat::Hex),
    ];
}

/// Encode `bytes` as text.
pub fn encode(format: EncodeFormat, bytes: &[u8]) -> String {
    match format {
        EncodeFormat::Base64 => BASE64.encode(bytes),
        EncodeFormat::Hex => hex::encode(bytes),
    }
}

/// Decode text produced by [`encode`].
pub fn decode(format: EncodeFormat, text: &[u8]) -> NativeResult<Vec<u8>> {
    match format {
        EncodeFormat::Base64 => BASE64
            .decode(text)
            .map_err(|e| NativeError::runtime(format!("Could not decode base64 data: {e}"))),
        EncodeFormat::Hex => hex::decode(text)
            .map_err(|e| NativeError::runtime(format!("Could not decode hex data: {e}"))),
    }
}

// =============================================================================
// BYTE CONTAINERS
// =============================================================================

/// Owned, fixed-size byte buffer.
///
/// Shared across threads through channels, so writes take a lock.
pub struct ByteData {
    bytes: RwLock<Vec<u8>>,
}
impl_object!(ByteData, BYTE_DATA_TYPE);

impl ByteData {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: RwLock::new(bytes),
        }
    }

    /// Zero-filled buffer of `size` bytes; fails instead of aborting when
    /// the allocation cannot be made.
    pub fn zeroed(size: usize) -> NativeResult<Self> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(size)
            .map_err(|_| NativeError::runtime("Out of memory"))?;
        bytes.resize(size, 0);
        Ok(Self::new(bytes))
    }

    pub fn size(&self) -> usize {
        self.bytes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.bytes.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Copy `src` in at `offset`, truncating to the buffer's end.
    pub fn write(&self, offset: usize, src: &[u8]) -> NativeResult<usize> {
        let mut bytes = self.bytes.write().unwrap_or_else(PoisonError::into_inner);
        if offset > bytes.len() {
            return Err(NativeError::runtime(
                "The given offset is outside the ByteData's size.",
            ));
        }
        let n = src.len().min(bytes.len() - offset);
        bytes[offset..offset + n].copy_from_slice(&src[..n]);
        Ok(n)
    }
}

/// A window into another data object.
pub struct DataView {
    data: DataRef,
    offset: usize,
    size: usize,
}
impl_object!(DataView, DATA_VIEW_TYPE);

impl DataView {
    /// View `size` bytes of `data` starting at `offset`.
    pub fn new(data: DataRef, offset: usize, size: usize) -> NativeResult<Self> {
        if size == 0 {
            return Err(NativeError::runtime("DataView size must be greater than 0."));
        }
        if offset.checked_add(size).is_none_or(|end| end > data.size()) {
            return Err(NativeError::runtime(
                "The given offset and size parameters don't fit within the Data's size.",
            ));
        }
        Ok(Self { data, offset, size })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Copy of the viewed bytes.
    pub fn to_vec(&self) -> Vec<u8> {
        self.data.slice(self.offset, self.size)
    }
}

/// Any concrete `Data` object.
#[derive(Clone)]
pub enum DataRef {
    Bytes(StrongRef<ByteData>),
    View(StrongRef<DataView>),
}

impl DataRef {
    /// Classify an erased object; `None` if it is not a data object.
    pub fn from_object(object: &StrongRef<dyn Object>) -> Option<Self> {
        object
            .downcast::<ByteData>()
            .map(DataRef::Bytes)
            .or_else(|| object.downcast::<DataView>().map(DataRef::View))
    }

    pub fn size(&self) -> usize {
        match self {
            DataRef::Bytes(d) => d.size(),
            DataRef::View(v) => v.size(),
        }
    }

    /// Copy of `size` bytes starting at `offset`, resolved down to the
    /// owning `ByteData`. Empty if the range falls outside it.
    pub fn slice(&self, offset: usize, size: usize) -> Vec<u8> {
        match self {
            DataRef::Bytes(d) => d.with_bytes(|bytes| {
                offset
                    .checked_add(size)
                    .and_then(|end| bytes.get(offset..end))
                    .map(|range| range.to_vec())
                    .unwrap_or_default()
            }),
            DataRef::View(v) => v.data.slice(v.offset.saturating_add(offset), size),
        }
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.slice(0, self.size())
    }

    pub fn to_object(&self) -> StrongRef<dyn Object> {
        match self {
            DataRef::Bytes(d) => d.to_object(),
            DataRef::View(v) => v.to_object(),
        }
    }
}

/// Argument `idx` as any data object.
pub fn check_data(ctx: &CallContext<'_>, idx: usize) -> NativeResult<DataRef> {
    let object = ctx.check_object(idx, &DATA_TYPE)?;
    DataRef::from_object(&object).ok_or_else(|| ctx.type_error(idx, DATA_TYPE.name()))
}

/// Argument `idx` as bytes: a string or any data object.
pub fn check_bytes_or_data(ctx: &CallContext<'_>, idx: usize) -> NativeResult<Vec<u8>> {
    if ctx.is_type(idx, &DATA_TYPE) {
        check_data(ctx, idx).map(|d| d.to_vec())
    } else {
        ctx.check_bytes(idx)
    }
}

// =============================================================================
// MODULE
// =============================================================================

/// The data module singleton.
pub struct DataModule;
impl_object!(DataModule, DATA_MODULE_TYPE);

impl Module for DataModule {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Data
    }

    fn name(&self) -> &'static str {
        "lunabridge.data"
    }
}

/// Open `<root>.data` in `lua`.
pub fn open(lua: &Lua) -> mlua::Result<Table> {
    let module = lunabridge_registry::write(modules())
        .acquire(|| DataModule)
        .map_err(|e| raise(e.into()))?;

    register_module(
        lua,
        WrappedModule {
            module,
            name: "data",
            ty: &DATA_MODULE_TYPE,
            functions: vec![
                FunctionReg::new("newByteData", new_byte_data),
                FunctionReg::new("newDataView", new_data_view),
                FunctionReg::new("encode", encode_fn),
                FunctionReg::new("decode", decode_fn),
            ],
            types: &[open_data, open_byte_data, open_data_view],
        },
    )
}

// =============================================================================
// MODULE FUNCTIONS
// =============================================================================

/// `newByteData(size)`, `newByteData(string)` or `newByteData(data[, offset, size])`.
fn new_byte_data(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    let data = if ctx.is_type(1, &DATA_TYPE) {
        let source = check_data(ctx, 1)?;
        let total = source.size();
        let offset = ctx.opt_number(2, 0.0)?.max(0.0) as usize;
        let size = match ctx.is_none_or_nil(3) {
            true => total.saturating_sub(offset),
            false => ctx.check_size(3)?,
        };
        if offset.checked_add(size).is_none_or(|end| end > total) {
            return Err(NativeError::runtime(
                "The given offset and size parameters don't fit within the Data's size.",
            ));
        }
        ByteData::new(source.slice(offset, size))
    } else if matches!(ctx.arg(1), mlua::Value::String(_)) {
        ByteData::new(ctx.check_bytes(1)?)
    } else {
        let size = ctx.check_size(1)?;
        if size == 0 {
            return Err(NativeError::runtime("Data size must be a positive number."));
        }
        ByteData::zeroed(size)?
    };
    ctx.push_object(&StrongRef::new(data))?;
    Ok(1)
}

fn new_data_view(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    let data = check_data(ctx, 1)?;
    let offset = ctx.check_size(2)?;
    let size = ctx.check_size(3)?;
    let view = DataView::new(data, offset, size)?;
    ctx.push_object(&StrongRef::new(view))?;
    Ok(1)
}

fn push_container(ctx: &mut CallContext<'_>, container: ContainerType, bytes: Vec<u8>) -> NativeResult<()> {
    match container {
        ContainerType::String => ctx.push_bytes(&bytes),
        ContainerType::Data => ctx.push_object(&StrongRef::new(ByteData::new(bytes))),
    }
}

/// `encode(container, format, source)`.
fn encode_fn(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    let container = ctx.check_enum::<ContainerType>(1)?;
    let format = ctx.check_enum::<EncodeFormat>(2)?;
    let source = check_bytes_or_data(ctx, 3)?;
    let text = encode(format, &source);
    push_container(ctx, container, text.into_bytes())?;
    Ok(1)
}

/// `decode(container, format, source)`.
fn decode_fn(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    let container = ctx.check_enum::<ContainerType>(1)?;
    let format = ctx.check_enum::<EncodeFormat>(2)?;
    let source = check_bytes_or_data(ctx, 3)?;
    let bytes = decode(format, &source)?;
    push_container(ctx, container, bytes)?;
    Ok(1)
}

// =============================================================================
// METHODS
// =============================================================================

fn open_data(lua: &Lua) -> mlua::Result<()> {
    register_type(
        lua,
        &DATA_TYPE,
        vec![
            FunctionReg::new("getSize", data_get_size),
            FunctionReg::new("getString", data_get_string),
            FunctionReg::new("clone", data_clone),
        ],
    )
}

fn open_byte_data(lua: &Lua) -> mlua::Result<()> {
    register_type(
        lua,
        &BYTE_DATA_TYPE,
        vec![FunctionReg::new("setString", byte_data_set_string)],
    )
}

fn open_data_view(lua: &Lua) -> mlua::Result<()> {
    register_type(lua, &DATA_VIEW_TYPE, Vec::new())
}

fn data_get_size(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    let data = check_data(ctx, 1)?;
    ctx.push_int(data.size() as i64);
    Ok(1)
}

/// `Data:getString([offset, size])`.
fn data_get_string(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    let data = check_data(ctx, 1)?;
    let total = data.size();
    let offset = ctx.opt_number(2, 0.0)?.max(0.0) as usize;
    let size = match ctx.is_none_or_nil(3) {
        true => total.saturating_sub(offset),
        false => ctx.check_size(3)?,
    };
    if offset.checked_add(size).is_none_or(|end| end > total) {
        return Err(NativeError::runtime(
            "The given offset and size parameters don't fit within the Data's size.",
        ));
    }
    let bytes = data.slice(offset, size);
    ctx.push_bytes(&bytes)?;
    Ok(1)
}

fn data_clone(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    match check_data(ctx, 1)? {
        DataRef::Bytes(d) => {
            let copy = d.with_bytes(|b| ByteData::new(b.to_vec()));
            ctx.push_object(&StrongRef::new(copy))?;
        }
        DataRef::View(v) => {
            let copy = DataView::new(v.data.clone(), v.offset, v.size)?;
            ctx.push_object(&StrongRef::new(copy))?;
        }
    }
    Ok(1)
}

/// `ByteData:setString(string[, offset])`.
fn byte_data_set_string(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    let data = ctx.check_type::<ByteData>(1)?;
    let bytes = ctx.check_bytes(2)?;
    let offset = ctx.opt_number(3, 0.0)?.max(0.0) as usize;
    data.write(offset, &bytes)?;
    Ok(0)
}
