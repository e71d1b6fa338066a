//! Engine subsystems exposed through the lunabridge bridge.
//!
//! - **data** - `ByteData` and `DataView` byte containers, base64/hex encoding
//! - **event** - process-wide event queue
//! - **thread** - worker threads running script code, and `Channel`s
//!
//! # Usage
//!
//! Each module has an `open` function registering it in a state under the
//! root namespace; [`open_all`] opens all of them:
//!
//! ```
//! use lunabridge_runtime::{BridgeConfig, init_state};
//!
//! let lua = mlua::Lua::new();
//! init_state(&lua, BridgeConfig::default()).unwrap();
//! lunabridge_modules::open_all(&lua).unwrap();
//!
//! let size: i64 = lua.load("return luna.data.newByteData('abc'):getSize()").eval().unwrap();
//! assert_eq!(size, 3);
//! ```

pub mod data;
pub mod event;
pub mod thread;

pub use data::{ByteData, ContainerType, DataModule, DataRef, DataView, EncodeFormat};
pub use event::{EventModule, Message};
pub use thread::{Channel, LuaThread, ThreadModule};

use mlua::Lua;

/// Open every module in `lua`.
pub fn open_all(lua: &Lua) -> mlua::Result<()> {
    event::open(lua)?;
    data::open(lua)?;
    thread::open(lua)?;
    Ok(())
}
