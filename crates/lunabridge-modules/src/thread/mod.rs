//! Thread module: worker threads and the channels between them.
//!
//! - [`Channel`] carries [`Variant`](lunabridge_core::Variant)s between
//!   states, including objects, which stay retained while queued
//! - [`LuaThread`] runs script code in a fresh state on an OS thread
//!
//! Named channels are process-wide: `getChannel("x")` returns the same
//! channel in every state.

mod channel;
mod lua_thread;

pub use channel::{CHANNEL_TYPE, Channel};
pub use lua_thread::{LuaThread, THREAD_TYPE};

use std::sync::{Mutex, PoisonError};

use mlua::{Lua, Table};
use rustc_hash::FxHashMap;

use lunabridge_core::{
    MODULE_TYPE, Module, ModuleKind, NativeResult, StrongRef, Type, impl_object,
};
use lunabridge_registry::modules;
use lunabridge_runtime::{
    CallContext, FunctionReg, WrappedModule, config, get_module, raise, register_module,
};

use crate::data::{DATA_TYPE, check_data};

pub static THREAD_MODULE_TYPE: Type = Type::new("ThreadModule", Some(&MODULE_TYPE));

const DEFAULT_THREAD_NAME: &str = "Thread code";

/// The thread module singleton.
#[derive(Default)]
pub struct ThreadModule {
    named_channels: Mutex<FxHashMap<String, StrongRef<Channel>>>,
}
impl_object!(ThreadModule, THREAD_MODULE_TYPE);

impl Module for ThreadModule {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Thread
    }

    fn name(&self) -> &'static str {
        "lunabridge.thread.std"
    }
}

impl ThreadModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// The channel called `name`, created on first use (+1).
    pub fn channel(&self, name: &str) -> StrongRef<Channel> {
        let mut channels = self
            .named_channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(name.to_string())
            .or_insert_with(|| StrongRef::new(Channel::new()))
            .retain()
    }
}

/// Open `<root>.thread` in `lua`.
pub fn open(lua: &Lua) -> mlua::Result<Table> {
    let module = lunabridge_registry::write(modules())
        .acquire(ThreadModule::new)
        .map_err(|e| raise(e.into()))?;

    register_module(
        lua,
        WrappedModule {
            module,
            name: "thread",
            ty: &THREAD_MODULE_TYPE,
            functions: vec![
                FunctionReg::new("newThread", new_thread),
                FunctionReg::new("newChannel", new_channel),
                FunctionReg::new("getChannel", get_channel),
            ],
            types: &[channel::open_channel, lua_thread::open_thread],
        },
    )
}

/// Whether a string argument names a script file rather than holding code.
fn is_filename(source: &[u8]) -> bool {
    source.ends_with(b".lua") && !source.contains(&b'\n')
}

/// `newThread(code | filename | Data[, name])`.
fn new_thread(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    let (code, default_name) = if ctx.is_type(1, &DATA_TYPE) {
        (check_data(ctx, 1)?.to_vec(), DEFAULT_THREAD_NAME.to_string())
    } else {
        let source = ctx.check_bytes(1)?;
        if is_filename(&source) {
            let path = String::from_utf8_lossy(&source).into_owned();
            (std::fs::read(&path)?, path)
        } else {
            (source, DEFAULT_THREAD_NAME.to_string())
        }
    };
    let name = ctx.opt_string(2, &default_name)?;

    let thread = LuaThread::new(name, code, config(ctx.lua()));
    ctx.push_object(&StrongRef::new(thread))?;
    Ok(1)
}

fn new_channel(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    ctx.push_object(&StrongRef::new(Channel::new()))?;
    Ok(1)
}

fn get_channel(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    let name = ctx.check_string(1)?;
    let channel = get_module::<ThreadModule>(ctx.lua())?.channel(&name);
    ctx.push_object(&channel)?;
    Ok(1)
}
