//! The pinned thread and registry references.
//!
//! Native callbacks that fire outside any script call (platform events,
//! timers) have no execution context of their own. A state pins one thread,
//! normally its main thread, and such callbacks resume work through it.

use mlua::{FromLua, IntoLua, Lua, RegistryKey, Thread};
use tracing::debug;

use crate::error::BridgeError;

const PINNED_THREAD_KEY: &str = "lunabridge.pinned_thread";

/// Pin the calling thread, unless a thread is pinned already.
///
/// Returns the pinned thread either way.
pub fn insist_pinned_thread(lua: &Lua) -> mlua::Result<Thread> {
    if let Some(thread) = lua.named_registry_value::<Option<Thread>>(PINNED_THREAD_KEY)? {
        return Ok(thread);
    }
    let thread = lua.current_thread();
    lua.set_named_registry_value(PINNED_THREAD_KEY, thread.clone())?;
    debug!(target: "lunabridge::state", "pinned thread established");
    Ok(thread)
}

/// The pinned thread.
///
/// Fails with [`BridgeError::PinnedThreadMissing`] when called before
/// [`insist_pinned_thread`].
pub fn pinned_thread(lua: &Lua) -> Result<Thread, BridgeError> {
    lua.named_registry_value::<Option<Thread>>(PINNED_THREAD_KEY)?
        .ok_or(BridgeError::PinnedThreadMissing)
}

/// A Lua value kept alive from native code.
///
/// The value sits in the Lua registry until [`unref`](Self::unref) is
/// called or the reference is dropped. The pinned thread at creation time is
/// kept alongside, so callbacks holding only a `Reference` can reach the
/// state's main context.
pub struct Reference {
    key: Option<RegistryKey>,
    thread: Option<Thread>,
}

impl Reference {
    /// Store `value` in the registry.
    pub fn new(lua: &Lua, value: impl IntoLua) -> mlua::Result<Self> {
        let key = lua.create_registry_value(value)?;
        Ok(Self {
            key: Some(key),
            thread: pinned_thread(lua).ok(),
        })
    }

    /// Whether the reference still holds a value.
    pub fn is_valid(&self) -> bool {
        self.key.is_some()
    }

    /// The referenced value; nil once unreferenced.
    pub fn get<T: FromLua>(&self, lua: &Lua) -> mlua::Result<T> {
        match &self.key {
            Some(key) => lua.registry_value(key),
            None => T::from_lua(mlua::Value::Nil, lua),
        }
    }

    /// The thread pinned when the reference was created.
    pub fn thread(&self) -> Option<&Thread> {
        self.thread.as_ref()
    }

    /// Release the registry slot.
    pub fn unref(&mut self, lua: &Lua) -> mlua::Result<()> {
        if let Some(key) = self.key.take() {
            lua.remove_registry_value(key)?;
        }
        Ok(())
    }
}
