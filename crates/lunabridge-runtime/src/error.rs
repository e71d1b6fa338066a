//! Errors of the Lua glue layer.
//!
//! Script-visible failures are [`NativeError`]s and reach Lua through
//! [`raise`](crate::raise). `BridgeError` covers the host-side API: state
//! initialization, registration from Rust, and pinned-thread lookup.

use thiserror::Error;

use lunabridge_core::{NativeError, NativeResult, RegistrationError};

/// Errors returned to Rust callers of the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// `pinned_thread` was called before `insist_pinned_thread`.
    #[error("no pinned thread has been established for this state")]
    PinnedThreadMissing,

    /// The Lua state reported an error.
    #[error(transparent)]
    Lua(#[from] mlua::Error),

    /// A type or module could not be registered.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// A native function failed.
    #[error(transparent)]
    Native(#[from] NativeError),
}

/// Convert Lua failures met while native code runs into native errors.
pub trait LuaResultExt<T> {
    /// Re-express a Lua error as [`NativeError::Script`].
    fn into_native(self) -> NativeResult<T>;
}

impl<T> LuaResultExt<T> for mlua::Result<T> {
    fn into_native(self) -> NativeResult<T> {
        self.map_err(|err| NativeError::Script(err.to_string()))
    }
}
