//! Conversion of native failures into script errors.
//!
//! A bridged call runs in two phases. The native phase executes inside
//! [`catch_native`], which turns both `Err(NativeError)` and panics into a
//! captured [`NativeError`]; every Rust value owned by the native code is
//! dropped before it returns. Only then does the caller hand the error to
//! [`raise`], whose `mlua::Error` is returned from the Lua callback and turned
//! into a Lua error by the engine.
//!
//! ```text
//! Running -> Success | NativeException -> (Finally) -> Return | ScriptError
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::trace;

use lunabridge_core::{NativeError, NativeResult};

/// States of a single bridged call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    /// Native code is executing.
    Running,
    /// Native code returned normally.
    Success,
    /// Native code returned an error or panicked; the error is captured.
    NativeException,
    /// The cleanup callback is running.
    Finally,
    /// Results are being handed back to the script.
    Return,
    /// The captured error is being raised in the script. Terminal.
    ScriptError,
}

impl CallPhase {
    /// Phase reached once the native part of a call has produced `result`.
    pub fn after<T>(result: &NativeResult<T>) -> Self {
        match result {
            Ok(_) => CallPhase::Success,
            Err(_) => CallPhase::NativeException,
        }
    }
}

/// Run the native phase of a call, capturing errors and panics.
pub fn catch_native<T>(f: impl FnOnce() -> NativeResult<T>) -> NativeResult<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(NativeError::Panic {
            message: panic_message(payload.as_ref()),
        }),
    }
}

/// Like [`catch_native`], then run `finally` exactly once.
///
/// `finally` receives whether the native phase failed. A panic inside
/// `finally` is captured as well; it replaces a successful result but never
/// hides an earlier error.
pub fn catch_native_finally<T>(
    f: impl FnOnce() -> NativeResult<T>,
    finally: impl FnOnce(bool),
) -> NativeResult<T> {
    let result = catch_native(f);
    let phase = CallPhase::after(&result);
    trace!(target: "lunabridge::call", ?phase, "running finally");

    let failed = result.is_err();
    let cleanup = panic::catch_unwind(AssertUnwindSafe(|| finally(failed)));
    match (result, cleanup) {
        (Err(err), _) => Err(err),
        (Ok(_), Err(payload)) => Err(NativeError::Panic {
            message: panic_message(payload.as_ref()),
        }),
        (Ok(value), Ok(())) => Ok(value),
    }
}

/// Express a captured error as a Lua error.
///
/// This is the transfer point: the returned error must be handed straight
/// back to mlua from the callback.
pub fn raise(err: NativeError) -> mlua::Error {
    trace!(target: "lunabridge::call", phase = ?CallPhase::ScriptError, error = %err, "raising");
    mlua::Error::external(err)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
