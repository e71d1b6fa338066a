//! Script code running in its own state on an OS thread.

use std::any::Any;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use mlua::{Lua, MultiValue};
use tracing::{debug, error};

use lunabridge_core::{NativeError, NativeResult, OBJECT_TYPE, StrongRef, Type, Variant, impl_object};
use lunabridge_registry::{modules, read};
use lunabridge_runtime::{BridgeConfig, CallContext, FunctionReg, init_state, push_variant, register_type};

use crate::event::{EventModule, Message};

pub static THREAD_TYPE: Type = Type::new("Thread", Some(&OBJECT_TYPE));

#[derive(Default)]
struct ThreadState {
    handle: Option<JoinHandle<()>>,
    running: bool,
    error: Option<String>,
}

/// A chunk of script code and the worker running it.
///
/// Each run gets a fresh state configured like the state that created the
/// thread, with every bridge module opened. The worker holds a reference to
/// the thread object until it finishes.
pub struct LuaThread {
    name: String,
    code: Vec<u8>,
    config: BridgeConfig,
    state: Mutex<ThreadState>,
}
impl_object!(LuaThread, THREAD_TYPE);

impl LuaThread {
    pub fn new(name: impl Into<String>, code: Vec<u8>, config: BridgeConfig) -> Self {
        Self {
            name: name.into(),
            code,
            config,
            state: Mutex::new(ThreadState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) -> MutexGuard<'_, ThreadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run the code on a new OS thread with `args` as the chunk's varargs.
    ///
    /// Returns `false` if the thread is already running, or if the previous
    /// run panicked; the panic is then reported through [`error`](Self::error)
    /// and the next call starts normally.
    pub fn start(this: &StrongRef<LuaThread>, args: Vec<Variant>) -> NativeResult<bool> {
        let mut state = this.lock();
        if state.running {
            return Ok(false);
        }
        if let Some(previous) = state.handle.take() {
            if let Err(payload) = previous.join() {
                let message = panic_message(payload);
                error!(
                    target: "lunabridge::thread",
                    thread = %this.name,
                    error = %message,
                    "previous run panicked"
                );
                state.error = Some(message);
                return Ok(false);
            }
        }

        let worker = this.retain();
        let handle = thread::Builder::new()
            .name(format!("{}-{}", this.config.thread_name_prefix, this.name))
            .spawn(move || run(worker, args))?;

        state.handle = Some(handle);
        state.running = true;
        state.error = None;
        debug!(target: "lunabridge::thread", thread = %this.name, "started");
        Ok(true)
    }

    /// Block until the current run finishes.
    pub fn wait(&self) -> NativeResult<()> {
        let Some(handle) = self.lock().handle.take() else {
            return Ok(());
        };
        if handle.thread().id() == thread::current().id() {
            self.lock().handle = Some(handle);
            return Err(NativeError::runtime("A thread cannot wait for itself."));
        }
        if let Err(payload) = handle.join() {
            let mut state = self.lock();
            state.running = false;
            state.error.get_or_insert_with(|| panic_message(payload));
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Error message of the last failed run.
    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    fn execute(&self, args: Vec<Variant>) -> mlua::Result<()> {
        let lua = Lua::new();
        init_state(&lua, self.config.clone())?;
        crate::open_all(&lua)?;

        let args = args
            .iter()
            .map(|arg| push_variant(&lua, arg))
            .collect::<mlua::Result<MultiValue>>()?;
        lua.load(self.code.as_slice())
            .set_name(format!("={}", self.name))
            .call::<()>(args)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned());
    match detail {
        Some(detail) => format!("thread panicked: {detail}"),
        None => "thread panicked".to_string(),
    }
}

fn run(thread: StrongRef<LuaThread>, args: Vec<Variant>) {
    let result = thread.execute(args);

    let mut state = thread.lock();
    state.running = false;
    let Err(err) = result else {
        debug!(target: "lunabridge::thread", thread = %thread.name, "finished");
        return;
    };

    let message = err.to_string();
    error!(target: "lunabridge::thread", thread = %thread.name, error = %message, "thread failed");
    state.error = Some(message.clone());
    drop(state);

    let events = read(modules()).get::<EventModule>();
    if let Some(events) = events {
        events.push(Message::new(
            "threaderror",
            vec![Variant::Object(thread.to_object()), Variant::from(message)],
        ));
    }
}

// =============================================================================
// METHODS
// =============================================================================

pub(crate) fn open_thread(lua: &Lua) -> mlua::Result<()> {
    register_type(
        lua,
        &THREAD_TYPE,
        vec![
            FunctionReg::new("start", thread_start),
            FunctionReg::new("wait", thread_wait),
            FunctionReg::new("isRunning", thread_is_running),
            FunctionReg::new("getError", thread_get_error),
        ],
    )
}

/// `Thread:start(...)`.
fn thread_start(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    let thread = ctx.check_type::<LuaThread>(1)?;
    let args = (2..=ctx.arg_count())
        .map(|idx| ctx.check_variant(idx, true))
        .collect::<NativeResult<Vec<_>>>()?;
    ctx.push_boolean(LuaThread::start(&thread, args)?);
    Ok(1)
}

fn thread_wait(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    ctx.check_type::<LuaThread>(1)?.wait()?;
    Ok(0)
}

fn thread_is_running(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    let thread = ctx.check_type::<LuaThread>(1)?;
    ctx.push_boolean(thread.is_running());
    Ok(1)
}

fn thread_get_error(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    let thread = ctx.check_type::<LuaThread>(1)?;
    match thread.error() {
        Some(message) => ctx.push_string(&message)?,
        None => ctx.push_nil(),
    }
    Ok(1)
}
