//! Event module: a process-wide message queue.
//!
//! Scripts push and poll named messages; native producers (worker threads,
//! platform callbacks) push [`Message`]s straight into the shared
//! [`EventModule`] instance.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use mlua::{Lua, Table};
use tracing::trace;

use lunabridge_core::{
    MODULE_TYPE, Module, ModuleKind, NativeResult, StrongRef, Type, Variant, impl_object,
};
use lunabridge_registry::modules;
use lunabridge_runtime::{
    CallContext, FunctionReg, LuaResultExt, NativeFn, WrappedModule, get_module, raise,
    register_module, wrap_function,
};

pub static EVENT_MODULE_TYPE: Type = Type::new("EventModule", Some(&MODULE_TYPE));

/// A named event with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub name: String,
    pub args: Vec<Variant>,
}

impl Message {
    pub fn new(name: impl Into<String>, args: Vec<Variant>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// The event queue singleton.
#[derive(Default)]
pub struct EventModule {
    queue: Mutex<VecDeque<Message>>,
}
impl_object!(EventModule, EVENT_MODULE_TYPE);

impl Module for EventModule {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Event
    }

    fn name(&self) -> &'static str {
        "lunabridge.event"
    }
}

impl EventModule {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self) -> std::sync::MutexGuard<'_, VecDeque<Message>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, message: Message) {
        trace!(target: "lunabridge::event", name = %message.name, "push");
        self.queue().push_back(message);
    }

    pub fn poll(&self) -> Option<Message> {
        self.queue().pop_front()
    }

    pub fn clear(&self) {
        self.queue().clear();
    }

    pub fn len(&self) -> usize {
        self.queue().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue().is_empty()
    }
}

/// Open `<root>.event` in `lua`.
pub fn open(lua: &Lua) -> mlua::Result<Table> {
    let module = lunabridge_registry::write(modules())
        .acquire(EventModule::new)
        .map_err(|e| raise(e.into()))?;

    register_module(
        lua,
        WrappedModule {
            module,
            name: "event",
            ty: &EVENT_MODULE_TYPE,
            functions: vec![
                FunctionReg::new("push", push),
                FunctionReg::new("poll", poll),
                FunctionReg::new("clear", clear),
                FunctionReg::new("quit", quit),
            ],
            types: &[],
        },
    )
}

/// `push(name, ...)`.
fn push(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    let module = get_module::<EventModule>(ctx.lua())?;
    let name = ctx.check_string(1)?;
    let args = (2..=ctx.arg_count())
        .map(|idx| ctx.check_variant(idx, true))
        .collect::<NativeResult<Vec<_>>>()?;
    module.push(Message::new(name, args));
    Ok(0)
}

/// `poll()`: an iterator function yielding `name, args...` per message.
fn poll(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    let module = get_module::<EventModule>(ctx.lua())?;
    let iterator = wrap_function(ctx.lua(), "poll_i", NativeFn::new(move |ctx| poll_one(&module, ctx)))
        .into_native()?;
    ctx.push(iterator)?;
    Ok(1)
}

fn poll_one(module: &StrongRef<EventModule>, ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    let Some(message) = module.poll() else {
        return Ok(0);
    };
    ctx.push_string(&message.name)?;
    for arg in &message.args {
        ctx.push_variant(arg)?;
    }
    Ok(message.args.len() + 1)
}

fn clear(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    get_module::<EventModule>(ctx.lua())?.clear();
    Ok(0)
}

/// `quit([status])` with a number or `"restart"`.
fn quit(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    let module = get_module::<EventModule>(ctx.lua())?;
    let arg = match ctx.to_string_lossy(1).as_deref() {
        Some("restart") => Variant::from("restart"),
        _ => Variant::Number(ctx.opt_number(1, 0.0)?),
    };
    module.push(Message::new("quit", vec![arg]));
    ctx.push_boolean(true);
    Ok(1)
}
