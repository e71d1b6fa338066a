//! Thread-safe FIFO of variants shared between script states.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use mlua::Lua;

use lunabridge_core::{NativeResult, OBJECT_TYPE, Type, Variant, impl_object};
use lunabridge_runtime::{CallContext, FunctionReg, register_type};

pub static CHANNEL_TYPE: Type = Type::new("Channel", Some(&OBJECT_TYPE));

#[derive(Default)]
struct ChannelState {
    queue: VecDeque<Variant>,
    /// Id of the last pushed message.
    sent: u64,
    /// Number of messages taken out, by pop or clear.
    received: u64,
}

/// A message queue with blocking reads and acknowledged writes.
///
/// Every pushed message gets an increasing id. A message counts as read once
/// it has been popped or the channel has been cleared after it was pushed.
#[derive(Default)]
pub struct Channel {
    state: Mutex<ChannelState>,
    cond: Condvar,
}
impl_object!(Channel, CHANNEL_TYPE);

impl Channel {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push_locked(&self, state: &mut ChannelState, value: Variant) -> u64 {
        state.queue.push_back(value);
        state.sent += 1;
        self.cond.notify_all();
        state.sent
    }

    fn pop_locked(&self, state: &mut ChannelState) -> Option<Variant> {
        let value = state.queue.pop_front()?;
        state.received += 1;
        self.cond.notify_all();
        Some(value)
    }

    /// Queue `value` and return its id.
    pub fn push(&self, value: Variant) -> u64 {
        let mut state = self.lock();
        self.push_locked(&mut state, value)
    }

    /// Queue `value` and block until it has been read.
    ///
    /// With a timeout, returns whether it was read in time.
    pub fn supply(&self, value: Variant, timeout: Option<Duration>) -> bool {
        let mut state = self.lock();
        let id = self.push_locked(&mut state, value);
        let state = match timeout {
            None => self
                .cond
                .wait_while(state, |s| s.received < id)
                .unwrap_or_else(PoisonError::into_inner),
            Some(timeout) => {
                self.cond
                    .wait_timeout_while(state, timeout, |s| s.received < id)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
        };
        state.received >= id
    }

    pub fn pop(&self) -> Option<Variant> {
        let mut state = self.lock();
        self.pop_locked(&mut state)
    }

    /// Block until a value is available, or the timeout expires.
    pub fn demand(&self, timeout: Option<Duration>) -> Option<Variant> {
        let state = self.lock();
        let mut state = match timeout {
            None => self
                .cond
                .wait_while(state, |s| s.queue.is_empty())
                .unwrap_or_else(PoisonError::into_inner),
            Some(timeout) => {
                self.cond
                    .wait_timeout_while(state, timeout, |s| s.queue.is_empty())
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
        };
        self.pop_locked(&mut state)
    }

    pub fn peek(&self) -> Option<Variant> {
        self.lock().queue.front().cloned()
    }

    pub fn count(&self) -> usize {
        self.lock().queue.len()
    }

    /// Whether the message with id `id` has been read.
    pub fn has_read(&self, id: u64) -> bool {
        self.lock().received >= id
    }

    /// Drop every queued value and mark it read.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.queue.clear();
        state.received = state.sent;
        self.cond.notify_all();
    }
}

// =============================================================================
// METHODS
// =============================================================================

pub(crate) fn open_channel(lua: &Lua) -> mlua::Result<()> {
    register_type(
        lua,
        &CHANNEL_TYPE,
        vec![
            FunctionReg::new("push", channel_push),
            FunctionReg::new("supply", channel_supply),
            FunctionReg::new("pop", channel_pop),
            FunctionReg::new("demand", channel_demand),
            FunctionReg::new("peek", channel_peek),
            FunctionReg::new("getCount", channel_get_count),
            FunctionReg::new("hasRead", channel_has_read),
            FunctionReg::new("clear", channel_clear),
        ],
    )
}

/// Optional timeout in seconds; nil waits forever.
fn opt_timeout(ctx: &CallContext<'_>, idx: usize) -> NativeResult<Option<Duration>> {
    if ctx.is_none_or_nil(idx) {
        return Ok(None);
    }
    let seconds = ctx.check_number(idx)?.max(0.0);
    Ok(Duration::try_from_secs_f64(seconds).ok())
}

fn check_message(ctx: &CallContext<'_>, idx: usize) -> NativeResult<Variant> {
    let value = ctx.check_variant(idx, true)?;
    if value.is_nil() {
        return Err(ctx.type_error(idx, "value"));
    }
    Ok(value)
}

fn push_or_nil(ctx: &mut CallContext<'_>, value: Option<Variant>) -> NativeResult<usize> {
    match value {
        Some(value) => ctx.push_variant(&value)?,
        None => ctx.push_nil(),
    }
    Ok(1)
}

fn channel_push(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    let channel = ctx.check_type::<Channel>(1)?;
    let value = check_message(ctx, 2)?;
    ctx.push_int(channel.push(value) as i64);
    Ok(1)
}

fn channel_supply(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    let channel = ctx.check_type::<Channel>(1)?;
    let value = check_message(ctx, 2)?;
    let timeout = opt_timeout(ctx, 3)?;
    ctx.push_boolean(channel.supply(value, timeout));
    Ok(1)
}

fn channel_pop(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    let channel = ctx.check_type::<Channel>(1)?;
    push_or_nil(ctx, channel.pop())
}

fn channel_demand(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    let channel = ctx.check_type::<Channel>(1)?;
    let timeout = opt_timeout(ctx, 2)?;
    push_or_nil(ctx, channel.demand(timeout))
}

fn channel_peek(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    let channel = ctx.check_type::<Channel>(1)?;
    push_or_nil(ctx, channel.peek())
}

fn channel_get_count(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    let channel = ctx.check_type::<Channel>(1)?;
    ctx.push_int(channel.count() as i64);
    Ok(1)
}

fn channel_has_read(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    let channel = ctx.check_type::<Channel>(1)?;
    let id = ctx.check_i64(2)?.max(0) as u64;
    ctx.push_boolean(channel.has_read(id));
    Ok(1)
}

fn channel_clear(ctx: &mut CallContext<'_>) -> NativeResult<usize> {
    ctx.check_type::<Channel>(1)?.clear();
    Ok(0)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn ids_and_read_tracking() {
        let channel = Channel::new();
        let first = channel.push(1.0.into());
        let second = channel.push("two".into());
        assert_eq!((first, second), (1, 2));
        assert_eq!(channel.count(), 2);
        assert!(!channel.has_read(first));

        assert_eq!(channel.peek(), Some(Variant::Number(1.0)));
        assert_eq!(channel.pop(), Some(Variant::Number(1.0)));
        assert!(channel.has_read(first));
        assert!(!channel.has_read(second));

        channel.clear();
        assert!(channel.has_read(second));
        assert_eq!(channel.pop(), None);
    }

    #[test]
    fn demand_times_out_on_empty_channel() {
        let channel = Channel::new();
        assert_eq!(channel.demand(Some(Duration::from_millis(10))), None);
    }

    #[test]
    fn supply_times_out_unread() {
        let channel = Channel::new();
        assert!(!channel.supply(true.into(), Some(Duration::from_millis(10))));
        assert_eq!(channel.count(), 1);
    }

    #[test]
    fn supply_waits_for_consumer() {
        let channel = Arc::new(Channel::new());
        let consumer = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || channel.demand(None))
        };
        assert!(channel.supply("ping".into(), None));
        assert_eq!(consumer.join().unwrap(), Some(Variant::from("ping")));
    }
}
