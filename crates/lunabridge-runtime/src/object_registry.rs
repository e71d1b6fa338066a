//! Per-state identity cache mapping native objects to their proxies.
//!
//! The cache is a Lua table with weak values, kept in the Lua registry and
//! keyed by object identity. An entry disappears when its proxy is collected;
//! the cache itself never holds a strong reference to a native object.
//!
//! All functions here run on the thread owning the state. Worker threads only
//! ever touch object reference counts.

use mlua::{AnyUserData, Lua, Table, Value};
use tracing::trace;

use lunabridge_core::{Object, StrongRef, Type};

use crate::proxy::Proxy;

const OBJECTS_KEY: &str = "lunabridge.objects";

/// The state's identity cache, created on first use.
pub(crate) fn objects_table(lua: &Lua) -> mlua::Result<Table> {
    if let Some(table) = lua.named_registry_value::<Option<Table>>(OBJECTS_KEY)? {
        return Ok(table);
    }
    let table: Table = lua
        .load("return setmetatable({}, { __mode = 'v' })")
        .set_name("=lunabridge.objects")
        .eval()?;
    lua.set_named_registry_value(OBJECTS_KEY, table.clone())?;
    Ok(table)
}

/// Push `object` as `ty`, reusing the state's live proxy for it if any.
///
/// A new proxy retains the object once; a reused proxy adds no reference.
/// Repeated pushes of one object therefore yield the same userdata, so
/// scripts can compare objects with `==` and use them as table keys.
///
/// A cached proxy that was released or refers to another object is evicted
/// and replaced.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn push_existing(
    lua: &Lua,
    ty: &'static Type,
    object: &StrongRef<dyn Object>,
) -> mlua::Result<AnyUserData> {
    debug_assert!(object.type_info().is_a(ty));

    let key = object.identity().as_i64();
    let objects = objects_table(lua)?;

    if let Some(cached) = objects.raw_get::<Option<AnyUserData>>(key)? {
        let reusable = cached
            .borrow::<Proxy>()
            .map(|proxy| proxy.object().is_some_and(|o| o.ptr_eq(object)))
            .unwrap_or(false);
        if reusable {
            return Ok(cached);
        }
        trace!(
            target: "lunabridge::proxy",
            ty = ty.name(),
            identity = %object.identity(),
            "evicting stale proxy"
        );
    }

    let proxy = lua.create_userdata(Proxy::new(ty, object.retain()))?;
    objects.raw_set(key, proxy.clone())?;
    Ok(proxy)
}

/// Push a typed object under its own descriptor.
pub fn push_object<T: Object>(lua: &Lua, object: &StrongRef<T>) -> mlua::Result<AnyUserData> {
    push_existing(lua, object.type_info(), &object.to_object())
}

/// Push a fresh proxy without consulting or updating the identity cache.
///
/// Takes over the caller's reference. Meant for objects that will never be
/// pushed again, such as module singletons. If the same object is later
/// pushed with [`push_existing`], the two proxies are distinct userdata and
/// only compare equal through `__eq`; rawequal and table keys tell them apart.
pub fn push_new(
    lua: &Lua,
    ty: &'static Type,
    object: StrongRef<dyn Object>,
) -> mlua::Result<AnyUserData> {
    lua.create_userdata(Proxy::new(ty, object))
}

/// Explicitly release a proxy's object.
///
/// Returns `false` if the proxy was already released. The cache entry is
/// removed when it still points at this proxy.
pub fn release_proxy(lua: &Lua, userdata: &AnyUserData) -> mlua::Result<bool> {
    let taken = userdata.borrow_mut::<Proxy>()?.take();
    let Some(object) = taken else {
        return Ok(false);
    };

    let key = object.identity().as_i64();
    let objects = objects_table(lua)?;
    if let Some(cached) = objects.raw_get::<Option<AnyUserData>>(key)? {
        if cached == *userdata {
            objects.raw_set(key, Value::Nil)?;
        }
    }

    trace!(
        target: "lunabridge::proxy",
        ty = object.type_info().name(),
        identity = %object.identity(),
        "released proxy"
    );
    object.release();
    Ok(true)
}

/// Number of entries currently in the state's identity cache.
///
/// Entries of unreachable proxies are counted until the next collection.
pub fn live_proxy_count(lua: &Lua) -> mlua::Result<usize> {
    let objects = objects_table(lua)?;
    let mut count = 0;
    for pair in objects.pairs::<Value, Value>() {
        pair?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use lunabridge_core::{OBJECT_TYPE, impl_object};

    use super::*;

    static PROBE: Type = Type::new("RegistryProbe", Some(&OBJECT_TYPE));

    struct Probe {
        drops: Arc<AtomicUsize>,
    }
    impl_object!(Probe, PROBE);

    impl Drop for Probe {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn probe() -> (StrongRef<Probe>, Arc<AtomicUsize>) {
        let drops = Arc::new(AtomicUsize::new(0));
        let obj = StrongRef::new(Probe {
            drops: Arc::clone(&drops),
        });
        (obj, drops)
    }

    fn collect(lua: &Lua) {
        lua.gc_collect().unwrap();
        lua.gc_collect().unwrap();
    }

    #[test]
    fn repeated_push_reuses_proxy() {
        let lua = Lua::new();
        let (obj, _) = probe();

        let a = push_object(&lua, &obj).unwrap();
        let b = push_object(&lua, &obj).unwrap();
        assert_eq!(a, b);
        assert_eq!(obj.ref_count(), 2);
        assert_eq!(live_proxy_count(&lua).unwrap(), 1);
    }

    #[test]
    fn collection_releases_exactly_once() {
        let lua = Lua::new();
        let (obj, drops) = probe();

        for _ in 0..10 {
            push_object(&lua, &obj).unwrap();
        }
        assert_eq!(obj.ref_count(), 2);

        collect(&lua);
        assert_eq!(obj.ref_count(), 1);
        assert_eq!(live_proxy_count(&lua).unwrap(), 0);
        drop(obj);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn explicit_release_then_collection_does_not_double_release() {
        let lua = Lua::new();
        let (obj, _) = probe();

        let proxy = push_object(&lua, &obj).unwrap();
        assert!(release_proxy(&lua, &proxy).unwrap());
        assert_eq!(obj.ref_count(), 1);
        assert!(!release_proxy(&lua, &proxy).unwrap());

        drop(proxy);
        collect(&lua);
        assert_eq!(obj.ref_count(), 1);
    }

    #[test]
    fn released_proxy_is_evicted() {
        let lua = Lua::new();
        let (obj, _) = probe();

        let first = push_object(&lua, &obj).unwrap();
        release_proxy(&lua, &first).unwrap();
        assert_eq!(live_proxy_count(&lua).unwrap(), 0);

        let second = push_object(&lua, &obj).unwrap();
        assert_ne!(first, second);
        assert!(!second.borrow::<Proxy>().unwrap().is_released());
        assert_eq!(obj.ref_count(), 2);
    }

    #[test]
    fn push_new_bypasses_cache() {
        let lua = Lua::new();
        let (obj, _) = probe();

        let cached = push_object(&lua, &obj).unwrap();
        let fresh = push_new(&lua, &PROBE, obj.to_object()).unwrap();
        assert_ne!(cached, fresh);
        assert_eq!(live_proxy_count(&lua).unwrap(), 1);
        assert_eq!(obj.ref_count(), 3);

        drop(fresh);
        collect(&lua);
        assert_eq!(obj.ref_count(), 2);
    }

    #[test]
    fn closing_state_releases_proxies() {
        let (obj, _) = probe();
        {
            let lua = Lua::new();
            push_object(&lua, &obj).unwrap();
            assert_eq!(obj.ref_count(), 2);
        }
        assert_eq!(obj.ref_count(), 1);
    }
}
