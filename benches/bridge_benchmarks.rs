//! Benchmarks for the hot paths of the bridge.
//!
//! - proxy pushes through the identity cache, hit and miss
//! - argument marshaling of scalars and objects through a wrapped function
//! - variant conversion of nested tables
//!
//! ## Profiling with Puffin
//!
//! ```bash
//! cargo bench --features profile-with-puffin -- --profile-time 5
//! ```

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use lunabridge::lunabridge_runtime::{push_existing, push_variant, value_to_variant, wrap_function};
use lunabridge::prelude::*;
use mlua::{Function, Lua, Value};
use rustc_hash::FxHashSet;

#[cfg(feature = "profile-with-puffin")]
static FRAME_VIEW: std::sync::OnceLock<puffin::GlobalFrameView> = std::sync::OnceLock::new();

#[cfg(feature = "profile-with-puffin")]
fn setup_profiler() {
    puffin::set_scopes_on(true);
    FRAME_VIEW.get_or_init(puffin::GlobalFrameView::default);
}

#[cfg(not(feature = "profile-with-puffin"))]
fn setup_profiler() {}

#[cfg(feature = "profile-with-puffin")]
fn end_profiling_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}

#[cfg(not(feature = "profile-with-puffin"))]
fn end_profiling_frame() {}

static SPRITE_TYPE: Type = Type::new("BenchSprite", Some(&OBJECT_TYPE));

struct Sprite {
    x: f64,
}
impl_object!(Sprite, SPRITE_TYPE);

fn bench_state() -> Lua {
    let lua = new_state().unwrap();
    register_type(
        &lua,
        &SPRITE_TYPE,
        vec![FunctionReg::new("getX", |ctx: &mut CallContext<'_>| {
            let sprite = ctx.check_type::<Sprite>(1)?;
            ctx.push_number(sprite.x);
            Ok(1)
        })],
    )
    .unwrap();
    lua
}

fn proxy_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let lua = bench_state();
    let mut group = c.benchmark_group("proxy");

    let sprite = StrongRef::new(Sprite { x: 1.0 }).into_object();
    let held = push_existing(&lua, &SPRITE_TYPE, &sprite).unwrap();
    group.bench_function("push_existing_hit", |b| {
        b.iter(|| {
            let ud = push_existing(&lua, &SPRITE_TYPE, black_box(&sprite)).unwrap();
            end_profiling_frame();
            black_box(ud)
        });
    });
    drop(held);

    group.bench_function("push_existing_miss", |b| {
        b.iter(|| {
            let fresh = StrongRef::new(Sprite { x: 2.0 }).into_object();
            let ud = push_existing(&lua, &SPRITE_TYPE, &fresh).unwrap();
            end_profiling_frame();
            black_box(ud)
        });
    });
    group.finish();
}

fn marshaling_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let lua = bench_state();
    let mut group = c.benchmark_group("marshaling");

    let add = wrap_function(
        &lua,
        "add",
        NativeFn::new(|ctx: &mut CallContext<'_>| {
            let sum = ctx.check_number(1)? + ctx.check_number(2)?;
            ctx.push_number(sum);
            Ok(1)
        }),
    )
    .unwrap();
    lua.globals().set("add", add).unwrap();
    let sprite = StrongRef::new(Sprite { x: 3.0 });
    lua.globals()
        .set("sprite", push_object(&lua, &sprite).unwrap())
        .unwrap();

    let scalar_loop: Function = lua
        .load("return function() local s = 0 for i = 1, 100 do s = add(s, i) end return s end")
        .eval()
        .unwrap();
    group.bench_function("scalar_args_x100", |b| {
        b.iter(|| {
            let n: f64 = scalar_loop.call(()).unwrap();
            end_profiling_frame();
            black_box(n)
        });
    });

    let method_loop: Function = lua
        .load("return function() local s = 0 for i = 1, 100 do s = s + sprite:getX() end return s end")
        .eval()
        .unwrap();
    group.bench_function("object_method_x100", |b| {
        b.iter(|| {
            let n: f64 = method_loop.call(()).unwrap();
            end_profiling_frame();
            black_box(n)
        });
    });
    group.finish();
}

fn variant_benchmarks(c: &mut Criterion) {
    let lua = bench_state();
    let mut group = c.benchmark_group("variant");

    let table: Value = lua
        .load("local t = {} for i = 1, 64 do t[i] = { id = i, name = 'item' .. i, tags = { 'a', 'b' } } end return t")
        .eval()
        .unwrap();
    group.bench_function("table_to_variant", |b| {
        b.iter(|| {
            let variant = value_to_variant(black_box(&table), false, &mut FxHashSet::default()).unwrap();
            black_box(variant)
        });
    });

    let variant = value_to_variant(&table, false, &mut FxHashSet::default()).unwrap();
    group.bench_function("variant_to_table", |b| {
        b.iter(|| black_box(push_variant(&lua, black_box(&variant)).unwrap()));
    });
    group.finish();
}

criterion_group!(
    benches,
    proxy_benchmarks,
    marshaling_benchmarks,
    variant_benchmarks
);
criterion_main!(benches);
