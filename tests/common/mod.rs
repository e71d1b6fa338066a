//! Shared fixtures for the integration tests.
//!
//! Provides a small object hierarchy registered in every test state and a
//! harness running the Lua files under `test_scripts/`.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};

use lunabridge::prelude::*;
use mlua::Lua;

pub static SHAPE_TYPE: Type = Type::new("TestShape", Some(&OBJECT_TYPE));
pub static CIRCLE_TYPE: Type = Type::new("TestCircle", Some(&SHAPE_TYPE));
pub static SOUND_TYPE: Type = Type::new("TestSound", Some(&OBJECT_TYPE));

/// Counts how many objects of a fixture type were destroyed.
#[derive(Clone, Default)]
pub struct DropCounter(Arc<AtomicUsize>);

impl DropCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Circle {
    pub radius: f64,
    drops: DropCounter,
}
impl_object!(Circle, CIRCLE_TYPE);

impl Circle {
    pub fn new(radius: f64, drops: &DropCounter) -> StrongRef<Circle> {
        StrongRef::new(Circle {
            radius,
            drops: drops.clone(),
        })
    }
}

impl Drop for Circle {
    fn drop(&mut self) {
        self.drops.hit();
    }
}

pub struct Sound;
impl_object!(Sound, SOUND_TYPE);

fn open_fixture_types(lua: &Lua) -> mlua::Result<()> {
    register_type(
        lua,
        &SHAPE_TYPE,
        vec![FunctionReg::new("isShape", |ctx: &mut CallContext<'_>| {
            ctx.push_boolean(true);
            Ok(1)
        })],
    )?;
    register_type(
        lua,
        &CIRCLE_TYPE,
        vec![FunctionReg::new("getRadius", |ctx: &mut CallContext<'_>| {
            let circle = ctx.check_type::<Circle>(1)?;
            ctx.push_number(circle.radius);
            Ok(1)
        })],
    )?;
    register_type(lua, &SOUND_TYPE, Vec::new())
}

/// Route `tracing` output through the test writer once per binary.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A fully opened state with the fixture types registered.
pub fn state() -> Lua {
    init_tracing();
    let lua = new_state().expect("state");
    open_fixture_types(&lua).expect("fixture types");
    lua
}

/// Runs Lua files from `test_scripts/`.
pub struct ScriptHarness {
    scripts_dir: PathBuf,
}

impl ScriptHarness {
    pub fn new() -> Self {
        let scripts_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_scripts");
        Self { scripts_dir }
    }

    pub fn source(&self, filename: &str) -> String {
        let path = self.scripts_dir.join(filename);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
    }

    /// Run `filename` in `lua`; the script signals failure by raising.
    pub fn run(&self, lua: &Lua, filename: &str) -> mlua::Result<()> {
        lua.load(self.source(filename))
            .set_name(format!("@{filename}"))
            .exec()
    }

    /// Run `filename` in a fresh fixture state and panic with the Lua error.
    pub fn assert_passes(&self, filename: &str) -> Lua {
        let lua = state();
        if let Err(err) = self.run(&lua, filename) {
            panic!("{filename} failed:\n{err}");
        }
        lua
    }
}
