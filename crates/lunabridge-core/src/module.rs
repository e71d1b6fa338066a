//! Module singletons.
//!
//! A module is a native object that owns one engine subsystem. At most one
//! instance of each module type is alive per process; every script state that
//! opens the module shares it.

use std::fmt;

use crate::Object;

/// Which subsystem a module implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModuleKind {
    Audio,
    Data,
    Event,
    Filesystem,
    Font,
    Graphics,
    Image,
    Joystick,
    Keyboard,
    Math,
    Mouse,
    Physics,
    Sound,
    System,
    Thread,
    Timer,
    Touch,
    Video,
    Window,
}

impl ModuleKind {
    /// Lower-case subsystem name, as used for namespaces.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKind::Audio => "audio",
            ModuleKind::Data => "data",
            ModuleKind::Event => "event",
            ModuleKind::Filesystem => "filesystem",
            ModuleKind::Font => "font",
            ModuleKind::Graphics => "graphics",
            ModuleKind::Image => "image",
            ModuleKind::Joystick => "joystick",
            ModuleKind::Keyboard => "keyboard",
            ModuleKind::Math => "math",
            ModuleKind::Mouse => "mouse",
            ModuleKind::Physics => "physics",
            ModuleKind::Sound => "sound",
            ModuleKind::System => "system",
            ModuleKind::Thread => "thread",
            ModuleKind::Timer => "timer",
            ModuleKind::Touch => "touch",
            ModuleKind::Video => "video",
            ModuleKind::Window => "window",
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A subsystem singleton exposed to scripts.
///
/// Implementors use a [`Type`](crate::Type) deriving from
/// [`MODULE_TYPE`](crate::MODULE_TYPE).
pub trait Module: Object {
    /// Subsystem implemented by this module.
    fn kind(&self) -> ModuleKind;

    /// Implementation name, e.g. `"lunabridge.thread.std"`.
    fn name(&self) -> &'static str;
}
