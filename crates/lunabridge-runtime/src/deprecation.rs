//! Tracking of deprecated API use.
//!
//! Native functions call [`mark_deprecated`] on entry. The first use of each
//! deprecated name in a state is recorded and, if enabled, logged.

use std::fmt;

use mlua::Lua;
use rustc_hash::FxHashMap;
use tracing::warn;

use crate::config::config;

/// What kind of API was deprecated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKind {
    Function,
    Method,
    Callback,
    Field,
}

impl ApiKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ApiKind::Function => "function",
            ApiKind::Method => "method",
            ApiKind::Callback => "callback",
            ApiKind::Field => "field",
        }
    }
}

/// How a deprecated API is superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeprecationKind {
    NoReplacement,
    Replaced,
    Renamed,
}

/// One deprecated API used by a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeprecationInfo {
    pub name: String,
    pub api: ApiKind,
    pub kind: DeprecationKind,
    pub replacement: Option<String>,
    pub uses: usize,
}

impl fmt::Display for DeprecationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Using deprecated {} {}", self.api.as_str(), self.name)?;
        match (self.kind, &self.replacement) {
            (DeprecationKind::Replaced, Some(r)) => write!(f, " (replaced by {r})"),
            (DeprecationKind::Renamed, Some(r)) => write!(f, " (renamed to {r})"),
            _ => Ok(()),
        }
    }
}

/// Per-state record, in order of first use.
#[derive(Default)]
struct Deprecations {
    entries: Vec<DeprecationInfo>,
    index: FxHashMap<String, usize>,
}

/// Record a use of a deprecated API.
///
/// Returns `true` on the first use of `name` in this state.
pub fn mark_deprecated(
    lua: &Lua,
    name: &str,
    api: ApiKind,
    kind: DeprecationKind,
    replacement: Option<&str>,
) -> bool {
    let warnings = config(lua).deprecation_warnings;
    if lua.app_data_ref::<Deprecations>().is_none() {
        lua.set_app_data(Deprecations::default());
    }
    let Some(mut record) = lua.app_data_mut::<Deprecations>() else {
        return false;
    };

    if let Some(&i) = record.index.get(name) {
        record.entries[i].uses += 1;
        return false;
    }

    let info = DeprecationInfo {
        name: name.to_string(),
        api,
        kind,
        replacement: replacement.map(str::to_string),
        uses: 1,
    };
    if warnings {
        warn!(target: "lunabridge::deprecation", "{info}");
    }
    let i = record.entries.len();
    record.index.insert(info.name.clone(), i);
    record.entries.push(info);
    true
}

/// Every deprecated API used by this state, in order of first use.
pub fn deprecations(lua: &Lua) -> Vec<DeprecationInfo> {
    lua.app_data_ref::<Deprecations>()
        .map(|record| record.entries.clone())
        .unwrap_or_default()
}
