//! Per-state bridge configuration.

use mlua::{Lua, Table};
use tracing::debug;

use crate::namespace::insist_root;
use crate::pinned::insist_pinned_thread;
use crate::register::types_table;

/// Default name of the global table holding every module namespace.
pub const DEFAULT_ROOT_NAMESPACE: &str = "luna";

/// Settings of one script state.
///
/// # Example
///
/// ```
/// use lunabridge_runtime::BridgeConfig;
///
/// let config = BridgeConfig::default()
///     .with_root_namespace("game")
///     .with_deprecation_warnings(false);
/// assert_eq!(config.root_namespace, "game");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Global table under which modules install their namespaces.
    pub root_namespace: String,

    /// Log a warning on the first use of each deprecated API.
    pub deprecation_warnings: bool,

    /// Prefix of the OS thread names given to script threads.
    pub thread_name_prefix: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            root_namespace: DEFAULT_ROOT_NAMESPACE.to_string(),
            deprecation_warnings: true,
            thread_name_prefix: "lunabridge-thread".to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn with_root_namespace(mut self, name: impl Into<String>) -> Self {
        self.root_namespace = name.into();
        self
    }

    pub fn with_deprecation_warnings(mut self, enabled: bool) -> Self {
        self.deprecation_warnings = enabled;
        self
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }
}

/// The state's configuration, or the default if none was installed.
pub fn config(lua: &Lua) -> BridgeConfig {
    lua.app_data_ref::<BridgeConfig>()
        .map(|c| c.clone())
        .unwrap_or_default()
}

/// Prepare a state for the bridge.
///
/// Installs `config`, creates the root namespace and the `Object` base
/// methods, and pins the calling thread. Returns the root table.
pub fn init_state(lua: &Lua, config: BridgeConfig) -> mlua::Result<Table> {
    debug!(
        target: "lunabridge::state",
        root = %config.root_namespace,
        "initializing state"
    );
    lua.set_app_data(config);
    types_table(lua)?;
    insist_pinned_thread(lua)?;
    insist_root(lua)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.root_namespace, "luna");
        assert!(config.deprecation_warnings);
    }

    #[test]
    fn uninitialized_state_uses_default() {
        let lua = Lua::new();
        assert_eq!(config(&lua), BridgeConfig::default());
    }

    #[test]
    fn init_state_installs_config_and_root() {
        let lua = Lua::new();
        let root = init_state(&lua, BridgeConfig::default().with_root_namespace("game")).unwrap();
        assert_eq!(config(&lua).root_namespace, "game");
        let global: Table = lua.globals().get("game").unwrap();
        assert_eq!(global, root);
    }
}
