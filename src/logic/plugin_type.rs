//! Plugin type resolution.
//!
//! Patterns are tried in order and the first whose dependency holds decides
//! the type. There is no "most specific" tie-breaking.

use crate::descriptor::Plugin;
use crate::logic::dependency::{evaluate, FlagMap, InstalledFiles};
use crate::types::PluginType;

/// Resolve the effective type of `plugin` under `flags`.
pub fn resolve_type(
    plugin: &Plugin,
    flags: &FlagMap,
    installed: Option<&InstalledFiles>,
) -> PluginType {
    let descriptor = &plugin.type_descriptor;
    descriptor
        .patterns
        .iter()
        .find(|pattern| evaluate(&pattern.dependency, flags, installed))
        .map_or(descriptor.default_type, |pattern| pattern.plugin_type)
}
