//! Flag accumulation and step visibility.
//!
//! Flags are folded in a single left-to-right pass over the steps. Each
//! step's visibility is checked against the flags accumulated *so far*, so a
//! step can only be influenced by the steps before it. The pass is complete
//! after one iteration; it is never re-run to a fixpoint.

use tracing::trace;

use crate::descriptor::InstallerDescriptor;
use crate::logic::dependency::{is_step_visible, FlagMap, InstalledFiles};
use crate::logic::selection::Selections;

/// Derive the flag map for the current selections.
///
/// Hidden steps contribute nothing, even if the user selected plugins in
/// them before they were hidden. Setters overwrite earlier values for the
/// same name (last writer wins). Selection entries pointing at plugins that
/// do not exist are ignored.
pub fn compute_flags(
    descriptor: &InstallerDescriptor,
    selections: &Selections,
    installed: Option<&InstalledFiles>,
) -> FlagMap {
    let mut flags = FlagMap::new();

    for (step_idx, step) in descriptor.steps.iter().enumerate() {
        if !is_step_visible(step, &flags, installed) {
            trace!("Step {} '{}' hidden while accumulating flags", step_idx, step.name);
            continue;
        }

        for (group_idx, group) in step.groups.iter().enumerate() {
            for &plugin_idx in selections.selected(step_idx, group_idx) {
                let Some(plugin) = group.plugins.get(plugin_idx) else {
                    continue;
                };
                for setter in &plugin.condition_flags {
                    flags.insert(setter.name.clone(), setter.value.clone());
                }
            }
        }
    }

    flags
}

/// Original indices of the steps visible under the final flag map.
pub fn visible_steps(
    descriptor: &InstallerDescriptor,
    flags: &FlagMap,
    installed: Option<&InstalledFiles>,
) -> Vec<usize> {
    descriptor
        .steps
        .iter()
        .enumerate()
        .filter(|(_, step)| is_step_visible(step, flags, installed))
        .map(|(idx, _)| idx)
        .collect()
}
