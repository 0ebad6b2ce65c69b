//! Selection map, default selections, group validation and click handling.
//!
//! # Selection Rules
//!
//! | Rule         | Valid when     | Clicking a plugin |
//! |--------------|----------------|-------------------|
//! | `ExactlyOne` | exactly 1      | replaces the selection |
//! | `AtMostOne`  | always         | replaces, or clears when re-clicking the sole selection |
//! | `AtLeastOne` | at least 1     | toggles |
//! | `Any`        | always         | toggles |
//! | `All`        | always         | nothing (everything stays selected) |

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::descriptor::{Group, InstallerDescriptor};
use crate::error::Result;
use crate::types::{PluginType, SelectionRule};

static NO_SELECTION: BTreeSet<usize> = BTreeSet::new();

/// Selected plugins by `step index → group index → plugin indices`.
///
/// Indices refer to the original descriptor, never to the filtered list of
/// visible steps. Serializes as `{"0": {"1": [0, 2]}}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selections {
    steps: BTreeMap<usize, BTreeMap<usize, BTreeSet<usize>>>,
}

/// A selection entry that does not point at an existing plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StaleEntry {
    pub step: usize,
    pub group: usize,
    pub plugin: usize,
}

impl Selections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plugins selected in a group; empty if the group was never touched.
    pub fn selected(&self, step: usize, group: usize) -> &BTreeSet<usize> {
        self.steps
            .get(&step)
            .and_then(|groups| groups.get(&group))
            .unwrap_or(&NO_SELECTION)
    }

    pub fn is_selected(&self, step: usize, group: usize, plugin: usize) -> bool {
        self.selected(step, group).contains(&plugin)
    }

    /// Add a plugin to a group's selection without applying any rule
    pub fn insert(&mut self, step: usize, group: usize, plugin: usize) {
        self.group_mut(step, group).insert(plugin);
    }

    /// Replace a group's selection wholesale
    pub fn set_group(&mut self, step: usize, group: usize, plugins: BTreeSet<usize>) {
        *self.group_mut(step, group) = plugins;
    }

    fn group_mut(&mut self, step: usize, group: usize) -> &mut BTreeSet<usize> {
        self.steps.entry(step).or_default().entry(group).or_default()
    }

    /// Apply a user click on `plugin` according to the group's rule.
    pub fn select_plugin(&mut self, step: usize, group: usize, plugin: usize, rule: SelectionRule) {
        match rule {
            SelectionRule::ExactlyOne | SelectionRule::AtMostOne => {
                let current = self.group_mut(step, group);
                let reclick = rule == SelectionRule::AtMostOne
                    && current.len() == 1
                    && current.contains(&plugin);
                current.clear();
                if !reclick {
                    current.insert(plugin);
                }
            }
            SelectionRule::AtLeastOne | SelectionRule::Any => {
                let current = self.group_mut(step, group);
                if !current.remove(&plugin) {
                    current.insert(plugin);
                }
            }
            SelectionRule::All => {}
        }
    }

    /// Iterate over `(step, group, selected plugins)`
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &BTreeSet<usize>)> {
        self.steps.iter().flat_map(|(&step, groups)| {
            groups
                .iter()
                .map(move |(&group, plugins)| (step, group, plugins))
        })
    }

    /// Total number of selected plugins across all groups
    pub fn total_selected(&self) -> usize {
        self.iter().map(|(_, _, plugins)| plugins.len()).sum()
    }

    /// Entries that reference a step, group or plugin missing from `descriptor`.
    ///
    /// Derivations already skip these; this is for reporting.
    pub fn stale_entries(&self, descriptor: &InstallerDescriptor) -> Vec<StaleEntry> {
        self.iter()
            .flat_map(|(step, group, plugins)| {
                plugins.iter().map(move |&plugin| StaleEntry {
                    step,
                    group,
                    plugin,
                })
            })
            .filter(|e| descriptor.plugin(e.step, e.group, e.plugin).is_none())
            .collect()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load selections saved by [`Selections::save_to_file`]
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read selections from {:?}", path.as_ref()))?;
        Self::from_json(&content).context("Failed to parse selections JSON")
    }

    /// Save selections as JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let json = self
            .to_json_pretty()
            .context("Failed to serialize selections to JSON")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write selections to {:?}", path.as_ref()))?;
        Ok(())
    }
}

/// Build the selections a fresh wizard starts with.
///
/// - `All` groups select every plugin.
/// - Other groups select plugins whose *default* type is `Required` or
///   `Recommended`. No flags exist yet, so patterns are not consulted.
/// - An `ExactlyOne` group left empty falls back to its first plugin that
///   is not `NotUsable`. If every plugin is `NotUsable` it stays empty.
pub fn initialize_defaults(descriptor: &InstallerDescriptor) -> Selections {
    let mut selections = Selections::new();

    for (step_idx, step) in descriptor.steps.iter().enumerate() {
        for (group_idx, group) in step.groups.iter().enumerate() {
            let mut chosen: BTreeSet<usize> = match group.rule {
                SelectionRule::All => (0..group.plugins.len()).collect(),
                _ => group
                    .plugins
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.type_descriptor.default_type.is_preselected())
                    .map(|(idx, _)| idx)
                    .collect(),
            };

            if group.rule == SelectionRule::ExactlyOne && chosen.is_empty() {
                if let Some(idx) = group
                    .plugins
                    .iter()
                    .position(|p| p.type_descriptor.default_type != PluginType::NotUsable)
                {
                    chosen.insert(idx);
                }
            }

            selections.set_group(step_idx, group_idx, chosen);
        }
    }

    debug!(
        "Initialized {} default selections for '{}'",
        selections.total_selected(),
        descriptor.module_name
    );
    selections
}

/// Check a group's selection against its rule.
pub fn validate_group(group: &Group, selected: &BTreeSet<usize>) -> bool {
    group.rule.is_satisfied_by(selected.len())
}

/// Validity of every group in `step`, in group order.
pub fn group_validity(
    descriptor: &InstallerDescriptor,
    selections: &Selections,
    step: usize,
) -> Vec<bool> {
    descriptor
        .step(step)
        .map(|s| {
            s.groups
                .iter()
                .enumerate()
                .map(|(idx, group)| validate_group(group, selections.selected(step, idx)))
                .collect()
        })
        .unwrap_or_default()
}

/// Whether every group of `step` accepts the current selections.
///
/// A step index outside the descriptor can never be advanced past.
pub fn can_advance(descriptor: &InstallerDescriptor, selections: &Selections, step: usize) -> bool {
    descriptor.step(step).is_some_and(|s| {
        s.groups
            .iter()
            .enumerate()
            .all(|(idx, group)| validate_group(group, selections.selected(step, idx)))
    })
}
