//! Wizard Cursor and Session
//!
//! The cursor walks the list of *visible* steps, not the descriptor's steps.
//! The session owns one wizard run: the shared descriptor, the user's
//! selections and the cursor. Every mutation re-derives flags and visible
//! steps and clamps the cursor before returning, so a caller can never
//! observe a cursor pointing past the end of the visible list.
//!
//! # Flow
//!
//! ```text
//! load descriptor ──► initialize_defaults ──► WizardSession
//!                                                 │
//!        select_plugin / go_next / go_back ◄──────┤  (re-derive + clamp)
//!                                                 │
//!                                     finish() ──► Selections
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::descriptor::{InstallerDescriptor, Step};
use crate::logic::dependency::{FlagMap, InstalledFiles};
use crate::logic::flags::{compute_flags, visible_steps};
use crate::logic::plugin_type::resolve_type;
use crate::logic::selection::{can_advance, initialize_defaults, validate_group, Selections};
use crate::types::{PluginType, SelectionRule};

// ============================================================================
// Cursor
// ============================================================================

/// Position within the visible-steps list.
///
/// # Invariant
///
/// After [`WizardCursor::clamp`] with the current list length `n`, the
/// position is in `[0, max(n, 1) - 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WizardCursor {
    position: usize,
}

impl WizardCursor {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Move forward unless already on the last visible step.
    pub fn go_next(&mut self, visible_len: usize) -> bool {
        if self.position + 1 < visible_len {
            self.position += 1;
            true
        } else {
            false
        }
    }

    /// Move back unless already on the first step.
    pub fn go_back(&mut self) -> bool {
        if self.position > 0 {
            self.position -= 1;
            true
        } else {
            false
        }
    }

    /// True on the last visible step, and when there are no visible steps.
    pub fn is_last_step(&self, visible_len: usize) -> bool {
        self.position + 1 >= visible_len
    }

    #[inline]
    pub fn can_go_back(&self) -> bool {
        self.position > 0
    }

    /// Pull the cursor back inside a list of `visible_len` steps.
    pub fn clamp(&mut self, visible_len: usize) {
        let max = visible_len.saturating_sub(1);
        if self.position > max {
            debug!("Clamping wizard cursor {} -> {}", self.position, max);
            self.position = max;
        }
    }
}

// ============================================================================
// Views
// ============================================================================

/// A plugin as the UI should present it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginView {
    pub index: usize,
    pub name: String,
    pub plugin_type: PluginType,
    pub selected: bool,
    pub selectable: bool,
}

/// A group with its resolved plugins and validity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupView {
    pub index: usize,
    pub name: String,
    pub rule: SelectionRule,
    pub valid: bool,
    pub plugins: Vec<PluginView>,
}

/// One visible step, fully resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepView {
    pub index: usize,
    pub name: String,
    pub can_advance: bool,
    pub groups: Vec<GroupView>,
}

/// Everything derived from the current selections
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WizardReport {
    pub module_name: String,
    pub flags: FlagMap,
    pub visible_steps: Vec<usize>,
    pub steps: Vec<StepView>,
    /// Indices into `conditional_file_installs` whose dependency holds
    pub active_conditional_installs: Vec<usize>,
    pub complete: bool,
}

// ============================================================================
// Session
// ============================================================================

/// One wizard run over a shared descriptor.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use fomod_wizard::descriptor::{CompositeDependency, Group, InstallerDescriptor, Plugin, Step};
/// use fomod_wizard::types::{PluginType, SelectionRule};
/// use fomod_wizard::wizard::WizardSession;
///
/// let descriptor = InstallerDescriptor {
///     module_name: "Demo".into(),
///     steps: vec![
///         Step::new("Main", vec![Group::new(
///             "Mode",
///             SelectionRule::AtMostOne,
///             vec![Plugin::new("Extra", PluginType::Optional).with_flag("extra", "on")],
///         )]),
///         Step::new("Extras", vec![])
///             .with_visible(CompositeDependency::flag("extra", "on")),
///     ],
///     ..Default::default()
/// };
///
/// let mut session = WizardSession::new(Arc::new(descriptor));
/// assert_eq!(session.visible_steps(), &[0]);
///
/// session.select_plugin(0, 0);
/// assert_eq!(session.visible_steps(), &[0, 1]);
/// assert!(session.go_next());
/// assert_eq!(session.current_step_index(), Some(1));
/// ```
#[derive(Debug, Clone)]
pub struct WizardSession {
    descriptor: Arc<InstallerDescriptor>,
    selections: Selections,
    installed: Option<InstalledFiles>,
    cursor: WizardCursor,
    flags: FlagMap,
    visible: Vec<usize>,
}

impl WizardSession {
    /// Start a session with default selections.
    pub fn new(descriptor: Arc<InstallerDescriptor>) -> Self {
        let selections = initialize_defaults(&descriptor);
        Self::with_selections(descriptor, selections)
    }

    /// Resume a session from previously saved selections.
    pub fn with_selections(descriptor: Arc<InstallerDescriptor>, selections: Selections) -> Self {
        let stale = selections.stale_entries(&descriptor);
        if !stale.is_empty() {
            warn!("{} selection entries do not match the descriptor and are ignored", stale.len());
        }

        let mut session = Self {
            descriptor,
            selections,
            installed: None,
            cursor: WizardCursor::new(),
            flags: FlagMap::new(),
            visible: Vec::new(),
        };
        session.refresh();
        session
    }

    /// Evaluate file conditions against an installed-file snapshot.
    pub fn with_installed_files(mut self, installed: InstalledFiles) -> Self {
        self.installed = Some(installed);
        self.refresh();
        self
    }

    /// Re-derive flags and visible steps, then clamp the cursor.
    fn refresh(&mut self) {
        let installed = self.installed.as_ref();
        self.flags = compute_flags(&self.descriptor, &self.selections, installed);
        self.visible = visible_steps(&self.descriptor, &self.flags, installed);
        self.cursor.clamp(self.visible.len());
    }

    pub fn descriptor(&self) -> &InstallerDescriptor {
        &self.descriptor
    }

    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    pub fn into_selections(self) -> Selections {
        self.selections
    }

    pub fn installed_files(&self) -> Option<&InstalledFiles> {
        self.installed.as_ref()
    }

    pub fn flags(&self) -> &FlagMap {
        &self.flags
    }

    /// Original indices of the visible steps, in order
    pub fn visible_steps(&self) -> &[usize] {
        &self.visible
    }

    pub fn cursor(&self) -> WizardCursor {
        self.cursor
    }

    /// Original index of the step under the cursor
    pub fn current_step_index(&self) -> Option<usize> {
        self.visible.get(self.cursor.position()).copied()
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.current_step_index()
            .and_then(|idx| self.descriptor.step(idx))
    }

    pub fn is_last_step(&self) -> bool {
        self.cursor.is_last_step(self.visible.len())
    }

    /// Whether the active step's groups all accept their selections
    pub fn can_advance(&self) -> bool {
        self.current_step_index()
            .is_some_and(|idx| can_advance(&self.descriptor, &self.selections, idx))
    }

    /// Whether "next" should be enabled
    pub fn can_go_next(&self) -> bool {
        !self.is_last_step() && self.can_advance()
    }

    pub fn can_go_back(&self) -> bool {
        self.cursor.can_go_back()
    }

    /// Advance to the next visible step if the active step is complete.
    pub fn go_next(&mut self) -> bool {
        if !self.can_advance() {
            debug!("Next refused: step {:?} has unsatisfied groups", self.current_step_index());
            return false;
        }
        self.cursor.go_next(self.visible.len())
    }

    pub fn go_back(&mut self) -> bool {
        self.cursor.go_back()
    }

    /// Resolved type of a plugin under the current flags
    pub fn plugin_type(&self, step: usize, group: usize, plugin: usize) -> Option<PluginType> {
        self.descriptor
            .plugin(step, group, plugin)
            .map(|p| resolve_type(p, &self.flags, self.installed.as_ref()))
    }

    /// Click a plugin in the active step.
    pub fn select_plugin(&mut self, group: usize, plugin: usize) -> bool {
        match self.current_step_index() {
            Some(step) => self.select_plugin_at(step, group, plugin),
            None => false,
        }
    }

    /// Click a plugin in any step.
    ///
    /// Returns `false` (and changes nothing) for plugins that do not exist,
    /// and for unselected plugins that currently resolve to `NotUsable`. A
    /// selected plugin can always be clicked so it can be unchecked.
    pub fn select_plugin_at(&mut self, step: usize, group: usize, plugin: usize) -> bool {
        let Some(rule) = self
            .descriptor
            .step(step)
            .and_then(|s| s.groups.get(group))
            .map(|g| g.rule)
        else {
            warn!("Ignoring click on unknown group {}/{}", step, group);
            return false;
        };

        match self.plugin_type(step, group, plugin) {
            None => {
                warn!("Ignoring click on unknown plugin {}/{}/{}", step, group, plugin);
                return false;
            }
            Some(PluginType::NotUsable) if !self.selections.is_selected(step, group, plugin) => {
                debug!("Ignoring click on unusable plugin {}/{}/{}", step, group, plugin);
                return false;
            }
            Some(_) => {}
        }

        self.selections.select_plugin(step, group, plugin, rule);
        self.refresh();
        debug!(
            "Selected {}/{}/{}: {} flags, {} visible steps",
            step,
            group,
            plugin,
            self.flags.len(),
            self.visible.len()
        );
        true
    }

    /// Resolved view of a step, or `None` for an unknown index
    pub fn step_view(&self, step: usize) -> Option<StepView> {
        let s = self.descriptor.step(step)?;
        let installed = self.installed.as_ref();

        let groups = s
            .groups
            .iter()
            .enumerate()
            .map(|(group_idx, group)| {
                let selected = self.selections.selected(step, group_idx);
                let plugins = group
                    .plugins
                    .iter()
                    .enumerate()
                    .map(|(plugin_idx, plugin)| {
                        let plugin_type = resolve_type(plugin, &self.flags, installed);
                        PluginView {
                            index: plugin_idx,
                            name: plugin.name.clone(),
                            plugin_type,
                            selected: selected.contains(&plugin_idx),
                            selectable: plugin_type.is_selectable(),
                        }
                    })
                    .collect();
                GroupView {
                    index: group_idx,
                    name: group.name.clone(),
                    rule: group.rule,
                    valid: validate_group(group, selected),
                    plugins,
                }
            })
            .collect();

        Some(StepView {
            index: step,
            name: s.name.clone(),
            can_advance: can_advance(&self.descriptor, &self.selections, step),
            groups,
        })
    }

    /// True when every visible step accepts its selections
    pub fn is_complete(&self) -> bool {
        self.visible
            .iter()
            .all(|&idx| can_advance(&self.descriptor, &self.selections, idx))
    }

    /// Snapshot of every derived value for the visible steps
    pub fn report(&self) -> WizardReport {
        let active_conditional_installs = self
            .descriptor
            .active_conditional_installs(&self.flags, self.installed.as_ref());

        WizardReport {
            module_name: self.descriptor.module_name.clone(),
            flags: self.flags.clone(),
            visible_steps: self.visible.clone(),
            steps: self
                .visible
                .iter()
                .filter_map(|&idx| self.step_view(idx))
                .collect(),
            active_conditional_installs,
            complete: self.is_complete(),
        }
    }

    /// Final selections, if every visible step is complete.
    pub fn finish(self) -> Option<Selections> {
        self.is_complete().then_some(self.selections)
    }
}
