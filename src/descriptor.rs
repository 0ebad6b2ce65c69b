//! Installer descriptor data model.
//!
//! A descriptor is the immutable tree of steps, groups and plugins that a
//! wizard session walks. It is loaded once (from JSON or from a raw
//! `ModuleConfig.xml`), validated eagerly, and then shared read-only.
//!
//! # JSON Format
//!
//! ```json
//! {
//!   "module_name": "Better Textures",
//!   "steps": [
//!     {
//!       "name": "Resolution",
//!       "groups": [
//!         {
//!           "name": "Pick one",
//!           "type": "SelectExactlyOne",
//!           "plugins": [
//!             {
//!               "name": "4K",
//!               "condition_flags": [{ "name": "res", "value": "4k" }],
//!               "type_descriptor": { "default_type": "Recommended" }
//!             }
//!           ]
//!         }
//!       ]
//!     },
//!     {
//!       "name": "4K extras",
//!       "visible": { "kind": "flag", "name": "res", "value": "4k" },
//!       "groups": []
//!     }
//!   ]
//! }
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Result, WizardError};
use crate::logic::dependency::{evaluate, FlagMap, InstalledFiles};
use crate::types::{DependencyOperator, FileState, PluginType, SelectionRule};

/// Deepest nesting of composite dependencies accepted at load time.
///
/// Each dependency level costs two JSON nesting levels; descriptors at this
/// depth must still load under serde_json's recursion limit of 128.
pub const MAX_DEPENDENCY_DEPTH: usize = 32;

/// Source → destination pair copied at install time. Opaque to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMapping {
    pub source: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub is_folder: bool,
}

/// Flag written when the owning plugin is selected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSetter {
    pub name: String,
    pub value: String,
}

impl FlagSetter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Boolean expression tree over flag and file conditions.
///
/// Each node owns its children; there is no sharing between subtrees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompositeDependency {
    /// True iff `flags[name] == value` (a missing flag reads as "")
    Flag { name: String, value: String },
    /// True iff the installed-file snapshot agrees with `state`
    File { path: String, state: FileState },
    /// Conjunction or disjunction of the children. Empty is always true.
    Node {
        operator: DependencyOperator,
        #[serde(default)]
        children: Vec<CompositeDependency>,
    },
}

impl CompositeDependency {
    pub fn flag(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Flag {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn file(path: impl Into<String>, state: FileState) -> Self {
        Self::File {
            path: path.into(),
            state,
        }
    }

    pub fn and(children: Vec<CompositeDependency>) -> Self {
        Self::Node {
            operator: DependencyOperator::And,
            children,
        }
    }

    pub fn or(children: Vec<CompositeDependency>) -> Self {
        Self::Node {
            operator: DependencyOperator::Or,
            children,
        }
    }

    /// Nesting depth of this tree (a leaf or an empty node is depth 1).
    pub fn depth(&self) -> usize {
        match self {
            Self::Flag { .. } | Self::File { .. } => 1,
            Self::Node { children, .. } => {
                1 + children.iter().map(Self::depth).max().unwrap_or(0)
            }
        }
    }
}

/// One ordered `(dependency, type)` rule of a type descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypePattern {
    pub dependency: CompositeDependency,
    #[serde(rename = "type")]
    pub plugin_type: PluginType,
}

/// How a plugin's [`PluginType`] is derived from the flag map
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub default_type: PluginType,
    #[serde(default)]
    pub patterns: Vec<TypePattern>,
}

impl TypeDescriptor {
    /// A descriptor with no patterns
    pub fn fixed(plugin_type: PluginType) -> Self {
        Self {
            default_type: plugin_type,
            patterns: Vec::new(),
        }
    }
}

/// A selectable option inside a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plugin {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_path: String,
    #[serde(default)]
    pub files: Vec<FileMapping>,
    #[serde(default)]
    pub condition_flags: Vec<FlagSetter>,
    #[serde(default)]
    pub type_descriptor: TypeDescriptor,
}

impl Plugin {
    /// Create a plugin with a fixed type and no files or flags
    pub fn new(name: impl Into<String>, plugin_type: PluginType) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            image_path: String::new(),
            files: Vec::new(),
            condition_flags: Vec::new(),
            type_descriptor: TypeDescriptor::fixed(plugin_type),
        }
    }

    /// Add a flag setter
    pub fn with_flag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.condition_flags.push(FlagSetter::new(name, value));
        self
    }

    /// Append a `(dependency, type)` pattern
    pub fn with_pattern(mut self, dependency: CompositeDependency, plugin_type: PluginType) -> Self {
        self.type_descriptor.patterns.push(TypePattern {
            dependency,
            plugin_type,
        });
        self
    }
}

/// A set of plugins governed by one selection rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    #[serde(rename = "type")]
    pub rule: SelectionRule,
    #[serde(default)]
    pub plugins: Vec<Plugin>,
}

impl Group {
    pub fn new(name: impl Into<String>, rule: SelectionRule, plugins: Vec<Plugin>) -> Self {
        Self {
            name: name.into(),
            rule,
            plugins,
        }
    }
}

/// One page of the wizard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<CompositeDependency>,
}

impl Step {
    pub fn new(name: impl Into<String>, groups: Vec<Group>) -> Self {
        Self {
            name: name.into(),
            groups,
            visible: None,
        }
    }

    /// Make the step conditional on `visible`
    pub fn with_visible(mut self, visible: CompositeDependency) -> Self {
        self.visible = Some(visible);
        self
    }
}

/// Files installed when the final flag map satisfies `dependency`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalInstallPattern {
    pub dependency: CompositeDependency,
    #[serde(default)]
    pub files: Vec<FileMapping>,
}

/// The full, immutable installer description
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InstallerDescriptor {
    #[serde(default)]
    pub module_name: String,
    #[serde(default)]
    pub module_image: String,
    #[serde(default)]
    pub required_install_files: Vec<FileMapping>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub conditional_file_installs: Vec<ConditionalInstallPattern>,
}

/// Position of a node inside a descriptor, used in error messages
#[derive(Debug, Clone, Copy)]
struct Location<'a> {
    step: usize,
    step_name: &'a str,
    group: Option<usize>,
    plugin: Option<usize>,
}

impl fmt::Display for Location<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} \"{}\"", self.step, self.step_name)?;
        if let Some(group) = self.group {
            write!(f, " / group {}", group)?;
        }
        if let Some(plugin) = self.plugin {
            write!(f, " / plugin {}", plugin)?;
        }
        Ok(())
    }
}

fn check_depth(dep: &CompositeDependency, what: impl fmt::Display) -> Result<()> {
    let depth = dep.depth();
    if depth > MAX_DEPENDENCY_DEPTH {
        return Err(WizardError::descriptor(format!(
            "{}: dependency nested {} levels deep (max {})",
            what, depth, MAX_DEPENDENCY_DEPTH
        )));
    }
    Ok(())
}

impl InstallerDescriptor {
    /// Parse and validate a JSON descriptor
    pub fn from_json(json: &str) -> Result<Self> {
        let descriptor: Self = serde_json::from_str(json)?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a descriptor from disk.
    ///
    /// Files ending in `.xml` are parsed as FOMOD `ModuleConfig.xml`,
    /// everything else as JSON.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let is_xml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));

        let descriptor = if is_xml {
            let bytes = fs::read(path)
                .with_context(|| format!("Failed to read module config from {:?}", path))?;
            crate::module_config::parse_module_config(&bytes)
                .with_context(|| format!("Failed to load module config {:?}", path))?
        } else {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read descriptor from {:?}", path))?;
            Self::from_json(&content)
                .with_context(|| format!("Failed to load descriptor {:?}", path))?
        };

        info!(
            "Loaded descriptor '{}' ({} steps) from {:?}",
            descriptor.module_name,
            descriptor.total_steps(),
            path
        );
        Ok(descriptor)
    }

    /// Save the descriptor as JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let json = self
            .to_json_pretty()
            .context("Failed to serialize descriptor to JSON")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write descriptor to {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Validate structural invariants the evaluator relies on.
    ///
    /// Rejects dependency trees nested deeper than [`MAX_DEPENDENCY_DEPTH`]
    /// and flag setters without a name.
    pub fn validate(&self) -> Result<()> {
        for (step_idx, step) in self.steps.iter().enumerate() {
            let step_loc = Location {
                step: step_idx,
                step_name: &step.name,
                group: None,
                plugin: None,
            };
            if let Some(visible) = &step.visible {
                check_depth(visible, format_args!("{} visibility", step_loc))?;
            }

            for (group_idx, group) in step.groups.iter().enumerate() {
                for (plugin_idx, plugin) in group.plugins.iter().enumerate() {
                    let loc = Location {
                        group: Some(group_idx),
                        plugin: Some(plugin_idx),
                        ..step_loc
                    };
                    if plugin.condition_flags.iter().any(|f| f.name.is_empty()) {
                        return Err(WizardError::descriptor(format!(
                            "{}: flag setter with empty name",
                            loc
                        )));
                    }
                    for (i, pattern) in plugin.type_descriptor.patterns.iter().enumerate() {
                        check_depth(&pattern.dependency, format_args!("{} type pattern {}", loc, i))?;
                    }
                }
            }
        }

        for (i, pattern) in self.conditional_file_installs.iter().enumerate() {
            check_depth(&pattern.dependency, format_args!("conditional install {}", i))?;
        }

        debug!("Descriptor '{}' passed validation", self.module_name);
        Ok(())
    }

    /// Number of steps, visible or not
    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    /// Step by original index
    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Plugin by `(step, group, plugin)` original indices
    pub fn plugin(&self, step: usize, group: usize, plugin: usize) -> Option<&Plugin> {
        self.steps
            .get(step)?
            .groups
            .get(group)?
            .plugins
            .get(plugin)
    }

    /// Indices of the conditional install patterns whose dependency holds
    /// under `flags`.
    ///
    /// Only decides which patterns apply; expanding them into files is the
    /// installer's job.
    pub fn active_conditional_installs(
        &self,
        flags: &FlagMap,
        installed: Option<&InstalledFiles>,
    ) -> Vec<usize> {
        self.conditional_file_installs
            .iter()
            .enumerate()
            .filter(|(_, pattern)| evaluate(&pattern.dependency, flags, installed))
            .map(|(idx, _)| idx)
            .collect()
    }
}
