//! FOMOD Wizard Library
//!
//! This library provides the evaluation engine behind a FOMOD-style
//! conditional installer wizard: dependency evaluation, flag accumulation,
//! step visibility, plugin type resolution, selection validation and the
//! wizard cursor.

pub mod cli;
pub mod descriptor;
pub mod error;
pub mod logic;
pub mod module_config;
pub mod types;
pub mod wizard;

// Re-export main types for convenience
pub use descriptor::{
    CompositeDependency, ConditionalInstallPattern, FileMapping, FlagSetter, Group,
    InstallerDescriptor, Plugin, Step, TypeDescriptor, TypePattern,
};
pub use error::{Result, WizardError};
pub use logic::selection::{group_validity, StaleEntry};
pub use logic::{
    can_advance, compute_flags, evaluate, initialize_defaults, is_step_visible, resolve_type,
    validate_group, visible_steps, FlagMap, InstalledFiles, Selections,
};
pub use module_config::parse_module_config;
pub use types::{DependencyOperator, FileState, PluginType, SelectionRule, SortOrder};
pub use wizard::{GroupView, PluginView, StepView, WizardCursor, WizardReport, WizardSession};
