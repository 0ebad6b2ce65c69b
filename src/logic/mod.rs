//! Logic modules: derive wizard decisions from a descriptor and selections.
//!
//! Every function here is pure: the same `(descriptor, selections, installed
//! files)` always yields the same flags, visible steps, plugin types and
//! validity. Nothing is cached between calls.
//!
//! # Modules
//!
//! - `dependency`: Composite dependency evaluation and the installed-file snapshot
//! - `flags`: Flag accumulation and step visibility
//! - `plugin_type`: Ordered pattern resolution of plugin types
//! - `selection`: Selection map, defaults, group validation and click handling

pub mod dependency;
pub mod flags;
pub mod plugin_type;
pub mod selection;

pub use dependency::{evaluate, is_step_visible, normalize_path, FlagMap, InstalledFiles};
pub use flags::{compute_flags, visible_steps};
pub use plugin_type::resolve_type;
pub use selection::{can_advance, initialize_defaults, validate_group, Selections};
