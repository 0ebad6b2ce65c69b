//! Composite dependency evaluation.
//!
//! # Rules
//!
//! | Node              | True when |
//! |-------------------|-----------|
//! | `Flag {name, value}` | `flags[name] == value`, a missing flag reads as `""` |
//! | `File {path, state}` | no snapshot available, or the snapshot agrees with `state` |
//! | `Node {And, ..}`  | every child is true |
//! | `Node {Or, ..}`   | at least one child is true |
//! | `Node {_, []}`    | always |

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::descriptor::{CompositeDependency, Step};
use crate::types::DependencyOperator;

/// Flag name → value. Ordered so derived output is deterministic.
pub type FlagMap = BTreeMap<String, String>;

/// Normalize a descriptor-relative path for lookup.
///
/// Backslashes become `/`, leading and trailing slashes are dropped and the
/// result is lower-cased.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/").trim_matches('/').to_lowercase()
}

/// Snapshot of files already present in the game directory.
///
/// Paths are stored normalized (see [`normalize_path`]), so membership tests
/// ignore case and separator style.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledFiles {
    paths: HashSet<String>,
}

impl InstalledFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file as present
    pub fn insert(&mut self, path: &str) {
        self.paths.insert(normalize_path(path));
    }

    /// Check whether `path` is present
    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(&normalize_path(path))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Load a snapshot from a text file with one path per line.
    ///
    /// Blank lines and lines starting with `#` are skipped.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(&path).with_context(|| {
            format!("Failed to read installed-file list from {:?}", path.as_ref())
        })?;

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect())
    }
}

impl<'a> FromIterator<&'a str> for InstalledFiles {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut files = Self::new();
        for path in iter {
            files.insert(path);
        }
        files
    }
}

/// Evaluate `dep` against the current flags.
///
/// `installed` is `None` when no file snapshot is available; file conditions
/// then pass so that missing information never blocks the wizard.
pub fn evaluate(
    dep: &CompositeDependency,
    flags: &FlagMap,
    installed: Option<&InstalledFiles>,
) -> bool {
    match dep {
        CompositeDependency::Flag { name, value } => {
            flags.get(name).map(String::as_str).unwrap_or("") == value
        }
        CompositeDependency::File { path, state } => match installed {
            None => true,
            Some(files) => state.holds(files.contains(path)),
        },
        CompositeDependency::Node { operator, children } => {
            if children.is_empty() {
                return true;
            }
            let mut results = children.iter().map(|child| evaluate(child, flags, installed));
            match operator {
                DependencyOperator::And => results.all(|r| r),
                DependencyOperator::Or => results.any(|r| r),
            }
        }
    }
}

/// A step without a `visible` condition is always shown.
pub fn is_step_visible(step: &Step, flags: &FlagMap, installed: Option<&InstalledFiles>) -> bool {
    step.visible
        .as_ref()
        .is_none_or(|visible| evaluate(visible, flags, installed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileState;

    fn flags(pairs: &[(&str, &str)]) -> FlagMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_flag_equality() {
        let dep = CompositeDependency::flag("mode", "on");
        assert!(evaluate(&dep, &flags(&[("mode", "on")]), None));
        assert!(!evaluate(&dep, &flags(&[("mode", "off")]), None));
        // Case-sensitive
        assert!(!evaluate(&dep, &flags(&[("mode", "On")]), None));
    }

    #[test]
    fn test_missing_flag_reads_as_empty() {
        let empty = FlagMap::new();
        assert!(evaluate(&CompositeDependency::flag("x", ""), &empty, None));
        assert!(!evaluate(&CompositeDependency::flag("x", "on"), &empty, None));
    }

    #[test]
    fn test_empty_node_is_true() {
        let empty = FlagMap::new();
        assert!(evaluate(&CompositeDependency::and(vec![]), &empty, None));
        assert!(evaluate(&CompositeDependency::or(vec![]), &empty, None));
    }

    #[test]
    fn test_and_or() {
        let f = flags(&[("a", "1"), ("b", "2")]);
        let both = CompositeDependency::and(vec![
            CompositeDependency::flag("a", "1"),
            CompositeDependency::flag("b", "3"),
        ]);
        assert!(!evaluate(&both, &f, None));

        let either = CompositeDependency::or(vec![
            CompositeDependency::flag("a", "0"),
            CompositeDependency::flag("b", "2"),
        ]);
        assert!(evaluate(&either, &f, None));
    }

    #[test]
    fn test_nested_nodes() {
        let f = flags(&[("a", "1")]);
        let dep = CompositeDependency::and(vec![
            CompositeDependency::flag("a", "1"),
            CompositeDependency::or(vec![
                CompositeDependency::flag("b", "1"),
                CompositeDependency::and(vec![]),
            ]),
        ]);
        assert!(evaluate(&dep, &f, None));
    }

    #[test]
    fn test_file_condition_without_snapshot_passes() {
        let empty = FlagMap::new();
        for state in [FileState::Active, FileState::Inactive, FileState::Missing] {
            let dep = CompositeDependency::file("Data/Plugin.esp", state);
            assert!(evaluate(&dep, &empty, None), "{state} should pass optimistically");
        }
    }

    #[test]
    fn test_file_condition_with_snapshot() {
        let empty = FlagMap::new();
        let installed: InstalledFiles = ["data/plugin.esp"].into_iter().collect();

        let active = CompositeDependency::file("Data\\Plugin.esp", FileState::Active);
        let missing = CompositeDependency::file("/Data/Plugin.esp/", FileState::Missing);
        let other = CompositeDependency::file("data/other.esp", FileState::Inactive);

        assert!(evaluate(&active, &empty, Some(&installed)));
        assert!(!evaluate(&missing, &empty, Some(&installed)));
        assert!(evaluate(&other, &empty, Some(&installed)));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("\\Data\\Textures\\A.DDS\\"), "data/textures/a.dds");
        assert_eq!(normalize_path("plain.esp"), "plain.esp");
    }

    #[test]
    fn test_step_visibility() {
        let hidden = Step::new("S", vec![]).with_visible(CompositeDependency::flag("x", "on"));
        let always = Step::new("T", vec![]);
        let empty = FlagMap::new();

        assert!(!is_step_visible(&hidden, &empty, None));
        assert!(is_step_visible(&hidden, &flags(&[("x", "on")]), None));
        assert!(is_step_visible(&always, &empty, None));
    }

    #[test]
    fn test_installed_files_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("installed.txt");
        std::fs::write(&path, "# snapshot\nData/A.esp\n\n  bin\\x64\\mod.dll  \n").unwrap();

        let files = InstalledFiles::load_from_file(&path).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.contains("data/a.esp"));
        assert!(files.contains("BIN/x64/MOD.DLL"));
    }
}
