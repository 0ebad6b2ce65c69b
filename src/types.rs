//! Type-safe enums for installer descriptors
//!
//! Every tag that appears in a FOMOD descriptor (group types, plugin types,
//! dependency operators, file states, ordering) is a closed enum here, so an
//! unknown value is rejected when the descriptor is loaded and every match
//! over them is exhaustive.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Cardinality rule a group imposes on its selected plugins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum SelectionRule {
    #[serde(rename = "SelectExactlyOne")]
    #[strum(serialize = "SelectExactlyOne")]
    ExactlyOne,
    #[serde(rename = "SelectAtLeastOne")]
    #[strum(serialize = "SelectAtLeastOne")]
    AtLeastOne,
    #[serde(rename = "SelectAtMostOne")]
    #[strum(serialize = "SelectAtMostOne")]
    AtMostOne,
    #[default]
    #[serde(rename = "SelectAny")]
    #[strum(serialize = "SelectAny")]
    Any,
    #[serde(rename = "SelectAll")]
    #[strum(serialize = "SelectAll")]
    All,
}

impl SelectionRule {
    /// Check whether `count` selected plugins satisfy this rule.
    ///
    /// Only `ExactlyOne` and `AtLeastOne` can fail; the upper bound of
    /// `AtMostOne` and the "everything" of `All` are enforced by
    /// [`Selections::select_plugin`](crate::logic::selection::Selections::select_plugin).
    pub fn is_satisfied_by(self, count: usize) -> bool {
        match self {
            Self::ExactlyOne => count == 1,
            Self::AtLeastOne => count >= 1,
            Self::AtMostOne | Self::Any | Self::All => true,
        }
    }
}

/// Install-necessity classification of a plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum PluginType {
    Required,
    Recommended,
    #[default]
    Optional,
    NotUsable,
    CouldBeUsable,
}

impl PluginType {
    /// Plugins that start out selected in a fresh wizard
    pub fn is_preselected(self) -> bool {
        matches!(self, Self::Required | Self::Recommended)
    }

    /// Plugins the user may pick at all
    pub fn is_selectable(self) -> bool {
        self != Self::NotUsable
    }
}

/// Boolean operator of a composite dependency node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum DependencyOperator {
    #[default]
    And,
    Or,
}

/// Required state of a file for a file dependency to hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum FileState {
    #[default]
    Active,
    Inactive,
    Missing,
}

impl FileState {
    /// Whether the condition holds given the file's presence
    pub fn holds(self, present: bool) -> bool {
        match self {
            Self::Active => present,
            Self::Inactive | Self::Missing => !present,
        }
    }
}

/// Ordering attribute on steps, groups and plugins in ModuleConfig.xml
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(Display, EnumString, EnumIter)]
pub enum SortOrder {
    #[default]
    Explicit,
    Ascending,
    Descending,
}

impl SortOrder {
    /// Reorder `items` by case-insensitive name. Stable for equal names.
    pub fn apply<T>(self, items: &mut [T], name: impl Fn(&T) -> &str) {
        match self {
            Self::Explicit => {}
            Self::Ascending => items.sort_by_cached_key(|item| name(item).to_lowercase()),
            Self::Descending => {
                items.sort_by_cached_key(|item| std::cmp::Reverse(name(item).to_lowercase()))
            }
        }
    }
}
