//! Property-Based Tests for fomod-wizard
//!
//! Uses proptest for testing invariants over generated descriptors
//!
//! These tests verify:
//! - Vacuous truth of empty dependency nodes
//! - First-match-wins plugin type resolution
//! - Determinism of flag and visibility derivation
//! - The cursor clamp invariant under arbitrary clicks and navigation

use std::sync::Arc;

use proptest::prelude::*;
use strum::IntoEnumIterator;

use fomod_wizard::{
    compute_flags, evaluate, resolve_type, visible_steps, CompositeDependency, FlagMap, Group,
    InstallerDescriptor, Plugin, PluginType, SelectionRule, Selections, Step, WizardSession,
};

// =============================================================================
// Strategies
// =============================================================================

fn flag_name() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["a", "b", "c"])
}

fn flag_value() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["0", "1"])
}

fn flag_map_strategy() -> impl Strategy<Value = FlagMap> {
    prop::collection::btree_map(
        flag_name().prop_map(String::from),
        flag_value().prop_map(String::from),
        0..3,
    )
}

fn dependency_strategy() -> impl Strategy<Value = CompositeDependency> {
    let leaf = (flag_name(), flag_value()).prop_map(|(n, v)| CompositeDependency::flag(n, v));
    leaf.prop_recursive(3, 16, 3, |inner| {
        (any::<bool>(), prop::collection::vec(inner, 0..3)).prop_map(|(or, children)| {
            if or {
                CompositeDependency::or(children)
            } else {
                CompositeDependency::and(children)
            }
        })
    })
}

fn plugin_type_strategy() -> impl Strategy<Value = PluginType> {
    prop::sample::select(PluginType::iter().collect::<Vec<_>>())
}

fn rule_strategy() -> impl Strategy<Value = SelectionRule> {
    prop::sample::select(SelectionRule::iter().collect::<Vec<_>>())
}

fn plugin_strategy() -> impl Strategy<Value = Plugin> {
    (
        plugin_type_strategy(),
        prop::collection::vec((flag_name(), flag_value()), 0..3),
        prop::collection::vec((dependency_strategy(), plugin_type_strategy()), 0..3),
    )
        .prop_map(|(default_type, flags, patterns)| {
            let mut plugin = Plugin::new("P", default_type);
            for (name, value) in flags {
                plugin = plugin.with_flag(name, value);
            }
            for (dep, plugin_type) in patterns {
                plugin = plugin.with_pattern(dep, plugin_type);
            }
            plugin
        })
}

fn group_strategy() -> impl Strategy<Value = Group> {
    (rule_strategy(), prop::collection::vec(plugin_strategy(), 1..4))
        .prop_map(|(rule, plugins)| Group::new("G", rule, plugins))
}

fn step_strategy() -> impl Strategy<Value = Step> {
    (
        prop::collection::vec(group_strategy(), 0..3),
        prop::option::of(dependency_strategy()),
    )
        .prop_map(|(groups, visible)| {
            let step = Step::new("S", groups);
            match visible {
                Some(dep) => step.with_visible(dep),
                None => step,
            }
        })
}

fn descriptor_strategy() -> impl Strategy<Value = InstallerDescriptor> {
    prop::collection::vec(step_strategy(), 1..5).prop_map(|steps| InstallerDescriptor {
        module_name: "Generated".to_string(),
        steps,
        ..Default::default()
    })
}

#[derive(Debug, Clone)]
enum Op {
    Click(usize, usize),
    ClickAt(usize, usize, usize),
    Next,
    Back,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..4usize, 0..4usize).prop_map(|(g, p)| Op::Click(g, p)),
        (0..5usize, 0..4usize, 0..4usize).prop_map(|(s, g, p)| Op::ClickAt(s, g, p)),
        Just(Op::Next),
        Just(Op::Back),
    ]
}

// =============================================================================
// Dependency Properties
// =============================================================================

proptest! {
    /// Empty nodes hold for both operators, whatever the flags
    #[test]
    fn empty_nodes_are_vacuously_true(flags in flag_map_strategy()) {
        prop_assert!(evaluate(&CompositeDependency::and(vec![]), &flags, None));
        prop_assert!(evaluate(&CompositeDependency::or(vec![]), &flags, None));
    }

    /// And/Or match all/any over the children
    #[test]
    fn node_matches_children(
        children in prop::collection::vec(dependency_strategy(), 0..4),
        flags in flag_map_strategy(),
    ) {
        let results: Vec<bool> = children.iter().map(|c| evaluate(c, &flags, None)).collect();
        let and = CompositeDependency::and(children.clone());
        let or = CompositeDependency::or(children);
        prop_assert_eq!(evaluate(&and, &flags, None), results.iter().all(|r| *r));
        prop_assert_eq!(evaluate(&or, &flags, None), results.iter().any(|r| *r));
    }

    /// The first matching pattern decides; otherwise the default applies
    #[test]
    fn first_matching_pattern_wins(plugin in plugin_strategy(), flags in flag_map_strategy()) {
        let expected = plugin
            .type_descriptor
            .patterns
            .iter()
            .find(|p| evaluate(&p.dependency, &flags, None))
            .map(|p| p.plugin_type)
            .unwrap_or(plugin.type_descriptor.default_type);
        prop_assert_eq!(resolve_type(&plugin, &flags, None), expected);
    }
}

// =============================================================================
// Derivation Properties
// =============================================================================

proptest! {
    /// Same inputs, same flags and visible steps
    #[test]
    fn derivation_is_deterministic(desc in descriptor_strategy()) {
        let selections = fomod_wizard::initialize_defaults(&desc);
        let first = compute_flags(&desc, &selections, None);
        let second = compute_flags(&desc, &selections, None);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(
            visible_steps(&desc, &first, None),
            visible_steps(&desc, &second, None)
        );
    }

    /// Visible step indices are strictly increasing and in range
    #[test]
    fn visible_steps_are_ordered(desc in descriptor_strategy(), flags in flag_map_strategy()) {
        let visible = visible_steps(&desc, &flags, None);
        prop_assert!(visible.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(visible.iter().all(|&i| i < desc.total_steps()));
    }

    /// Two AtMostOne clicks on the same plugin leave the group empty
    #[test]
    fn at_most_one_reclick_round_trips(plugin in 0..8usize) {
        let mut selections = Selections::new();
        selections.select_plugin(0, 0, plugin, SelectionRule::AtMostOne);
        selections.select_plugin(0, 0, plugin, SelectionRule::AtMostOne);
        prop_assert!(selections.selected(0, 0).is_empty());
    }
}

// =============================================================================
// Session Properties
// =============================================================================

proptest! {
    /// After any sequence of operations the cursor points inside the visible
    /// list and the cached derivations match a fresh computation
    #[test]
    fn session_cursor_stays_clamped(
        desc in descriptor_strategy(),
        ops in prop::collection::vec(op_strategy(), 0..24),
    ) {
        let desc = Arc::new(desc);
        let mut session = WizardSession::new(Arc::clone(&desc));

        for op in ops {
            match op {
                Op::Click(g, p) => { session.select_plugin(g, p); }
                Op::ClickAt(s, g, p) => { session.select_plugin_at(s, g, p); }
                Op::Next => { session.go_next(); }
                Op::Back => { session.go_back(); }
            }

            let len = session.visible_steps().len();
            prop_assert!(session.cursor().position() <= len.saturating_sub(1));
            prop_assert_eq!(session.current_step_index().is_some(), len > 0);

            let flags = compute_flags(&desc, session.selections(), None);
            prop_assert_eq!(session.flags(), &flags);
            let expected = visible_steps(&desc, &flags, None);
            prop_assert_eq!(session.visible_steps(), expected.as_slice());
        }
    }

    /// Clicks never add a plugin that currently resolves to NotUsable
    #[test]
    fn not_usable_clicks_never_select(
        desc in descriptor_strategy(),
        (s, g, p) in (0..5usize, 0..4usize, 0..4usize),
    ) {
        let mut session = WizardSession::new(Arc::new(desc));
        let before = session.selections().clone();
        if session.plugin_type(s, g, p) == Some(PluginType::NotUsable)
            && !session.selections().is_selected(s, g, p)
        {
            prop_assert!(!session.select_plugin_at(s, g, p));
            prop_assert_eq!(session.selections(), &before);
        }
    }
}
