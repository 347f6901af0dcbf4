//! Matchers — immutable predicates over component-kind sets.
//!
//! A [`Matcher`] declares which entities a group is interested in: all of
//! one kind set present, none of another present, and (optionally) at least
//! one of a third present. Matchers compare by value; the context uses them
//! as the canonical cache key for groups, so two matchers built from the
//! same kinds in any order address the same group.

use serde::{Deserialize, Serialize};

use crate::component::ComponentKind;
use crate::entity::EntityRecord;

/// An immutable predicate over component kinds.
///
/// Every matcher names at least one *positive* kind (all-of or any-of), so
/// an entity with no components never matches. That keeps group membership
/// teardown complete during destruction, where removal notifications are
/// driven by per-slot clears.
///
/// # Examples
///
/// ```rust
/// use reflex_core::{ComponentKind, Matcher};
///
/// const POSITION: ComponentKind = ComponentKind(0);
/// const VELOCITY: ComponentKind = ComponentKind(1);
/// const FROZEN: ComponentKind = ComponentKind(2);
///
/// let movers = Matcher::all_of([POSITION, VELOCITY]).none_of([FROZEN]);
/// assert_eq!(movers, Matcher::all_of([VELOCITY, POSITION]).none_of([FROZEN]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Matcher {
    all_of: Box<[ComponentKind]>,
    none_of: Box<[ComponentKind]>,
    any_of: Box<[ComponentKind]>,
}

impl Matcher {
    /// A matcher requiring every one of `kinds` to be present.
    ///
    /// # Panics
    ///
    /// Panics if `kinds` is empty.
    #[must_use]
    pub fn all_of(kinds: impl IntoIterator<Item = ComponentKind>) -> Self {
        let all_of = normalize(kinds);
        assert!(
            !all_of.is_empty(),
            "a matcher requires at least one all-of or any-of kind"
        );
        Self {
            all_of,
            none_of: Box::new([]),
            any_of: Box::new([]),
        }
    }

    /// A matcher requiring at least one of `kinds` to be present.
    ///
    /// # Panics
    ///
    /// Panics if `kinds` is empty.
    #[must_use]
    pub fn any_of(kinds: impl IntoIterator<Item = ComponentKind>) -> Self {
        let any_of = normalize(kinds);
        assert!(
            !any_of.is_empty(),
            "a matcher requires at least one all-of or any-of kind"
        );
        Self {
            all_of: Box::new([]),
            none_of: Box::new([]),
            any_of,
        }
    }

    /// Additionally require every one of `kinds` to be absent.
    #[must_use]
    pub fn none_of(mut self, kinds: impl IntoIterator<Item = ComponentKind>) -> Self {
        self.none_of = normalize(kinds);
        self
    }

    /// Additionally require at least one of `kinds` to be present.
    #[must_use]
    pub fn and_any_of(mut self, kinds: impl IntoIterator<Item = ComponentKind>) -> Self {
        self.any_of = normalize(kinds);
        self
    }

    /// Every kind this matcher references, deduplicated across the three
    /// sets. The context registers the owning group under each of these.
    #[must_use]
    pub fn referenced_kinds(&self) -> Vec<ComponentKind> {
        let mut kinds: Vec<ComponentKind> = self
            .all_of
            .iter()
            .chain(self.none_of.iter())
            .chain(self.any_of.iter())
            .copied()
            .collect();
        kinds.sort_unstable();
        kinds.dedup();
        kinds
    }

    /// Evaluate the predicate against an entity's slot occupancy.
    pub(crate) fn matches(&self, record: &EntityRecord) -> bool {
        self.all_of.iter().all(|&kind| record.has(kind))
            && self.none_of.iter().all(|&kind| !record.has(kind))
            && (self.any_of.is_empty() || self.any_of.iter().any(|&kind| record.has(kind)))
    }
}

fn normalize(kinds: impl IntoIterator<Item = ComponentKind>) -> Box<[ComponentKind]> {
    let mut kinds: Vec<ComponentKind> = kinds.into_iter().collect();
    kinds.sort_unstable();
    kinds.dedup();
    kinds.into_boxed_slice()
}
