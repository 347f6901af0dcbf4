//! Groups — incrementally maintained matcher result sets.
//!
//! A group materializes "all live entities matching a matcher". The context
//! re-evaluates a group's membership for exactly one entity whenever one of
//! the matcher's referenced kinds changes on that entity; the group never
//! scans the population after its construction-time seed.

use std::collections::HashSet;
use std::fmt;

use crate::entity::{Entity, EntityRecord};
use crate::events::GroupListener;
use crate::matcher::Matcher;

/// Index of a group in its context's group arena.
///
/// Group identity is canonical: requesting a group twice with equal matchers
/// yields the same `GroupId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(pub(crate) u32);

impl GroupId {
    /// Returns the id as an arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group({})", self.0)
    }
}

/// How a group's view of one entity changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupChange {
    /// The entity entered the group.
    Added,
    /// The entity left the group.
    Removed,
    /// A member's component was replaced in place; membership unchanged.
    Updated,
}

/// The materialized result set of one matcher.
pub struct Group {
    id: GroupId,
    matcher: Matcher,
    members: HashSet<Entity>,
    pub(crate) listeners: Vec<GroupListener>,
}

impl Group {
    pub(crate) fn new(id: GroupId, matcher: Matcher) -> Self {
        Self {
            id,
            matcher,
            members: HashSet::new(),
            listeners: Vec::new(),
        }
    }

    /// This group's canonical id.
    #[must_use]
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// The matcher this group materializes.
    #[must_use]
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Number of member entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if no entity currently matches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether `entity` is currently a member.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.members.contains(&entity)
    }

    /// Iterate over the current members (unordered).
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.members.iter().copied()
    }

    /// The sole member, or `None` when empty.
    ///
    /// Calling this while more than one entity matches is a contract
    /// violation; the uniqueness helpers on the context are the only
    /// sanctioned callers.
    #[must_use]
    pub fn single(&self) -> Option<Entity> {
        debug_assert!(
            self.members.len() <= 1,
            "single() called on {} with {} members",
            self.id,
            self.members.len()
        );
        self.members.iter().next().copied()
    }

    /// Re-evaluate membership for one entity and report the transition.
    pub(crate) fn apply(&mut self, entity: Entity, record: &EntityRecord) -> Option<GroupChange> {
        if self.matcher.matches(record) {
            self.members.insert(entity).then_some(GroupChange::Added)
        } else {
            self.members.remove(&entity).then_some(GroupChange::Removed)
        }
    }

    /// Membership update without a transition report. Used only for the
    /// construction-time seed: the group does not "gain" those entities, it
    /// starts with them.
    pub(crate) fn apply_silently(&mut self, entity: Entity, record: &EntityRecord) {
        if self.matcher.matches(record) {
            self.members.insert(entity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentKind;
    use crate::entity::EntityId;

    const A: ComponentKind = ComponentKind(0);
    const B: ComponentKind = ComponentKind(1);

    fn entity(id: u64) -> Entity {
        Entity {
            id: EntityId(id),
            slot: id as u32,
            generation: 0,
        }
    }

    fn record_with(kinds: &[ComponentKind]) -> EntityRecord {
        let mut record = EntityRecord::new(2);
        for kind in kinds {
            record.slots[kind.index()] = Some(Box::new(()));
        }
        record
    }

    #[test]
    fn test_apply_reports_transitions_once() {
        let mut group = Group::new(GroupId(0), Matcher::all_of([A]));
        let e = entity(1);

        assert_eq!(group.apply(e, &record_with(&[A])), Some(GroupChange::Added));
        assert_eq!(group.apply(e, &record_with(&[A, B])), None);
        assert_eq!(group.apply(e, &record_with(&[B])), Some(GroupChange::Removed));
        assert_eq!(group.apply(e, &record_with(&[])), None);
    }

    #[test]
    fn test_apply_silently_updates_membership_only() {
        let mut group = Group::new(GroupId(0), Matcher::all_of([A]));
        group.apply_silently(entity(1), &record_with(&[A]));
        group.apply_silently(entity(2), &record_with(&[B]));
        assert_eq!(group.len(), 1);
        assert!(group.contains(entity(1)));
    }

    #[test]
    fn test_single() {
        let mut group = Group::new(GroupId(0), Matcher::all_of([A]));
        assert!(group.single().is_none());
        group.apply_silently(entity(1), &record_with(&[A]));
        assert_eq!(group.single(), Some(entity(1)));
    }
}
