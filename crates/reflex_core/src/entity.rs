//! Entity identity, handles, and storage records.
//!
//! An entity is a lightweight identity with one component slot per kind.
//! Client code holds [`Entity`] *handles*: a creation id plus the arena slot
//! and its generation. The generation is bumped every time a slot is
//! reclaimed for reuse, so a handle that outlives its entity stops resolving
//! instead of silently pointing at the slot's next occupant.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::component::{ComponentBox, ComponentKind};

/// A monotonically increasing entity creation id.
///
/// Unique among all entities a context has ever created, until the context is
/// reset. Never reused while any holder can still resolve the entity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Allocates creation ids. Ids start at 1.
///
/// The counter is atomic so read-only lookups on other threads can race an
/// allocation without ever observing a duplicate id; everything else in the
/// context is single-writer.
#[derive(Debug)]
pub(crate) struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    pub(crate) fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub(crate) fn allocate(&self) -> EntityId {
        EntityId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Restart allocation at 1. Only valid once the population is empty.
    pub(crate) fn reset(&self) {
        self.next.store(1, Ordering::Relaxed);
    }
}

/// A copyable entity handle: creation id, arena slot, slot generation.
///
/// Handles are cheap to copy and compare. A handle resolves only while the
/// slot's generation still matches; after the entity is fully released and
/// its slot reused, old handles fail with
/// [`ContextError::EntityNotFound`](crate::ContextError::EntityNotFound).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entity {
    pub(crate) id: EntityId,
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

impl Entity {
    /// The entity's creation id.
    #[must_use]
    pub const fn id(self) -> EntityId {
        self.id
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// An opaque retainer identity for the retain/release protocol.
///
/// Any collaborator that wants to keep an entity alive past its destruction
/// mints a token and retains with it; the same token must be used to release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerToken(Uuid);

impl OwnerToken {
    /// Mint a fresh token.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OwnerToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle phase of an entity slot.
///
/// `Pooled → Active → PendingRelease → Pooled`, with the direct
/// `Active → Pooled` shortcut when no external holder exists at destruction
/// time. The retainer set guards the transition back to `Pooled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    /// Inert slot waiting on the free list.
    Pooled,
    /// Live member of the context's population.
    Active,
    /// Destroyed, waiting for external retainers to release.
    PendingRelease,
}

/// The arena record behind an entity handle. Owned by the context.
pub(crate) struct EntityRecord {
    pub(crate) id: EntityId,
    pub(crate) generation: u32,
    pub(crate) name: Option<String>,
    pub(crate) enabled: bool,
    pub(crate) slots: Box<[Option<ComponentBox>]>,
    pub(crate) retainers: HashSet<OwnerToken>,
    pub(crate) phase: Phase,
}

impl EntityRecord {
    pub(crate) fn new(kind_count: usize) -> Self {
        Self {
            id: EntityId::default(),
            generation: 0,
            name: None,
            enabled: false,
            slots: (0..kind_count).map(|_| None).collect(),
            retainers: HashSet::new(),
            phase: Phase::Pooled,
        }
    }

    /// Bring a pooled record to life under a fresh id.
    pub(crate) fn activate(&mut self, id: EntityId, name: Option<String>) {
        debug_assert_eq!(self.phase, Phase::Pooled);
        debug_assert!(self.slots.iter().all(Option::is_none));
        self.id = id;
        self.name = name;
        self.enabled = true;
        self.phase = Phase::Active;
    }

    /// Return the record to the pooled state, invalidating all outstanding
    /// handles by bumping the generation.
    pub(crate) fn reclaim(&mut self) {
        debug_assert!(self.retainers.is_empty());
        self.generation = self.generation.wrapping_add(1);
        self.name = None;
        self.enabled = false;
        self.phase = Phase::Pooled;
    }

    /// Whether the slot for `kind` is occupied.
    #[must_use]
    pub(crate) fn has(&self, kind: ComponentKind) -> bool {
        self.slots
            .get(kind.index())
            .is_some_and(Option::is_some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_allocator_is_monotonic_from_one() {
        let ids = IdAllocator::new();
        assert_eq!(ids.allocate(), EntityId(1));
        assert_eq!(ids.allocate(), EntityId(2));
        assert_eq!(ids.allocate(), EntityId(3));
        ids.reset();
        assert_eq!(ids.allocate(), EntityId(1));
    }

    #[test]
    fn test_owner_tokens_are_distinct() {
        assert_ne!(OwnerToken::new(), OwnerToken::new());
    }

    #[test]
    fn test_record_activate_and_reclaim() {
        let mut record = EntityRecord::new(2);
        assert_eq!(record.phase, Phase::Pooled);

        record.activate(EntityId(1), Some("hero".to_string()));
        assert!(record.enabled);
        assert_eq!(record.phase, Phase::Active);
        let generation = record.generation;

        record.reclaim();
        assert_eq!(record.phase, Phase::Pooled);
        assert!(!record.enabled);
        assert!(record.name.is_none());
        assert_eq!(record.generation, generation + 1);
    }

    #[test]
    fn test_record_slot_occupancy() {
        let mut record = EntityRecord::new(2);
        assert!(!record.has(ComponentKind(0)));
        record.slots[0] = Some(Box::new(42u32));
        assert!(record.has(ComponentKind(0)));
        assert!(!record.has(ComponentKind(1)));
        assert!(!record.has(ComponentKind(5)));
    }
}
