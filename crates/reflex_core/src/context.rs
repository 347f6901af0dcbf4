//! The context — owning authority for entity lifecycle, the group cache,
//! and change routing.
//!
//! The context is the single source of truth for its population. It owns the
//! entity arena and its free list, the per-kind component pools, the group
//! arena with its matcher-keyed cache, and the per-kind subscriber lists that
//! route every component mutation to exactly the groups that care about the
//! mutated kind.
//!
//! All mutation is `&mut self`: the intended model is one logical writer per
//! context per tick. The only atomic is the id allocator, which lets
//! read-only lookups on other threads race entity creation without ever
//! observing a duplicate id.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::{debug, info, warn};

use crate::component::{ComponentBox, ComponentKind, ComponentPools, ContextInfo};
use crate::entity::{Entity, EntityId, EntityRecord, IdAllocator, OwnerToken, Phase};
use crate::error::ContextError;
use crate::events::{ChangeAction, ComponentChange, ContextListeners, GroupEvent};
use crate::group::{Group, GroupChange, GroupId};
use crate::matcher::Matcher;

/// Swap a listener list out of the context, invoke each listener with
/// `&mut Context`, then restore the list, keeping any listeners that were
/// registered during dispatch.
macro_rules! notify {
    ($ctx:expr, $channel:ident, $($arg:tt)*) => {{
        let mut taken = std::mem::take(&mut $ctx.listeners.$channel);
        for listener in taken.iter_mut() {
            listener($ctx, $($arg)*);
        }
        let registered_during = std::mem::replace(&mut $ctx.listeners.$channel, taken);
        $ctx.listeners.$channel.extend(registered_during);
    }};
}

/// The owning authority for a population of entities.
pub struct Context {
    info: ContextInfo,
    ids: IdAllocator,
    /// Entity record arena; handles index into it by slot.
    records: Vec<EntityRecord>,
    /// LIFO free list of reclaimed slots — the reusable-entity pool.
    free_slots: Vec<u32>,
    /// Handles of all live entities.
    live: HashSet<Entity>,
    /// Destroyed entities still held by external retainers.
    retained: HashSet<Entity>,
    /// O(1) creation-id lookup for live entities.
    by_id: HashMap<EntityId, Entity>,
    /// Group arena; `GroupId` indexes into it.
    groups: Vec<Group>,
    /// Canonical group cache, keyed by matcher value.
    groups_by_matcher: HashMap<Matcher, GroupId>,
    /// For each component kind, the groups whose matcher references it.
    kind_subscribers: Box<[Vec<GroupId>]>,
    pools: ComponentPools,
    listeners: ContextListeners,
    /// Reusable buffer for membership transitions within one routing pass.
    transitions: Vec<(GroupId, GroupChange)>,
    /// Cached ordered snapshot of the live population.
    snapshot: Vec<Entity>,
    snapshot_dirty: bool,
    /// The context's own retention identity.
    ctx_owner: OwnerToken,
    resetting: bool,
}

impl Context {
    /// Create an empty context for the component kinds declared in `info`.
    #[must_use]
    pub fn new(info: ContextInfo) -> Self {
        let kind_count = info.kind_count();
        Self {
            ids: IdAllocator::new(),
            records: Vec::new(),
            free_slots: Vec::new(),
            live: HashSet::new(),
            retained: HashSet::new(),
            by_id: HashMap::new(),
            groups: Vec::new(),
            groups_by_matcher: HashMap::new(),
            kind_subscribers: (0..kind_count).map(|_| Vec::new()).collect(),
            pools: ComponentPools::new(kind_count),
            listeners: ContextListeners::default(),
            transitions: Vec::new(),
            snapshot: Vec::new(),
            snapshot_dirty: false,
            ctx_owner: OwnerToken::new(),
            resetting: false,
            info,
        }
    }

    /// The context's metadata.
    #[must_use]
    pub fn info(&self) -> &ContextInfo {
        &self.info
    }

    // -- Entity lifecycle --

    /// Create a new entity with no components.
    ///
    /// # Errors
    ///
    /// Fails with [`ContextError::InvalidState`] while a reset is running.
    pub fn create_entity(&mut self) -> Result<Entity, ContextError> {
        self.create(None)
    }

    /// Create a new entity carrying a debug name.
    ///
    /// # Errors
    ///
    /// Fails with [`ContextError::InvalidState`] while a reset is running.
    pub fn create_entity_named(&mut self, name: &str) -> Result<Entity, ContextError> {
        self.create(Some(name.to_string()))
    }

    fn create(&mut self, name: Option<String>) -> Result<Entity, ContextError> {
        if self.resetting {
            return Err(ContextError::InvalidState("create_entity during reset"));
        }
        let id = self.ids.allocate();
        let slot = match self.free_slots.pop() {
            Some(slot) => slot,
            None => {
                self.records.push(EntityRecord::new(self.info.kind_count()));
                u32::try_from(self.records.len() - 1).expect("entity arena exceeds u32 slots")
            }
        };
        let record = &mut self.records[slot as usize];
        record.activate(id, name);
        record.retainers.insert(self.ctx_owner);
        let entity = Entity {
            id,
            slot,
            generation: record.generation,
        };
        self.live.insert(entity);
        self.by_id.insert(id, entity);
        self.snapshot_dirty = true;
        debug!(entity = %id, context = self.info.name(), "entity created");
        notify!(self, entity_created, entity);
        Ok(entity)
    }

    /// Destroy a live entity.
    ///
    /// The entity leaves the live set, every occupied slot is cleared
    /// through the normal group-update path (so groups observe the entity
    /// leaving before it disappears), and the context's own retention is
    /// released. With no external retainer the slot goes straight back to
    /// the reusable pool; otherwise the entity parks in the retained set
    /// until the last holder releases it.
    ///
    /// # Errors
    ///
    /// Fails with [`ContextError::EntityNotFound`] if the entity is not a
    /// live member of this context — a programming error, not a recoverable
    /// condition.
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<(), ContextError> {
        if !self.live.remove(&entity) {
            return Err(ContextError::EntityNotFound(entity.id));
        }
        let idx = entity.slot as usize;
        self.by_id.remove(&entity.id);
        self.snapshot_dirty = true;

        notify!(self, entity_will_be_destroyed, entity);

        self.records[idx].enabled = false;
        for k in 0..self.info.kind_count() {
            let kind = ComponentKind(k as u32);
            if let Some(previous) = self.records[idx].slots[k].take() {
                self.route_change(entity, idx, kind, ChangeAction::Removed, Some(&*previous));
                self.pools.put_back(kind, previous);
            }
        }

        notify!(self, entity_destroyed, entity);
        debug!(entity = %entity.id, context = self.info.name(), "entity destroyed");

        let ctx_owner = self.ctx_owner;
        let record = &mut self.records[idx];
        record.retainers.remove(&ctx_owner);
        if record.retainers.is_empty() {
            self.reclaim(entity);
        } else {
            record.phase = Phase::PendingRelease;
            self.retained.insert(entity);
        }
        Ok(())
    }

    /// Destroy every live entity, then verify nothing is left behind.
    ///
    /// # Errors
    ///
    /// Fails with [`ContextError::StillRetained`] if any entity is still
    /// externally retained once the whole population has been destroyed —
    /// a collaborator forgot to release.
    pub fn destroy_all_entities(&mut self) -> Result<(), ContextError> {
        let snapshot = self.entities().to_vec();
        for entity in snapshot {
            self.destroy_entity(entity)?;
        }
        if !self.retained.is_empty() {
            let mut ids: Vec<EntityId> = self.retained.iter().map(|e| e.id).collect();
            ids.sort_unstable();
            warn!(
                context = self.info.name(),
                count = ids.len(),
                "entities still retained after destroy-all"
            );
            return Err(ContextError::StillRetained(ids));
        }
        Ok(())
    }

    /// Destroy all entities, restart id allocation at 1, and drop every
    /// context-level listener. Groups and their listeners survive: the group
    /// cache is structural, and the population is empty afterwards.
    ///
    /// # Errors
    ///
    /// Propagates [`ContextError::StillRetained`] from the destroy phase.
    pub fn reset(&mut self) -> Result<(), ContextError> {
        self.resetting = true;
        let destroyed = self.destroy_all_entities();
        self.resetting = false;
        destroyed?;
        self.ids.reset();
        self.listeners.clear();
        info!(context = self.info.name(), "context reset");
        Ok(())
    }

    /// Whether `entity` is a live member of this context.
    #[must_use]
    pub fn has_entity(&self, entity: Entity) -> bool {
        self.live.contains(&entity)
    }

    /// Look up a live entity by creation id.
    #[must_use]
    pub fn get_entity(&self, id: EntityId) -> Option<Entity> {
        self.by_id.get(&id).copied()
    }

    /// Snapshot of all live entities, ordered by creation id. Cached;
    /// invalidated on any create or destroy.
    pub fn entities(&mut self) -> &[Entity] {
        if self.snapshot_dirty {
            self.snapshot.clear();
            self.snapshot.extend(self.live.iter().copied());
            self.snapshot.sort_unstable_by_key(|e| e.id);
            self.snapshot_dirty = false;
        }
        &self.snapshot
    }

    /// The debug name given at creation, if any.
    ///
    /// # Errors
    ///
    /// Fails with [`ContextError::EntityNotFound`] on a stale handle.
    pub fn entity_name(&self, entity: Entity) -> Result<Option<&str>, ContextError> {
        let idx = self.slot_of(entity)?;
        Ok(self.records[idx].name.as_deref())
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.live.len()
    }

    /// Number of pooled entity slots awaiting reuse.
    #[must_use]
    pub fn reusable_count(&self) -> usize {
        self.free_slots.len()
    }

    /// Number of destroyed entities still held by external retainers.
    #[must_use]
    pub fn retained_count(&self) -> usize {
        self.retained.len()
    }

    // -- Component operations --

    /// Attach a component value to an empty slot.
    ///
    /// # Errors
    ///
    /// [`ContextError::EntityNotFound`] on a stale handle,
    /// [`ContextError::UnknownKind`] for an out-of-range kind,
    /// [`ContextError::EntityNotEnabled`] after destruction has begun,
    /// [`ContextError::AlreadyHasComponent`] if the slot is occupied.
    pub fn add_component<T: Any + Send + Sync>(
        &mut self,
        entity: Entity,
        kind: ComponentKind,
        value: T,
    ) -> Result<(), ContextError> {
        self.add_boxed(entity, kind, Box::new(value))
    }

    /// Type-erased variant of [`Context::add_component`], for values checked
    /// out of a pool.
    ///
    /// # Errors
    ///
    /// As [`Context::add_component`].
    pub fn add_boxed(
        &mut self,
        entity: Entity,
        kind: ComponentKind,
        value: ComponentBox,
    ) -> Result<(), ContextError> {
        let idx = self.mutable_slot(entity, kind)?;
        let record = &mut self.records[idx];
        if record.slots[kind.index()].is_some() {
            return Err(ContextError::AlreadyHasComponent {
                entity: entity.id,
                kind: self.info.kind_name(kind).to_string(),
            });
        }
        record.slots[kind.index()] = Some(value);
        self.route_change(entity, idx, kind, ChangeAction::Added, None);
        Ok(())
    }

    /// Detach a component value; it returns to the kind's pool.
    ///
    /// # Errors
    ///
    /// As [`Context::add_component`], with
    /// [`ContextError::DoesNotHaveComponent`] if the slot is empty.
    pub fn remove_component(
        &mut self,
        entity: Entity,
        kind: ComponentKind,
    ) -> Result<(), ContextError> {
        let idx = self.mutable_slot(entity, kind)?;
        let Some(previous) = self.records[idx].slots[kind.index()].take() else {
            return Err(ContextError::DoesNotHaveComponent {
                entity: entity.id,
                kind: self.info.kind_name(kind).to_string(),
            });
        };
        self.route_change(entity, idx, kind, ChangeAction::Removed, Some(&*previous));
        self.pools.put_back(kind, previous);
        Ok(())
    }

    /// Set a component value: adds if the slot is empty, replaces in place
    /// if occupied. Replacement emits update events without re-evaluating
    /// membership; the outgoing value returns to the kind's pool.
    ///
    /// # Errors
    ///
    /// As [`Context::add_component`], minus the occupied-slot case.
    pub fn replace_component<T: Any + Send + Sync>(
        &mut self,
        entity: Entity,
        kind: ComponentKind,
        value: T,
    ) -> Result<(), ContextError> {
        self.replace_boxed(entity, kind, Box::new(value))
    }

    /// Type-erased variant of [`Context::replace_component`].
    ///
    /// # Errors
    ///
    /// As [`Context::replace_component`].
    pub fn replace_boxed(
        &mut self,
        entity: Entity,
        kind: ComponentKind,
        value: ComponentBox,
    ) -> Result<(), ContextError> {
        let idx = self.mutable_slot(entity, kind)?;
        match self.records[idx].slots[kind.index()].replace(value) {
            None => self.route_change(entity, idx, kind, ChangeAction::Added, None),
            Some(previous) => {
                self.route_update(entity, kind, &*previous);
                self.pools.put_back(kind, previous);
            }
        }
        Ok(())
    }

    /// Read a component value, downcast to `T`.
    ///
    /// # Errors
    ///
    /// [`ContextError::DoesNotHaveComponent`] on an empty slot,
    /// [`ContextError::WrongComponentType`] if the slot holds another type.
    pub fn component<T: Any + Send + Sync>(
        &self,
        entity: Entity,
        kind: ComponentKind,
    ) -> Result<&T, ContextError> {
        let idx = self.slot_of(entity)?;
        self.check_kind(kind)?;
        let slot = self.records[idx].slots[kind.index()].as_ref().ok_or_else(|| {
            ContextError::DoesNotHaveComponent {
                entity: entity.id,
                kind: self.info.kind_name(kind).to_string(),
            }
        })?;
        slot.downcast_ref::<T>()
            .ok_or_else(|| ContextError::WrongComponentType {
                entity: entity.id,
                kind: self.info.kind_name(kind).to_string(),
            })
    }

    /// Whether the entity currently carries `kind`. Stale handles and
    /// out-of-range kinds read as `false`.
    #[must_use]
    pub fn has_component(&self, entity: Entity, kind: ComponentKind) -> bool {
        self.slot_of(entity)
            .is_ok_and(|idx| self.records[idx].has(kind))
    }

    /// Evaluate a matcher against one entity.
    ///
    /// # Errors
    ///
    /// Fails with [`ContextError::EntityNotFound`] on a stale handle.
    pub fn entity_matches(&self, entity: Entity, matcher: &Matcher) -> Result<bool, ContextError> {
        let idx = self.slot_of(entity)?;
        Ok(matcher.matches(&self.records[idx]))
    }

    // -- Component pools --

    /// Check a reusable component value of `kind` out of its pool, if one is
    /// parked there. The caller owns the box until it is added back onto an
    /// entity.
    ///
    /// # Errors
    ///
    /// Fails with [`ContextError::UnknownKind`] for an out-of-range kind.
    pub fn checkout_component(
        &mut self,
        kind: ComponentKind,
    ) -> Result<Option<ComponentBox>, ContextError> {
        self.check_kind(kind)?;
        Ok(self.pools.checkout(kind))
    }

    /// Park a component value in the pool for `kind`, e.g. one checked out
    /// but never attached.
    ///
    /// # Errors
    ///
    /// Fails with [`ContextError::UnknownKind`] for an out-of-range kind.
    pub fn return_component(
        &mut self,
        kind: ComponentKind,
        value: ComponentBox,
    ) -> Result<(), ContextError> {
        self.check_kind(kind)?;
        self.pools.put_back(kind, value);
        Ok(())
    }

    /// Number of values parked in the pool for `kind`.
    #[must_use]
    pub fn pooled_count(&self, kind: ComponentKind) -> usize {
        self.pools.len(kind)
    }

    // -- Retain / release --

    /// Record `token` as a holder keeping `entity` alive past destruction.
    ///
    /// # Errors
    ///
    /// [`ContextError::EntityNotFound`] on a stale handle,
    /// [`ContextError::AlreadyRetained`] if this token already holds it.
    pub fn retain(&mut self, entity: Entity, token: OwnerToken) -> Result<(), ContextError> {
        let idx = self.slot_of(entity)?;
        if !self.records[idx].retainers.insert(token) {
            return Err(ContextError::AlreadyRetained { entity: entity.id });
        }
        Ok(())
    }

    /// Drop `token`'s hold on `entity`. When the last holder of a destroyed
    /// entity releases, the slot is reclaimed and the entity-released
    /// notification fires exactly once; the reclaim happens first, so a
    /// re-entrant release inside that notification fails instead of
    /// double-firing.
    ///
    /// # Errors
    ///
    /// [`ContextError::EntityNotFound`] on a stale handle,
    /// [`ContextError::OwnerDoesNotRetain`] if the token never retained it.
    pub fn release(&mut self, entity: Entity, token: OwnerToken) -> Result<(), ContextError> {
        let idx = self.slot_of(entity)?;
        let record = &mut self.records[idx];
        if !record.retainers.remove(&token) {
            return Err(ContextError::OwnerDoesNotRetain { entity: entity.id });
        }
        if record.retainers.is_empty() && record.phase == Phase::PendingRelease {
            self.reclaim(entity);
        }
        Ok(())
    }

    /// Current number of holders, the context's own hold included.
    ///
    /// # Errors
    ///
    /// Fails with [`ContextError::EntityNotFound`] on a stale handle.
    pub fn retain_count(&self, entity: Entity) -> Result<usize, ContextError> {
        let idx = self.slot_of(entity)?;
        Ok(self.records[idx].retainers.len())
    }

    // -- Groups --

    /// The group materializing `matcher`, creating and seeding it on first
    /// request. Canonical: equal matchers yield the same id.
    ///
    /// # Panics
    ///
    /// Panics if the matcher references a component kind outside this
    /// context's declared kind count.
    pub fn get_group(&mut self, matcher: Matcher) -> GroupId {
        if let Some(&gid) = self.groups_by_matcher.get(&matcher) {
            return gid;
        }
        let referenced = matcher.referenced_kinds();
        for &kind in &referenced {
            assert!(
                kind.index() < self.info.kind_count(),
                "matcher references {kind} outside context '{}' with {} kinds",
                self.info.name(),
                self.info.kind_count()
            );
        }

        let gid = GroupId(u32::try_from(self.groups.len()).expect("group arena exceeds u32 ids"));
        let mut group = Group::new(gid, matcher.clone());
        // Seed silently: the group starts with these members, it does not
        // "gain" them.
        for &entity in &self.live {
            group.apply_silently(entity, &self.records[entity.slot as usize]);
        }
        for &kind in &referenced {
            self.kind_subscribers[kind.index()].push(gid);
        }
        self.groups.push(group);
        self.groups_by_matcher.insert(matcher, gid);
        info!(
            context = self.info.name(),
            group = gid.index(),
            "group created"
        );
        notify!(self, group_created, gid);
        gid
    }

    /// Access a group by id.
    #[must_use]
    pub fn group(&self, gid: GroupId) -> &Group {
        &self.groups[gid.index()]
    }

    /// Number of groups created so far.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    // -- Uniqueness convention --

    /// The sole carrier of `kind`, by the at-most-one convention.
    pub fn single_entity(&mut self, kind: ComponentKind) -> Option<Entity> {
        let gid = self.kind_group(kind);
        self.groups[gid.index()].single()
    }

    /// Read the unique component of `kind`, if a carrier exists.
    pub fn unique<T: Any + Send + Sync>(&mut self, kind: ComponentKind) -> Option<&T> {
        let entity = self.single_entity(kind)?;
        self.component::<T>(entity, kind).ok()
    }

    /// Attach a unique component. With `reuse_existing` the current carrier
    /// (if any) receives the value via replace; without it an existing
    /// carrier is an error.
    ///
    /// # Errors
    ///
    /// [`ContextError::AlreadyUnique`] if a carrier exists and reuse is
    /// disallowed; otherwise as [`Context::replace_component`] /
    /// [`Context::create_entity`].
    pub fn add_unique<T: Any + Send + Sync>(
        &mut self,
        kind: ComponentKind,
        value: T,
        reuse_existing: bool,
    ) -> Result<Entity, ContextError> {
        match self.single_entity(kind) {
            Some(holder) if !reuse_existing => Err(ContextError::AlreadyUnique {
                kind: self.info.kind_name(kind).to_string(),
                holder: holder.id,
            }),
            Some(holder) => {
                self.replace_boxed(holder, kind, Box::new(value))?;
                Ok(holder)
            }
            None => {
                let entity = self.create_entity()?;
                self.add_boxed(entity, kind, Box::new(value))?;
                Ok(entity)
            }
        }
    }

    /// Set the unique component of `kind`, replacing it on the current
    /// carrier or creating a carrier if none exists.
    ///
    /// # Errors
    ///
    /// As [`Context::replace_component`] / [`Context::create_entity`].
    pub fn modify_unique<T: Any + Send + Sync>(
        &mut self,
        kind: ComponentKind,
        value: T,
    ) -> Result<Entity, ContextError> {
        self.add_unique(kind, value, true)
    }

    // -- Listener registration --

    /// Observe entity creation.
    pub fn on_entity_created(&mut self, listener: impl FnMut(&mut Context, Entity) + 'static) {
        self.listeners.entity_created.push(Box::new(listener));
    }

    /// Observe the start of entity destruction, before slots are cleared.
    pub fn on_entity_will_be_destroyed(
        &mut self,
        listener: impl FnMut(&mut Context, Entity) + 'static,
    ) {
        self.listeners
            .entity_will_be_destroyed
            .push(Box::new(listener));
    }

    /// Observe completed destruction, after slots are cleared.
    pub fn on_entity_destroyed(&mut self, listener: impl FnMut(&mut Context, Entity) + 'static) {
        self.listeners.entity_destroyed.push(Box::new(listener));
    }

    /// Observe full release. The handle is already stale when this fires;
    /// it identifies the entity for bookkeeping only.
    pub fn on_entity_released(&mut self, listener: impl FnMut(&mut Context, Entity) + 'static) {
        self.listeners.entity_released.push(Box::new(listener));
    }

    /// Observe group creation.
    pub fn on_group_created(&mut self, listener: impl FnMut(&mut Context, GroupId) + 'static) {
        self.listeners.group_created.push(Box::new(listener));
    }

    /// Observe every component add/remove/replace on any entity.
    pub fn on_component_changed(
        &mut self,
        listener: impl FnMut(&mut Context, &ComponentChange<'_>) + 'static,
    ) {
        self.listeners.component_changed.push(Box::new(listener));
    }

    /// Observe membership transitions and in-place updates of one group.
    pub fn on_group_changed(
        &mut self,
        gid: GroupId,
        listener: impl FnMut(&mut Context, &GroupEvent) + 'static,
    ) {
        self.groups[gid.index()].listeners.push(Box::new(listener));
    }

    // -- Internals --

    /// Resolve a handle to its arena index; stale or pooled slots fail.
    fn slot_of(&self, entity: Entity) -> Result<usize, ContextError> {
        let idx = entity.slot as usize;
        match self.records.get(idx) {
            Some(record)
                if record.generation == entity.generation && record.phase != Phase::Pooled =>
            {
                debug_assert_eq!(record.id, entity.id);
                Ok(idx)
            }
            _ => Err(ContextError::EntityNotFound(entity.id)),
        }
    }

    /// Resolve a handle for mutation: valid kind, entity enabled.
    fn mutable_slot(&self, entity: Entity, kind: ComponentKind) -> Result<usize, ContextError> {
        let idx = self.slot_of(entity)?;
        self.check_kind(kind)?;
        if !self.records[idx].enabled {
            return Err(ContextError::EntityNotEnabled(entity.id));
        }
        Ok(idx)
    }

    fn check_kind(&self, kind: ComponentKind) -> Result<(), ContextError> {
        if kind.index() < self.info.kind_count() {
            Ok(())
        } else {
            Err(ContextError::UnknownKind {
                kind: kind.0,
                kind_count: u32::try_from(self.info.kind_count()).unwrap_or(u32::MAX),
            })
        }
    }

    /// Route one slot add/remove: re-evaluate membership in every group
    /// subscribed to `kind` (transitions buffered in the reusable scratch
    /// list), then emit the component-change event followed by each
    /// buffered transition.
    fn route_change(
        &mut self,
        entity: Entity,
        idx: usize,
        kind: ComponentKind,
        action: ChangeAction,
        previous: Option<&(dyn Any + Send + Sync)>,
    ) {
        let mut transitions = std::mem::take(&mut self.transitions);
        debug_assert!(transitions.is_empty());
        {
            let record = &self.records[idx];
            for &gid in &self.kind_subscribers[kind.index()] {
                if let Some(change) = self.groups[gid.index()].apply(entity, record) {
                    transitions.push((gid, change));
                }
            }
        }

        let change_event = ComponentChange {
            entity,
            kind,
            action,
            previous,
        };
        notify!(self, component_changed, &change_event);

        for &(gid, change) in &transitions {
            let event = GroupEvent {
                group: gid,
                entity,
                kind,
                change,
            };
            self.notify_group(gid, &event);
        }
        transitions.clear();
        self.transitions = transitions;
    }

    /// Route an in-place replacement: no membership evaluation, an update
    /// event to every subscribed group the entity is a member of.
    fn route_update(
        &mut self,
        entity: Entity,
        kind: ComponentKind,
        previous: &(dyn Any + Send + Sync),
    ) {
        let change_event = ComponentChange {
            entity,
            kind,
            action: ChangeAction::Replaced,
            previous: Some(previous),
        };
        notify!(self, component_changed, &change_event);

        let mut transitions = std::mem::take(&mut self.transitions);
        debug_assert!(transitions.is_empty());
        for &gid in &self.kind_subscribers[kind.index()] {
            if self.groups[gid.index()].contains(entity) {
                transitions.push((gid, GroupChange::Updated));
            }
        }
        for &(gid, change) in &transitions {
            let event = GroupEvent {
                group: gid,
                entity,
                kind,
                change,
            };
            self.notify_group(gid, &event);
        }
        transitions.clear();
        self.transitions = transitions;
    }

    fn notify_group(&mut self, gid: GroupId, event: &GroupEvent) {
        let mut taken = std::mem::take(&mut self.groups[gid.index()].listeners);
        for listener in taken.iter_mut() {
            listener(self, event);
        }
        let registered_during =
            std::mem::replace(&mut self.groups[gid.index()].listeners, taken);
        self.groups[gid.index()].listeners.extend(registered_during);
    }

    /// Return a fully released slot to the reusable pool. Bumps the
    /// generation first so the released handle no longer resolves, then
    /// fires the entity-released notification.
    fn reclaim(&mut self, entity: Entity) {
        self.records[entity.slot as usize].reclaim();
        self.free_slots.push(entity.slot);
        self.retained.remove(&entity);
        debug!(entity = %entity.id, context = self.info.name(), "entity reclaimed");
        notify!(self, entity_released, entity);
    }

    fn kind_group(&mut self, kind: ComponentKind) -> GroupId {
        self.get_group(Matcher::all_of([kind]))
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Context '{}' ({} entities, {} retained, {} reusable, {} groups)",
            self.info.name(),
            self.live.len(),
            self.retained.len(),
            self.free_slots.len(),
            self.groups.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    const POSITION: ComponentKind = ComponentKind(0);
    const VELOCITY: ComponentKind = ComponentKind(1);
    const FROZEN: ComponentKind = ComponentKind(2);
    const CONFIG: ComponentKind = ComponentKind(3);

    fn make_context() -> Context {
        Context::new(ContextInfo::new(
            "test",
            ["position", "velocity", "frozen", "config"],
        ))
    }

    /// Brute-force check of the core invariant: a group's members are
    /// exactly the live entities its matcher accepts.
    fn assert_group_consistency(ctx: &mut Context, gid: GroupId) {
        let matcher = ctx.group(gid).matcher().clone();
        let all = ctx.entities().to_vec();
        let expected: HashSet<Entity> = all
            .into_iter()
            .filter(|&e| ctx.entity_matches(e, &matcher).unwrap())
            .collect();
        let actual: HashSet<Entity> = ctx.group(gid).iter().collect();
        assert_eq!(actual, expected, "group {gid} diverged from its matcher");
    }

    #[test]
    fn test_create_entity_assigns_increasing_ids() {
        let mut ctx = make_context();
        let e1 = ctx.create_entity().unwrap();
        let e2 = ctx.create_entity().unwrap();
        let e3 = ctx.create_entity().unwrap();
        assert_eq!(e1.id(), EntityId(1));
        assert_eq!(e2.id(), EntityId(2));
        assert_eq!(e3.id(), EntityId(3));
        assert_eq!(ctx.entity_count(), 3);
    }

    #[test]
    fn test_get_entity_and_has_entity() {
        let mut ctx = make_context();
        let e = ctx.create_entity().unwrap();
        assert!(ctx.has_entity(e));
        assert_eq!(ctx.get_entity(e.id()), Some(e));
        assert_eq!(ctx.get_entity(EntityId(99)), None);

        ctx.destroy_entity(e).unwrap();
        assert!(!ctx.has_entity(e));
        assert_eq!(ctx.get_entity(e.id()), None);
    }

    #[test]
    fn test_entities_snapshot_is_ordered_by_id() {
        let mut ctx = make_context();
        let e1 = ctx.create_entity().unwrap();
        let e2 = ctx.create_entity().unwrap();
        let e3 = ctx.create_entity().unwrap();
        ctx.destroy_entity(e2).unwrap();
        // Slot reuse gives the new entity an old slot but a higher id.
        let e4 = ctx.create_entity().unwrap();

        let ids: Vec<EntityId> = ctx.entities().iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec![e1.id(), e3.id(), e4.id()]);
    }

    #[test]
    fn test_entity_names() {
        let mut ctx = make_context();
        let named = ctx.create_entity_named("hero").unwrap();
        let anonymous = ctx.create_entity().unwrap();
        assert_eq!(ctx.entity_name(named).unwrap(), Some("hero"));
        assert_eq!(ctx.entity_name(anonymous).unwrap(), None);
    }

    #[test]
    fn test_add_component_contract_errors() {
        let mut ctx = make_context();
        let e = ctx.create_entity().unwrap();

        ctx.add_component(e, POSITION, 1u32).unwrap();
        assert!(matches!(
            ctx.add_component(e, POSITION, 2u32),
            Err(ContextError::AlreadyHasComponent { .. })
        ));
        assert!(matches!(
            ctx.add_component(e, ComponentKind(40), 2u32),
            Err(ContextError::UnknownKind { .. })
        ));
        assert!(matches!(
            ctx.remove_component(e, VELOCITY),
            Err(ContextError::DoesNotHaveComponent { .. })
        ));
    }

    #[test]
    fn test_component_read_and_downcast() {
        let mut ctx = make_context();
        let e = ctx.create_entity().unwrap();
        ctx.add_component(e, POSITION, 7u32).unwrap();

        assert_eq!(*ctx.component::<u32>(e, POSITION).unwrap(), 7);
        assert!(ctx.has_component(e, POSITION));
        assert!(!ctx.has_component(e, VELOCITY));
        assert!(matches!(
            ctx.component::<String>(e, POSITION),
            Err(ContextError::WrongComponentType { .. })
        ));
        assert!(matches!(
            ctx.component::<u32>(e, VELOCITY),
            Err(ContextError::DoesNotHaveComponent { .. })
        ));
    }

    // The first concrete scenario from the subsystem contract: membership
    // follows the component, destruction recycles the slot, and the new
    // occupant is a fresh identity.
    #[test]
    fn test_group_membership_and_slot_reuse() {
        let mut ctx = make_context();
        let e1 = ctx.create_entity().unwrap();
        ctx.add_component(e1, POSITION, 1u32).unwrap();

        let gid = ctx.get_group(Matcher::all_of([POSITION]));
        assert!(ctx.group(gid).contains(e1));
        assert_eq!(ctx.group(gid).len(), 1);

        let removals = Rc::new(RefCell::new(0));
        let removals_in = removals.clone();
        ctx.on_group_changed(gid, move |_, event| {
            if event.change == GroupChange::Removed {
                *removals_in.borrow_mut() += 1;
            }
        });

        ctx.remove_component(e1, POSITION).unwrap();
        assert!(ctx.group(gid).is_empty());
        assert_eq!(*removals.borrow(), 1);

        ctx.destroy_entity(e1).unwrap();
        assert_eq!(ctx.reusable_count(), 1);

        let e2 = ctx.create_entity().unwrap();
        assert_eq!(e2.slot, e1.slot);
        assert_ne!(e2.generation, e1.generation);
        assert_eq!(e2.id(), EntityId(2));
        assert!(!ctx.has_component(e2, POSITION));
        assert!(ctx.group(gid).is_empty());
    }

    #[test]
    fn test_group_seeded_silently_from_existing_population() {
        let mut ctx = make_context();
        for _ in 0..3 {
            let e = ctx.create_entity().unwrap();
            ctx.add_component(e, POSITION, 0u32).unwrap();
        }
        let outsider = ctx.create_entity().unwrap();
        ctx.add_component(outsider, VELOCITY, 0u32).unwrap();

        let gid = ctx.get_group(Matcher::all_of([POSITION]));
        assert_eq!(ctx.group(gid).len(), 3);
        assert!(!ctx.group(gid).contains(outsider));
    }

    // The third concrete scenario: a group created before any entity exists
    // grows through transition events, not through seeding.
    #[test]
    fn test_group_created_first_grows_via_events() {
        let mut ctx = make_context();
        let gid = ctx.get_group(Matcher::all_of([POSITION]));

        let additions = Rc::new(RefCell::new(0));
        let additions_in = additions.clone();
        ctx.on_group_changed(gid, move |_, event| {
            if event.change == GroupChange::Added {
                *additions_in.borrow_mut() += 1;
            }
        });

        for _ in 0..3 {
            let e = ctx.create_entity().unwrap();
            ctx.add_component(e, POSITION, 0u32).unwrap();
        }
        assert_eq!(ctx.group(gid).len(), 3);
        assert_eq!(*additions.borrow(), 3);
    }

    #[test]
    fn test_canonical_group_identity() {
        let mut ctx = make_context();
        let g1 = ctx.get_group(Matcher::all_of([POSITION, VELOCITY]).none_of([FROZEN]));
        let g2 = ctx.get_group(Matcher::all_of([VELOCITY, POSITION]).none_of([FROZEN]));
        let g3 = ctx.get_group(Matcher::all_of([POSITION]));
        assert_eq!(g1, g2);
        assert_ne!(g1, g3);
        assert_eq!(ctx.group_count(), 2);
    }

    #[test]
    fn test_group_created_notification() {
        let mut ctx = make_context();
        let created = Rc::new(RefCell::new(Vec::new()));
        let created_in = created.clone();
        ctx.on_group_created(move |_, gid| created_in.borrow_mut().push(gid));

        let gid = ctx.get_group(Matcher::all_of([POSITION]));
        // Cache hit: no second notification.
        let _ = ctx.get_group(Matcher::all_of([POSITION]));
        assert_eq!(*created.borrow(), vec![gid]);
    }

    #[test]
    fn test_replace_emits_update_without_transition() {
        let mut ctx = make_context();
        let e = ctx.create_entity().unwrap();
        ctx.add_component(e, POSITION, 1u32).unwrap();
        let gid = ctx.get_group(Matcher::all_of([POSITION]));

        let changes = Rc::new(RefCell::new(Vec::new()));
        let changes_in = changes.clone();
        ctx.on_group_changed(gid, move |_, event| {
            changes_in.borrow_mut().push(event.change);
        });

        ctx.replace_component(e, POSITION, 2u32).unwrap();
        assert_eq!(*ctx.component::<u32>(e, POSITION).unwrap(), 2);
        assert_eq!(*changes.borrow(), vec![GroupChange::Updated]);
        assert_eq!(ctx.group(gid).len(), 1);

        // Replace on an empty slot behaves as an add.
        ctx.replace_component(e, VELOCITY, 3u32).unwrap();
        assert_eq!(*ctx.component::<u32>(e, VELOCITY).unwrap(), 3);
    }

    #[test]
    fn test_component_change_event_carries_previous_value() {
        let mut ctx = make_context();
        let e = ctx.create_entity().unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_in = seen.clone();
        ctx.on_component_changed(move |_, change| {
            let previous = change
                .previous
                .and_then(|value| value.downcast_ref::<u32>().copied());
            seen_in.borrow_mut().push((change.action, previous));
        });

        ctx.add_component(e, POSITION, 1u32).unwrap();
        ctx.replace_component(e, POSITION, 2u32).unwrap();
        ctx.remove_component(e, POSITION).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![
                (ChangeAction::Added, None),
                (ChangeAction::Replaced, Some(1)),
                (ChangeAction::Removed, Some(2)),
            ]
        );
    }

    #[test]
    fn test_removed_component_returns_to_pool() {
        let mut ctx = make_context();
        let e = ctx.create_entity().unwrap();
        ctx.add_component(e, POSITION, 42u32).unwrap();
        assert_eq!(ctx.pooled_count(POSITION), 0);

        ctx.remove_component(e, POSITION).unwrap();
        assert_eq!(ctx.pooled_count(POSITION), 1);

        let recycled = ctx.checkout_component(POSITION).unwrap().unwrap();
        assert_eq!(*recycled.downcast_ref::<u32>().unwrap(), 42);
        assert_eq!(ctx.pooled_count(POSITION), 0);
        assert!(matches!(
            ctx.checkout_component(ComponentKind(9)),
            Err(ContextError::UnknownKind { .. })
        ));
    }

    #[test]
    fn test_destroy_returns_all_components_to_pools() {
        let mut ctx = make_context();
        let e = ctx.create_entity().unwrap();
        ctx.add_component(e, POSITION, 1u32).unwrap();
        ctx.add_component(e, VELOCITY, 2u32).unwrap();

        ctx.destroy_entity(e).unwrap();
        assert_eq!(ctx.pooled_count(POSITION), 1);
        assert_eq!(ctx.pooled_count(VELOCITY), 1);
    }

    // The second concrete scenario: destruction under external retention
    // defers reclamation until the holder releases.
    #[test]
    fn test_retain_defers_reclamation_until_release() {
        let mut ctx = make_context();
        let e = ctx.create_entity().unwrap();
        let token = OwnerToken::new();
        ctx.retain(e, token).unwrap();
        assert_eq!(ctx.retain_count(e).unwrap(), 2); // context + token

        ctx.destroy_entity(e).unwrap();
        assert!(!ctx.has_entity(e));
        assert_eq!(ctx.retained_count(), 1);
        assert_eq!(ctx.reusable_count(), 0);
        // Destruction-pending entities reject mutation but still resolve.
        assert!(matches!(
            ctx.add_component(e, POSITION, 1u32),
            Err(ContextError::EntityNotEnabled(_))
        ));

        ctx.release(e, token).unwrap();
        assert_eq!(ctx.retained_count(), 0);
        assert_eq!(ctx.reusable_count(), 1);
        // The handle is stale once the slot is reclaimed.
        assert!(matches!(
            ctx.retain_count(e),
            Err(ContextError::EntityNotFound(_))
        ));
    }

    #[test]
    fn test_release_balance_and_single_released_notification() {
        let mut ctx = make_context();
        let e = ctx.create_entity().unwrap();
        let t1 = OwnerToken::new();
        let t2 = OwnerToken::new();
        ctx.retain(e, t1).unwrap();
        ctx.retain(e, t2).unwrap();

        let released = Rc::new(RefCell::new(0));
        let released_in = released.clone();
        ctx.on_entity_released(move |_, _| *released_in.borrow_mut() += 1);

        ctx.destroy_entity(e).unwrap();
        assert_eq!(*released.borrow(), 0);

        ctx.release(e, t1).unwrap();
        assert_eq!(ctx.retained_count(), 1);
        assert_eq!(*released.borrow(), 0);

        ctx.release(e, t2).unwrap();
        assert_eq!(ctx.retained_count(), 0);
        assert_eq!(*released.borrow(), 1);
    }

    #[test]
    fn test_retain_release_contract_errors() {
        let mut ctx = make_context();
        let e = ctx.create_entity().unwrap();
        let token = OwnerToken::new();

        assert!(matches!(
            ctx.release(e, token),
            Err(ContextError::OwnerDoesNotRetain { .. })
        ));
        ctx.retain(e, token).unwrap();
        assert!(matches!(
            ctx.retain(e, token),
            Err(ContextError::AlreadyRetained { .. })
        ));
        ctx.release(e, token).unwrap();
        ctx.destroy_entity(e).unwrap();
    }

    #[test]
    fn test_destroy_unknown_entity_is_a_contract_violation() {
        let mut ctx = make_context();
        let e = ctx.create_entity().unwrap();
        ctx.destroy_entity(e).unwrap();
        assert!(matches!(
            ctx.destroy_entity(e),
            Err(ContextError::EntityNotFound(_))
        ));
    }

    #[test]
    fn test_destroy_all_fails_loud_on_leaked_retention() {
        let mut ctx = make_context();
        let _ = ctx.create_entity().unwrap();
        let leaked = ctx.create_entity().unwrap();
        let token = OwnerToken::new();
        ctx.retain(leaked, token).unwrap();

        match ctx.destroy_all_entities() {
            Err(ContextError::StillRetained(ids)) => assert_eq!(ids, vec![leaked.id()]),
            other => panic!("expected StillRetained, got {other:?}"),
        }
        assert_eq!(ctx.entity_count(), 0);

        ctx.release(leaked, token).unwrap();
        ctx.destroy_all_entities().unwrap();
        assert_eq!(ctx.retained_count(), 0);
    }

    #[test]
    fn test_destroy_all_clears_population() {
        let mut ctx = make_context();
        for _ in 0..4 {
            let e = ctx.create_entity().unwrap();
            ctx.add_component(e, POSITION, 0u32).unwrap();
        }
        let gid = ctx.get_group(Matcher::all_of([POSITION]));

        ctx.destroy_all_entities().unwrap();
        assert_eq!(ctx.entity_count(), 0);
        assert_eq!(ctx.reusable_count(), 4);
        assert!(ctx.group(gid).is_empty());
    }

    #[test]
    fn test_stale_handle_after_slot_reuse() {
        let mut ctx = make_context();
        let old = ctx.create_entity().unwrap();
        ctx.destroy_entity(old).unwrap();
        let new = ctx.create_entity().unwrap();
        assert_eq!(new.slot, old.slot);

        assert!(!ctx.has_entity(old));
        assert!(matches!(
            ctx.component::<u32>(old, POSITION),
            Err(ContextError::EntityNotFound(_))
        ));
        assert!(matches!(
            ctx.destroy_entity(old),
            Err(ContextError::EntityNotFound(_))
        ));
        assert!(ctx.has_entity(new));
    }

    #[test]
    fn test_destruction_listeners_observe_component_teardown() {
        let mut ctx = make_context();
        let e = ctx.create_entity().unwrap();
        ctx.add_component(e, POSITION, 1u32).unwrap();

        let observed = Rc::new(RefCell::new(Vec::new()));
        let at_will = observed.clone();
        ctx.on_entity_will_be_destroyed(move |ctx, entity| {
            at_will
                .borrow_mut()
                .push(("will", ctx.has_component(entity, POSITION)));
        });
        let at_done = observed.clone();
        ctx.on_entity_destroyed(move |ctx, entity| {
            at_done
                .borrow_mut()
                .push(("done", ctx.has_component(entity, POSITION)));
        });

        ctx.destroy_entity(e).unwrap();
        assert_eq!(*observed.borrow(), vec![("will", true), ("done", false)]);
    }

    #[test]
    fn test_destructive_reentry_is_rejected() {
        let mut ctx = make_context();
        let e = ctx.create_entity().unwrap();

        let reentry = Rc::new(RefCell::new(None));
        let reentry_in = reentry.clone();
        ctx.on_entity_will_be_destroyed(move |ctx, entity| {
            *reentry_in.borrow_mut() = Some(ctx.destroy_entity(entity));
        });

        ctx.destroy_entity(e).unwrap();
        assert!(matches!(
            reentry.borrow().as_ref(),
            Some(Err(ContextError::EntityNotFound(_)))
        ));
    }

    #[test]
    fn test_listener_registered_during_dispatch_survives() {
        let mut ctx = make_context();
        let inner_calls = Rc::new(RefCell::new(0));
        let inner_calls_out = inner_calls.clone();
        ctx.on_entity_created(move |ctx, _| {
            let inner_calls_in = inner_calls_out.clone();
            ctx.on_entity_created(move |_, _| *inner_calls_in.borrow_mut() += 1);
        });

        let _ = ctx.create_entity().unwrap();
        assert_eq!(*inner_calls.borrow(), 0);
        let _ = ctx.create_entity().unwrap();
        assert!(*inner_calls.borrow() >= 1);
    }

    #[test]
    fn test_unique_component_convention() {
        let mut ctx = make_context();
        let carrier = ctx.add_unique(CONFIG, 10u32, false).unwrap();
        assert_eq!(ctx.single_entity(CONFIG), Some(carrier));
        assert_eq!(ctx.unique::<u32>(CONFIG).copied(), Some(10));

        match ctx.add_unique(CONFIG, 11u32, false) {
            Err(ContextError::AlreadyUnique { holder, .. }) => assert_eq!(holder, carrier.id()),
            other => panic!("expected AlreadyUnique, got {other:?}"),
        }

        let reused = ctx.add_unique(CONFIG, 12u32, true).unwrap();
        assert_eq!(reused, carrier);
        assert_eq!(ctx.unique::<u32>(CONFIG).copied(), Some(12));

        let modified = ctx.modify_unique(CONFIG, 13u32).unwrap();
        assert_eq!(modified, carrier);
        assert_eq!(ctx.unique::<u32>(CONFIG).copied(), Some(13));
        assert_eq!(ctx.entity_count(), 1);
    }

    #[test]
    fn test_reset_recycles_the_context() {
        let mut ctx = make_context();
        let created = Rc::new(RefCell::new(0));
        let created_in = created.clone();
        ctx.on_entity_created(move |_, _| *created_in.borrow_mut() += 1);

        let e = ctx.create_entity().unwrap();
        ctx.add_component(e, POSITION, 1u32).unwrap();
        let gid = ctx.get_group(Matcher::all_of([POSITION]));
        assert_eq!(*created.borrow(), 1);

        ctx.reset().unwrap();
        assert_eq!(ctx.entity_count(), 0);

        // Ids restart, old listeners are gone, groups survive and keep
        // tracking the new population.
        let e = ctx.create_entity().unwrap();
        assert_eq!(e.id(), EntityId(1));
        assert_eq!(*created.borrow(), 1);
        ctx.add_component(e, POSITION, 2u32).unwrap();
        assert_eq!(ctx.group(gid).len(), 1);
    }

    #[test]
    fn test_create_during_reset_fails() {
        let mut ctx = make_context();
        let _ = ctx.create_entity().unwrap();

        let attempt = Rc::new(RefCell::new(None));
        let attempt_in = attempt.clone();
        ctx.on_entity_will_be_destroyed(move |ctx, _| {
            *attempt_in.borrow_mut() = Some(ctx.create_entity().map(|_| ()));
        });

        ctx.reset().unwrap();
        assert!(matches!(
            attempt.borrow().as_ref(),
            Some(Err(ContextError::InvalidState(_)))
        ));
    }

    // Scripted sweep of the core correctness property: after every
    // operation, every group equals a brute-force scan of the population.
    #[test]
    fn test_group_consistency_over_scripted_mutations() {
        let mut ctx = make_context();
        let movers = ctx.get_group(Matcher::all_of([POSITION, VELOCITY]).none_of([FROZEN]));
        let tagged = ctx.get_group(Matcher::any_of([FROZEN, CONFIG]));
        let positioned = ctx.get_group(Matcher::all_of([POSITION]));
        let groups = [movers, tagged, positioned];

        let mut entities = Vec::new();
        for i in 0..6u32 {
            let e = ctx.create_entity().unwrap();
            ctx.add_component(e, POSITION, i).unwrap();
            if i % 2 == 0 {
                ctx.add_component(e, VELOCITY, i).unwrap();
            }
            if i % 3 == 0 {
                ctx.add_component(e, FROZEN, ()).unwrap();
            }
            entities.push(e);
            for gid in groups {
                assert_group_consistency(&mut ctx, gid);
            }
        }

        ctx.remove_component(entities[0], FROZEN).unwrap();
        ctx.replace_component(entities[1], VELOCITY, 9u32).unwrap();
        ctx.remove_component(entities[2], VELOCITY).unwrap();
        ctx.add_component(entities[5], CONFIG, 0u32).unwrap();
        for gid in groups {
            assert_group_consistency(&mut ctx, gid);
        }

        ctx.destroy_entity(entities[3]).unwrap();
        ctx.destroy_entity(entities[0]).unwrap();
        for gid in groups {
            assert_group_consistency(&mut ctx, gid);
        }

        let late = ctx.create_entity().unwrap();
        ctx.add_component(late, POSITION, 0u32).unwrap();
        ctx.add_component(late, VELOCITY, 0u32).unwrap();
        for gid in groups {
            assert_group_consistency(&mut ctx, gid);
        }
    }

    #[test]
    fn test_display_reports_population_counters() {
        let mut ctx = make_context();
        let e = ctx.create_entity().unwrap();
        let _ = ctx.create_entity().unwrap();
        ctx.destroy_entity(e).unwrap();
        let _ = ctx.get_group(Matcher::all_of([POSITION]));

        assert_eq!(
            ctx.to_string(),
            "Context 'test' (1 entities, 0 retained, 1 reusable, 1 groups)"
        );
    }
}
