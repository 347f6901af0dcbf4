//! Notification channels and event payloads.
//!
//! Every channel is an explicit ordered list of boxed callbacks, invoked
//! synchronously in registration order before the triggering call returns.
//! During dispatch the context swaps the list out of itself, so a listener
//! receives `&mut Context` and may call back into it; registrations made
//! while dispatch is running are appended afterwards and take effect from
//! the next emission.
//!
//! For a single component mutation the order is: group membership is
//! evaluated first (transitions buffered), then the context-level
//! [`ComponentChange`] fires, then each buffered group transition fires in
//! subscriber order.

use std::any::Any;

use crate::component::ComponentKind;
use crate::context::Context;
use crate::entity::Entity;
use crate::group::{GroupChange, GroupId};

/// What happened to a component slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    /// An empty slot was filled.
    Added,
    /// An occupied slot was emptied.
    Removed,
    /// An occupied slot received a new value.
    Replaced,
}

/// Payload of the context-level component-change channel.
///
/// `previous` carries the outgoing value for removals and replacements; the
/// new value (or its absence) is readable through the context.
pub struct ComponentChange<'a> {
    /// The mutated entity.
    pub entity: Entity,
    /// The mutated component kind.
    pub kind: ComponentKind,
    /// Which mutation occurred.
    pub action: ChangeAction,
    /// The value leaving the slot, if any. Borrowed for the duration of the
    /// notification; afterwards it returns to the kind's pool.
    pub previous: Option<&'a (dyn Any + Send + Sync)>,
}

/// Payload of a per-group membership/update notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupEvent {
    /// The group whose view changed.
    pub group: GroupId,
    /// The entity involved.
    pub entity: Entity,
    /// The component kind whose mutation triggered the event.
    pub kind: ComponentKind,
    /// Membership transition, or an update in place.
    pub change: GroupChange,
}

pub(crate) type EntityListener = Box<dyn FnMut(&mut Context, Entity)>;
pub(crate) type GroupCreatedListener = Box<dyn FnMut(&mut Context, GroupId)>;
pub(crate) type ComponentListener = Box<dyn FnMut(&mut Context, &ComponentChange<'_>)>;
pub(crate) type GroupListener = Box<dyn FnMut(&mut Context, &GroupEvent)>;

/// The context-level listener lists, one per lifecycle channel.
#[derive(Default)]
pub(crate) struct ContextListeners {
    pub(crate) entity_created: Vec<EntityListener>,
    pub(crate) entity_will_be_destroyed: Vec<EntityListener>,
    pub(crate) entity_destroyed: Vec<EntityListener>,
    pub(crate) entity_released: Vec<EntityListener>,
    pub(crate) group_created: Vec<GroupCreatedListener>,
    pub(crate) component_changed: Vec<ComponentListener>,
}

impl ContextListeners {
    /// Drop every registered listener (context reset).
    pub(crate) fn clear(&mut self) {
        self.entity_created.clear();
        self.entity_will_be_destroyed.clear();
        self.entity_destroyed.clear();
        self.entity_released.clear();
        self.group_created.clear();
        self.component_changed.clear();
    }
}
