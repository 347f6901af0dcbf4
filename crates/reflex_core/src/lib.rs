//! # reflex_core
//!
//! Runtime core of the reflex entity-component system: a [`Context`] owns a
//! population of lightweight entities, client code attaches and detaches
//! typed component values by kind, and [`Group`]s materialize "all entities
//! matching a predicate" incrementally — membership is updated per mutation
//! instead of re-scanning the population every frame.
//!
//! This crate provides:
//!
//! - [`Context`] — entity lifecycle, group cache, change routing.
//! - [`Entity`] / [`EntityId`] — generation-tagged handles and monotonic ids.
//! - [`Matcher`] — immutable all-of/none-of/any-of predicates, the canonical
//!   group-cache key.
//! - [`Group`] — the live result set of one matcher, with add/remove/update
//!   notifications.
//! - [`OwnerToken`] — the retain/release protocol for holders that keep an
//!   entity alive past its destruction.
//! - [`ComponentPools`] — per-kind recycling of removed component values.
//!
//! Entity storage is slot-pooled: destroyed and fully released entities
//! return their arena slot to a free list, and the slot generation is bumped
//! so stale handles fail instead of aliasing the next occupant.

pub mod component;
pub mod context;
pub mod entity;
pub mod error;
pub mod events;
pub mod group;
pub mod matcher;

pub use component::{ComponentBox, ComponentKind, ComponentPools, ContextInfo};
pub use context::Context;
pub use entity::{Entity, EntityId, OwnerToken};
pub use error::ContextError;
pub use events::{ChangeAction, ComponentChange, GroupEvent};
pub use group::{Group, GroupChange, GroupId};
pub use matcher::Matcher;
