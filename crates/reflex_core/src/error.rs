//! Context-layer error types.
//!
//! Every variant reflects caller misuse or an upstream invariant violation;
//! nothing here is transient and there is no retry policy anywhere in this
//! crate.

use crate::entity::EntityId;

/// Errors returned by context operations.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// The handle does not resolve: the entity was never created here, was
    /// fully released and its slot reused, or is not currently tracked.
    #[error("{0} is not tracked by this context")]
    EntityNotFound(EntityId),

    /// Component mutation attempted on a destroyed (disabled) entity.
    #[error("{0} is not enabled; it cannot be mutated")]
    EntityNotEnabled(EntityId),

    /// `add_component` on an occupied slot.
    #[error("{entity} already has component '{kind}'")]
    AlreadyHasComponent { entity: EntityId, kind: String },

    /// `remove_component` (or a typed read) on an empty slot.
    #[error("{entity} does not have component '{kind}'")]
    DoesNotHaveComponent { entity: EntityId, kind: String },

    /// A typed read found a value of a different type in the slot.
    #[error("component '{kind}' on {entity} holds a different type")]
    WrongComponentType { entity: EntityId, kind: String },

    /// A component kind outside the context's declared kind count.
    #[error("component kind {kind} is out of range (context has {kind_count} kinds)")]
    UnknownKind { kind: u32, kind_count: u32 },

    /// `retain` with a token that already holds the entity.
    #[error("owner already retains {entity}")]
    AlreadyRetained { entity: EntityId },

    /// `release` with a token that never retained the entity.
    #[error("owner does not retain {entity}")]
    OwnerDoesNotRetain { entity: EntityId },

    /// `destroy_all_entities` found externally retained entities after
    /// destroying the whole population — a collaborator leaked a retention.
    #[error("entities still retained after destroy-all: {0:?}")]
    StillRetained(Vec<EntityId>),

    /// `add_unique` without reuse while another entity already carries the
    /// kind. Recoverable: test first or allow reuse.
    #[error("unique component '{kind}' already present on {holder}")]
    AlreadyUnique { kind: String, holder: EntityId },

    /// The context cannot serve the operation in its current state.
    #[error("invalid context state: {0}")]
    InvalidState(&'static str),
}
