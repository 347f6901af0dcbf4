//! Component kinds, context metadata, and per-kind reusable pools.
//!
//! Component *values* are opaque to this crate: an entity owns one slot per
//! kind, and a slot holds a type-erased box. The typed accessor layer that
//! turns slots into concrete component types is generated tooling that sits
//! on top of this crate.

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A type-erased component value, as stored in an entity slot and recycled
/// through [`ComponentPools`].
pub type ComponentBox = Box<dyn Any + Send + Sync>;

/// Identifies a category of data attachable to an entity (e.g. "position").
///
/// Kinds are small indices below [`ContextInfo::kind_count`]. Every entity in
/// a context has exactly one slot per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentKind(pub u32);

impl ComponentKind {
    /// Returns the kind as a slot index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kind({})", self.0)
    }
}

/// Context metadata: a display name plus the ordered list of component-kind
/// names. The kind count fixes the slot-table width of every entity; the
/// names appear only in diagnostics.
#[derive(Debug, Clone)]
pub struct ContextInfo {
    name: String,
    kind_names: Vec<String>,
}

impl ContextInfo {
    /// Create context metadata from a name and per-kind display names.
    ///
    /// The number of names is the context's total component-kind count.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, kind_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind_names: kind_names.into_iter().map(Into::into).collect(),
        }
    }

    /// The context's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total number of component kinds.
    #[must_use]
    pub fn kind_count(&self) -> usize {
        self.kind_names.len()
    }

    /// Human-readable name of a kind, for diagnostics.
    #[must_use]
    pub fn kind_name(&self, kind: ComponentKind) -> &str {
        self.kind_names
            .get(kind.index())
            .map_or("<unknown>", String::as_str)
    }
}

/// Per-kind reusable component pools.
///
/// Removed component values are not dropped; they are parked here and handed
/// back out on the next checkout of the same kind (LIFO). The context is the
/// only writer, which guarantees no two live references to the same pooled
/// value ever exist.
#[derive(Debug, Default)]
pub struct ComponentPools {
    pools: Box<[Vec<ComponentBox>]>,
}

impl ComponentPools {
    /// Create one empty pool per component kind.
    #[must_use]
    pub fn new(kind_count: usize) -> Self {
        Self {
            pools: (0..kind_count).map(|_| Vec::new()).collect(),
        }
    }

    /// Pop the most recently returned value of `kind`, if any.
    pub fn checkout(&mut self, kind: ComponentKind) -> Option<ComponentBox> {
        self.pools.get_mut(kind.index())?.pop()
    }

    /// Return a value of `kind` to its pool.
    pub fn put_back(&mut self, kind: ComponentKind, value: ComponentBox) {
        if let Some(pool) = self.pools.get_mut(kind.index()) {
            pool.push(value);
        }
    }

    /// Number of values currently parked for `kind`.
    #[must_use]
    pub fn len(&self, kind: ComponentKind) -> usize {
        self.pools.get(kind.index()).map_or(0, Vec::len)
    }

    /// Returns `true` if no kind has any pooled value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.iter().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_info_counts_and_names() {
        let info = ContextInfo::new("game", ["position", "velocity"]);
        assert_eq!(info.name(), "game");
        assert_eq!(info.kind_count(), 2);
        assert_eq!(info.kind_name(ComponentKind(1)), "velocity");
        assert_eq!(info.kind_name(ComponentKind(9)), "<unknown>");
    }

    #[test]
    fn test_pool_checkout_empty() {
        let mut pools = ComponentPools::new(2);
        assert!(pools.checkout(ComponentKind(0)).is_none());
        assert!(pools.is_empty());
    }

    #[test]
    fn test_pool_put_back_then_checkout_lifo() {
        let mut pools = ComponentPools::new(1);
        pools.put_back(ComponentKind(0), Box::new(1u32));
        pools.put_back(ComponentKind(0), Box::new(2u32));
        assert_eq!(pools.len(ComponentKind(0)), 2);

        let value = pools.checkout(ComponentKind(0)).unwrap();
        assert_eq!(*value.downcast_ref::<u32>().unwrap(), 2);
        assert_eq!(pools.len(ComponentKind(0)), 1);
    }

    #[test]
    fn test_pool_out_of_range_kind_is_inert() {
        let mut pools = ComponentPools::new(1);
        pools.put_back(ComponentKind(7), Box::new(0u8));
        assert!(pools.checkout(ComponentKind(7)).is_none());
        assert_eq!(pools.len(ComponentKind(7)), 0);
    }
}
