//! Demo component definitions for the reflex core.
//!
//! The core stores component values type-erased, keyed by
//! [`ComponentKind`] index. This crate plays the role of the generated
//! accessor layer: it fixes the kind table for a demo context and defines
//! the concrete value types stored in each slot.

use glam::Vec3;
use reflex_core::{ComponentKind, ContextInfo};
use serde::{Deserialize, Serialize};

/// The demo context's component kinds.
pub mod kinds {
    use reflex_core::ComponentKind;

    /// Slot for [`Position`](crate::Position).
    pub const POSITION: ComponentKind = ComponentKind(0);
    /// Slot for [`Velocity`](crate::Velocity).
    pub const VELOCITY: ComponentKind = ComponentKind(1);
    /// Slot for [`Health`](crate::Health).
    pub const HEALTH: ComponentKind = ComponentKind(2);
    /// Tag slot for [`Frozen`](crate::Frozen).
    pub const FROZEN: ComponentKind = ComponentKind(3);
    /// Unique slot for [`BoardConfig`](crate::BoardConfig).
    pub const BOARD_CONFIG: ComponentKind = ComponentKind(4);
}

/// Context metadata matching the [`kinds`] table.
#[must_use]
pub fn context_info() -> ContextInfo {
    ContextInfo::new(
        "demo",
        ["position", "velocity", "health", "frozen", "board_config"],
    )
}

/// A 3D position component.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    /// World-space location.
    pub point: Vec3,
}

impl Position {
    /// Create a new position.
    #[must_use]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            point: Vec3::new(x, y, z),
        }
    }
}

/// A 3D velocity component.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Velocity {
    /// Linear velocity in world units per second.
    pub linear: Vec3,
}

impl Velocity {
    /// Zero velocity.
    pub const ZERO: Self = Self { linear: Vec3::ZERO };

    /// Create a new velocity.
    #[must_use]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            linear: Vec3::new(x, y, z),
        }
    }
}

impl Default for Velocity {
    fn default() -> Self {
        Self::ZERO
    }
}

/// A health component with current and maximum hit points.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Health {
    /// Current hit points.
    pub current: f32,
    /// Maximum hit points.
    pub max: f32,
}

impl Health {
    /// Create a new health component at full HP.
    #[must_use]
    pub fn full(max: f32) -> Self {
        Self { current: max, max }
    }

    /// Returns `true` if the entity is alive (HP > 0).
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    /// Apply damage, clamping to zero.
    pub fn damage(&mut self, amount: f32) {
        self.current = (self.current - amount).max(0.0);
    }

    /// Heal, clamping to max.
    pub fn heal(&mut self, amount: f32) {
        self.current = (self.current + amount).min(self.max);
    }
}

/// Tag component marking an entity as excluded from movement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Frozen;

/// Board-wide settings, carried by exactly one entity (unique convention).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoardConfig {
    /// Downward acceleration applied to movers.
    pub gravity: f32,
    /// Simulation steps per second.
    pub tick_rate: f64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            gravity: -9.81,
            tick_rate: 60.0,
        }
    }
}
