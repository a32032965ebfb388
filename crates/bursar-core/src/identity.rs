//! Identity of runtime entities.
//!
//! Configuration schemas can depend on runtime-supplied parameters such as
//! "the player this command operates on". An [`EntityRef`] is that parameter:
//! a stable id plus a display name, cheap to clone and pass around.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Generate a new unique entity ID.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create an entity ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EntityId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// A reference to a runtime entity (e.g., a player or an account holder).
///
/// # Example
///
/// ```
/// use bursar_core::EntityRef;
///
/// let player = EntityRef::named("alice");
/// assert_eq!(player.name, "alice");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    /// Stable identity of the entity.
    pub id: EntityId,
    /// Human-readable name, used in label templating.
    pub name: String,
}

impl EntityRef {
    /// Creates an entity reference with a fresh id.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
        }
    }

    /// Creates an entity reference with an explicit id.
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ids_are_unique() {
        assert_ne!(EntityId::new(), EntityId::new());
    }

    #[test]
    fn test_entity_ref_display() {
        let entity = EntityRef::named("bob");
        let display = entity.to_string();
        assert!(display.starts_with("bob ("));
    }

    #[test]
    fn test_entity_id_round_trips_through_uuid() {
        let id = EntityId::new();
        assert_eq!(EntityId::from_uuid(*id.as_uuid()), id);
    }
}
