//! Typed variable slots and their fulfillment descriptors.
//!
//! A schema's runtime parameters are [`VariableSlot`]s owned by the schema
//! instance. Consumers never see the slots directly; they see [`Variable`]
//! descriptors, each pairing a human-readable purpose with a callback that
//! accepts a runtime value and moves the owning schema toward completeness.
//!
//! A slot is *required* until a value is supplied through its descriptor,
//! then *optional* forever after; the transition is irreversible for the
//! instance. Supplying the same slot twice is a hard usage error surfaced to
//! the caller, never a silent no-op.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use bursar_core::EntityRef;

use crate::error::SchemaError;

struct SlotCell {
    value: Option<EntityRef>,
    required: bool,
}

/// A named parameter slot owned by a schema instance.
///
/// The slot shares its cell with every descriptor handed out for it, so a
/// value supplied through a descriptor is visible to the owning schema.
#[derive(Clone)]
pub struct VariableSlot {
    purpose: String,
    cell: Arc<Mutex<SlotCell>>,
}

impl VariableSlot {
    /// A slot that must be supplied before the schema is complete.
    pub fn required(purpose: impl Into<String>) -> Self {
        Self {
            purpose: purpose.into(),
            cell: Arc::new(Mutex::new(SlotCell {
                value: None,
                required: true,
            })),
        }
    }

    /// A slot that never blocks completeness but may still take a value.
    pub fn optional(purpose: impl Into<String>) -> Self {
        Self {
            purpose: purpose.into(),
            cell: Arc::new(Mutex::new(SlotCell {
                value: None,
                required: false,
            })),
        }
    }

    /// A slot pre-filled from static configuration.
    pub fn preset(purpose: impl Into<String>, entity: EntityRef) -> Self {
        Self {
            purpose: purpose.into(),
            cell: Arc::new(Mutex::new(SlotCell {
                value: Some(entity),
                required: false,
            })),
        }
    }

    /// The slot's human-readable purpose.
    pub fn purpose(&self) -> &str {
        &self.purpose
    }

    /// Whether the slot still blocks completeness.
    pub fn is_pending(&self) -> bool {
        let cell = self.cell.lock();
        cell.required && cell.value.is_none()
    }

    /// The supplied value, if any.
    pub fn value(&self) -> Option<EntityRef> {
        self.cell.lock().value.clone()
    }

    /// Issues a fulfillment descriptor sharing this slot's cell.
    pub fn descriptor(&self) -> Variable {
        Variable {
            purpose: self.purpose.clone(),
            cell: Arc::clone(&self.cell),
        }
    }

    /// An independent copy of this slot carrying the current value.
    ///
    /// Used by `clone_with_config`: the copy has its own cell, so supplying
    /// the clone leaves the original untouched.
    pub fn duplicate(&self) -> Self {
        let cell = self.cell.lock();
        Self {
            purpose: self.purpose.clone(),
            cell: Arc::new(Mutex::new(SlotCell {
                value: cell.value.clone(),
                required: cell.required,
            })),
        }
    }
}

impl std::fmt::Debug for VariableSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableSlot")
            .field("purpose", &self.purpose)
            .field("pending", &self.is_pending())
            .finish()
    }
}

/// A fulfillment descriptor for one schema parameter.
///
/// # Example
///
/// ```
/// use bursar_core::EntityRef;
/// use bursar_schema::VariableSlot;
///
/// let slot = VariableSlot::required("the targeted player");
/// let variable = slot.descriptor();
///
/// assert!(slot.is_pending());
/// variable.supply(EntityRef::named("alice")).unwrap();
/// assert!(!slot.is_pending());
///
/// // A second invocation is a usage error, fatal to the caller.
/// assert!(variable.supply(EntityRef::named("bob")).is_err());
/// ```
pub struct Variable {
    purpose: String,
    cell: Arc<Mutex<SlotCell>>,
}

impl Variable {
    /// The variable's human-readable purpose.
    pub fn purpose(&self) -> &str {
        &self.purpose
    }

    /// Supplies the runtime value for this slot.
    ///
    /// Fails with [`SchemaError::VariableAlreadySupplied`] if the slot
    /// already holds a value, whether from an earlier supply or a preset.
    pub fn supply(&self, entity: EntityRef) -> Result<(), SchemaError> {
        let mut cell = self.cell.lock();
        if cell.value.is_some() {
            return Err(SchemaError::already_supplied(&self.purpose));
        }
        trace!(purpose = %self.purpose, entity = %entity, "variable supplied");
        cell.value = Some(entity);
        Ok(())
    }
}

impl std::fmt::Debug for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Variable")
            .field("purpose", &self.purpose)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_slot_is_pending_until_supplied() {
        let slot = VariableSlot::required("owner");
        assert!(slot.is_pending());
        assert!(slot.value().is_none());

        slot.descriptor().supply(EntityRef::named("alice")).unwrap();
        assert!(!slot.is_pending());
        assert_eq!(slot.value().unwrap().name, "alice");
    }

    #[test]
    fn test_second_supply_is_hard_error() {
        let slot = VariableSlot::required("owner");
        let variable = slot.descriptor();
        variable.supply(EntityRef::named("alice")).unwrap();

        let err = variable.supply(EntityRef::named("bob")).unwrap_err();
        assert!(matches!(err, SchemaError::VariableAlreadySupplied { .. }));
        // The first value stands.
        assert_eq!(slot.value().unwrap().name, "alice");
    }

    #[test]
    fn test_preset_slot_rejects_supply() {
        let slot = VariableSlot::preset("owner", EntityRef::named("fixed"));
        assert!(!slot.is_pending());
        assert!(slot.descriptor().supply(EntityRef::named("other")).is_err());
    }

    #[test]
    fn test_optional_slot_never_pending_but_accepts_one_value() {
        let slot = VariableSlot::optional("delegate");
        assert!(!slot.is_pending());

        let variable = slot.descriptor();
        variable.supply(EntityRef::named("carol")).unwrap();
        assert!(!slot.is_pending());
        assert!(variable.supply(EntityRef::named("dave")).is_err());
    }

    #[test]
    fn test_duplicate_is_independent() {
        let slot = VariableSlot::required("owner");
        let copy = slot.duplicate();

        copy.descriptor().supply(EntityRef::named("alice")).unwrap();
        assert!(slot.is_pending());
        assert!(!copy.is_pending());
    }

    #[test]
    fn test_descriptors_share_the_slot_cell() {
        let slot = VariableSlot::required("owner");
        let first = slot.descriptor();
        let second = slot.descriptor();

        first.supply(EntityRef::named("alice")).unwrap();
        // Both descriptors refer to the same slot, so the second is spent too.
        assert!(second.supply(EntityRef::named("bob")).is_err());
    }
}
