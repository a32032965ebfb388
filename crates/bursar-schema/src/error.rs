//! Schema error types.

use thiserror::Error;

/// Errors raised by the schema/variable protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A variable descriptor was invoked a second time for the same slot.
    ///
    /// Fatal to the caller (a usage error), not to the process: the schema
    /// instance keeps its first supplied value.
    #[error("variable `{purpose}` has already been supplied")]
    VariableAlreadySupplied {
        /// The variable's human-readable purpose.
        purpose: String,
    },

    /// `clone_with_config` was given structurally invalid overrides.
    ///
    /// Surfaced to the schema's direct caller; never affects the global
    /// configuration load pass.
    #[error("invalid schema override `{key}`: {reason}")]
    InvalidOverride {
        /// The offending override key.
        key: String,
        /// Why the override is invalid.
        reason: String,
    },
}

impl SchemaError {
    /// Creates an already-supplied error.
    pub fn already_supplied(purpose: impl Into<String>) -> Self {
        Self::VariableAlreadySupplied {
            purpose: purpose.into(),
        }
    }

    /// Creates an invalid-override error.
    pub fn invalid_override(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOverride {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_supplied_display() {
        let err = SchemaError::already_supplied("the targeted player");
        assert!(err.to_string().contains("the targeted player"));
    }

    #[test]
    fn test_invalid_override_display() {
        let err = SchemaError::invalid_override("initial-balance", "expected a number");
        assert!(err.to_string().contains("initial-balance"));
        assert!(err.to_string().contains("expected a number"));
    }
}
