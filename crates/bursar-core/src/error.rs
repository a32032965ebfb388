//! Error types for service resolution.

use thiserror::Error;

/// Errors raised by the [`ServiceRegistry`](crate::ServiceRegistry).
///
/// Every variant indicates a programming error in service wiring, not a user
/// configuration error: these are fatal at service-construction time.
#[derive(Error, Debug, Clone)]
pub enum RegistryError {
    /// A service was requested that has neither been stored nor has a
    /// registered factory.
    #[error("service {type_name} is not registered")]
    NotRegistered {
        /// The type name that could not be resolved.
        type_name: &'static str,
    },

    /// A factory's declared dependency could not be resolved.
    #[error("cannot resolve dependency {type_name}: {reason}")]
    Dependency {
        /// The dependency's type name.
        type_name: &'static str,
        /// Why resolution failed.
        reason: String,
    },

    /// A stored service did not have the type its key promised.
    #[error("service {type_name} is stored with an unexpected type")]
    TypeMismatch {
        /// The expected type name.
        type_name: &'static str,
    },
}

impl RegistryError {
    /// Creates an error for a service that was never registered.
    pub fn not_registered<T>() -> Self {
        Self::NotRegistered {
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Creates a dependency-resolution error.
    pub fn dependency(type_name: &'static str, reason: impl Into<String>) -> Self {
        Self::Dependency {
            type_name,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LedgerService;

    #[test]
    fn test_not_registered_names_the_type() {
        let err = RegistryError::not_registered::<LedgerService>();
        assert!(err.to_string().contains("LedgerService"));
        assert!(err.to_string().contains("not registered"));
    }

    #[test]
    fn test_dependency_error_display() {
        let err = RegistryError::dependency("Database", "no factory registered");
        assert!(err.to_string().contains("Database"));
        assert!(err.to_string().contains("no factory registered"));
    }
}
