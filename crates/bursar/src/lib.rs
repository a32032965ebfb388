//! # Bursar
//!
//! **Modular account ledger core: configuration, services, and account
//! schemas.**
//!
//! Bursar is the shared core of a modular server-side ledger. Feature
//! modules developed independently meet in three places:
//!
//! - a process-wide [`ServiceRegistry`](bursar_core::ServiceRegistry) with
//!   explicit factory-based dependency injection,
//! - a single shared `config.yml`, loaded exactly once per process by the
//!   [`ConfigLoader`](bursar_config::ConfigLoader) no matter how many
//!   modules race to read it, self-repairing and self-documenting through
//!   the [`ConfigParser`](bursar_config::ConfigParser),
//! - a closed family of [`AccountSchema`](bursar_schema::AccountSchema)
//!   variants describing which account a piece of config points at, driven
//!   to completion with runtime [`Variable`](bursar_schema::Variable)s.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use bursar::commands::CommandsConfig;
//! use bursar::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! # let dir = tempfile::tempdir().unwrap();
//! let registry = Arc::new(ServiceRegistry::new());
//! registry.store(Arc::new(SchemaRegistry::with_defaults()));
//!
//! let modules = ModuleSet::new().register::<CommandsConfig>();
//! # let loader = ConfigLoader::new(dir.path().join("config.yml"), modules, registry);
//! let commands: Arc<CommandsConfig> = loader.load().await.unwrap();
//! assert!(!commands.is_empty());
//! # }
//! ```

pub use bursar_core as core;

pub use bursar_config as config;

pub use bursar_schema as schema;

pub mod commands;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use bursar::prelude::*;
/// ```
pub mod prelude {
    pub use bursar_core::{EntityId, EntityRef, RegistryError, ServiceKey, ServiceRegistry};

    pub use bursar_config::{
        ConfigLoader, ConfigModule, ConfigParser, Document, LoadError, ModuleSet, ParseError,
    };

    pub use bursar_schema::{
        AccountSchema, LabelSelector, SchemaKind, SchemaRegistry, SetupPlan, Variable,
        VariableSlot,
    };
}
