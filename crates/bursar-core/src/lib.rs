//! Core types for the Bursar configuration system.
//!
//! This crate provides the substrate the rest of Bursar is wired through:
//!
//! - [`ServiceRegistry`] - process-wide singleton store with explicit factory
//!   registration and ordered dependency resolution
//! - [`EntityRef`] / [`EntityId`] - identity of the runtime entities (players,
//!   accounts) that parameterize configuration schemas
//! - [`RegistryError`] - error vocabulary for service resolution

pub mod error;
pub mod identity;
pub mod registry;

pub use error::RegistryError;
pub use identity::{EntityId, EntityRef};
pub use registry::{ServiceKey, ServiceRegistry};
