//! Process-wide service registry.
//!
//! Modules are wired together through a [`ServiceRegistry`]: a store mapping a
//! service's type identity to its singleton instance. Services are either
//! stored eagerly at startup or registered as factories and built lazily on
//! first resolution.
//!
//! Dependency resolution is explicit: a factory declares the ordered list of
//! [`ServiceKey`]s it needs, and the registry resolves them by table lookup.
//! There is no runtime type introspection beyond `TypeId`.
//!
//! # Example
//!
//! ```rust
//! use bursar_core::{ServiceKey, ServiceRegistry};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct Ledger {
//!     db: Arc<Database>,
//! }
//!
//! let registry = ServiceRegistry::new();
//! registry.store(Arc::new(Database { url: "sqlite::memory:".into() }));
//!
//! // Ledger is built lazily from its declared dependencies.
//! registry.register_factory(vec![ServiceKey::of::<Database>()], |mut deps| {
//!     let db = deps.remove(0).downcast::<Database>().expect("declared dependency");
//!     Arc::new(Ledger { db })
//! });
//!
//! let ledger: Arc<Ledger> = registry.fetch().unwrap();
//! assert_eq!(ledger.db.url, "sqlite::memory:");
//! ```
//!
//! # Reentrancy
//!
//! `store` synchronously invokes registered observers with no registry lock
//! held, so an observer may itself store other services, resolve
//! factory-backed types or subscribe further observers. An observer must not
//! store a service for the same type it is being notified about; doing so is
//! undefined behavior by contract and is not checked.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::error::RegistryError;

/// A type-erased singleton instance.
pub type AnyService = Arc<dyn Any + Send + Sync>;

type BuildFn = Box<dyn Fn(Vec<AnyService>) -> AnyService + Send + Sync>;
type StoreObserver = Arc<dyn Fn(ServiceKey) + Send + Sync>;

/// Identity of a service type: its `TypeId` plus a name for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceKey {
    id: TypeId,
    name: &'static str,
}

impl ServiceKey {
    /// The key for a concrete service type.
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The service's type name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A registered factory: an ordered dependency list plus a build function.
struct Factory {
    deps: Vec<ServiceKey>,
    build: BuildFn,
}

/// Process-wide store of singleton services.
///
/// At most one instance is held per type identity. `store` for an already
/// stored type replaces the instance and notifies observers; no uniqueness
/// error is raised.
///
/// # Thread Safety
///
/// The registry is `Send + Sync` and is normally shared as `Arc<ServiceRegistry>`.
#[derive(Default)]
pub struct ServiceRegistry {
    services: RwLock<HashMap<TypeId, AnyService>>,
    factories: RwLock<HashMap<TypeId, Arc<Factory>>>,
    observers: Mutex<Vec<StoreObserver>>,
}

impl ServiceRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a service under its own type identity.
    ///
    /// Overwriting an existing entry for the same identity is allowed; every
    /// store (initial or overwrite) synchronously notifies observers.
    pub fn store<T: Send + Sync + 'static>(&self, service: Arc<T>) {
        self.store_any(ServiceKey::of::<T>(), service);
    }

    /// Registers a factory for `T` with an explicit ordered dependency list.
    ///
    /// The service is built lazily on first resolution. The build function
    /// receives the resolved dependencies in declaration order.
    pub fn register_factory<T, F>(&self, deps: Vec<ServiceKey>, build: F)
    where
        T: Send + Sync + 'static,
        F: Fn(Vec<AnyService>) -> Arc<T> + Send + Sync + 'static,
    {
        let key = ServiceKey::of::<T>();
        trace!(service = key.name(), deps = deps.len(), "factory registered");
        self.factories.write().insert(
            key.id,
            Arc::new(Factory {
                deps,
                build: Box::new(move |resolved| build(resolved)),
            }),
        );
    }

    /// Returns the stored instance for `T`, or `None` if it was never stored
    /// and no factory can produce it. Never blocks on anything but the
    /// registry's own locks.
    #[must_use]
    pub fn fetch<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.try_fetch_any(ServiceKey::of::<T>())
            .ok()
            .and_then(|s| s.downcast::<T>().ok())
    }

    /// Resolves `T` or fails with a [`RegistryError`].
    pub fn fetch_required<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, RegistryError> {
        let service = self.try_fetch_any(ServiceKey::of::<T>())?;
        service
            .downcast::<T>()
            .map_err(|_| RegistryError::TypeMismatch {
                type_name: std::any::type_name::<T>(),
            })
    }

    /// Resolves an ordered list of dependencies by table lookup.
    ///
    /// This is how factory build functions receive the registry's services
    /// without hand-written wiring. Fails with a dependency error if any key
    /// is neither stored nor factory-registered.
    pub fn resolve_dependencies(
        &self,
        deps: &[ServiceKey],
    ) -> Result<Vec<AnyService>, RegistryError> {
        deps.iter()
            .map(|key| {
                self.try_fetch_any(*key).map_err(|_| {
                    RegistryError::dependency(key.name(), "not stored and no factory registered")
                })
            })
            .collect()
    }

    /// Registers an observer invoked synchronously on every `store`.
    ///
    /// Observers must not re-enter the registry with a `store` for the same
    /// type they are being notified about.
    pub fn observe<F>(&self, callback: F)
    where
        F: Fn(ServiceKey) + Send + Sync + 'static,
    {
        self.observers.lock().push(Arc::new(callback));
    }

    /// Checks whether an instance for `T` is currently stored.
    ///
    /// A registered-but-unbuilt factory does not count.
    #[must_use]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.services.read().contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of stored services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.read().len()
    }

    /// Returns `true` if no services are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.read().is_empty()
    }

    fn store_any(&self, key: ServiceKey, service: AnyService) {
        let replaced = self.services.write().insert(key.id, service).is_some();
        if replaced {
            debug!(service = key.name(), "service replaced in registry");
        } else {
            trace!(service = key.name(), "service stored in registry");
        }
        // No registry lock is held while callbacks run, so an observer may
        // freely store other services, resolve factories or subscribe.
        let observers: Vec<StoreObserver> = self.observers.lock().clone();
        for observer in observers {
            observer(key);
        }
    }

    fn try_fetch_any(&self, key: ServiceKey) -> Result<AnyService, RegistryError> {
        if let Some(service) = self.services.read().get(&key.id) {
            return Ok(service.clone());
        }
        // Lazily build from a factory; the lock is released before building
        // because dependency resolution may recurse into other factories.
        let factory = self.factories.read().get(&key.id).cloned();
        let Some(factory) = factory else {
            return Err(RegistryError::NotRegistered {
                type_name: key.name(),
            });
        };
        let resolved = self.resolve_dependencies(&factory.deps)?;
        let service = (factory.build)(resolved);
        self.store_any(key, service.clone());
        Ok(service)
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("service_count", &self.services.read().len())
            .field("factory_count", &self.factories.read().len())
            .finish()
    }
}
