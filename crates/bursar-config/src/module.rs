//! Config module registration.
//!
//! Each independently developed feature module owns one configuration section
//! and one entry point to parse it: the [`ConfigModule`] trait. The set of
//! modules known to the loader is a closed [`ModuleSet`] built at startup;
//! it is not extensible at runtime.

use std::any::{Any, TypeId};
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tracing::debug;

use bursar_core::ServiceRegistry;

use crate::error::ParseError;
use crate::parser::ConfigParser;

/// A type-erased, committed module configuration.
pub type AnyConfig = Arc<dyn Any + Send + Sync>;

type ParseFn = Arc<
    dyn Fn(ConfigParser, Arc<ServiceRegistry>) -> BoxFuture<'static, Result<AnyConfig, ParseError>>
        + Send
        + Sync,
>;

/// A feature module's typed configuration schema.
///
/// `parse` receives a parser scoped to the module's own document section and
/// the process service registry. It must be side-effect-free apart from
/// writing into the shared parser, because a fail-safe retry re-runs it
/// against a fresh document. It must never fail on an empty document: every
/// read through the parser has a default, so failure is reserved for
/// structures that are present but uninterpretable.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use bursar_config::{ConfigModule, ConfigParser, ParseError};
/// use bursar_core::ServiceRegistry;
///
/// struct LedgerConfig {
///     account_limit: i64,
/// }
///
/// impl ConfigModule for LedgerConfig {
///     const NAME: &'static str = "ledger";
///     const DOC: &'static str = "Ledger storage settings";
///
///     async fn parse(
///         parser: ConfigParser,
///         _registry: Arc<ServiceRegistry>,
///     ) -> Result<Self, ParseError> {
///         Ok(Self {
///             account_limit: parser.expect_int("account-limit", 10, "Accounts per player"),
///         })
///     }
/// }
/// ```
pub trait ConfigModule: Sized + Send + Sync + 'static {
    /// Name of the module's section in the configuration document.
    const NAME: &'static str;

    /// Description recorded for the section when the document is generated.
    const DOC: &'static str = "";

    /// Parses this module's configuration from its document section.
    fn parse(
        parser: ConfigParser,
        registry: Arc<ServiceRegistry>,
    ) -> impl Future<Output = Result<Self, ParseError>> + Send;
}

/// One entry in the module registration table.
#[derive(Clone)]
pub struct ModuleRegistration {
    type_id: TypeId,
    name: &'static str,
    doc: &'static str,
    parse: ParseFn,
}

impl ModuleRegistration {
    /// Creates the registration for a module type.
    pub fn of<M: ConfigModule>() -> Self {
        Self {
            type_id: TypeId::of::<M>(),
            name: M::NAME,
            doc: M::DOC,
            parse: Arc::new(|parser, registry| {
                Box::pin(async move {
                    M::parse(parser, registry)
                        .await
                        .map(|config| Arc::new(config) as AnyConfig)
                })
            }),
        }
    }

    /// The module's section name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The module's section description.
    pub fn doc(&self) -> &'static str {
        self.doc
    }

    /// The module's type identity.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub(crate) fn run(
        &self,
        parser: ConfigParser,
        registry: Arc<ServiceRegistry>,
    ) -> BoxFuture<'static, Result<AnyConfig, ParseError>> {
        (self.parse)(parser, registry)
    }
}

impl std::fmt::Debug for ModuleRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistration")
            .field("name", &self.name)
            .finish()
    }
}

/// The closed registration table of config modules.
///
/// Built once at startup by chained registration:
///
/// ```
/// use std::sync::Arc;
/// use bursar_config::{ConfigModule, ConfigParser, ModuleSet, ParseError};
/// use bursar_core::ServiceRegistry;
///
/// # struct LedgerConfig;
/// # impl ConfigModule for LedgerConfig {
/// #     const NAME: &'static str = "ledger";
/// #     async fn parse(_p: ConfigParser, _r: Arc<ServiceRegistry>) -> Result<Self, ParseError> {
/// #         Ok(Self)
/// #     }
/// # }
/// let modules = ModuleSet::new().register::<LedgerConfig>();
/// assert!(modules.contains::<LedgerConfig>());
/// ```
#[derive(Default, Clone, Debug)]
pub struct ModuleSet {
    entries: Vec<ModuleRegistration>,
}

impl ModuleSet {
    /// Creates an empty module set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module. Registering the same module twice keeps the first
    /// entry.
    #[must_use]
    pub fn register<M: ConfigModule>(mut self) -> Self {
        if self.contains::<M>() {
            debug!(module = M::NAME, "module already registered, ignoring");
            return self;
        }
        self.entries.push(ModuleRegistration::of::<M>());
        self
    }

    /// Whether a module type is registered.
    #[must_use]
    pub fn contains<M: ConfigModule>(&self) -> bool {
        self.entries.iter().any(|e| e.type_id == TypeId::of::<M>())
    }

    /// Number of registered modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no modules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates the registrations in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ModuleRegistration> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    struct AlphaConfig {
        limit: i64,
    }

    impl ConfigModule for AlphaConfig {
        const NAME: &'static str = "alpha";
        const DOC: &'static str = "Alpha module settings";

        async fn parse(
            parser: ConfigParser,
            _registry: Arc<ServiceRegistry>,
        ) -> Result<Self, ParseError> {
            Ok(Self {
                limit: parser.expect_int("limit", 5, "Alpha limit"),
            })
        }
    }

    #[test]
    fn test_register_and_contains() {
        let set = ModuleSet::new().register::<AlphaConfig>();
        assert!(set.contains::<AlphaConfig>());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_duplicate_registration_is_ignored() {
        let set = ModuleSet::new()
            .register::<AlphaConfig>()
            .register::<AlphaConfig>();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_registration_carries_name_and_doc() {
        let reg = ModuleRegistration::of::<AlphaConfig>();
        assert_eq!(reg.name(), "alpha");
        assert_eq!(reg.doc(), "Alpha module settings");
        assert_eq!(reg.type_id(), TypeId::of::<AlphaConfig>());
    }

    #[tokio::test]
    async fn test_registration_runs_erased_parse() {
        let reg = ModuleRegistration::of::<AlphaConfig>();
        let parser = ConfigParser::root(Document::from_yaml("limit: 9\n").unwrap());
        let registry = Arc::new(ServiceRegistry::new());

        let config = reg.run(parser, registry).await.unwrap();
        let config = config.downcast::<AlphaConfig>().unwrap();
        assert_eq!(config.limit, 9);
    }
}
