//! Coordinated, single-flight configuration loading.
//!
//! The [`ConfigLoader`] owns the configuration document and the load state for
//! the whole process. Any number of tasks may concurrently ask it for a
//! module's configuration; exactly one underlying parse-all pass ever
//! executes, and every caller receives results from the same committed
//! mapping.
//!
//! # State machine
//!
//! - **Idle** - no load has started. The first [`load`](ConfigLoader::load)
//!   call becomes the driver of the pass.
//! - **Loading** - a pass is in flight. Further calls enqueue a continuation
//!   and suspend; continuations resume in FIFO order once the pass commits.
//! - **Loaded** - the module-to-config mapping is fixed. Calls are answered
//!   immediately and no further parsing happens for the process lifetime.
//!
//! # Failure recovery
//!
//! If any module's parse fails (or the file is not valid YAML), no partial
//! results are delivered. The current file is archived to the first free name
//! among `config.yml.old`, `config.yml.old.2`, `config.yml.old.3`, ... and
//! every module is re-parsed against a blank fail-safe document. Because every
//! parser read has a default, this retry converges unless a module violates
//! its contract by failing on an empty document - which is an unrecoverable
//! startup failure, not retried further.
//!
//! The document is written back to disk whenever the pass repaired it or
//! regenerated it from scratch, so the on-disk file is always valid and fully
//! documented after a successful pass.

use std::any::TypeId;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use bursar_core::ServiceRegistry;

use crate::document::Document;
use crate::error::{ConfigError, LoadError, ParseError};
use crate::module::{AnyConfig, ConfigModule, ModuleSet};
use crate::parser::ConfigParser;

/// The committed module-identity to configuration mapping.
type LoadedConfigs = Arc<HashMap<TypeId, AnyConfig>>;

type PassOutcome = Result<LoadedConfigs, LoadError>;

enum LoadState {
    Idle,
    Loading {
        waiters: Vec<oneshot::Sender<PassOutcome>>,
    },
    Loaded(PassOutcome),
}

enum Role {
    Driver,
    Joiner(oneshot::Receiver<PassOutcome>),
    Done(PassOutcome),
}

/// Single-flight loader for all registered module configurations.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use bursar_config::{ConfigLoader, ConfigModule, ConfigParser, ModuleSet, ParseError};
/// use bursar_core::ServiceRegistry;
///
/// # struct LedgerConfig;
/// # impl ConfigModule for LedgerConfig {
/// #     const NAME: &'static str = "ledger";
/// #     async fn parse(_p: ConfigParser, _r: Arc<ServiceRegistry>) -> Result<Self, ParseError> {
/// #         Ok(Self)
/// #     }
/// # }
/// # async fn example() -> Result<(), bursar_config::LoadError> {
/// let registry = Arc::new(ServiceRegistry::new());
/// let modules = ModuleSet::new().register::<LedgerConfig>();
/// let loader = ConfigLoader::new("config.yml", modules, registry);
///
/// let ledger: Arc<LedgerConfig> = loader.load().await?;
/// # Ok(())
/// # }
/// ```
pub struct ConfigLoader {
    path: PathBuf,
    modules: ModuleSet,
    registry: Arc<ServiceRegistry>,
    state: Mutex<LoadState>,
}

impl ConfigLoader {
    /// Creates a loader over the document at `path` with a fixed module set.
    pub fn new(
        path: impl Into<PathBuf>,
        modules: ModuleSet,
        registry: Arc<ServiceRegistry>,
    ) -> Self {
        Self {
            path: path.into(),
            modules,
            registry,
            state: Mutex::new(LoadState::Idle),
        }
    }

    /// Returns the committed configuration for module `M`.
    ///
    /// The first caller drives a parse of every registered module; concurrent
    /// callers join the in-flight pass. Once the pass commits, all calls are
    /// answered from the same fixed mapping.
    pub async fn load<M: ConfigModule>(&self) -> Result<Arc<M>, LoadError> {
        if !self.modules.contains::<M>() {
            return Err(LoadError::Unregistered { module: M::NAME });
        }

        let role = {
            let mut state = self.state.lock();
            match &mut *state {
                LoadState::Loaded(outcome) => Role::Done(outcome.clone()),
                LoadState::Loading { waiters } => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Role::Joiner(rx)
                }
                LoadState::Idle => {
                    *state = LoadState::Loading {
                        waiters: Vec::new(),
                    };
                    Role::Driver
                }
            }
        };

        let outcome = match role {
            Role::Done(outcome) => outcome,
            Role::Joiner(rx) => rx.await.map_err(|_| LoadError::Abandoned)?,
            Role::Driver => {
                let outcome = self.run_pass().await;
                let waiters = {
                    let mut state = self.state.lock();
                    match std::mem::replace(&mut *state, LoadState::Loaded(outcome.clone())) {
                        LoadState::Loading { waiters } => waiters,
                        _ => Vec::new(),
                    }
                };
                // FIFO: waiters resume in enqueue order, strictly after the
                // outcome is committed above.
                for waiter in waiters {
                    let _ = waiter.send(outcome.clone());
                }
                outcome
            }
        };

        let configs = outcome?;
        let config = configs
            .get(&TypeId::of::<M>())
            .ok_or(LoadError::TypeMismatch { module: M::NAME })?;
        Arc::clone(config)
            .downcast::<M>()
            .map_err(|_| LoadError::TypeMismatch { module: M::NAME })
    }

    /// Whether the mapping has been committed (successfully or fatally).
    pub fn is_loaded(&self) -> bool {
        matches!(&*self.state.lock(), LoadState::Loaded(_))
    }

    async fn run_pass(&self) -> PassOutcome {
        info!(path = %self.path.display(), modules = self.modules.len(), "loading configuration");

        let doc = match Document::load(&self.path) {
            Ok(doc) => doc,
            Err(ConfigError::YamlError(err)) => {
                error!(%err, "configuration file is not valid YAML, archiving and regenerating");
                self.archive_current()?;
                Document::empty_fail_safe()
            }
            Err(err) => return Err(LoadError::io(&self.path, err)),
        };

        let (doc, configs) = match self.parse_all(&doc).await {
            Ok(configs) => (doc, configs),
            Err((module, err)) => {
                error!(
                    module,
                    %err,
                    "module rejected the configuration, archiving and regenerating"
                );
                self.archive_current()?;
                let fresh = Document::empty_fail_safe();
                match self.parse_all(&fresh).await {
                    Ok(configs) => {
                        info!("configuration regenerated from defaults");
                        (fresh, configs)
                    }
                    Err((module, err)) => {
                        error!(module, %err, "module rejected even an empty document");
                        return Err(LoadError::FailSafeParse {
                            module,
                            source: err,
                        });
                    }
                }
            }
        };

        if doc.is_repaired() || doc.is_fail_safe() {
            doc.persist(&self.path)
                .map_err(|err| LoadError::io(&self.path, err))?;
            info!(path = %self.path.display(), "configuration written back");
        }

        Ok(Arc::new(configs))
    }

    /// Fans out one parse invocation per registered module and joins them.
    ///
    /// A failure in any invocation discards the whole pass; sibling results
    /// are ignored rather than cancelled, which is safe because module
    /// parses have no side effects beyond document mutation.
    async fn parse_all(
        &self,
        doc: &Document,
    ) -> Result<HashMap<TypeId, AnyConfig>, (String, ParseError)> {
        let root = ConfigParser::root(doc.clone());
        let invocations = self.modules.iter().map(|module| {
            let parser = root.enter(module.name(), module.doc());
            let registry = Arc::clone(&self.registry);
            let name = module.name();
            let type_id = module.type_id();
            let fut = module.run(parser, registry);
            async move { (type_id, name, fut.await) }
        });

        let results = futures_util::future::join_all(invocations).await;

        let mut configs = HashMap::with_capacity(results.len());
        let mut failure = None;
        for (type_id, name, result) in results {
            match result {
                Ok(config) => {
                    configs.insert(type_id, config);
                }
                Err(err) => {
                    if failure.is_none() {
                        failure = Some((name.to_string(), err));
                    }
                }
            }
        }
        match failure {
            Some(f) => Err(f),
            None => Ok(configs),
        }
    }

    fn archive_current(&self) -> Result<(), LoadError> {
        if !self.path.exists() {
            return Ok(());
        }
        let target = archive_path(&self.path);
        std::fs::copy(&self.path, &target).map_err(|err| LoadError::io(&target, err))?;
        warn!(
            from = %self.path.display(),
            to = %target.display(),
            "previous configuration archived"
        );
        Ok(())
    }
}

impl std::fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.state.lock() {
            LoadState::Idle => "idle",
            LoadState::Loading { .. } => "loading",
            LoadState::Loaded(_) => "loaded",
        };
        f.debug_struct("ConfigLoader")
            .field("path", &self.path)
            .field("modules", &self.modules.len())
            .field("state", &state)
            .finish()
    }
}

/// First-fit archive name: `<path>.old`, then `<path>.old.2`, `<path>.old.3`,
/// ... for the smallest unused suffix.
fn archive_path(path: &Path) -> PathBuf {
    let base = PathBuf::from(format!("{}.old", path.display()));
    if !base.exists() {
        return base;
    }
    let mut n: u32 = 2;
    loop {
        let candidate = PathBuf::from(format!("{}.old.{n}", path.display()));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}
