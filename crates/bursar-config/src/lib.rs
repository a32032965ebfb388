//! Coordinated, fail-safe configuration loading for Bursar modules.
//!
//! This crate is the configuration core of a modular server-side application.
//! Independent feature modules each declare a typed configuration schema; at
//! startup those schemas are parsed from one YAML document, validated,
//! auto-repaired when invalid, and made available to every module exactly
//! once, no matter how many modules race to request them.
//!
//! The pieces:
//!
//! - [`Document`] - the hierarchical key-value tree backing `config.yml`,
//!   with in-band `#key` documentation annotations
//! - [`ConfigParser`] - an infallible, self-documenting cursor over a
//!   document subtree; missing or malformed values are repaired in place
//! - [`ConfigModule`] / [`ModuleSet`] - the closed table of feature modules
//!   and their `parse` entry points
//! - [`ConfigLoader`] - the single-flight loader: one parse-all pass per
//!   process, FIFO continuations for concurrent callers, archive-and-
//!   regenerate recovery when a module rejects the document
//!
//! # Overview
//!
//! ```no_run
//! use std::sync::Arc;
//! use bursar_config::{ConfigLoader, ConfigModule, ConfigParser, ModuleSet, ParseError};
//! use bursar_core::ServiceRegistry;
//!
//! struct LedgerConfig {
//!     account_limit: i64,
//! }
//!
//! impl ConfigModule for LedgerConfig {
//!     const NAME: &'static str = "ledger";
//!     const DOC: &'static str = "Ledger storage settings";
//!
//!     async fn parse(
//!         parser: ConfigParser,
//!         _registry: Arc<ServiceRegistry>,
//!     ) -> Result<Self, ParseError> {
//!         Ok(Self {
//!             account_limit: parser.expect_int("account-limit", 10, "Accounts per player"),
//!         })
//!     }
//! }
//!
//! # async fn example() -> Result<(), bursar_config::LoadError> {
//! let registry = Arc::new(ServiceRegistry::new());
//! let modules = ModuleSet::new().register::<LedgerConfig>();
//! let loader = ConfigLoader::new("config.yml", modules, registry);
//!
//! // Any number of tasks can do this concurrently; one pass runs.
//! let ledger = loader.load::<LedgerConfig>().await?;
//! assert!(ledger.account_limit > 0);
//! # Ok(())
//! # }
//! ```
//!
//! # Document format
//!
//! One human-editable YAML file. Scalars, strings and nested maps are
//! supported; a key prefixed with `#` holds the documentation for its
//! sibling:
//!
//! ```yaml
//! ledger:
//!   "#account-limit": "Accounts per player"
//!   account-limit: 10
//! ```
//!
//! On regeneration the file is rewritten with defaults and documentation for
//! every key read during the pass; the previous file is archived to
//! `config.yml.old` (or `.old.2`, `.old.3`, ... first-fit).

pub mod document;
pub mod error;
pub mod loader;
pub mod module;
pub mod parser;

pub use document::{DocMap, DocValue, Document, DOC_KEY_PREFIX};
pub use error::{ConfigError, LoadError, ParseError};
pub use loader::ConfigLoader;
pub use module::{AnyConfig, ConfigModule, ModuleRegistration, ModuleSet};
pub use parser::ConfigParser;
