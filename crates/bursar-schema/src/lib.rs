//! Account schema protocol for Bursar.
//!
//! A schema describes a family of accounts from static configuration and is
//! specialized per use site and per invocation:
//!
//! 1. [`SchemaRegistry::build`] reads the `type` key of a config subtree and
//!    constructs the matching [`AccountSchema`] variant.
//! 2. [`AccountSchema::clone_with_config`] layers call-site overrides on top,
//!    yielding an independent instance.
//! 3. The caller supplies the instance's required [`Variable`]s, one entity
//!    each, until [`AccountSchema::is_complete`] holds.
//! 4. The completed schema answers the ledger-facing queries: a
//!    [`LabelSelector`] to find the account, labels to stamp on it, and
//!    [`SetupPlan`]s for creation and migration.
//!
//! # Example
//!
//! ```
//! use bursar_config::{ConfigParser, Document};
//! use bursar_core::EntityRef;
//! use bursar_schema::SchemaRegistry;
//!
//! let doc = Document::from_yaml("pay:\n  type: currency\n  currency: gems\n").unwrap();
//! let parser = ConfigParser::root(doc);
//!
//! let schema = SchemaRegistry::with_defaults().build(&parser.enter("pay", "Paid account"));
//! assert!(!schema.is_complete());
//!
//! let player = EntityRef::named("alice");
//! for variable in schema.required_variables() {
//!     variable.supply(player.clone()).unwrap();
//! }
//! assert!(schema.is_complete());
//! let selector = schema.selector(&player).unwrap();
//! assert_eq!(selector.equals.get("currency").map(String::as_str), Some("gems"));
//! ```

mod account;
mod error;
mod selector;
mod variable;

pub use account::{
    AccountSchema, BasicAccountSchema, CurrencyAccountSchema, SchemaKind, SchemaRegistry,
    PLAYER_PLACEHOLDER,
};
pub use error::SchemaError;
pub use selector::{LabelSelector, SetupPlan};
pub use variable::{Variable, VariableSlot};
