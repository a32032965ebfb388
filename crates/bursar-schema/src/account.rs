//! Account schema variants.
//!
//! An [`AccountSchema`] describes a family of per-entity accounts from one
//! static config subtree: "the currency account of whichever player issued
//! the command" is a single schema, specialized at each use site with
//! [`clone_with_config`](AccountSchema::clone_with_config) and driven to
//! completion by supplying its [`Variable`]s at invocation time. Once
//! complete, the schema answers entity-specific queries: the selector the
//! ledger matches accounts with, the labels to stamp, and the setup plans
//! for creation and migration.
//!
//! The variant set is closed: kinds are enumerated in [`SchemaKind`] and
//! wired through an explicit [`SchemaRegistry`] at startup. There is no
//! open-ended runtime discovery.

use std::collections::BTreeMap;
use std::fmt;

use bursar_config::{ConfigParser, DocMap, DOC_KEY_PREFIX};
use bursar_core::EntityRef;

use crate::error::SchemaError;
use crate::selector::{LabelSelector, SetupPlan};
use crate::variable::{Variable, VariableSlot};

/// Placeholder in account name templates, expanded to the owning player's
/// name.
pub const PLAYER_PLACEHOLDER: &str = "{player}";

/// The closed set of account schema kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    /// A named account, optionally per-player through a name template.
    Basic,
    /// A per-player account holding one currency.
    Currency,
}

impl SchemaKind {
    /// The kind's name as written in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Currency => "currency",
        }
    }

    /// Parses a configured kind name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "basic" => Some(Self::Basic),
            "currency" => Some(Self::Currency),
            _ => None,
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A polymorphic, incrementally fulfilled account configuration schema.
///
/// The four `Option`-returning accessors answer iff the schema is complete,
/// are independently idempotent, and reflect the same resolved configuration
/// across repeated calls once complete.
pub trait AccountSchema: Send + Sync {
    /// The variant this instance belongs to.
    fn kind(&self) -> SchemaKind;

    /// Layers additional config on top of the receiver, returning an
    /// independent instance. The receiver is never mutated.
    fn clone_with_config(&self, overrides: &DocMap) -> Result<Box<dyn AccountSchema>, SchemaError>;

    /// Descriptors for the slots that still block completeness.
    fn required_variables(&self) -> Vec<Variable>;

    /// Descriptors for the slots that are already supplied or never required.
    fn optional_variables(&self) -> Vec<Variable>;

    /// True iff no required variables remain.
    fn is_complete(&self) -> bool {
        self.required_variables().is_empty()
    }

    /// The selector matching this schema's account, once complete.
    fn selector(&self, entity: &EntityRef) -> Option<LabelSelector>;

    /// The labels to overwrite on the matched account, once complete.
    fn overwrite_labels(&self, entity: &EntityRef) -> Option<BTreeMap<String, String>>;

    /// The plan for migrating a legacy account, once complete.
    fn migration_setup(&self, entity: &EntityRef) -> Option<SetupPlan>;

    /// The plan for creating the account fresh, once complete.
    fn initial_setup(&self, entity: &EntityRef) -> Option<SetupPlan>;
}

/// A named account. The name template may reference the owning player, in
/// which case the owner is a required runtime variable; a fixed name (e.g. a
/// shared town treasury) needs no runtime input and is complete at build
/// time.
pub struct BasicAccountSchema {
    name_template: String,
    owner: Option<VariableSlot>,
}

impl BasicAccountSchema {
    /// Builds the schema from its config subtree.
    pub fn build(parser: &ConfigParser) -> Self {
        let template = parser.expect_str(
            "name",
            PLAYER_PLACEHOLDER,
            "Account name; {player} expands to the owning player's name",
        );
        Self::from_template(template)
    }

    fn from_template(name_template: String) -> Self {
        let owner = name_template
            .contains(PLAYER_PLACEHOLDER)
            .then(|| VariableSlot::required("the player this account belongs to"));
        Self {
            name_template,
            owner,
        }
    }

    fn resolved_name(&self) -> Option<String> {
        match &self.owner {
            None => Some(self.name_template.clone()),
            Some(slot) => slot
                .value()
                .map(|owner| self.name_template.replace(PLAYER_PLACEHOLDER, &owner.name)),
        }
    }

    fn labels(&self) -> Option<BTreeMap<String, String>> {
        let name = self.resolved_name()?;
        let mut labels = BTreeMap::new();
        labels.insert("kind".to_string(), SchemaKind::Basic.as_str().to_string());
        labels.insert("account".to_string(), name);
        if let Some(owner) = self.owner.as_ref().and_then(VariableSlot::value) {
            labels.insert("owner".to_string(), owner.id.to_string());
        }
        Some(labels)
    }
}

impl AccountSchema for BasicAccountSchema {
    fn kind(&self) -> SchemaKind {
        SchemaKind::Basic
    }

    fn clone_with_config(&self, overrides: &DocMap) -> Result<Box<dyn AccountSchema>, SchemaError> {
        let mut template = self.name_template.clone();
        for (key, value) in overrides {
            if key.starts_with(DOC_KEY_PREFIX) {
                continue;
            }
            match key.as_str() {
                "name" => {
                    template = value
                        .as_str()
                        .ok_or_else(|| SchemaError::invalid_override("name", "expected a string"))?
                        .to_string();
                }
                other => {
                    return Err(SchemaError::invalid_override(
                        other,
                        "not a basic account setting",
                    ))
                }
            }
        }
        let mut clone = Self::from_template(template);
        if clone.owner.is_some() {
            if let Some(existing) = &self.owner {
                clone.owner = Some(existing.duplicate());
            }
        }
        Ok(Box::new(clone))
    }

    fn required_variables(&self) -> Vec<Variable> {
        self.owner
            .iter()
            .filter(|slot| slot.is_pending())
            .map(VariableSlot::descriptor)
            .collect()
    }

    fn optional_variables(&self) -> Vec<Variable> {
        self.owner
            .iter()
            .filter(|slot| !slot.is_pending())
            .map(VariableSlot::descriptor)
            .collect()
    }

    fn selector(&self, _entity: &EntityRef) -> Option<LabelSelector> {
        Some(LabelSelector {
            equals: self.labels()?,
        })
    }

    fn overwrite_labels(&self, _entity: &EntityRef) -> Option<BTreeMap<String, String>> {
        self.labels()
    }

    fn migration_setup(&self, _entity: &EntityRef) -> Option<SetupPlan> {
        Some(SetupPlan {
            labels: self.labels()?,
            initial_balance: None,
        })
    }

    fn initial_setup(&self, entity: &EntityRef) -> Option<SetupPlan> {
        let mut labels = self.labels()?;
        labels.insert("created-for".to_string(), entity.name.clone());
        Some(SetupPlan {
            labels,
            initial_balance: None,
        })
    }
}

/// A per-player account holding one currency, with an optional migration
/// source and a configurable starting balance.
pub struct CurrencyAccountSchema {
    currency: String,
    initial_balance: f64,
    migrate_from: Option<String>,
    owner: VariableSlot,
    delegate: VariableSlot,
}

impl CurrencyAccountSchema {
    /// Builds the schema from its config subtree.
    pub fn build(parser: &ConfigParser) -> Self {
        let currency = parser.expect_str("currency", "coins", "Currency this account holds");
        let initial_balance = parser.expect_float(
            "initial-balance",
            0.0,
            "Balance granted when the account is created",
        );
        let migrate_from = parser.expect_str(
            "migrate-from",
            "",
            "Legacy currency to migrate balances from; empty disables migration",
        );
        Self {
            currency,
            initial_balance,
            migrate_from: (!migrate_from.is_empty()).then_some(migrate_from),
            owner: VariableSlot::required("the player whose currency account is targeted"),
            delegate: VariableSlot::optional("an entity acting on the owner's behalf"),
        }
    }

    fn labels(&self) -> Option<BTreeMap<String, String>> {
        let owner = self.owner.value()?;
        let mut labels = BTreeMap::new();
        labels.insert(
            "kind".to_string(),
            SchemaKind::Currency.as_str().to_string(),
        );
        labels.insert("currency".to_string(), self.currency.clone());
        labels.insert("owner".to_string(), owner.id.to_string());
        Some(labels)
    }
}

impl AccountSchema for CurrencyAccountSchema {
    fn kind(&self) -> SchemaKind {
        SchemaKind::Currency
    }

    fn clone_with_config(&self, overrides: &DocMap) -> Result<Box<dyn AccountSchema>, SchemaError> {
        let mut currency = self.currency.clone();
        let mut initial_balance = self.initial_balance;
        let mut migrate_from = self.migrate_from.clone();
        for (key, value) in overrides {
            if key.starts_with(DOC_KEY_PREFIX) {
                continue;
            }
            match key.as_str() {
                "currency" => {
                    currency = value
                        .as_str()
                        .ok_or_else(|| {
                            SchemaError::invalid_override("currency", "expected a string")
                        })?
                        .to_string();
                }
                "initial-balance" => {
                    initial_balance = value.as_float().ok_or_else(|| {
                        SchemaError::invalid_override("initial-balance", "expected a number")
                    })?;
                }
                "migrate-from" => {
                    let source = value.as_str().ok_or_else(|| {
                        SchemaError::invalid_override("migrate-from", "expected a string")
                    })?;
                    migrate_from = (!source.is_empty()).then(|| source.to_string());
                }
                other => {
                    return Err(SchemaError::invalid_override(
                        other,
                        "not a currency account setting",
                    ))
                }
            }
        }
        Ok(Box::new(Self {
            currency,
            initial_balance,
            migrate_from,
            owner: self.owner.duplicate(),
            delegate: self.delegate.duplicate(),
        }))
    }

    fn required_variables(&self) -> Vec<Variable> {
        let mut variables = Vec::new();
        if self.owner.is_pending() {
            variables.push(self.owner.descriptor());
        }
        variables
    }

    fn optional_variables(&self) -> Vec<Variable> {
        let mut variables = Vec::new();
        if !self.owner.is_pending() {
            variables.push(self.owner.descriptor());
        }
        variables.push(self.delegate.descriptor());
        variables
    }

    fn selector(&self, _entity: &EntityRef) -> Option<LabelSelector> {
        Some(LabelSelector {
            equals: self.labels()?,
        })
    }

    fn overwrite_labels(&self, _entity: &EntityRef) -> Option<BTreeMap<String, String>> {
        self.labels()
    }

    fn migration_setup(&self, _entity: &EntityRef) -> Option<SetupPlan> {
        let mut labels = self.labels()?;
        let legacy = self
            .migrate_from
            .clone()
            .unwrap_or_else(|| self.currency.clone());
        labels.insert("currency".to_string(), legacy);
        Some(SetupPlan {
            labels,
            initial_balance: None,
        })
    }

    fn initial_setup(&self, entity: &EntityRef) -> Option<SetupPlan> {
        let mut labels = self.labels()?;
        labels.insert("created-for".to_string(), entity.name.clone());
        Some(SetupPlan {
            labels,
            initial_balance: Some(self.initial_balance),
        })
    }
}

type BuildFn = fn(&ConfigParser) -> Box<dyn AccountSchema>;

/// The explicit registration table of schema variants.
///
/// Built once at startup; [`build`](Self::build) selects the variant by the
/// subtree's `type` key, falling back to `basic` (and repairing the document)
/// when the configured kind matches no registered variant.
///
/// # Example
///
/// ```
/// use bursar_config::{ConfigParser, Document};
/// use bursar_schema::{SchemaKind, SchemaRegistry};
///
/// let doc = Document::from_yaml("account:\n  type: currency\n").unwrap();
/// let parser = ConfigParser::root(doc);
///
/// let registry = SchemaRegistry::with_defaults();
/// let schema = registry.build(&parser.enter("account", "Target account"));
/// assert_eq!(schema.kind(), SchemaKind::Currency);
/// ```
pub struct SchemaRegistry {
    entries: Vec<(SchemaKind, BuildFn)>,
}

impl SchemaRegistry {
    /// A registry with every built-in variant registered.
    pub fn with_defaults() -> Self {
        Self {
            entries: vec![
                (SchemaKind::Basic, |parser| {
                    Box::new(BasicAccountSchema::build(parser))
                }),
                (SchemaKind::Currency, |parser| {
                    Box::new(CurrencyAccountSchema::build(parser))
                }),
            ],
        }
    }

    /// Replaces the builder for a kind.
    #[must_use]
    pub fn register(mut self, kind: SchemaKind, build: BuildFn) -> Self {
        self.entries.retain(|(k, _)| *k != kind);
        self.entries.push((kind, build));
        self
    }

    /// The registered kinds, in registration order.
    pub fn kinds(&self) -> Vec<SchemaKind> {
        self.entries.iter().map(|(kind, _)| *kind).collect()
    }

    /// Builds a schema from a config subtree, selecting the variant by its
    /// `type` key.
    pub fn build(&self, parser: &ConfigParser) -> Box<dyn AccountSchema> {
        let raw = parser.expect_str(
            "type",
            SchemaKind::Basic.as_str(),
            "Account schema kind: basic or currency",
        );
        let kind = match SchemaKind::parse(&raw).filter(|kind| self.lookup(*kind).is_some()) {
            Some(kind) => kind,
            None => {
                let fallback = parser
                    .fail_safe_value(SchemaKind::Basic, &format!("unknown account schema type `{raw}`"));
                parser.set_value("type", fallback.as_str(), "reset to a known schema type");
                fallback
            }
        };
        match self.lookup(kind) {
            Some(build) => build(parser),
            None => Box::new(BasicAccountSchema::build(parser)),
        }
    }

    fn lookup(&self, kind: SchemaKind) -> Option<BuildFn> {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, build)| *build)
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
