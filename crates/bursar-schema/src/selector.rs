//! Selectors and setup plans derived from completed schemas.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An opaque label-equality predicate, consumed downstream by the ledger to
/// match accounts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LabelSelector {
    /// Labels a matching account must carry with exactly these values.
    pub equals: BTreeMap<String, String>,
}

impl LabelSelector {
    /// Creates an empty selector (matches everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality requirement.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.equals.insert(key.into(), value.into());
        self
    }

    /// Whether the given label set satisfies this selector.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.equals
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
    }
}

/// Instructions for creating or migrating an account once a schema has been
/// driven to completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupPlan {
    /// Labels to stamp on the account.
    pub labels: BTreeMap<String, String>,
    /// Starting balance, when the variant defines one.
    pub initial_balance: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_matches_superset() {
        let selector = LabelSelector::new().with("kind", "currency").with("owner", "u1");
        let mut labels = BTreeMap::new();
        labels.insert("kind".to_string(), "currency".to_string());
        labels.insert("owner".to_string(), "u1".to_string());
        labels.insert("extra".to_string(), "ignored".to_string());
        assert!(selector.matches(&labels));
    }

    #[test]
    fn test_selector_rejects_wrong_value() {
        let selector = LabelSelector::new().with("owner", "u1");
        let mut labels = BTreeMap::new();
        labels.insert("owner".to_string(), "u2".to_string());
        assert!(!selector.matches(&labels));
    }

    #[test]
    fn test_empty_selector_matches_everything() {
        assert!(LabelSelector::new().matches(&BTreeMap::new()));
    }
}
