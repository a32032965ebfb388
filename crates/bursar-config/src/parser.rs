//! Cursor over a configuration document subtree.
//!
//! A [`ConfigParser`] reads typed values relative to one node of a
//! [`Document`]. Every read is infallible: if a key is absent or holds a value
//! of the wrong type, the supplied default is written back into the tree (with
//! an in-band `#key` documentation annotation) and returned, and the document
//! is marked repaired. Running the same parse code against a blank document
//! therefore generates a complete, self-documented default file; running it
//! against a corrupt one repairs the corrupt parts in place while preserving
//! every value that was valid.
//!
//! # Example
//!
//! ```
//! use bursar_config::{ConfigParser, Document};
//!
//! let doc = Document::from_yaml("ledger:\n  limit: 25\n  rate: \"fast\"\n").unwrap();
//! let parser = ConfigParser::root(doc);
//!
//! let ledger = parser.enter("ledger", "Ledger settings");
//! assert_eq!(ledger.expect_int("limit", 10, "Account limit"), 25);
//!
//! // "fast" is not a number: the default is substituted and recorded.
//! assert_eq!(ledger.expect_float("rate", 1.0, "Interest rate"), 1.0);
//! assert!(parser.is_repaired());
//! ```
//!
//! Parser views must not be retained past the module `parse` call they were
//! handed to: a fail-safe retry constructs an entirely new document and the
//! old views keep pointing at the discarded tree.

use tracing::{debug, warn};

use crate::document::{DocMap, DocValue, Document, DOC_KEY_PREFIX};

/// A typed cursor over one subtree of a [`Document`].
///
/// Child parsers created with [`enter`](Self::enter) share the owning
/// document, including its `repaired` and `fail_safe` flags.
#[derive(Clone)]
pub struct ConfigParser {
    doc: Document,
    path: Vec<String>,
}

impl ConfigParser {
    /// Creates a parser over the document root.
    pub fn root(doc: Document) -> Self {
        Self {
            doc,
            path: Vec::new(),
        }
    }

    /// Reads a string at `key`, substituting `default` on absence or type
    /// mismatch.
    pub fn expect_str(&self, key: &str, default: &str, doc: &str) -> String {
        self.expect_scalar(key, default.to_string(), doc, |v| {
            v.as_str().map(ToString::to_string)
        })
    }

    /// Reads an integer at `key`, substituting `default` on absence or type
    /// mismatch.
    pub fn expect_int(&self, key: &str, default: i64, doc: &str) -> i64 {
        self.expect_scalar(key, default, doc, DocValue::as_int)
    }

    /// Reads a number at `key`; integers widen to floats.
    pub fn expect_float(&self, key: &str, default: f64, doc: &str) -> f64 {
        self.expect_scalar(key, default, doc, DocValue::as_float)
    }

    /// Reads a boolean at `key`, substituting `default` on absence or type
    /// mismatch.
    pub fn expect_bool(&self, key: &str, default: bool, doc: &str) -> bool {
        self.expect_scalar(key, default, doc, DocValue::as_bool)
    }

    /// Force-overwrites `key` with `value`, marking the document repaired.
    ///
    /// Used when a syntactically valid value turns out to be semantically
    /// invalid after a plain `expect_*` read (e.g., a command name containing
    /// whitespace).
    pub fn set_value(&self, key: &str, value: impl Into<DocValue>, reason: &str) {
        let mut guard = self.doc.lock();
        let inner = &mut *guard;
        let node = navigate(&mut inner.root, &self.path, &mut inner.repaired);
        node.insert(key.to_string(), value.into());
        inner.repaired = true;
        warn!(key = %self.qualified(key), reason, "config value overwritten");
    }

    /// Records a repair message and returns `fallback`.
    ///
    /// Used when a value must come from a closed enumeration and the actual
    /// value matches none of its members.
    pub fn fail_safe_value<T>(&self, fallback: T, message: &str) -> T {
        self.doc.lock().repaired = true;
        warn!(section = %self.path.join("."), message, "falling back to a safe value");
        fallback
    }

    /// Returns a child parser scoped to the subtree at `key`, creating an
    /// empty subtree if absent. `doc` is recorded as the subtree description.
    pub fn enter(&self, key: &str, doc: &str) -> Self {
        {
            let mut guard = self.doc.lock();
            let inner = &mut *guard;
            let node = navigate(&mut inner.root, &self.path, &mut inner.repaired);
            match node.get(key) {
                Some(DocValue::Map(_)) => {}
                Some(other) => {
                    warn!(
                        key = %self.qualified(key),
                        found = other.type_name(),
                        "expected a section, replacing scalar with an empty one"
                    );
                    node.insert(key.to_string(), DocValue::Map(DocMap::new()));
                    inner.repaired = true;
                }
                None => {
                    if !doc.is_empty() {
                        node.insert(doc_key(key), DocValue::Str(doc.to_string()));
                    }
                    node.insert(key.to_string(), DocValue::Map(DocMap::new()));
                }
            }
        }
        let mut path = self.path.clone();
        path.push(key.to_string());
        Self {
            doc: self.doc.clone(),
            path,
        }
    }

    /// Returns the ordered child key names at the current subtree, excluding
    /// documentation pseudo-keys.
    pub fn keys(&self) -> Vec<String> {
        let mut guard = self.doc.lock();
        let inner = &mut *guard;
        let node = navigate(&mut inner.root, &self.path, &mut inner.repaired);
        node.keys()
            .filter(|k| !k.starts_with(DOC_KEY_PREFIX))
            .cloned()
            .collect()
    }

    /// Whether this parser (transitively) belongs to a freshly generated
    /// document rather than a loaded one.
    pub fn is_fail_safe(&self) -> bool {
        self.doc.is_fail_safe()
    }

    /// Whether any value anywhere in the owning document has been defaulted.
    pub fn is_repaired(&self) -> bool {
        self.doc.is_repaired()
    }

    /// Returns a structural copy of the root tree, documentation annotations
    /// included. Used for persistence.
    pub fn full_config(&self) -> DocMap {
        self.doc.root()
    }

    /// The owning document handle.
    pub fn document(&self) -> Document {
        self.doc.clone()
    }

    fn expect_scalar<T>(
        &self,
        key: &str,
        default: T,
        doc: &str,
        extract: impl Fn(&DocValue) -> Option<T>,
    ) -> T
    where
        T: Clone + Into<DocValue>,
    {
        let mut guard = self.doc.lock();
        let inner = &mut *guard;
        let node = navigate(&mut inner.root, &self.path, &mut inner.repaired);

        if let Some(value) = node.get(key).and_then(|v| extract(v)) {
            return value;
        }

        match node.get(key) {
            Some(found) => warn!(
                key = %self.qualified(key),
                found = found.type_name(),
                "invalid value replaced with default"
            ),
            None => debug!(key = %self.qualified(key), "absent value defaulted"),
        }
        if !doc.is_empty() && !node.contains_key(&doc_key(key)) {
            node.insert(doc_key(key), DocValue::Str(doc.to_string()));
        }
        node.insert(key.to_string(), default.clone().into());
        inner.repaired = true;
        default
    }

    fn qualified(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{key}", self.path.join("."))
        }
    }
}

impl std::fmt::Debug for ConfigParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigParser")
            .field("path", &self.path.join("."))
            .field("fail_safe", &self.is_fail_safe())
            .finish()
    }
}

fn doc_key(key: &str) -> String {
    format!("{DOC_KEY_PREFIX}{key}")
}

/// Walks `path` from `map`, creating empty subtrees for absent segments and
/// replacing scalars that stand where a map is needed.
fn navigate<'a>(mut cur: &'a mut DocMap, path: &[String], repaired: &mut bool) -> &'a mut DocMap {
    for segment in path {
        let valid = cur.get(segment).is_some_and(DocValue::is_map);
        if !valid {
            if cur.contains_key(segment) {
                *repaired = true;
            }
            cur.insert(segment.clone(), DocValue::Map(DocMap::new()));
        }
        cur = match cur.get_mut(segment) {
            Some(DocValue::Map(map)) => map,
            _ => unreachable!("segment was just normalized to a map"),
        };
    }
    cur
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn parser_from(yaml: &str) -> ConfigParser {
        ConfigParser::root(Document::from_yaml(yaml).unwrap())
    }

    #[test]
    fn test_expect_str_reads_valid_value() {
        let parser = parser_from("name: treasury\n");
        assert_eq!(parser.expect_str("name", "default", "The name"), "treasury");
        assert!(!parser.is_repaired());
    }

    #[test]
    fn test_expect_int_defaults_on_absent_key() {
        let parser = parser_from("{}");
        assert_eq!(parser.expect_int("limit", 10, "Account limit"), 10);
        assert!(parser.is_repaired());
    }

    #[test]
    fn test_expect_int_defaults_on_wrong_type() {
        let parser = parser_from("limit: many\n");
        assert_eq!(parser.expect_int("limit", 10, "Account limit"), 10);
        assert!(parser.is_repaired());
    }

    #[test]
    fn test_reread_after_repair_returns_default() {
        let parser = parser_from("limit: many\n");
        parser.expect_int("limit", 10, "Account limit");
        // The malformed value is gone; the written-back default is read.
        assert_eq!(parser.expect_int("limit", 99, "Account limit"), 10);
    }

    #[test]
    fn test_expect_float_accepts_int() {
        let parser = parser_from("rate: 3\n");
        assert_eq!(parser.expect_float("rate", 1.0, "Rate"), 3.0);
        assert!(!parser.is_repaired());
    }

    #[test]
    fn test_expect_bool_strict() {
        let parser = parser_from("active: \"yes\"\n");
        assert!(parser.expect_bool("active", true, "Active flag"));
        assert!(parser.is_repaired());
    }

    #[test]
    fn test_default_write_records_doc_annotation() {
        let parser = parser_from("{}");
        parser.expect_int("limit", 10, "Account limit");
        let root = parser.full_config();
        assert_eq!(root["#limit"].as_str(), Some("Account limit"));
        assert_eq!(root["limit"].as_int(), Some(10));
    }

    #[test]
    fn test_valid_read_does_not_annotate() {
        let parser = parser_from("limit: 3\n");
        parser.expect_int("limit", 10, "Account limit");
        assert!(!parser.full_config().contains_key("#limit"));
    }

    #[test]
    fn test_enter_scopes_reads_to_subtree() {
        let parser = parser_from("ledger:\n  limit: 7\n");
        let ledger = parser.enter("ledger", "Ledger settings");
        assert_eq!(ledger.expect_int("limit", 10, "Account limit"), 7);
    }

    #[test]
    fn test_enter_creates_absent_subtree_without_repair() {
        let parser = parser_from("{}");
        let child = parser.enter("ledger", "Ledger settings");
        assert!(!parser.is_repaired());
        assert_eq!(child.keys(), Vec::<String>::new());
        assert!(parser.full_config()["ledger"].is_map());
    }

    #[test]
    fn test_enter_replaces_scalar_and_repairs() {
        let parser = parser_from("ledger: 42\n");
        let _child = parser.enter("ledger", "Ledger settings");
        assert!(parser.is_repaired());
        assert!(parser.full_config()["ledger"].is_map());
    }

    #[test]
    fn test_child_shares_repaired_flag_with_root() {
        let parser = parser_from("ledger: {}\n");
        let ledger = parser.enter("ledger", "Ledger settings");
        ledger.expect_int("limit", 10, "Account limit");
        assert!(parser.is_repaired());
    }

    #[test]
    fn test_keys_excludes_doc_pseudo_keys() {
        let parser = parser_from("\"#alpha\": \"docs\"\nalpha: 1\nbeta: 2\n");
        assert_eq!(parser.keys(), ["alpha", "beta"]);
    }

    #[test]
    fn test_keys_are_ordered() {
        let parser = parser_from("zeta: 1\nalpha: 2\n");
        assert_eq!(parser.keys(), ["zeta", "alpha"]);
    }

    #[test]
    fn test_set_value_overwrites_and_repairs() {
        let parser = parser_from("command: \"buy money\"\n");
        let read = parser.expect_str("command", "buy", "Command name");
        assert_eq!(read, "buy money");
        assert!(!parser.is_repaired());

        parser.set_value("command", "buy", "command names must not contain whitespace");
        assert!(parser.is_repaired());
        assert_eq!(parser.expect_str("command", "x", "Command name"), "buy");
    }

    #[test]
    fn test_fail_safe_value_marks_repaired() {
        let parser = parser_from("mode: bogus\n");
        let mode = parser.fail_safe_value("standard", "unknown mode `bogus`");
        assert_eq!(mode, "standard");
        assert!(parser.is_repaired());
    }

    #[test]
    fn test_is_fail_safe_transitive_to_children() {
        let parser = ConfigParser::root(Document::empty_fail_safe());
        let child = parser.enter("ledger", "Ledger settings");
        assert!(child.is_fail_safe());
    }

    #[test]
    fn test_full_config_is_idempotent() {
        let parser = parser_from("ledger:\n  limit: many\n");
        parser.enter("ledger", "Ledger").expect_int("limit", 10, "Limit");
        let first = parser.full_config();
        let second = parser.full_config();
        assert_eq!(first, second);
    }

    proptest! {
        // Any string value at an integer key repairs to the default, and the
        // repaired value is what a re-read observes.
        #[test]
        fn prop_string_at_int_key_repairs_to_default(s in ".*", default in any::<i64>()) {
            let mut root = DocMap::new();
            root.insert("limit".to_string(), DocValue::Str(s));
            let parser = ConfigParser::root(Document::new(root, false));

            prop_assert_eq!(parser.expect_int("limit", default, "Limit"), default);
            prop_assert!(parser.is_repaired());
            prop_assert_eq!(parser.expect_int("limit", default.wrapping_add(1), "Limit"), default);
        }
    }
}
