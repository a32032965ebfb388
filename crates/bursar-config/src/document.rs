//! The on-disk configuration document.
//!
//! A [`Document`] is a tree of nodes loaded from one YAML file. Each node is a
//! scalar (string, number, bool) or a nested map. Human-readable documentation
//! is stored in-band as pseudo-keys prefixed with `#`:
//!
//! ```yaml
//! ledger:
//!   "#limit": "Maximum number of accounts per player"
//!   limit: 10
//! ```
//!
//! The document carries two flags. `repaired` is set the first time any value
//! is substituted with a default; a repaired document is written back to disk
//! at the end of the load pass. `fail_safe` marks a document that started out
//! blank (absent file, or regeneration after a parse failure) rather than one
//! loaded from disk.
//!
//! The document is a single-writer tree: exactly one logical task mutates it
//! between suspension points, and [`ConfigParser`](crate::ConfigParser) views
//! share it through the handle's internal lock.

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;

/// Marker prefix for in-band documentation pseudo-keys.
pub const DOC_KEY_PREFIX: &str = "#";

/// An insertion-ordered map of document nodes.
pub type DocMap = IndexMap<String, DocValue>;

/// A single node in the configuration tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocValue {
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Floating-point scalar.
    Float(f64),
    /// String scalar.
    Str(String),
    /// Nested map.
    Map(DocMap),
}

impl DocValue {
    /// Returns the string value, if this node is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer value, if this node is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the numeric value; integers widen to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            #[allow(clippy::cast_precision_loss)]
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns the boolean value, if this node is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the nested map, if this node is a map.
    pub fn as_map(&self) -> Option<&DocMap> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Whether this node is a nested map.
    pub fn is_map(&self) -> bool {
        matches!(self, Self::Map(_))
    }

    /// A short name for the node's type, used in repair log lines.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Map(_) => "map",
        }
    }
}

impl From<&str> for DocValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for DocValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for DocValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for DocValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for DocValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<DocMap> for DocValue {
    fn from(m: DocMap) -> Self {
        Self::Map(m)
    }
}

pub(crate) struct DocumentInner {
    pub(crate) root: DocMap,
    pub(crate) repaired: bool,
    pub(crate) fail_safe: bool,
}

/// Shared handle to one configuration tree.
///
/// Cloning the handle shares the underlying tree; parser views created from
/// the same document all observe the same `repaired` flag.
#[derive(Clone)]
pub struct Document {
    inner: Arc<Mutex<DocumentInner>>,
}

impl Document {
    /// Creates a document from an existing tree.
    pub fn new(root: DocMap, fail_safe: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DocumentInner {
                root,
                repaired: false,
                fail_safe,
            })),
        }
    }

    /// Creates a blank fail-safe document, as used on the regeneration path.
    pub fn empty_fail_safe() -> Self {
        Self::new(DocMap::new(), true)
    }

    /// Parses a document from YAML text. The result is not fail-safe.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::new(DocMap::new(), false));
        }
        let root: DocMap = serde_yaml::from_str(text)?;
        Ok(Self::new(root, false))
    }

    /// Loads the document from disk.
    ///
    /// An absent file yields a blank fail-safe document so a fresh default
    /// file can be generated by the load pass. An unreadable or unparseable
    /// file is an error for the caller to handle.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(path = %path.display(), "configuration file absent, starting from defaults");
            return Ok(Self::empty_fail_safe());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::read_error(path, source))?;
        Self::from_yaml(&text)
    }

    /// Serializes the full tree, documentation pseudo-keys included.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        let inner = self.inner.lock();
        Ok(serde_yaml::to_string(&inner.root)?)
    }

    /// Writes the document to disk.
    pub fn persist(&self, path: &Path) -> Result<(), ConfigError> {
        let text = self.to_yaml()?;
        std::fs::write(path, text).map_err(|source| ConfigError::write_error(path, source))?;
        debug!(path = %path.display(), "configuration document persisted");
        Ok(())
    }

    /// Whether any value has been defaulted or force-overwritten.
    pub fn is_repaired(&self) -> bool {
        self.inner.lock().repaired
    }

    /// Whether this document started out blank rather than loaded from disk.
    pub fn is_fail_safe(&self) -> bool {
        self.inner.lock().fail_safe
    }

    /// Returns a structural copy of the root tree.
    pub fn root(&self) -> DocMap {
        self.inner.lock().root.clone()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, DocumentInner> {
        self.inner.lock()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Document")
            .field("keys", &inner.root.len())
            .field("repaired", &inner.repaired)
            .field("fail_safe", &inner.fail_safe)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yaml_scalars() {
        let doc = Document::from_yaml("name: ledger\ncount: 4\nratio: 0.5\nactive: true\n")
            .unwrap();
        let root = doc.root();
        assert_eq!(root["name"].as_str(), Some("ledger"));
        assert_eq!(root["count"].as_int(), Some(4));
        assert_eq!(root["ratio"].as_float(), Some(0.5));
        assert_eq!(root["active"].as_bool(), Some(true));
    }

    #[test]
    fn test_from_yaml_nested_map() {
        let doc = Document::from_yaml("ledger:\n  limit: 10\n").unwrap();
        let root = doc.root();
        let ledger = root["ledger"].as_map().unwrap();
        assert_eq!(ledger["limit"].as_int(), Some(10));
    }

    #[test]
    fn test_from_yaml_preserves_key_order() {
        let doc = Document::from_yaml("zeta: 1\nalpha: 2\nmid: 3\n").unwrap();
        let keys: Vec<_> = doc.root().keys().cloned().collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_empty_text_is_not_fail_safe() {
        let doc = Document::from_yaml("").unwrap();
        assert!(!doc.is_fail_safe());
        assert!(doc.root().is_empty());
    }

    #[test]
    fn test_empty_fail_safe_flags() {
        let doc = Document::empty_fail_safe();
        assert!(doc.is_fail_safe());
        assert!(!doc.is_repaired());
    }

    #[test]
    fn test_load_absent_file_is_fail_safe() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Document::load(&dir.path().join("config.yml")).unwrap();
        assert!(doc.is_fail_safe());
    }

    #[test]
    fn test_load_invalid_yaml_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, "top: [unclosed\n").unwrap();
        assert!(Document::load(&path).is_err());
    }

    #[test]
    fn test_yaml_round_trip_keeps_doc_annotations() {
        let doc = Document::from_yaml("\"#limit\": \"Maximum accounts\"\nlimit: 10\n").unwrap();
        let yaml = doc.to_yaml().unwrap();
        let reloaded = Document::from_yaml(&yaml).unwrap();
        assert_eq!(doc.root(), reloaded.root());
        assert!(yaml.contains("#limit"));
    }

    #[test]
    fn test_int_does_not_parse_as_float_variant() {
        let doc = Document::from_yaml("count: 4\n").unwrap();
        assert_eq!(doc.root()["count"], DocValue::Int(4));
    }
}
