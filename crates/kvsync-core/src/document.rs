//! Desired-state document
//!
//! A document has two optional sections:
//!
//! ```yaml
//! policies:
//!   - name: web
//!     type: client
//!     rules: |
//!       key "web/" { policy = "write" }
//! kv:
//!   web/:
//!     port: 8080
//!     debug: false
//!   vault/: "${ignore}"
//! ```
//!
//! Values under `kv` are classified once, when the document is parsed, into a
//! [`KvNode`]. Nodes the flattener cannot store (sequences, nulls) are kept as
//! [`KvNode::Unsupported`] so the tree walk reports them at the point where it
//! reaches them.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tracing::warn;

use crate::Result;

/// Marker meaning "leave this entry or subtree exactly as found"
pub const IGNORE_SENTINEL: &str = "${ignore}";

/// Separator between path segments; a trailing one marks a subtree key
pub const PATH_SEPARATOR: char = '/';

/// Nested key/value tree, keyed by path segment
pub type KvTree = BTreeMap<String, KvNode>;

/// A scalar document value
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Bool(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
}

/// What a value in the `kv` section turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum KvNode {
    Scalar(Scalar),
    /// The [`IGNORE_SENTINEL`] string
    Ignore,
    Tree(KvTree),
    Unsupported(UnsupportedKind),
}

/// Document values that have no place in a key/value store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedKind {
    Null,
    Sequence,
    Tagged,
}

impl fmt::Display for UnsupportedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Sequence => write!(f, "sequence"),
            Self::Tagged => write!(f, "tagged value"),
        }
    }
}

impl KvNode {
    /// Short name of the value's type, used in error messages
    pub fn kind(&self) -> String {
        match self {
            Self::Scalar(Scalar::String(_)) => "string".to_string(),
            Self::Scalar(Scalar::Bool(_)) => "bool".to_string(),
            Self::Scalar(Scalar::Integer(_) | Scalar::Unsigned(_)) => "integer".to_string(),
            Self::Scalar(Scalar::Float(_)) => "float".to_string(),
            Self::Ignore => "ignore sentinel".to_string(),
            Self::Tree(_) => "mapping".to_string(),
            Self::Unsupported(kind) => kind.to_string(),
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::Scalar(Scalar::String(value.into()))
    }
}

impl From<Value> for KvNode {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) if s == IGNORE_SENTINEL => Self::Ignore,
            Value::String(s) => Self::Scalar(Scalar::String(s)),
            Value::Bool(b) => Self::Scalar(Scalar::Bool(b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Scalar(Scalar::Integer(i))
                } else if let Some(u) = n.as_u64() {
                    Self::Scalar(Scalar::Unsigned(u))
                } else {
                    Self::Scalar(Scalar::Float(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            Value::Mapping(mapping) => Self::Tree(tree_from_mapping(mapping)),
            Value::Null => Self::Unsupported(UnsupportedKind::Null),
            Value::Sequence(_) => Self::Unsupported(UnsupportedKind::Sequence),
            Value::Tagged(_) => Self::Unsupported(UnsupportedKind::Tagged),
        }
    }
}

/// Convert a YAML mapping into a [`KvTree`].
///
/// Scalar keys other than strings (`1: a`, `true: b`) are rendered as text.
/// Keys that are themselves collections are skipped.
pub fn tree_from_mapping(mapping: Mapping) -> KvTree {
    let mut tree = KvTree::new();
    for (key, value) in mapping {
        let key = match key {
            Value::String(s) => s,
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            other => {
                warn!("Skipping K/V entry with a non-scalar key: {:?}", other);
                continue;
            }
        };
        tree.insert(key, KvNode::from(value));
    }
    tree
}

/// A policy as declared in a document
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DesiredPolicy {
    pub name: String,

    /// `client` or `management`; empty means `client`
    #[serde(rename = "type", default)]
    pub policy_type: String,

    #[serde(default)]
    pub rules: String,
}

impl DesiredPolicy {
    pub fn new(
        name: impl Into<String>,
        policy_type: impl Into<String>,
        rules: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            policy_type: policy_type.into(),
            rules: rules.into(),
        }
    }

    /// Whether the rules are the ignore sentinel
    pub fn is_ignored(&self) -> bool {
        self.rules == IGNORE_SENTINEL
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawDocument {
    #[serde(default)]
    policies: Option<Vec<DesiredPolicy>>,
    #[serde(default)]
    kv: Option<Mapping>,
}

/// The desired state of a store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// Policies in document order
    pub policies: Vec<DesiredPolicy>,
    /// Top level of the key/value tree
    pub kv: KvTree,
}

impl From<RawDocument> for Document {
    fn from(raw: RawDocument) -> Self {
        Self {
            policies: raw.policies.unwrap_or_default(),
            kv: raw.kv.map(tree_from_mapping).unwrap_or_default(),
        }
    }
}

impl Document {
    /// Parse a document from YAML (JSON is accepted as well).
    ///
    /// An empty document parses to [`Document::default`].
    ///
    /// # Example
    ///
    /// ```
    /// use kvsync_core::document::{Document, KvNode};
    ///
    /// let doc = Document::parse("kv:\n  app/: \"${ignore}\"\n").unwrap();
    /// assert_eq!(doc.kv.get("app/"), Some(&KvNode::Ignore));
    /// ```
    pub fn parse(content: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(content)?;
        if value.is_null() {
            return Ok(Self::default());
        }
        let raw: RawDocument = serde_yaml::from_value(value)?;
        Ok(raw.into())
    }

    /// Merge another document into this one.
    ///
    /// Policies are appended; top-level K/V keys from `other` replace ours.
    pub fn merge(&mut self, other: Document) {
        self.policies.extend(other.policies);
        self.kv.extend(other.kv);
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty() && self.kv.is_empty()
    }
}
