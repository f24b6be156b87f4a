//! Scalar coercion: the text form a document value is stored as

use crate::document::{KvNode, Scalar};

impl Scalar {
    /// Canonical text form of the scalar.
    ///
    /// Floats use the shortest decimal that round-trips, never an exponent.
    /// This is lossy for the source text: `1.0` is stored as `1`, `.nan` as
    /// `NaN`. Quote the value in the document to keep it verbatim.
    pub fn to_text(&self) -> String {
        match self {
            Scalar::String(s) => s.clone(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Integer(i) => i.to_string(),
            Scalar::Unsigned(u) => u.to_string(),
            Scalar::Float(f) => f.to_string(),
        }
    }
}

/// Coerce a document value into the text written to the store.
///
/// Returns `None` for anything that is not a scalar, including the ignore
/// sentinel, which callers handle before coercing.
pub fn coerce(node: &KvNode) -> Option<String> {
    match node {
        KvNode::Scalar(scalar) => Some(scalar.to_text()),
        KvNode::Ignore | KvNode::Tree(_) | KvNode::Unsupported(_) => None,
    }
}
