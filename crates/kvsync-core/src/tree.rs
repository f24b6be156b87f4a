//! Tree flattener
//!
//! The store is a flat key space with path-like keys, so a nested document has
//! to be turned into full paths. A key ending in [`PATH_SEPARATOR`] names a
//! subtree; any other key names a leaf value.
//!
//! At the top level that rule is strict: `dev: {a: b}` is an error because
//! `dev` is a leaf key holding a mapping. Below a subtree, keys holding a
//! mapping are re-marked as subtrees, so `a/: {b: {c: d}}` yields `a/b/c`.

use tracing::{debug, error, info};

use crate::document::{KvNode, KvTree, PATH_SEPARATOR};
use crate::scalar::coerce;
use crate::{Error, Result};

/// One instruction produced by walking a [`KvTree`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlatEntry {
    /// Store `value` at `path`
    Leaf { path: String, value: String },
    /// Leave the single key at `path` alone
    IgnoreKey { path: String },
    /// Leave every key starting with `prefix` alone
    IgnoreSubtree { prefix: String },
}

impl FlatEntry {
    pub fn path(&self) -> &str {
        match self {
            Self::Leaf { path, .. } | Self::IgnoreKey { path } => path,
            Self::IgnoreSubtree { prefix } => prefix,
        }
    }
}

/// Walk `tree`, handing each entry to `visit` as soon as it is produced.
///
/// Stops at the first structural error, or the first error returned by
/// `visit`. Entries visited before that point have already been handed out.
pub fn walk<F>(tree: &KvTree, prefix: &str, visit: &mut F) -> Result<()>
where
    F: FnMut(FlatEntry) -> Result<()>,
{
    walk_level(tree, prefix, false, visit)
}

/// Flatten `tree` into a list of entries.
///
/// # Example
///
/// ```
/// use kvsync_core::document::Document;
/// use kvsync_core::tree::{flatten, FlatEntry};
///
/// let doc = Document::parse("kv:\n  a/:\n    b:\n      c: d\n    e: f\n").unwrap();
/// let entries = flatten(&doc.kv, "").unwrap();
/// assert_eq!(entries, vec![
///     FlatEntry::Leaf { path: "a/b/c".into(), value: "d".into() },
///     FlatEntry::Leaf { path: "a/e".into(), value: "f".into() },
/// ]);
/// ```
pub fn flatten(tree: &KvTree, prefix: &str) -> Result<Vec<FlatEntry>> {
    let mut entries = Vec::new();
    walk(tree, prefix, &mut |entry| {
        entries.push(entry);
        Ok(())
    })?;
    Ok(entries)
}

fn walk_level<F>(tree: &KvTree, prefix: &str, nested: bool, visit: &mut F) -> Result<()>
where
    F: FnMut(FlatEntry) -> Result<()>,
{
    for (segment, node) in tree {
        if segment.is_empty() {
            error!("Got empty key in the K/V collection under '{}'", prefix);
            continue;
        }

        let mut path = format!("{prefix}{segment}");
        let is_subtree =
            segment.ends_with(PATH_SEPARATOR) || (nested && matches!(node, KvNode::Tree(_)));

        if !is_subtree {
            let entry = match node {
                KvNode::Ignore => FlatEntry::IgnoreKey { path },
                other => match coerce(other) {
                    Some(value) => FlatEntry::Leaf { path, value },
                    None => {
                        let err = Error::InvalidLeaf {
                            key: path,
                            kind: other.kind(),
                        };
                        error!("{}", err);
                        return Err(err);
                    }
                },
            };
            visit(entry)?;
            continue;
        }

        if !path.ends_with(PATH_SEPARATOR) {
            path.push(PATH_SEPARATOR);
        }

        match node {
            KvNode::Ignore => {
                info!("Ignoring tree: {}", path);
                visit(FlatEntry::IgnoreSubtree { prefix: path })?;
            }
            KvNode::Tree(children) => {
                debug!("Importing tree {}", path);
                walk_level(children, &path, true, visit)?;
            }
            other => {
                let err = Error::InvalidSubtree {
                    key: path,
                    kind: other.kind(),
                };
                error!("{}", err);
                return Err(err);
            }
        }
    }

    Ok(())
}
