//! A sorted compact radix (prefix) tree keyed by raw byte strings.
//!
//! Keys are arbitrary byte sequences; values are any payload type, opaque
//! to the tree. Sibling edges are kept sorted by first byte, so every
//! descent is a chain of binary searches and iteration is ordered for
//! free. On top of the usual set/get/delete the tree answers
//! longest-prefix and neighbor queries, and in parameter mode it matches
//! placeholder segments the way an HTTP path router does.
//!
//! ```
//! use radixtree::RadixTree;
//!
//! let mut tree = RadixTree::new();
//! tree.set("romane", 1)?;
//! tree.set("romanus", 2)?;
//! assert_eq!(tree.get("romane")?, &1);
//!
//! let (path, value) = tree.longest_match("romanesque")?;
//! assert_eq!(path, b"romane");
//! assert_eq!(value, &1);
//! # Ok::<(), radixtree::TreeError>(())
//! ```
//!
//! Parameter mode binds placeholder segments of stored keys to the
//! matching runs of the query:
//!
//! ```
//! use radixtree::{ParamMap, RadixTree};
//!
//! let mut router = RadixTree::with_params(b'/', b':');
//! router.set_with_params("/projects/:project", "ProjectHandler")?;
//!
//! let mut params = ParamMap::default();
//! let value = router.get_with_params("/projects/skunkworks", &mut params)?;
//! assert_eq!(value, &"ProjectHandler");
//! assert_eq!(params.get(b"project".as_slice()), Some(&b"skunkworks".to_vec()));
//! # Ok::<(), radixtree::TreeError>(())
//! ```
//!
//! The tree is a purely synchronous structure: it is not safe for
//! concurrent mutation, and shared read-only access is the host's
//! responsibility to arrange.

mod iter;
mod node;
mod tree;

use std::fmt;

use ahash::AHashMap;

pub use iter::Iter;
pub use tree::{RadixTree, TreeStats};

/// Parameter captures of a routed lookup: placeholder name to the bytes
/// the placeholder consumed.
pub type ParamMap = AHashMap<Vec<u8>, Vec<u8>>;

/// Output of a neighbor lookup: full stored key to its value.
pub type MatchMap<'a, V> = AHashMap<Vec<u8>, &'a V>;

/// Failure taxonomy of the tree operations.
///
/// Every failure is reported to the immediate caller before any
/// structural change, so a failing mutation leaves the tree untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
  /// The supplied key was the empty byte string.
  EmptyKey,
  /// Lookup or delete targeted a key or prefix that is not stored.
  KeyNotFound,
  /// A parameterized key contains an adjacent delimiter/parameter pair
  /// that cannot be parsed into segments.
  InvalidKey,
  /// A parameterized insert would make routing ambiguous against an
  /// existing placeholder at the same structural position.
  ConflictKey,
}

impl fmt::Display for TreeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let msg = match self {
      TreeError::EmptyKey => "empty key",
      TreeError::KeyNotFound => "key not found",
      TreeError::InvalidKey => "invalid delimiter/parameter placement in key",
      TreeError::ConflictKey => "key conflicts with an existing parameter placeholder",
    };
    f.write_str(msg)
  }
}

impl std::error::Error for TreeError {}
