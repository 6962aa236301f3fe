use std::fmt;

use crate::iter::Iter;
use crate::node::{longest_common_prefix, Arena, Node, NodeId, ROOT};
use crate::{MatchMap, ParamMap, TreeError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Delimiter and placeholder bytes for parameterized keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub(crate) struct ParamConfig {
  pub delimiter: u8,
  pub parameter: u8,
}

/// A compact radix (prefix) tree keyed by raw byte strings.
///
/// Sibling edges are kept sorted, so lookups descend with binary searches
/// and [`iter`](Self::iter) yields keys in ascending lexicographic order
/// for free. Beyond exact lookups the tree answers longest-prefix and
/// neighbor queries, and a tree constructed with
/// [`with_params`](Self::with_params) routes parameterized keys the way
/// an HTTP path router does.
#[derive(Debug, Clone)]
pub struct RadixTree<V> {
  arena: Arena<V>,
  size: usize,
  params: Option<ParamConfig>,
}

impl<V> Default for RadixTree<V> {
  fn default() -> Self {
    Self {
      arena: Arena::new(),
      size: 0,
      params: None,
    }
  }
}

impl<V> RadixTree<V> {
  /// Creates an empty tree.
  pub fn new() -> Self {
    Self::default()
  }

  /// Creates an empty tree in parameter mode: stored key segments
  /// introduced by `parameter` match any run of query bytes up to the
  /// next `delimiter` and bind the captured run under the segment name.
  ///
  /// # Panics
  ///
  /// Panics if either byte is zero or the two bytes are equal.
  pub fn with_params(delimiter: u8, parameter: u8) -> Self {
    assert!(
      delimiter != 0 && parameter != 0,
      "delimiter and parameter bytes must be non-zero"
    );
    assert!(
      delimiter != parameter,
      "delimiter and parameter bytes must differ"
    );
    Self {
      arena: Arena::new(),
      size: 0,
      params: Some(ParamConfig { delimiter, parameter }),
    }
  }

  /// Builds a tree from key/value pairs. The first failing insert aborts
  /// the construction and its error is returned.
  pub fn from_map<K, I>(pairs: I) -> Result<Self, TreeError>
  where
    K: AsRef<[u8]>,
    I: IntoIterator<Item = (K, V)>,
  {
    let mut tree = Self::new();
    for (k, v) in pairs {
      tree.set(k, v)?;
    }
    Ok(tree)
  }

  /// Parameter-mode variant of [`from_map`](Self::from_map); pairs go
  /// through the same validation as [`set_with_params`](Self::set_with_params).
  pub fn from_map_with_params<K, I>(
    delimiter: u8,
    parameter: u8,
    pairs: I,
  ) -> Result<Self, TreeError>
  where
    K: AsRef<[u8]>,
    I: IntoIterator<Item = (K, V)>,
  {
    let mut tree = Self::with_params(delimiter, parameter);
    for (k, v) in pairs {
      tree.set_with_params(k, v)?;
    }
    Ok(tree)
  }

  /// Number of stored keys.
  pub fn size(&self) -> usize {
    self.size
  }

  pub fn is_empty(&self) -> bool {
    self.size == 0
  }

  /// Iterates stored keys in ascending lexicographic byte order.
  pub fn iter(&self) -> Iter<'_, V> {
    Iter::new(&self.arena)
  }

  // --- INSERT ---

  /// Associates `value` with `key`, replacing any previous value.
  pub fn set<K: AsRef<[u8]>>(&mut self, key: K, value: V) -> Result<(), TreeError> {
    self.set_impl(key.as_ref(), value, false)
  }

  /// Like [`set`](Self::set), additionally validating parameter syntax
  /// and rejecting keys that would make parameterized routing ambiguous.
  /// On a tree without parameter configuration this behaves as plain
  /// [`set`](Self::set).
  pub fn set_with_params<K: AsRef<[u8]>>(&mut self, key: K, value: V) -> Result<(), TreeError> {
    self.set_impl(key.as_ref(), value, true)
  }

  fn set_impl(&mut self, key: &[u8], value: V, validate: bool) -> Result<(), TreeError> {
    if key.is_empty() {
      return Err(TreeError::EmptyKey);
    }

    let params = if validate { self.params } else { None };
    if let Some(cfg) = params {
      validate_key(key, cfg)?;
    }

    let mut key = key;
    let mut n = ROOT;
    loop {
      // the key ends exactly on this node, update its value in place
      if self.arena.node(n).label.as_slice() == key {
        let node = self.arena.node_mut(n);
        if node.value.is_none() {
          self.size += 1;
        }
        node.value = Some(value);
        return Ok(());
      }

      let p = longest_common_prefix(&self.arena.node(n).label, key);

      // the key diverges inside this node's label, split the node
      if p > 0 && self.arena.node(n).label.len() > p {
        if p == key.len() {
          self.split_promote(n, p, value);
        } else {
          if let Some(cfg) = params {
            check_split_conflict(&self.arena.node(n).label, key, p, cfg)?;
          }
          self.split_branch(n, p, key, value);
        }
        self.size += 1;
        return Ok(());
      }

      key = &key[p..];
      match self.arena.find_child(n, key[0]) {
        Ok(i) => {
          n = self.arena.node(n).children[i];
        }
        Err(i) => {
          let leaf = self.arena.alloc(Node::new(key.to_vec(), Some(value), Some(n)));
          self.arena.node_mut(n).children.insert(i, leaf);
          self.size += 1;
          return Ok(());
        }
      }
    }
  }

  /// Split where the new key terminates exactly at the split point: the
  /// node keeps the label head and takes the new value, the label tail
  /// moves into a single child carrying the old state.
  fn split_promote(&mut self, n: NodeId, at: usize, value: V) {
    let node = self.arena.node_mut(n);
    let tail = node.label.split_off(at);
    let old_value = node.value.replace(value);
    let old_children = std::mem::take(&mut node.children);

    let mut inherited = Node::new(tail, old_value, Some(n));
    inherited.children = old_children;
    let child = self.arena.alloc(inherited);

    self.arena.node_mut(n).children.push(child);
    self.arena.reparent_children(child);
  }

  /// Split where key and label both continue past the split point: the
  /// node keeps the common head and becomes a routing-only parent of two
  /// children, one inheriting the old state and a fresh leaf for the new
  /// key.
  fn split_branch(&mut self, n: NodeId, at: usize, key: &[u8], value: V) {
    let node = self.arena.node_mut(n);
    let tail = node.label.split_off(at);
    let old_value = node.value.take();
    let old_children = std::mem::take(&mut node.children);

    let mut old_state = Node::new(tail, old_value, Some(n));
    old_state.children = old_children;
    let inherited = self.arena.alloc(old_state);
    let fresh = self
      .arena
      .alloc(Node::new(key[at..].to_vec(), Some(value), Some(n)));

    let pair = if self.arena.node(inherited).first_byte() < self.arena.node(fresh).first_byte() {
      vec![inherited, fresh]
    } else {
      vec![fresh, inherited]
    };
    self.arena.node_mut(n).children = pair;
    self.arena.reparent_children(inherited);
  }

  // --- DELETE ---

  /// Removes a stored key. Paths that exist only as routing nodes are not
  /// stored keys and report [`TreeError::KeyNotFound`].
  pub fn delete<K: AsRef<[u8]>>(&mut self, key: K) -> Result<(), TreeError> {
    self.delete_impl(key.as_ref(), false)
  }

  /// Removes every stored key beginning with `prefix`.
  pub fn delete_prefix<K: AsRef<[u8]>>(&mut self, prefix: K) -> Result<(), TreeError> {
    self.delete_impl(prefix.as_ref(), true)
  }

  fn delete_impl(&mut self, key: &[u8], prefix: bool) -> Result<(), TreeError> {
    if key.is_empty() {
      return Err(TreeError::EmptyKey);
    }

    let mut key = key;
    let mut n = ROOT;
    loop {
      let p = longest_common_prefix(&self.arena.node(n).label, key);
      key = &key[p..];
      if key.is_empty() {
        return Err(TreeError::KeyNotFound);
      }

      let i = match self.arena.find_child(n, key[0]) {
        Ok(i) => i,
        Err(_) => return Err(TreeError::KeyNotFound),
      };
      let c = self.arena.node(n).children[i];

      // the remaining bytes end inside this child's label: in prefix mode
      // that child's whole subtree goes
      if prefix && longest_common_prefix(key, &self.arena.node(c).label) == key.len() {
        let removed = self.arena.valued_in_subtree(c);
        self.arena.node_mut(n).children.remove(i);
        self.arena.release_subtree(c);
        self.size -= removed;
        return Ok(());
      }

      if self.arena.node(c).label.as_slice() == key {
        if self.arena.node(c).value.is_none() {
          // a routing-only node, not a stored key
          return Err(TreeError::KeyNotFound);
        }
        if self.arena.node(c).children.is_empty() {
          self.arena.node_mut(n).children.remove(i);
          self.arena.release(c);
          self.merge_if_redundant(n);
        } else {
          self.arena.node_mut(c).value = None;
          self.merge_if_redundant(c);
        }
        self.size -= 1;
        return Ok(());
      }

      n = c;
    }
  }

  /// Coalesces a valueless non-root node left with exactly one child into
  /// a single node, concatenating labels. Valued nodes are never merged
  /// away.
  fn merge_if_redundant(&mut self, n: NodeId) {
    if n == ROOT {
      return;
    }
    let node = self.arena.node(n);
    if node.value.is_some() || node.children.len() != 1 {
      return;
    }

    let child = node.children[0];
    let released = self.arena.release(child);
    let node = self.arena.node_mut(n);
    node.label.extend_from_slice(&released.label);
    node.value = released.value;
    node.children = released.children;
    self.arena.reparent_children(n);
  }

  // --- LOOKUP ---

  /// Returns the value stored under exactly `key`.
  pub fn get<K: AsRef<[u8]>>(&self, key: K) -> Result<&V, TreeError> {
    let id = self.lookup(key.as_ref())?;
    self
      .arena
      .node(id)
      .value
      .as_ref()
      .ok_or(TreeError::KeyNotFound)
  }

  /// Mutable variant of [`get`](Self::get).
  pub fn get_mut<K: AsRef<[u8]>>(&mut self, key: K) -> Result<&mut V, TreeError> {
    let id = self.lookup(key.as_ref())?;
    self
      .arena
      .node_mut(id)
      .value
      .as_mut()
      .ok_or(TreeError::KeyNotFound)
  }

  /// Descends to the node whose full path equals `key`.
  fn lookup(&self, key: &[u8]) -> Result<NodeId, TreeError> {
    if key.is_empty() {
      return Err(TreeError::EmptyKey);
    }

    let mut key = key;
    let mut n = ROOT;
    loop {
      let node = self.arena.node(n);
      if node.label.as_slice() == key {
        return Ok(n);
      }
      if !key.starts_with(&node.label) {
        return Err(TreeError::KeyNotFound);
      }

      key = &key[node.label.len()..];
      match self.arena.find_child(n, key[0]) {
        Ok(i) => n = node.children[i],
        Err(_) => return Err(TreeError::KeyNotFound),
      }
    }
  }

  /// Returns the longest stored key that is a prefix of `key`, together
  /// with its value.
  pub fn longest_match<K: AsRef<[u8]>>(&self, key: K) -> Result<(Vec<u8>, &V), TreeError> {
    let (path, id) = self.longest_match_node(key.as_ref())?;
    let value = self
      .arena
      .node(id)
      .value
      .as_ref()
      .expect("matched node is valued");
    Ok((path, value))
  }

  fn longest_match_node(&self, key: &[u8]) -> Result<(Vec<u8>, NodeId), TreeError> {
    if key.is_empty() {
      return Err(TreeError::EmptyKey);
    }

    let mut rem = key;
    let mut n = ROOT;
    let mut path = Vec::with_capacity(key.len());

    // descend while the query consumes whole labels
    loop {
      let node = self.arena.node(n);
      path.extend_from_slice(&node.label);

      if rem == node.label.as_slice() {
        if node.value.is_some() {
          return Ok((path, n));
        }
        break;
      }

      if !rem.starts_with(&node.label) {
        // diverged inside this label; the ascent strips it again
        break;
      }

      rem = &rem[node.label.len()..];
      match self.arena.find_child(n, rem[0]) {
        Ok(i) => n = node.children[i],
        Err(_) => {
          // label fully consumed and no child continues the query, so
          // this node holds the longest stored prefix if it is valued
          if node.value.is_some() {
            return Ok((path, n));
          }
          break;
        }
      }
    }

    // back out to the nearest valued ancestor
    let mut cur = n;
    while let Some(parent) = self.arena.node(cur).parent {
      path.truncate(path.len() - self.arena.node(cur).label.len());
      cur = parent;
      if self.arena.node(cur).value.is_some() {
        return Ok((path, cur));
      }
    }

    Err(TreeError::KeyNotFound)
  }

  /// Computes the longest match for `key` and collects it together with
  /// its valued children, parent and siblings into `out`, each keyed by
  /// its full stored key.
  pub fn neighbor_match<'a, K: AsRef<[u8]>>(
    &'a self,
    key: K,
    out: &mut MatchMap<'a, V>,
  ) -> Result<(), TreeError> {
    let (path, n) = self.longest_match_node(key.as_ref())?;
    let node = self.arena.node(n);

    if let Some(v) = &node.value {
      out.insert(path.clone(), v);
    }

    for &c in &node.children {
      let child = self.arena.node(c);
      if let Some(v) = &child.value {
        let mut k = path.clone();
        k.extend_from_slice(&child.label);
        out.insert(k, v);
      }
    }

    let parent = match node.parent {
      Some(p) => p,
      None => return Ok(()),
    };
    // the parent's own path is the match shortened by this node's label
    let parent_path = &path[..path.len() - node.label.len()];

    let pnode = self.arena.node(parent);
    if parent != ROOT {
      if let Some(v) = &pnode.value {
        out.insert(parent_path.to_vec(), v);
      }
    }

    for &s in &pnode.children {
      if s == n {
        continue;
      }
      let sib = self.arena.node(s);
      if let Some(v) = &sib.value {
        let mut k = parent_path.to_vec();
        k.extend_from_slice(&sib.label);
        out.insert(k, v);
      }
    }

    Ok(())
  }

  // --- PARAMETERIZED LOOKUP ---

  /// Like [`get`](Self::get), but placeholder segments in stored keys
  /// match any delimiter-free run of the query and bind their captures
  /// into `params`. On failure the contents of `params` are unspecified
  /// and must be discarded. Without parameter configuration this degrades
  /// to exact [`get`](Self::get).
  pub fn get_with_params<'a, K: AsRef<[u8]>>(
    &'a self,
    key: K,
    params: &mut ParamMap,
  ) -> Result<&'a V, TreeError> {
    let cfg = match self.params {
      Some(cfg) => cfg,
      None => return self.get(key),
    };

    let key = key.as_ref();
    if key.is_empty() {
      return Err(TreeError::EmptyKey);
    }

    let mut key = key;
    let mut n = ROOT;
    loop {
      // a placeholder child outranks a literal first-byte match
      let found = self
        .arena
        .find_child(n, cfg.parameter)
        .or_else(|_| self.arena.find_child(n, key[0]));
      let c = match found {
        Ok(i) => self.arena.node(n).children[i],
        Err(_) => return Err(TreeError::KeyNotFound),
      };

      let label = &self.arena.node(c).label;
      let p = longest_common_prefix(label, key);
      let mut node_key = &label[p..];
      key = &key[p..];

      // placeholder run: bind one capture per stored parameter segment
      while !key.is_empty() && !node_key.is_empty() && node_key[0] == cfg.parameter {
        let name = &node_key[1..];
        let name = match name.iter().position(|&b| b == cfg.delimiter) {
          Some(d) => &name[..d],
          None => name,
        };

        let captured = match key.iter().position(|&b| b == cfg.delimiter) {
          Some(d) => &key[..d],
          None => key,
        };

        params.insert(name.to_vec(), captured.to_vec());
        key = &key[captured.len()..];
        node_key = &node_key[name.len() + 1..];

        // literal bytes between placeholders must match the query exactly
        let lit = longest_common_prefix(node_key, key);
        key = &key[lit..];
        node_key = &node_key[lit..];
      }

      if key.is_empty() {
        if node_key.is_empty() {
          return self
            .arena
            .node(c)
            .value
            .as_ref()
            .ok_or(TreeError::KeyNotFound);
        }
        return Err(TreeError::KeyNotFound);
      }
      if !node_key.is_empty() {
        return Err(TreeError::KeyNotFound);
      }

      n = c;
    }
  }

  // --- DIAGNOSTICS ---

  /// Gathers aggregate shape information with a level-order walk.
  pub fn stats(&self) -> TreeStats {
    let mut stats = TreeStats::default();
    self.arena.breadth_first(ROOT, &mut |id| {
      let node = self.arena.node(id);
      stats.nodes += 1;
      if node.value.is_some() {
        stats.keys += 1;
      }
      stats.max_fanout = stats.max_fanout.max(node.children.len());
      stats.max_depth = stats.max_depth.max(self.arena.depth(id));
      true
    });
    stats
  }
}

/// Aggregate shape of a tree, as reported by [`RadixTree::stats`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeStats {
  /// Total node count, the root included.
  pub nodes: usize,
  /// Nodes carrying a value, i.e. stored keys.
  pub keys: usize,
  /// Longest root-to-node chain, in edges.
  pub max_depth: usize,
  /// Widest child list.
  pub max_fanout: usize,
}

// --- PARAMETER VALIDATION ---

/// Rejects adjacent byte pairs that make a parameterized key unparseable:
/// delimiter-delimiter, parameter-delimiter and parameter-parameter. The
/// scan runs left to right and stops at the first violation; a trailing
/// delimiter or parameter byte has no successor and passes.
fn validate_key(key: &[u8], cfg: ParamConfig) -> Result<(), TreeError> {
  for pair in key.windows(2) {
    if pair[0] == cfg.delimiter && pair[1] == cfg.delimiter {
      return Err(TreeError::InvalidKey);
    }
    if pair[0] == cfg.parameter && (pair[1] == cfg.delimiter || pair[1] == cfg.parameter) {
      return Err(TreeError::InvalidKey);
    }
  }
  Ok(())
}

/// A split at `at` is ambiguous when a placeholder sits at the head of
/// either diverging tail (offset 0 or 1) or immediately before the split
/// point, unless the stored tail is a prefix of the new one. Detection is
/// positional: placeholders deeper inside a label are not inspected.
fn check_split_conflict(
  label: &[u8],
  key: &[u8],
  at: usize,
  cfg: ParamConfig,
) -> Result<(), TreeError> {
  let label_tail = &label[at..];
  let key_tail = &key[at..];

  let l_pos = label_tail.iter().position(|&b| b == cfg.parameter);
  let k_pos = key_tail.iter().position(|&b| b == cfg.parameter);
  let positional = matches!(l_pos, Some(0) | Some(1))
    || matches!(k_pos, Some(0) | Some(1))
    || label[at - 1] == cfg.parameter
    || key[at - 1] == cfg.parameter;

  if positional && !key_tail.starts_with(label_tail) {
    return Err(TreeError::ConflictKey);
  }
  Ok(())
}

// --- EQUALITY ---

// Content equality: trees with different split histories compare equal
// when they hold the same keys and values.
impl<V: PartialEq> PartialEq for RadixTree<V> {
  fn eq(&self, other: &Self) -> bool {
    if self.size() != other.size() {
      return false;
    }
    self.iter().eq(other.iter())
  }
}

impl<V: Eq> Eq for RadixTree<V> {}

// --- DEBUG DUMP ---

impl<V: fmt::Debug> fmt::Display for RadixTree<V> {
  /// Tree-shaped dump, one node per line with depth and subtree weight.
  /// The exact format is not a compatibility contract.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "D, W")?;
    self.fmt_node(f, ROOT, 0)
  }
}

impl<V: fmt::Debug> RadixTree<V> {
  fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, depth: usize) -> fmt::Result {
    let node = self.arena.node(id);
    let weight = if id == ROOT {
      self.arena.weight(id) - 1
    } else {
      self.arena.weight(id)
    };

    write!(f, "{}, {}    ", depth, weight)?;
    for _ in 0..depth {
      write!(f, "    ")?;
    }
    if id == ROOT {
      writeln!(f, "root")?;
    } else {
      let label = String::from_utf8_lossy(&node.label);
      match &node.value {
        Some(v) => writeln!(f, "key: {} -> {:?}", label, v)?,
        None => writeln!(f, "key: {} -> -", label)?,
      }
    }

    for &c in &node.children {
      self.fmt_node(f, c, depth + 1)?;
    }
    Ok(())
  }
}

// --- SERDE ---

#[cfg(feature = "serde")]
mod serde_impl {
  use super::{ParamConfig, RadixTree};
  use serde::de::Error as _;
  use serde::ser::SerializeStruct;
  use serde::{Deserialize, Deserializer, Serialize, Serializer};

  // Arena slots are session-local, so the portable form is the parameter
  // configuration plus the sorted entry list; deserialization re-inserts.
  impl<V: Serialize> Serialize for RadixTree<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
      let entries: Vec<(Vec<u8>, &V)> = self.iter().collect();
      let mut s = serializer.serialize_struct("RadixTree", 2)?;
      s.serialize_field("params", &self.params)?;
      s.serialize_field("entries", &entries)?;
      s.end()
    }
  }

  #[derive(Deserialize)]
  struct TreeData<V> {
    params: Option<ParamConfig>,
    entries: Vec<(Vec<u8>, V)>,
  }

  impl<'de, V: Deserialize<'de>> Deserialize<'de> for RadixTree<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
      let data = TreeData::<V>::deserialize(deserializer)?;
      let mut tree = match data.params {
        Some(cfg) => {
          if cfg.delimiter == 0 || cfg.parameter == 0 || cfg.delimiter == cfg.parameter {
            return Err(D::Error::custom("invalid delimiter/parameter configuration"));
          }
          RadixTree::with_params(cfg.delimiter, cfg.parameter)
        }
        None => RadixTree::new(),
      };
      for (k, v) in data.entries {
        tree.set(k, v).map_err(D::Error::custom)?;
      }
      Ok(tree)
    }
  }
}
