use radixtree::{MatchMap, RadixTree, TreeError};

fn pairs() -> Vec<(&'static str, i32)> {
  vec![
    ("roma", 0),
    ("romane", 1),
    ("romanus", 2),
    ("romulus", 3),
    ("rubens", 4),
    ("rube", 5),
    ("rubber", 51),
    ("rubberized", 511),
    ("rubberize", 512),
    ("rubicon", 6),
    ("rubicundus", 7),
    ("smaller", 81),
    ("smallerish", 811),
    ("smallish", 82),
    ("smart", 83),
    ("smarter", 84),
    ("smarting", 85),
  ]
}

// ============================================================================
// 1. Longest match
// ============================================================================

#[test]
fn test_longest_match() {
  let tree = RadixTree::from_map(pairs()).unwrap();

  let (path, value) = tree.longest_match("smarties").unwrap();
  assert_eq!(path, b"smart");
  assert_eq!(value, &83);

  // an exact hit is its own longest match
  let (path, value) = tree.longest_match("rubberized").unwrap();
  assert_eq!(path, b"rubberized");
  assert_eq!(value, &511);

  assert_eq!(tree.longest_match("smallest"), Err(TreeError::KeyNotFound));
  assert_eq!(tree.longest_match("q"), Err(TreeError::KeyNotFound));
  assert_eq!(tree.longest_match(""), Err(TreeError::EmptyKey));
}

#[test]
fn test_longest_match_past_last_sibling() {
  // the query byte sorts after every child of the matched node; the
  // matched node itself must still win
  let tree = RadixTree::from_map(pairs()).unwrap();

  let (path, value) = tree.longest_match("smartz").unwrap();
  assert_eq!(path, b"smart");
  assert_eq!(value, &83);

  let (path, value) = tree.longest_match("rubez").unwrap();
  assert_eq!(path, b"rube");
  assert_eq!(value, &5);
}

#[test]
fn test_longest_match_search_key_exhaustion() {
  let mut tree = RadixTree::from_map(pairs()).unwrap();
  tree.set("small", 67).unwrap();

  assert_eq!(tree.get("smalle"), Err(TreeError::KeyNotFound));

  let (path, value) = tree.longest_match("smalle").unwrap();
  assert_eq!(path, b"small");
  assert_eq!(value, &67);
}

#[test]
fn test_longest_match_prefers_deepest_ancestor() {
  let mut tree = RadixTree::new();
  tree.set("a", 1).unwrap();
  tree.set("abcd", 2).unwrap();

  // diverges inside "bcd": nearest valued ancestor is "a"
  let (path, value) = tree.longest_match("abzz").unwrap();
  assert_eq!(path, b"a");
  assert_eq!(value, &1);

  let (path, value) = tree.longest_match("abcdzz").unwrap();
  assert_eq!(path, b"abcd");
  assert_eq!(value, &2);
}

// ============================================================================
// 2. Neighbor match
// ============================================================================

#[test]
fn test_neighbor_match() {
  let mut tree = RadixTree::from_map(pairs()).unwrap();
  tree.set("small", 67).unwrap();
  tree.set("sma", 677).unwrap();

  let mut neighbors = MatchMap::default();
  tree.neighbor_match("smalle", &mut neighbors).unwrap();

  let expected: Vec<(&[u8], i32)> = vec![
    (b"sma", 677),
    (b"small", 67),
    (b"smaller", 81),
    (b"smallish", 82),
    (b"smart", 83),
  ];
  assert_eq!(neighbors.len(), expected.len());
  for (k, v) in expected {
    assert_eq!(neighbors.get(k), Some(&&v), "missing neighbor {:?}", k);
  }
}

#[test]
fn test_neighbor_match_without_valued_parent() {
  let mut tree = RadixTree::from_map(pairs()).unwrap();
  tree.set("small", 67).unwrap();

  let mut neighbors = MatchMap::default();
  tree.neighbor_match("smalle", &mut neighbors).unwrap();

  // match, two valued children and one valued sibling; "sma" stays out
  assert_eq!(neighbors.len(), 4);
  assert_eq!(neighbors.get(b"small".as_slice()), Some(&&67));
  assert_eq!(neighbors.get(b"smart".as_slice()), Some(&&83));
  assert!(!neighbors.contains_key(b"sma".as_slice()));
}

#[test]
fn test_neighbor_match_under_root() {
  let tree = RadixTree::from_map(vec![("alpha", 1), ("beta", 2)]).unwrap();

  let mut neighbors = MatchMap::default();
  tree.neighbor_match("alphax", &mut neighbors).unwrap();

  assert_eq!(neighbors.len(), 2);
  assert_eq!(neighbors.get(b"alpha".as_slice()), Some(&&1));
  assert_eq!(neighbors.get(b"beta".as_slice()), Some(&&2));
}

#[test]
fn test_neighbor_match_deep_parent_key() {
  // the parent entry must carry the parent's full path, not a slice the
  // length of its own label
  let tree = RadixTree::from_map(vec![("ru", 9), ("rub", 1), ("rubber", 2)]).unwrap();

  let mut neighbors = MatchMap::default();
  tree.neighbor_match("rubberz", &mut neighbors).unwrap();

  assert_eq!(neighbors.len(), 2);
  assert_eq!(neighbors.get(b"rubber".as_slice()), Some(&&2));
  assert_eq!(neighbors.get(b"rub".as_slice()), Some(&&1));
}

#[test]
fn test_neighbor_match_missing() {
  let tree = RadixTree::from_map(pairs()).unwrap();
  let mut neighbors = MatchMap::default();
  assert_eq!(
    tree.neighbor_match("zzz", &mut neighbors),
    Err(TreeError::KeyNotFound)
  );
  assert_eq!(
    tree.neighbor_match("", &mut neighbors),
    Err(TreeError::EmptyKey)
  );
  assert!(neighbors.is_empty());
}
