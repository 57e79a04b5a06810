// ============================================================
// Layer 3 — Label Map
// ============================================================
// Bijection between author ids and dense integer labels in
// [0, num_authors). Built once from the filtered author list
// and used both to label training samples and to decode
// predictions back into author ids.
//
// Serialised as a plain JSON array where the position of an
// author is its label:
//   ["alice", "bob", "carol"]

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct LabelMap {
    authors: Vec<String>,
    index:   HashMap<String, usize>,
}

impl LabelMap {
    /// Build from an ordered author list. The first occurrence of an
    /// author fixes its label; later duplicates are ignored.
    pub fn from_authors(authors: &[String]) -> Self {
        let mut map = Self { authors: Vec::new(), index: HashMap::new() };
        for author in authors {
            if !map.index.contains_key(author) {
                map.index.insert(author.clone(), map.authors.len());
                map.authors.push(author.clone());
            }
        }
        map
    }

    pub fn label_of(&self, author: &str) -> Option<usize> {
        self.index.get(author).copied()
    }

    pub fn author_of(&self, label: usize) -> Option<&str> {
        self.authors.get(label).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.authors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authors.is_empty()
    }

    pub fn authors(&self) -> &[String] {
        &self.authors
    }
}

impl From<Vec<String>> for LabelMap {
    fn from(authors: Vec<String>) -> Self {
        Self::from_authors(&authors)
    }
}

impl From<LabelMap> for Vec<String> {
    fn from(map: LabelMap) -> Self {
        map.authors
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn authors(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_labels_are_dense_and_ordered() {
        let map = LabelMap::from_authors(&authors(&["u9", "u3", "u7"]));
        assert_eq!(map.len(), 3);
        assert_eq!(map.label_of("u9"), Some(0));
        assert_eq!(map.label_of("u3"), Some(1));
        assert_eq!(map.label_of("u7"), Some(2));
    }

    #[test]
    fn test_decode_encode_round_trip() {
        let names = authors(&["alice", "bob", "carol", "dave"]);
        let map   = LabelMap::from_authors(&names);
        for name in &names {
            let label = map.label_of(name).unwrap();
            assert_eq!(map.author_of(label), Some(name.as_str()));
        }
        for label in 0..map.len() {
            let author = map.author_of(label).unwrap();
            assert_eq!(map.label_of(author), Some(label));
        }
    }

    #[test]
    fn test_duplicates_keep_first_label() {
        let map = LabelMap::from_authors(&authors(&["a", "b", "a"]));
        assert_eq!(map.len(), 2);
        assert_eq!(map.label_of("a"), Some(0));
    }

    #[test]
    fn test_unknown_lookups() {
        let map = LabelMap::from_authors(&authors(&["a"]));
        assert_eq!(map.label_of("zzz"), None);
        assert_eq!(map.author_of(5), None);
    }

    #[test]
    fn test_json_is_positional_array() {
        let map  = LabelMap::from_authors(&authors(&["x", "ü"]));
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"["x","ü"]"#);

        let back: LabelMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
        assert_eq!(back.label_of("ü"), Some(1));
    }
}
