use std::collections::{HashMap, HashSet};

use crate::index::LocalId;

#[derive(Debug, Default)]
struct TrieNode {
    children: HashMap<char, TrieNode>,
    doc_ids: HashSet<LocalId>,
    is_end: bool,
}

/// Prefix tree over index tokens. Every node along a token's path records
/// the ids of all documents containing a token with that prefix, so a
/// prefix lookup is a single walk with no scan of the token table.
#[derive(Debug, Default)]
pub struct Trie {
    root: TrieNode,
}

impl Trie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one token for one document. Inserting the same pair again is
    /// a no-op.
    pub fn insert(&mut self, token: &str, doc_id: LocalId) {
        let mut node = &mut self.root;
        for ch in token.chars() {
            node = node.children.entry(ch).or_default();
            node.doc_ids.insert(doc_id);
        }
        node.is_end = true;
    }

    /// Ids of all documents containing a token that starts with `prefix`.
    /// Unknown prefixes yield the empty set. The empty prefix also yields
    /// the empty set, because no ids are recorded on the root.
    pub fn search_prefix(&self, prefix: &str) -> HashSet<LocalId> {
        let mut node = &self.root;
        for ch in prefix.chars() {
            match node.children.get(&ch) {
                Some(child) => node = child,
                None => return HashSet::new(),
            }
        }
        node.doc_ids.clone()
    }

    /// Whether `token` was inserted as a complete token, not merely as a
    /// prefix of one.
    pub fn contains(&self, token: &str) -> bool {
        let mut node = &self.root;
        for ch in token.chars() {
            match node.children.get(&ch) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.is_end
    }
}
