//! Compressed radix trie over token bytes
//!
//! Edges carry multi-byte labels; a node with postings is a term. Fuzzy
//! lookup walks the tree with a Levenshtein DP row per consumed byte,
//! pruning any branch whose minimum row cost exceeds the budget. In prefix
//! mode, once the query aligns with the walked prefix within budget, the
//! whole subtree matches.

use std::collections::BTreeMap;

use super::postings::TermPostings;

#[derive(Debug, Default)]
struct TrieNode {
    /// Edge label from the parent; empty only for the root
    label: Vec<u8>,
    children: BTreeMap<u8, TrieNode>,
    postings: Option<TermPostings>,
    /// Highest ranking points of any document under this term
    max_points: i64,
}

/// One candidate term produced by a fuzzy lookup
#[derive(Debug)]
pub struct FuzzyMatch<'a> {
    pub term: Vec<u8>,
    pub cost: usize,
    pub postings: &'a TermPostings,
    pub max_points: i64,
}

/// Token trie for one searchable field
#[derive(Debug, Default)]
pub struct Trie {
    root: TrieNode,
    terms: usize,
}

impl Trie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct terms
    pub fn len(&self) -> usize {
        self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms == 0
    }

    /// Record a document's positions under `term`
    pub fn insert(&mut self, term: &[u8], seq_id: u32, positions: &[u16], points: i64) {
        debug_assert!(!term.is_empty());
        let node = Self::upsert_node(&mut self.root, term);
        if node.postings.is_none() {
            self.terms += 1;
        }
        node.postings
            .get_or_insert_with(TermPostings::new)
            .append(seq_id, positions);
        node.max_points = node.max_points.max(points);
    }

    /// Exact lookup
    pub fn get(&self, term: &[u8]) -> Option<&TermPostings> {
        let mut node = &self.root;
        let mut rest = term;
        loop {
            if rest.is_empty() {
                return node.postings.as_ref();
            }
            let child = node.children.get(&rest[0])?;
            if !rest.starts_with(&child.label) {
                return None;
            }
            rest = &rest[child.label.len()..];
            node = child;
        }
    }

    /// Drop `seq_id` from `term`'s postings, pruning the leaf when empty
    pub fn remove_doc(&mut self, term: &[u8], seq_id: u32) {
        Self::remove_rec(&mut self.root, term, seq_id, &mut self.terms);
    }

    /// Candidate terms within edit distance `max_cost` of `token`
    ///
    /// With `prefix`, terms extending a within-budget alignment of the whole
    /// token also match (the trailing query token under prefix search).
    pub fn fuzzy_search(&self, token: &[u8], max_cost: usize, prefix: bool) -> Vec<FuzzyMatch<'_>> {
        let mut matches = Vec::new();
        let initial_row: Vec<usize> = (0..=token.len()).collect();
        let mut key = Vec::new();
        Self::fuzzy_rec(
            &self.root,
            token,
            max_cost,
            prefix,
            &mut key,
            &initial_row,
            &mut matches,
        );
        matches
    }

    fn upsert_node<'a>(node: &'a mut TrieNode, term: &[u8]) -> &'a mut TrieNode {
        if term.is_empty() {
            return node;
        }
        let first = term[0];

        if !node.children.contains_key(&first) {
            let child = TrieNode {
                label: term.to_vec(),
                ..Default::default()
            };
            node.children.insert(first, child);
            return node.children.get_mut(&first).unwrap();
        }

        let (common, label_len) = {
            let child = &node.children[&first];
            (common_prefix_len(&child.label, term), child.label.len())
        };

        if common == label_len {
            let child = node.children.get_mut(&first).unwrap();
            return Self::upsert_node(child, &term[common..]);
        }

        // the edge label diverges from the term: split it
        let mut old = node.children.remove(&first).unwrap();
        let mut split = TrieNode {
            label: old.label[..common].to_vec(),
            ..Default::default()
        };
        old.label.drain(..common);
        split.children.insert(old.label[0], old);
        node.children.insert(first, split);

        let split = node.children.get_mut(&first).unwrap();
        Self::upsert_node(split, &term[common..])
    }

    /// Returns whether the caller should delete this node
    fn remove_rec(node: &mut TrieNode, rest: &[u8], seq_id: u32, terms: &mut usize) -> bool {
        if rest.is_empty() {
            if let Some(postings) = node.postings.as_mut() {
                postings.remove(seq_id);
                if postings.is_empty() {
                    node.postings = None;
                    *terms -= 1;
                }
            }
        } else {
            let consumed = match node.children.get(&rest[0]) {
                Some(child) if rest.starts_with(&child.label) => Some(child.label.len()),
                _ => None,
            };
            if let Some(consumed) = consumed {
                let prune_child = {
                    let child = node.children.get_mut(&rest[0]).unwrap();
                    Self::remove_rec(child, &rest[consumed..], seq_id, terms)
                };
                if prune_child {
                    node.children.remove(&rest[0]);
                }
            }
        }

        // merge a postings-free chain link back into a single edge
        if node.postings.is_none() && node.children.len() == 1 && !node.label.is_empty() {
            if let Some((_, mut child)) = node.children.pop_first() {
                node.label.extend_from_slice(&child.label);
                node.postings = child.postings.take();
                node.max_points = child.max_points;
                node.children = std::mem::take(&mut child.children);
            }
        }

        node.postings.is_none() && node.children.is_empty()
    }

    fn fuzzy_rec<'a>(
        node: &'a TrieNode,
        token: &[u8],
        max_cost: usize,
        prefix: bool,
        key: &mut Vec<u8>,
        row: &[usize],
        matches: &mut Vec<FuzzyMatch<'a>>,
    ) {
        let depth = key.len();
        let mut row = row.to_vec();

        for (i, &byte) in node.label.iter().enumerate() {
            row = next_row(&row, token, byte);
            key.push(byte);

            if prefix && row[token.len()] <= max_cost {
                // the token aligns with the walked prefix; everything below matches
                key.extend_from_slice(&node.label[i + 1..]);
                Self::collect_subtree(node, key, row[token.len()], matches);
                key.truncate(depth);
                return;
            }

            if row.iter().min().copied().unwrap_or(0) > max_cost {
                key.truncate(depth);
                return;
            }
        }

        if let Some(postings) = node.postings.as_ref() {
            let cost = row[token.len()];
            if cost <= max_cost {
                matches.push(FuzzyMatch {
                    term: key.clone(),
                    cost,
                    postings,
                    max_points: node.max_points,
                });
            }
        }

        for child in node.children.values() {
            Self::fuzzy_rec(child, token, max_cost, prefix, key, &row, matches);
        }
        key.truncate(depth);
    }

    /// Collect every term at or below `node`; `key` holds node's full term
    fn collect_subtree<'a>(
        node: &'a TrieNode,
        key: &mut Vec<u8>,
        cost: usize,
        matches: &mut Vec<FuzzyMatch<'a>>,
    ) {
        if let Some(postings) = node.postings.as_ref() {
            matches.push(FuzzyMatch {
                term: key.clone(),
                cost,
                postings,
                max_points: node.max_points,
            });
        }
        for child in node.children.values() {
            key.extend_from_slice(&child.label);
            Self::collect_subtree(child, key, cost, matches);
            key.truncate(key.len() - child.label.len());
        }
    }
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// One step of the Levenshtein DP: extend the row by candidate byte `byte`
fn next_row(prev: &[usize], token: &[u8], byte: u8) -> Vec<usize> {
    let mut row = Vec::with_capacity(prev.len());
    row.push(prev[0] + 1);
    for i in 1..prev.len() {
        let substitution = if token[i - 1] == byte { 0 } else { 1 };
        let cost = (prev[i - 1] + substitution)
            .min(prev[i] + 1)
            .min(row[i - 1] + 1);
        row.push(cost);
    }
    row
}
