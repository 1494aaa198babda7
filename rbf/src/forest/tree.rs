/*
* Licensed to Elasticsearch B.V. under one or more contributor
* license agreements. See the NOTICE file distributed with
* this work for additional information regarding copyright
* ownership. Elasticsearch B.V. licenses this file to you under
* the Apache License, Version 2.0 (the "License"); you may
* not use this file except in compliance with the License.
* You may obtain a copy of the License at
*
*  http://www.apache.org/licenses/LICENSE-2.0
*
* Unless required by applicable law or agreed to in writing,
* software distributed under the License is distributed on an
* "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
* KIND, either express or implied.  See the License for the
* specific language governing permissions and limitations
* under the License.
*/

//! # The Packed Tree Data Structure
//! A tree is three flat arrays. `row_index` is a permutation of the training-row IDs;
//! training partitions it in place so that every leaf owns one contiguous slice of it.
//! `tree_first` and `tree_second` store the binary tree with the usual array trick:
//! the root at 0, children of node p at 2p+1 and 2p+2.
//!
//! Each node position holds a pair, and the sign bit of the first entry says which kind:
//! an internal node stores (feature index, split value); a leaf stores its (start, end)
//! range in `row_index`, each XOR'd with [`LEAF_TAG`] so the high bit marks it as a leaf.
//! The alternatives (an enum per node, or a separate discriminator bit-vector) cost
//! either a second pair of large arrays or pointer-chasing on descent; the packed form
//! keeps a lookup at O(depth) array steps and stays bit-compatible with the disk format.
//!
//! Trees are immutable once trained. Descent is a read-only walk, so queries can run
//! from as many threads as you like without any locks.

use crate::forest::query_tools::SparseRowSet;
use crate::errors::{RbfError, RbfResult};

/// To make things more obvious, we type the training-row IDs the leaves hand back.
pub type RowIndex = u32;

/// High bit set, all other bits zero. XOR with a non-negative index flips it into the
/// negative range and back out again.
pub(crate) const LEAF_TAG: i32 = i32::MIN;

/// One randomized, roughly-balanced binary partition tree.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomBinaryTree {
    pub(crate) row_index: Vec<RowIndex>,
    pub(crate) tree_first: Vec<i32>,
    pub(crate) tree_second: Vec<i32>,
    // Advisory counters; persisted but never consulted for a correctness decision.
    pub(crate) num_internal_nodes: i32,
    pub(crate) num_leaves: i32,
}

impl RandomBinaryTree {
    /// Descends from the root to the leaf this point lands in and returns the training
    /// rows that live there.
    ///
    /// Panics if the query is narrower than a feature index some internal node splits
    /// on; [`crate::RandomBinaryForest`] checks the width before calling in here.
    pub fn find_point(&self, query: &[u8]) -> &[RowIndex] {
        let mut pos = 0;
        let mut first = self.tree_first[pos];
        // the sign bit says whether this is an internal node or a leaf
        while first >= 0 {
            pos = if query[first as usize] as i32 <= self.tree_second[pos] {
                2 * pos + 1
            } else {
                2 * pos + 2
            };
            first = self.tree_first[pos];
        }
        let start = (LEAF_TAG ^ first) as usize;
        let end = (LEAF_TAG ^ self.tree_second[pos]) as usize;
        &self.row_index[start..end]
    }

    /// Number of training rows this tree was built over.
    pub fn num_rows(&self) -> usize {
        self.row_index.len()
    }

    /// Capacity of the node arrays (2^depth).
    pub fn node_slots(&self) -> usize {
        self.tree_first.len()
    }

    /// Advisory internal-node count recorded at training time.
    pub fn num_internal_nodes(&self) -> i32 {
        self.num_internal_nodes
    }

    /// Advisory leaf count recorded at training time.
    pub fn num_leaves(&self) -> i32 {
        self.num_leaves
    }

    /// Walks every node reachable from the root, checking the structural invariants a
    /// descent relies on, and returns the widest feature index any internal node splits
    /// on (`None` when the root is already a leaf).
    ///
    /// Freshly-trained trees satisfy this by construction; tree blocks read back off
    /// disk get it checked before anything descends them.
    pub(crate) fn validate(&self) -> RbfResult<Option<usize>> {
        let slots = self.tree_first.len();
        if slots == 0 {
            return Err(RbfError::MalformedTree("empty node arrays".to_string()));
        }
        let num_rows = self.row_index.len();
        let mut max_feature: Option<usize> = None;
        let mut pending = vec![0usize];
        while let Some(pos) = pending.pop() {
            let first = self.tree_first[pos];
            let second = self.tree_second[pos];
            if first < 0 {
                if second >= 0 {
                    return Err(RbfError::MalformedTree(format!(
                        "node {} mixes a leaf tag with an internal entry",
                        pos
                    )));
                }
                let start = (LEAF_TAG ^ first) as usize;
                let end = (LEAF_TAG ^ second) as usize;
                if start > end || end > num_rows {
                    return Err(RbfError::MalformedTree(format!(
                        "leaf {} covers [{}, {}) outside the {} training rows",
                        pos, start, end, num_rows
                    )));
                }
            } else {
                if !(0..=255).contains(&second) {
                    return Err(RbfError::MalformedTree(format!(
                        "internal node {} holds split value {} outside [0, 255]",
                        pos, second
                    )));
                }
                if 2 * pos + 2 >= slots {
                    return Err(RbfError::MalformedTree(format!(
                        "descent through node {} would step past the {} node slots",
                        pos, slots
                    )));
                }
                let feature = first as usize;
                max_feature = Some(max_feature.map_or(feature, |m| m.max(feature)));
                pending.push(2 * pos + 1);
                pending.push(2 * pos + 2);
            }
        }
        Ok(max_feature)
    }
}

// How strictly a forest can check query widths: a forest trained in-process knows its
// exact feature count, one loaded from disk only knows the widest feature its splits
// dereference (the tree block doesn't persist F).
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum QueryWidth {
    Exact(usize),
    AtLeast(usize),
}

impl QueryWidth {
    fn check(&self, found: usize) -> RbfResult<()> {
        let ok = match *self {
            QueryWidth::Exact(expected) => found == expected,
            QueryWidth::AtLeast(expected) => found >= expected,
        };
        if ok {
            Ok(())
        } else {
            let expected = match *self {
                QueryWidth::Exact(e) | QueryWidth::AtLeast(e) => e,
            };
            Err(RbfError::DimensionMismatch { expected, found })
        }
    }
}

/// Per-tree query results: one slice of training rows per tree, in tree order.
#[derive(Debug)]
pub struct PerTreeMatches<'a> {
    /// The leaf slice each tree put the query point in.
    pub matches: Vec<&'a [RowIndex]>,
    /// Total row count across all slices, duplicates included.
    pub total: usize,
}

/// An ordered ensemble of [`RandomBinaryTree`]s trained from one feature matrix.
///
/// Trees are fully independent; a query descends each one and the caller (or
/// [`RandomBinaryForest::find_point_dedup`]) merges the leaves. The forest never ranks
/// results by distance, that stays the caller's business.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomBinaryForest {
    pub(crate) trees: Vec<RandomBinaryTree>,
    pub(crate) width: QueryWidth,
}

impl RandomBinaryForest {
    // Assembles a forest from tree blocks read off disk. Every tree gets its structural
    // checks here, and the forest's checkable query width is the widest feature any
    // split dereferences (the disk format doesn't carry the training width).
    pub(crate) fn from_loaded_trees(trees: Vec<RandomBinaryTree>) -> RbfResult<RandomBinaryForest> {
        let mut min_width = 0;
        for tree in &trees {
            if let Some(max_feature) = tree.validate()? {
                min_width = min_width.max(max_feature + 1);
            }
        }
        Ok(RandomBinaryForest {
            trees,
            width: QueryWidth::AtLeast(min_width),
        })
    }

    /// The trees, in training order.
    pub fn trees(&self) -> &[RandomBinaryTree] {
        &self.trees
    }

    /// Number of trees in the ensemble.
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Descends every tree and returns the per-tree leaf slices in tree order, plus the
    /// total (non-deduplicated) match count.
    pub fn find_point(&self, query: &[u8]) -> RbfResult<PerTreeMatches<'_>> {
        self.width.check(query.len())?;
        let mut matches = Vec::with_capacity(self.trees.len());
        let mut total = 0;
        for tree in &self.trees {
            let rows = tree.find_point(query);
            total += rows.len();
            matches.push(rows);
        }
        Ok(PerTreeMatches { matches, total })
    }

    /// Descends every tree and returns the union of the leaf slices, sorted ascending.
    ///
    /// The union is taken in a sparse bit set keyed by row ID; with millions of training
    /// rows and a few hundred candidates per query, a dense bit vector would be almost
    /// entirely zeros.
    pub fn find_point_dedup(&self, query: &[u8]) -> RbfResult<Vec<RowIndex>> {
        self.width.check(query.len())?;
        let mut rows = SparseRowSet::new();
        for tree in &self.trees {
            for &row in tree.find_point(query) {
                rows.insert(row);
            }
        }
        Ok(rows.into_sorted_vec())
    }
}

// A tree that looks like it was trained on the strings "aaa" and "abc", with the
// "aa" bigram at feature 0:
//   root: split on feature 0 at value 1
//   left child: leaf [1, 2) -> row 1 ("abc")
//   right child: leaf [0, 1) -> row 0 ("aaa")
#[cfg(test)]
pub(crate) fn test_tree() -> RandomBinaryTree {
    RandomBinaryTree {
        row_index: vec![0, 1],
        tree_first: vec![0, LEAF_TAG ^ 1, LEAF_TAG ^ 0],
        tree_second: vec![1, LEAF_TAG ^ 2, LEAF_TAG ^ 1],
        num_internal_nodes: 1,
        num_leaves: 2,
    }
}

#[cfg(test)]
pub(crate) fn test_forest() -> RandomBinaryForest {
    RandomBinaryForest {
        trees: vec![test_tree(), test_tree()],
        width: QueryWidth::Exact(6),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descent_follows_the_split() {
        let tree = test_tree();
        // "aa" count of 6 is above the split value, so we go right to row 0
        assert_eq!(tree.find_point(&[6, 0, 0, 0, 0, 0]), &[0]);
        // and a low count goes left to row 1
        assert_eq!(tree.find_point(&[0, 0, 0, 0, 0, 0]), &[1]);
        assert_eq!(tree.find_point(&[1, 0, 0, 0, 0, 0]), &[1]);
    }

    #[test]
    fn find_point_returns_per_tree_slices_in_order() {
        let forest = test_forest();
        let results = forest.find_point(&[6, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(results.matches.len(), 2);
        assert_eq!(results.total, 2);
        for rows in &results.matches {
            assert_eq!(*rows, &[0]);
        }
    }

    #[test]
    fn dedup_merges_across_trees() {
        let forest = test_forest();
        let rows = forest.find_point_dedup(&[6, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(rows, vec![0]);
    }

    #[test]
    fn width_check_rejects_narrow_queries() {
        let forest = test_forest();
        match forest.find_point(&[6, 0, 0]) {
            Err(RbfError::DimensionMismatch { expected, found }) => {
                assert_eq!(expected, 6);
                assert_eq!(found, 3);
            }
            other => panic!("expected DimensionMismatch, got {:?}", other),
        }
    }

    #[test]
    fn validation_accepts_the_test_tree() {
        let tree = test_tree();
        assert_eq!(tree.validate().unwrap(), Some(0));
    }

    #[test]
    fn validation_catches_a_leaf_past_the_rows() {
        let mut tree = test_tree();
        tree.tree_second[1] = LEAF_TAG ^ 40;
        assert!(matches!(
            tree.validate(),
            Err(RbfError::MalformedTree(_))
        ));
    }

    #[test]
    fn validation_catches_a_descent_past_the_slots() {
        // an internal root with no room for children
        let tree = RandomBinaryTree {
            row_index: vec![0],
            tree_first: vec![3],
            tree_second: vec![9],
            num_internal_nodes: 1,
            num_leaves: 0,
        };
        assert!(matches!(
            tree.validate(),
            Err(RbfError::MalformedTree(_))
        ));
    }
}
