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

//! Helpers for merging per-tree query results.

use crate::forest::tree::RowIndex;
use fxhash::FxBuildHasher;
use hashbrown::HashMap;

const PAGE_BITS: u32 = 6;
const PAGE_MASK: u32 = (1 << PAGE_BITS) - 1;

/// A sparse bit set over row IDs.
///
/// Row IDs run up to the tens of millions while a query only ever touches a few hundred
/// of them, so the set keeps 64-row pages in a hash map and only materializes pages that
/// hold at least one member.
#[derive(Debug, Default)]
pub struct SparseRowSet {
    pages: HashMap<u32, u64, FxBuildHasher>,
    len: usize,
}

impl SparseRowSet {
    /// An empty set.
    pub fn new() -> SparseRowSet {
        SparseRowSet {
            pages: HashMap::default(),
            len: 0,
        }
    }

    /// Adds a row ID; adding an ID twice is a no-op.
    pub fn insert(&mut self, row: RowIndex) {
        let page = self.pages.entry(row >> PAGE_BITS).or_insert(0);
        let bit = 1u64 << (row & PAGE_MASK);
        if *page & bit == 0 {
            *page |= bit;
            self.len += 1;
        }
    }

    /// Membership test.
    pub fn contains(&self, row: RowIndex) -> bool {
        self.pages
            .get(&(row >> PAGE_BITS))
            .map_or(false, |page| page & (1u64 << (row & PAGE_MASK)) != 0)
    }

    /// Number of distinct members.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no rows have been added.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Unpacks the set into a sorted vector of row IDs.
    pub fn into_sorted_vec(self) -> Vec<RowIndex> {
        let mut pages: Vec<(u32, u64)> = self.pages.into_iter().collect();
        pages.sort_unstable_by_key(|&(page_index, _)| page_index);
        let mut rows = Vec::with_capacity(self.len);
        for (page_index, page) in pages {
            let base = page_index << PAGE_BITS;
            let mut bits = page;
            while bits != 0 {
                rows.push(base + bits.trailing_zeros());
                bits &= bits - 1;
            }
        }
        rows
    }
}
