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

//! Interfaces that simplify bulk queries

use crate::forest::{RandomBinaryForest, RowIndex};
use crate::RbfResult;
use rayon::prelude::*;

/// Interface for bulk queries. Descent is read-only, so the queries fan out over rayon
/// with nothing shared but the forest itself.
pub struct BulkInterface<'a> {
    forest: &'a RandomBinaryForest,
}

impl<'a> BulkInterface<'a> {
    /// Creates a new one.
    pub fn new(forest: &'a RandomBinaryForest) -> Self {
        BulkInterface { forest }
    }

    /// Applies the passed in fn to each query point and collects the results in query
    /// order. Core function for this struct.
    pub fn point_map<F, T>(&self, points: &[Vec<u8>], f: F) -> Vec<T>
    where
        F: Fn(&RandomBinaryForest, &[u8]) -> T + Send + Sync,
        T: Send,
    {
        points
            .par_iter()
            .map(|point| f(self.forest, point))
            .collect()
    }

    /// Bulk deduplicated lookup.
    pub fn find_points_dedup(&self, points: &[Vec<u8>]) -> Vec<RbfResult<Vec<RowIndex>>> {
        self.point_map(points, |forest, point| forest.find_point_dedup(point))
    }

    /// Bulk per-tree match counts, duplicates included.
    pub fn match_counts(&self, points: &[Vec<u8>]) -> Vec<RbfResult<usize>> {
        self.point_map(points, |forest, point| {
            forest.find_point(point).map(|results| results.total)
        })
    }
}
