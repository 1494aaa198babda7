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

//! The flat feature matrix the forest trains on.

use crate::errors::{FeaturizeError, FeaturizeResult};

/// A row-major `N x F` matrix of byte features backed by one flat allocation.
///
/// One row per training string, one column per feature. The forest only ever reads this,
/// so a single allocation keeps row lookups a multiply away and lets training threads
/// share it behind an `Arc` without any locking.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    data: Vec<u8>,
    dim: usize,
}

impl FeatureMatrix {
    /// Wraps a flat buffer as a matrix with rows of width `dim`.
    pub fn new(data: Vec<u8>, dim: usize) -> FeaturizeResult<FeatureMatrix> {
        if dim == 0 || data.len() % dim != 0 {
            return Err(FeaturizeError::ShapeError {
                len: data.len(),
                dim,
            });
        }
        Ok(FeatureMatrix { data, dim })
    }

    /// Copies a list of equal-length rows into one flat matrix.
    pub fn from_rows(rows: &[Vec<u8>]) -> FeaturizeResult<FeatureMatrix> {
        let dim = match rows.first() {
            Some(row) => row.len(),
            None => {
                return Err(FeaturizeError::ShapeError { len: 0, dim: 0 });
            }
        };
        let mut data = Vec::with_capacity(rows.len() * dim);
        for row in rows {
            if row.len() != dim {
                return Err(FeaturizeError::ShapeError {
                    len: row.len(),
                    dim,
                });
            }
            data.extend_from_slice(row);
        }
        FeatureMatrix::new(data, dim)
    }

    /// Number of rows (training points).
    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    /// True when the matrix holds no rows.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Width of each row (the feature count F).
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// One row as a slice.
    #[inline]
    pub fn row(&self, i: usize) -> &[u8] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    /// A single cell.
    #[inline]
    pub fn value(&self, row: usize, feature: usize) -> u8 {
        self.data[row * self.dim + feature]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_round_trips() {
        let rows = vec![vec![1u8, 2, 3], vec![4, 5, 6]];
        let matrix = FeatureMatrix::from_rows(&rows).unwrap();
        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix.dim(), 3);
        assert_eq!(matrix.row(0), &[1, 2, 3]);
        assert_eq!(matrix.row(1), &[4, 5, 6]);
        assert_eq!(matrix.value(1, 2), 6);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let rows = vec![vec![1u8, 2], vec![3]];
        assert!(FeatureMatrix::from_rows(&rows).is_err());
    }

    #[test]
    fn bad_flat_shape_is_rejected() {
        assert!(FeatureMatrix::new(vec![0u8; 7], 3).is_err());
        assert!(FeatureMatrix::new(vec![], 0).is_err());
    }

    #[test]
    fn empty_matrix_with_positive_dim_is_fine() {
        let matrix = FeatureMatrix::new(vec![], 42).unwrap();
        assert_eq!(matrix.len(), 0);
        assert!(matrix.is_empty());
        assert_eq!(matrix.dim(), 42);
    }
}
