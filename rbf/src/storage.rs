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

//! The forest's on-disk format.
//!
//! Everything is little-endian int32, the node arrays bit-for-bit as they sit in memory:
//!
//! ```text
//! int32  num_trees
//! per tree:
//!   int32  row_index_len            (= N)
//!   int32  node_array_len           (= 2^depth)
//!   int32[row_index_len]   row_index
//!   int32[node_array_len]  first
//!   int32[node_array_len]  second
//!   int32  num_internal_nodes      (advisory)
//!   int32  num_leaves              (advisory)
//! ```
//!
//! The full product's files carry a feature-config block and the training strings around
//! this; those segments belong to the featurization layer and the caller composes them.
//!
//! Reading runs every structural check descent relies on, so a forest that loads
//! successfully never faults in `find_point`.

use crate::errors::{RbfError, RbfResult};
use crate::forest::{RandomBinaryForest, RandomBinaryTree, RowIndex};
use std::io::{Read, Write};

fn write_i32<W: Write>(writer: &mut W, value: i32) -> std::io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

fn read_i32<R: Read>(reader: &mut R) -> std::io::Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

impl RandomBinaryTree {
    fn write_to<W: Write>(&self, writer: &mut W) -> RbfResult<()> {
        write_i32(writer, self.row_index.len() as i32)?;
        write_i32(writer, self.tree_first.len() as i32)?;
        for &row in &self.row_index {
            write_i32(writer, row as i32)?;
        }
        for &first in &self.tree_first {
            write_i32(writer, first)?;
        }
        for &second in &self.tree_second {
            write_i32(writer, second)?;
        }
        write_i32(writer, self.num_internal_nodes)?;
        write_i32(writer, self.num_leaves)?;
        Ok(())
    }

    fn read_from<R: Read>(reader: &mut R) -> RbfResult<RandomBinaryTree> {
        let row_index_len = read_i32(reader)?;
        let node_array_len = read_i32(reader)?;
        if row_index_len < 0 {
            return Err(RbfError::MalformedTree(format!(
                "negative row index length {}",
                row_index_len
            )));
        }
        if node_array_len <= 0 {
            return Err(RbfError::MalformedTree(format!(
                "non-positive node array length {}",
                node_array_len
            )));
        }

        let mut row_index = Vec::with_capacity(row_index_len as usize);
        for _ in 0..row_index_len {
            let row = read_i32(reader)?;
            if row < 0 {
                return Err(RbfError::MalformedTree(format!("negative row ID {}", row)));
            }
            row_index.push(row as RowIndex);
        }
        let mut tree_first = Vec::with_capacity(node_array_len as usize);
        for _ in 0..node_array_len {
            tree_first.push(read_i32(reader)?);
        }
        let mut tree_second = Vec::with_capacity(node_array_len as usize);
        for _ in 0..node_array_len {
            tree_second.push(read_i32(reader)?);
        }
        let num_internal_nodes = read_i32(reader)?;
        let num_leaves = read_i32(reader)?;

        Ok(RandomBinaryTree {
            row_index,
            tree_first,
            tree_second,
            num_internal_nodes,
            num_leaves,
        })
    }
}

impl RandomBinaryForest {
    /// Writes the forest in the flat little-endian block format.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> RbfResult<()> {
        write_i32(writer, self.trees.len() as i32)?;
        for tree in &self.trees {
            tree.write_to(writer)?;
        }
        Ok(())
    }
}

/// Reads a forest back out of the flat little-endian block format, checking each tree's
/// structure before it can be descended.
pub fn read_forest<R: Read>(reader: &mut R) -> RbfResult<RandomBinaryForest> {
    let num_trees = read_i32(reader)?;
    if num_trees < 0 {
        return Err(RbfError::MalformedTree(format!(
            "negative tree count {}",
            num_trees
        )));
    }
    let mut trees = Vec::with_capacity(num_trees as usize);
    for _ in 0..num_trees {
        trees.push(RandomBinaryTree::read_from(reader)?);
    }
    RandomBinaryForest::from_loaded_trees(trees)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::{test_forest, test_tree, QueryWidth, LEAF_TAG};
    use std::io::Cursor;

    #[test]
    fn forest_round_trips_bytewise() {
        let forest = test_forest();
        let mut buf = Vec::new();
        forest.write_to(&mut buf).unwrap();
        // 1 forest header + 2 * (2 lengths + 2 rows + 2 * 3 nodes + 2 counters)
        assert_eq!(buf.len(), 4 * (1 + 2 * (2 + 2 + 6 + 2)));

        let read_back = read_forest(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(read_back.trees(), forest.trees());

        // loaded forests still answer queries, with a lower-bound width check
        assert_eq!(
            read_back.find_point_dedup(&[6, 0, 0, 0, 0, 0]).unwrap(),
            vec![0]
        );
        assert_eq!(read_back.find_point_dedup(&[6]).unwrap(), vec![0]);
        assert!(read_back.find_point_dedup(&[]).is_err());
    }

    #[test]
    fn empty_forest_round_trips() {
        let mut buf = Vec::new();
        write_i32(&mut buf, 0).unwrap();
        let forest = read_forest(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(forest.num_trees(), 0);
    }

    #[test]
    fn negative_lengths_are_rejected() {
        let mut buf = Vec::new();
        write_i32(&mut buf, -1).unwrap();
        assert!(matches!(
            read_forest(&mut Cursor::new(&buf)),
            Err(RbfError::MalformedTree(_))
        ));

        let mut buf = Vec::new();
        write_i32(&mut buf, 1).unwrap();
        write_i32(&mut buf, -4).unwrap(); // row_index_len
        write_i32(&mut buf, 4).unwrap();
        assert!(matches!(
            read_forest(&mut Cursor::new(&buf)),
            Err(RbfError::MalformedTree(_))
        ));
    }

    #[test]
    fn truncated_stream_is_an_io_error() {
        let forest = test_forest();
        let mut buf = Vec::new();
        forest.write_to(&mut buf).unwrap();
        buf.truncate(buf.len() - 3);
        assert!(matches!(
            read_forest(&mut Cursor::new(&buf)),
            Err(RbfError::IoError(_))
        ));
    }

    #[test]
    fn structurally_broken_tree_is_rejected_at_read() {
        let mut tree = test_tree();
        // leaf range runs past the training rows
        tree.tree_second[1] = LEAF_TAG ^ 7;
        let forest = RandomBinaryForest {
            trees: vec![tree],
            width: QueryWidth::Exact(6),
        };
        let mut buf = Vec::new();
        forest.write_to(&mut buf).unwrap();
        assert!(matches!(
            read_forest(&mut Cursor::new(&buf)),
            Err(RbfError::MalformedTree(_))
        ));
    }
}
