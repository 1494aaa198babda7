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

#![allow(dead_code)]
#![warn(missing_docs)]

//! # Rbf
//! A random binary forest: an ensemble of randomized, roughly-balanced binary partition
//! trees used as an approximate nearest-neighbor index over byte-vector points. It's a
//! hybrid between kd-trees and random forests: each split samples a random subset of
//! features, keeps the one that divides the current rows closest to their median, and
//! recurses. For nearest-neighbor work over high-cardinality string features this
//! performs roughly as much better than a kd-tree as a random forest does over a single
//! decision tree.
//!
//! A query descends every tree to one leaf and gets back the training rows in those
//! leaves as candidates. The forest never computes distances; ranking the candidates is
//! the caller's business.
//!
//! ## Parameter Guide
//! The structure is controlled by 4 parameters. `num_trees` trades query cost for
//! recall; every tree is another leaf of candidates per query. `depth` caps the packed
//! node arrays at 2^depth slots per tree, and any branch reaching the bottom is cut into
//! a leaf, so set it against your training-set size and memory budget. `leaf_size` is
//! the cutoff below which a view becomes a leaf; smaller leaves mean fewer, closer
//! candidates per tree. `features_per_split` is how many randomly sampled features each
//! split compares; more gives more balanced trees for more histogram passes at build
//! time.
//!
//! Training fans out one rayon task per tree over a shared read-only feature matrix.
//! Pass a seed to the builder if you need the same forest twice; every tree owns a
//! `SmallRng` seeded from it.

pub mod errors;
pub use errors::RbfResult;

mod forest;
pub use forest::*;

pub mod query_interface;

mod storage;
pub use storage::read_forest;

pub mod utils;

/// The feature matrix type the forest trains over, re-exported from the featurization
/// layer.
pub use featurize::FeatureMatrix;
