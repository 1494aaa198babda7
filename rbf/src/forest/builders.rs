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

use crate::errors::{RbfError, RbfResult};
use crate::forest::splits::{
    best_median_split, best_moment_split, feature_frequencies, partition, scan_for_split,
    SplitScan,
};
use crate::forest::tree::{QueryWidth, RandomBinaryForest, RandomBinaryTree, RowIndex, LEAF_TAG};
use featurize::FeatureMatrix;
use log::{debug, info};
use pbr::ProgressBar;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;
use std::fs::read_to_string;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use yaml_rust::{Yaml, YamlLoader};

use crossbeam_channel::unbounded;

/// How candidate features are scored at each split.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SplitScorer {
    /// Pick the candidate whose split is closest to the median. The default.
    Median,
    /// Pick the candidate with the greatest total absolute deviation among those whose
    /// split lands between the 20th and 80th percentiles.
    Moment,
}

/// Container for the parameters governing the construction of the forest
#[derive(Debug)]
pub struct ForestParameters {
    /// Number of trees in the ensemble.
    pub num_trees: usize,
    /// Maximum tree depth D; the node arrays hold 2^D slots and any branch that reaches
    /// the bottom gets cut into a leaf.
    pub depth: usize,
    /// A view covering fewer rows than this becomes a leaf.
    pub leaf_size: usize,
    /// How many candidate features each split samples (K).
    pub features_per_split: usize,
    /// The candidate scorer.
    pub scorer: SplitScorer,
    /// The seed for deterministic forests. This is xor-ed with the tree index to create
    /// a seed for `rand::rngs::SmallRng`.
    ///
    /// Pass in None if you want to use the host os's entropy instead.
    pub rng_seed: Option<u64>,
    /// This should be replaced by a logging solution
    pub verbosity: u32,
    /// The feature matrix the forest trains over.
    pub matrix: Arc<FeatureMatrix>,
}

/// A construction object for a forest. See [`ForestParameters`] for docs
#[derive(Debug, Clone, PartialEq)]
pub struct RbfBuilder {
    pub(crate) num_trees: usize,
    pub(crate) depth: usize,
    pub(crate) leaf_size: usize,
    pub(crate) features_per_split: usize,
    pub(crate) scorer: SplitScorer,
    pub(crate) rng_seed: Option<u64>,
    pub(crate) verbosity: u32,
}

impl Default for RbfBuilder {
    fn default() -> RbfBuilder {
        RbfBuilder::new()
    }
}

impl RbfBuilder {
    /// Creates a new builder with sensible defaults.
    pub fn new() -> RbfBuilder {
        RbfBuilder {
            num_trees: 20,
            depth: 20,
            leaf_size: 10,
            features_per_split: 20,
            scorer: SplitScorer::Median,
            rng_seed: None,
            verbosity: 0,
        }
    }

    /// Creates a builder from an open yaml object
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Self {
        let config = read_to_string(&path).expect("Unable to read config file");
        let params_files = YamlLoader::load_from_str(&config).unwrap();
        RbfBuilder::from_parsed(&params_files[0])
    }

    pub(crate) fn from_parsed(params: &Yaml) -> Self {
        let scorer = if "moment" == params["scorer"].as_str().unwrap_or("median") {
            SplitScorer::Moment
        } else {
            SplitScorer::Median
        };
        RbfBuilder {
            num_trees: params["num_trees"].as_i64().unwrap_or(20) as usize,
            depth: params["depth"].as_i64().unwrap_or(20) as usize,
            leaf_size: params["leaf_size"].as_i64().unwrap_or(10) as usize,
            features_per_split: params["features_per_split"].as_i64().unwrap_or(20) as usize,
            scorer,
            rng_seed: params["rng_seed"].as_i64().map(|i| i as u64),
            verbosity: params["verbosity"].as_i64().unwrap_or(0) as u32,
        }
    }

    /// See [`ForestParameters`] for docs
    pub fn set_num_trees(&mut self, x: usize) -> &mut Self {
        self.num_trees = x;
        self
    }
    /// See [`ForestParameters`] for docs
    pub fn set_depth(&mut self, x: usize) -> &mut Self {
        self.depth = x;
        self
    }
    /// See [`ForestParameters`] for docs
    pub fn set_leaf_size(&mut self, x: usize) -> &mut Self {
        self.leaf_size = x;
        self
    }
    /// See [`ForestParameters`] for docs
    pub fn set_features_per_split(&mut self, x: usize) -> &mut Self {
        self.features_per_split = x;
        self
    }
    /// See [`ForestParameters`] for docs
    pub fn set_scorer(&mut self, x: SplitScorer) -> &mut Self {
        self.scorer = x;
        self
    }
    /// See [`ForestParameters`] for docs
    pub fn set_rng_seed(&mut self, x: u64) -> &mut Self {
        self.rng_seed = Some(x);
        self
    }
    /// See [`ForestParameters`] for docs
    pub fn set_verbosity(&mut self, x: u32) -> &mut Self {
        self.verbosity = x;
        self
    }

    fn validate(&self, matrix: &FeatureMatrix) -> RbfResult<()> {
        if self.num_trees == 0 {
            return Err(RbfError::InvalidConfig("num_trees must be positive".into()));
        }
        if self.depth == 0 {
            return Err(RbfError::InvalidConfig("depth must be positive".into()));
        }
        if self.depth > 31 {
            return Err(RbfError::InvalidConfig(format!(
                "depth {} would overflow the packed node arrays",
                self.depth
            )));
        }
        if self.leaf_size == 0 {
            return Err(RbfError::InvalidConfig("leaf_size must be positive".into()));
        }
        if self.features_per_split == 0 {
            return Err(RbfError::InvalidConfig(
                "features_per_split must be positive".into(),
            ));
        }
        if self.features_per_split > matrix.dim() {
            return Err(RbfError::InvalidConfig(format!(
                "features_per_split {} exceeds the {} features in the matrix",
                self.features_per_split,
                matrix.dim()
            )));
        }
        if matrix.len() > i32::MAX as usize {
            return Err(RbfError::InvalidConfig(format!(
                "{} training rows don't fit 32-bit row IDs",
                matrix.len()
            )));
        }
        Ok(())
    }

    /// Trains a forest over the given matrix.
    ///
    /// Each tree is a pure function of `(matrix, params, seed)`, so the trees build as
    /// independent rayon tasks with nothing shared but the read-only matrix; the only
    /// synchronization is the channel collecting finished trees. Tree i lands in slot i
    /// no matter what order the workers finish in.
    pub fn build(&self, matrix: Arc<FeatureMatrix>) -> RbfResult<RandomBinaryForest> {
        self.validate(&matrix)?;

        if matrix.is_empty() {
            // nothing to index; queries on an empty forest return empty results
            return Ok(RandomBinaryForest {
                trees: Vec::new(),
                width: QueryWidth::Exact(matrix.dim()),
            });
        }

        let parameters = Arc::new(ForestParameters {
            num_trees: self.num_trees,
            depth: self.depth,
            leaf_size: self.leaf_size,
            features_per_split: self.features_per_split,
            scorer: self.scorer,
            rng_seed: self.rng_seed,
            verbosity: self.verbosity,
            matrix,
        });

        info!(
            "training {} trees over {} rows x {} features",
            parameters.num_trees,
            parameters.matrix.len(),
            parameters.matrix.dim()
        );

        let (tree_sender, tree_receiver) = unbounded();
        for tree_num in 0..parameters.num_trees {
            let parameters = Arc::clone(&parameters);
            let tree_sender = tree_sender.clone();
            rayon::spawn(move || {
                let tree = train_one_tree(&parameters, tree_num);
                tree_sender.send((tree_num, tree)).unwrap();
            });
        }
        drop(tree_sender);

        let mut pb = ProgressBar::new(parameters.num_trees as u64);
        if parameters.verbosity > 1 {
            pb.format("╢▌▌░╟");
        }

        let now = Instant::now();
        let mut slots: Vec<Option<RandomBinaryTree>> =
            (0..parameters.num_trees).map(|_| None).collect();
        for _ in 0..parameters.num_trees {
            let (tree_num, tree) = tree_receiver.recv().unwrap();
            slots[tree_num] = Some(tree);
            if parameters.verbosity > 1 {
                pb.inc();
            }
        }
        let trees: Vec<RandomBinaryTree> = slots.into_iter().map(|slot| slot.unwrap()).collect();

        if parameters.verbosity > 1 {
            println!(
                "\nFinished training, took {:?} with {} trees per second",
                now.elapsed(),
                (parameters.num_trees as f32) / now.elapsed().as_secs_f32()
            );
        }

        Ok(RandomBinaryForest {
            trees,
            width: QueryWidth::Exact(parameters.matrix.dim()),
        })
    }
}

/// Trains a forest with the default scorer and entropy seeding.
pub fn train_forest(
    matrix: Arc<FeatureMatrix>,
    num_trees: usize,
    depth: usize,
    leaf_size: usize,
    features_per_split: usize,
) -> RbfResult<RandomBinaryForest> {
    let mut builder = RbfBuilder::new();
    builder
        .set_num_trees(num_trees)
        .set_depth(depth)
        .set_leaf_size(leaf_size)
        .set_features_per_split(features_per_split);
    builder.build(matrix)
}

// Per-tree mutable state owned by exactly one worker until the tree freezes.
struct TreeCounters {
    internal: i32,
    leaves: i32,
}

fn train_one_tree(parameters: &ForestParameters, tree_num: usize) -> RandomBinaryTree {
    let num_rows = parameters.matrix.len();
    let mut row_index: Vec<RowIndex> = (0..num_rows as RowIndex).collect();
    let tree_size = 1usize << parameters.depth;
    let mut tree_first = vec![0i32; tree_size];
    let mut tree_second = vec![0i32; tree_size];
    let mut rng: SmallRng = match parameters.rng_seed {
        Some(seed) => SmallRng::seed_from_u64(seed ^ tree_num as u64),
        None => SmallRng::from_entropy(),
    };
    let mut counters = TreeCounters {
        internal: 0,
        leaves: 0,
    };
    build_node(
        parameters,
        &mut rng,
        &mut row_index,
        &mut tree_first,
        &mut tree_second,
        &mut counters,
        0,
        num_rows,
        0,
    );
    debug!(
        "tree {} built with {} internal nodes and {} leaves",
        tree_num, counters.internal, counters.leaves
    );
    RandomBinaryTree {
        row_index,
        tree_first,
        tree_second,
        num_internal_nodes: counters.internal,
        num_leaves: counters.leaves,
    }
}

// Calculates the split (or leaf) at one node and recurses into its children.
//
// Guarantees:
// - Child calls look at distinct sub-views of this call's [start, end) view.
// - No two calls in one tree share a node position.
#[allow(clippy::too_many_arguments)]
fn build_node(
    parameters: &ForestParameters,
    rng: &mut SmallRng,
    row_index: &mut [RowIndex],
    tree_first: &mut [i32],
    tree_second: &mut [i32],
    counters: &mut TreeCounters,
    start: usize,
    end: usize,
    node_pos: usize,
) {
    // the children wouldn't fit in the packed arrays, or too few rows are left to split
    if 2 * node_pos + 2 >= tree_first.len() || end - start < parameters.leaf_size {
        tree_first[node_pos] = LEAF_TAG ^ start as i32;
        tree_second[node_pos] = LEAF_TAG ^ end as i32;
        counters.leaves += 1;
        return;
    }

    let (feature, split_value) = choose_split(parameters, rng, &row_index[start..end]);
    let split = start
        + partition(
            &parameters.matrix,
            &mut row_index[start..end],
            feature,
            split_value,
        );
    if split == start || split == end {
        // the sampled features all gave a one-sided split; the empty child leafs out at
        // the size cap and the full child at the depth cap
        debug!(
            "degenerate split on feature {} over {} rows",
            feature,
            end - start
        );
    }
    tree_first[node_pos] = feature as i32;
    tree_second[node_pos] = split_value as i32;
    counters.internal += 1;

    build_node(
        parameters,
        rng,
        row_index,
        tree_first,
        tree_second,
        counters,
        start,
        split,
        2 * node_pos + 1,
    );
    build_node(
        parameters,
        rng,
        row_index,
        tree_first,
        tree_second,
        counters,
        split,
        end,
        2 * node_pos + 2,
    );
}

// Samples K distinct features, histograms each over the view, and scores the candidates.
fn choose_split(
    parameters: &ForestParameters,
    rng: &mut SmallRng,
    view: &[RowIndex],
) -> (usize, u8) {
    let sampled = sample_features(rng, parameters.matrix.dim(), parameters.features_per_split);
    let total = view.len() as u32;
    let mut scans: SmallVec<[SplitScan; 32]> = SmallVec::with_capacity(sampled.len());
    for &feature in &sampled {
        let hist = feature_frequencies(&parameters.matrix, view, feature as usize);
        scans.push(scan_for_split(&hist, total));
    }
    let best = match parameters.scorer {
        SplitScorer::Median => best_median_split(&scans, total),
        SplitScorer::Moment => best_moment_split(&scans, total),
    };
    (sampled[best] as usize, scans[best].split_value)
}

// Rejection sampling against a presence vector; K is small relative to F so collisions
// stay rare.
fn sample_features(rng: &mut SmallRng, num_features: usize, k: usize) -> SmallVec<[u32; 32]> {
    let mut already_selected = vec![false; num_features];
    let mut sampled = SmallVec::with_capacity(k);
    for _ in 0..k {
        let mut feature = rng.gen_range(0..num_features);
        while already_selected[feature] {
            feature = rng.gen_range(0..num_features);
        }
        already_selected[feature] = true;
        sampled.push(feature as u32);
    }
    sampled
}
