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

//! Composes feature sets into one fixed-width extractor.

use crate::errors::{FeaturizeError, FeaturizeResult};
use crate::feature_sets::{self, FeatureSetConfig};
use crate::matrix::FeatureMatrix;
use log::debug;
use rayon::prelude::*;
use std::io::{Read, Write};
use yaml_rust::Yaml;

// A feature set realized at its position in the feature vector.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RealizedSet {
    start: usize,
    end: usize,
    config: FeatureSetConfig,
}

/// An ordered list of feature sets realized into contiguous slots of one byte vector.
///
/// The slot layout is a function of the config list alone, so a featurizer rebuilt from a
/// serialized config produces vectors laid out identically to the one it was saved from.
/// That is the whole contract between a forest and its training data.
#[derive(Debug, Clone, PartialEq)]
pub struct Featurizer {
    sets: Vec<RealizedSet>,
    num_features: usize,
}

impl Featurizer {
    /// Realizes the given sets in order.
    pub fn new(configs: Vec<FeatureSetConfig>) -> Featurizer {
        let mut sets = Vec::with_capacity(configs.len());
        let mut start = 0;
        for config in configs {
            let end = start + config.size();
            sets.push(RealizedSet { start, end, config });
            start = end;
        }
        Featurizer {
            sets,
            num_features: start,
        }
    }

    /// Total width of the vectors this featurizer produces.
    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// The configs this featurizer was realized from, in slot order.
    pub fn configs(&self) -> Vec<FeatureSetConfig> {
        self.sets.iter().map(|s| s.config).collect()
    }

    fn write_features(&self, input: &str, features: &mut [u8]) {
        for set in &self.sets {
            set.config
                .write_into(input, &mut features[set.start..set.end]);
        }
    }

    /// Feature vector for a single string.
    pub fn features_for(&self, input: &str) -> Vec<u8> {
        let mut features = vec![0u8; self.num_features];
        self.write_features(input, &mut features);
        features
    }

    /// Feature matrix for a batch of strings, one row per string.
    ///
    /// All rows live in a single flat allocation and are filled in parallel; each worker
    /// owns a disjoint chunk so there is nothing to synchronize.
    pub fn features_for_batch(&self, inputs: &[String]) -> FeaturizeResult<FeatureMatrix> {
        if self.num_features == 0 {
            return Err(FeaturizeError::MalformedConfig {
                field: "feature_sets (empty)".to_string(),
            });
        }
        let mut flat = vec![0u8; inputs.len() * self.num_features];
        flat.par_chunks_mut(self.num_features)
            .zip(inputs.par_iter())
            .for_each(|(row, input)| self.write_features(input, row));
        debug!(
            "featurized {} strings at width {}",
            inputs.len(),
            self.num_features
        );
        FeatureMatrix::new(flat, self.num_features)
    }

    /// Writes the config list this featurizer was built from.
    pub fn serialize<W: Write>(&self, writer: &mut W) -> FeaturizeResult<()> {
        feature_sets::serialize_array(&self.configs(), writer)
    }

    /// Rebuilds a featurizer from a serialized config list.
    pub fn deserialize<R: Read>(reader: &mut R) -> FeaturizeResult<Featurizer> {
        Ok(Featurizer::new(feature_sets::deserialize_array(reader)?))
    }

    /// Builds a featurizer from a YAML list of feature-set entries.
    pub fn from_yaml(list: &Yaml) -> FeaturizeResult<Featurizer> {
        let entries = list
            .as_vec()
            .ok_or_else(|| FeaturizeError::MalformedConfig {
                field: "feature_sets".to_string(),
            })?;
        let mut configs = Vec::with_capacity(entries.len());
        for entry in entries {
            configs.push(FeatureSetConfig::from_yaml(entry)?);
        }
        Ok(Featurizer::new(configs))
    }
}
