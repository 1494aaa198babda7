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
//! # Featurize
//! Maps strings onto fixed-length byte vectors and glues the per-string vectors into the
//! flat feature matrix that the forest trains on.
//!
//! A feature vector is assembled from an ordered list of feature sets. Each set owns a
//! contiguous slot of the vector and fills it independently of the others, so the total
//! width is just the sum of the set sizes and stays fixed across training and query.

#![allow(dead_code)]
#![warn(missing_docs)]

pub mod errors;
pub use errors::{FeaturizeError, FeaturizeResult};

pub mod alphabet;

mod matrix;
pub use matrix::FeatureMatrix;

mod feature_sets;
pub use feature_sets::{
    deserialize_array, first_number, last_number, serialize_array, Bigrams, FeatureSetConfig,
    FirstNumber, Followgrams, LastNumber, OccurrenceCounts, OccurrencePositions,
};

mod featurizer;
pub use featurizer::Featurizer;

/// To make things more obvious, we type the feature index into a point's byte vector.
pub type FeatureIndex = usize;
