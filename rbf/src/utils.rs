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

//! Utility functions for i/o

use crate::errors::{RbfError, RbfResult};
use crate::forest::{RandomBinaryForest, RbfBuilder};
use crate::storage::read_forest;
use featurize::Featurizer;
use std::fs::{read_to_string, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;
use yaml_rust::YamlLoader;

/// Helper function that handles the file I/O for saving a forest.
pub fn save_forest<P: AsRef<Path>>(path: P, forest: &RandomBinaryForest) -> RbfResult<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    forest.write_to(&mut writer)
}

/// Helper function that handles the file I/O for loading a forest.
pub fn load_forest<P: AsRef<Path>>(path: P) -> RbfResult<RandomBinaryForest> {
    let file = File::open(path.as_ref())?;
    let mut reader = BufReader::new(file);
    read_forest(&mut reader)
}

/// Given a yaml file on disk, featurizes the training strings it points at and builds a
/// forest over them. Returns the featurizer alongside the forest; queries have to go
/// through the exact same feature layout the forest was trained on.
///
/// ```yaml
/// ---
/// num_trees: 20
/// depth: 20
/// leaf_size: 10
/// features_per_split: 20
/// rng_seed: 42
/// strings_path: TRAINING_STRINGS_TXT
/// feature_sets:
///   - feature_type: followgrams
///     window_size: 5
///   - feature_type: first_number
///     count: 20
/// ```
pub fn train_from_yaml<P: AsRef<Path>>(path: P) -> RbfResult<(Featurizer, RandomBinaryForest)> {
    let config = read_to_string(&path).expect("Unable to read config file");
    let params_files = YamlLoader::load_from_str(&config).unwrap();
    let params = &params_files[0];

    let featurizer = Featurizer::from_yaml(&params["feature_sets"])?;

    let strings_path = params["strings_path"].as_str().ok_or_else(|| {
        RbfError::InvalidConfig("config file needs a strings_path entry".to_string())
    })?;
    let strings: Vec<String> = read_to_string(strings_path)?
        .lines()
        .map(|line| line.to_string())
        .collect();

    let matrix = featurizer.features_for_batch(&strings)?;
    println!(
        "Loaded {} strings, building a forest at width {}",
        strings.len(),
        matrix.dim()
    );

    let builder = RbfBuilder::from_yaml(&path);
    let forest = builder.build(Arc::new(matrix))?;
    Ok((featurizer, forest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::{train_forest, SplitScorer};
    use featurize::FeatureMatrix;
    use std::io::Write;

    #[test]
    fn builder_reads_its_yaml_fields() {
        let docs = YamlLoader::load_from_str(
            "---\nnum_trees: 7\ndepth: 9\nleaf_size: 3\nfeatures_per_split: 4\nscorer: moment\nrng_seed: 11\nverbosity: 2",
        )
        .unwrap();
        let builder = RbfBuilder::from_parsed(&docs[0]);
        let mut expected = RbfBuilder::new();
        expected
            .set_num_trees(7)
            .set_depth(9)
            .set_leaf_size(3)
            .set_features_per_split(4)
            .set_scorer(SplitScorer::Moment)
            .set_rng_seed(11)
            .set_verbosity(2);
        assert_eq!(builder, expected);
    }

    #[test]
    fn builder_yaml_defaults_hold() {
        let docs = YamlLoader::load_from_str("---\nnum_trees: 3").unwrap();
        let builder = RbfBuilder::from_parsed(&docs[0]);
        assert_eq!(builder.num_trees, 3);
        assert_eq!(builder.scorer, SplitScorer::Median);
        assert_eq!(builder.rng_seed, None);
    }

    #[test]
    fn forest_survives_the_file_system() {
        let rows: Vec<Vec<u8>> = (0..20u32)
            .map(|i| (0..4u32).map(|j| ((i * 11 + j * 3) % 50) as u8).collect())
            .collect();
        let matrix = Arc::new(FeatureMatrix::from_rows(&rows).unwrap());
        let forest = train_forest(matrix, 2, 4, 2, 2).unwrap();

        let path = std::env::temp_dir().join("rbf_utils_roundtrip_test.bin");
        save_forest(&path, &forest).unwrap();
        let loaded = load_forest(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.trees(), forest.trees());
    }

    #[test]
    fn train_from_yaml_runs_the_whole_pipeline() {
        let dir = std::env::temp_dir();
        let strings_path = dir.join("rbf_utils_strings_test.txt");
        let config_path = dir.join("rbf_utils_config_test.yaml");
        {
            let mut strings_file = File::create(&strings_path).unwrap();
            writeln!(strings_file, "123 main st").unwrap();
            writeln!(strings_file, "456 elm ave").unwrap();
            writeln!(strings_file, "789 oak blvd").unwrap();
        }
        {
            let mut config_file = File::create(&config_path).unwrap();
            write!(
                config_file,
                "---\nnum_trees: 2\ndepth: 4\nleaf_size: 1\nfeatures_per_split: 3\nrng_seed: 5\nstrings_path: {}\nfeature_sets:\n  - feature_type: followgrams\n    window_size: 5\n  - feature_type: first_number\n    count: 10\n",
                strings_path.display()
            )
            .unwrap();
        }

        let (featurizer, forest) = train_from_yaml(&config_path).unwrap();
        std::fs::remove_file(&strings_path).ok();
        std::fs::remove_file(&config_path).ok();

        assert_eq!(forest.num_trees(), 2);
        // a training string finds itself
        let query = featurizer.features_for("456 elm ave");
        let rows = forest.find_point_dedup(&query).unwrap();
        assert!(rows.contains(&1));
    }
}
