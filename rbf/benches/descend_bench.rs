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

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use featurize::FeatureMatrix;
use rbf::query_interface::BulkInterface;
use rbf::RbfBuilder;

fn build_forest() -> (Arc<FeatureMatrix>, rbf::RandomBinaryForest) {
    // deterministic synthetic rows; no I/O so the bench is self-contained
    let rows = 4096usize;
    let dim = 64usize;
    let mut data = vec![0u8; rows * dim];
    let mut state = 0x2545f4914f6cdd1du64;
    for value in data.iter_mut() {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        *value = (state % 101) as u8;
    }
    let matrix = Arc::new(FeatureMatrix::new(data, dim).unwrap());
    let mut builder = RbfBuilder::new();
    builder
        .set_num_trees(8)
        .set_depth(10)
        .set_leaf_size(8)
        .set_features_per_split(8)
        .set_rng_seed(0);
    let forest = builder.build(Arc::clone(&matrix)).unwrap();
    (matrix, forest)
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let (matrix, forest) = build_forest();

    let query = matrix.row(0).to_vec();
    c.bench_function("find_point", |b| {
        b.iter(|| forest.find_point(black_box(&query)))
    });
    c.bench_function("find_point_dedup", |b| {
        b.iter(|| forest.find_point_dedup(black_box(&query)))
    });

    let queries: Vec<Vec<u8>> = (0..256).map(|i| matrix.row(i).to_vec()).collect();
    let interface = BulkInterface::new(&forest);
    c.bench_function("bulk_dedup_256", |b| {
        b.iter(|| interface.find_points_dedup(black_box(&queries)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
