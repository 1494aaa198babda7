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

//! The split machinery one node-build step runs on: per-feature histograms, the
//! median-seeking scan, the two candidate scorers, and the in-place partition.
//!
//! Feature values live in [0, 255], so instead of passing a column of millions of values
//! around we pass its 256-bucket frequency histogram. Everything downstream (split value,
//! balance, moment) is a scan over those buckets.

use crate::forest::tree::RowIndex;
use featurize::FeatureMatrix;

/// Largest value a feature byte can take.
pub(crate) const MAX_FEATURE_VALUE: usize = 255;

// The moment scorer only trusts splits landing between these percentiles.
const MIN_SPLIT_RATIO: f32 = 0.2;
const MAX_SPLIT_RATIO: f32 = 0.8;

/// Value-frequency histogram of one feature over a row-index view.
pub(crate) struct FeatureHistogram {
    /// How often each byte value occurs.
    pub counts: [u32; MAX_FEATURE_VALUE + 1],
    /// Sum of the feature value over all rows in the view, i.e. the weighted sum over
    /// `counts`. Carried along so the scorers never re-sweep the value axis.
    pub weighted_total: u64,
}

/// Builds the histogram for `feature` over the rows referenced by `view`, in one pass.
pub(crate) fn feature_frequencies(
    matrix: &FeatureMatrix,
    view: &[RowIndex],
    feature: usize,
) -> FeatureHistogram {
    let mut counts = [0u32; MAX_FEATURE_VALUE + 1];
    let mut weighted_total = 0u64;
    for &row in view {
        let value = matrix.value(row as usize, feature);
        counts[value as usize] += 1;
        weighted_total += value as u64;
    }
    FeatureHistogram {
        counts,
        weighted_total,
    }
}

/// What one median-seeking scan of a histogram yields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SplitScan {
    /// The smallest value v with more than half the rows at or below it.
    pub split_value: u8,
    /// How many rows are at or below `split_value`.
    pub left_count: u32,
    /// Total absolute deviation about `split_value + 0.5`, for the moment scorer.
    pub total_moment: f32,
}

/// Scans the histogram to the median and computes the split value, the left-side count,
/// and the total moment about the split.
///
/// The moment falls out of the same scan: with `realPos = pos + 0.5`, the total absolute
/// deviation about realPos is
///   `weighted_total - realPos * count + 2 * (realPos * left_count - left_zero_moment)`
/// where `left_zero_moment` is the running moment of the left side about zero. So one
/// accumulation over the buckets up to the median is all we ever need.
///
/// When the scan runs clean past every value (all rows at or below the stopping bucket),
/// the split would put the whole view in the left child. If anything lies below the top
/// bucket the split backs off by one, so the top bucket becomes the right child and the
/// node still makes progress; a view holding one single value is genuinely unsplittable
/// and keeps the one-sided split.
///
/// Requires a non-empty view (the node builder never splits fewer than one row).
pub(crate) fn scan_for_split(hist: &FeatureHistogram, total: u32) -> SplitScan {
    debug_assert!(total > 0);
    let fifty_percentile = total / 2;
    let mut pos: usize = 0;
    let mut left_count = hist.counts[0];
    let mut left_zero_moment = 0u64;
    while left_count <= fifty_percentile {
        pos += 1;
        let bucket = hist.counts[pos];
        left_count += bucket;
        left_zero_moment += bucket as u64 * pos as u64;
    }
    if left_count == total {
        let top = hist.counts[pos];
        if top < total {
            left_count -= top;
            left_zero_moment -= top as u64 * pos as u64;
            pos -= 1;
        }
    }
    let real_pos = pos as f32 + 0.5;
    let total_moment = hist.weighted_total as f32 - real_pos * total as f32
        + 2.0 * (real_pos * left_count as f32 - left_zero_moment as f32);
    SplitScan {
        split_value: pos as u8,
        left_count,
        total_moment,
    }
}

/// Index of the candidate whose split is closest to the median. Ties go to the earlier
/// sample position.
pub(crate) fn best_median_split(scans: &[SplitScan], total: u32) -> usize {
    let mut best = 0;
    let mut best_diff = i64::MAX;
    for (i, scan) in scans.iter().enumerate() {
        let diff = (2 * scan.left_count as i64 - total as i64).abs();
        if diff < best_diff {
            best = i;
            best_diff = diff;
        }
    }
    best
}

/// Index of the candidate with the greatest total moment, considering only candidates
/// whose split lands strictly between the 20th and 80th percentiles; when none does, all
/// candidates compete. Ties go to the earlier sample position.
pub(crate) fn best_moment_split(scans: &[SplitScan], total: u32) -> usize {
    let mut best_good: Option<(usize, f32)> = None;
    let mut best_any: (usize, f32) = (0, f32::NEG_INFINITY);
    for (i, scan) in scans.iter().enumerate() {
        let split_frac = scan.left_count as f32 / total as f32;
        if scan.total_moment > best_any.1 {
            best_any = (i, scan.total_moment);
        }
        if split_frac > MIN_SPLIT_RATIO && split_frac < MAX_SPLIT_RATIO {
            match best_good {
                Some((_, moment)) if moment >= scan.total_moment => {}
                _ => best_good = Some((i, scan.total_moment)),
            }
        }
    }
    best_good.map(|(i, _)| i).unwrap_or(best_any.0)
}

/// Quicksort-style partition of `view` on whether `feature` is at or below `split_value`.
///
/// Returns the offset s into the view such that every row in `view[..s]` satisfies the
/// predicate and every row in `view[s..]` doesn't. Row order within each side is whatever
/// the swaps left behind. `s == 0` iff no row satisfies the predicate, `s == view.len()`
/// iff all do.
pub(crate) fn partition(
    matrix: &FeatureMatrix,
    view: &mut [RowIndex],
    feature: usize,
    split_value: u8,
) -> usize {
    let mut i = 0;
    let mut j = view.len();
    loop {
        while i < j && matrix.value(view[i] as usize, feature) <= split_value {
            i += 1;
        }
        while i < j && matrix.value(view[j - 1] as usize, feature) > split_value {
            j -= 1;
        }
        if i >= j {
            return i;
        }
        view.swap(i, j - 1);
        i += 1;
        j -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hist_from(buckets: &[u32]) -> FeatureHistogram {
        let mut counts = [0u32; MAX_FEATURE_VALUE + 1];
        counts[..buckets.len()].copy_from_slice(buckets);
        let weighted_total = buckets
            .iter()
            .enumerate()
            .map(|(value, &count)| value as u64 * count as u64)
            .sum();
        FeatureHistogram {
            counts,
            weighted_total,
        }
    }

    fn matrix_of_column(values: &[u8]) -> FeatureMatrix {
        FeatureMatrix::new(values.to_vec(), 1).unwrap()
    }

    #[test]
    fn frequencies_count_and_weigh_in_one_pass() {
        let matrix = matrix_of_column(&[0, 0, 5, 5, 5, 5, 7, 7, 7, 7]);
        let view: Vec<u32> = (0..10).collect();
        let hist = feature_frequencies(&matrix, &view, 0);
        assert_eq!(&hist.counts[..8], &[2, 0, 0, 0, 0, 4, 0, 4]);
        assert!(hist.counts[8..].iter().all(|&c| c == 0));
        assert_eq!(hist.weighted_total, 48);
    }

    #[test]
    fn scan_stops_just_past_the_median() {
        let checks: &[(&[u32], f32, u8, u32)] = &[
            (&[10, 5, 4, 0, 0, 11, 12, 13], 122.5, 5, 30),
            (&[10, 0, 0, 0, 0], 5.0, 0, 10),
            (&[1, 1, 1, 1, 1], 6.5, 2, 3),
        ];
        for &(buckets, moment, split_value, left_count) in checks {
            let hist = hist_from(buckets);
            let total = buckets.iter().sum();
            let scan = scan_for_split(&hist, total);
            println!("{:?} -> {:?}", buckets, scan);
            assert_eq!(scan.split_value, split_value);
            assert_eq!(scan.left_count, left_count);
            assert_eq!(scan.total_moment, moment);
        }
    }

    #[test]
    fn one_sided_scan_backs_off_the_top_bucket() {
        // two clusters, all mass at or below the scan's stopping bucket
        let mut buckets = vec![0u32; 11];
        buckets[0] = 1;
        buckets[10] = 1;
        let hist = hist_from(&buckets);
        let scan = scan_for_split(&hist, 2);
        assert_eq!(scan.split_value, 9);
        assert_eq!(scan.left_count, 1);

        // a single repeated value has nothing to back off to
        let hist = hist_from(&[0, 0, 0, 4]);
        let scan = scan_for_split(&hist, 4);
        assert_eq!(scan.split_value, 3);
        assert_eq!(scan.left_count, 4);
    }

    #[test]
    fn median_scorer_prefers_the_balanced_feature() {
        let scans = [
            scan_for_split(&hist_from(&[1, 1, 1, 1, 1]), 5),
            scan_for_split(&hist_from(&[5, 0, 0, 0, 0]), 5),
        ];
        let best = best_median_split(&scans, 5);
        assert_eq!(best, 0);
        assert_eq!(scans[best].split_value, 2);
    }

    #[test]
    fn moment_scorer_prefers_the_spread_out_feature() {
        let scans = [
            scan_for_split(&hist_from(&[1, 1, 1, 1, 1]), 5),
            scan_for_split(&hist_from(&[5, 0, 0, 0, 0]), 5),
        ];
        // feature 1's split lands at the 100th percentile, outside the good band
        let best = best_moment_split(&scans, 5);
        assert_eq!(best, 0);
        assert_eq!(scans[best].split_value, 2);
    }

    #[test]
    fn moment_scorer_falls_back_when_no_split_is_in_band() {
        let scans = [
            scan_for_split(&hist_from(&[5, 0, 0, 0, 0]), 5),
            scan_for_split(&hist_from(&[0, 5, 0, 0, 0]), 5),
        ];
        let best = best_moment_split(&scans, 5);
        // both splits are degenerate; highest moment wins
        assert_eq!(best, scans
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_moment.partial_cmp(&b.1.total_moment).unwrap())
            .unwrap()
            .0);
    }

    #[test]
    fn partition_splits_a_reversed_column() {
        let matrix = matrix_of_column(&[15, 14, 13, 12, 11, 10]);
        let mut view: Vec<u32> = (0..6).collect();
        let s = partition(&matrix, &mut view, 0, 12);
        assert_eq!(s, 3);
        assert_eq!(view, vec![5, 4, 3, 2, 1, 0]);
    }

    #[test]
    fn partition_splits_a_shuffled_column() {
        let matrix = matrix_of_column(&[11, 10, 14, 12, 15, 13]);
        let mut view: Vec<u32> = (0..6).collect();
        let s = partition(&matrix, &mut view, 0, 12);
        assert_eq!(s, 3);
        assert_eq!(view, vec![0, 1, 3, 2, 4, 5]);
        for (offset, &row) in view.iter().enumerate() {
            let value = matrix.value(row as usize, 0);
            if offset < s {
                assert!(value <= 12);
            } else {
                assert!(value > 12);
            }
        }
    }

    #[test]
    fn partition_handles_the_endpoints() {
        let matrix = matrix_of_column(&[11, 10, 14, 12, 15, 13]);

        // split below everything: nothing moves, s == 0
        let mut view: Vec<u32> = (0..6).collect();
        assert_eq!(partition(&matrix, &mut view, 0, 2), 0);
        assert_eq!(view, vec![0, 1, 2, 3, 4, 5]);

        // split above everything: nothing moves, s == len
        let mut view: Vec<u32> = (0..6).collect();
        assert_eq!(partition(&matrix, &mut view, 0, 200), 6);
        assert_eq!(view, vec![0, 1, 2, 3, 4, 5]);

        // nothing to split
        let mut view: Vec<u32> = vec![];
        assert_eq!(partition(&matrix, &mut view, 0, 10), 0);
    }
}
