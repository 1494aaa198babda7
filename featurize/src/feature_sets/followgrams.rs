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

use crate::alphabet::{char_index, normalize, ALPHABET_SIZE};

/// Default lookahead window, chosen as a proxy for 6-grams.
pub const DEFAULT_WINDOW_SIZE: usize = 5;

const MAX_FOLLOWGRAM_COUNT: u8 = 255;

/// Windowed skip-gram pair counts over the normalized string.
///
/// A followgram is a pair `(a, b)` such that `b` occurs after `a` within `window_size`
/// positions. The unbounded variant uniquely identifies its source string, which in
/// practice makes it too rigid for fuzzy matching; small windows behave like a softened
/// n-gram and are what you want here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Followgrams {
    /// How far past each symbol we look for its partners.
    pub window_size: usize,
}

impl Default for Followgrams {
    fn default() -> Followgrams {
        Followgrams {
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

impl Followgrams {
    /// A followgram set with the given lookahead window.
    pub fn new(window_size: usize) -> Followgrams {
        Followgrams { window_size }
    }

    pub(crate) fn size(&self) -> usize {
        ALPHABET_SIZE * ALPHABET_SIZE
    }

    pub(crate) fn write_into(&self, input: &str, features: &mut [u8]) {
        let normalized = normalize(input);
        let bytes = normalized.as_bytes();
        let len = bytes.len();
        for i in 0..len.saturating_sub(1) {
            let ch1 = char_index(bytes[i]);
            let window_end = (i + self.window_size + 1).min(len);
            for &follower in &bytes[i + 1..window_end] {
                let slot = ch1 * ALPHABET_SIZE + char_index(follower);
                if features[slot] < MAX_FOLLOWGRAM_COUNT {
                    features[slot] += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice_is_single_value(slice: &[u8], val: u8) -> bool {
        slice.iter().all(|&x| x == val)
    }

    #[test]
    fn followgrams_respect_the_window() {
        let f = Followgrams::new(3);
        let mut features = vec![0u8; f.size()];
        f.write_into("abcdefgh", &mut features);

        // each symbol sees at most the 3 that follow it
        assert!(slice_is_single_value(&features[1..4], 1)); // a -> b, c, d
        assert!(slice_is_single_value(&features[39..42], 1)); // b -> c, d, e
        assert!(slice_is_single_value(&features[77..80], 1)); // c
        assert!(slice_is_single_value(&features[115..118], 1)); // d
        assert!(slice_is_single_value(&features[153..156], 1)); // e
        assert!(slice_is_single_value(&features[191..193], 1)); // f (only 2 left)
        assert!(slice_is_single_value(&features[229..230], 1)); // g (only 1 left)

        // and nothing in between
        assert!(slice_is_single_value(&features[0..1], 0));
        assert!(slice_is_single_value(&features[4..39], 0));
        assert!(slice_is_single_value(&features[42..77], 0));
        assert!(slice_is_single_value(&features[80..115], 0));
        assert!(slice_is_single_value(&features[118..153], 0));
        assert!(slice_is_single_value(&features[156..191], 0));
        assert!(slice_is_single_value(&features[193..229], 0));
        assert!(slice_is_single_value(&features[230..], 0));
    }

    #[test]
    fn repeated_symbol_accumulates() {
        let f = Followgrams::new(6);
        let mut features = vec![0u8; f.size()];
        f.write_into("aaaaaaaa", &mut features);
        // 7 + 6 + 6 + 5 + ... pairs within the window, all landing on "aa"
        assert_eq!(features[0], 27);
        assert!(slice_is_single_value(&features[1..], 0));
    }
}
