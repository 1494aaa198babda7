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

//! Per-symbol occurrence features over the normalized string.

use crate::alphabet::{char_index, normalize, ALPHABET_SIZE};

/// Sentinel position for "the symbol never occurs that often".
const NEVER: u8 = 255;

/// Occurrence count of each alphabet symbol, saturating at 255, replicated `count` times.
///
/// For "aaabbcddd" the first 37-wide block is `[3, 2, 1, 3, 0, ...]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OccurrenceCounts {
    /// How many copies of the 37-wide count block this feature emits.
    pub count: u8,
}

impl Default for OccurrenceCounts {
    fn default() -> OccurrenceCounts {
        OccurrenceCounts { count: 2 }
    }
}

impl OccurrenceCounts {
    pub(crate) fn size(&self) -> usize {
        ALPHABET_SIZE * self.count as usize
    }

    pub(crate) fn write_into(&self, input: &str, features: &mut [u8]) {
        let normalized = normalize(input);
        for &ch in normalized.as_bytes() {
            let idx = char_index(ch);
            for rep in 0..self.count as usize {
                let slot = rep * ALPHABET_SIZE + idx;
                if features[slot] < 255 {
                    features[slot] += 1;
                }
            }
        }
    }
}

/// Position of the nth occurrence of each alphabet symbol, 255 when there is none.
///
/// Analogous to a stopping time: for "edcba" scanned from the head, the first-occurrence
/// block starts `[4, 3, 2, 1, 0, 255, ...]`. Scanning from the tail counts positions from
/// the right instead. The normalized input is trimmed to 256 bytes on the scanned side so
/// every position fits in a byte.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OccurrencePositions {
    /// Scan direction: from the head of the string, or from the tail.
    pub from_head: bool,
    /// How many occurrences of each symbol to record.
    pub occurrences: u8,
}

impl Default for OccurrencePositions {
    fn default() -> OccurrencePositions {
        OccurrencePositions {
            from_head: true,
            occurrences: 3,
        }
    }
}

impl OccurrencePositions {
    pub(crate) fn size(&self) -> usize {
        ALPHABET_SIZE * self.occurrences as usize
    }

    pub(crate) fn write_into(&self, input: &str, features: &mut [u8]) {
        let normalized = normalize(input);
        let mut bytes = normalized.as_bytes();
        if bytes.len() > 256 {
            bytes = if self.from_head {
                &bytes[..256]
            } else {
                &bytes[bytes.len() - 256..]
            };
        }

        for slot in features.iter_mut() {
            *slot = NEVER;
        }

        let mut seen = [0u8; ALPHABET_SIZE];
        let mut process = |pos: usize, ch: u8, features: &mut [u8]| {
            let idx = char_index(ch);
            if seen[idx] < self.occurrences {
                features[seen[idx] as usize * ALPHABET_SIZE + idx] = pos as u8;
                seen[idx] += 1;
            }
        };

        if self.from_head {
            for (pos, &ch) in bytes.iter().enumerate() {
                process(pos, ch, features);
            }
        } else {
            for (pos, &ch) in bytes.iter().rev().enumerate() {
                process(pos, ch, features);
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
    fn occurrence_counts_replicate_and_saturate() {
        let o = OccurrenceCounts { count: 2 };
        let mut features = vec![0u8; o.size()];
        o.write_into("aaabbcddd", &mut features);
        assert_eq!(&features[..4], &[3, 2, 1, 3]);
        assert_eq!(&features[ALPHABET_SIZE..ALPHABET_SIZE + 4], &[3, 2, 1, 3]);
        assert!(slice_is_single_value(&features[4..ALPHABET_SIZE], 0));
        assert!(slice_is_single_value(&features[ALPHABET_SIZE + 4..], 0));

        let long = "a".repeat(400);
        let o = OccurrenceCounts { count: 1 };
        let mut features = vec![0u8; o.size()];
        o.write_into(&long, &mut features);
        assert_eq!(features[0], 255);
    }

    #[test]
    fn occurrence_positions_from_head() {
        let o = OccurrencePositions {
            from_head: true,
            occurrences: 1,
        };
        let mut features = vec![0u8; o.size()];
        o.write_into("edcba", &mut features);
        assert_eq!(&features[..5], &[4, 3, 2, 1, 0]);
        assert!(slice_is_single_value(&features[5..], 255));
    }

    #[test]
    fn occurrence_positions_from_tail() {
        let o = OccurrencePositions {
            from_head: false,
            occurrences: 1,
        };
        let mut features = vec![0u8; o.size()];
        o.write_into("abcde", &mut features);
        // from the right: e at 0, d at 1, ...
        assert_eq!(&features[..5], &[4, 3, 2, 1, 0]);
    }

    #[test]
    fn second_occurrence_lands_in_the_second_block() {
        let o = OccurrencePositions {
            from_head: true,
            occurrences: 2,
        };
        let mut features = vec![0u8; o.size()];
        o.write_into("aba", &mut features);
        assert_eq!(features[0], 0); // first a
        assert_eq!(features[1], 1); // first b
        assert_eq!(features[ALPHABET_SIZE], 2); // second a
        assert_eq!(features[ALPHABET_SIZE + 1], 255); // no second b
    }
}
