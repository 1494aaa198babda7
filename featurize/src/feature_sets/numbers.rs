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

//! Numeric features: the first and last standalone numbers in the raw string, mod 256.
//!
//! These scan the raw input, not the normalized form, so they can tell "456" apart from
//! "1st": a digit run glued to a trailing letter is an ordinal or a unit, not a number.
//! Each feature writes its single byte `count` times over, a poor man's weighting that
//! lets a one-byte signal survive random feature sampling next to a 1369-wide set.

/// Default replication for the first-number feature.
pub const FIRST_NUMBER_DEFAULT_COUNT: u8 = 20;

/// Default replication for the last-number feature.
pub const LAST_NUMBER_DEFAULT_COUNT: u8 = 10;

/// The first standalone number in the string, replicated `count` times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirstNumber {
    /// How many copies of the byte this feature emits.
    pub count: u8,
}

impl Default for FirstNumber {
    fn default() -> FirstNumber {
        FirstNumber {
            count: FIRST_NUMBER_DEFAULT_COUNT,
        }
    }
}

impl FirstNumber {
    pub(crate) fn size(&self) -> usize {
        self.count as usize
    }

    pub(crate) fn write_into(&self, input: &str, features: &mut [u8]) {
        let num = first_number(input);
        for slot in features.iter_mut() {
            *slot = num;
        }
    }
}

/// The last standalone number in the string, replicated `count` times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastNumber {
    /// How many copies of the byte this feature emits.
    pub count: u8,
}

impl Default for LastNumber {
    fn default() -> LastNumber {
        LastNumber {
            count: LAST_NUMBER_DEFAULT_COUNT,
        }
    }
}

impl LastNumber {
    pub(crate) fn size(&self) -> usize {
        self.count as usize
    }

    pub(crate) fn write_into(&self, input: &str, features: &mut [u8]) {
        let num = last_number(input);
        for slot in features.iter_mut() {
            *slot = num;
        }
    }
}

/// First number in the string, mod 256. Done by hand instead of with a regex; this sits
/// on the batch featurization hot path.
pub fn first_number(input: &str) -> u8 {
    let mut num: u64 = 0;
    let mut in_num = false;
    for ch in input.chars() {
        if ch.is_ascii_digit() {
            let digit = ch as u64 - '0' as u64;
            if in_num {
                num = num.wrapping_mul(10).wrapping_add(digit);
            } else {
                num = digit;
                in_num = true;
            }
        } else if in_num {
            if ch.is_ascii_lowercase() {
                // not an actual number, more like "1st" or "3a"
                num = 0;
                in_num = false;
            } else {
                return (num % 256) as u8;
            }
        }
    }
    (num % 256) as u8
}

/// Last number in the string, mod 256. Scans from the right; a digit run whose right
/// neighbor is a letter is skipped for the same reason as in [`first_number`].
pub fn last_number(input: &str) -> u8 {
    let mut last_ch = b'-';
    let mut num: u64 = 0;
    let mut pow10: u64 = 0;
    for &ch in input.as_bytes().iter().rev() {
        if ch.is_ascii_digit() {
            let digit = (ch - b'0') as u64;
            if pow10 > 0 {
                num = digit.wrapping_mul(pow10).wrapping_add(num);
                pow10 = pow10.wrapping_mul(10);
            } else if !last_ch.is_ascii_lowercase() {
                num = digit;
                pow10 = 10;
            }
        } else if pow10 > 0 {
            return (num % 256) as u8;
        } else {
            last_ch = ch;
        }
    }
    (num % 256) as u8
}
