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

//! The feature sets a [`crate::Featurizer`] is composed from.
//!
//! Each set knows its width, fills its slot of a feature vector in place, and round-trips
//! through a type-tagged little-endian config block so a forest trained against one
//! feature layout can be queried with the exact same layout later.

mod bigrams;
mod followgrams;
mod numbers;
mod occurrence;

pub use bigrams::Bigrams;
pub use followgrams::{Followgrams, DEFAULT_WINDOW_SIZE};
pub use numbers::{first_number, last_number, FirstNumber, LastNumber};
pub use occurrence::{OccurrenceCounts, OccurrencePositions};

use crate::errors::{FeaturizeError, FeaturizeResult};
use std::io::{Read, Write};
use yaml_rust::Yaml;

// On-disk type tags. The gaps are historical; don't renumber.
const FOLLOWGRAMS_TAG: i32 = 1;
const OCCURRENCE_POSITIONS_TAG: i32 = 21;
const OCCURRENCE_COUNTS_TAG: i32 = 31;
const BIGRAMS_TAG: i32 = 51;
const FIRST_NUMBER_TAG: i32 = 61;
const LAST_NUMBER_TAG: i32 = 71;

/// One configured feature set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureSetConfig {
    /// Adjacent-pair counts.
    Bigrams(Bigrams),
    /// Windowed skip-gram counts.
    Followgrams(Followgrams),
    /// First standalone number in the raw string.
    FirstNumber(FirstNumber),
    /// Last standalone number in the raw string.
    LastNumber(LastNumber),
    /// Per-symbol occurrence counts.
    OccurrenceCounts(OccurrenceCounts),
    /// Per-symbol nth-occurrence positions.
    OccurrencePositions(OccurrencePositions),
}

impl FeatureSetConfig {
    /// Width of this set's slot in the feature vector.
    pub fn size(&self) -> usize {
        match self {
            FeatureSetConfig::Bigrams(b) => b.size(),
            FeatureSetConfig::Followgrams(f) => f.size(),
            FeatureSetConfig::FirstNumber(n) => n.size(),
            FeatureSetConfig::LastNumber(n) => n.size(),
            FeatureSetConfig::OccurrenceCounts(o) => o.size(),
            FeatureSetConfig::OccurrencePositions(o) => o.size(),
        }
    }

    pub(crate) fn write_into(&self, input: &str, features: &mut [u8]) {
        match self {
            FeatureSetConfig::Bigrams(b) => b.write_into(input, features),
            FeatureSetConfig::Followgrams(f) => f.write_into(input, features),
            FeatureSetConfig::FirstNumber(n) => n.write_into(input, features),
            FeatureSetConfig::LastNumber(n) => n.write_into(input, features),
            FeatureSetConfig::OccurrenceCounts(o) => o.write_into(input, features),
            FeatureSetConfig::OccurrencePositions(o) => o.write_into(input, features),
        }
    }

    /// Writes the type tag and the fields needed to reconstruct this set.
    pub fn serialize<W: Write>(&self, writer: &mut W) -> FeaturizeResult<()> {
        match self {
            FeatureSetConfig::Bigrams(b) => {
                write_i32(writer, BIGRAMS_TAG)?;
                write_i32(writer, b.max_count as i32)?;
            }
            FeatureSetConfig::Followgrams(f) => {
                write_i32(writer, FOLLOWGRAMS_TAG)?;
                write_i32(writer, f.window_size as i32)?;
            }
            FeatureSetConfig::FirstNumber(n) => {
                write_i32(writer, FIRST_NUMBER_TAG)?;
                write_i32(writer, n.count as i32)?;
            }
            FeatureSetConfig::LastNumber(n) => {
                write_i32(writer, LAST_NUMBER_TAG)?;
                write_i32(writer, n.count as i32)?;
            }
            FeatureSetConfig::OccurrenceCounts(o) => {
                write_i32(writer, OCCURRENCE_COUNTS_TAG)?;
                write_i32(writer, o.count as i32)?;
            }
            FeatureSetConfig::OccurrencePositions(o) => {
                write_i32(writer, OCCURRENCE_POSITIONS_TAG)?;
                write_i32(writer, o.from_head as i32)?;
                write_i32(writer, o.occurrences as i32)?;
            }
        }
        Ok(())
    }

    /// Reads one tagged config block.
    pub fn deserialize<R: Read>(reader: &mut R) -> FeaturizeResult<FeatureSetConfig> {
        let tag = read_i32(reader)?;
        let config = match tag {
            BIGRAMS_TAG => FeatureSetConfig::Bigrams(Bigrams {
                max_count: read_i32(reader)? as u8,
            }),
            FOLLOWGRAMS_TAG => FeatureSetConfig::Followgrams(Followgrams {
                window_size: read_i32(reader)? as usize,
            }),
            FIRST_NUMBER_TAG => FeatureSetConfig::FirstNumber(FirstNumber {
                count: read_i32(reader)? as u8,
            }),
            LAST_NUMBER_TAG => FeatureSetConfig::LastNumber(LastNumber {
                count: read_i32(reader)? as u8,
            }),
            OCCURRENCE_COUNTS_TAG => FeatureSetConfig::OccurrenceCounts(OccurrenceCounts {
                count: read_i32(reader)? as u8,
            }),
            OCCURRENCE_POSITIONS_TAG => {
                let from_head = read_i32(reader)? != 0;
                let occurrences = read_i32(reader)? as u8;
                FeatureSetConfig::OccurrencePositions(OccurrencePositions {
                    from_head,
                    occurrences,
                })
            }
            unknown => return Err(FeaturizeError::UnknownFeatureTag(unknown)),
        };
        Ok(config)
    }

    /// Builds a set from one YAML list entry, e.g.
    ///
    /// ```yaml
    /// - feature_type: followgrams
    ///   window_size: 5
    /// ```
    pub fn from_yaml(entry: &Yaml) -> FeaturizeResult<FeatureSetConfig> {
        let feature_type =
            entry["feature_type"]
                .as_str()
                .ok_or_else(|| FeaturizeError::MalformedConfig {
                    field: "feature_type".to_string(),
                })?;
        let config = match feature_type {
            "bigrams" => {
                if entry["allow_repeats"].as_bool().unwrap_or(true) {
                    FeatureSetConfig::Bigrams(Bigrams::with_repeats())
                } else {
                    FeatureSetConfig::Bigrams(Bigrams::no_repeats())
                }
            }
            "followgrams" => FeatureSetConfig::Followgrams(Followgrams {
                window_size: entry["window_size"]
                    .as_i64()
                    .unwrap_or(DEFAULT_WINDOW_SIZE as i64) as usize,
            }),
            "first_number" => FeatureSetConfig::FirstNumber(FirstNumber {
                count: entry["count"]
                    .as_i64()
                    .unwrap_or(numbers::FIRST_NUMBER_DEFAULT_COUNT as i64)
                    as u8,
            }),
            "last_number" => FeatureSetConfig::LastNumber(LastNumber {
                count: entry["count"]
                    .as_i64()
                    .unwrap_or(numbers::LAST_NUMBER_DEFAULT_COUNT as i64)
                    as u8,
            }),
            "occurrence_counts" => FeatureSetConfig::OccurrenceCounts(OccurrenceCounts {
                count: entry["count"].as_i64().unwrap_or(2) as u8,
            }),
            "occurrence_positions" => {
                FeatureSetConfig::OccurrencePositions(OccurrencePositions {
                    from_head: entry["from_head"].as_bool().unwrap_or(true),
                    occurrences: entry["occurrences"].as_i64().unwrap_or(3) as u8,
                })
            }
            other => {
                return Err(FeaturizeError::MalformedConfig {
                    field: format!("feature_type: {}", other),
                })
            }
        };
        Ok(config)
    }
}

/// Writes a length-prefixed list of tagged config blocks.
pub fn serialize_array<W: Write>(
    configs: &[FeatureSetConfig],
    writer: &mut W,
) -> FeaturizeResult<()> {
    write_i32(writer, configs.len() as i32)?;
    for config in configs {
        config.serialize(writer)?;
    }
    Ok(())
}

/// Reads a length-prefixed list of tagged config blocks.
pub fn deserialize_array<R: Read>(reader: &mut R) -> FeaturizeResult<Vec<FeatureSetConfig>> {
    let len = read_i32(reader)?;
    if len < 0 {
        return Err(FeaturizeError::MalformedConfig {
            field: format!("feature set count: {}", len),
        });
    }
    let mut configs = Vec::with_capacity(len as usize);
    for _ in 0..len {
        configs.push(FeatureSetConfig::deserialize(reader)?);
    }
    Ok(configs)
}

fn write_i32<W: Write>(writer: &mut W, value: i32) -> std::io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

fn read_i32<R: Read>(reader: &mut R) -> std::io::Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}
