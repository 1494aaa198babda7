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

//! The errors that can occur when a forest is training, querying, loading or saving.
//! Featurization errors are floated up from `featurize` as that's the data layer.

use featurize::FeaturizeError;
use std::error::Error;
use std::fmt;
use std::io;

/// Helper type for a call that could go wrong.
pub type RbfResult<T> = Result<T, RbfError>;

/// Error type for the forest.
#[derive(Debug)]
pub enum RbfError {
    /// Something went wrong building feature vectors or reading a feature config
    FeaturizeError(FeaturizeError),
    /// A training parameter was zero, out of range, or inconsistent with the matrix.
    /// Raised at build entry, before any allocation.
    InvalidConfig(String),
    /// The query vector's width doesn't match what the forest was trained on
    DimensionMismatch {
        /// The width the forest expects
        expected: usize,
        /// The width it was handed
        found: usize,
    },
    /// An on-disk tree block failed a structural check while loading
    MalformedTree(String),
    /// IO error when reading or writing a forest
    IoError(io::Error),
}

impl fmt::Display for RbfError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RbfError::FeaturizeError(ref e) => write!(f, "{}", e),
            RbfError::IoError(ref e) => write!(f, "{}", e),
            RbfError::InvalidConfig(ref msg) => write!(f, "invalid forest config: {}", msg),
            RbfError::DimensionMismatch { expected, found } => write!(
                f,
                "query vector has width {} but the forest expects {}",
                found, expected
            ),
            RbfError::MalformedTree(ref msg) => write!(f, "malformed tree block: {}", msg),
        }
    }
}

#[allow(deprecated)]
impl Error for RbfError {
    fn description(&self) -> &str {
        match *self {
            RbfError::FeaturizeError(ref e) => e.description(),
            RbfError::IoError(ref e) => e.description(),
            RbfError::InvalidConfig(..) => "a training parameter was zero or out of range",
            RbfError::DimensionMismatch { .. } => {
                "query vector width doesn't match the forest's training width"
            }
            RbfError::MalformedTree(..) => "an on-disk tree block failed a structural check",
        }
    }

    fn cause(&self) -> Option<&dyn Error> {
        match *self {
            RbfError::FeaturizeError(ref e) => Some(e),
            RbfError::IoError(ref e) => Some(e),
            RbfError::InvalidConfig(..) => None,
            RbfError::DimensionMismatch { .. } => None,
            RbfError::MalformedTree(..) => None,
        }
    }
}

impl From<FeaturizeError> for RbfError {
    fn from(err: FeaturizeError) -> Self {
        RbfError::FeaturizeError(err)
    }
}

impl From<io::Error> for RbfError {
    fn from(err: io::Error) -> Self {
        RbfError::IoError(err)
    }
}
