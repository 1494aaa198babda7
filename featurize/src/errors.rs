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

//! The errors that can occur when building feature vectors or reading a feature config

use std::error::Error;
use std::fmt;
use std::io;

/// Helper type for a call that could go wrong.
pub type FeaturizeResult<T> = Result<T, FeaturizeError>;

/// Error type for the featurization layer.
#[derive(Debug)]
pub enum FeaturizeError {
    /// IO error when reading or writing a serialized feature config
    IoError(io::Error),
    /// A serialized feature config opened with a type tag we don't know about
    UnknownFeatureTag(i32),
    /// A config entry was missing a field, or a field held a value we can't use
    MalformedConfig {
        /// The field that was missing or messed up
        field: String,
    },
    /// The flat data handed to a matrix doesn't divide evenly into rows of the given width
    ShapeError {
        /// Length of the flat buffer
        len: usize,
        /// The row width it was supposed to split into
        dim: usize,
    },
}

impl fmt::Display for FeaturizeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FeaturizeError::IoError(ref e) => write!(f, "{}", e),
            FeaturizeError::UnknownFeatureTag(tag) => {
                write!(f, "received unknown feature type tag {}", tag)
            }
            FeaturizeError::MalformedConfig { ref field } => {
                write!(f, "feature config entry has a missing or bad field: {}", field)
            }
            FeaturizeError::ShapeError { len, dim } => write!(
                f,
                "flat buffer of length {} doesn't divide into rows of width {}",
                len, dim
            ),
        }
    }
}

#[allow(deprecated)]
impl Error for FeaturizeError {
    fn description(&self) -> &str {
        match *self {
            FeaturizeError::IoError(ref e) => e.description(),
            FeaturizeError::UnknownFeatureTag(..) => "received unknown feature type tag",
            FeaturizeError::MalformedConfig { .. } => {
                "feature config entry has a missing or bad field"
            }
            FeaturizeError::ShapeError { .. } => {
                "flat buffer doesn't divide into rows of the given width"
            }
        }
    }

    fn cause(&self) -> Option<&dyn Error> {
        match *self {
            FeaturizeError::IoError(ref e) => Some(e),
            FeaturizeError::UnknownFeatureTag(..) => None,
            FeaturizeError::MalformedConfig { .. } => None,
            FeaturizeError::ShapeError { .. } => None,
        }
    }
}

impl From<io::Error> for FeaturizeError {
    fn from(err: io::Error) -> Self {
        FeaturizeError::IoError(err)
    }
}
