// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Errors surfaced by parameter validation, an unreadable/unwritable stream,
/// or an internal invariant violation.
#[derive(Debug, thiserror::Error)]
pub enum CrcGenError {
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An `Undefined` parameter reached the engine. This is always a
    /// programming error: validation must reject it before the engine ever
    /// sees it.
    #[error("internal invariant violation: {0}")]
    Internal(String),
}

/// A `Result` alias scoped to this crate's error type.
pub type Result<T> = std::result::Result<T, CrcGenError>;

/// The taxonomy of parameter-validation failures from spec section 7.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParameterError {
    #[error("missing required parameter `{0}` for compute mode")]
    MissingRequired(&'static str),

    #[error("parameter `{field}` = {value} is out of range: {reason}")]
    OutOfRange {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("unknown model `{0}`")]
    UnknownModel(String),

    #[error("unknown algorithm `{0}`")]
    UnknownAlgorithm(String),

    #[error("table_idx_width must be one of {{1,2,4,8}}, got {0}")]
    InvalidTableIdxWidth(u32),

    #[error("slice_by must be one of {{1,4,8,16}}, got {0}")]
    InvalidSliceBy(u32),

    #[error("slice_by > 1 requires algorithm = table-driven")]
    SliceByRequiresTableDriven,

    #[error("slice_by > 1 requires table_idx_width = 8")]
    SliceByRequiresFullByteIndex,

    #[error("slice_by > 1 requires reflect_in to be specified")]
    SliceByRequiresReflectIn,
}
