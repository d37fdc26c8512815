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

//! A parameterisable CRC toolkit: compute a checksum under an arbitrary
//! width/polynomial/reflection/init model, or generate standalone C source
//! that implements the same model.
//!
//! ```
//! use crcgen::{Options, Algorithm};
//!
//! let mut opt = Options::new();
//! opt.width = Some(32);
//! opt.poly = Some(0x04C1_1DB7);
//! opt.reflect_in = Some(true);
//! opt.reflect_out = Some(true);
//! opt.xor_in = Some(0xFFFF_FFFF);
//! opt.xor_out = Some(0xFFFF_FFFF);
//! opt.algorithm = Some(Algorithm::TableDriven);
//!
//! let normalized = opt.validate(crcgen::Mode::Compute).unwrap();
//! let model = normalized.require_complete().unwrap();
//! assert_eq!(crcgen::engine::compute(&model, b"123456789"), 0xCBF4_3926);
//! ```

pub mod codegen;
pub mod engine;
pub mod error;
pub mod expr;
pub mod options;
pub mod symtable;

mod driver;

pub use driver::{run, write_output, DriverOutput, InputSource};
pub use engine::CrcEngine;
pub use error::{CrcGenError, ParameterError, Result};
pub use options::{Action, Algorithm, CStd, CompleteModel, Mode, Normalized, Options};
