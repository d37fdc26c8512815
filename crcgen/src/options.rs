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

//! The `CrcModel` of a CRC: every parameter that identifies a variant, plus
//! the code-generation controls that are meaningless outside `generate`
//! actions. Any field may be left `Undefined` (`None`) while generating
//! code; none may be `Undefined` when computing a CRC.

use crate::error::{CrcGenError, ParameterError, Result};

/// Which of the three reference algorithms to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    BitByBit,
    BitByBitFast,
    #[default]
    TableDriven,
}

impl Algorithm {
    pub fn parse(name: &str) -> std::result::Result<Self, ParameterError> {
        match name {
            "bit-by-bit" | "bbb" => Ok(Algorithm::BitByBit),
            "bit-by-bit-fast" | "bbf" => Ok(Algorithm::BitByBitFast),
            "table-driven" | "tbl" => Ok(Algorithm::TableDriven),
            other => Err(ParameterError::UnknownAlgorithm(other.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::BitByBit => "bit-by-bit",
            Algorithm::BitByBitFast => "bit-by-bit-fast",
            Algorithm::TableDriven => "table-driven",
        }
    }
}

/// The target C dialect for generated source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CStd {
    C89,
    #[default]
    C99,
}

impl CStd {
    pub fn parse(name: &str) -> std::result::Result<Self, ParameterError> {
        match name {
            "C89" | "c89" => Ok(CStd::C89),
            "C99" | "c99" => Ok(CStd::C99),
            other => Err(ParameterError::OutOfRange {
                field: "c_std",
                value: other.to_string(),
                reason: "must be C89 or C99".to_string(),
            }),
        }
    }
}

/// What `File::render` (and the driver, in compute mode) should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    #[default]
    Compute,
    GenerateH,
    GenerateC,
    GenerateCMain,
    GenerateTable,
}

/// Whether validation is for a one-shot computation or for code generation.
///
/// Compute mode requires every algorithmic parameter to be defined; generate
/// mode allows any subset to be `Undefined`, in which case the generated C
/// exposes a `cfg_t` configuration struct for the caller to fill in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Compute,
    Generate,
}

/// A validated, parameterised CRC model. Any field may be `None`
/// ("Undefined") except in [`Mode::Compute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub width: Option<u32>,
    pub poly: Option<u64>,
    pub reflect_in: Option<bool>,
    pub reflect_out: Option<bool>,
    pub xor_in: Option<u64>,
    pub xor_out: Option<u64>,
    pub algorithm: Option<Algorithm>,
    pub table_idx_width: u32,
    pub slice_by: u32,
    pub c_std: CStd,
    pub crc_type: Option<String>,
    pub symbol_prefix: String,
    pub include_files: Vec<String>,
    pub output_file: Option<String>,
    pub action: Action,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            width: None,
            poly: None,
            reflect_in: None,
            reflect_out: None,
            xor_in: None,
            xor_out: None,
            algorithm: Some(Algorithm::TableDriven),
            table_idx_width: 8,
            slice_by: 1,
            c_std: CStd::C99,
            crc_type: None,
            symbol_prefix: "crc_".to_string(),
            include_files: Vec::new(),
            output_file: None,
            action: Action::Compute,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if any algorithmic parameter is left unset. Governs whether the
    /// generated C exposes a `cfg_t` struct (spec section 4.4).
    pub fn undefined_crc_parameters(&self) -> bool {
        self.width.is_none()
            || self.poly.is_none()
            || self.reflect_in.is_none()
            || self.xor_in.is_none()
            || self.reflect_out.is_none()
            || self.xor_out.is_none()
    }

    /// Validate once, up front, and compute the derived invariants.
    ///
    /// Compute mode rejects any `Undefined` algorithmic parameter; generate
    /// mode only validates the controls that are always required
    /// (`table_idx_width`, `slice_by` and their joint constraints).
    pub fn validate(&self, mode: Mode) -> Result<Normalized> {
        if !matches!(self.table_idx_width, 1 | 2 | 4 | 8) {
            return Err(ParameterError::InvalidTableIdxWidth(self.table_idx_width).into());
        }
        if !matches!(self.slice_by, 1 | 4 | 8 | 16) {
            return Err(ParameterError::InvalidSliceBy(self.slice_by).into());
        }
        let algorithm = self.algorithm.unwrap_or_default();
        if self.slice_by > 1 {
            if algorithm != Algorithm::TableDriven {
                return Err(ParameterError::SliceByRequiresTableDriven.into());
            }
            if self.table_idx_width != 8 {
                return Err(ParameterError::SliceByRequiresFullByteIndex.into());
            }
            if self.reflect_in.is_none() {
                return Err(ParameterError::SliceByRequiresReflectIn.into());
            }
        }

        if mode == Mode::Compute {
            let width = self.width.ok_or(ParameterError::MissingRequired("width"))?;
            let poly = self.poly.ok_or(ParameterError::MissingRequired("poly"))?;
            let reflect_in = self
                .reflect_in
                .ok_or(ParameterError::MissingRequired("reflect_in"))?;
            let reflect_out = self
                .reflect_out
                .ok_or(ParameterError::MissingRequired("reflect_out"))?;
            let xor_in = self
                .xor_in
                .ok_or(ParameterError::MissingRequired("xor_in"))?;
            let xor_out = self
                .xor_out
                .ok_or(ParameterError::MissingRequired("xor_out"))?;
            check_width(width, Mode::Compute)?;
            check_fits(poly, width, "poly")?;
            check_fits(xor_in, width, "xor_in")?;
            check_fits(xor_out, width, "xor_out")?;
        } else if let Some(width) = self.width {
            check_width(width, Mode::Generate)?;
        }

        Ok(Normalized::build(self, algorithm))
    }
}

/// `Mode::Compute` bounds `width` to `1..=64` since the engine carries the
/// running register in a `u64`. `Mode::Generate` only does textual
/// substitution, so it accepts any nonzero width — `symtable`'s
/// `underlying_crc_t` names a C type for it up to the `uintmax_t` fallback.
fn check_width(width: u32, mode: Mode) -> Result<()> {
    let out_of_range = width == 0 || (mode == Mode::Compute && width > 64);
    if out_of_range {
        return Err(ParameterError::OutOfRange {
            field: "width",
            value: width.to_string(),
            reason: if mode == Mode::Compute {
                "must be in 1..=64 for the compute engine".to_string()
            } else {
                "must be at least 1".to_string()
            },
        }
        .into());
    }
    Ok(())
}

fn check_fits(value: u64, width: u32, field: &'static str) -> Result<()> {
    let mask = mask_for(width);
    if value & !mask != 0 {
        return Err(ParameterError::OutOfRange {
            field,
            value: format!("{value:#x}"),
            reason: format!("does not fit in {width} bits"),
        }
        .into());
    }
    Ok(())
}

pub(crate) fn mask_for(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Derived invariants computed once per validated [`Options`] (spec section
/// 3: "Derived invariants (must hold after normalisation)").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalized {
    pub width: Option<u32>,
    pub poly: Option<u64>,
    pub reflect_in: Option<bool>,
    pub reflect_out: Option<bool>,
    pub xor_in: Option<u64>,
    pub xor_out: Option<u64>,
    pub algorithm: Algorithm,
    pub table_idx_width: u32,
    pub table_width: u32,
    pub slice_by: u32,
    pub mask: Option<u64>,
    pub msb_mask: Option<u64>,
    /// `crc_shift`: left-alignment shift applied by the table-driven
    /// algorithm when `width < 8` so the working register stays byte
    /// aligned. `None` when `width` is undefined.
    pub crc_shift: Option<u32>,
}

impl Normalized {
    fn build(opt: &Options, algorithm: Algorithm) -> Self {
        let mask = opt.width.map(mask_for);
        let msb_mask = opt.width.map(|w| if w == 0 { 0 } else { 1u64 << (w - 1) });
        let crc_shift = if algorithm == Algorithm::TableDriven {
            opt.width.map(|w| if w < 8 { 8 - w } else { 0 })
        } else {
            Some(0)
        };
        Normalized {
            width: opt.width,
            poly: opt.poly,
            reflect_in: opt.reflect_in,
            reflect_out: opt.reflect_out,
            xor_in: opt.xor_in,
            xor_out: opt.xor_out,
            algorithm,
            table_idx_width: opt.table_idx_width,
            table_width: 1 << opt.table_idx_width,
            slice_by: opt.slice_by,
            mask,
            msb_mask,
            crc_shift,
        }
    }

    /// Require every algorithmic parameter to be defined; used by the
    /// engine, which never tolerates `Undefined` input (spec section 7:
    /// "an `Undefined` reaches the engine; fatal, no recovery").
    pub fn require_complete(&self) -> Result<CompleteModel> {
        Ok(CompleteModel {
            width: self
                .width
                .ok_or_else(|| CrcGenError::Internal("width is undefined".to_string()))?,
            poly: self
                .poly
                .ok_or_else(|| CrcGenError::Internal("poly is undefined".to_string()))?,
            reflect_in: self
                .reflect_in
                .ok_or_else(|| CrcGenError::Internal("reflect_in is undefined".to_string()))?,
            reflect_out: self
                .reflect_out
                .ok_or_else(|| CrcGenError::Internal("reflect_out is undefined".to_string()))?,
            xor_in: self
                .xor_in
                .ok_or_else(|| CrcGenError::Internal("xor_in is undefined".to_string()))?,
            xor_out: self
                .xor_out
                .ok_or_else(|| CrcGenError::Internal("xor_out is undefined".to_string()))?,
            algorithm: self.algorithm,
            table_idx_width: self.table_idx_width,
            table_width: self.table_width,
            slice_by: self.slice_by,
            mask: self
                .mask
                .ok_or_else(|| CrcGenError::Internal("mask is undefined".to_string()))?,
            msb_mask: self
                .msb_mask
                .ok_or_else(|| CrcGenError::Internal("msb_mask is undefined".to_string()))?,
            crc_shift: self
                .crc_shift
                .ok_or_else(|| CrcGenError::Internal("crc_shift is undefined".to_string()))?,
        })
    }
}

/// A [`Normalized`] model with every field resolved; the only type the
/// engine (module [`crate::engine`]) accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompleteModel {
    pub width: u32,
    pub poly: u64,
    pub reflect_in: bool,
    pub reflect_out: bool,
    pub xor_in: u64,
    pub xor_out: u64,
    pub algorithm: Algorithm,
    pub table_idx_width: u32,
    pub table_width: u32,
    pub slice_by: u32,
    pub mask: u64,
    pub msb_mask: u64,
    pub crc_shift: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crc32_options() -> Options {
        Options {
            width: Some(32),
            poly: Some(0x04C1_1DB7),
            reflect_in: Some(true),
            reflect_out: Some(true),
            xor_in: Some(0xFFFF_FFFF),
            xor_out: Some(0xFFFF_FFFF),
            algorithm: Some(Algorithm::TableDriven),
            ..Options::new()
        }
    }

    #[test]
    fn compute_mode_requires_all_parameters() {
        let opt = Options::new();
        let err = opt.validate(Mode::Compute).unwrap_err();
        assert!(matches!(
            err,
            CrcGenError::Parameter(ParameterError::MissingRequired("width"))
        ));
    }

    #[test]
    fn generate_mode_allows_undefined() {
        let opt = Options::new();
        let normalized = opt.validate(Mode::Generate).unwrap();
        assert!(normalized.width.is_none());
        assert!(normalized.mask.is_none());
    }

    #[test]
    fn derived_invariants_match_spec() {
        let normalized = crc32_options().validate(Mode::Compute).unwrap();
        assert_eq!(normalized.mask, Some(0xFFFF_FFFF));
        assert_eq!(normalized.msb_mask, Some(0x8000_0000));
        assert_eq!(normalized.crc_shift, Some(0));
    }

    #[test]
    fn sub_byte_width_gets_a_crc_shift() {
        let opt = Options {
            width: Some(5),
            poly: Some(0x05),
            reflect_in: Some(false),
            reflect_out: Some(false),
            xor_in: Some(0),
            xor_out: Some(0),
            algorithm: Some(Algorithm::TableDriven),
            ..Options::new()
        };
        let normalized = opt.validate(Mode::Compute).unwrap();
        assert_eq!(normalized.crc_shift, Some(3));
    }

    #[test]
    fn poly_out_of_range_is_rejected() {
        let opt = Options {
            poly: Some(0x1_0000_0000),
            ..crc32_options()
        };
        let err = opt.validate(Mode::Compute).unwrap_err();
        assert!(matches!(
            err,
            CrcGenError::Parameter(ParameterError::OutOfRange { field: "poly", .. })
        ));
    }

    #[test]
    fn slice_by_requires_table_driven() {
        let opt = Options {
            algorithm: Some(Algorithm::BitByBit),
            slice_by: 4,
            ..crc32_options()
        };
        let err = opt.validate(Mode::Compute).unwrap_err();
        assert!(matches!(
            err,
            CrcGenError::Parameter(ParameterError::SliceByRequiresTableDriven)
        ));
    }

    #[test]
    fn slice_by_requires_full_byte_index() {
        let opt = Options {
            slice_by: 4,
            table_idx_width: 4,
            ..crc32_options()
        };
        let err = opt.validate(Mode::Compute).unwrap_err();
        assert!(matches!(
            err,
            CrcGenError::Parameter(ParameterError::SliceByRequiresFullByteIndex)
        ));
    }

    #[test]
    fn invalid_table_idx_width_is_rejected() {
        let opt = Options {
            table_idx_width: 3,
            ..crc32_options()
        };
        let err = opt.validate(Mode::Compute).unwrap_err();
        assert!(matches!(
            err,
            CrcGenError::Parameter(ParameterError::InvalidTableIdxWidth(3))
        ));
    }

    #[test]
    fn compute_mode_rejects_width_over_64() {
        let opt = Options { width: Some(65), ..crc32_options() };
        let err = opt.validate(Mode::Compute).unwrap_err();
        assert!(matches!(
            err,
            CrcGenError::Parameter(ParameterError::OutOfRange { field: "width", .. })
        ));
    }

    #[test]
    fn generate_mode_allows_width_over_64() {
        let opt = Options { width: Some(128), ..Options::new() };
        let normalized = opt.validate(Mode::Generate).unwrap();
        assert_eq!(normalized.width, Some(128));
    }

    #[test]
    fn algorithm_parses_long_and_short_names() {
        assert_eq!(Algorithm::parse("bit-by-bit").unwrap(), Algorithm::BitByBit);
        assert_eq!(Algorithm::parse("bbb").unwrap(), Algorithm::BitByBit);
        assert_eq!(Algorithm::parse("tbl").unwrap(), Algorithm::TableDriven);
        assert!(Algorithm::parse("nonsense").is_err());
    }
}
