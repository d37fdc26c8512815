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

//! A pure, immutable projection of a validated [`Options`] into the
//! strings the code generator splices into C source: for each parameter,
//! either its literal value (pretty-printed hex, at the correct nibble
//! width) or a `cfg->field` reference when the parameter is left
//! `Undefined`. Built once per generation, never mutated.

use std::sync::OnceLock;

use crate::engine::{self, nondirect_init, reflect};
use crate::options::{Algorithm, CStd, Normalized, Options};

/// Everything the code generator needs to name and render a model's
/// symbols. See spec section 4.3 for the pretty-printing rules.
pub struct SymbolTable {
    pub timestamp: String,
    pub header_filename: String,
    pub header_protection: String,

    pub crc_algorithm: String,
    pub crc_width: String,
    pub crc_poly: String,
    pub crc_reflect_in: String,
    pub crc_xor_in: String,
    pub crc_reflect_out: String,
    pub crc_xor_out: String,
    pub crc_table_idx_width: String,
    pub crc_table_width: String,
    pub crc_mask: String,
    pub crc_msb_mask: String,
    pub crc_shift: String,

    pub cfg_width: String,
    pub cfg_poly: String,
    pub cfg_reflect_in: String,
    pub cfg_xor_in: String,
    pub cfg_reflect_out: String,
    pub cfg_xor_out: String,
    pub cfg_mask: String,
    pub cfg_msb_mask: String,
    pub cfg_shift: String,

    pub c_bool: &'static str,
    pub c_true: &'static str,
    pub c_false: &'static str,

    pub underlying_crc_t: String,
    pub crc_t: String,
    pub cfg_t: String,
    pub crc_reflect_function: String,
    pub crc_table_gen_function: String,
    pub crc_init_function: String,
    pub crc_update_function: String,
    pub crc_finalize_function: String,

    /// `Some(hex literal)` when the initial register is a compile-time
    /// constant, i.e. every parameter the chosen algorithm's init formula
    /// depends on is defined.
    pub crc_init_value: Option<String>,

    normalized: Normalized,
    table_init: OnceLock<String>,
}

impl SymbolTable {
    pub fn build(opt: &Options, normalized: Normalized, timestamp: String) -> Self {
        let width = normalized.width;
        let algorithm = normalized.algorithm;

        SymbolTable {
            header_filename: pretty_header_filename(opt.output_file.as_deref()),
            header_protection: pretty_hdrprotection(opt.output_file.as_deref()),

            crc_algorithm: algorithm.name().to_string(),
            crc_width: pretty_str(width),
            crc_poly: pretty_hex(normalized.poly, width),
            crc_reflect_in: pretty_bool(normalized.reflect_in),
            crc_xor_in: pretty_hex(normalized.xor_in, width),
            crc_reflect_out: pretty_bool(normalized.reflect_out),
            crc_xor_out: pretty_hex(normalized.xor_out, width),
            crc_table_idx_width: normalized.table_idx_width.to_string(),
            crc_table_width: normalized.table_width.to_string(),
            crc_mask: pretty_hex(normalized.mask, width),
            crc_msb_mask: pretty_hex(normalized.msb_mask, width),
            crc_shift: pretty_str_u32(normalized.crc_shift),

            cfg_width: cfg_or_literal(opt.width.is_some(), &pretty_str(width), "cfg->width"),
            cfg_poly: cfg_or_literal(
                opt.poly.is_some(),
                &pretty_hex(normalized.poly, width),
                "cfg->poly",
            ),
            cfg_reflect_in: cfg_or_literal(
                opt.reflect_in.is_some(),
                &pretty_bool(normalized.reflect_in),
                "cfg->reflect_in",
            ),
            cfg_xor_in: cfg_or_literal(
                opt.xor_in.is_some(),
                &pretty_hex(normalized.xor_in, width),
                "cfg->xor_in",
            ),
            cfg_reflect_out: cfg_or_literal(
                opt.reflect_out.is_some(),
                &pretty_bool(normalized.reflect_out),
                "cfg->reflect_out",
            ),
            cfg_xor_out: cfg_or_literal(
                opt.xor_out.is_some(),
                &pretty_hex(normalized.xor_out, width),
                "cfg->xor_out",
            ),
            cfg_mask: cfg_or_literal(
                opt.width.is_some(),
                &pretty_hex(normalized.mask, width),
                "cfg->crc_mask",
            ),
            cfg_msb_mask: cfg_or_literal(
                opt.width.is_some(),
                &pretty_hex(normalized.msb_mask, width),
                "cfg->msb_mask",
            ),
            cfg_shift: cfg_or_literal(
                opt.width.is_some(),
                &pretty_str_u32(normalized.crc_shift),
                "cfg->crc_shift",
            ),

            c_bool: if opt.c_std == CStd::C89 { "int" } else { "bool" },
            c_true: if opt.c_std == CStd::C89 { "1" } else { "true" },
            c_false: if opt.c_std == CStd::C89 { "0" } else { "false" },

            underlying_crc_t: underlying_crc_t(opt, width),
            crc_t: format!("{}t", opt.symbol_prefix),
            cfg_t: format!("{}cfg_t", opt.symbol_prefix),
            crc_reflect_function: format!("{}reflect", opt.symbol_prefix),
            crc_table_gen_function: format!("{}table_gen", opt.symbol_prefix),
            crc_init_function: format!("{}init", opt.symbol_prefix),
            crc_update_function: format!("{}update", opt.symbol_prefix),
            crc_finalize_function: format!("{}finalize", opt.symbol_prefix),

            crc_init_value: init_value(&normalized, width),

            timestamp,
            normalized,
            table_init: OnceLock::new(),
        }
    }

    /// The precalculated CRC table literal for the table-driven
    /// implementation, computed at most once (spec section 5: "MUST be
    /// computed at most once per generation").
    pub fn crc_table_init(&self) -> &str {
        self.table_init.get_or_init(|| table_literal(&self.normalized))
    }
}

fn cfg_or_literal(defined: bool, literal: &str, field_ref: &str) -> String {
    if defined {
        literal.to_string()
    } else {
        field_ref.to_string()
    }
}

fn pretty_str(value: Option<u32>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "Undefined".to_string(),
    }
}

fn pretty_str_u32(value: Option<u32>) -> String {
    pretty_str(value)
}

/// Render a value as `0x`-prefixed hex, zero-padded to `ceil(width/4)`
/// nibbles (spec section 4.3). `width = None` falls back to unpadded hex;
/// `value = None` renders `"Undefined"`.
pub fn pretty_hex(value: Option<u64>, width: Option<u32>) -> String {
    let Some(value) = value else {
        return "Undefined".to_string();
    };
    match width {
        None => format!("{value:#x}"),
        Some(width) => {
            let nibbles = ((width + 3) / 4) as usize;
            format!("{value:#0width$x}", width = nibbles + 2)
        }
    }
}

fn pretty_bool(value: Option<bool>) -> String {
    match value {
        Some(true) => "True".to_string(),
        Some(false) => "False".to_string(),
        None => "Undefined".to_string(),
    }
}

fn pretty_header_filename(output_file: Option<&str>) -> String {
    match output_file {
        None => "pycrc_stdout.h".to_string(),
        Some(path) => {
            let base = basename(path);
            if let Some(stem) = base.strip_suffix(".c") {
                format!("{stem}.h")
            } else {
                format!("{base}.h")
            }
        }
    }
}

fn pretty_hdrprotection(output_file: Option<&str>) -> String {
    let filename = match output_file {
        None => "pycrc_stdout".to_string(),
        Some(path) => basename(path).to_string(),
    };
    filename
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn underlying_crc_t(opt: &Options, width: Option<u32>) -> String {
    if let Some(ty) = &opt.crc_type {
        return ty.clone();
    }
    if opt.c_std == CStd::C89 {
        return match width {
            None => "unsigned long int",
            Some(w) if w <= 8 => "unsigned char",
            Some(w) if w <= 16 => "unsigned int",
            Some(_) => "unsigned long int",
        }
        .to_string();
    }
    match width {
        None => "unsigned long long int",
        Some(w) if w <= 8 => "uint_fast8_t",
        Some(w) if w <= 16 => "uint_fast16_t",
        Some(w) if w <= 32 => "uint_fast32_t",
        Some(w) if w <= 64 => "uint_fast64_t",
        Some(w) if w <= 128 => "uint_fast128_t",
        Some(_) => "uintmax_t",
    }
    .to_string()
}

/// The initial register value for the generated C, if it happens to be a
/// compile-time constant for the chosen algorithm (spec section 4.3,
/// `_get_init_value` in the original tool).
fn init_value(normalized: &Normalized, width: Option<u32>) -> Option<String> {
    match normalized.algorithm {
        Algorithm::BitByBit => {
            let complete = normalized.require_complete().ok()?;
            Some(pretty_hex(Some(nondirect_init(&complete)), width))
        }
        Algorithm::BitByBitFast => {
            let xor_in = normalized.xor_in?;
            let mask = normalized.mask?;
            Some(pretty_hex(Some(xor_in & mask), width))
        }
        Algorithm::TableDriven => {
            let reflect_in = normalized.reflect_in?;
            let xor_in = normalized.xor_in?;
            let w = normalized.width?;
            let mask = normalized.mask?;
            let direct = xor_in & mask;
            let init = if reflect_in { reflect(direct, w) } else { direct };
            Some(pretty_hex(Some(init), width))
        }
    }
}

/// Render the full CRC table (or `slice_by` tables) as a brace-delimited C
/// initializer, matching `_get_table_init`/`_get_simple_table` in the
/// original tool's line-wrapping and indentation rules.
fn table_literal(normalized: &Normalized) -> String {
    let Ok(complete) = normalized.require_complete() else {
        return "0".to_string();
    };
    let width = complete.width;
    let tables = engine::gen_slice_tables(&complete);

    let values_per_line: usize = if width > 32 {
        4
    } else if width >= 16 {
        8
    } else {
        16
    };
    let format_width = width.max(8);
    let indent = if complete.slice_by == 1 { 4 } else { 8 };

    let rendered: Vec<String> = tables
        .iter()
        .map(|table| render_table_rows(table, values_per_line, format_width, indent))
        .collect();

    let fixed_indent = " ".repeat(indent - 4);
    let joined = format!(
        "{fixed_indent}{{\n{}\n{fixed_indent}}}",
        rendered.join(&format!("\n{fixed_indent}}},\n{fixed_indent}{{\n"))
    );
    if complete.slice_by == 1 {
        joined
    } else {
        format!("{{\n{joined}\n}}")
    }
}

fn render_table_rows(table: &[u64], values_per_line: usize, format_width: u32, indent: usize) -> String {
    let mut out = String::new();
    let n = table.len();
    for (i, &value) in table.iter().enumerate() {
        if i % values_per_line == 0 {
            out.push_str(&" ".repeat(indent));
        }
        let rendered = pretty_hex(Some(value), Some(format_width));
        if i == n - 1 {
            out.push_str(&rendered);
        } else if i % values_per_line == values_per_line - 1 {
            out.push_str(&rendered);
            out.push_str(",\n");
        } else {
            out.push_str(&rendered);
            out.push_str(", ");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Mode;

    fn build(opt: Options, mode: Mode) -> SymbolTable {
        let normalized = opt.validate(mode).unwrap();
        SymbolTable::build(&opt, normalized, "Thu Jan  1 00:00:00 1970".to_string())
    }

    #[test]
    fn pretty_hex_pads_to_nibble_width() {
        assert_eq!(pretty_hex(Some(0x1021), Some(16)), "0x1021");
        assert_eq!(pretty_hex(Some(0x7), Some(8)), "0x07");
        assert_eq!(pretty_hex(None, Some(8)), "Undefined");
    }

    #[test]
    fn header_protection_upper_cases_and_replaces_punctuation() {
        assert_eq!(pretty_hdrprotection(Some("my-crc.h")), "MY_CRC_H");
        assert_eq!(pretty_hdrprotection(None), "PYCRC_STDOUT");
    }

    #[test]
    fn undefined_parameter_renders_as_cfg_reference() {
        let sym = build(Options::new(), Mode::Generate);
        assert_eq!(sym.cfg_width, "cfg->width");
        assert_eq!(sym.cfg_poly, "cfg->poly");
        assert_eq!(sym.crc_width, "Undefined");
    }

    #[test]
    fn fully_defined_model_renders_literal_everywhere() {
        let opt = Options {
            width: Some(32),
            poly: Some(0x04C1_1DB7),
            reflect_in: Some(true),
            reflect_out: Some(true),
            xor_in: Some(0xFFFF_FFFF),
            xor_out: Some(0xFFFF_FFFF),
            ..Options::new()
        };
        let sym = build(opt, Mode::Compute);
        assert_eq!(sym.cfg_width, "32"); // width renders as decimal, not hex
        assert_eq!(sym.crc_poly, "0x04c11db7");
        assert!(sym.crc_init_value.is_some());
    }

    #[test]
    fn underlying_type_follows_width_and_std() {
        let mut opt = Options {
            width: Some(16),
            ..Options::new()
        };
        opt.c_std = CStd::C99;
        let sym = build(opt.clone(), Mode::Generate);
        assert_eq!(sym.underlying_crc_t, "uint_fast16_t");
        opt.c_std = CStd::C89;
        let sym = build(opt, Mode::Generate);
        assert_eq!(sym.underlying_crc_t, "unsigned int");
    }

    #[test]
    fn table_literal_is_memoised_and_well_formed() {
        let opt = Options {
            width: Some(8),
            poly: Some(0x07),
            reflect_in: Some(false),
            reflect_out: Some(false),
            xor_in: Some(0),
            xor_out: Some(0),
            ..Options::new()
        };
        let sym = build(opt, Mode::Compute);
        let first = sym.crc_table_init().to_string();
        let second = sym.crc_table_init().to_string();
        assert_eq!(first, second);
        assert!(first.starts_with("    {") || first.starts_with("{"));
    }
}
