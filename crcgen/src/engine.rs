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

//! The three reference CRC algorithms (bit-by-bit, bit-by-bit-fast,
//! table-driven with optional slice-by-N), plus the reflection primitive
//! and non-direct-init reconstruction they share.
//!
//! Every entry point here takes a [`CompleteModel`] — a [`crate::options::Normalized`]
//! model with no field left `Undefined`. An `Undefined` field reaching this
//! module is a programming error (spec section 7): validation is the
//! caller's job, done exactly once, up front.

use crate::options::{Algorithm, CompleteModel};

/// Reverse the low `width` bits of `value`.
///
/// `reflect(reflect(x, w), w) == x & mask(w)` for all `x` and `w <= 64`.
pub fn reflect(value: u64, width: u32) -> u64 {
    let mut value = value;
    let mut reversed: u64 = 0;
    for _ in 0..width {
        reversed = (reversed << 1) | (value & 1);
        value >>= 1;
    }
    reversed
}

fn reflect8(byte: u8) -> u8 {
    reflect(byte as u64, 8) as u8
}

/// The initial register value for the bit-by-bit algorithm: the value
/// that, after `width` zero-bit shift-XOR steps, produces `xor_in`.
pub fn nondirect_init(model: &CompleteModel) -> u64 {
    let mut register = model.xor_in & model.mask;
    for _ in 0..model.width {
        if register & 1 != 0 {
            register = ((register ^ model.poly) >> 1) | model.msb_mask;
        } else {
            register >>= 1;
        }
    }
    register & model.mask
}

/// Reference bit-by-bit algorithm: one bit of input per iteration, no
/// lookup table. The slowest of the three but the simplest to audit for
/// correctness; the other two algorithms are judged against it.
pub fn bit_by_bit(model: &CompleteModel, data: &[u8]) -> u64 {
    let mut crc = nondirect_init(model);
    for &byte in data {
        let byte = if model.reflect_in { reflect8(byte) } else { byte };
        let mut probe = 0x80u8;
        while probe > 0 {
            let msb_set = crc & model.msb_mask != 0;
            crc <<= 1;
            if byte & probe != 0 {
                crc |= 1;
            }
            if msb_set {
                crc ^= model.poly;
            }
            crc &= model.mask;
            probe >>= 1;
        }
    }
    // Finalize: width more zero-bit update steps.
    for _ in 0..model.width {
        let msb_set = crc & model.msb_mask != 0;
        crc <<= 1;
        if msb_set {
            crc ^= model.poly;
        }
        crc &= model.mask;
    }
    if model.reflect_out {
        crc = reflect(crc, model.width);
    }
    (crc ^ model.xor_out) & model.mask
}

/// Bit-by-bit-fast: still one bit of input per iteration, but without the
/// `width`-iteration finalize pass of [`bit_by_bit`] — it folds reflection
/// into the per-bit probe direction instead.
pub fn bit_by_bit_fast(model: &CompleteModel, data: &[u8]) -> u64 {
    let mut crc = model.xor_in & model.mask;
    for &byte in data {
        let byte = if model.reflect_in { reflect8(byte) } else { byte };
        if model.reflect_in {
            for i in 0..8u32 {
                crc = fast_step(model, crc, byte, 1 << i);
            }
        } else {
            for i in (0..8u32).rev() {
                crc = fast_step(model, crc, byte, 1 << i);
            }
        }
    }
    if model.reflect_out {
        crc = reflect(crc, model.width);
    }
    (crc ^ model.xor_out) & model.mask
}

fn fast_step(model: &CompleteModel, crc: u64, byte: u8, probe: u8) -> u64 {
    let bit = (crc & model.msb_mask) ^ if byte & probe != 0 { model.msb_mask } else { 0 };
    let mut crc = crc << 1;
    if bit != 0 {
        crc ^= model.poly;
    }
    crc & model.mask
}

/// One entry of the `table_idx_width`-bit lookup table, built the way
/// `crc_table_gen` builds it in generated C: left-align into the
/// `crc_shift`-shifted domain, run `table_idx_width` polynomial steps on
/// the MSB, optionally reflect, then mask back into that same shifted
/// domain (sub-byte widths stay left-aligned until the final `finalize`
/// shifts them back — see the "Sub-byte width handling" design note).
fn table_entry(model: &CompleteModel, index: u64) -> u64 {
    let mut crc = if model.reflect_in {
        reflect(index, model.table_idx_width)
    } else {
        index
    };
    let align_shift = model.width as i64 - model.table_idx_width as i64 + model.crc_shift as i64;
    crc = shift_signed(crc, align_shift);
    let shifted_msb = model.msb_mask << model.crc_shift;
    let shifted_poly = model.poly << model.crc_shift;
    for _ in 0..model.table_idx_width {
        crc = if crc & shifted_msb != 0 {
            (crc << 1) ^ shifted_poly
        } else {
            crc << 1
        };
    }
    if model.reflect_in {
        crc = reflect(crc, model.width + model.crc_shift);
    }
    crc & (model.mask << model.crc_shift)
}

fn shift_signed(value: u64, amount: i64) -> u64 {
    if amount >= 0 {
        value << amount
    } else {
        value >> (-amount)
    }
}

/// Build the `table_idx_width`-bit lookup table used by the table-driven
/// algorithm (`2^table_idx_width` entries).
pub fn gen_table(model: &CompleteModel) -> Vec<u64> {
    (0..model.table_width as u64)
        .map(|i| table_entry(model, i))
        .collect()
}

/// Build the `slice_by` lookup tables for the slice-by-N fast path.
/// `tables[0]` is [`gen_table`]; `tables[k][b]` is the contribution of byte
/// `b` placed `k` bytes back in the stream, built by repeatedly applying
/// `tables[0]` to a zero-extended register (spec section 4.1,
/// "Slice-by-N").
pub fn gen_slice_tables(model: &CompleteModel) -> Vec<Vec<u64>> {
    let table0 = gen_table(model);
    let mut tables = vec![table0.clone()];
    for k in 1..model.slice_by as usize {
        let previous = &tables[k - 1];
        let next = (0..model.table_width as u64)
            .map(|b| reflected_update_byte(model, &table0, previous[b as usize], 0))
            .collect();
        tables.push(next);
    }
    tables
}

/// Process one byte through the reflected update formula, `8 /
/// table_idx_width` sub-steps of `table_idx_width` bits at a time (the
/// common case is `table_idx_width == 8`, one step per byte).
fn reflected_update_byte(model: &CompleteModel, table: &[u64], crc: u64, byte: u8) -> u64 {
    let steps = 8 / model.table_idx_width;
    let idx_mask = model.table_width as u64 - 1;
    let mut crc = crc;
    let mut remaining = byte as u64;
    for _ in 0..steps {
        let idx = ((crc ^ remaining) & idx_mask) as usize;
        crc = table[idx] ^ (crc >> model.table_idx_width);
        remaining >>= model.table_idx_width;
    }
    crc & model.mask
}

/// As [`reflected_update_byte`], but walking the byte's nibbles MSB-first
/// and keeping the register left-aligned in the `crc_shift`-shifted domain
/// throughout, per spec section 4.1's "Update, non-reflected".
fn nonreflected_update_byte(model: &CompleteModel, table: &[u64], crc: u64, byte: u8) -> u64 {
    let steps = 8 / model.table_idx_width;
    let idx_mask = model.table_width as u64 - 1;
    let shift = model.width as i64 - model.table_idx_width as i64 + model.crc_shift as i64;
    let mut crc = crc;
    for step in 0..steps {
        let nibble_shift = 8 - model.table_idx_width * (step + 1);
        let nibble = (byte as u64 >> nibble_shift) & idx_mask;
        let idx = ((shift_signed(crc, -shift) ^ nibble) & idx_mask) as usize;
        crc = (table[idx] ^ (crc << model.table_idx_width)) & (model.mask << model.crc_shift);
    }
    crc
}

/// Table-driven algorithm: processes `table_idx_width` bits at a time via
/// a precomputed lookup table, with an optional slice-by-N fast path when
/// `table_idx_width == 8`.
pub fn table_driven(model: &CompleteModel, data: &[u8]) -> u64 {
    if model.slice_by > 1 && model.reflect_in {
        return table_driven_sliced(model, data);
    }
    let table = gen_table(model);
    let mut crc = if model.reflect_in {
        reflect(model.xor_in & model.mask, model.width)
    } else {
        (model.xor_in & model.mask) << model.crc_shift
    };
    for &byte in data {
        crc = if model.reflect_in {
            reflected_update_byte(model, &table, crc, byte)
        } else {
            nonreflected_update_byte(model, &table, crc, byte)
        };
    }
    if model.crc_shift > 0 {
        crc >>= model.crc_shift;
    }
    finalize_table_driven(model, crc)
}

fn finalize_table_driven(model: &CompleteModel, mut crc: u64) -> u64 {
    if model.reflect_in != model.reflect_out {
        crc = reflect(crc, model.width);
    }
    (crc ^ model.xor_out) & model.mask
}

/// The scalar byte loop, but walking `slice_by` bytes at a time once the
/// input is aligned; each step XORs in `slice_by` table lookups instead of
/// one. Requires `reflect_in` (the slice tables are built for the
/// right-shifting/reflected update only).
fn table_driven_sliced(model: &CompleteModel, data: &[u8]) -> u64 {
    let tables = gen_slice_tables(model);
    let n = model.slice_by as usize;
    let mut crc = reflect(model.xor_in & model.mask, model.width);

    let mut chunks = data.chunks_exact(n);
    for chunk in &mut chunks {
        // crc is XORed with the first min(4, n) bytes of the chunk,
        // little-endian, matching a 32-bit-register host load.
        let mut mixed = crc;
        for (i, &byte) in chunk.iter().take(4).enumerate() {
            mixed ^= (byte as u64) << (8 * i);
        }
        let mut acc = 0u64;
        for (k, &byte) in chunk.iter().enumerate() {
            let lane = if k < 4 {
                ((mixed >> (8 * k)) & 0xff) as usize
            } else {
                byte as usize
            };
            acc ^= tables[n - 1 - k][lane];
        }
        crc = acc & model.mask;
    }
    for &byte in chunks.remainder() {
        crc = reflected_update_byte(model, &tables[0], crc, byte);
    }
    finalize_table_driven(model, crc)
}

/// Dispatch to whichever algorithm `model.algorithm` names. All three MUST
/// agree bit-exactly for a well-formed model (spec section 8, "Algorithm
/// equivalence").
pub fn compute(model: &CompleteModel, data: &[u8]) -> u64 {
    match model.algorithm {
        Algorithm::BitByBit => bit_by_bit(model, data),
        Algorithm::BitByBitFast => bit_by_bit_fast(model, data),
        Algorithm::TableDriven => table_driven(model, data),
    }
}

/// A streaming CRC computation, for callers that want to feed data in
/// chunks instead of one slice. Built once a model is fully resolved;
/// grounded on the teacher's `Crc32Engine` (`fastcrc::core`), generalized
/// from a fixed 32-bit register to any [`CompleteModel`].
#[derive(Clone)]
pub struct CrcEngine {
    model: CompleteModel,
    table: Vec<u64>,
    state: u64,
}

impl CrcEngine {
    pub fn new(model: CompleteModel) -> Self {
        let table = gen_table(&model);
        let state = if model.reflect_in {
            reflect(model.xor_in & model.mask, model.width)
        } else {
            (model.xor_in & model.mask) << model.crc_shift
        };
        CrcEngine {
            model,
            table,
            state,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.state = if self.model.reflect_in {
                reflected_update_byte(&self.model, &self.table, self.state, byte)
            } else {
                nonreflected_update_byte(&self.model, &self.table, self.state, byte)
            };
        }
    }

    pub fn finalize(&self) -> u64 {
        let mut crc = self.state;
        if self.model.crc_shift > 0 {
            crc >>= self.model.crc_shift;
        }
        finalize_table_driven(&self.model, crc)
    }

    pub fn reset(&mut self) {
        self.state = if self.model.reflect_in {
            reflect(self.model.xor_in & self.model.mask, self.model.width)
        } else {
            (self.model.xor_in & self.model.mask) << self.model.crc_shift
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{Algorithm, Mode, Options};

    fn model(
        width: u32,
        poly: u64,
        reflect_in: bool,
        xor_in: u64,
        reflect_out: bool,
        xor_out: u64,
        algorithm: Algorithm,
    ) -> CompleteModel {
        let opt = Options {
            width: Some(width),
            poly: Some(poly),
            reflect_in: Some(reflect_in),
            xor_in: Some(xor_in),
            reflect_out: Some(reflect_out),
            xor_out: Some(xor_out),
            algorithm: Some(algorithm),
            ..Options::new()
        };
        opt.validate(Mode::Compute)
            .unwrap()
            .require_complete()
            .unwrap()
    }

    const SCENARIOS: &[(u32, u64, bool, u64, bool, u64, u64)] = &[
        (16, 0x1021, false, 0xFFFF, false, 0x0000, 0x29B1), // CRC-16/CCITT-FALSE
        (16, 0x8005, true, 0x0000, true, 0x0000, 0xBB3D),   // CRC-16/ARC
        (32, 0x04C1_1DB7, true, 0xFFFF_FFFF, true, 0xFFFF_FFFF, 0xCBF4_3926), // CRC-32
        (32, 0x04C1_1DB7, false, 0xFFFF_FFFF, false, 0xFFFF_FFFF, 0xFC89_1918), // CRC-32/BZIP2
        (8, 0x07, false, 0x00, false, 0x00, 0xF4),          // CRC-8
    ];

    #[test]
    fn scenarios_match_expected_values_for_all_algorithms() {
        for &(width, poly, rin, xin, rout, xout, expected) in SCENARIOS {
            for algorithm in [
                Algorithm::BitByBit,
                Algorithm::BitByBitFast,
                Algorithm::TableDriven,
            ] {
                let m = model(width, poly, rin, xin, rout, xout, algorithm);
                let got = compute(&m, b"123456789");
                assert_eq!(
                    got, expected,
                    "width={width} poly={poly:#x} algo={algorithm:?}"
                );
            }
        }
    }

    #[test]
    fn empty_input_equals_finalize_of_init() {
        let m = model(5, 0x05, false, 0x00, false, 0x00, Algorithm::BitByBit);
        let init = nondirect_init(&m);
        let mut crc = init;
        for _ in 0..m.width {
            let msb_set = crc & m.msb_mask != 0;
            crc <<= 1;
            if msb_set {
                crc ^= m.poly;
            }
            crc &= m.mask;
        }
        let expected = (crc ^ m.xor_out) & m.mask;
        assert_eq!(bit_by_bit(&m, b""), expected);
    }

    #[test]
    fn reflect_is_involutive() {
        for width in [1, 5, 8, 16, 32, 64] {
            for x in [0u64, 1, 0xdead_beef, u64::MAX] {
                let masked = if width == 64 { x } else { x & ((1u64 << width) - 1) };
                assert_eq!(reflect(reflect(masked, width), width), masked);
            }
        }
    }

    #[test]
    fn mask_closure_holds_for_every_scenario() {
        for &(width, poly, rin, xin, rout, xout, _) in SCENARIOS {
            let m = model(width, poly, rin, xin, rout, xout, Algorithm::TableDriven);
            for input in [&b""[..], b"\x00", b"\x01", b"\x00\x00\x00\x00", b"\xff"] {
                let got = compute(&m, input);
                assert_eq!(got & !m.mask, 0);
            }
        }
    }

    #[test]
    fn boundary_inputs_agree_across_algorithms() {
        for &(width, poly, rin, xin, rout, xout, _) in SCENARIOS {
            for input in [&b""[..], b"\x00", b"\x01", b"\x00\x00\x00\x00", b"\xff"] {
                let bbb = model(width, poly, rin, xin, rout, xout, Algorithm::BitByBit);
                let bbf = model(width, poly, rin, xin, rout, xout, Algorithm::BitByBitFast);
                let tbl = model(width, poly, rin, xin, rout, xout, Algorithm::TableDriven);
                assert_eq!(compute(&bbb, input), compute(&bbf, input));
                assert_eq!(compute(&bbb, input), compute(&tbl, input));
            }
        }
    }

    #[test]
    fn variable_width_algorithms_agree() {
        // CRC-64/Jones polynomial, masked to each width under test.
        const POLY64: u64 = 0xad93_d235_94c9_35a9;
        let widths: Vec<u32> = (1..=13)
            .chain(15..=17)
            .chain(23..=25)
            .chain(31..=33)
            .chain([63, 64])
            .collect();
        for width in widths {
            let mask = if width == 64 {
                u64::MAX
            } else {
                (1u64 << width) - 1
            };
            let poly = POLY64 & mask;
            let xor = mask;
            for &(rin, rout) in &[(false, false), (true, true), (true, false), (false, true)] {
                let bbb = model(width, poly, rin, xor, rout, 0, Algorithm::BitByBit);
                let bbf = model(width, poly, rin, xor, rout, 0, Algorithm::BitByBitFast);
                let tbl = model(width, poly, rin, xor, rout, 0, Algorithm::TableDriven);
                for input in [&b""[..], b"123456789", b"\x00\x01\x02\x03"] {
                    let a = compute(&bbb, input);
                    let b = compute(&bbf, input);
                    let c = compute(&tbl, input);
                    assert_eq!(a, b, "width={width} rin={rin} rout={rout}");
                    assert_eq!(a, c, "width={width} rin={rin} rout={rout}");
                }
            }
        }
    }

    #[test]
    fn sub_byte_table_idx_width_agrees_with_bit_by_bit() {
        for &table_idx_width in &[1u32, 2, 4] {
            for &(width, poly, rin, xin, rout, xout, _) in SCENARIOS {
                let bbb = model(width, poly, rin, xin, rout, xout, Algorithm::BitByBit);
                let opt = Options {
                    width: Some(width),
                    poly: Some(poly),
                    reflect_in: Some(rin),
                    xor_in: Some(xin),
                    reflect_out: Some(rout),
                    xor_out: Some(xout),
                    algorithm: Some(Algorithm::TableDriven),
                    table_idx_width,
                    ..Options::new()
                };
                let tbl = opt.validate(Mode::Compute).unwrap().require_complete().unwrap();
                for input in [&b""[..], b"\x00", b"123456789", b"\xff\x00\x01"] {
                    assert_eq!(
                        compute(&bbb, input),
                        compute(&tbl, input),
                        "table_idx_width={table_idx_width} width={width} rin={rin} rout={rout}"
                    );
                }
            }
        }
    }

    #[test]
    fn slice_by_agrees_with_scalar_table_driven() {
        let base = model(
            32,
            0x04C1_1DB7,
            true,
            0xFFFF_FFFF,
            true,
            0xFFFF_FFFF,
            Algorithm::TableDriven,
        );
        for &slice_by in &[4u32, 8, 16] {
            let sliced = CompleteModel { slice_by, ..base };
            // every alignment class modulo slice_by
            for len in 0..(slice_by as usize * 3 + 3) {
                let data: Vec<u8> = (0..len as u32).map(|i| (i % 251) as u8).collect();
                assert_eq!(
                    table_driven(&sliced, &data),
                    table_driven(&base, &data),
                    "len={len} slice_by={slice_by}"
                );
            }
        }
    }

    #[test]
    fn streaming_engine_matches_one_shot() {
        let m = model(
            32,
            0x04C1_1DB7,
            true,
            0xFFFF_FFFF,
            true,
            0xFFFF_FFFF,
            Algorithm::TableDriven,
        );
        let data = b"123456789";
        let mut engine = CrcEngine::new(m);
        for chunk in data.chunks(3) {
            engine.update(chunk);
        }
        assert_eq!(engine.finalize(), compute(&m, data));
    }
}
