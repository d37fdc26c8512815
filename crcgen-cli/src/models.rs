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

//! The `--model NAME` catalogue: named parameter sets that pre-fill an
//! `Options`, the way pycrc's `models.py` does. Catalogue lookup happens in
//! this binary crate only — `crcgen` itself never parses a model name.

use crcgen::Options;

pub struct Model {
    pub name: &'static str,
    pub width: u32,
    pub poly: u64,
    pub reflect_in: bool,
    pub xor_in: u64,
    pub reflect_out: bool,
    pub xor_out: u64,
}

pub const CATALOGUE: &[Model] = &[
    Model {
        name: "CRC-16/CCITT-FALSE",
        width: 16,
        poly: 0x1021,
        reflect_in: false,
        xor_in: 0xFFFF,
        reflect_out: false,
        xor_out: 0x0000,
    },
    Model {
        name: "CRC-16/ARC",
        width: 16,
        poly: 0x8005,
        reflect_in: true,
        xor_in: 0x0000,
        reflect_out: true,
        xor_out: 0x0000,
    },
    Model {
        name: "CRC-32",
        width: 32,
        poly: 0x04C1_1DB7,
        reflect_in: true,
        xor_in: 0xFFFF_FFFF,
        reflect_out: true,
        xor_out: 0xFFFF_FFFF,
    },
    Model {
        name: "CRC-32/BZIP2",
        width: 32,
        poly: 0x04C1_1DB7,
        reflect_in: false,
        xor_in: 0xFFFF_FFFF,
        reflect_out: false,
        xor_out: 0xFFFF_FFFF,
    },
    Model {
        name: "CRC-8",
        width: 8,
        poly: 0x07,
        reflect_in: false,
        xor_in: 0x00,
        reflect_out: false,
        xor_out: 0x00,
    },
    Model {
        name: "CRC-5",
        width: 5,
        poly: 0x05,
        reflect_in: false,
        xor_in: 0x00,
        reflect_out: false,
        xor_out: 0x00,
    },
    Model {
        name: "CRC-64/JONES",
        width: 64,
        poly: 0xAD93_D235_94C9_35A9,
        reflect_in: true,
        xor_in: 0xFFFF_FFFF_FFFF_FFFF,
        reflect_out: true,
        xor_out: 0x0000_0000_0000_0000,
    },
];

pub fn lookup(name: &str) -> Option<&'static Model> {
    CATALOGUE
        .iter()
        .find(|m| m.name.eq_ignore_ascii_case(name))
}

/// Apply a model's parameters into `options`, as the starting point a
/// caller's own flags may then override.
pub fn apply(model: &Model, options: &mut Options) {
    options.width = Some(model.width);
    options.poly = Some(model.poly);
    options.reflect_in = Some(model.reflect_in);
    options.xor_in = Some(model.xor_in);
    options.reflect_out = Some(model.reflect_out);
    options.xor_out = Some(model.xor_out);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert!(lookup("crc-32").is_some());
        assert!(lookup("CRC-32").is_some());
        assert!(lookup("not-a-model").is_none());
    }

    #[test]
    fn apply_fills_every_algorithmic_field() {
        let model = lookup("CRC-8").unwrap();
        let mut opt = Options::new();
        apply(model, &mut opt);
        assert_eq!(opt.width, Some(8));
        assert_eq!(opt.poly, Some(0x07));
        assert_eq!(opt.reflect_in, Some(false));
    }
}
