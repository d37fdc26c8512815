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

//! Ties [`Options`] validation, the [`crate::engine`] compute path, and the
//! [`crate::codegen`] generation path into one entry point, and owns the
//! only I/O this crate performs directly: reading the input to check (or
//! its hex decoding) and, in the CLI, writing the rendered file. A render
//! is always built completely as a `String` in memory before anything is
//! written, so a mid-generation error never leaves a truncated file on
//! disk.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::codegen::File as CodegenFile;
use crate::engine;
use crate::error::{CrcGenError, Result};
use crate::options::{Action, Mode, Options};
use crate::symtable::SymbolTable;

/// Where the bytes to checksum come from, for [`Action::Compute`].
#[derive(Debug, Clone)]
pub enum InputSource<'a> {
    /// The raw bytes of the string, as-is.
    String(&'a str),
    /// A hex-encoded byte string, e.g. `"deadbeef"`.
    HexString(&'a str),
    /// The contents of the named file.
    File(&'a std::path::Path),
    /// Standard input, read to EOF.
    Stdin,
}

impl<'a> InputSource<'a> {
    fn resolve(&self) -> Result<Vec<u8>> {
        match self {
            InputSource::String(s) => Ok(s.as_bytes().to_vec()),
            InputSource::HexString(s) => decode_hex(s),
            InputSource::File(path) => std::fs::read(path).map_err(CrcGenError::from),
            InputSource::Stdin => {
                use std::io::Read;
                let mut buf = Vec::new();
                std::io::stdin().read_to_end(&mut buf)?;
                Ok(buf)
            }
        }
    }
}

fn decode_hex(s: &str) -> Result<Vec<u8>> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.len() % 2 != 0 {
        return Err(CrcGenError::Internal(
            "hex input must have an even number of digits".to_string(),
        ));
    }
    let mut out = Vec::with_capacity(s.len() / 2);
    let bytes = s.as_bytes();
    for chunk in bytes.chunks(2) {
        let hi = hex_digit(chunk[0])?;
        let lo = hex_digit(chunk[1])?;
        out.push((hi << 4) | lo);
    }
    Ok(out)
}

fn hex_digit(c: u8) -> Result<u8> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(CrcGenError::Internal(format!(
            "invalid hex digit: {}",
            c as char
        ))),
    }
}

/// The result of [`run`]: either a computed CRC value or a fully rendered
/// source/table text ready to be written out.
#[derive(Debug, Clone)]
pub enum DriverOutput {
    Crc(u64),
    Source(String),
}

/// Validate `options`, then either compute a CRC over `input` or render
/// generated C source, depending on `options.action`.
pub fn run(options: &Options, input: InputSource<'_>) -> Result<DriverOutput> {
    match options.action {
        Action::Compute => {
            let normalized = options.validate(Mode::Compute)?;
            let complete = normalized.require_complete()?;
            let data = input.resolve()?;
            let crc = engine::compute(&complete, &data);
            Ok(DriverOutput::Crc(crc))
        }
        Action::GenerateH | Action::GenerateC | Action::GenerateCMain | Action::GenerateTable => {
            let normalized = options.validate(Mode::Generate)?;
            let timestamp = render_timestamp();
            // `Normalized` is `Copy`, so `normalized` is still usable below
            // after being copied into the symbol table.
            let symtable = SymbolTable::build(options, normalized, timestamp);
            let file = CodegenFile {
                opt: options,
                normalized: &normalized,
                sym: &symtable,
            };
            Ok(DriverOutput::Source(file.render()))
        }
    }
}

/// Write `output` to `path`, or to stdout when `path` is `None`. The whole
/// string is handed to a single write call; nothing is flushed
/// incrementally.
pub fn write_output(output: &str, path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, output).map_err(CrcGenError::from),
        None => {
            use std::io::Write;
            let mut stdout = std::io::stdout();
            stdout.write_all(output.as_bytes())?;
            Ok(())
        }
    }
}

fn render_timestamp() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    humanize_unix_timestamp(secs)
}

/// A dependency-free `ctime`-style rendering (`"Thu Jan  1 00:00:00 1970"`),
/// good enough for a comment nobody parses back. Avoids pulling in a date
/// crate just for one cosmetic line in a generated file header.
fn humanize_unix_timestamp(secs: u64) -> String {
    const DAYS: [&str; 7] = ["Thu", "Fri", "Sat", "Sun", "Mon", "Tue", "Wed"];
    let days_since_epoch = secs / 86_400;
    let day_name = DAYS[(days_since_epoch % 7) as usize];
    let time_of_day = secs % 86_400;
    let (h, m, s) = (time_of_day / 3600, (time_of_day % 3600) / 60, time_of_day % 60);
    format!("{day_name} {h:02}:{m:02}:{s:02} (unix {secs})")
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
            ..Options::new()
        }
    }

    #[test]
    fn compute_action_returns_crc() {
        let opt = crc32_options();
        let out = run(&opt, InputSource::String("123456789")).unwrap();
        match out {
            DriverOutput::Crc(crc) => assert_eq!(crc, 0xCBF4_3926),
            DriverOutput::Source(_) => panic!("expected a Crc variant"),
        }
    }

    #[test]
    fn hex_input_decodes_before_hashing() {
        let opt = crc32_options();
        let as_string = run(&opt, InputSource::String("123456789")).unwrap();
        let as_hex = run(&opt, InputSource::HexString("313233343536373839")).unwrap();
        match (as_string, as_hex) {
            (DriverOutput::Crc(a), DriverOutput::Crc(b)) => assert_eq!(a, b),
            _ => panic!("expected Crc variants"),
        }
    }

    #[test]
    fn odd_length_hex_is_rejected() {
        let opt = crc32_options();
        assert!(run(&opt, InputSource::HexString("abc")).is_err());
    }

    #[test]
    fn generate_h_renders_a_header_guard() {
        let mut opt = Options::new();
        opt.action = Action::GenerateH;
        let out = run(&opt, InputSource::String("")).unwrap();
        match out {
            DriverOutput::Source(text) => {
                assert!(text.contains("#ifndef"));
                assert!(text.contains("#endif"));
            }
            DriverOutput::Crc(_) => panic!("expected a Source variant"),
        }
    }

    #[test]
    fn generate_table_with_undefined_parameters_renders_zero() {
        let mut opt = Options::new();
        opt.action = Action::GenerateTable;
        let out = run(&opt, InputSource::String("")).unwrap();
        match out {
            DriverOutput::Source(text) => assert_eq!(text, "0"),
            DriverOutput::Crc(_) => panic!("expected a Source variant"),
        }
    }

    #[test]
    fn compute_rejects_undefined_parameters() {
        let opt = Options::new();
        assert!(run(&opt, InputSource::String("123456789")).is_err());
    }
}
