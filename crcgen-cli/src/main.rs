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

//! Command-line front-end for `crcgen`: parses the flags of spec section 6,
//! resolves a `--model` against the catalogue, and hands the assembled
//! `Options` to the driver for either computation or C source generation.

mod models;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use crcgen::{Action, Algorithm, CStd, InputSource, Options};

/// Parse pycrc's historical boolean flag syntax: a leading digit is
/// `atoi`-style truthiness, a leading `t`/`T` is true, anything else false.
fn parse_bool_flag(s: &str) -> Result<bool, String> {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => Ok(s.parse::<i64>().unwrap_or(0) != 0),
        Some(c) if c.eq_ignore_ascii_case(&'t') => Ok(true),
        Some(_) => Ok(false),
        None => Err("expected 0|1|true|false|t|f, got an empty string".to_string()),
    }
}

/// Parse a `0x`-prefixed hex literal or a plain decimal integer.
fn parse_hex_or_decimal(s: &str) -> Result<u64, String> {
    if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(rest, 16).map_err(|e| e.to_string())
    } else {
        s.parse::<u64>().map_err(|e| e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AlgorithmArg {
    #[value(alias = "bbb", name = "bit-by-bit")]
    BitByBit,
    #[value(alias = "bbf", name = "bit-by-bit-fast")]
    BitByBitFast,
    #[value(alias = "tbl", name = "table-driven")]
    TableDriven,
}

impl From<AlgorithmArg> for Algorithm {
    fn from(a: AlgorithmArg) -> Self {
        match a {
            AlgorithmArg::BitByBit => Algorithm::BitByBit,
            AlgorithmArg::BitByBitFast => Algorithm::BitByBitFast,
            AlgorithmArg::TableDriven => Algorithm::TableDriven,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StdArg {
    #[value(name = "C89")]
    C89,
    #[value(name = "C99")]
    C99,
}

impl From<StdArg> for CStd {
    fn from(s: StdArg) -> Self {
        match s {
            StdArg::C89 => CStd::C89,
            StdArg::C99 => CStd::C99,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GenerateArg {
    H,
    C,
    #[value(name = "c-main")]
    CMain,
    Table,
}

/// Compute or generate C source for a parameterisable CRC.
#[derive(Debug, Parser)]
#[command(name = "crc", version, about)]
struct Cli {
    #[arg(long)]
    width: Option<u32>,

    #[arg(long, value_parser = parse_hex_or_decimal)]
    poly: Option<u64>,

    #[arg(long = "xor-in", value_parser = parse_hex_or_decimal)]
    xor_in: Option<u64>,

    #[arg(long = "reflect-in", value_parser = parse_bool_flag)]
    reflect_in: Option<bool>,

    #[arg(long = "xor-out", value_parser = parse_hex_or_decimal)]
    xor_out: Option<u64>,

    #[arg(long = "reflect-out", value_parser = parse_bool_flag)]
    reflect_out: Option<bool>,

    #[arg(long)]
    model: Option<String>,

    #[arg(long, value_enum)]
    algorithm: Option<AlgorithmArg>,

    #[arg(long = "table-idx-width")]
    table_idx_width: Option<u32>,

    #[arg(long = "slice-by")]
    slice_by: Option<u32>,

    #[arg(long = "std", value_enum)]
    std: Option<StdArg>,

    #[arg(long = "symbol-prefix")]
    symbol_prefix: Option<String>,

    #[arg(long = "crc-type")]
    crc_type: Option<String>,

    #[arg(long = "include-file")]
    include_file: Vec<String>,

    #[arg(long, value_enum)]
    generate: Option<GenerateArg>,

    #[arg(long = "check-string")]
    check_string: Option<String>,

    #[arg(long = "check-hexstring")]
    check_hexstring: Option<String>,

    #[arg(long = "check-file")]
    check_file: Option<PathBuf>,

    #[arg(short = 'o')]
    output: Option<PathBuf>,

    #[arg(long, short = 'v')]
    verbose: bool,
}

impl Cli {
    fn build_options(&self) -> Result<Options, crcgen::CrcGenError> {
        let mut options = Options::new();

        if let Some(name) = &self.model {
            let model = models::lookup(name)
                .ok_or_else(|| crcgen::ParameterError::UnknownModel(name.clone()))?;
            models::apply(model, &mut options);
            log::debug!("model {} resolved from the catalogue", model.name);
        }

        if let Some(width) = self.width {
            options.width = Some(width);
        }
        if let Some(poly) = self.poly {
            options.poly = Some(poly);
        }
        if let Some(xor_in) = self.xor_in {
            options.xor_in = Some(xor_in);
        }
        if let Some(reflect_in) = self.reflect_in {
            options.reflect_in = Some(reflect_in);
        }
        if let Some(xor_out) = self.xor_out {
            options.xor_out = Some(xor_out);
        }
        if let Some(reflect_out) = self.reflect_out {
            options.reflect_out = Some(reflect_out);
        }
        if let Some(algorithm) = self.algorithm {
            options.algorithm = Some(algorithm.into());
        }
        if let Some(table_idx_width) = self.table_idx_width {
            options.table_idx_width = table_idx_width;
        }
        if let Some(slice_by) = self.slice_by {
            options.slice_by = slice_by;
        }
        if let Some(std) = self.std {
            options.c_std = std.into();
        }
        if let Some(symbol_prefix) = &self.symbol_prefix {
            options.symbol_prefix = symbol_prefix.clone();
        }
        options.crc_type = self.crc_type.clone();
        options.include_files = self.include_file.clone();
        options.output_file = self
            .output
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());

        if options.slice_by > 1 && options.algorithm != Some(Algorithm::TableDriven) {
            log::warn!("--slice-by only applies to table-driven; ignoring it");
            options.slice_by = 1;
        }

        options.action = match self.generate {
            Some(GenerateArg::H) => Action::GenerateH,
            Some(GenerateArg::C) => Action::GenerateC,
            Some(GenerateArg::CMain) => Action::GenerateCMain,
            Some(GenerateArg::Table) => Action::GenerateTable,
            None => Action::Compute,
        };

        Ok(options)
    }

    fn input_source(&self) -> InputSource<'_> {
        if let Some(path) = &self.check_file {
            InputSource::File(path)
        } else if let Some(hex) = &self.check_hexstring {
            InputSource::HexString(hex)
        } else if let Some(s) = &self.check_string {
            InputSource::String(s)
        } else {
            InputSource::Stdin
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("crc: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> crcgen::Result<()> {
    let options = cli.build_options()?;
    log::debug!("resolved options: {options:?}");

    match crcgen::run(&options, cli.input_source())? {
        crcgen::DriverOutput::Crc(crc) => {
            println!("0x{crc:x}");
            Ok(())
        }
        crcgen::DriverOutput::Source(text) => {
            crcgen::write_output(&text, options.output_file.as_ref().map(PathBuf::from).as_deref())
        }
    }
}
