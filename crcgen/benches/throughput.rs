use std::fmt;
use std::sync::OnceLock;

use crcgen::engine::{self, CrcEngine};
use crcgen::options::{Algorithm, Mode, Options};
use crcgen::CompleteModel;
use divan::{black_box, counter::BytesCount, Bencher};

fn main() {
    divan::main();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct DatasetSpec {
    label: &'static str,
    size: usize,
}

impl DatasetSpec {
    const fn new(label: &'static str, size: usize) -> Self {
        Self { label, size }
    }
}

impl fmt::Display for DatasetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label)
    }
}

const DATASET_SPEC_LIST: [DatasetSpec; 3] = [
    DatasetSpec::new(" 64B", 64),
    DatasetSpec::new("4KiB", 4 * 1024),
    DatasetSpec::new("4MiB", 4 * 1024 * 1024),
];

const DATASET_SPECS: &[DatasetSpec] = &DATASET_SPEC_LIST;

struct DatasetStorage {
    spec: DatasetSpec,
    data: OnceLock<Box<[u8]>>,
}

impl DatasetStorage {
    const fn new(spec: DatasetSpec) -> Self {
        Self {
            spec,
            data: OnceLock::new(),
        }
    }

    fn payload(&'static self) -> &'static [u8] {
        self.data
            .get_or_init(|| generate_payload(self.spec.size).into_boxed_slice())
            .as_ref()
    }
}

static DATASET_STORAGE: [DatasetStorage; 3] = [
    DatasetStorage::new(DATASET_SPEC_LIST[0]),
    DatasetStorage::new(DATASET_SPEC_LIST[1]),
    DatasetStorage::new(DATASET_SPEC_LIST[2]),
];

fn crc32_options(slice_by: u32) -> Options {
    Options {
        width: Some(32),
        poly: Some(0x04C1_1DB7),
        reflect_in: Some(true),
        reflect_out: Some(true),
        xor_in: Some(0xFFFF_FFFF),
        xor_out: Some(0xFFFF_FFFF),
        algorithm: Some(Algorithm::TableDriven),
        slice_by,
        ..Options::new()
    }
}

fn complete(opt: Options) -> CompleteModel {
    opt.validate(Mode::Compute)
        .unwrap()
        .require_complete()
        .unwrap()
}

#[divan::bench(name = "table-driven/slice-by-1", args = DATASET_SPECS)]
fn bench_table_driven(bencher: Bencher, dataset: DatasetSpec) {
    let model = complete(crc32_options(1));
    let payload = dataset_payload(dataset);
    bencher
        .counter(BytesCount::from(payload.len() as u64))
        .bench(|| black_box(engine::compute(&model, payload)));
}

#[divan::bench(name = "table-driven/slice-by-16", args = DATASET_SPECS)]
fn bench_table_driven_slice16(bencher: Bencher, dataset: DatasetSpec) {
    let model = complete(crc32_options(16));
    let payload = dataset_payload(dataset);
    bencher
        .counter(BytesCount::from(payload.len() as u64))
        .bench(|| black_box(engine::compute(&model, payload)));
}

#[divan::bench(name = "streaming-engine", args = DATASET_SPECS)]
fn bench_streaming_engine(bencher: Bencher, dataset: DatasetSpec) {
    let model = complete(crc32_options(1));
    let payload = dataset_payload(dataset);
    bencher
        .counter(BytesCount::from(payload.len() as u64))
        .bench(|| {
            let mut crc = CrcEngine::new(model);
            crc.update(payload);
            black_box(crc.finalize())
        });
}

#[divan::bench(name = "bit-by-bit", args = DATASET_SPECS)]
fn bench_bit_by_bit(bencher: Bencher, dataset: DatasetSpec) {
    let model = complete(Options {
        algorithm: Some(Algorithm::BitByBit),
        ..crc32_options(1)
    });
    let payload = dataset_payload(dataset);
    bencher
        .counter(BytesCount::from(payload.len() as u64))
        .bench(|| black_box(engine::compute(&model, payload)));
}

fn dataset_payload(spec: DatasetSpec) -> &'static [u8] {
    DATASET_STORAGE
        .iter()
        .find(|storage| storage.spec == spec)
        .unwrap_or_else(|| panic!("unknown dataset: {}", spec.label))
        .payload()
}

fn generate_payload(size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut state = 0x1234_5678u64;
    for _ in 0..size {
        state ^= state << 7;
        state ^= state >> 9;
        state ^= state << 8;
        data.push((state & 0xFF) as u8);
    }
    data
}
