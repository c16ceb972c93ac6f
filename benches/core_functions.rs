//! Benchmarks for core fgkmer functions.
//!
//! Run with: `cargo bench`
//! View reports in: `target/criterion/report/index.html`

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use fgkmer_lib::anchors::AcceptedAnchors;
use fgkmer_lib::extract::{KmerPair, PairExtractor};
use fgkmer_lib::gather::sort_and_gather;
use fgkmer_lib::kmer::{KmerWindow, encode_kmer};
use fgkmer_lib::records::{FieldWidths, PairRecord, RecordEncoding, RecordPacker};
use fgkmer_lib::shard::{fmix64, shard_for_leader};

/// Deterministic synthetic read of the given length.
fn synthetic_read(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            // xorshift is plenty for benchmark inputs
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            b"ACGT"[(state % 4) as usize]
        })
        .collect()
}

/// Benchmark the rolling k-mer window.
fn bench_kmer_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("kmer_window");
    let read = synthetic_read(150, 17);

    group.throughput(Throughput::Bytes(read.len() as u64));
    group.bench_function("push_base_27mer", |b| {
        b.iter(|| {
            let mut window = KmerWindow::new(27);
            for &base in &read {
                window.push_base(black_box(base));
            }
            black_box(window.value())
        });
    });

    group.finish();
}

/// Benchmark pair extraction over typical read lengths.
fn bench_pair_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("pair_extraction");
    let extractor = PairExtractor::new(27, 27, 0);

    for len in [100usize, 150, 300] {
        let read = synthetic_read(len, 42);
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::new("unanchored", len), &read, |b, read| {
            let mut pairs = Vec::new();
            b.iter(|| {
                pairs.clear();
                extractor.extract_into(black_box(read), None, &mut pairs);
                black_box(pairs.len())
            });
        });
    }

    // Anchored extraction with a dictionary that accepts a minority of leaders
    let read = synthetic_read(150, 42);
    let anchors = AcceptedAnchors::new(
        (0..64).map(|i| encode_kmer(&synthetic_read(27, 1000 + i)).unwrap()),
        27,
    );
    group.throughput(Throughput::Bytes(read.len() as u64));
    group.bench_with_input(BenchmarkId::new("anchored", 150), &read, |b, read| {
        let mut pairs = Vec::new();
        b.iter(|| {
            pairs.clear();
            extractor.extract_into(black_box(read), Some(&anchors), &mut pairs);
            black_box(pairs.len())
        });
    });

    group.finish();
}

/// Benchmark sort-and-gather over pair batches with duplicates.
fn bench_sort_and_gather(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort_and_gather");

    for size in [1_000usize, 100_000] {
        let template: Vec<KmerPair> = (0..size)
            .map(|i| KmerPair {
                leader: fmix64(i as u64 % (size as u64 / 4)),
                follower: fmix64(i as u64 % 97),
            })
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("pairs", size), &template, |b, template| {
            let mut pairs = Vec::with_capacity(template.len());
            let mut counts = Vec::new();
            b.iter(|| {
                pairs.clear();
                pairs.extend_from_slice(template);
                black_box(sort_and_gather(&mut pairs, &mut counts, u32::MAX))
            });
        });
    }

    group.finish();
}

/// Benchmark record packing in both encodings.
fn bench_record_packing(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_packing");

    let widths = FieldWidths::for_run(1, 16, 27, 27, 65_535);
    let records: Vec<PairRecord> = (0..10_000u64)
        .map(|i| PairRecord {
            sample_id: 1,
            barcode: 0xAAAA_BBBB,
            leader: fmix64(i / 8),
            follower: fmix64(i),
            count: (i % 100) as u32 + 1,
        })
        .collect();

    group.throughput(Throughput::Elements(records.len() as u64));
    for (name, encoding) in
        [("fixed", RecordEncoding::Fixed), ("compact", RecordEncoding::Compact)]
    {
        let packer = RecordPacker::new(widths, encoding);
        group.bench_with_input(BenchmarkId::new(name, records.len()), &records, |b, records| {
            let mut packed = Vec::new();
            b.iter(|| {
                packer.pack(black_box(records), &mut packed);
                black_box(packed.len())
            });
        });
    }

    group.finish();
}

/// Benchmark the shard router.
fn bench_shard_router(c: &mut Criterion) {
    let mut group = c.benchmark_group("shard_router");

    group.bench_function("shard_for_leader", |b| {
        b.iter(|| {
            let mut acc = 0usize;
            for leader in 0..1000u64 {
                acc += shard_for_leader(black_box(leader), 16);
            }
            black_box(acc)
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_kmer_window,
    bench_pair_extraction,
    bench_sort_and_gather,
    bench_record_packing,
    bench_shard_router
);
criterion_main!(benches);
