//! Barcode-partitioned parallel pair counting.
//!
//! The driver walks every CBC in the index, extracts (leader, follower)
//! pairs from the CBC's reads, gathers them into counted records, and
//! routes each record to a shard sink. Work is distributed over a fixed
//! pool of threads through a shared atomic cursor: each thread claims the
//! next CBC index with a fetch-add and stops when the cursor passes the end
//! of the CBC list.
//!
//! All inputs (read store, CBC index, anchor set) are shared read-only.
//! Each thread owns its scratch buffers; the only shared mutable state is
//! the sinks (internally locked) and the relaxed statistics counters.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread;

use anyhow::{Context, Result, anyhow, ensure};

use crate::anchors::AcceptedAnchors;
use crate::errors;
use crate::extract::{KmerPair, PairExtractor};
use crate::gather::{PairCount, sort_and_gather};
use crate::progress::ProgressTracker;
use crate::reads::{CbcIndex, ReadStore};
use crate::records::{FieldWidths, PairRecord, RecordEncoding, RecordPacker};
use crate::shard::{ShardSink, shard_for_leader};
use crate::validation::{validate_kmer_len, validate_positive};

/// Runtime parameters of one counting run.
#[derive(Clone, Debug)]
pub struct PairCountConfig {
    /// Leader k-mer width, 1..=32.
    pub leader_len: usize,
    /// Follower k-mer width, 1..=32.
    pub follower_len: usize,
    /// Bases skipped between leader and follower.
    pub gap_len: usize,
    /// CBC width, 1..=32.
    pub cbc_len: usize,
    /// Sample tag written into every record.
    pub sample_id: u64,
    /// Number of output shards.
    pub no_splits: usize,
    /// Worker pool size.
    pub threads: usize,
    /// Saturation value for counts.
    pub max_count: u32,
    /// Flush threshold per (thread, shard) record buffer.
    pub max_records_in_buffer: usize,
    /// Record serialization format.
    pub encoding: RecordEncoding,
    /// Deallocate per-CBC scratch after every CBC. Trades allocator churn
    /// for a lower peak footprint on very large runs.
    pub aggressive_reclaim: bool,
}

impl PairCountConfig {
    /// Check parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns a structured error naming the offending parameter.
    pub fn validate(&self) -> errors::Result<()> {
        validate_kmer_len(self.leader_len, "leader-len")?;
        validate_kmer_len(self.follower_len, "follower-len")?;
        validate_kmer_len(self.cbc_len, "cbc-len")?;
        validate_positive(self.no_splits, "splits")?;
        validate_positive(self.threads, "threads")?;
        validate_positive(self.max_count as usize, "max-count")?;
        validate_positive(self.max_records_in_buffer, "buffer-records")?;
        Ok(())
    }

    /// Byte widths of the serialized record fields for this run.
    #[must_use]
    pub fn field_widths(&self) -> FieldWidths {
        FieldWidths::for_run(
            self.sample_id,
            self.cbc_len,
            self.leader_len,
            self.follower_len,
            self.max_count,
        )
    }

    /// Extractor for this run's pair geometry.
    #[must_use]
    pub const fn extractor(&self) -> PairExtractor {
        PairExtractor::new(self.leader_len, self.follower_len, self.gap_len)
    }
}

impl Default for PairCountConfig {
    fn default() -> Self {
        Self {
            leader_len: 27,
            follower_len: 27,
            gap_len: 0,
            cbc_len: 16,
            sample_id: 0,
            no_splits: 8,
            threads: 4,
            max_count: 65_535,
            max_records_in_buffer: 65_536,
            encoding: RecordEncoding::Compact,
            aggressive_reclaim: false,
        }
    }
}

/// Statistics produced by one counting run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PairCountStats {
    /// CBCs processed.
    pub cbcs: u64,
    /// Distinct (CBC, leader, follower) records written.
    pub records: u64,
    /// Sum of record counts (total extractions, modulo saturation).
    pub sum_counts: u64,
    /// Records whose count hit the saturation value.
    pub saturated: u64,
}

/// Count pairs for every CBC in the index and write records to the sinks.
///
/// The configuration must already be validated and `sinks` must hold
/// exactly `config.no_splits` sinks. Returns after all workers have joined;
/// on a sink failure every worker stops at its next CBC claim and the first
/// error is returned.
///
/// # Errors
///
/// Returns the first sink write error, or an internal error if a worker
/// thread panics.
pub fn count_pairs(
    config: &PairCountConfig,
    store: &ReadStore,
    index: &CbcIndex,
    anchors: Option<&AcceptedAnchors>,
    sinks: &[ShardSink],
) -> Result<PairCountStats> {
    ensure!(
        sinks.len() == config.no_splits,
        "expected {} sinks, got {}",
        config.no_splits,
        sinks.len()
    );
    if let Some(set) = anchors {
        ensure!(
            set.kmer_len() == config.leader_len,
            "anchor width {} does not match leader width {}",
            set.kmer_len(),
            config.leader_len
        );
    }

    let cbcs = index.cbcs();
    let cursor = AtomicUsize::new(0);
    let stop = AtomicBool::new(false);
    let total_records = AtomicU64::new(0);
    let sum_counts = AtomicU64::new(0);
    let saturated = AtomicU64::new(0);
    let progress = ProgressTracker::new("Processed CBCs").with_interval(10_000);

    let extractor = config.extractor();
    let packer = RecordPacker::new(config.field_widths(), config.encoding);

    let result: Result<()> = thread::scope(|scope| {
        let handles: Vec<_> = (0..config.threads)
            .map(|_| {
                let worker = Worker {
                    config,
                    store,
                    index,
                    anchors,
                    sinks,
                    cbcs: &cbcs,
                    cursor: &cursor,
                    stop: &stop,
                    total_records: &total_records,
                    sum_counts: &sum_counts,
                    saturated: &saturated,
                    progress: &progress,
                    extractor,
                    packer: packer.clone(),
                };
                scope.spawn(move || worker.run())
            })
            .collect();

        let mut first: Result<()> = Ok(());
        for handle in handles {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    if first.is_ok() {
                        first = Err(e);
                    }
                }
                Err(_) => {
                    if first.is_ok() {
                        first = Err(anyhow!("counting worker panicked"));
                    }
                }
            }
        }
        first
    });
    result?;

    progress.log_final();

    Ok(PairCountStats {
        cbcs: cbcs.len() as u64,
        records: total_records.load(Ordering::Relaxed),
        sum_counts: sum_counts.load(Ordering::Relaxed),
        saturated: saturated.load(Ordering::Relaxed),
    })
}

/// Per-thread view of the shared run state.
struct Worker<'a> {
    config: &'a PairCountConfig,
    store: &'a ReadStore,
    index: &'a CbcIndex,
    anchors: Option<&'a AcceptedAnchors>,
    sinks: &'a [ShardSink],
    cbcs: &'a [u64],
    cursor: &'a AtomicUsize,
    stop: &'a AtomicBool,
    total_records: &'a AtomicU64,
    sum_counts: &'a AtomicU64,
    saturated: &'a AtomicU64,
    progress: &'a ProgressTracker,
    extractor: PairExtractor,
    packer: RecordPacker,
}

impl Worker<'_> {
    fn run(self) -> Result<()> {
        let no_splits = self.config.no_splits;

        // Scratch owned by this thread for its whole lifetime
        let mut bases: Vec<u8> = Vec::new();
        let mut pairs: Vec<KmerPair> = Vec::new();
        let mut counts: Vec<PairCount> = Vec::new();
        let mut packed: Vec<u8> = Vec::new();
        let mut record_buffers: Vec<Vec<PairRecord>> = vec![Vec::new(); no_splits];

        loop {
            let idx = self.cursor.fetch_add(1, Ordering::Relaxed);
            if idx >= self.cbcs.len() || self.stop.load(Ordering::Relaxed) {
                break;
            }
            let cbc = self.cbcs[idx];

            for &read_id in self.index.reads_for(cbc) {
                self.store.decode_into(read_id, &mut bases);
                self.extractor.extract_into(&bases, self.anchors, &mut pairs);
            }

            let newly_saturated =
                sort_and_gather(&mut pairs, &mut counts, self.config.max_count);

            let mut sum = 0u64;
            for pair_count in &counts {
                let shard = shard_for_leader(pair_count.leader, no_splits);
                record_buffers[shard].push(PairRecord {
                    sample_id: self.config.sample_id,
                    barcode: cbc,
                    leader: pair_count.leader,
                    follower: pair_count.follower,
                    count: pair_count.count,
                });
                sum += u64::from(pair_count.count);
            }

            self.total_records.fetch_add(counts.len() as u64, Ordering::Relaxed);
            self.sum_counts.fetch_add(sum, Ordering::Relaxed);
            self.saturated.fetch_add(newly_saturated, Ordering::Relaxed);
            counts.clear();

            for (shard, buffer) in record_buffers.iter_mut().enumerate() {
                if buffer.len() >= self.config.max_records_in_buffer {
                    self.flush(shard, buffer, &mut packed)?;
                }
            }

            if self.config.aggressive_reclaim {
                bases.shrink_to_fit();
                pairs.shrink_to_fit();
                counts.shrink_to_fit();
            }

            self.progress.log_if_needed(1);
        }

        for (shard, buffer) in record_buffers.iter_mut().enumerate() {
            self.flush(shard, buffer, &mut packed)?;
        }
        Ok(())
    }

    fn flush(
        &self,
        shard: usize,
        buffer: &mut Vec<PairRecord>,
        packed: &mut Vec<u8>,
    ) -> Result<()> {
        self.packer.pack(buffer, packed);
        if let Err(e) = self.sinks[shard].add_packed(packed) {
            // Make every other worker stop at its next claim
            self.stop.store(true, Ordering::Relaxed);
            return Err(e)
                .with_context(|| format!("Failed to write shard {shard}"));
        }
        buffer.clear();
        Ok(())
    }
}
