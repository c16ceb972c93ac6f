//! Loading and storage of barcoded reads.
//!
//! Input is a list of (barcode FASTQ, read FASTQ) file pairs. For each
//! record pair, the cell barcode (CBC) is the first `cbc_len` bases of the
//! barcode mate; the read mate carries the sequence that is later scanned
//! for k-mer pairs.
//!
//! Loaded reads live in per-file arrays of 3-bit packed sequences
//! ([`ReadStore`]) and are addressed by a packed read id
//! (`file_id << 48 | local_read_id`). The [`CbcIndex`] maps each CBC
//! encoding to the read ids tagged by it. Both structures are built once
//! during loading and are read-only while counting runs.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use ahash::{AHashMap, AHashSet};
use anyhow::{Context, Result, bail};
use flate2::read::MultiGzDecoder;
use log::debug;
use seq_io::fastq::{Reader as FastqReader, Record};

use crate::dna::{INVALID_CODE, base_code};
use crate::kmer::encode_kmer;

/// Bits reserved for the local read id inside a packed read id.
const LOCAL_READ_ID_BITS: u32 = 48;

/// Pack a (file id, local read id) pair into one u64.
#[inline]
#[must_use]
pub fn encode_read_id(file_id: usize, local_read_id: usize) -> u64 {
    debug_assert!(file_id < (1 << 16));
    debug_assert!(local_read_id < (1usize << LOCAL_READ_ID_BITS));
    ((file_id as u64) << LOCAL_READ_ID_BITS) | local_read_id as u64
}

/// Unpack a read id into its (file id, local read id) pair.
#[inline]
#[must_use]
pub fn decode_read_id(read_id: u64) -> (usize, usize) {
    (
        (read_id >> LOCAL_READ_ID_BITS) as usize,
        (read_id & ((1u64 << LOCAL_READ_ID_BITS) - 1)) as usize,
    )
}

// ============================================================================
// 3-bit base codec
// ============================================================================

/// 3-bit code for 'N' (and any other non-ACGT byte).
const CODE_N: u32 = 4;
/// 3-bit end-of-read sentinel.
const CODE_END: u32 = 5;

/// Pack ASCII bases at 3 bits per base, terminated by an end sentinel.
///
/// Unlike the 2-bit k-mer encoding this keeps 'N' bases, so packed reads
/// decode back to the exact uppercase sequence and window resets still
/// happen where the original read had an invalid base.
pub fn pack_bases(bases: &[u8], packed: &mut Vec<u8>) {
    packed.clear();
    packed.reserve((bases.len() * 3) / 8 + 1);

    let mut acc: u32 = 0;
    let mut nbits: u32 = 0;
    let mut push = |code: u32, packed: &mut Vec<u8>| {
        acc = (acc << 3) | code;
        nbits += 3;
        while nbits >= 8 {
            nbits -= 8;
            packed.push((acc >> nbits) as u8);
        }
    };

    for &base in bases {
        let code = base_code(base);
        let code = if code < INVALID_CODE { u32::from(code) } else { CODE_N };
        push(code, packed);
    }
    push(CODE_END, packed);

    if nbits > 0 {
        packed.push((acc << (8 - nbits)) as u8);
    }
}

/// Decode a 3-bit packed read back to ASCII bases.
pub fn unpack_bases(packed: &[u8], bases: &mut Vec<u8>) {
    const BASES: [u8; 5] = [b'A', b'C', b'G', b'T', b'N'];

    bases.clear();
    let mut acc: u32 = 0;
    let mut nbits: u32 = 0;

    for &byte in packed {
        acc = (acc << 8) | u32::from(byte);
        nbits += 8;
        while nbits >= 3 {
            nbits -= 3;
            let code = (acc >> nbits) & 0b111;
            if code >= CODE_END {
                return;
            }
            bases.push(BASES[code as usize]);
        }
    }
}

// ============================================================================
// Read store and CBC index
// ============================================================================

/// Per-file arrays of 3-bit packed reads.
#[derive(Debug, Default)]
pub struct ReadStore {
    files: Vec<Vec<Vec<u8>>>,
}

impl ReadStore {
    /// Decode the read addressed by `read_id` into `bases`.
    #[inline]
    pub fn decode_into(&self, read_id: u64, bases: &mut Vec<u8>) {
        let (file_id, local_read_id) = decode_read_id(read_id);
        unpack_bases(&self.files[file_id][local_read_id], bases);
    }

    /// Total number of stored reads across all files.
    #[must_use]
    pub fn total_reads(&self) -> u64 {
        self.files.iter().map(|f| f.len() as u64).sum()
    }
}

/// Mapping from CBC encoding to the read ids tagged by it.
#[derive(Debug, Default)]
pub struct CbcIndex {
    map: AHashMap<u64, Vec<u64>>,
}

impl CbcIndex {
    /// Number of distinct CBCs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True if no CBC was indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// All CBC encodings, sorted for a stable processing order.
    #[must_use]
    pub fn cbcs(&self) -> Vec<u64> {
        let mut cbcs: Vec<u64> = self.map.keys().copied().collect();
        cbcs.sort_unstable();
        cbcs
    }

    /// Read ids tagged by `cbc` (empty for an unknown CBC).
    #[must_use]
    pub fn reads_for(&self, cbc: u64) -> &[u64] {
        self.map.get(&cbc).map_or(&[], Vec::as_slice)
    }
}

/// Counters describing one loading run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Reads stored and indexed.
    pub reads_loaded: u64,
    /// Total stored read bases.
    pub bases_loaded: u64,
    /// Barcode mates shorter than the CBC width.
    pub skipped_short_barcode: u64,
    /// Barcode mates with a non-ACGT base inside the CBC region.
    pub skipped_invalid_cbc: u64,
    /// Reads dropped because their CBC was not in the predefined list.
    pub skipped_unlisted_cbc: u64,
}

impl LoadStats {
    fn merge(&mut self, other: &Self) {
        self.reads_loaded += other.reads_loaded;
        self.bases_loaded += other.bases_loaded;
        self.skipped_short_barcode += other.skipped_short_barcode;
        self.skipped_invalid_cbc += other.skipped_invalid_cbc;
        self.skipped_unlisted_cbc += other.skipped_unlisted_cbc;
    }
}

/// Load a plain predefined-CBC list: one barcode per whitespace token.
///
/// # Errors
///
/// Returns an error if the file cannot be read or any entry is not a
/// `cbc_len`-base ACGT string.
pub fn read_predefined_cbcs<P: AsRef<Path>>(path: P, cbc_len: usize) -> Result<AHashSet<u64>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read predefined CBC list: {}", path.display()))?;

    let mut cbcs = AHashSet::new();
    for token in contents.split_whitespace() {
        if token.len() != cbc_len {
            bail!(
                "Predefined CBC '{token}' in {} has length {}, expected {cbc_len}",
                path.display(),
                token.len()
            );
        }
        let Some(encoded) = encode_kmer(token.as_bytes()) else {
            bail!("Predefined CBC '{token}' in {} contains a non-ACGT base", path.display());
        };
        cbcs.insert(encoded);
    }
    Ok(cbcs)
}

// ============================================================================
// Loader
// ============================================================================

/// Result of loading one (barcode, read) file pair.
struct FileLoad {
    file_id: usize,
    reads: Vec<Vec<u8>>,
    cbc_reads: AHashMap<u64, Vec<u64>>,
    stats: LoadStats,
}

/// Parallel loader for barcoded FASTQ file pairs.
pub struct ReadLoader {
    cbc_len: usize,
    threads: usize,
    predefined_cbcs: Option<AHashSet<u64>>,
}

impl ReadLoader {
    /// Create a loader extracting `cbc_len`-base barcodes with `threads`
    /// parallel file readers.
    #[must_use]
    pub fn new(cbc_len: usize, threads: usize) -> Self {
        Self { cbc_len, threads: threads.max(1), predefined_cbcs: None }
    }

    /// Restrict loading to reads whose CBC is in the given set.
    #[must_use]
    pub fn with_predefined_cbcs(mut self, cbcs: AHashSet<u64>) -> Self {
        self.predefined_cbcs = Some(cbcs);
        self
    }

    /// Load all file pairs, producing the read store and CBC index.
    ///
    /// File pairs are distributed over reader threads with a shared
    /// cursor; each thread parses its own files and the results are merged
    /// in the order files were listed, so the store and index do not depend
    /// on thread scheduling.
    ///
    /// # Errors
    ///
    /// Returns the first I/O or parse error encountered.
    pub fn load(&self, file_pairs: &[(PathBuf, PathBuf)]) -> Result<(ReadStore, CbcIndex, LoadStats)> {
        let n_files = file_pairs.len();
        let n_threads = self.threads.min(n_files.max(1));

        let cursor = AtomicUsize::new(0);
        let stop = AtomicBool::new(false);
        let (tx, rx) = crossbeam_channel::unbounded::<Result<FileLoad>>();

        let mut loads: Vec<Option<FileLoad>> = Vec::new();
        loads.resize_with(n_files, || None);
        let mut first_err: Option<anyhow::Error> = None;

        thread::scope(|scope| {
            for _ in 0..n_threads {
                let tx = tx.clone();
                let cursor = &cursor;
                let stop = &stop;
                scope.spawn(move || {
                    loop {
                        let file_id = cursor.fetch_add(1, Ordering::Relaxed);
                        if file_id >= n_files || stop.load(Ordering::Relaxed) {
                            break;
                        }
                        let (barcode_path, read_path) = &file_pairs[file_id];
                        let result = self.load_file_pair(file_id, barcode_path, read_path);
                        let failed = result.is_err();
                        // The receiver outlives the workers; a send failure
                        // only happens after an error already stopped the run.
                        let _ = tx.send(result);
                        if failed {
                            break;
                        }
                    }
                });
            }
            drop(tx);

            for message in rx {
                match message {
                    Ok(load) => {
                        let file_id = load.file_id;
                        loads[file_id] = Some(load);
                    }
                    Err(e) => {
                        stop.store(true, Ordering::Relaxed);
                        if first_err.is_none() {
                            first_err = Some(e);
                        }
                    }
                }
            }
        });

        if let Some(e) = first_err {
            return Err(e);
        }

        let mut store = ReadStore { files: vec![Vec::new(); n_files] };
        let mut index = CbcIndex::default();
        let mut stats = LoadStats::default();

        for load in loads.into_iter().flatten() {
            stats.merge(&load.stats);
            store.files[load.file_id] = load.reads;
            for (cbc, read_ids) in load.cbc_reads {
                index.map.entry(cbc).or_default().extend(read_ids);
            }
        }

        Ok((store, index, stats))
    }

    fn load_file_pair(
        &self,
        file_id: usize,
        barcode_path: &Path,
        read_path: &Path,
    ) -> Result<FileLoad> {
        debug!(
            "Loading file pair {}: {} / {}",
            file_id,
            barcode_path.display(),
            read_path.display()
        );

        let mut barcode_reader = FastqReader::new(open_fastq(barcode_path)?);
        let mut read_reader = FastqReader::new(open_fastq(read_path)?);

        let mut load = FileLoad {
            file_id,
            reads: Vec::new(),
            cbc_reads: AHashMap::new(),
            stats: LoadStats::default(),
        };
        let mut packed = Vec::new();

        loop {
            let barcode_record = barcode_reader.next();
            let read_record = read_reader.next();

            let (barcode_record, read_record) = match (barcode_record, read_record) {
                (None, None) => break,
                (Some(b), Some(r)) => (
                    b.with_context(|| format!("Failed to parse {}", barcode_path.display()))?,
                    r.with_context(|| format!("Failed to parse {}", read_path.display()))?,
                ),
                _ => bail!(
                    "Barcoded file pair has mismatched read counts: {} / {}",
                    barcode_path.display(),
                    read_path.display()
                ),
            };

            let barcode_seq = barcode_record.seq();
            if barcode_seq.len() < self.cbc_len {
                load.stats.skipped_short_barcode += 1;
                continue;
            }
            let Some(cbc) = encode_kmer(&barcode_seq[..self.cbc_len]) else {
                load.stats.skipped_invalid_cbc += 1;
                continue;
            };
            if let Some(accepted) = &self.predefined_cbcs {
                if !accepted.contains(&cbc) {
                    load.stats.skipped_unlisted_cbc += 1;
                    continue;
                }
            }

            let bases = read_record.seq();
            pack_bases(bases, &mut packed);

            let local_read_id = load.reads.len();
            load.reads.push(std::mem::take(&mut packed));
            load.cbc_reads.entry(cbc).or_default().push(encode_read_id(file_id, local_read_id));
            load.stats.reads_loaded += 1;
            load.stats.bases_loaded += bases.len() as u64;
        }

        Ok(load)
    }
}

/// Open a FASTQ file, decompressing when the path ends in `.gz`.
fn open_fastq(path: &Path) -> Result<Box<dyn Read + Send>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open FASTQ: {}", path.display()))?;
    let reader = BufReader::new(file);

    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(MultiGzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}
