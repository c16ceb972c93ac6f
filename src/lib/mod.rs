#![deny(unsafe_code)]
// Clippy lint configuration for CI
// These lints are allowed because:
// - cast_*: bit-packing code intentionally casts between numeric types
// - missing_errors_doc / missing_panics_doc: tracked separately
// - module_name_repetitions: types are named for their domain, not their module
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::uninlined_format_args
)]

//! # fgkmer - Barcoded K-mer Pair Counting Library
//!
//! This library counts co-occurrences of (leader, follower) k-mer pairs in
//! cell-barcoded sequencing reads and writes them as a sharded binary
//! record stream for downstream statistical analysis.
//!
//! ## Overview
//!
//! For every cell barcode (CBC), all (leader, follower) k-mer pairs at a
//! fixed spatial relationship (`leader_len` bases, a `gap_len`-base gap,
//! then `follower_len` bases) are extracted from the CBC's reads,
//! aggregated into per-pair counts, and routed to one of `no_splits`
//! output shards by hashing the leader.
//!
//! ## Module Organization
//!
//! ### Core pipeline
//!
//! - **[`kmer`]** - rolling 2-bit k-mer windows
//! - **[`anchors`]** - accepted-anchor dictionary gating leader emission
//! - **[`extract`]** - streaming (leader, follower) pair extraction
//! - **[`gather`]** - sort and run-length gather into counted records
//! - **[`counter`]** - barcode-partitioned parallel driver
//!
//! ### Input and output
//!
//! - **[`reads`]** - barcoded FASTQ loading, 3-bit read storage, CBC index
//! - **[`records`]** - fixed-width and shared-prefix record serialization
//! - **[`shard`]** - leader hashing and compressed shard sinks
//!
//! ### Utilities
//!
//! - **[`dna`]** - base code tables
//! - **[`errors`]** - structured error types
//! - **[`validation`]** - parameter and file validation
//! - **[`logging`]** / **[`progress`]** - formatted logs and progress tracking
//!
//! ## Quick Start
//!
//! ```no_run
//! use fgkmer_lib::counter::{PairCountConfig, count_pairs};
//! use fgkmer_lib::reads::ReadLoader;
//! use fgkmer_lib::shard::ShardSink;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = PairCountConfig { cbc_len: 16, ..PairCountConfig::default() };
//! config.validate()?;
//!
//! let loader = ReadLoader::new(config.cbc_len, config.threads);
//! let (store, index, _stats) =
//!     loader.load(&[("barcodes.fq".into(), "reads.fq".into())])?;
//!
//! let sinks: Vec<ShardSink> = (0..config.no_splits)
//!     .map(|i| ShardSink::create(format!("out.part_{i}"), 6))
//!     .collect::<Result<_, _>>()?;
//!
//! let stats = count_pairs(&config, &store, &index, None, &sinks)?;
//! for sink in &sinks {
//!     sink.finish()?;
//! }
//! println!("{} records", stats.records);
//! # Ok(())
//! # }
//! ```

pub mod anchors;
pub mod counter;
pub mod dna;
pub mod errors;
pub mod extract;
pub mod gather;
pub mod kmer;
pub mod logging;
pub mod progress;
pub mod reads;
pub mod records;
pub mod shard;
pub mod validation;

// Re-export the types most callers need
pub use anchors::AcceptedAnchors;
pub use counter::{PairCountConfig, PairCountStats, count_pairs};
pub use errors::{FgkmerError, Result};
pub use records::{PairRecord, RecordEncoding};
