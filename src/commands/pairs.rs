//! Count (leader, follower) k-mer pairs per cell barcode.
//!
//! This module implements the `pairs` command: it loads barcoded FASTQ file
//! pairs, builds the per-CBC read index, extracts and counts k-mer pairs
//! for every CBC in parallel, and writes the counted records to sharded
//! compressed output files.

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use fgkmer_lib::anchors::AcceptedAnchors;
use fgkmer_lib::counter::{PairCountConfig, count_pairs};
use fgkmer_lib::logging::{OperationTimer, format_count};
use fgkmer_lib::reads::{ReadLoader, read_predefined_cbcs};
use fgkmer_lib::shard::ShardSink;
use fgkmer_lib::validation::validate_file_exists;

use crate::commands::command::Command;
use crate::commands::common::{CompressionOptions, RecordOptions};

/// Count co-occurring k-mer pairs in barcoded reads.
///
/// Extracts, for every cell barcode, all (leader, follower) k-mer pairs at
/// a fixed spatial relationship within the barcode's reads, and writes the
/// aggregated counts as sharded binary records.
#[derive(Debug, Parser)]
#[command(
    name = "pairs",
    about = "\x1b[36mCount co-occurring k-mer pairs per cell barcode into sharded records\x1b[0m",
    long_about = r#"
Count co-occurring (leader, follower) k-mer pairs in barcoded reads.

INPUT:

  The input list is a text file with one entry per line of the form

      barcodes.fastq,reads.fastq

  The first file of each pair carries the cell barcode (CBC) in its leading
  bases; the second carries the sequence that is scanned for k-mer pairs.
  Files ending in .gz are decompressed on the fly.

EXTRACTION:

  At every read position, a pair is formed from the leader k-mer and the
  follower k-mer that starts gap-len bases after the leader ends. Positions
  where either k-mer covers a non-ACGT base emit nothing. With an anchor
  dictionary (-d), only pairs whose leader is in the dictionary are kept.

OUTPUT:

  Counted records (sample_id, cbc, leader, follower, count) are routed to
  one of --splits shard files by a stable hash of the leader, so all records
  for a leader land in the same shard on every run. Use `fgkmer dump` to
  decode shards to text.

EXAMPLES:

  # Count 27-mer pairs with no gap, eight shards
  fgkmer pairs -i input_list.txt -o counts --threads 8

  # Gapped pairs, restricted to an anchor dictionary
  fgkmer pairs -i input_list.txt -o counts -l 18 -f 12 --gap-len 5 \
    -d anchors.txt
"#
)]
pub struct Pairs {
    /// Text file listing comma-separated barcode,read FASTQ pairs
    #[arg(short = 'i', long = "input-list")]
    pub input_list: PathBuf,

    /// Output shard file prefix; shards are written as <prefix>.part_<N>
    #[arg(short = 'o', long = "output")]
    pub output: String,

    /// Accepted-anchor dictionary (one leader k-mer per line); when absent
    /// every leader is accepted
    #[arg(short = 'd', long = "anchors")]
    pub anchors: Option<PathBuf>,

    /// Restrict counting to cell barcodes listed in this file
    #[arg(long = "predefined-cbc")]
    pub predefined_cbc: Option<PathBuf>,

    /// Bases skipped between the leader and the follower
    #[arg(short = 'g', long = "gap-len", default_value = "0")]
    pub gap_len: usize,

    /// Record geometry (k-mer widths, barcode width, counter saturation).
    #[command(flatten)]
    pub record: RecordOptions,

    /// Number of output shards
    #[arg(short = 's', long = "splits", default_value = "8")]
    pub splits: usize,

    /// Number of worker threads
    #[arg(short = '@', short_alias = 't', long = "threads", default_value = "4")]
    pub threads: usize,

    /// Flush threshold per (thread, shard) record buffer
    #[arg(long = "buffer-records", default_value = "65536")]
    pub buffer_records: usize,

    /// Compression options for shard output.
    #[command(flatten)]
    pub compression: CompressionOptions,

    /// Free per-barcode scratch memory after every barcode. Slower, but
    /// lowers the peak footprint on very large runs.
    #[arg(long = "aggressive-reclaim", default_value = "false")]
    pub aggressive_reclaim: bool,
}

/// Parse the input list file: one `barcodes,reads` pair per whitespace token.
fn parse_input_list(path: &Path) -> Result<Vec<(PathBuf, PathBuf)>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read input list: {}", path.display()))?;

    let mut pairs = Vec::new();
    for token in contents.split_whitespace() {
        let Some((barcode, read)) = token.split_once(',') else {
            bail!("Wrong line in input list (expected 'barcodes.fq,reads.fq'): {token}");
        };
        pairs.push((PathBuf::from(barcode), PathBuf::from(read)));
    }
    if pairs.is_empty() {
        bail!("Input list is empty: {}", path.display());
    }
    Ok(pairs)
}

impl Pairs {
    fn config(&self) -> PairCountConfig {
        PairCountConfig {
            leader_len: self.record.leader_len,
            follower_len: self.record.follower_len,
            gap_len: self.gap_len,
            cbc_len: self.record.cbc_len,
            sample_id: self.record.sample_id,
            no_splits: self.splits,
            threads: self.threads,
            max_count: self.record.max_count,
            max_records_in_buffer: self.buffer_records,
            encoding: self.record.encoding.into(),
            aggressive_reclaim: self.aggressive_reclaim,
        }
    }
}

impl Command for Pairs {
    fn execute(&self) -> Result<()> {
        validate_file_exists(&self.input_list, "Input list")?;

        let config = self.config();
        config.validate()?;

        let file_pairs = parse_input_list(&self.input_list)?;
        for (barcode_path, read_path) in &file_pairs {
            validate_file_exists(barcode_path, "Barcode FASTQ")?;
            validate_file_exists(read_path, "Read FASTQ")?;
        }

        info!("Starting pairs");
        info!("Input list: {} ({} file pairs)", self.input_list.display(), file_pairs.len());
        info!("Output prefix: {}", self.output);
        info!(
            "Geometry: leader {} / gap {} / follower {}, CBC {}",
            config.leader_len, config.gap_len, config.follower_len, config.cbc_len
        );
        info!("Shards: {}, threads: {}", config.no_splits, config.threads);

        // Anchor dictionary, built once and shared read-only by the workers
        let anchors = match &self.anchors {
            Some(path) => {
                let set = AcceptedAnchors::from_path(path, config.leader_len)?;
                info!("Accepted anchors: {} from {}", format_count(set.len() as u64), path.display());
                Some(set)
            }
            None => None,
        };

        let mut loader = ReadLoader::new(config.cbc_len, config.threads);
        if let Some(path) = &self.predefined_cbc {
            let cbcs = read_predefined_cbcs(path, config.cbc_len)?;
            info!("Predefined CBCs: {} from {}", format_count(cbcs.len() as u64), path.display());
            loader = loader.with_predefined_cbcs(cbcs);
        }

        let timer = OperationTimer::new("Loading reads");
        let (store, index, load_stats) = loader.load(&file_pairs)?;
        timer.log_completion(load_stats.reads_loaded);
        info!("Loaded bases: {}", format_count(load_stats.bases_loaded));
        info!("Distinct CBCs: {}", format_count(index.len() as u64));
        let skipped = load_stats.skipped_short_barcode
            + load_stats.skipped_invalid_cbc
            + load_stats.skipped_unlisted_cbc;
        if skipped > 0 {
            info!(
                "Skipped reads: {} short barcode, {} invalid CBC, {} not in predefined list",
                format_count(load_stats.skipped_short_barcode),
                format_count(load_stats.skipped_invalid_cbc),
                format_count(load_stats.skipped_unlisted_cbc),
            );
        }

        let sinks: Vec<ShardSink> = (0..config.no_splits)
            .map(|i| {
                ShardSink::create(
                    format!("{}.part_{i}", self.output),
                    self.compression.compression_level,
                )
            })
            .collect::<std::io::Result<_>>()
            .context("Failed to create shard files")?;

        let timer = OperationTimer::new("Counting k-mer pairs");
        let stats = count_pairs(&config, &store, &index, anchors.as_ref(), &sinks)?;
        for sink in &sinks {
            sink.finish()
                .with_context(|| format!("Failed to finish shard {}", sink.path().display()))?;
        }
        timer.log_completion(stats.cbcs);

        // Summary
        info!("=== Summary ===");
        info!("CBCs processed: {}", format_count(stats.cbcs));
        info!("Pair records: {}", format_count(stats.records));
        info!("Sum of pair counts: {}", format_count(stats.sum_counts));
        if stats.saturated > 0 {
            info!("Saturated counts: {}", format_count(stats.saturated));
        }
        info!("Output: {}.part_0 .. {}.part_{}", self.output, self.output, config.no_splits - 1);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_parse_input_list() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.txt");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "a_bc.fq,a_rd.fq\nb_bc.fq.gz,b_rd.fq.gz").unwrap();

        let pairs = parse_input_list(&path).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], (PathBuf::from("a_bc.fq"), PathBuf::from("a_rd.fq")));
        assert_eq!(pairs[1].1, PathBuf::from("b_rd.fq.gz"));
    }

    #[test]
    fn test_parse_input_list_rejects_missing_comma() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.txt");
        fs::write(&path, "just_one_file.fq\n").unwrap();

        let msg = parse_input_list(&path).unwrap_err().to_string();
        assert!(msg.contains("Wrong line"));
    }

    #[test]
    fn test_parse_input_list_rejects_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.txt");
        fs::write(&path, "\n").unwrap();
        assert!(parse_input_list(&path).is_err());
    }
}
