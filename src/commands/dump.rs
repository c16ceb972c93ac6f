//! Decode shard files to tab-separated text.
//!
//! The binary record stream is compact but opaque; downstream merge and
//! filter scripts consume a five-column text form instead:
//!
//! ```text
//! sample_id  cbc  leader  follower  count
//! ```
//!
//! with the DNA fields rendered as uppercase strings. The decoder has no
//! header to read field widths from, so the geometry options must match
//! the run that produced the shards.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use fgkmer_lib::kmer::kmer_to_string;
use fgkmer_lib::logging::format_count;
use fgkmer_lib::records::{PairRecord, RecordDecoder};
use fgkmer_lib::shard::read_packed_blocks;
use fgkmer_lib::validation::{validate_file_exists, validate_kmer_len};

use crate::commands::command::Command;
use crate::commands::common::RecordOptions;

/// Decode shard files to tab-separated text.
#[derive(Debug, Parser)]
#[command(
    name = "dump",
    about = "\x1b[36mDecode shard files to tab-separated text\x1b[0m",
    long_about = r#"
Decode one or more shard files written by `fgkmer pairs` into five-column
tab-separated text: sample_id, cbc, leader, follower, count, with the DNA
fields as strings.

The record format carries no header, so the geometry options (--cbc-len,
--leader-len, --follower-len, --max-count, --sample-id, --encoding) must
match the values used when the shards were written.

EXAMPLES:

  # Decode every shard of a run to one text file
  fgkmer dump -i counts.part_* -o counts.txt

  # Stream a single shard to stdout
  fgkmer dump -i counts.part_0
"#
)]
pub struct Dump {
    /// Shard files to decode
    #[arg(short = 'i', long = "input", num_args = 1.., required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output text file (stdout when omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Record geometry, matching the producing run.
    #[command(flatten)]
    pub record: RecordOptions,
}

impl Dump {
    fn write_records<W: Write>(&self, writer: &mut W) -> Result<u64> {
        let decoder = RecordDecoder::new(self.record.field_widths(), self.record.encoding.into());

        let mut total = 0u64;
        let mut records: Vec<PairRecord> = Vec::new();
        for input in &self.inputs {
            for block in read_packed_blocks(input)? {
                records.clear();
                decoder
                    .unpack(&block, &mut records)
                    .with_context(|| format!("Failed to decode {}", input.display()))?;
                for record in &records {
                    writeln!(
                        writer,
                        "{}\t{}\t{}\t{}\t{}",
                        record.sample_id,
                        kmer_to_string(record.barcode, self.record.cbc_len),
                        kmer_to_string(record.leader, self.record.leader_len),
                        kmer_to_string(record.follower, self.record.follower_len),
                        record.count
                    )?;
                }
                total += records.len() as u64;
            }
        }
        Ok(total)
    }
}

impl Command for Dump {
    fn execute(&self) -> Result<()> {
        validate_kmer_len(self.record.cbc_len, "cbc-len")?;
        validate_kmer_len(self.record.leader_len, "leader-len")?;
        validate_kmer_len(self.record.follower_len, "follower-len")?;
        for input in &self.inputs {
            validate_file_exists(input, "Shard")?;
        }

        let total = match &self.output {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create output: {}", path.display()))?;
                let mut writer = BufWriter::new(file);
                let total = self.write_records(&mut writer)?;
                writer.flush()?;
                total
            }
            None => {
                let stdout = std::io::stdout();
                let mut writer = BufWriter::new(stdout.lock());
                let total = self.write_records(&mut writer)?;
                writer.flush()?;
                total
            }
        };

        info!(
            "Dumped {} records from {} shard(s)",
            format_count(total),
            self.inputs.len()
        );
        Ok(())
    }
}
