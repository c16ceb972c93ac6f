//! Common CLI options shared across commands.
//!
//! This module provides shared argument structures that can be composed into
//! command structs using `#[command(flatten)]`.

use clap::{Args, ValueEnum};
use fgkmer_lib::records::RecordEncoding;

/// Record serialization format.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RecordEncodingArg {
    /// Fixed-width little-endian fields
    Fixed,
    /// Shared-prefix delta compression (smaller for sorted records)
    Compact,
}

impl From<RecordEncodingArg> for RecordEncoding {
    fn from(arg: RecordEncodingArg) -> Self {
        match arg {
            RecordEncodingArg::Fixed => RecordEncoding::Fixed,
            RecordEncodingArg::Compact => RecordEncoding::Compact,
        }
    }
}

/// Record geometry options shared by the writer and the decoder.
///
/// The decoder has no header to read field widths from, so both sides
/// derive them from the same parameters.
#[derive(Debug, Clone, Args)]
pub struct RecordOptions {
    /// Cell barcode length in bases (1-32)
    #[arg(long = "cbc-len", default_value = "16")]
    pub cbc_len: usize,

    /// Leader k-mer length in bases (1-32)
    #[arg(short = 'l', long = "leader-len", default_value = "27")]
    pub leader_len: usize,

    /// Follower k-mer length in bases (1-32)
    #[arg(short = 'f', long = "follower-len", default_value = "27")]
    pub follower_len: usize,

    /// Saturation value for pair counts; also fixes the counter field width
    #[arg(long = "max-count", default_value = "65535")]
    pub max_count: u32,

    /// Sample id written into every record; also fixes the field width
    #[arg(long = "sample-id", default_value = "0")]
    pub sample_id: u64,

    /// Record serialization format
    #[arg(long = "encoding", value_enum, default_value = "compact")]
    pub encoding: RecordEncodingArg,
}

impl RecordOptions {
    /// Field widths implied by these options.
    #[must_use]
    pub fn field_widths(&self) -> fgkmer_lib::records::FieldWidths {
        fgkmer_lib::records::FieldWidths::for_run(
            self.sample_id,
            self.cbc_len,
            self.leader_len,
            self.follower_len,
            self.max_count,
        )
    }
}

/// Compression options for shard output.
#[derive(Debug, Clone, Args)]
pub struct CompressionOptions {
    /// Compression level for shard files (0-9)
    #[arg(short = 'c', long = "compression-level", default_value = "6")]
    pub compression_level: u32,
}
