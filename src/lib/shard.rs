//! Shard routing and shard file I/O.
//!
//! Every record is routed to one of `no_splits` output shards by hashing
//! its leader with a Murmur3 64-bit finalizer. The mix is fixed so that a
//! given leader lands in the same shard on every run with the same split
//! count, which lets downstream consumers process shards independently.
//!
//! # Shard file format
//!
//! A shard file is a sequence of gzip members ending with an empty
//! terminator member. Decompressing the whole file yields a sequence of
//! framed packed blocks, each a little-endian `u32` byte length followed by
//! that many bytes of encoded records (see [`crate::records`]). Each packed
//! block decodes independently. Blocks written by different threads may
//! interleave, but a frame is always contiguous.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use parking_lot::Mutex;

/// Murmur3 64-bit finalizer. Stable across runs and platforms.
#[inline]
#[must_use]
pub const fn fmix64(mut x: u64) -> u64 {
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
    x ^= x >> 33;
    x = x.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    x ^= x >> 33;
    x
}

/// Shard index for a leader k-mer encoding.
#[inline]
#[must_use]
pub fn shard_for_leader(leader: u64, no_splits: usize) -> usize {
    (fmix64(leader) % no_splits as u64) as usize
}

struct SinkInner {
    writer: BufWriter<File>,
    /// Reusable frame buffer: length header plus payload.
    frame: Vec<u8>,
}

/// One append-only shard output file.
///
/// `add_packed` is thread safe; workers share sinks by reference and each
/// append holds the sink lock for the duration of one compressed frame, so
/// frames from different threads never interleave internally.
pub struct ShardSink {
    path: PathBuf,
    level: Compression,
    inner: Mutex<SinkInner>,
}

impl ShardSink {
    /// Create (truncate) a shard file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, compression_level: u32) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self {
            path,
            level: Compression::new(compression_level.min(9)),
            inner: Mutex::new(SinkInner { writer: BufWriter::new(file), frame: Vec::new() }),
        })
    }

    /// Path of the shard file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one packed block as a compressed frame.
    ///
    /// Empty blocks are skipped so flushes of empty buffers cost nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if compression or the file write fails.
    pub fn add_packed(&self, packed: &[u8]) -> io::Result<()> {
        if packed.is_empty() {
            return Ok(());
        }

        let mut inner = self.inner.lock();
        let SinkInner { writer, frame } = &mut *inner;

        frame.clear();
        frame.extend_from_slice(&(packed.len() as u32).to_le_bytes());
        frame.extend_from_slice(packed);

        let mut encoder = GzEncoder::new(&mut *writer, self.level);
        encoder.write_all(frame)?;
        encoder.finish()?;
        Ok(())
    }

    /// Write the terminator member and flush buffered output.
    ///
    /// # Errors
    ///
    /// Returns an error if the final write or flush fails.
    pub fn finish(&self) -> io::Result<()> {
        let mut inner = self.inner.lock();
        let SinkInner { writer, .. } = &mut *inner;

        // Empty member marking a cleanly closed shard
        let encoder = GzEncoder::new(&mut *writer, self.level);
        encoder.finish()?;
        writer.flush()
    }
}

/// Read a shard file back into its packed blocks.
///
/// This is the inverse of [`ShardSink`] and is used by the dump command
/// and the round-trip tests.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid gzip data, or
/// the decompressed stream does not divide into whole frames.
pub fn read_packed_blocks<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<u8>>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open shard: {}", path.display()))?;

    if file.metadata().map(|m| m.len()).unwrap_or(0) == 0 {
        return Ok(Vec::new());
    }

    let mut stream = Vec::new();
    MultiGzDecoder::new(BufReader::new(file))
        .read_to_end(&mut stream)
        .with_context(|| format!("Failed to decompress shard: {}", path.display()))?;

    let mut blocks = Vec::new();
    let mut offset = 0;
    while offset < stream.len() {
        if offset + 4 > stream.len() {
            bail!("Truncated frame header in shard: {}", path.display());
        }
        let len = u32::from_le_bytes(stream[offset..offset + 4].try_into().expect("4 bytes"));
        offset += 4;

        let end = offset + len as usize;
        if end > stream.len() {
            bail!("Truncated frame payload in shard: {}", path.display());
        }
        blocks.push(stream[offset..end].to_vec());
        offset = end;
    }

    Ok(blocks)
}
