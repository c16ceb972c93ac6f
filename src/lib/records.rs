//! Pair record serialization.
//!
//! A record is the tuple `(sample_id, barcode, leader, follower, count)`.
//! Field byte widths are fixed per run: the k-mer fields take the minimum
//! whole bytes for their configured widths, and the sample id and counter
//! fields take the minimum whole bytes for their maximum values.
//!
//! Two encodings are supported:
//!
//! - **Fixed**: each record is the five fields serialized little-endian at
//!   their fixed widths, concatenated.
//! - **Compact**: each record is the five fields serialized big-endian and
//!   delta-compressed against the previous record as a one-byte shared
//!   prefix length followed by the differing suffix. Big-endian field order
//!   maximizes the shared prefix of sorted record streams. The prefix state
//!   resets at the start of every packed block, so blocks decode
//!   independently.

use crate::errors::{FgkmerError, Result};

/// One output record prior to serialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PairRecord {
    /// Sample tag written into every record of a run.
    pub sample_id: u64,
    /// Cell barcode encoding.
    pub barcode: u64,
    /// Leader k-mer encoding.
    pub leader: u64,
    /// Follower k-mer encoding.
    pub follower: u64,
    /// Clamped extraction count.
    pub count: u32,
}

/// Record serialization format, chosen once per run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordEncoding {
    /// Fixed-width little-endian fields.
    Fixed,
    /// Shared-prefix delta compression over big-endian fields.
    Compact,
}

/// Byte widths of the five record fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldWidths {
    /// Bytes for the sample id.
    pub sample_id: usize,
    /// Bytes for the barcode.
    pub barcode: usize,
    /// Bytes for the leader.
    pub leader: usize,
    /// Bytes for the follower.
    pub follower: usize,
    /// Bytes for the counter.
    pub counter: usize,
}

/// Minimum whole bytes needed to represent `max`.
#[inline]
#[must_use]
pub fn bytes_for(max: u64) -> usize {
    let bits = 64 - max.leading_zeros() as usize;
    bits.div_ceil(8).max(1)
}

impl FieldWidths {
    /// Compute widths for a run's geometry and maxima.
    #[must_use]
    pub fn for_run(
        sample_id: u64,
        cbc_len: usize,
        leader_len: usize,
        follower_len: usize,
        max_count: u32,
    ) -> Self {
        Self {
            sample_id: bytes_for(sample_id),
            barcode: (2 * cbc_len).div_ceil(8),
            leader: (2 * leader_len).div_ceil(8),
            follower: (2 * follower_len).div_ceil(8),
            counter: bytes_for(u64::from(max_count)),
        }
    }

    /// Serialized size of one record in bytes.
    #[inline]
    #[must_use]
    pub const fn record_bytes(&self) -> usize {
        self.sample_id + self.barcode + self.leader + self.follower + self.counter
    }
}

/// Append the low `n` bytes of `x`, least-significant byte first.
#[inline]
pub fn append_int_lsb(buf: &mut Vec<u8>, x: u64, n: usize) {
    buf.extend_from_slice(&x.to_le_bytes()[..n]);
}

/// Append the low `n` bytes of `x`, most-significant byte first.
#[inline]
pub fn append_int_msb(buf: &mut Vec<u8>, x: u64, n: usize) {
    buf.extend_from_slice(&x.to_be_bytes()[8 - n..]);
}

/// Read `n` little-endian bytes as an integer.
#[inline]
#[must_use]
pub fn read_int_lsb(buf: &[u8], n: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes[..n].copy_from_slice(&buf[..n]);
    u64::from_le_bytes(bytes)
}

/// Read `n` big-endian bytes as an integer.
#[inline]
#[must_use]
pub fn read_int_msb(buf: &[u8], n: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes[8 - n..].copy_from_slice(&buf[..n]);
    u64::from_be_bytes(bytes)
}

/// Serializer for batches of records into packed blocks.
#[derive(Clone, Debug)]
pub struct RecordPacker {
    widths: FieldWidths,
    encoding: RecordEncoding,
}

impl RecordPacker {
    /// Create a packer for the given widths and encoding.
    #[must_use]
    pub const fn new(widths: FieldWidths, encoding: RecordEncoding) -> Self {
        Self { widths, encoding }
    }

    /// Field widths this packer serializes with.
    #[must_use]
    pub const fn widths(&self) -> &FieldWidths {
        &self.widths
    }

    /// Serialize `records` into `packed`, replacing its contents.
    ///
    /// Each call produces one self-contained block: for the compact
    /// encoding, the first record carries no shared prefix.
    pub fn pack(&self, records: &[PairRecord], packed: &mut Vec<u8>) {
        packed.clear();
        match self.encoding {
            RecordEncoding::Fixed => self.pack_fixed(records, packed),
            RecordEncoding::Compact => self.pack_compact(records, packed),
        }
    }

    fn pack_fixed(&self, records: &[PairRecord], packed: &mut Vec<u8>) {
        let w = &self.widths;
        packed.reserve(records.len() * w.record_bytes());
        for record in records {
            append_int_lsb(packed, record.sample_id, w.sample_id);
            append_int_lsb(packed, record.barcode, w.barcode);
            append_int_lsb(packed, record.leader, w.leader);
            append_int_lsb(packed, record.follower, w.follower);
            append_int_lsb(packed, u64::from(record.count), w.counter);
        }
    }

    fn pack_compact(&self, records: &[PairRecord], packed: &mut Vec<u8>) {
        let mut prev: Vec<u8> = Vec::with_capacity(self.widths.record_bytes());
        let mut curr: Vec<u8> = Vec::with_capacity(self.widths.record_bytes());

        for record in records {
            curr.clear();
            self.serialize_msb(record, &mut curr);

            // Shared prefix length is capped by the one-byte header; record
            // widths never approach that limit in practice.
            let shared = prev
                .iter()
                .zip(curr.iter())
                .take_while(|(a, b)| a == b)
                .count()
                .min(usize::from(u8::MAX));
            packed.push(shared as u8);
            packed.extend_from_slice(&curr[shared..]);

            std::mem::swap(&mut prev, &mut curr);
        }
    }

    fn serialize_msb(&self, record: &PairRecord, buf: &mut Vec<u8>) {
        let w = &self.widths;
        append_int_msb(buf, record.sample_id, w.sample_id);
        append_int_msb(buf, record.barcode, w.barcode);
        append_int_msb(buf, record.leader, w.leader);
        append_int_msb(buf, record.follower, w.follower);
        append_int_msb(buf, u64::from(record.count), w.counter);
    }
}

/// Deserializer for packed blocks, the inverse of [`RecordPacker`].
#[derive(Clone, Debug)]
pub struct RecordDecoder {
    widths: FieldWidths,
    encoding: RecordEncoding,
}

impl RecordDecoder {
    /// Create a decoder for the given widths and encoding.
    #[must_use]
    pub const fn new(widths: FieldWidths, encoding: RecordEncoding) -> Self {
        Self { widths, encoding }
    }

    /// Decode one packed block, appending records to `records`.
    ///
    /// # Errors
    ///
    /// Returns an error when the block does not divide into whole records
    /// or a shared-prefix header is inconsistent.
    pub fn unpack(&self, block: &[u8], records: &mut Vec<PairRecord>) -> Result<()> {
        match self.encoding {
            RecordEncoding::Fixed => self.unpack_fixed(block, records),
            RecordEncoding::Compact => self.unpack_compact(block, records),
        }
    }

    fn unpack_fixed(&self, block: &[u8], records: &mut Vec<PairRecord>) -> Result<()> {
        let record_bytes = self.widths.record_bytes();
        if block.len() % record_bytes != 0 {
            return Err(FgkmerError::MalformedBlock {
                reason: format!(
                    "{} bytes is not a multiple of the {record_bytes}-byte record size",
                    block.len()
                ),
            });
        }

        let w = &self.widths;
        for chunk in block.chunks_exact(record_bytes) {
            let mut offset = 0;
            let mut field = |n: usize| {
                let value = read_int_lsb(&chunk[offset..], n);
                offset += n;
                value
            };
            records.push(PairRecord {
                sample_id: field(w.sample_id),
                barcode: field(w.barcode),
                leader: field(w.leader),
                follower: field(w.follower),
                count: field(w.counter) as u32,
            });
        }
        Ok(())
    }

    fn unpack_compact(&self, block: &[u8], records: &mut Vec<PairRecord>) -> Result<()> {
        let record_bytes = self.widths.record_bytes();
        let mut prev: Vec<u8> = Vec::with_capacity(record_bytes);
        let mut offset = 0;

        while offset < block.len() {
            let shared = usize::from(block[offset]);
            offset += 1;

            if shared > prev.len() {
                return Err(FgkmerError::MalformedBlock {
                    reason: format!(
                        "shared prefix of {shared} bytes exceeds previous record of {} bytes",
                        prev.len()
                    ),
                });
            }
            let suffix_len = record_bytes - shared;
            if offset + suffix_len > block.len() {
                return Err(FgkmerError::MalformedBlock {
                    reason: "record suffix extends past the end of the block".to_string(),
                });
            }

            prev.truncate(shared);
            prev.extend_from_slice(&block[offset..offset + suffix_len]);
            offset += suffix_len;

            records.push(self.deserialize_msb(&prev));
        }
        Ok(())
    }

    fn deserialize_msb(&self, buf: &[u8]) -> PairRecord {
        let w = &self.widths;
        let mut offset = 0;
        let mut field = |n: usize| {
            let value = read_int_msb(&buf[offset..], n);
            offset += n;
            value
        };
        PairRecord {
            sample_id: field(w.sample_id),
            barcode: field(w.barcode),
            leader: field(w.leader),
            follower: field(w.follower),
            count: field(w.counter) as u32,
        }
    }
}
