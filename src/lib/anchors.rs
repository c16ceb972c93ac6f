//! Accepted-anchor dictionary.
//!
//! An [`AcceptedAnchors`] set gates pair emission on the leader k-mer. The
//! set is built once at startup from a dictionary file (one k-mer per
//! whitespace-delimited token) and is read-only afterwards, so worker
//! threads share it by reference without locking.

use std::fs;
use std::path::Path;

use ahash::AHashSet;
use anyhow::{Context, Result};

use crate::errors::FgkmerError;
use crate::kmer::encode_kmer;

/// A set of accepted leader k-mer encodings, all of the same length.
#[derive(Clone, Debug)]
pub struct AcceptedAnchors {
    anchors: AHashSet<u64>,
    kmer_len: usize,
}

impl AcceptedAnchors {
    /// Build a set from pre-encoded k-mers of width `kmer_len`.
    #[must_use]
    pub fn new(kmers: impl IntoIterator<Item = u64>, kmer_len: usize) -> Self {
        Self { anchors: kmers.into_iter().collect(), kmer_len }
    }

    /// Build a set from k-mer strings, validating width and alphabet.
    ///
    /// # Errors
    ///
    /// Returns an error for any entry whose length differs from `kmer_len`
    /// or that contains a base other than A/C/G/T (case-insensitive).
    pub fn from_strings<'a>(
        entries: impl IntoIterator<Item = &'a str>,
        kmer_len: usize,
    ) -> std::result::Result<Self, FgkmerError> {
        let mut anchors = AHashSet::new();
        for entry in entries {
            if entry.len() != kmer_len {
                return Err(FgkmerError::InvalidAnchor {
                    anchor: entry.to_string(),
                    reason: format!("length {} does not match leader length {kmer_len}", entry.len()),
                });
            }
            let encoded =
                encode_kmer(entry.as_bytes()).ok_or_else(|| FgkmerError::InvalidAnchor {
                    anchor: entry.to_string(),
                    reason: "contains a non-ACGT base".to_string(),
                })?;
            anchors.insert(encoded);
        }
        Ok(Self { anchors, kmer_len })
    }

    /// Load a dictionary file: one k-mer per whitespace-delimited token.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or any entry is invalid.
    pub fn from_path<P: AsRef<Path>>(path: P, kmer_len: usize) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read anchor dictionary: {}", path.display()))?;
        let anchors = Self::from_strings(contents.split_whitespace(), kmer_len)
            .with_context(|| format!("Invalid anchor dictionary: {}", path.display()))?;
        Ok(anchors)
    }

    /// True if the encoded k-mer is in the set.
    #[inline]
    #[must_use]
    pub fn is_accepted(&self, kmer: u64) -> bool {
        self.anchors.contains(&kmer)
    }

    /// K-mer width of the dictionary entries.
    #[inline]
    #[must_use]
    pub const fn kmer_len(&self) -> usize {
        self.kmer_len
    }

    /// Number of accepted anchors.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    /// True if the set contains no anchors.
    ///
    /// An explicitly configured empty set rejects every leader; this is
    /// distinct from running without a set, which accepts every leader.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}
