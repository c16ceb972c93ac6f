//! Streaming extraction of (leader, follower) k-mer pairs from reads.
//!
//! A pair is emitted at read position `p` when the `leader_len` bases at `p`
//! and the `follower_len` bases at `p + leader_len + gap_len` are all valid,
//! and the leader passes the accepted-anchor set when one is configured.
//! The bases inside the gap do not need to be valid.
//!
//! Extraction is a single left-to-right scan with two rolling
//! [`KmerWindow`]s offset by `leader_len + gap_len`. Each step feeds one new
//! base to each window; an invalid base resets only the window it lands in.

use crate::anchors::AcceptedAnchors;
use crate::kmer::KmerWindow;

/// A (leader, follower) pair of 2-bit k-mer encodings.
///
/// The derived ordering sorts by leader first, then follower, which is the
/// order records are gathered and packed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KmerPair {
    /// Leader k-mer encoding.
    pub leader: u64,
    /// Follower k-mer encoding.
    pub follower: u64,
}

/// Extractor for a fixed (leader_len, gap_len, follower_len) geometry.
#[derive(Clone, Copy, Debug)]
pub struct PairExtractor {
    leader_len: usize,
    follower_len: usize,
    gap_len: usize,
}

impl PairExtractor {
    /// Create an extractor; widths are validated by the run configuration.
    #[must_use]
    pub const fn new(leader_len: usize, follower_len: usize, gap_len: usize) -> Self {
        Self { leader_len, follower_len, gap_len }
    }

    /// Minimum read length that can produce a pair.
    #[inline]
    #[must_use]
    pub const fn span(&self) -> usize {
        self.leader_len + self.gap_len + self.follower_len
    }

    /// Append all pairs from `bases` to `pairs`.
    ///
    /// Reads shorter than [`span`](Self::span) produce nothing. When
    /// `anchors` is Some, only pairs whose leader is in the set are emitted;
    /// when None, every pair with two full windows is emitted.
    pub fn extract_into(
        &self,
        bases: &[u8],
        anchors: Option<&AcceptedAnchors>,
        pairs: &mut Vec<KmerPair>,
    ) {
        let read_len = bases.len();
        if read_len < self.span() {
            return;
        }

        let mut leader = KmerWindow::new(self.leader_len);
        let mut follower = KmerWindow::new(self.follower_len);
        let follower_start = self.leader_len + self.gap_len;

        // Pre-fill both windows up to one base short of full, so the main
        // loop completes a window pair on every step.
        for &base in &bases[..self.leader_len - 1] {
            leader.push_base(base);
        }
        for &base in &bases[follower_start..follower_start + self.follower_len - 1] {
            follower.push_base(base);
        }

        let offset = self.follower_len + self.gap_len;
        for i in (follower_start + self.follower_len - 1)..read_len {
            follower.push_base(bases[i]);
            leader.push_base(bases[i - offset]);

            if leader.is_full()
                && follower.is_full()
                && anchors.is_none_or(|set| set.is_accepted(leader.value()))
            {
                pairs.push(KmerPair { leader: leader.value(), follower: follower.value() });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer::encode_kmer;

    fn extract(
        extractor: &PairExtractor,
        bases: &[u8],
        anchors: Option<&AcceptedAnchors>,
    ) -> Vec<KmerPair> {
        let mut pairs = Vec::new();
        extractor.extract_into(bases, anchors, &mut pairs);
        pairs
    }

    fn pair(leader: &[u8], follower: &[u8]) -> KmerPair {
        KmerPair {
            leader: encode_kmer(leader).unwrap(),
            follower: encode_kmer(follower).unwrap(),
        }
    }

    #[test]
    fn test_single_position_read() {
        // Read length equals the span, so exactly one position is scanned
        let extractor = PairExtractor::new(3, 3, 2);
        let pairs = extract(&extractor, b"ACGTTGCA", None);
        assert_eq!(pairs, vec![pair(b"ACG", b"GCA")]);
    }

    #[test]
    fn test_read_one_base_short() {
        let extractor = PairExtractor::new(3, 3, 2);
        assert!(extract(&extractor, b"ACGTTGC", None).is_empty());
        assert!(extract(&extractor, b"", None).is_empty());
    }

    #[test]
    fn test_every_position_emits() {
        let extractor = PairExtractor::new(2, 2, 1);
        let bases = b"ACGTAC";
        let pairs = extract(&extractor, bases, None);
        assert_eq!(
            pairs,
            vec![pair(b"AC", b"TA"), pair(b"CG", b"AC")],
            "positions 0 and 1 both have full windows"
        );
    }

    #[test]
    fn test_invalid_base_in_leader_blocks_emission() {
        let extractor = PairExtractor::new(3, 3, 2);
        assert!(extract(&extractor, b"ACNTTGCA", None).is_empty());
    }

    #[test]
    fn test_invalid_base_in_follower_blocks_emission() {
        let extractor = PairExtractor::new(3, 3, 2);
        assert!(extract(&extractor, b"ACGTTGNA", None).is_empty());
    }

    #[test]
    fn test_invalid_base_in_gap_is_allowed() {
        let extractor = PairExtractor::new(3, 3, 2);
        let pairs = extract(&extractor, b"ACGNNGCA", None);
        assert_eq!(pairs, vec![pair(b"ACG", b"GCA")]);
    }

    #[test]
    fn test_windows_recover_after_invalid_base() {
        // The N kills positions whose leader or follower overlaps it; later
        // positions emit again once both windows refill.
        let extractor = PairExtractor::new(2, 2, 0);
        let pairs = extract(&extractor, b"ACNACGT", None);
        assert_eq!(pairs, vec![pair(b"AC", b"GT")]);
    }

    #[test]
    fn test_anchor_filtering() {
        let extractor = PairExtractor::new(3, 3, 2);
        let anchors = AcceptedAnchors::from_strings(["ACG"], 3).unwrap();
        let bases = b"ACGTTGCATGCTTACG";

        let filtered = extract(&extractor, bases, Some(&anchors));
        assert_eq!(filtered, vec![pair(b"ACG", b"GCA")]);

        // Without the set, every full-window position emits
        let unfiltered = extract(&extractor, bases, None);
        assert_eq!(unfiltered.len(), bases.len() - extractor.span() + 1);
        assert!(unfiltered.contains(&pair(b"ACG", b"GCA")));
    }

    #[test]
    fn test_empty_anchor_set_blocks_all() {
        let extractor = PairExtractor::new(3, 3, 2);
        let anchors = AcceptedAnchors::from_strings([], 3).unwrap();
        assert!(extract(&extractor, b"ACGTTGCA", Some(&anchors)).is_empty());
    }

    #[test]
    fn test_zero_gap() {
        let extractor = PairExtractor::new(4, 4, 0);
        let pairs = extract(&extractor, b"ACGTTGCA", None);
        assert_eq!(pairs, vec![pair(b"ACGT", b"TGCA")]);
    }

    #[test]
    fn test_single_base_windows() {
        let extractor = PairExtractor::new(1, 1, 1);
        let pairs = extract(&extractor, b"ACG", None);
        assert_eq!(pairs, vec![pair(b"A", b"G")]);
    }
}
