//! Sorting and gathering of extracted k-mer pairs into counted triples.

use crate::extract::KmerPair;

/// A distinct (leader, follower) pair with its extraction count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PairCount {
    /// Leader k-mer encoding.
    pub leader: u64,
    /// Follower k-mer encoding.
    pub follower: u64,
    /// Number of extractions, clamped to the configured maximum.
    pub count: u32,
}

/// Sort `pairs` and collapse runs of equal pairs into counted triples.
///
/// `counts` is cleared first and receives one entry per distinct pair, in
/// ascending (leader, follower) order. Counts saturate at `max_count`;
/// the number of saturated triples is returned. `pairs` is drained so the
/// caller can reuse its allocation.
pub fn sort_and_gather(
    pairs: &mut Vec<KmerPair>,
    counts: &mut Vec<PairCount>,
    max_count: u32,
) -> u64 {
    // sort_unstable is a pattern-defeating quicksort, same family the
    // original counter used for this step.
    pairs.sort_unstable();

    counts.clear();
    let mut saturated = 0u64;

    for &KmerPair { leader, follower } in pairs.iter() {
        match counts.last_mut() {
            Some(last) if last.leader == leader && last.follower == follower => {
                if last.count < max_count {
                    last.count += 1;
                    if last.count == max_count {
                        saturated += 1;
                    }
                }
            }
            _ => {
                counts.push(PairCount { leader, follower, count: 1.min(max_count) });
            }
        }
    }

    pairs.clear();
    saturated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer::encode_kmer;

    fn pairs_of(specs: &[(&str, &str)]) -> Vec<KmerPair> {
        specs
            .iter()
            .map(|(l, f)| KmerPair {
                leader: encode_kmer(l.as_bytes()).unwrap(),
                follower: encode_kmer(f.as_bytes()).unwrap(),
            })
            .collect()
    }

    #[test]
    fn test_gather_counts_multiplicity() {
        let mut pairs = pairs_of(&[("ACG", "GCA"), ("TTT", "AAA"), ("ACG", "GCA")]);
        let mut counts = Vec::new();

        let saturated = sort_and_gather(&mut pairs, &mut counts, u32::MAX);

        assert_eq!(saturated, 0);
        assert!(pairs.is_empty());
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].leader, encode_kmer(b"ACG").unwrap());
        assert_eq!(counts[0].count, 2);
        assert_eq!(counts[1].leader, encode_kmer(b"TTT").unwrap());
        assert_eq!(counts[1].count, 1);
    }

    #[test]
    fn test_gather_orders_by_leader_then_follower() {
        let mut pairs = pairs_of(&[("TTT", "AAA"), ("ACG", "TTT"), ("ACG", "GCA")]);
        let mut counts = Vec::new();

        sort_and_gather(&mut pairs, &mut counts, u32::MAX);

        let order: Vec<(u64, u64)> = counts.iter().map(|c| (c.leader, c.follower)).collect();
        let mut sorted = order.clone();
        sorted.sort_unstable();
        assert_eq!(order, sorted);
        assert_eq!(counts.len(), 3);
    }

    #[test]
    fn test_gather_empty_input() {
        let mut pairs = Vec::new();
        let mut counts = vec![PairCount { leader: 1, follower: 2, count: 3 }];

        let saturated = sort_and_gather(&mut pairs, &mut counts, u32::MAX);

        assert_eq!(saturated, 0);
        assert!(counts.is_empty(), "stale counts are cleared");
    }

    #[test]
    fn test_gather_saturates_at_max_count() {
        // Nine identical pairs with max_count 3 clamp to a single record of 3
        let mut pairs = pairs_of(&[("ACG", "GCA"); 9]);
        let mut counts = Vec::new();

        let saturated = sort_and_gather(&mut pairs, &mut counts, 3);

        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].count, 3);
        assert_eq!(saturated, 1);
    }

    #[test]
    fn test_gather_sum_preserved_below_saturation() {
        let mut pairs = pairs_of(&[
            ("ACG", "GCA"),
            ("ACG", "GCA"),
            ("ACG", "TTT"),
            ("CCC", "GGG"),
            ("ACG", "GCA"),
        ]);
        let total = pairs.len() as u32;
        let mut counts = Vec::new();

        sort_and_gather(&mut pairs, &mut counts, u32::MAX);

        let sum: u32 = counts.iter().map(|c| c.count).sum();
        assert_eq!(sum, total);
        assert_eq!(counts.len(), 3);
    }
}
