use crate::vocab::Vocabulary;

/// Number of entries in a full-size sampling table.
pub const TABLE_SIZE: usize = 100_000_000;

/// Index table for drawing negative samples.
///
/// Vocabulary index `i` occupies a share of the table proportional to
/// `count(i)^0.75`, so a uniform draw over table slots yields the smoothed
/// unigram distribution used by negative sampling.
pub struct UnigramTable {
    table: Vec<u32>,
}

impl UnigramTable {
    const POWER: f64 = 0.75;

    pub fn build(vocab: &Vocabulary) -> UnigramTable {
        UnigramTable::with_size(vocab, TABLE_SIZE)
    }

    pub(crate) fn with_size(vocab: &Vocabulary, size: usize) -> UnigramTable {
        let entries = vocab.entries();
        let total: f64 = entries
            .iter()
            .map(|e| (e.count as f64).powf(Self::POWER))
            .sum();

        let mut table = vec![0u32; size];
        let mut i = 0usize;
        let mut d1 = (entries[0].count as f64).powf(Self::POWER) / total;
        for (a, slot) in table.iter_mut().enumerate() {
            *slot = i as u32;
            if a as f64 / size as f64 > d1 {
                i += 1;
                if i >= entries.len() {
                    i = entries.len() - 1;
                }
                d1 += (entries[i].count as f64).powf(Self::POWER) / total;
            }
        }
        UnigramTable { table }
    }

    /// Draw a vocabulary index from a raw PRNG value. The shift and the
    /// remainder follow signed 64-bit semantics.
    pub fn sample(&self, r: i64) -> usize {
        let size = self.table.len() as i64;
        let idx = (((r >> 16) % size) + size) % size;
        self.table[idx as usize] as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vocab(counts: &[(&str, u64)]) -> Vocabulary {
        let map: HashMap<String, u64> =
            counts.iter().map(|&(t, c)| (t.to_string(), c)).collect();
        Vocabulary::from_counts(map, 0)
    }

    #[test]
    fn mass_follows_smoothed_counts() {
        let v = vocab(&[("a", 1000), ("b", 100), ("c", 10)]);
        let table = UnigramTable::with_size(&v, 100_000);

        let mut occupancy = [0usize; 3];
        for &slot in &table.table {
            occupancy[slot as usize] += 1;
        }

        let total: f64 = [1000f64, 100.0, 10.0].iter().map(|c| c.powf(0.75)).sum();
        for (i, &count) in [1000u64, 100, 10].iter().enumerate() {
            let expected = (count as f64).powf(0.75) / total;
            let actual = occupancy[i] as f64 / table.table.len() as f64;
            assert!(
                (expected - actual).abs() < 0.01,
                "index {i}: expected {expected}, got {actual}"
            );
        }
    }

    #[test]
    fn all_entries_are_valid_indexes() {
        let v = vocab(&[("a", 5), ("b", 4), ("c", 3), ("d", 2), ("e", 1)]);
        let table = UnigramTable::with_size(&v, 10_000);
        assert_eq!(table.table.len(), 10_000);
        assert!(table.table.iter().all(|&i| (i as usize) < v.len()));
    }

    #[test]
    fn table_starts_with_the_most_frequent_token() {
        let v = vocab(&[("a", 100), ("b", 1)]);
        let table = UnigramTable::with_size(&v, 1_000);
        assert_eq!(table.table[0], 0);
        assert_eq!(*table.table.last().unwrap(), 1);
    }

    #[test]
    fn sampling_handles_negative_raw_values() {
        let v = vocab(&[("a", 2), ("b", 1)]);
        let table = UnigramTable::with_size(&v, 1_000);
        let idx = table.sample(-123_456_789_012_345);
        assert!(idx < v.len());
    }
}
