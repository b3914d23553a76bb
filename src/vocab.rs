use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Result, Word2VecError};

/// A surviving token and its corpus frequency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabEntry {
    pub token: String,
    pub count: u64,
}

/// Frequency-filtered vocabulary, sorted by count descending and then by
/// token ascending. The ordering is total, so identical corpora always
/// produce identical vocabularies.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    entries: Vec<VocabEntry>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Count every token occurrence in the corpus.
    pub fn count(sentences: &[Vec<String>]) -> HashMap<String, u64> {
        let mut counts = HashMap::new();
        for sentence in sentences {
            for token in sentence {
                *counts.entry(token.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Build a vocabulary from a token frequency map, dropping tokens with
    /// count below `min_frequency`.
    pub fn from_counts(counts: HashMap<String, u64>, min_frequency: u64) -> Vocabulary {
        let mut entries: Vec<VocabEntry> = counts
            .into_iter()
            .filter(|&(_, count)| count >= min_frequency)
            .map(|(token, count)| VocabEntry { token, count })
            .collect();
        entries.sort_unstable_by(|a, b| {
            b.count.cmp(&a.count).then_with(|| a.token.cmp(&b.token))
        });

        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.token.clone(), i))
            .collect();
        Vocabulary { entries, index }
    }

    /// Count and filter in one step.
    pub fn build(sentences: &[Vec<String>], min_frequency: u64) -> Vocabulary {
        Vocabulary::from_counts(Vocabulary::count(sentences), min_frequency)
    }

    pub fn entries(&self) -> &[VocabEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of a token in frequency order.
    pub fn position(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.index.contains_key(token)
    }

    /// Sum of the counts of all surviving tokens.
    pub fn total_count(&self) -> u64 {
        self.entries.iter().map(|e| e.count).sum()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.token.clone()).collect()
    }

    /// Write one `token count` line per entry, in frequency order.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        for entry in &self.entries {
            writeln!(writer, "{} {}", entry.token, entry.count)?;
        }
        Ok(())
    }

    /// Read a frequency map previously written by [`Vocabulary::save`].
    /// Feed the result to the trainer builder to skip the counting pass.
    pub fn read_counts(path: &Path) -> Result<HashMap<String, u64>> {
        let reader = BufReader::new(File::open(path)?);
        let mut counts = HashMap::new();
        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 2 {
                return Err(Word2VecError::MalformedModel(format!(
                    "vocabulary file syntax error on line {}",
                    line_num + 1
                )));
            }
            let count = fields[1].parse().map_err(|_| {
                Word2VecError::MalformedModel(format!(
                    "unrecognized frequency number format on line {}",
                    line_num + 1
                ))
            })?;
            counts.insert(fields[0].to_string(), count);
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentences(text: &[&str]) -> Vec<Vec<String>> {
        text.iter()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn counts_every_occurrence() {
        let corpus = sentences(&["a b a", "b a c"]);
        let counts = Vocabulary::count(&corpus);
        assert_eq!(counts["a"], 3);
        assert_eq!(counts["b"], 2);
        assert_eq!(counts["c"], 1);
    }

    #[test]
    fn orders_by_count_then_token() {
        let corpus = sentences(&["b b zz zz aa aa c"]);
        let vocab = Vocabulary::build(&corpus, 0);
        let tokens: Vec<&str> = vocab.entries().iter().map(|e| e.token.as_str()).collect();
        // Ties on count break lexicographically.
        assert_eq!(tokens, vec!["aa", "b", "zz", "c"]);
    }

    #[test]
    fn filters_below_min_frequency() {
        let corpus = sentences(&["a a a b b c"]);
        let vocab = Vocabulary::build(&corpus, 2);
        assert_eq!(vocab.len(), 2);
        assert!(vocab.contains("a"));
        assert!(vocab.contains("b"));
        assert!(!vocab.contains("c"));
        assert_eq!(vocab.total_count(), 5);
    }

    #[test]
    fn min_frequency_zero_keeps_everything() {
        let corpus = sentences(&["a b c"]);
        let vocab = Vocabulary::build(&corpus, 0);
        assert_eq!(vocab.len(), 3);
    }

    #[test]
    fn empty_corpus_yields_empty_vocabulary() {
        let vocab = Vocabulary::build(&[], 5);
        assert!(vocab.is_empty());
    }

    #[test]
    fn position_matches_entry_order() {
        let corpus = sentences(&["x x x y y z"]);
        let vocab = Vocabulary::build(&corpus, 0);
        for (i, entry) in vocab.entries().iter().enumerate() {
            assert_eq!(vocab.position(&entry.token), Some(i));
        }
        assert_eq!(vocab.position("missing"), None);
    }

    #[test]
    fn vocabulary_file_roundtrip() {
        let corpus = sentences(&["x x x y y z"]);
        let vocab = Vocabulary::build(&corpus, 0);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.txt");
        vocab.save(&path).unwrap();

        let counts = Vocabulary::read_counts(&path).unwrap();
        let back = Vocabulary::from_counts(counts, 0);
        assert_eq!(back.entries(), vocab.entries());
    }

    #[test]
    fn malformed_vocabulary_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.txt");
        std::fs::write(&path, "token\n").unwrap();
        assert!(Vocabulary::read_counts(&path).is_err());
        std::fs::write(&path, "token notanumber\n").unwrap();
        assert!(Vocabulary::read_counts(&path).is_err());
    }

    #[test]
    fn precounted_map_bypasses_counting() {
        let mut counts = HashMap::new();
        counts.insert("one".to_string(), 10);
        counts.insert("two".to_string(), 5);
        counts.insert("rare".to_string(), 1);
        let vocab = Vocabulary::from_counts(counts, 2);
        assert_eq!(vocab.len(), 2);
        assert_eq!(vocab.entries()[0].token, "one");
    }
}
