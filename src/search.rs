//! Nearest-neighbor and analogy queries over a trained model.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use ordered_float::OrderedFloat;

use crate::dot;
use crate::error::{Result, Word2VecError};
use crate::model::{Model, NormalizedModel};

/// A scored result word.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub word: String,
    pub distance: f64,
}

/// Answers similarity queries against a unit-normalized copy of the model.
pub struct Searcher {
    model: NormalizedModel,
    rows: HashMap<String, usize>,
}

impl Searcher {
    pub fn new(model: &Model) -> Searcher {
        Searcher::from_normalized(NormalizedModel::from_model(model))
    }

    pub fn from_normalized(model: NormalizedModel) -> Searcher {
        let rows = model
            .vocab()
            .iter()
            .enumerate()
            .map(|(i, w)| (w.clone(), i))
            .collect();
        Searcher { model, rows }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.rows.contains_key(word)
    }

    fn row(&self, word: &str) -> Result<usize> {
        self.rows
            .get(word)
            .copied()
            .ok_or_else(|| Word2VecError::UnknownWord(word.to_string()))
    }

    /// The stored (unit-length) vector for a word.
    pub fn raw_vector(&self, word: &str) -> Result<&[f64]> {
        Ok(self.model.vector(self.row(word)?))
    }

    /// Cosine similarity between two words.
    pub fn cosine_distance(&self, w1: &str, w2: &str) -> Result<f64> {
        Ok(self.model.cosine(self.row(w1)?, self.row(w2)?))
    }

    /// The `max_matches` nearest words, best first. The query word itself is
    /// part of the candidate set and normally comes back on top.
    pub fn matches(&self, word: &str, max_matches: usize) -> Result<Vec<Match>> {
        let row = self.row(word)?;
        Ok(self.matches_vec(self.model.vector(row), max_matches))
    }

    /// Nearest words to an arbitrary vector. The query is scored as-is,
    /// without normalization.
    pub fn matches_vec(&self, vec: &[f64], max_matches: usize) -> Vec<Match> {
        let scores = (0..self.model.vocab().len()).map(|i| dot(vec, self.model.vector(i)));
        top_k(scores, max_matches)
            .into_iter()
            .map(|(i, distance)| Match {
                word: self.model.vocab()[i].clone(),
                distance,
            })
            .collect()
    }

    /// Capture the vector offset from `w1` to `w2` for analogy queries.
    pub fn similarity(&self, w1: &str, w2: &str) -> Result<SemanticDifference<'_>> {
        let v1 = self.model.vector(self.row(w1)?);
        let v2 = self.model.vector(self.row(w2)?);
        let diff = v1.iter().zip(v2).map(|(a, b)| a - b).collect();
        Ok(SemanticDifference {
            searcher: self,
            diff,
        })
    }
}

/// The semantic relationship between two words, applicable to a third:
/// matches are found near `word - (w1 - w2)`.
pub struct SemanticDifference<'a> {
    searcher: &'a Searcher,
    diff: Vec<f64>,
}

impl SemanticDifference<'_> {
    pub fn matches(&self, word: &str, max_matches: usize) -> Result<Vec<Match>> {
        let v = self.searcher.model.vector(self.searcher.row(word)?);
        let target: Vec<f64> = v.iter().zip(&self.diff).map(|(a, b)| a - b).collect();
        Ok(self.searcher.matches_vec(&target, max_matches))
    }
}

/// Indexes and scores of the `k` greatest scores, best first, using a bounded
/// min-heap. Ties resolve toward the lower index, i.e. vocabulary order.
fn top_k(scores: impl Iterator<Item = f64>, k: usize) -> Vec<(usize, f64)> {
    if k == 0 {
        return Vec::new();
    }
    let mut heap: BinaryHeap<Reverse<(OrderedFloat<f64>, Reverse<usize>)>> =
        BinaryHeap::with_capacity(k + 1);
    for (i, score) in scores.enumerate() {
        heap.push(Reverse((OrderedFloat(score), Reverse(i))));
        if heap.len() > k {
            heap.pop();
        }
    }
    let mut best: Vec<(usize, f64)> = heap
        .into_iter()
        .map(|Reverse((score, Reverse(i)))| (i, score.0))
        .collect();
    best.sort_unstable_by(|a, b| {
        OrderedFloat(b.1)
            .cmp(&OrderedFloat(a.1))
            .then(a.0.cmp(&b.0))
    });
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Orthogonal-ish fixture: unit vectors along and between the axes.
    fn searcher() -> Searcher {
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let model = Model::from_parts(
            vec![
                "east".into(),
                "north".into(),
                "northeast".into(),
                "west".into(),
            ],
            2,
            vec![1.0, 0.0, 0.0, 1.0, s, s, -1.0, 0.0],
        )
        .unwrap();
        model.for_search()
    }

    #[test]
    fn contains_and_unknown_word() {
        let s = searcher();
        assert!(s.contains("east"));
        assert!(!s.contains("south"));
        assert!(matches!(
            s.matches("south", 3),
            Err(Word2VecError::UnknownWord(_))
        ));
        assert!(matches!(
            s.cosine_distance("east", "south"),
            Err(Word2VecError::UnknownWord(_))
        ));
    }

    #[test]
    fn raw_vector_is_the_stored_row() {
        let s = searcher();
        assert_eq!(s.raw_vector("north").unwrap(), &[0.0, 1.0]);
        assert_eq!(s.raw_vector("east").unwrap().len(), 2);
    }

    #[test]
    fn cosine_distance_of_normalized_rows() {
        let s = searcher();
        assert!((s.cosine_distance("east", "east").unwrap() - 1.0).abs() < 1e-12);
        assert!(s.cosine_distance("east", "north").unwrap().abs() < 1e-12);
        assert!((s.cosine_distance("east", "west").unwrap() + 1.0).abs() < 1e-12);
        let ne = s.cosine_distance("east", "northeast").unwrap();
        assert!((ne - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn matches_rank_by_similarity() {
        let s = searcher();
        let matches = s.matches("east", 4).unwrap();
        let words: Vec<&str> = matches.iter().map(|m| m.word.as_str()).collect();
        assert_eq!(words, vec!["east", "northeast", "north", "west"]);
        assert!((matches[0].distance - 1.0).abs() < 1e-12);
        assert!(matches.windows(2).all(|w| w[0].distance >= w[1].distance));
    }

    #[test]
    fn vector_queries_are_not_normalized() {
        let s = searcher();
        // A scaled query scales every score but keeps the ranking.
        let matches = s.matches_vec(&[10.0, 0.0], 2);
        assert_eq!(matches[0].word, "east");
        assert!((matches[0].distance - 10.0).abs() < 1e-12);
    }

    #[test]
    fn zero_vector_falls_back_to_vocabulary_order() {
        let s = searcher();
        let matches = s.matches_vec(&[0.0, 0.0], 3);
        let words: Vec<&str> = matches.iter().map(|m| m.word.as_str()).collect();
        assert_eq!(words, vec!["east", "north", "northeast"]);
    }

    #[test]
    fn requesting_more_than_vocab_returns_everything() {
        let s = searcher();
        assert_eq!(s.matches("east", 100).unwrap().len(), 4);
        assert!(s.matches("east", 0).unwrap().is_empty());
    }

    #[test]
    fn semantic_difference_applies_the_offset() {
        let s = searcher();
        // east - north, applied to north: north - (east - north) points away
        // from east, so west beats east in the tail of the ranking.
        let diff = s.similarity("east", "north").unwrap();
        let matches = diff.matches("north", 4).unwrap();
        assert_eq!(matches[0].word, "north");
        let east_pos = matches.iter().position(|m| m.word == "east").unwrap();
        let west_pos = matches.iter().position(|m| m.word == "west").unwrap();
        assert!(west_pos < east_pos);
    }

    #[test]
    fn top_k_breaks_ties_by_index() {
        let picked = top_k([1.0, 3.0, 3.0, 3.0, 2.0].into_iter(), 2);
        assert_eq!(picked, vec![(1, 3.0), (2, 3.0)]);
        let all = top_k([0.5, 0.5, 0.5].into_iter(), 5);
        assert_eq!(all.len(), 3);
        assert_eq!(
            all.iter().map(|&(i, _)| i).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }
}
