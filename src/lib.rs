//! Word vector training and similarity search.
//!
//! Trains dense word representations from a tokenized corpus with the
//! classical CBOW and skip-gram architectures (hierarchical softmax and/or
//! negative sampling), then answers nearest-neighbor, cosine-distance, and
//! analogy queries over the trained vectors.
//!
//! ```no_run
//! use word2vec::{Model, NetworkType};
//!
//! # fn main() -> word2vec::Result<()> {
//! let sentences: Vec<Vec<String>> = vec![/* tokenized corpus */];
//! let model = Model::trainer()
//!     .network_type(NetworkType::SkipGram)
//!     .layer_size(100)
//!     .use_hierarchical_softmax()
//!     .train(sentences)?;
//!
//! let searcher = model.for_search();
//! for m in searcher.matches("anarchism", 5)? {
//!     println!("{} {}", m.word, m.distance);
//! }
//! # Ok(())
//! # }
//! ```

mod builder;
mod error;
mod huffman;
mod io;
mod model;
mod progress;
mod search;
mod trainer;
mod unigram;
mod vocab;

pub use builder::TrainerBuilder;
pub use error::{Result, Word2VecError};
pub use huffman::{HuffmanCoding, HuffmanNode};
pub use io::Endian;
pub use model::{Model, NormalizedModel};
pub use progress::{CancelToken, LoggingListener, ProgressListener, Stage};
pub use search::{Match, Searcher, SemanticDifference};
pub use trainer::{NetworkConfig, NetworkType};
pub use unigram::{UnigramTable, TABLE_SIZE};
pub use vocab::{VocabEntry, Vocabulary};

/// L2 norm of a vector.
pub fn norm(v: &[f64]) -> f64 {
    v.iter().map(|e| e * e).sum::<f64>().sqrt()
}

/// Scale a vector to unit length in place.
pub fn normalize(v: &mut [f64]) {
    let len = norm(v);
    for e in v {
        *e /= len;
    }
}

/// Dot product. Panics if the lengths differ.
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(&a, &b)| a * b).sum()
}
