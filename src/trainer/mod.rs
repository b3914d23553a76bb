//! Shared-memory stochastic gradient descent over the embedding matrices.
//!
//! CBOW and skip-gram share one worker scaffold (subsampling, learning-rate
//! decay, sentence chunking, cancellation, the negative-sampling helper) and
//! differ only in how a sentence chunk updates the weights. Weight rows are
//! read and written without locks; concurrent workers may lose updates to
//! each other, which plain SGD tolerates. Runs with one worker thread are
//! fully deterministic.

mod cbow;
mod skipgram;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use aligned_box::AlignedBox;

use crate::error::{Result, Word2VecError};
use crate::huffman::{HuffmanCoding, HuffmanNode};
use crate::model::Model;
use crate::progress::{CancelToken, ProgressListener, Stage};
use crate::unigram::UnigramTable;
use crate::vocab::Vocabulary;

/// Sentences longer than this are broken into multiple chunks.
const MAX_SENTENCE_LENGTH: usize = 1_000;

/// Boundary for the maximum exponent in the sigmoid lookup.
const MAX_EXP: f64 = 6.0;

/// Size of the precomputed sigmoid table.
const EXP_TABLE_SIZE: usize = 1_000;

/// Lookup index scale. The integer quotient is deliberate.
const EXP_SCALE: f64 = (EXP_TABLE_SIZE / 6 / 2) as f64;

/// In-vocabulary tokens a worker processes between learning-rate refreshes.
const LEARNING_RATE_UPDATE_FREQUENCY: u64 = 10_000;

/// Network architecture variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkType {
    /// Continuous bag of words: predicts the target from averaged context.
    /// Faster, slightly better accuracy for frequent words.
    Cbow,
    /// Predicts each context word from the target.
    /// Slower, better for infrequent words.
    SkipGram,
}

impl NetworkType {
    pub fn default_initial_learning_rate(self) -> f64 {
        match self {
            NetworkType::Cbow => 0.05,
            NetworkType::SkipGram => 0.025,
        }
    }
}

/// Fixed configuration for a training run.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub network_type: NetworkType,
    pub num_threads: usize,
    pub iterations: usize,
    pub layer_size: usize,
    pub window_size: usize,
    pub negative_samples: usize,
    pub use_hierarchical_softmax: bool,
    pub initial_learning_rate: f64,
    pub down_sample_rate: f64,
}

impl NetworkConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        fn invalid(msg: &str) -> Word2VecError {
            Word2VecError::InvalidConfig(msg.to_string())
        }
        if self.layer_size == 0 {
            return Err(invalid("layer size must be positive"));
        }
        if self.window_size == 0 {
            return Err(invalid("window size must be positive"));
        }
        if self.num_threads == 0 {
            return Err(invalid("thread count must be positive"));
        }
        if self.iterations == 0 {
            return Err(invalid("iteration count must be positive"));
        }
        if !self.initial_learning_rate.is_finite() || self.initial_learning_rate <= 0.0 {
            return Err(invalid("initial learning rate must be positive and finite"));
        }
        if !self.down_sample_rate.is_finite() || self.down_sample_rate < 0.0 {
            return Err(invalid("down sampling rate must be non-negative and finite"));
        }
        Ok(())
    }
}

/// The linear congruential generator word2vec training is defined over.
/// State and remainders are signed; several derived quantities (window
/// offsets, table indexes) depend on signed `%` semantics.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Rng(i64);

impl Rng {
    pub(crate) fn new(seed: i64) -> Rng {
        Rng(seed)
    }

    pub(crate) fn next(&mut self) -> i64 {
        self.0 = self.0.wrapping_mul(25_214_903_917).wrapping_add(11);
        self.0
    }

    /// Uniform value in `0.0 .. 1.0` from the low 16 bits.
    pub(crate) fn next_real(&mut self) -> f64 {
        (self.next() & 0xFFFF) as f64 / 65_536.0
    }
}

/// An f64 cell that tolerates racy unsynchronized updates.
#[derive(Default)]
#[repr(transparent)]
pub(crate) struct Real {
    bits: AtomicU64,
}

impl Real {
    pub(crate) fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub(crate) fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    pub(crate) fn add(&self, x: f64) {
        self.set(self.get() + x);
    }
}

/// Row-major matrix of shared weight cells.
pub(crate) struct WeightMatrix {
    data: AlignedBox<[Real]>,
    cols: usize,
}

impl WeightMatrix {
    fn zeros(rows: usize, cols: usize) -> WeightMatrix {
        let data =
            AlignedBox::slice_from_default(128, rows * cols).expect("memory allocation failed");
        WeightMatrix { data, cols }
    }

    pub(crate) fn row(&self, i: usize) -> &[Real] {
        &self.data[i * self.cols..][..self.cols]
    }
}

fn build_exp_table() -> Vec<f64> {
    (0..EXP_TABLE_SIZE)
        .map(|i| {
            let e = ((i as f64 / EXP_TABLE_SIZE as f64 * 2.0 - 1.0) * MAX_EXP).exp();
            e / (e + 1.0)
        })
        .collect()
}

/// Run the full preparation and training pipeline.
pub(crate) fn train_pipeline(
    config: &NetworkConfig,
    min_frequency: u64,
    counts: Option<HashMap<String, u64>>,
    sentences: &[Vec<String>],
    listener: &dyn ProgressListener,
    cancel: &CancelToken,
) -> Result<Model> {
    config.validate()?;

    listener.update(Stage::AcquireVocab, 0.0);
    if cancel.is_cancelled() {
        return Err(Word2VecError::Cancelled("acquiring word frequencies"));
    }
    let counts = counts.unwrap_or_else(|| Vocabulary::count(sentences));

    listener.update(Stage::FilterSortVocab, 0.0);
    if cancel.is_cancelled() {
        return Err(Word2VecError::Cancelled("sorting the vocabulary"));
    }
    let vocab = Vocabulary::from_counts(counts, min_frequency);
    if vocab.is_empty() {
        return Err(Word2VecError::EmptyVocabulary);
    }
    tracing::info!(vocab_size = vocab.len(), "vocabulary ready");

    let huffman = HuffmanCoding::new(&vocab, listener, cancel).encode()?;

    if cancel.is_cancelled() {
        return Err(Word2VecError::Cancelled("starting neural network training"));
    }
    let mut trainer = NetworkTrainer::new(config.clone(), &vocab, huffman);
    trainer.train(sentences, &vocab, listener, cancel)
}

/// Shared state for one training run.
pub(crate) struct NetworkTrainer {
    config: NetworkConfig,
    huffman: HashMap<String, HuffmanNode>,
    vocab_size: usize,
    layer1_size: usize,
    window: usize,
    /// Total trainable token occurrences, including one per sentence for the
    /// boundary marker the vocabulary no longer carries.
    num_trained_tokens: u64,
    /// In-vocabulary tokens processed so far across all workers and
    /// iterations, including tokens discarded by subsampling.
    actual_word_count: AtomicU64,
    alpha: Real,
    syn0: WeightMatrix,
    syn1: WeightMatrix,
    syn1neg: WeightMatrix,
    table: Option<UnigramTable>,
    exp_table: Vec<f64>,
}

impl NetworkTrainer {
    pub(crate) fn new(
        config: NetworkConfig,
        vocab: &Vocabulary,
        huffman: HashMap<String, HuffmanNode>,
    ) -> NetworkTrainer {
        let vocab_size = huffman.len();
        let layer1_size = config.layer_size;

        let syn0 = WeightMatrix::zeros(vocab_size, layer1_size);
        let mut rng = Rng::new(1);
        for a in 0..vocab_size {
            // The extra draw uses up the randomness slot of the `</s>`
            // marker that word2vec.c keeps in its vocabulary.
            rng.next();
            let row = syn0.row(a);
            for cell in row {
                let r = rng.next();
                cell.set((((r & 0xFFFF) as f64 / 65_536.0) - 0.5) / layer1_size as f64);
            }
        }

        let table = (config.negative_samples > 0).then(|| UnigramTable::build(vocab));
        let trainer = NetworkTrainer {
            window: config.window_size,
            num_trained_tokens: vocab.total_count(),
            actual_word_count: AtomicU64::new(0),
            alpha: Real::default(),
            syn0,
            syn1: WeightMatrix::zeros(vocab_size, layer1_size),
            syn1neg: WeightMatrix::zeros(vocab_size, layer1_size),
            table,
            exp_table: build_exp_table(),
            vocab_size,
            layer1_size,
            huffman,
            config,
        };
        trainer.alpha.set(trainer.config.initial_learning_rate);
        trainer
    }

    pub(crate) fn train(
        &mut self,
        sentences: &[Vec<String>],
        vocab: &Vocabulary,
        listener: &dyn ProgressListener,
        cancel: &CancelToken,
    ) -> Result<Model> {
        self.num_trained_tokens += sentences.len() as u64;

        let batch_size = sentences.len().div_ceil(self.config.num_threads).max(1);
        listener.update(Stage::TrainNeuralNetwork, 0.0);

        for iteration in 0..self.config.iterations {
            let this = &*self;
            thread::scope(|scope| {
                let workers: Vec<_> = sentences
                    .chunks(batch_size)
                    .enumerate()
                    .map(|(id, batch)| {
                        scope.spawn(move || {
                            Worker::new(this, id as i64, listener, cancel).run(batch)
                        })
                    })
                    .collect();

                let mut outcome = Ok(());
                for worker in workers {
                    let result = worker.join().expect("worker thread panicked");
                    if outcome.is_ok() {
                        outcome = result;
                    }
                }
                outcome
            })?;
            tracing::debug!(iteration, "training iteration finished");
        }

        let mut vectors = vec![0.0f64; self.vocab_size * self.layer1_size];
        for a in 0..self.vocab_size {
            let row = self.syn0.row(a);
            for (b, v) in vectors[a * self.layer1_size..][..self.layer1_size]
                .iter_mut()
                .enumerate()
            {
                *v = row[b].get();
            }
        }
        Ok(Model::new(vocab.tokens(), self.layer1_size, vectors))
    }
}

/// Worker-local training state. All of it is private to one thread; only the
/// weight matrices, the learning rate, and `actual_word_count` are shared.
struct Worker<'a> {
    t: &'a NetworkTrainer,
    rng: Rng,
    word_count: u64,
    last_word_count: u64,
    neu1: Vec<f64>,
    neu1e: Vec<f64>,
    listener: &'a dyn ProgressListener,
    cancel: &'a CancelToken,
}

impl<'a> Worker<'a> {
    fn new(
        t: &'a NetworkTrainer,
        seed: i64,
        listener: &'a dyn ProgressListener,
        cancel: &'a CancelToken,
    ) -> Worker<'a> {
        Worker {
            rng: Rng::new(seed),
            word_count: 0,
            last_word_count: 0,
            neu1: vec![0.0; t.layer1_size],
            neu1e: vec![0.0; t.layer1_size],
            t,
            listener,
            cancel,
        }
    }

    fn run(mut self, batch: &[Vec<String>]) -> Result<()> {
        for sentence in batch {
            let mut filtered: Vec<&HuffmanNode> = Vec::with_capacity(sentence.len());
            for token in sentence {
                let Some(node) = self.t.huffman.get(token) else {
                    continue;
                };
                self.word_count += 1;

                if self.t.config.down_sample_rate > 0.0 {
                    let scaled =
                        self.t.config.down_sample_rate * self.t.num_trained_tokens as f64;
                    let keep = ((node.count as f64 / scaled).sqrt() + 1.0) * scaled
                        / node.count as f64;
                    if keep < self.rng.next_real() {
                        continue;
                    }
                }
                filtered.push(node);
            }
            // One extra for the sentence boundary marker.
            self.word_count += 1;

            for chunk in filtered.chunks(MAX_SENTENCE_LENGTH) {
                if self.cancel.is_cancelled() {
                    return Err(Word2VecError::Cancelled("training the neural network"));
                }
                if self.word_count - self.last_word_count > LEARNING_RATE_UPDATE_FREQUENCY {
                    self.update_alpha();
                }
                match self.t.config.network_type {
                    NetworkType::Cbow => self.train_sentence_cbow(chunk),
                    NetworkType::SkipGram => self.train_sentence_skipgram(chunk),
                }
            }
        }

        self.t
            .actual_word_count
            .fetch_add(self.word_count - self.last_word_count, Ordering::SeqCst);
        Ok(())
    }

    /// Degrade the learning rate linearly towards a small floor.
    fn update_alpha(&mut self) {
        let delta = self.word_count - self.last_word_count;
        let current = self
            .t
            .actual_word_count
            .fetch_add(delta, Ordering::SeqCst)
            + delta;
        self.last_word_count = self.word_count;

        let denominator =
            (self.t.config.iterations as u64 * self.t.num_trained_tokens) as f64;
        let alpha = self.t.config.initial_learning_rate
            * (1.0 - current as f64 / denominator).max(1e-4);
        self.t.alpha.set(alpha);

        self.listener
            .update(Stage::TrainNeuralNetwork, current as f64 / (denominator + 1.0));
    }

    /// One positive update plus `negative_samples` contrastive draws against
    /// the shared `syn1neg` rows. The caller decides what plays the role of
    /// the hidden vector by filling `neu1` (or leaving it zeroed).
    fn handle_negative_sampling(&mut self, node: &HuffmanNode, alpha: f64) {
        let t = self.t;
        let layer1_size = t.layer1_size;
        let table = t.table.as_ref();

        for d in 0..=t.config.negative_samples {
            let (target, label) = if d == 0 {
                (node.idx, 1.0)
            } else {
                let r = self.rng.next();
                let Some(table) = table else { break };
                let mut target = table.sample(r);
                if target == 0 {
                    let range = t.vocab_size as i64 - 1;
                    target = ((((r % range) + range) % range) + 1) as usize;
                }
                if target == node.idx {
                    continue;
                }
                (target, 0.0)
            };

            let row = t.syn1neg.row(target);
            let mut f = 0.0;
            for c in 0..layer1_size {
                f += self.neu1[c] * row[c].get();
            }
            let g = if f > MAX_EXP {
                (label - 1.0) * alpha
            } else if f < -MAX_EXP {
                label * alpha
            } else {
                (label - t.exp_table[((f + MAX_EXP) * EXP_SCALE) as usize]) * alpha
            };
            for c in 0..layer1_size {
                self.neu1e[c] += g * row[c].get();
            }
            for c in 0..layer1_size {
                row[c].add(g * self.neu1[c]);
            }
        }
    }

    /// Window offset draw shared by both architectures.
    fn window_offset(&mut self) -> usize {
        let window = self.t.window as i64;
        let r = self.rng.next();
        (((r % window) + window) % window) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::LoggingListener;

    fn tiny_trainer(layer_size: usize) -> (NetworkTrainer, Vocabulary) {
        let counts: HashMap<String, u64> = [("aa".to_string(), 4), ("bb".to_string(), 2)]
            .into_iter()
            .collect();
        let vocab = Vocabulary::from_counts(counts, 0);
        let huffman = HuffmanCoding::new(&vocab, &LoggingListener, &CancelToken::new())
            .encode()
            .unwrap();
        let config = NetworkConfig {
            network_type: NetworkType::Cbow,
            num_threads: 1,
            iterations: 1,
            layer_size,
            window_size: 5,
            negative_samples: 0,
            use_hierarchical_softmax: true,
            initial_learning_rate: 0.05,
            down_sample_rate: 1e-3,
        };
        (NetworkTrainer::new(config, &vocab, huffman), vocab)
    }

    #[test]
    fn syn0_seeding_is_reproducible() {
        let (t, _) = tiny_trainer(2);
        // Seed 1, one burned draw per token, then one draw per component.
        assert_eq!(t.syn0.row(0)[0].get(), 0.22097015380859375);
        assert_eq!(t.syn0.row(0)[1].get(), -0.1915130615234375);
        assert_eq!(t.syn0.row(1)[0].get(), 0.068328857421875);
        assert_eq!(t.syn0.row(1)[1].get(), 0.15105438232421875);
        // The outer layers start zeroed.
        assert!(t.syn1.row(0).iter().all(|c| c.get() == 0.0));
        assert!(t.syn1neg.row(1).iter().all(|c| c.get() == 0.0));
    }

    #[test]
    fn empty_corpus_returns_the_initialized_vectors() {
        let (mut t, vocab) = tiny_trainer(3);
        let init: Vec<f64> = (0..2)
            .flat_map(|a| t.syn0.row(a).iter().map(Real::get).collect::<Vec<_>>())
            .collect();
        let model = t
            .train(&[], &vocab, &LoggingListener, &CancelToken::new())
            .unwrap();
        assert_eq!(model.vectors(), init.as_slice());
        assert_eq!(model.vocab(), vocab.tokens().as_slice());
    }

    #[test]
    fn rng_follows_the_lcg_recurrence() {
        let mut rng = Rng::new(1);
        assert_eq!(rng.next(), 25_214_903_928);
        let mut again = Rng::new(1);
        again.next();
        assert_eq!(rng.next(), again.next());
    }

    #[test]
    fn rng_low_bits_are_uniform_fractions() {
        let mut rng = Rng::new(7);
        for _ in 0..1_000 {
            let x = rng.next_real();
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn exp_table_is_a_sigmoid() {
        let table = build_exp_table();
        assert_eq!(table.len(), EXP_TABLE_SIZE);
        // Midpoint is sigma(x) for x just below zero.
        assert!((table[500] - 0.5).abs() < 0.01);
        assert!(table[0] < 0.01);
        assert!(table[999] > 0.99);
        assert!(table.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn exp_scale_uses_the_integer_quotient() {
        assert_eq!(EXP_SCALE, 83.0);
    }

    #[test]
    fn real_cell_roundtrips() {
        let cell = Real::default();
        assert_eq!(cell.get(), 0.0);
        cell.set(-1.5);
        assert_eq!(cell.get(), -1.5);
        cell.add(0.5);
        assert_eq!(cell.get(), -1.0);
    }

    #[test]
    fn weight_matrix_rows_do_not_overlap() {
        let m = WeightMatrix::zeros(3, 4);
        m.row(1)[0].set(7.0);
        assert_eq!(m.row(0)[0].get(), 0.0);
        assert_eq!(m.row(1)[0].get(), 7.0);
        assert_eq!(m.row(2)[0].get(), 0.0);
        assert_eq!(m.row(2).len(), 4);
    }

    #[test]
    fn config_validation_rejects_zero_values() {
        let good = NetworkConfig {
            network_type: NetworkType::Cbow,
            num_threads: 1,
            iterations: 1,
            layer_size: 10,
            window_size: 5,
            negative_samples: 0,
            use_hierarchical_softmax: true,
            initial_learning_rate: 0.05,
            down_sample_rate: 1e-3,
        };
        assert!(good.validate().is_ok());

        let mut bad = good.clone();
        bad.layer_size = 0;
        assert!(matches!(
            bad.validate(),
            Err(Word2VecError::InvalidConfig(_))
        ));

        let mut bad = good.clone();
        bad.iterations = 0;
        assert!(bad.validate().is_err());

        let mut bad = good.clone();
        bad.down_sample_rate = f64::NAN;
        assert!(bad.validate().is_err());

        let mut bad = good;
        bad.initial_learning_rate = 0.0;
        assert!(bad.validate().is_err());
    }
}
