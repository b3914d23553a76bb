use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use crate::error::Result;
use crate::model::Model;
use crate::progress::{CancelToken, LoggingListener, ProgressListener};
use crate::trainer::{train_pipeline, NetworkConfig, NetworkType};

/// Fluent builder for training a new [`Model`].
///
/// Unset options fall back to the classical defaults: CBOW, 100-dimension
/// vectors, a window of 5, 5 iterations, minimum token frequency 5, down
/// sampling at 1e-3, no hierarchical softmax, no negative samples, and a
/// starting learning rate of 0.05 for CBOW or 0.025 for skip-gram.
pub struct TrainerBuilder {
    network_type: Option<NetworkType>,
    layer_size: Option<usize>,
    window_size: Option<usize>,
    num_threads: Option<usize>,
    iterations: Option<usize>,
    negative_samples: usize,
    use_hierarchical_softmax: bool,
    min_frequency: Option<u64>,
    initial_learning_rate: Option<f64>,
    down_sample_rate: Option<f64>,
    vocab: Option<HashMap<String, u64>>,
    listener: Option<Arc<dyn ProgressListener>>,
    cancel: CancelToken,
}

impl TrainerBuilder {
    pub(crate) fn new() -> TrainerBuilder {
        TrainerBuilder {
            network_type: None,
            layer_size: None,
            window_size: None,
            num_threads: None,
            iterations: None,
            negative_samples: 0,
            use_hierarchical_softmax: false,
            min_frequency: None,
            initial_learning_rate: None,
            down_sample_rate: None,
            vocab: None,
            listener: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn network_type(mut self, network_type: NetworkType) -> Self {
        self.network_type = Some(network_type);
        self
    }

    /// Size of the vectors in the trained model.
    pub fn layer_size(mut self, layer_size: usize) -> Self {
        self.layer_size = Some(layer_size);
        self
    }

    /// Maximum half-window of context considered around each position.
    pub fn window_size(mut self, window_size: usize) -> Self {
        self.window_size = Some(window_size);
        self
    }

    /// Number of parallel SGD workers. Defaults to the hardware parallelism.
    /// Output is deterministic only with one thread.
    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    /// Number of passes over the corpus.
    pub fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = Some(iterations);
        self
    }

    /// Negative samples drawn per target. Common values are 5 to 10.
    pub fn negative_samples(mut self, negative_samples: usize) -> Self {
        self.negative_samples = negative_samples;
        self
    }

    pub fn use_hierarchical_softmax(mut self) -> Self {
        self.use_hierarchical_softmax = true;
        self
    }

    /// Minimum corpus frequency for a token to enter the vocabulary.
    pub fn min_vocab_frequency(mut self, min_frequency: u64) -> Self {
        self.min_frequency = Some(min_frequency);
        self
    }

    pub fn initial_learning_rate(mut self, alpha: f64) -> Self {
        self.initial_learning_rate = Some(alpha);
        self
    }

    /// Threshold for randomly discarding very frequent tokens. Zero disables
    /// subsampling.
    pub fn down_sample_rate(mut self, rate: f64) -> Self {
        self.down_sample_rate = Some(rate);
        self
    }

    /// Use a pre-counted token frequency map instead of counting the corpus.
    pub fn vocab(mut self, counts: HashMap<String, u64>) -> Self {
        self.vocab = Some(counts);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn ProgressListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Token polled for cooperative cancellation. Cancelling it makes the
    /// training call fail with a `Cancelled` error; no model is returned.
    pub fn cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the full pipeline: count, filter and sort the vocabulary, build
    /// the Huffman encoding, then train the network over the corpus.
    ///
    /// The corpus is materialized so that every iteration can replay it.
    pub fn train<I>(self, sentences: I) -> Result<Model>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let network_type = self.network_type.unwrap_or(NetworkType::Cbow);
        let config = NetworkConfig {
            network_type,
            num_threads: self.num_threads.unwrap_or_else(default_parallelism),
            iterations: self.iterations.unwrap_or(5),
            layer_size: self.layer_size.unwrap_or(100),
            window_size: self.window_size.unwrap_or(5),
            negative_samples: self.negative_samples,
            use_hierarchical_softmax: self.use_hierarchical_softmax,
            initial_learning_rate: self
                .initial_learning_rate
                .unwrap_or_else(|| network_type.default_initial_learning_rate()),
            down_sample_rate: self.down_sample_rate.unwrap_or(1e-3),
        };
        let min_frequency = self.min_frequency.unwrap_or(5);
        let listener = self
            .listener
            .unwrap_or_else(|| Arc::new(LoggingListener));

        let sentences: Vec<Vec<String>> = sentences.into_iter().collect();
        train_pipeline(
            &config,
            min_frequency,
            self.vocab,
            &sentences,
            listener.as_ref(),
            &self.cancel,
        )
    }
}

fn default_parallelism() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}
