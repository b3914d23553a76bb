use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Sequential stages of a training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AcquireVocab,
    FilterSortVocab,
    CreateHuffmanEncoding,
    TrainNeuralNetwork,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::AcquireVocab => "ACQUIRE_VOCAB",
            Stage::FilterSortVocab => "FILTER_SORT_VOCAB",
            Stage::CreateHuffmanEncoding => "CREATE_HUFFMAN_ENCODING",
            Stage::TrainNeuralNetwork => "TRAIN_NEURAL_NETWORK",
        };
        f.write_str(name)
    }
}

/// Observer for training progress.
///
/// Updates are delivered from whichever thread reaches a reporting boundary,
/// including the trainer's worker threads.
pub trait ProgressListener: Send + Sync {
    /// Called with the current stage and a completion fraction in `[0, 1]`.
    fn update(&self, stage: Stage, progress: f64);
}

/// Default listener; forwards progress to `tracing`.
pub struct LoggingListener;

impl ProgressListener for LoggingListener {
    fn update(&self, stage: Stage, progress: f64) {
        tracing::debug!(%stage, progress, "training progress");
    }
}

/// Cooperative cancellation flag, shared between the caller and the trainer.
///
/// Workers poll the token at chunk boundaries and abort with a `Cancelled`
/// error when it is set. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    /// Request cancellation. Takes effect at the next cooperative check.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
