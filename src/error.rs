use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Word2VecError>;

/// Errors produced while training, querying, or (de)serializing a model.
#[derive(Debug, Error)]
pub enum Word2VecError {
    /// An out-of-range option value was supplied to the trainer builder.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No tokens survived the minimum-frequency filter.
    #[error("no tokens survived the minimum frequency filter")]
    EmptyVocabulary,

    /// A cancellation request was observed before training completed.
    #[error("cancelled while {0}")]
    Cancelled(&'static str),

    /// A search operation referenced a token outside the model's vocabulary.
    #[error("unknown search word '{0}'")]
    UnknownWord(String),

    /// A model file's header or token count contradicts its contents.
    #[error("malformed model: {0}")]
    MalformedModel(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
