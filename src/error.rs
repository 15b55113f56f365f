use thiserror::Error;

use crate::engine::EngineError;

/// Every failure the pipeline can surface to a caller.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The file name does not carry an `<age>_<gender>_<race>` prefix.
    #[error("cannot parse a label from file name '{0}'")]
    Parse(String),

    /// The byte stream is not a decodable image.
    #[error("cannot decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// A race code outside 0..=4 reached the one-hot encoder.
    #[error("race code {code} is outside the valid range 0..=4")]
    RaceOutOfRange { code: i64 },

    /// Assembly finished with zero usable samples.
    #[error("no usable training samples: {dropped} of {considered} file names could not be parsed")]
    EmptyBatch { considered: usize, dropped: usize },

    /// The model produced fewer values than a label vector holds.
    #[error("model output has {got} values, expected at least {expected}")]
    OutputTooShort { got: usize, expected: usize },

    /// Failure reported by the engine, passed through as-is.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The configured model cannot consume images or produce labels.
    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// Another training or prediction request holds the session.
    #[error("a training or prediction request is already running")]
    Busy,

    /// Prediction was requested before any training completed.
    #[error("no trained model is available yet")]
    NoModel,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
