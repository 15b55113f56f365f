pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod label;
pub mod predict;
pub mod preprocess;
pub mod session;

#[cfg(test)]
mod test_support;

// Convenience re-exports
pub use config::PipelineConfig;
pub use dataset::{assemble, RawSample, TrainingBatch};
pub use engine::{Engine, EngineError, EpochStats, HostEngine, Scoped};
pub use error::{PipelineError, Result};
pub use label::{decode_label, encode_label, parse_label, Gender, LabelTriple, LabelVector, PredictionResult, Race};
pub use predict::decode;
pub use preprocess::{normalize, ImageConfig, ImageTensor};
pub use session::{CancelToken, Session, TrainingRun, TrainingSummary};
