pub mod assembler;
pub mod sample;

pub use assembler::{assemble, TrainingBatch, DEFAULT_SAMPLE_LIMIT};
pub use sample::{read_dir_samples, RawSample};
