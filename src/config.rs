use serde::{Deserialize, Serialize};

use crate::dataset::DEFAULT_SAMPLE_LIMIT;
use crate::engine::{CompileConfig, FitConfig, ModelSpec};
use crate::error::Result;
use crate::preprocess::ImageConfig;

/// Everything a [`Session`](crate::session::Session) needs to assemble,
/// build, compile and train.
///
/// Every field has a default, so a JSON file only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub image: ImageConfig,
    /// Maximum samples looked at per training request.
    pub sample_limit: usize,
    pub model: ModelSpec,
    pub compile: CompileConfig,
    pub fit: FitConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let image = ImageConfig::default();
        PipelineConfig {
            model: ModelSpec::face_default(&image),
            image,
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            compile: CompileConfig::default(),
            fit: FitConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Serializes the config to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a config from a JSON file.
    pub fn load_json(path: &str) -> Result<PipelineConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
