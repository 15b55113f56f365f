use serde::{Deserialize, Serialize};

/// Configuration for one training run.
///
/// # Fields
/// - `epochs`: total number of full passes over the training batch
/// - `batch_size`: samples per mini-batch; use `1` for online updates
/// - `validation_split`: trailing fraction of the batch held out for
///   validation, in `[0, 1)`; `0` disables validation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub validation_split: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        FitConfig { epochs: 10, batch_size: 32, validation_split: 0.2 }
    }
}

impl FitConfig {
    /// Splits `n` samples into `(train, validation)` counts.
    pub fn split(&self, n: usize) -> (usize, usize) {
        let split = self.validation_split.clamp(0.0, 1.0);
        let val = (n as f64 * split).floor() as usize;
        (n - val, val)
    }
}
