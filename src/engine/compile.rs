use serde::{Deserialize, Serialize};

/// Optimizer requested at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OptimizerConfig {
    Sgd { learning_rate: f64 },
    Adam { learning_rate: f64 },
}

impl OptimizerConfig {
    pub fn learning_rate(&self) -> f64 {
        match *self {
            OptimizerConfig::Sgd { learning_rate } | OptimizerConfig::Adam { learning_rate } => learning_rate,
        }
    }
}

/// Selects which loss function training minimizes.
///
/// - `MeanSquaredError`: regression over the whole label vector.
/// - `MeanAbsoluteError`: more tolerant of outlier ages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Loss {
    MeanSquaredError,
    MeanAbsoluteError,
}

impl Loss {
    /// Mean loss between one prediction and its target.
    pub fn value(self, predicted: &[f64], expected: &[f64]) -> f64 {
        let n = predicted.len() as f64;
        let total: f64 = predicted.iter().zip(expected.iter())
            .map(|(p, y)| match self {
                Loss::MeanSquaredError  => (p - y).powi(2),
                Loss::MeanAbsoluteError => (p - y).abs(),
            })
            .sum();
        total / n
    }

    /// Per-output gradient of [`Loss::value`] with respect to `predicted`.
    pub fn derivative(self, predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        let n = predicted.len() as f64;
        predicted.iter().zip(expected.iter())
            .map(|(p, y)| {
                let diff = p - y;
                match self {
                    Loss::MeanSquaredError  => 2.0 * diff / n,
                    Loss::MeanAbsoluteError => {
                        if diff > 0.0 { 1.0 / n } else if diff < 0.0 { -1.0 / n } else { 0.0 }
                    }
                }
            })
            .collect()
    }
}

/// Extra metrics reported per epoch alongside the loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Mae,
    Mse,
}

impl Metric {
    pub fn value(self, predicted: &[f64], expected: &[f64]) -> f64 {
        match self {
            Metric::Mae => Loss::MeanAbsoluteError.value(predicted, expected),
            Metric::Mse => Loss::MeanSquaredError.value(predicted, expected),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileConfig {
    pub optimizer: OptimizerConfig,
    pub loss: Loss,
    #[serde(default)]
    pub metrics: Vec<Metric>,
}

impl Default for CompileConfig {
    fn default() -> Self {
        CompileConfig {
            optimizer: OptimizerConfig::Adam { learning_rate: 0.001 },
            loss: Loss::MeanSquaredError,
            metrics: vec![Metric::Mae],
        }
    }
}
