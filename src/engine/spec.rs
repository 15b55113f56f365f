use serde::{Deserialize, Serialize};

use crate::label::LABEL_LEN;
use crate::preprocess::ImageConfig;

/// Activation applied after a layer's linear transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Linear,
    Relu,
    Sigmoid,
    Softmax,
}

/// Describes one layer of the model handed to the engine.
///
/// The pipeline only describes layers; building and running them is the
/// engine's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerSpec {
    Conv2d { filters: usize, kernel_size: usize, activation: Activation },
    MaxPool2d { pool_size: usize },
    Flatten,
    Dense { units: usize, activation: Activation },
    Dropout { rate: f64 },
}

/// A serializable model architecture.
///
/// `ModelSpec` can be saved to / loaded from JSON independently of any
/// trained weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Human-readable model name.
    pub name: String,
    /// `[height, width, channels]` of one input sample.
    pub input_shape: [usize; 3],
    /// Ordered list of layers (input → output).
    pub layers: Vec<LayerSpec>,
}

impl ModelSpec {
    /// Three conv/pool stages, a dense hidden layer and an 8-unit sigmoid
    /// head matching the label vector layout.
    pub fn face_default(image: &ImageConfig) -> Self {
        let conv = |filters| LayerSpec::Conv2d { filters, kernel_size: 3, activation: Activation::Relu };
        let pool = LayerSpec::MaxPool2d { pool_size: 2 };
        ModelSpec {
            name: "face-attributes".into(),
            input_shape: image.shape(),
            layers: vec![
                conv(32),
                pool.clone(),
                conv(64),
                pool.clone(),
                conv(128),
                pool,
                LayerSpec::Flatten,
                LayerSpec::Dense { units: 128, activation: Activation::Relu },
                LayerSpec::Dropout { rate: 0.5 },
                LayerSpec::Dense { units: LABEL_LEN, activation: Activation::Sigmoid },
            ],
        }
    }

    /// Units of the last dense layer, i.e. the model's output width.
    pub fn output_units(&self) -> Option<usize> {
        self.layers.iter().rev().find_map(|l| match l {
            LayerSpec::Dense { units, .. } => Some(*units),
            _ => None,
        })
    }

    /// Checks the spec against the pipeline's tensor layout.
    pub fn validate(&self, image: &ImageConfig) -> Result<(), String> {
        if self.input_shape != image.shape() {
            return Err(format!(
                "model input shape {:?} does not match image shape {:?}",
                self.input_shape,
                image.shape()
            ));
        }
        match self.output_units() {
            Some(LABEL_LEN) => Ok(()),
            Some(n) => Err(format!("model outputs {} values, labels have {}", n, LABEL_LEN)),
            None => Err("model has no dense output layer".into()),
        }
    }
}
