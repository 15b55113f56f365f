//! In-process reference engine.
//!
//! Tensors live in a host-memory slab keyed by id, so leaks are observable
//! through [`HostEngine::live_tensors`]. The model it trains is a constant
//! baseline: it learns one output vector (the label mean under the compiled
//! loss) by mini-batch gradient steps and predicts that vector for every
//! input. It exists to exercise the pipeline end to end; real networks plug
//! in through the same [`Engine`] trait.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use rand::seq::SliceRandom;

use crate::engine::compile::{CompileConfig, OptimizerConfig};
use crate::engine::contract::{Engine, EngineError};
use crate::engine::epoch_stats::EpochStats;
use crate::engine::fit_config::FitConfig;
use crate::engine::spec::ModelSpec;

/// Handle to a tensor stored in a [`HostEngine`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct TensorId(u64);

#[derive(Debug, Clone)]
struct HostTensor {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl HostTensor {
    /// Number of values in one row along axis 0.
    fn row_len(&self) -> usize {
        self.shape.iter().skip(1).product()
    }

    fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    fn row(&self, i: usize) -> &[f64] {
        let len = self.row_len();
        &self.data[i * len..(i + 1) * len]
    }
}

const ADAM_BETA1: f64 = 0.9;
const ADAM_BETA2: f64 = 0.999;
const ADAM_EPSILON: f64 = 1e-8;

/// Per-output first and second moment estimates for Adam.
#[derive(Debug, Clone)]
struct AdamMoments {
    m: Vec<f64>,
    v: Vec<f64>,
    step: i32,
}

impl AdamMoments {
    fn new(len: usize) -> Self {
        AdamMoments { m: vec![0.0; len], v: vec![0.0; len], step: 0 }
    }
}

/// Constant-output model produced by [`HostEngine::build`].
#[derive(Debug, Clone)]
pub struct HostModel {
    spec: ModelSpec,
    compiled: Option<CompileConfig>,
    output: Vec<f64>,
    moments: Option<AdamMoments>,
}

impl HostModel {
    /// The vector predicted for every input.
    pub fn output(&self) -> &[f64] {
        &self.output
    }

    /// Applies one optimizer step for a batch-averaged gradient.
    fn apply_gradient(&mut self, optimizer: OptimizerConfig, grad: &[f64]) {
        match optimizer {
            OptimizerConfig::Sgd { learning_rate } => {
                for (o, g) in self.output.iter_mut().zip(grad) {
                    *o -= learning_rate * g;
                }
            }
            OptimizerConfig::Adam { learning_rate } => {
                let len = self.output.len();
                let adam = self.moments.get_or_insert_with(|| AdamMoments::new(len));
                adam.step += 1;
                let bias1 = 1.0 - ADAM_BETA1.powi(adam.step);
                let bias2 = 1.0 - ADAM_BETA2.powi(adam.step);
                for (i, &g) in grad.iter().enumerate() {
                    adam.m[i] = ADAM_BETA1 * adam.m[i] + (1.0 - ADAM_BETA1) * g;
                    adam.v[i] = ADAM_BETA2 * adam.v[i] + (1.0 - ADAM_BETA2) * g * g;
                    let m_hat = adam.m[i] / bias1;
                    let v_hat = adam.v[i] / bias2;
                    self.output[i] -= learning_rate * m_hat / (v_hat.sqrt() + ADAM_EPSILON);
                }
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct HostEngine {
    next_id: AtomicU64,
    tensors: Mutex<HashMap<u64, HostTensor>>,
}

impl HostEngine {
    pub fn new() -> Self {
        HostEngine::default()
    }

    /// Tensors created and not yet disposed.
    pub fn live_tensors(&self) -> usize {
        self.slab().len()
    }

    fn slab(&self) -> std::sync::MutexGuard<'_, HashMap<u64, HostTensor>> {
        // A poisoned slab only means another thread panicked mid-call; the
        // map itself is never left half-updated.
        self.tensors.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn insert(&self, tensor: HostTensor) -> TensorId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.slab().insert(id, tensor);
        TensorId(id)
    }

    fn fetch(&self, id: &TensorId) -> Result<HostTensor, EngineError> {
        self.slab()
            .get(&id.0)
            .cloned()
            .ok_or_else(|| disposed(id))
    }

    fn shape_of(&self, id: &TensorId) -> Result<Vec<usize>, EngineError> {
        self.slab()
            .get(&id.0)
            .map(|t| t.shape.clone())
            .ok_or_else(|| disposed(id))
    }
}

fn disposed(id: &TensorId) -> EngineError {
    EngineError::new(format!("tensor {} has been disposed", id.0))
}

impl Engine for HostEngine {
    type Tensor = TensorId;
    type Model = HostModel;

    fn tensor(&self, shape: &[usize], data: Vec<f64>) -> Result<TensorId, EngineError> {
        let expected: usize = shape.iter().product();
        if shape.is_empty() || expected != data.len() {
            return Err(EngineError::new(format!(
                "shape {:?} needs {} values, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(self.insert(HostTensor { shape: shape.to_vec(), data }))
    }

    fn stack(&self, parts: &[&TensorId]) -> Result<TensorId, EngineError> {
        let mut rows = 0;
        let mut trailing: Option<Vec<usize>> = None;
        let mut data = Vec::new();
        {
            let slab = self.slab();
            for id in parts {
                let t = slab.get(&id.0).ok_or_else(|| disposed(id))?;
                let tail = t.shape[1..].to_vec();
                if let Some(expected) = &trailing {
                    if *expected != tail {
                        return Err(EngineError::new(format!(
                            "cannot stack shape {:?} onto trailing shape {:?}",
                            t.shape, expected
                        )));
                    }
                } else {
                    trailing = Some(tail);
                }
                rows += t.rows();
                data.extend_from_slice(&t.data);
            }
        }
        let trailing = trailing.ok_or_else(|| EngineError::new("cannot stack zero tensors"))?;
        let mut shape = vec![rows];
        shape.extend(trailing);
        Ok(self.insert(HostTensor { shape, data }))
    }

    fn dispose(&self, tensor: TensorId) {
        self.slab().remove(&tensor.0);
    }

    fn build(&self, spec: &ModelSpec) -> Result<HostModel, EngineError> {
        let units = spec
            .output_units()
            .ok_or_else(|| EngineError::new(format!("model '{}' has no dense output layer", spec.name)))?;
        Ok(HostModel { spec: spec.clone(), compiled: None, output: vec![0.0; units], moments: None })
    }

    fn compile(&self, model: &mut HostModel, config: &CompileConfig) -> Result<(), EngineError> {
        let lr = config.optimizer.learning_rate();
        if !(lr.is_finite() && lr > 0.0) {
            return Err(EngineError::new(format!("learning rate must be positive, got {}", lr)));
        }
        model.compiled = Some(config.clone());
        // Recompiling starts the optimizer from scratch.
        model.moments = None;
        Ok(())
    }

    fn fit_epoch(
        &self,
        model: &mut HostModel,
        xs: &TensorId,
        ys: &TensorId,
        config: &FitConfig,
        epoch: usize,
    ) -> Result<EpochStats, EngineError> {
        let compiled = model
            .compiled
            .clone()
            .ok_or_else(|| EngineError::new("model must be compiled before fit"))?;
        if config.batch_size == 0 {
            return Err(EngineError::new("batch_size must be at least 1"));
        }

        let x_shape = self.shape_of(xs)?;
        let y = self.fetch(ys)?;
        if x_shape[0] != y.rows() {
            return Err(EngineError::new(format!(
                "xs has {} samples but ys has {}",
                x_shape[0],
                y.rows()
            )));
        }
        if x_shape[1..] != model.spec.input_shape[..] {
            return Err(EngineError::new(format!(
                "xs sample shape {:?} does not match model input {:?}",
                &x_shape[1..],
                model.spec.input_shape
            )));
        }
        if y.row_len() != model.output.len() {
            return Err(EngineError::new(format!(
                "ys rows have {} values, model outputs {}",
                y.row_len(),
                model.output.len()
            )));
        }

        let (n_train, n_val) = config.split(y.rows());
        if n_train == 0 {
            return Err(EngineError::new("validation split leaves no training samples"));
        }

        let t_start = Instant::now();

        // Shuffle sample order each epoch.
        let mut indices: Vec<usize> = (0..n_train).collect();
        indices.shuffle(&mut rand::thread_rng());

        for batch in indices.chunks(config.batch_size) {
            let mut grad = vec![0.0; model.output.len()];
            for &i in batch {
                let d = compiled.loss.derivative(&model.output, y.row(i));
                for (g, di) in grad.iter_mut().zip(d) {
                    *g += di;
                }
            }
            let inv = 1.0 / batch.len() as f64;
            grad.iter_mut().for_each(|g| *g *= inv);
            model.apply_gradient(compiled.optimizer, &grad);
        }

        let mean_over = |range: std::ops::Range<usize>, f: &dyn Fn(&[f64]) -> f64| {
            let n = range.len();
            range.map(|i| f(y.row(i))).sum::<f64>() / n as f64
        };
        let loss = |row: &[f64]| compiled.loss.value(&model.output, row);
        let metric = compiled.metrics.first().copied();

        let train_loss = mean_over(0..n_train, &loss);
        let train_metric = metric.map(|m| mean_over(0..n_train, &|row: &[f64]| m.value(&model.output, row)));
        let (val_loss, val_metric) = if n_val > 0 {
            let range = n_train..n_train + n_val;
            (
                Some(mean_over(range.clone(), &loss)),
                metric.map(|m| mean_over(range, &|row: &[f64]| m.value(&model.output, row))),
            )
        } else {
            (None, None)
        };

        Ok(EpochStats {
            epoch,
            total_epochs: config.epochs,
            train_loss,
            val_loss,
            train_metric,
            val_metric,
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        })
    }

    fn predict(&self, model: &HostModel, input: &TensorId) -> Result<TensorId, EngineError> {
        let shape = self.shape_of(input)?;
        if shape[1..] != model.spec.input_shape[..] {
            return Err(EngineError::new(format!(
                "input sample shape {:?} does not match model input {:?}",
                &shape[1..],
                model.spec.input_shape
            )));
        }
        let rows = shape[0];
        let data = model.output.iter().copied().cycle().take(rows * model.output.len()).collect();
        self.tensor(&[rows, model.output.len()], data)
    }

    fn extract_values(&self, tensor: &TensorId) -> Result<Vec<f64>, EngineError> {
        Ok(self.fetch(tensor)?.data)
    }
}
