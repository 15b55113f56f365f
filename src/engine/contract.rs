use thiserror::Error;

use crate::engine::compile::CompileConfig;
use crate::engine::epoch_stats::EpochStats;
use crate::engine::fit_config::FitConfig;
use crate::engine::spec::ModelSpec;

/// Failure reported by an engine. The pipeline never interprets the message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EngineError {
    pub message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        EngineError { message: message.into() }
    }
}

/// The numeric backend that owns tensor memory, builds models, trains and
/// predicts.
///
/// Every method takes `&self`; implementations keep their own interior
/// state so that [`Scoped`](crate::engine::Scoped) handles can borrow the
/// engine while other calls are made.
///
/// Tensors are owned handles. A tensor is alive from the call that returned
/// it until it is passed to [`Engine::dispose`]; the pipeline never clones
/// a handle.
pub trait Engine: Send + Sync {
    type Tensor: Send;
    type Model: Send;

    /// Creates a tensor holding `data` in row-major order.
    fn tensor(&self, shape: &[usize], data: Vec<f64>) -> Result<Self::Tensor, EngineError>;

    /// Concatenates `parts` along axis 0. Trailing dimensions must agree.
    fn stack(&self, parts: &[&Self::Tensor]) -> Result<Self::Tensor, EngineError>;

    /// Releases the memory behind `tensor`.
    fn dispose(&self, tensor: Self::Tensor);

    fn build(&self, spec: &ModelSpec) -> Result<Self::Model, EngineError>;

    fn compile(&self, model: &mut Self::Model, config: &CompileConfig) -> Result<(), EngineError>;

    /// Runs one pass over `xs`/`ys`. `epoch` is 1-based.
    fn fit_epoch(
        &self,
        model: &mut Self::Model,
        xs: &Self::Tensor,
        ys: &Self::Tensor,
        config: &FitConfig,
        epoch: usize,
    ) -> Result<EpochStats, EngineError>;

    fn predict(&self, model: &Self::Model, input: &Self::Tensor) -> Result<Self::Tensor, EngineError>;

    /// Copies the tensor's values out in row-major order.
    fn extract_values(&self, tensor: &Self::Tensor) -> Result<Vec<f64>, EngineError>;
}
