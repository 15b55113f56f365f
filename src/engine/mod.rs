pub mod compile;
pub mod contract;
pub mod epoch_stats;
pub mod fit_config;
pub mod host;
pub mod scoped;
pub mod spec;

pub use compile::{CompileConfig, Loss, Metric, OptimizerConfig};
pub use contract::{Engine, EngineError};
pub use epoch_stats::EpochStats;
pub use fit_config::FitConfig;
pub use host::{HostEngine, HostModel, TensorId};
pub use scoped::Scoped;
pub use spec::{Activation, LayerSpec, ModelSpec};
