use serde::{Serialize, Deserialize};

/// Per-epoch training statistics.
///
/// A [`TrainingRun`](crate::session::TrainingRun) yields one `EpochStats`
/// per completed epoch. Consumers (e.g. the studio SSE handler) use this to
/// drive progress text and charts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Total epochs requested for this run.
    pub total_epochs: usize,
    /// Mean training loss over all training samples in this epoch.
    pub train_loss: f64,
    /// Mean validation loss, if a validation split was configured.
    pub val_loss: Option<f64>,
    /// First compiled metric on the training samples, if any.
    pub train_metric: Option<f64>,
    /// First compiled metric on the validation samples, if any.
    pub val_metric: Option<f64>,
    /// Wall-clock duration of this single epoch in milliseconds.
    pub elapsed_ms: u64,
}
