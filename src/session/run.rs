use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::dataset::TrainingBatch;
use crate::engine::{Engine, EpochStats, FitConfig};
use crate::error::Result;
use crate::session::busy::BusyGuard;
use crate::session::cancel::CancelToken;
use crate::session::session::Session;

/// What a finished (or stopped) training run did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub epochs_completed: usize,
    pub total_epochs: usize,
    pub samples: usize,
    pub dropped: usize,
    pub was_cancelled: bool,
    pub elapsed_total_ms: u64,
    /// Loss reported by the last completed epoch.
    pub final_loss: Option<f64>,
}

/// A training run in progress, consumed as a sequence of epoch events.
///
/// Each call to `next()` trains exactly one epoch and yields its
/// [`EpochStats`]. The sequence is finite (at most `epochs` items) and
/// cannot be restarted.
///
/// # Termination
/// - After the last epoch, or as soon as the [`CancelToken`] is observed
///   between epochs, the trained model is installed into the session and
///   the batch tensors are released.
/// - If the engine fails, the error is yielded once, the batch is released
///   and the session keeps its previous model.
/// - Dropping the run early discards the partially trained model.
///
/// The session stays busy until one of the above happens.
pub struct TrainingRun<'s, E: Engine> {
    session: &'s Session<E>,
    busy: Option<BusyGuard<'s>>,
    batch: Option<TrainingBatch<'s, E>>,
    model: Option<E::Model>,
    fit: FitConfig,
    cancel: CancelToken,
    started: Instant,
    samples: usize,
    dropped: usize,
    next_epoch: usize,
    final_loss: Option<f64>,
    cancelled: bool,
    finished: bool,
}

impl<'s, E: Engine> TrainingRun<'s, E> {
    pub(crate) fn new(
        session: &'s Session<E>,
        busy: BusyGuard<'s>,
        batch: TrainingBatch<'s, E>,
        model: E::Model,
        fit: FitConfig,
        cancel: CancelToken,
        started: Instant,
    ) -> Self {
        let mut run = TrainingRun {
            session,
            busy: Some(busy),
            samples: batch.len(),
            dropped: batch.dropped(),
            batch: Some(batch),
            model: Some(model),
            fit,
            cancel,
            started,
            next_epoch: 1,
            final_loss: None,
            cancelled: false,
            finished: false,
        };
        if fit.epochs == 0 {
            run.complete();
        }
        run
    }

    /// Samples in the training batch.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Samples skipped because their file names carried no label.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn total_epochs(&self) -> usize {
        self.fit.epochs
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn summary(&self) -> TrainingSummary {
        TrainingSummary {
            epochs_completed: self.next_epoch - 1,
            total_epochs: self.fit.epochs,
            samples: self.samples,
            dropped: self.dropped,
            was_cancelled: self.cancelled,
            elapsed_total_ms: self.started.elapsed().as_millis() as u64,
            final_loss: self.final_loss,
        }
    }

    /// Drains the remaining epochs and returns the summary, or the first
    /// engine error.
    pub fn finish(mut self) -> Result<TrainingSummary> {
        for event in self.by_ref() {
            event?;
        }
        Ok(self.summary())
    }

    fn train_next_epoch(&mut self) -> Option<Result<EpochStats>> {
        let (model, batch) = match (self.model.as_mut(), self.batch.as_ref()) {
            (Some(m), Some(b)) => (m, b),
            _ => return None,
        };

        let epoch = self.next_epoch;
        match self.session.engine().fit_epoch(model, &batch.xs, &batch.ys, &self.fit, epoch) {
            Ok(stats) => {
                tracing::debug!(epoch, total = self.fit.epochs, loss = stats.train_loss, "epoch finished");
                self.next_epoch += 1;
                self.final_loss = Some(stats.train_loss);
                self.session.set_status(format!(
                    "Epoch {}/{}: loss {:.4}",
                    epoch, self.fit.epochs, stats.train_loss
                ));
                Some(Ok(stats))
            }
            Err(e) => {
                let err = e.into();
                self.session.report_failure("training", &err);
                self.abort();
                Some(Err(err))
            }
        }
    }

    /// Installs the model and releases the batch and busy flag.
    fn complete(&mut self) {
        self.finished = true;
        self.batch = None;
        if let Some(model) = self.model.take() {
            self.session.install_model(model);
        }
        let summary = self.summary();
        tracing::info!(
            epochs = summary.epochs_completed,
            cancelled = summary.was_cancelled,
            elapsed_ms = summary.elapsed_total_ms,
            "training finished"
        );
        self.session.set_status(if summary.was_cancelled {
            format!("Training stopped after {} of {} epochs", summary.epochs_completed, summary.total_epochs)
        } else {
            format!("Training complete: {} epochs on {} samples", summary.epochs_completed, summary.samples)
        });
        self.busy = None;
    }

    /// Releases everything without touching the session's model.
    fn abort(&mut self) {
        self.finished = true;
        self.batch = None;
        self.model = None;
        self.busy = None;
    }
}

impl<E: Engine> Iterator for TrainingRun<'_, E> {
    type Item = Result<EpochStats>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if self.cancel.is_cancelled() {
            self.cancelled = true;
            self.complete();
            return None;
        }

        let event = self.train_next_epoch();

        if !self.finished {
            if self.next_epoch > self.fit.epochs {
                self.complete();
            } else if self.cancel.is_cancelled() {
                self.cancelled = true;
                self.complete();
            }
        }
        event
    }
}

impl<E: Engine> Drop for TrainingRun<'_, E> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(epochs = self.next_epoch - 1, "training run dropped before finishing");
            self.session.set_status("Training abandoned");
        }
    }
}
