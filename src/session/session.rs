use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::dataset::{assemble, RawSample};
use crate::engine::{Engine, FitConfig, Scoped};
use crate::error::{PipelineError, Result};
use crate::label::PredictionResult;
use crate::predict::decode;
use crate::preprocess::normalize_with;
use crate::session::busy::BusyFlag;
use crate::session::cancel::CancelToken;
use crate::session::run::TrainingRun;

/// Request-scoped state for one model: the engine, the trained model handle,
/// a busy flag that keeps training and prediction from overlapping, and the
/// last prediction and status line for display.
///
/// All methods take `&self`, so a session can be shared between threads
/// (e.g. behind an `Arc`).
pub struct Session<E: Engine> {
    engine: E,
    config: PipelineConfig,
    model: Mutex<Option<E::Model>>,
    busy: BusyFlag,
    last_prediction: Mutex<Option<PredictionResult>>,
    status: Mutex<String>,
}

impl<E: Engine> Session<E> {
    pub fn new(engine: E, config: PipelineConfig) -> Self {
        Session {
            engine,
            config,
            model: Mutex::new(None),
            busy: BusyFlag::default(),
            last_prediction: Mutex::new(None),
            status: Mutex::new("Idle".into()),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_set()
    }

    pub fn has_model(&self) -> bool {
        lock(&self.model).is_some()
    }

    pub fn last_prediction(&self) -> Option<PredictionResult> {
        *lock(&self.last_prediction)
    }

    /// One-line, user-facing description of what the session last did.
    pub fn status(&self) -> String {
        lock(&self.status).clone()
    }

    /// Assembles a batch from `samples`, builds and compiles a fresh model,
    /// and returns the run that trains it one epoch per `next()`.
    ///
    /// The session stays busy until the run finishes or is dropped.
    pub fn train<I>(&self, samples: I, cancel: CancelToken) -> Result<TrainingRun<'_, E>>
    where
        I: IntoIterator<Item = RawSample>,
    {
        self.train_with(samples, self.config.fit, cancel)
    }

    /// Like [`Session::train`] with per-request fit settings.
    pub fn train_with<I>(&self, samples: I, fit: FitConfig, cancel: CancelToken) -> Result<TrainingRun<'_, E>>
    where
        I: IntoIterator<Item = RawSample>,
    {
        let busy = self.busy.acquire()?;
        self.set_status("Preparing training data");

        let prepared = self
            .config
            .model
            .validate(&self.config.image)
            .map_err(PipelineError::InvalidModel)
            .and_then(|()| assemble(&self.engine, samples, self.config.sample_limit, &self.config.image))
            .and_then(|batch| {
                let mut model = self.engine.build(&self.config.model)?;
                self.engine.compile(&mut model, &self.config.compile)?;
                Ok((batch, model))
            });

        match prepared {
            Ok((batch, model)) => {
                tracing::info!(
                    samples = batch.len(),
                    dropped = batch.dropped(),
                    epochs = fit.epochs,
                    "training started"
                );
                self.set_status(format!(
                    "Training on {} samples ({} skipped)",
                    batch.len(),
                    batch.dropped()
                ));
                Ok(TrainingRun::new(self, busy, batch, model, fit, cancel, Instant::now()))
            }
            Err(e) => {
                self.report_failure("training", &e);
                Err(e)
            }
        }
    }

    /// Runs the trained model on one image.
    pub fn predict(&self, bytes: &[u8]) -> Result<PredictionResult> {
        let _busy = self.busy.acquire()?;
        match self.run_prediction(bytes) {
            Ok(p) => {
                *lock(&self.last_prediction) = Some(p);
                self.set_status(format!("Predicted age {}, {:?}, {:?}", p.age, p.gender, p.race));
                Ok(p)
            }
            Err(e) => {
                self.report_failure("prediction", &e);
                Err(e)
            }
        }
    }

    fn run_prediction(&self, bytes: &[u8]) -> Result<PredictionResult> {
        let model = lock(&self.model);
        let model = model.as_ref().ok_or(PipelineError::NoModel)?;

        let pixels = normalize_with(bytes, &self.config.image)?;
        let input = Scoped::create(&self.engine, &pixels.batch_shape(), pixels.into_data())?;
        let output = Scoped::new(&self.engine, self.engine.predict(model, &input)?);
        drop(input);
        let values = self.engine.extract_values(&output)?;
        drop(output);

        decode(&values)
    }

    pub(crate) fn install_model(&self, model: E::Model) {
        *lock(&self.model) = Some(model);
    }

    pub(crate) fn set_status(&self, text: impl Into<String>) {
        *lock(&self.status) = text.into();
    }

    pub(crate) fn report_failure(&self, what: &str, err: &PipelineError) {
        tracing::error!(error = ?err, "{} failed", what);
        self.set_status(format!("Error: {}", err));
    }
}

/// Locks `m`, recovering the data if a previous holder panicked.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
