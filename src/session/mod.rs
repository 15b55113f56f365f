pub mod busy;
pub mod cancel;
pub mod run;
pub mod session;

pub use busy::{BusyFlag, BusyGuard};
pub use cancel::CancelToken;
pub use run::{TrainingRun, TrainingSummary};
pub use session::Session;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::dataset::RawSample;
    use crate::engine::{
        CompileConfig, Engine, EngineError, EpochStats, FitConfig, HostEngine, HostModel, ModelSpec,
        OptimizerConfig, TensorId,
    };
    use crate::error::PipelineError;
    use crate::label::{Gender, Race};
    use crate::preprocess::ImageConfig;
    use crate::test_support::png_bytes;

    fn config(epochs: usize) -> PipelineConfig {
        let image = ImageConfig { width: 8, height: 8 };
        PipelineConfig {
            model: ModelSpec::face_default(&image),
            image,
            sample_limit: 100,
            compile: CompileConfig {
                optimizer: OptimizerConfig::Sgd { learning_rate: 0.5 },
                ..CompileConfig::default()
            },
            fit: FitConfig { epochs, batch_size: 2, validation_split: 0.0 },
        }
    }

    fn samples() -> Vec<RawSample> {
        ["30_1_2_a.png", "30_1_2_b.png", "junk.png", "30_1_2_c.png"]
            .iter()
            .map(|n| RawSample::new(*n, png_bytes(5, 5, [1, 2, 3])))
            .collect()
    }

    #[test]
    fn one_event_per_epoch_then_model_installed() {
        let session = Session::new(HostEngine::new(), config(25));
        let run = session.train(samples(), CancelToken::new()).unwrap();
        assert_eq!(run.samples(), 3);
        assert_eq!(run.dropped(), 1);
        assert!(session.is_busy());

        let events: Vec<EpochStats> = run.map(|e| e.unwrap()).collect();
        assert_eq!(events.len(), 25);
        assert_eq!(events.iter().map(|e| e.epoch).collect::<Vec<_>>(), (1..=25).collect::<Vec<_>>());
        assert!(!session.is_busy());
        assert!(session.has_model());
        assert_eq!(session.engine().live_tensors(), 0);

        let p = session.predict(&png_bytes(3, 9, [0, 0, 0])).unwrap();
        assert_eq!(p, crate::label::PredictionResult { age: 30, gender: Gender::Female, race: Race::Asian });
        assert_eq!(session.last_prediction(), Some(p));
        assert_eq!(session.engine().live_tensors(), 0);
    }

    #[test]
    fn run_cannot_be_restarted() {
        let session = Session::new(HostEngine::new(), config(2));
        let mut run = session.train(samples(), CancelToken::new()).unwrap();
        assert!(run.next().is_some());
        assert!(run.next().is_some());
        assert!(run.next().is_none());
        assert!(run.next().is_none());
        assert!(run.is_finished());
        assert_eq!(run.summary().epochs_completed, 2);
    }

    #[test]
    fn cancel_between_epochs_keeps_partial_model() {
        let session = Session::new(HostEngine::new(), config(10));
        let cancel = CancelToken::new();
        let mut run = session.train(samples(), cancel.clone()).unwrap();
        run.next().unwrap().unwrap();
        run.next().unwrap().unwrap();
        cancel.cancel();
        assert!(run.next().is_none());
        assert!(run.was_cancelled());
        let summary = run.summary();
        assert_eq!((summary.epochs_completed, summary.was_cancelled), (2, true));
        drop(run);

        assert!(session.has_model());
        assert!(!session.is_busy());
        assert!(session.status().contains("stopped after 2 of 10"));
        assert_eq!(session.engine().live_tensors(), 0);
    }

    #[test]
    fn finish_drains_remaining_epochs() {
        let session = Session::new(HostEngine::new(), config(4));
        let summary = session.train(samples(), CancelToken::new()).unwrap().finish().unwrap();
        assert_eq!(summary.epochs_completed, 4);
        assert_eq!(summary.samples, 3);
        assert!(!summary.was_cancelled);
        assert!(summary.final_loss.is_some());
    }

    #[test]
    fn predict_while_training_is_busy() {
        let session = Session::new(HostEngine::new(), config(3));
        let run = session.train(samples(), CancelToken::new()).unwrap();
        assert!(matches!(session.predict(&png_bytes(2, 2, [0, 0, 0])), Err(PipelineError::Busy)));
        assert!(matches!(session.train(samples(), CancelToken::new()), Err(PipelineError::Busy)));
        drop(run);
        assert!(!session.is_busy());
        assert!(!session.has_model());
        assert_eq!(session.engine().live_tensors(), 0);
    }

    #[test]
    fn predict_before_training_has_no_model() {
        let session = Session::new(HostEngine::new(), config(1));
        assert!(matches!(session.predict(&png_bytes(2, 2, [0, 0, 0])), Err(PipelineError::NoModel)));
        assert!(session.status().starts_with("Error:"));
        assert!(!session.is_busy());
    }

    #[test]
    fn predict_rejects_non_images() {
        let session = Session::new(HostEngine::new(), config(1));
        session.train(samples(), CancelToken::new()).unwrap().finish().unwrap();
        assert!(matches!(session.predict(b"nope"), Err(PipelineError::Decode(_))));
        assert_eq!(session.last_prediction(), None);
        assert_eq!(session.engine().live_tensors(), 0);
    }

    #[test]
    fn empty_training_set_is_reported() {
        let session = Session::new(HostEngine::new(), config(1));
        let only_junk = vec![RawSample::new("junk.png", png_bytes(2, 2, [0, 0, 0]))];
        assert!(matches!(
            session.train(only_junk, CancelToken::new()),
            Err(PipelineError::EmptyBatch { considered: 1, dropped: 1 })
        ));
        assert!(!session.is_busy());
        assert!(session.status().contains("no usable training samples"));
    }

    /// Delegates to a [`HostEngine`] but fails `fit_epoch` from a given epoch.
    struct FlakyEngine {
        inner: HostEngine,
        fail_from: usize,
    }

    impl Engine for FlakyEngine {
        type Tensor = TensorId;
        type Model = HostModel;

        fn tensor(&self, shape: &[usize], data: Vec<f64>) -> Result<TensorId, EngineError> {
            self.inner.tensor(shape, data)
        }
        fn stack(&self, parts: &[&TensorId]) -> Result<TensorId, EngineError> {
            self.inner.stack(parts)
        }
        fn dispose(&self, tensor: TensorId) {
            self.inner.dispose(tensor)
        }
        fn build(&self, spec: &ModelSpec) -> Result<HostModel, EngineError> {
            self.inner.build(spec)
        }
        fn compile(&self, model: &mut HostModel, config: &CompileConfig) -> Result<(), EngineError> {
            self.inner.compile(model, config)
        }
        fn fit_epoch(
            &self,
            model: &mut HostModel,
            xs: &TensorId,
            ys: &TensorId,
            config: &FitConfig,
            epoch: usize,
        ) -> Result<EpochStats, EngineError> {
            if epoch >= self.fail_from {
                return Err(EngineError::new("device lost"));
            }
            self.inner.fit_epoch(model, xs, ys, config, epoch)
        }
        fn predict(&self, model: &HostModel, input: &TensorId) -> Result<TensorId, EngineError> {
            self.inner.predict(model, input)
        }
        fn extract_values(&self, tensor: &TensorId) -> Result<Vec<f64>, EngineError> {
            self.inner.extract_values(tensor)
        }
    }

    #[test]
    fn engine_error_is_yielded_once_and_passed_through() {
        let engine = FlakyEngine { inner: HostEngine::new(), fail_from: 2 };
        let session = Session::new(engine, config(5));
        let mut run = session.train(samples(), CancelToken::new()).unwrap();

        assert!(run.next().unwrap().is_ok());
        match run.next() {
            Some(Err(PipelineError::Engine(e))) => assert_eq!(e.to_string(), "device lost"),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(run.next().is_none());
        drop(run);

        assert!(!session.has_model());
        assert!(!session.is_busy());
        assert_eq!(session.engine().inner.live_tensors(), 0);
    }
}
