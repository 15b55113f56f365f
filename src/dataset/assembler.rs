use crate::dataset::sample::RawSample;
use crate::engine::{Engine, Scoped};
use crate::error::{PipelineError, Result};
use crate::label::{encode_label, parse_label, LABEL_LEN};
use crate::preprocess::{normalize_with, ImageConfig};

/// Default cap on how many samples one assembly looks at.
pub const DEFAULT_SAMPLE_LIMIT: usize = 100;

/// Aligned image and label tensors ready for training.
///
/// `xs` has shape `[N, height, width, 3]` and `ys` has shape `[N, 8]`. Both
/// are released when the batch is dropped.
pub struct TrainingBatch<'e, E: Engine> {
    pub xs: Scoped<'e, E>,
    pub ys: Scoped<'e, E>,
    len: usize,
    considered: usize,
    dropped: usize,
}

impl<E: Engine> TrainingBatch<'_, E> {
    /// Samples in the batch.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; assembly refuses to build an empty batch.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Samples looked at, never more than the assembly limit.
    pub fn considered(&self) -> usize {
        self.considered
    }

    /// Samples skipped because their file name carried no label.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

/// Builds a [`TrainingBatch`] from at most `limit` samples.
///
/// Samples whose file name does not parse are skipped and counted in
/// [`TrainingBatch::dropped`]. An out-of-range race code or an undecodable
/// image aborts the whole assembly. Every per-sample tensor is released as
/// soon as the batch tensors exist, and everything created so far is
/// released on error.
pub fn assemble<'e, E, I>(
    engine: &'e E,
    samples: I,
    limit: usize,
    image: &ImageConfig,
) -> Result<TrainingBatch<'e, E>>
where
    E: Engine,
    I: IntoIterator<Item = RawSample>,
{
    let mut images: Vec<Scoped<'e, E>> = Vec::new();
    let mut labels: Vec<Scoped<'e, E>> = Vec::new();
    let mut considered = 0;
    let mut dropped = 0;

    let [h, w, c] = image.shape();

    for sample in samples.into_iter().take(limit) {
        considered += 1;

        let triple = match parse_label(&sample.filename) {
            Some(t) => t,
            None => {
                tracing::debug!(filename = %sample.filename, "skipping sample without a parseable label");
                dropped += 1;
                continue;
            }
        };

        let label = encode_label(&triple)?;
        let pixels = normalize_with(&sample.bytes, image)?;

        images.push(Scoped::create(engine, &[1, h, w, c], pixels.into_data())?);
        labels.push(Scoped::create(engine, &[1, LABEL_LEN], label.0.to_vec())?);
    }

    if images.is_empty() {
        tracing::warn!(considered, dropped, "no usable samples in training set");
        return Err(PipelineError::EmptyBatch { considered, dropped });
    }

    let xs = stack_all(engine, &images)?;
    let ys = stack_all(engine, &labels)?;
    let len = images.len();
    drop(images);
    drop(labels);

    tracing::info!(samples = len, considered, dropped, "assembled training batch");
    Ok(TrainingBatch { xs, ys, len, considered, dropped })
}

fn stack_all<'e, E: Engine>(engine: &'e E, parts: &[Scoped<'e, E>]) -> Result<Scoped<'e, E>> {
    let refs: Vec<&E::Tensor> = parts.iter().map(|p| &**p).collect();
    Ok(Scoped::new(engine, engine.stack(&refs)?))
}
