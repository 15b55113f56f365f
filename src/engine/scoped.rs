use std::fmt;
use std::ops::Deref;

use crate::engine::contract::{Engine, EngineError};

/// An engine tensor that is disposed when the guard goes out of scope,
/// on success and error paths alike.
pub struct Scoped<'e, E: Engine> {
    engine: &'e E,
    tensor: Option<E::Tensor>,
}

impl<'e, E: Engine> Scoped<'e, E> {
    /// Takes ownership of an already-created tensor.
    pub fn new(engine: &'e E, tensor: E::Tensor) -> Self {
        Scoped { engine, tensor: Some(tensor) }
    }

    /// Creates a tensor and wraps it in one step.
    pub fn create(engine: &'e E, shape: &[usize], data: Vec<f64>) -> Result<Self, EngineError> {
        Ok(Scoped::new(engine, engine.tensor(shape, data)?))
    }

    /// Hands the tensor back to the caller, who becomes responsible for
    /// disposing it.
    pub fn into_inner(mut self) -> E::Tensor {
        // Only `Drop` and this method take the tensor, and both consume the guard.
        self.tensor.take().expect("scoped tensor already released")
    }
}

impl<E: Engine> Deref for Scoped<'_, E> {
    type Target = E::Tensor;

    fn deref(&self) -> &E::Tensor {
        self.tensor.as_ref().expect("scoped tensor already released")
    }
}

impl<E: Engine> Drop for Scoped<'_, E> {
    fn drop(&mut self) {
        if let Some(t) = self.tensor.take() {
            self.engine.dispose(t);
        }
    }
}

impl<E: Engine> fmt::Debug for Scoped<'_, E>
where
    E::Tensor: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Scoped").field(&self.tensor).finish()
    }
}
