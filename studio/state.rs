use std::sync::{Arc, Mutex, MutexGuard};

use ferrite_face::{CancelToken, HostEngine, PipelineConfig, Session};

/// Everything the request handlers share.
pub struct StudioState {
    /// Model, busy flag, last prediction and status line.
    pub session: Session<HostEngine>,
    /// Stop handle for the training run in progress, if any.
    cancel: Mutex<Option<CancelToken>>,
}

impl StudioState {
    pub fn new(config: PipelineConfig) -> Self {
        StudioState {
            session: Session::new(HostEngine::new(), config),
            cancel: Mutex::new(None),
        }
    }

    fn cancel_slot(&self) -> MutexGuard<'_, Option<CancelToken>> {
        self.cancel.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Publishes the stop handle of the run that just started.
    pub fn set_cancel(&self, token: CancelToken) {
        *self.cancel_slot() = Some(token);
    }

    /// Clears the stop handle, unless a newer run has already replaced it.
    pub fn clear_cancel(&self, token: &CancelToken) {
        let mut slot = self.cancel_slot();
        if slot.as_ref().map_or(false, |t| t.same_as(token)) {
            *slot = None;
        }
    }

    /// Requests a stop of the running training. Returns whether one was running.
    pub fn request_stop(&self) -> bool {
        match self.cancel_slot().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

/// Shared state type: an `Arc<StudioState>` passed to every handler.
pub type SharedState = Arc<StudioState>;
