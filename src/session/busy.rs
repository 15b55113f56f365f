use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{PipelineError, Result};

/// Marks a session as occupied by one training or prediction request.
#[derive(Debug, Default)]
pub struct BusyFlag(AtomicBool);

impl BusyFlag {
    /// Claims the flag, or fails with [`PipelineError::Busy`] if it is held.
    pub fn acquire(&self) -> Result<BusyGuard<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map(|_| BusyGuard { flag: self })
            .map_err(|_| PipelineError::Busy)
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Releases the flag when dropped.
#[derive(Debug)]
pub struct BusyGuard<'a> {
    flag: &'a BusyFlag,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.0.store(false, Ordering::Release);
    }
}
