use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Re-entrancy guard for a user-facing action.
///
/// While a [`TriggerGuard`] is alive the trigger reads as disabled and a
/// second `disable()` fails with [`Error::Busy`]. Dropping the guard
/// re-enables it on every exit path, including early returns and errors.
#[derive(Debug, Clone, Default)]
pub struct Trigger {
    busy: Arc<AtomicBool>,
}

#[derive(Debug)]
pub struct TriggerGuard {
    busy: Arc<AtomicBool>,
}

impl Trigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        !self.busy.load(Ordering::Acquire)
    }

    pub fn disable(&self) -> Result<TriggerGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::Busy)?;
        Ok(TriggerGuard {
            busy: Arc::clone(&self.busy),
        })
    }
}

impl Drop for TriggerGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
