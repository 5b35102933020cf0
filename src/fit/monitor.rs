use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use crate::error::AssayError;

/// Cooperative cancellation flag shared between a caller and a running fit
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

type ProgressCallback = Arc<dyn Fn(u32) + Send + Sync>;

/// Progress and cancellation side channel of a long-running fit
///
/// The percentage can be polled from another thread through
/// [`FitMonitor::percent`], or pushed to a callback registered with
/// [`FitMonitor::on_progress`]. Clones share the same state.
#[derive(Clone, Default)]
pub struct FitMonitor {
    token: CancellationToken,
    percent: Arc<AtomicU32>,
    callback: Option<ProgressCallback>,
}

impl FitMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing token, e.g. one shared by several fits
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            ..Default::default()
        }
    }

    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Last reported completion, 0-100
    pub fn percent(&self) -> u32 {
        self.percent.load(Ordering::Relaxed)
    }

    pub(crate) fn report(&self, completed: usize, total: usize) {
        let percent = if total == 0 {
            100
        } else {
            ((completed.min(total) * 100) / total) as u32
        };
        self.percent.store(percent, Ordering::Relaxed);
        if let Some(callback) = &self.callback {
            callback(percent);
        }
    }

    /// Fail with [`AssayError::Cancelled`] if cancellation was requested
    pub(crate) fn checkpoint(&self, stage: &'static str) -> Result<(), AssayError> {
        if self.token.is_cancelled() {
            tracing::info!(stage, percent = self.percent(), "Fit cancelled");
            return Err(AssayError::Cancelled {
                stage,
                percent: self.percent(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for FitMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FitMonitor")
            .field("cancelled", &self.token.is_cancelled())
            .field("percent", &self.percent())
            .field("callback", &self.callback.is_some())
            .finish()
    }
}
