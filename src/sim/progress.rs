//! Progress reporting for simulation runs.
//!
//! A [`Progress`] wraps a callback that the driver invokes after every
//! written snapshot.
//!
//! # Example
//!
//! ```
//! use tetsnap::sim::Progress;
//!
//! let progress = Progress::new(|step| {
//!     println!("[{}/{}] t={:.2} {}", step.index + 1, step.total, step.time, step.path.display());
//! });
//! ```

use std::path::Path;

/// What the driver knows right after writing one snapshot.
#[derive(Debug, Clone, Copy)]
pub struct StepReport<'a> {
    /// Snapshot index (0 is the initial state).
    pub index: usize,
    /// Total number of snapshots in the run.
    pub total: usize,
    /// Simulated time of the snapshot.
    pub time: f64,
    /// File the snapshot was written to.
    pub path: &'a Path,
}

impl StepReport<'_> {
    /// Whether this is the final snapshot of the run.
    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.total
    }

    /// Completed fraction of the run, in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        ((self.index + 1) as f64 / self.total as f64).min(1.0)
    }
}

/// A progress callback invoked once per snapshot.
pub struct Progress {
    callback: Box<dyn Fn(&StepReport<'_>) + Send + Sync>,
}

impl Progress {
    /// Create a new progress reporter with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&StepReport<'_>) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Report one snapshot.
    #[inline]
    pub fn report(&self, step: &StepReport<'_>) {
        (self.callback)(step);
    }

    /// Create a no-op progress reporter that discards all updates.
    pub fn none() -> Self {
        Self::new(|_| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}
