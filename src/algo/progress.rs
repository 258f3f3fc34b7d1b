//! Progress reporting for long-running algorithms.
//!
//! The optimization driver reports how much of its evaluation budget has
//! been used after every step.
//!
//! # Example
//!
//! ```
//! use crease::algo::Progress;
//!
//! let progress = Progress::new(|current, total, message| {
//!     println!("[{}/{}] {}", current, total, message);
//! });
//! progress.report(3, 10, "E = 0.25");
//! ```

/// A progress callback that receives updates during long-running operations.
///
/// The callback receives:
/// - `current`: Work done so far (function evaluations for the driver)
/// - `total`: Total budget
/// - `message`: Description of the current state
pub struct Progress {
    callback: Box<dyn Fn(usize, usize, &str) + Send + Sync>,
}

impl Progress {
    /// Create a new progress reporter with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Report progress. `current` is clamped to `total`.
    #[inline]
    pub fn report(&self, current: usize, total: usize, message: &str) {
        (self.callback)(current.min(total), total, message);
    }

    /// Create a no-op progress reporter that discards all updates.
    pub fn none() -> Self {
        Self::new(|_, _, _| {})
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
