//! Scoped release of per-adapter resources.

/// Runs a release callback exactly once when dropped.
///
/// The dispatcher creates one guard inside every adapter task. The guard is
/// dropped when the task returns or when it is aborted at the deadline, so
/// the callback fires in both cases.
pub struct ReleaseGuard<F: FnOnce(bool)> {
    release: Option<F>,
    completed: bool,
}

impl<F: FnOnce(bool)> ReleaseGuard<F> {
    /// Creates a guard around a release callback.
    ///
    /// The callback receives `true` if [`complete`](Self::complete) was called
    /// before the drop, `false` if the owning future was torn down early.
    pub fn new(release: F) -> Self {
        Self {
            release: Some(release),
            completed: false,
        }
    }

    /// Marks the guarded work as finished normally.
    pub fn complete(&mut self) {
        self.completed = true;
    }
}

impl<F: FnOnce(bool)> Drop for ReleaseGuard<F> {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release(self.completed);
        }
    }
}

impl<F: FnOnce(bool)> std::fmt::Debug for ReleaseGuard<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseGuard")
            .field("armed", &self.release.is_some())
            .field("completed", &self.completed)
            .finish()
    }
}
