//! Shared progress record for one in-flight install or update.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::toolchain::ToolchainId;

/// Step a runner is on. `Complete` and `Error` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepState {
    Starting,
    Named(String),
    Complete,
    Error,
}

impl StepState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepState::Complete | StepState::Error)
    }

    pub fn label(&self) -> &str {
        match self {
            StepState::Starting => "Starting...",
            StepState::Named(label) => label,
            StepState::Complete => "Complete",
            StepState::Error => "Error",
        }
    }
}

/// Point-in-time copy of a tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub progress: f64,
    pub step: StepState,
    pub error: Option<String>,
}

impl Snapshot {
    pub fn is_terminal(&self) -> bool {
        self.step.is_terminal()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            progress: 0.0,
            step: StepState::Starting,
            error: None,
        }
    }
}

/// Cloneable handle to one item's progress. The runner writes, the control
/// loop reads; every access takes the lock and copies the whole record.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    id: ToolchainId,
    inner: Arc<Mutex<Snapshot>>,
}

impl ProgressTracker {
    pub fn new(id: ToolchainId) -> Self {
        Self {
            id,
            inner: Arc::new(Mutex::new(Snapshot::default())),
        }
    }

    pub fn id(&self) -> &ToolchainId {
        &self.id
    }

    // A runner that panicked while holding the lock leaves a poisoned mutex;
    // the record itself is still a valid snapshot.
    fn lock(&self) -> MutexGuard<'_, Snapshot> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record progress and the current step label. Ignored once terminal.
    pub fn set(&self, progress: f64, step: impl Into<String>) {
        let mut state = self.lock();
        if state.is_terminal() {
            return;
        }
        state.progress = clamp(progress);
        state.step = StepState::Named(step.into());
    }

    /// Update only the progress value, keeping the step label.
    pub fn set_progress(&self, progress: f64) {
        let mut state = self.lock();
        if state.is_terminal() {
            return;
        }
        state.progress = clamp(progress);
    }

    pub fn complete(&self) {
        let mut state = self.lock();
        if state.is_terminal() {
            return;
        }
        state.progress = 1.0;
        state.step = StepState::Complete;
    }

    /// Mark the action failed. Progress stays where it stopped.
    pub fn fail(&self, reason: impl Into<String>) {
        let mut state = self.lock();
        if state.is_terminal() {
            return;
        }
        state.step = StepState::Error;
        state.error = Some(reason.into());
    }

    pub fn read(&self) -> Snapshot {
        self.lock().clone()
    }

    pub fn is_terminal(&self) -> bool {
        self.lock().is_terminal()
    }
}

fn clamp(progress: f64) -> f64 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn tracker() -> ProgressTracker {
        ProgressTracker::new(ToolchainId::new("go"))
    }

    #[test]
    fn test_new_tracker_is_starting() {
        let snapshot = tracker().read();
        assert_eq!(snapshot.progress, 0.0);
        assert_eq!(snapshot.step, StepState::Starting);
        assert!(snapshot.error.is_none());
        assert!(!snapshot.is_terminal());
    }

    #[test]
    fn test_set_clamps_progress() {
        let tracker = tracker();
        tracker.set(1.7, "Downloading Go...");
        assert_eq!(tracker.read().progress, 1.0);
        tracker.set(-0.5, "Downloading Go...");
        assert_eq!(tracker.read().progress, 0.0);
        tracker.set_progress(f64::NAN);
        assert_eq!(tracker.read().progress, 0.0);
    }

    #[test]
    fn test_complete_is_terminal() {
        let tracker = tracker();
        tracker.set(0.66, "Verifying installation...");
        tracker.complete();
        let snapshot = tracker.read();
        assert_eq!(snapshot.progress, 1.0);
        assert_eq!(snapshot.step, StepState::Complete);
        assert!(tracker.is_terminal());
    }

    #[test]
    fn test_writes_after_terminal_are_ignored() {
        let tracker = tracker();
        tracker.set(0.33, "Extracting files...");
        tracker.fail("tar exited with status 2");
        tracker.set(0.9, "Verifying installation...");
        tracker.complete();

        let snapshot = tracker.read();
        assert_eq!(snapshot.step, StepState::Error);
        assert_eq!(snapshot.progress, 0.33);
        assert_eq!(snapshot.error.as_deref(), Some("tar exited with status 2"));
    }

    #[test]
    fn test_clones_share_state_across_threads() {
        let tracker = tracker();
        let writer = tracker.clone();
        let handle = thread::spawn(move || {
            for i in 0..=10 {
                writer.set(i as f64 / 10.0, format!("step {i}"));
            }
            writer.complete();
        });
        handle.join().unwrap();
        assert_eq!(tracker.read().step, StepState::Complete);
        assert_eq!(tracker.id().as_str(), "go");
    }

    #[test]
    fn test_step_labels() {
        assert_eq!(StepState::Named("Upgrading Python...".into()).label(), "Upgrading Python...");
        assert_eq!(StepState::Starting.label(), "Starting...");
        assert!(StepState::Error.is_terminal());
        assert!(!StepState::Named("x".into()).is_terminal());
    }
}
