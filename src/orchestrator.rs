//! The installation state machine: Checking, Prompting, Installing, Complete.
//!
//! The orchestrator is owned by the single-threaded control loop. Probes and
//! runners execute on worker threads through a [`Backend`]; the control loop
//! observes them by calling [`Orchestrator::tick`] on every pass, which drains
//! finished probes and polls the progress trackers. Nothing here blocks.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use tracing::{debug, info, warn};

use crate::error::InstallError;
use crate::probe::InstallationStatus;
use crate::toolchain::{Action, ToolchainId};
use crate::tracker::{ProgressTracker, Snapshot, StepState};

/// Detection and installation as seen by the orchestrator.
///
/// Both methods are called from worker threads. `run` owns the tracker it is
/// given for the duration of the call and must leave it terminal or return an
/// error; the orchestrator settles the tracker from the return value
/// otherwise.
pub trait Backend: Send + Sync + 'static {
    fn probe(&self, id: &ToolchainId) -> InstallationStatus;

    fn run(
        &self,
        id: &ToolchainId,
        action: Action,
        tracker: &ProgressTracker,
    ) -> Result<(), InstallError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Checking,
    Prompting,
    Installing,
    Complete,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Checking => "checking",
            Phase::Prompting => "prompting",
            Phase::Installing => "installing",
            Phase::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// What to do with one selected toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Skip,
    Install,
    Update,
    Reinstall,
}

impl Decision {
    /// Runner action for this decision; `None` for Skip.
    pub fn action(self) -> Option<Action> {
        match self {
            Decision::Skip => None,
            Decision::Install | Decision::Reinstall => Some(Action::Install),
            Decision::Update => Some(Action::Update),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Decision::Skip => "skip",
            Decision::Install => "install",
            Decision::Update => "update",
            Decision::Reinstall => "reinstall",
        };
        f.write_str(name)
    }
}

/// Decision taken when the user accepts the default.
///
/// A missing status counts as not installed. Versions are compared verbatim.
pub fn default_decision(status: Option<&InstallationStatus>) -> Decision {
    match status {
        Some(status) if status.installed => {
            if status.installed_version.as_deref() == Some(status.latest_version.as_str()) {
                Decision::Skip
            } else {
                Decision::Update
            }
        }
        _ => Decision::Install,
    }
}

/// One keypress worth of input while prompting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptInput {
    AcceptDefault,
    Skip,
    Update,
    Install,
    Reinstall,
}

/// Final result for one selected toolchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Skipped,
    Installed,
    Updated,
    Failed(String),
}

/// Progress pushed by a worker instead of being discovered by polling.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub id: ToolchainId,
    pub progress: f64,
    pub step: StepState,
    pub error: Option<String>,
}

/// One row of the Installing screen. Skipped items carry no tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallRow {
    pub id: ToolchainId,
    pub decision: Decision,
    pub snapshot: Option<Snapshot>,
}

/// Read-only picture of the orchestrator for rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Checking {
        done: usize,
        total: usize,
    },
    Prompting {
        statuses: Vec<InstallationStatus>,
        cursor: usize,
        current: InstallationStatus,
        suggested: Decision,
    },
    Installing {
        rows: Vec<InstallRow>,
    },
    Complete {
        outcomes: Vec<(ToolchainId, Outcome)>,
    },
}

type ProbeResult = (ToolchainId, Option<InstallationStatus>);

pub struct Orchestrator {
    selection: Vec<ToolchainId>,
    backend: Arc<dyn Backend>,
    phase: Phase,
    history: Vec<Phase>,
    probe_rx: Option<Receiver<ProbeResult>>,
    probes_done: usize,
    statuses: HashMap<ToolchainId, InstallationStatus>,
    cursor: usize,
    decisions: Vec<Decision>,
    trackers: HashMap<ToolchainId, ProgressTracker>,
    outcomes: Vec<(ToolchainId, Outcome)>,
}

impl Orchestrator {
    /// Duplicate ids are dropped, keeping the first occurrence.
    pub fn new(selection: Vec<ToolchainId>, backend: Arc<dyn Backend>) -> Self {
        let mut unique: Vec<ToolchainId> = Vec::with_capacity(selection.len());
        for id in selection {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        Self {
            selection: unique,
            backend,
            phase: Phase::Checking,
            history: vec![Phase::Checking],
            probe_rx: None,
            probes_done: 0,
            statuses: HashMap::new(),
            cursor: 0,
            decisions: Vec::new(),
            trackers: HashMap::new(),
            outcomes: Vec::new(),
        }
    }

    /// Launch one probe thread per selected id. Later calls do nothing.
    pub fn start(&mut self) {
        if self.probe_rx.is_some() || self.phase != Phase::Checking {
            return;
        }
        info!(selection = ?self.selection, "checking installed toolchains");
        let (tx, rx) = mpsc::channel();
        for id in &self.selection {
            let tx = tx.clone();
            let backend = Arc::clone(&self.backend);
            let id = id.clone();
            thread::spawn(move || {
                let status = panic::catch_unwind(AssertUnwindSafe(|| backend.probe(&id))).ok();
                let _ = tx.send((id, status));
            });
        }
        self.probe_rx = Some(rx);
    }

    /// Advance on whatever the workers have finished since the last call.
    pub fn tick(&mut self) {
        match self.phase {
            Phase::Checking => {
                self.start();
                self.drain_probes();
            }
            Phase::Installing => self.check_terminal(),
            Phase::Prompting | Phase::Complete => {}
        }
    }

    fn drain_probes(&mut self) {
        let Some(rx) = self.probe_rx.as_ref() else {
            return;
        };
        loop {
            match rx.try_recv() {
                Ok((id, Some(status))) => {
                    debug!(
                        %id,
                        installed = status.installed,
                        version = ?status.installed_version,
                        "probe finished"
                    );
                    self.statuses.insert(id, status);
                    self.probes_done += 1;
                }
                Ok((id, None)) => {
                    warn!(%id, "probe panicked, treating as not installed");
                    self.probes_done += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    // Every probe thread sends exactly once before exiting.
                    self.probes_done = self.selection.len();
                    break;
                }
            }
        }

        if self.probes_done >= self.selection.len() {
            self.probe_rx = None;
            self.enter(Phase::Prompting);
            self.finish_prompting_if_done();
        }
    }

    /// Record the decision for the item under the cursor and move on.
    /// Ignored outside Prompting.
    pub fn handle(&mut self, input: PromptInput) {
        if self.phase != Phase::Prompting {
            return;
        }
        let Some(id) = self.selection.get(self.cursor) else {
            return;
        };
        let decision = match input {
            PromptInput::AcceptDefault => default_decision(self.statuses.get(id)),
            PromptInput::Skip => Decision::Skip,
            PromptInput::Update => Decision::Update,
            PromptInput::Install => Decision::Install,
            PromptInput::Reinstall => Decision::Reinstall,
        };
        info!(%id, %decision, "decision recorded");
        self.decisions.push(decision);
        self.cursor += 1;
        self.finish_prompting_if_done();
    }

    fn finish_prompting_if_done(&mut self) {
        if self.phase == Phase::Prompting && self.cursor >= self.selection.len() {
            self.enter(Phase::Installing);
            self.launch_runners();
            self.check_terminal();
        }
    }

    fn launch_runners(&mut self) {
        for (id, decision) in self.selection.iter().zip(&self.decisions) {
            let Some(action) = decision.action() else {
                continue;
            };
            if self.trackers.contains_key(id) {
                continue;
            }
            let tracker = ProgressTracker::new(id.clone());
            self.trackers.insert(id.clone(), tracker.clone());

            info!(%id, %action, "launching runner");
            let backend = Arc::clone(&self.backend);
            thread::spawn(move || {
                let id = tracker.id().clone();
                let result =
                    panic::catch_unwind(AssertUnwindSafe(|| backend.run(&id, action, &tracker)));
                match result {
                    Ok(Ok(())) => tracker.complete(),
                    Ok(Err(e)) => tracker.fail(e.to_string()),
                    Err(_) => {
                        let error = InstallError::Panicked { id: id.clone() };
                        warn!(%id, "{error}");
                        tracker.fail(error.to_string());
                    }
                }
            });
        }
    }

    /// Apply a pushed update the same way a polled change is observed.
    pub fn apply_progress(&mut self, update: ProgressUpdate) {
        if self.phase != Phase::Installing {
            return;
        }
        let Some(tracker) = self.trackers.get(&update.id) else {
            debug!(id = %update.id, "progress for unknown tracker ignored");
            return;
        };
        match update.step {
            StepState::Complete => tracker.complete(),
            StepState::Error => {
                tracker.fail(update.error.unwrap_or_else(|| "unknown error".to_string()))
            }
            StepState::Named(label) => tracker.set(update.progress, label),
            StepState::Starting => tracker.set_progress(update.progress),
        }
        self.check_terminal();
    }

    fn check_terminal(&mut self) {
        if self.phase != Phase::Installing {
            return;
        }
        if self.trackers.values().all(ProgressTracker::is_terminal) {
            self.outcomes = self.collect_outcomes();
            self.enter(Phase::Complete);
        }
    }

    fn collect_outcomes(&self) -> Vec<(ToolchainId, Outcome)> {
        self.selection
            .iter()
            .zip(&self.decisions)
            .map(|(id, decision)| {
                let outcome = match self.trackers.get(id).map(ProgressTracker::read) {
                    None => Outcome::Skipped,
                    Some(snapshot) if snapshot.step == StepState::Error => {
                        Outcome::Failed(snapshot.error.unwrap_or_default())
                    }
                    Some(_) if *decision == Decision::Update => Outcome::Updated,
                    Some(_) => Outcome::Installed,
                };
                (id.clone(), outcome)
            })
            .collect()
    }

    fn enter(&mut self, phase: Phase) {
        info!(from = %self.phase, to = %phase, "phase transition");
        self.phase = phase;
        self.history.push(phase);
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Every phase entered so far, in order.
    pub fn history(&self) -> &[Phase] {
        &self.history
    }

    pub fn selection(&self) -> &[ToolchainId] {
        &self.selection
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn status(&self, id: &ToolchainId) -> Option<&InstallationStatus> {
        self.statuses.get(id)
    }

    /// Decisions recorded so far, in selection order.
    pub fn decisions(&self) -> Vec<(ToolchainId, Decision)> {
        self.selection
            .iter()
            .cloned()
            .zip(self.decisions.iter().copied())
            .collect()
    }

    pub fn tracker(&self, id: &ToolchainId) -> Option<&ProgressTracker> {
        self.trackers.get(id)
    }

    /// Final outcomes in selection order; empty until Complete.
    pub fn outcomes(&self) -> &[(ToolchainId, Outcome)] {
        &self.outcomes
    }

    fn status_or_default(&self, id: &ToolchainId) -> InstallationStatus {
        self.statuses
            .get(id)
            .cloned()
            .unwrap_or_else(|| InstallationStatus::not_installed(id.clone(), String::new()))
    }

    pub fn view(&self) -> View {
        match self.phase {
            Phase::Checking => View::Checking {
                done: self.probes_done,
                total: self.selection.len(),
            },
            Phase::Prompting => {
                let statuses: Vec<InstallationStatus> = self
                    .selection
                    .iter()
                    .map(|id| self.status_or_default(id))
                    .collect();
                let current = statuses[self.cursor].clone();
                let suggested = default_decision(Some(&current));
                View::Prompting {
                    statuses,
                    cursor: self.cursor,
                    current,
                    suggested,
                }
            }
            Phase::Installing => View::Installing {
                rows: self
                    .selection
                    .iter()
                    .zip(&self.decisions)
                    .map(|(id, decision)| InstallRow {
                        id: id.clone(),
                        decision: *decision,
                        snapshot: self.trackers.get(id).map(ProgressTracker::read),
                    })
                    .collect(),
            },
            Phase::Complete => View::Complete {
                outcomes: self.outcomes.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(installed_version: Option<&str>, latest: &str) -> InstallationStatus {
        InstallationStatus {
            id: ToolchainId::new("go"),
            installed: installed_version.is_some(),
            installed_version: installed_version.map(str::to_string),
            latest_version: latest.to_string(),
        }
    }

    #[test]
    fn test_default_decision_not_installed() {
        assert_eq!(default_decision(Some(&status(None, "1.25.5"))), Decision::Install);
    }

    #[test]
    fn test_default_decision_missing_status() {
        assert_eq!(default_decision(None), Decision::Install);
    }

    #[test]
    fn test_default_decision_stale() {
        assert_eq!(default_decision(Some(&status(Some("1.20"), "1.25.5"))), Decision::Update);
    }

    #[test]
    fn test_default_decision_latest() {
        assert_eq!(default_decision(Some(&status(Some("1.25.5"), "1.25.5"))), Decision::Skip);
    }

    #[test]
    fn test_decision_actions() {
        assert_eq!(Decision::Skip.action(), None);
        assert_eq!(Decision::Install.action(), Some(Action::Install));
        assert_eq!(Decision::Reinstall.action(), Some(Action::Install));
        assert_eq!(Decision::Update.action(), Some(Action::Update));
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(Phase::Installing.to_string(), "installing");
        assert_eq!(Decision::Reinstall.to_string(), "reinstall");
    }
}
