//! Drives one toolchain's plan step by step, writing progress to its tracker.

use tracing::{info, warn};

use crate::error::InstallError;
use crate::executor::Executor;
use crate::toolchain::{Action, InstallEnv, Toolchain};
use crate::tracker::ProgressTracker;

pub const WAITING_FOR_PACKAGE_MANAGER: &str = "Waiting for package manager...";

/// Install or update `toolchain`.
///
/// Before step `i` of `n` the tracker shows `i / n` and the step label;
/// downloads inside the step move it towards `(i + 1) / n`. The tracker ends
/// in `Complete` on success or `Error` with the failure message.
///
/// Package manager tasks hold the executor's package manager lock while they
/// run; a runner blocked on it shows a waiting label until its turn comes.
pub fn run(
    toolchain: &dyn Toolchain,
    action: Action,
    env: &InstallEnv,
    executor: &Executor,
    tracker: &ProgressTracker,
) -> Result<(), InstallError> {
    let id = toolchain.id();
    let planned = toolchain.effective_action(action);
    if planned != action {
        info!(%id, "no native {action} for {id}, running {planned} instead");
    }

    let steps = match toolchain.plan(planned, env) {
        Ok(steps) => steps,
        Err(e) => {
            warn!(%id, "cannot {action}: {e}");
            tracker.fail(e.to_string());
            return Err(e);
        }
    };

    let total = steps.len().max(1) as f64;
    for (index, step) in steps.iter().enumerate() {
        let base = index as f64;
        tracker.set(base / total, step.label);
        info!(%id, "{}", step.label);
        executor.pause();

        for task in &step.tasks {
            let mut waited = false;
            let _package_guard = task.uses_package_manager().then(|| {
                executor.lock_package_manager(|| {
                    info!(%id, "package manager busy, waiting");
                    tracker.set(base / total, WAITING_FOR_PACKAGE_MANAGER);
                    waited = true;
                })
            });
            if waited {
                tracker.set(base / total, step.label);
            }

            let mut on_fraction = |fraction: f64| tracker.set_progress((base + fraction) / total);
            if let Err(e) = executor.execute(task, &mut on_fraction) {
                warn!(%id, "{action} failed at '{}': {e}", step.label);
                tracker.fail(e.to_string());
                return Err(e);
            }
        }
    }

    tracker.complete();
    info!(%id, "{action} complete");
    Ok(())
}
