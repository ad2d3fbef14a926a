use tracing::warn;

use crate::error::InstallError;
use crate::executor::Executor;
use crate::orchestrator::Backend;
use crate::probe::{self, InstallationStatus};
use crate::runner;
use crate::toolchain::{Action, InstallEnv, LatestVersions, Registry, ToolchainId};
use crate::tracker::ProgressTracker;

/// The real backend: detection commands, installers and downloads on this host.
pub struct SystemBackend {
    registry: Registry,
    latest: LatestVersions,
    env: InstallEnv,
    executor: Executor,
}

impl SystemBackend {
    pub fn new(
        registry: Registry,
        latest: LatestVersions,
        env: InstallEnv,
        executor: Executor,
    ) -> Self {
        Self {
            registry,
            latest,
            env,
            executor,
        }
    }
}

impl Backend for SystemBackend {
    fn probe(&self, id: &ToolchainId) -> InstallationStatus {
        probe::probe(
            self.registry.get(id),
            id,
            &self.env.platform,
            self.latest.get(id),
        )
    }

    fn run(
        &self,
        id: &ToolchainId,
        action: Action,
        tracker: &ProgressTracker,
    ) -> Result<(), InstallError> {
        let Some(toolchain) = self.registry.get(id) else {
            let error = InstallError::UnsupportedToolchain { id: id.clone() };
            warn!("{error}");
            tracker.fail(error.to_string());
            return Err(error);
        };
        runner::run(toolchain, action, &self.env, &self.executor, tracker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    use crate::platform::{Os, PackageManager, Platform};
    use crate::tracker::StepState;

    fn backend() -> SystemBackend {
        let latest = LatestVersions::default();
        let env = InstallEnv {
            platform: Platform {
                os: Os::Linux,
                arch: "x86_64".to_string(),
                distro_id: "ubuntu".to_string(),
                pkg_manager: PackageManager::Apt,
            },
            go_root: PathBuf::from("/usr/local"),
            download_dir: PathBuf::from("/tmp/decor"),
            use_sudo: true,
        };
        let executor = Executor::new(true, Duration::ZERO).unwrap();
        SystemBackend::new(Registry::builtin(&latest), latest, env, executor)
    }

    #[test]
    fn test_unknown_id_fails_unsupported() {
        let backend = backend();
        let id = ToolchainId::new("cobol");
        let tracker = ProgressTracker::new(id.clone());

        let err = backend.run(&id, Action::Install, &tracker).unwrap_err();
        assert_eq!(err.to_string(), "unsupported toolchain: cobol");
        assert_eq!(tracker.read().step, StepState::Error);
        assert_eq!(tracker.read().error.as_deref(), Some("unsupported toolchain: cobol"));
    }

    #[test]
    fn test_unknown_id_probes_not_installed() {
        let status = backend().probe(&ToolchainId::new("cobol"));
        assert!(!status.installed);
        assert_eq!(status.latest_version, "");
    }

    #[test]
    fn test_dry_run_install_completes() {
        let backend = backend();
        let id = ToolchainId::new("python");
        let tracker = ProgressTracker::new(id.clone());

        backend.run(&id, Action::Install, &tracker).unwrap();
        assert_eq!(tracker.read().step, StepState::Complete);
    }
}
