//! Installed-version detection.

use std::process::Command;

use tracing::debug;

use crate::platform::Platform;
use crate::toolchain::{Toolchain, ToolchainId};

/// What the probe found for one toolchain. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationStatus {
    pub id: ToolchainId,
    pub installed: bool,
    pub installed_version: Option<String>,
    pub latest_version: String,
}

impl InstallationStatus {
    pub fn not_installed(id: ToolchainId, latest_version: impl Into<String>) -> Self {
        Self {
            id,
            installed: false,
            installed_version: None,
            latest_version: latest_version.into(),
        }
    }

    /// Installed and reporting exactly the latest version string.
    pub fn is_latest(&self) -> bool {
        self.installed && self.installed_version.as_deref() == Some(self.latest_version.as_str())
    }
}

/// Run the detection command of `toolchain` and read the installed version.
///
/// A missing toolchain, a command that cannot be started and a non-zero exit
/// all mean "not installed". None of them is an error.
pub fn probe(
    toolchain: Option<&dyn Toolchain>,
    id: &ToolchainId,
    platform: &Platform,
    latest_version: String,
) -> InstallationStatus {
    let Some(toolchain) = toolchain else {
        debug!(%id, "no toolchain registered, treating as not installed");
        return InstallationStatus::not_installed(id.clone(), latest_version);
    };

    let detect = toolchain.detect_command(platform);
    let output = match Command::new(&detect.program).args(&detect.args).output() {
        Ok(output) => output,
        Err(e) => {
            debug!(%id, command = %detect, "detector could not start: {e}");
            return InstallationStatus::not_installed(id.clone(), latest_version);
        }
    };

    if !output.status.success() {
        debug!(%id, command = %detect, status = ?output.status.code(), "detector failed");
        return InstallationStatus::not_installed(id.clone(), latest_version);
    }

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    let version = first_line(&combined);
    debug!(%id, version = %version, "detected installed version");

    InstallationStatus {
        id: id.clone(),
        installed: true,
        installed_version: Some(version),
        latest_version,
    }
}

/// First line of `output`, trimmed.
pub fn first_line(output: &str) -> String {
    output.lines().next().unwrap_or_default().trim().to_string()
}
