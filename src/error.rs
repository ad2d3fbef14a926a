//! Error types for configuration loading and toolchain actions.
//!
//! Install and update failures never escape a runner thread as a panic or a
//! return value the control loop has to catch; they are rendered to a string
//! and stored on the item's [`ProgressTracker`](crate::tracker::ProgressTracker).

use std::path::PathBuf;

use thiserror::Error;

use crate::platform::{Os, PackageManager};
use crate::toolchain::ToolchainId;

/// Errors raised while installing or updating a single toolchain.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InstallError {
    /// No toolchain is registered under this id.
    #[error("unsupported toolchain: {id}")]
    UnsupportedToolchain { id: ToolchainId },

    /// The toolchain has no command for this operating system or package manager.
    #[error("{id} cannot be installed on {os} with package manager {pkg_manager}")]
    UnsupportedPlatform {
        id: ToolchainId,
        os: Os,
        pkg_manager: PackageManager,
    },

    /// The external program could not be started at all.
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The external program ran and reported failure.
    #[error("`{command}` exited with {}{}", exit_label(.code), stderr_tail(.stderr))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// Fetching an installer artifact over HTTPS failed.
    #[error("failed to download {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Local filesystem work around a download failed.
    #[error("{action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The runner thread panicked before reaching a terminal state.
    #[error("installer for {id} panicked")]
    Panicked { id: ToolchainId },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

fn stderr_tail(stderr: &str) -> String {
    match stderr.lines().rev().find(|line| !line.trim().is_empty()) {
        Some(line) => format!(": {}", line.trim()),
        None => String::new(),
    }
}

/// Errors raised while reading the optional configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("home directory not found")]
    NoHome,
}
