//! Toolchain identifiers, install plans and the registry of supported toolchains.
//!
//! Every supported language is one implementation of [`Toolchain`]. The probe,
//! the runner and the orchestrator only ever go through the trait, so adding a
//! language means adding one implementation to [`Registry::builtin`].

mod builtin;
mod registry;

use std::fmt;
use std::path::PathBuf;

use crate::error::InstallError;
use crate::platform::Platform;

pub use builtin::{Cpp, Go, Java, Python, Rust};
pub use registry::{LatestVersions, Registry};

/// Lowercase name of a toolchain, e.g. `go` or `c++`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToolchainId(String);

impl ToolchainId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ToolchainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a runner is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Install,
    Update,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Install => f.write_str("install"),
            Action::Update => f.write_str("update"),
        }
    }
}

/// How a toolchain handles [`Action::Update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// The toolchain has its own update plan.
    Native,
    /// The toolchain has no updater; an update runs the install plan again.
    Reinstall,
}

/// An external program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Runs the system package manager, which allows one process at a time.
    pub uses_package_manager: bool,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            uses_package_manager: false,
        }
    }

    /// Build from an argument vector whose first element is the program.
    pub fn from_argv(mut argv: Vec<String>) -> Option<Self> {
        if argv.is_empty() {
            return None;
        }
        let program = argv.remove(0);
        Some(Self {
            program,
            args: argv,
            uses_package_manager: false,
        })
    }

    /// Mark the command as a package manager invocation.
    pub fn via_package_manager(mut self) -> Self {
        self.uses_package_manager = true;
        self
    }

    /// Prefix with `sudo` when `elevate` is set.
    pub fn elevated(self, elevate: bool) -> Self {
        if !elevate {
            return self;
        }
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: "sudo".to_string(),
            args,
            uses_package_manager: self.uses_package_manager,
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// One unit of real work inside a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Run a program and require a zero exit status.
    Run(CommandSpec),
    /// Fetch `url` over HTTPS into `dest`, reporting fractional progress.
    Download { url: String, dest: PathBuf },
    /// Unpack a `.tar.gz` archive into `into`.
    ExtractTarGz {
        archive: PathBuf,
        into: PathBuf,
        elevate: bool,
    },
}

impl Task {
    pub fn uses_package_manager(&self) -> bool {
        matches!(self, Task::Run(command) if command.uses_package_manager)
    }
}

/// A labelled step and the tasks it performs. Steps without tasks only move
/// the progress bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub label: &'static str,
    pub tasks: Vec<Task>,
}

impl PlannedStep {
    pub fn new(label: &'static str, tasks: Vec<Task>) -> Self {
        Self { label, tasks }
    }

    pub fn label_only(label: &'static str) -> Self {
        Self {
            label,
            tasks: Vec::new(),
        }
    }
}

/// Everything a plan may depend on, fixed for the whole run.
#[derive(Debug, Clone)]
pub struct InstallEnv {
    pub platform: Platform,
    /// Directory the Go archive is extracted into.
    pub go_root: PathBuf,
    /// Directory downloaded artifacts are written to.
    pub download_dir: PathBuf,
    /// Wrap system-wide commands in `sudo`.
    pub use_sudo: bool,
}

/// Capability set of one supported toolchain.
pub trait Toolchain: Send + Sync {
    fn id(&self) -> ToolchainId;

    /// Name shown in the menu and in prompts.
    fn display_name(&self) -> &'static str;

    /// Command whose first output line is the installed version.
    fn detect_command(&self, platform: &Platform) -> CommandSpec;

    /// Ordered steps for `action`. Callers resolve [`UpdatePolicy`] first, so
    /// `Update` only reaches toolchains with a native updater.
    fn plan(&self, action: Action, env: &InstallEnv) -> Result<Vec<PlannedStep>, InstallError>;

    fn update_policy(&self) -> UpdatePolicy {
        UpdatePolicy::Native
    }

    /// The action actually planned once the update policy is applied.
    fn effective_action(&self, requested: Action) -> Action {
        match (requested, self.update_policy()) {
            (Action::Update, UpdatePolicy::Reinstall) => Action::Install,
            (action, _) => action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toolchain_id_normalizes_case() {
        assert_eq!(ToolchainId::new("Go"), ToolchainId::new("go"));
        assert_eq!(ToolchainId::new(" C++ ").as_str(), "c++");
    }

    #[test]
    fn test_command_spec_display() {
        let cmd = CommandSpec::new("brew", ["install", "python@3.13"]);
        assert_eq!(cmd.to_string(), "brew install python@3.13");
    }

    #[test]
    fn test_command_spec_elevated() {
        let cmd = CommandSpec::new("apt-get", ["install", "-y", "python3"]).elevated(true);
        assert_eq!(cmd.program, "sudo");
        assert_eq!(cmd.to_string(), "sudo apt-get install -y python3");

        let plain = CommandSpec::new("rustup", ["update"]).elevated(false);
        assert_eq!(plain.to_string(), "rustup update");
    }

    #[test]
    fn test_package_manager_flag_survives_sudo() {
        let cmd = CommandSpec::new("apt-get", ["install", "-y", "openjdk-21-jdk"])
            .via_package_manager()
            .elevated(true);
        assert!(cmd.uses_package_manager);
        assert!(Task::Run(cmd).uses_package_manager());
        assert!(!Task::Run(CommandSpec::new("rustup", ["update"])).uses_package_manager());
    }

    #[test]
    fn test_command_spec_from_argv() {
        let argv = vec!["dnf".into(), "upgrade".into(), "-y".into()];
        let cmd = CommandSpec::from_argv(argv).unwrap();
        assert_eq!(cmd.program, "dnf");
        assert_eq!(cmd.args, vec!["upgrade", "-y"]);
        assert!(CommandSpec::from_argv(Vec::new()).is_none());
    }
}
