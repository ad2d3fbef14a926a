//! The toolchains decor knows how to detect, install and update.
//!
//! Commands follow each project's recommended route: Homebrew or the Xcode
//! tools on macOS, the distribution package manager on Linux, and the
//! upstream installers for Go (go.dev archive) and Rust (rustup).

use crate::error::InstallError;
use crate::platform::{Os, PackageManager, Platform};

use super::{
    Action, CommandSpec, InstallEnv, PlannedStep, Task, Toolchain, ToolchainId, UpdatePolicy,
};

const RUSTUP_SCRIPT_URL: &str = "https://sh.rustup.rs";

fn unsupported(id: &str, platform: &Platform) -> InstallError {
    InstallError::UnsupportedPlatform {
        id: ToolchainId::new(id),
        os: platform.os,
        pkg_manager: platform.pkg_manager,
    }
}

/// Install or upgrade a system package through the platform's package manager.
///
/// `package` maps a package manager to the package name it knows this
/// toolchain by; `None` means the toolchain is not packaged there. Brew never
/// runs under sudo.
fn package_command(
    id: &str,
    action: Action,
    env: &InstallEnv,
    package: fn(PackageManager) -> Option<&'static str>,
) -> Result<CommandSpec, InstallError> {
    let platform = &env.platform;
    let manager = match platform.os {
        Os::MacOs => PackageManager::Brew,
        Os::Linux => platform.pkg_manager,
        Os::Windows | Os::Other => return Err(unsupported(id, platform)),
    };
    let name = package(manager).ok_or_else(|| unsupported(id, platform))?;
    let argv = match action {
        Action::Install => manager.install_args(&[name]),
        Action::Update => manager.upgrade_args(&[name]),
    }
    .ok_or_else(|| unsupported(id, platform))?;
    let command = CommandSpec::from_argv(argv).ok_or_else(|| unsupported(id, platform))?;
    Ok(command
        .via_package_manager()
        .elevated(env.use_sudo && manager != PackageManager::Brew))
}

/// Go, installed from the official archive on go.dev.
pub struct Go {
    version: String,
}

impl Go {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }

    fn archive_name(&self, platform: &Platform) -> Option<String> {
        let os = platform.os.go_name()?;
        Some(format!("go{}.{}-{}.tar.gz", self.version, os, platform.go_arch()))
    }
}

impl Toolchain for Go {
    fn id(&self) -> ToolchainId {
        ToolchainId::new("go")
    }

    fn display_name(&self) -> &'static str {
        "Go"
    }

    fn detect_command(&self, _platform: &Platform) -> CommandSpec {
        CommandSpec::new("go", ["version"])
    }

    // Updates reach this plan through the Reinstall policy, so the action is unused.
    fn plan(&self, _action: Action, env: &InstallEnv) -> Result<Vec<PlannedStep>, InstallError> {
        let archive_name = self
            .archive_name(&env.platform)
            .ok_or_else(|| unsupported("go", &env.platform))?;
        let archive = env.download_dir.join(&archive_name);
        let previous = env.go_root.join("go");

        Ok(vec![
            PlannedStep::new(
                "Downloading Go...",
                vec![Task::Download {
                    url: format!("https://go.dev/dl/{archive_name}"),
                    dest: archive.clone(),
                }],
            ),
            PlannedStep::new(
                "Extracting files...",
                vec![
                    Task::Run(
                        CommandSpec::new("rm", ["-rf".to_string(), previous.display().to_string()])
                            .elevated(env.use_sudo),
                    ),
                    Task::ExtractTarGz {
                        archive,
                        into: env.go_root.clone(),
                        elevate: env.use_sudo,
                    },
                ],
            ),
            PlannedStep::label_only("Verifying installation..."),
        ])
    }

    fn update_policy(&self) -> UpdatePolicy {
        UpdatePolicy::Reinstall
    }
}

pub struct Python;

impl Toolchain for Python {
    fn id(&self) -> ToolchainId {
        ToolchainId::new("python")
    }

    fn display_name(&self) -> &'static str {
        "Python"
    }

    fn detect_command(&self, _platform: &Platform) -> CommandSpec {
        CommandSpec::new("python3", ["--version"])
    }

    fn plan(&self, action: Action, env: &InstallEnv) -> Result<Vec<PlannedStep>, InstallError> {
        let command = package_command("python", action, env, |manager| match manager {
            PackageManager::Brew => Some("python@3.13"),
            PackageManager::Apt | PackageManager::Dnf => Some("python3"),
            PackageManager::Pacman => Some("python"),
            PackageManager::Unknown => None,
        })?;
        Ok(match action {
            Action::Install => vec![
                PlannedStep::label_only("Preparing installation..."),
                PlannedStep::new("Installing Python...", vec![Task::Run(command)]),
                PlannedStep::label_only("Verifying installation..."),
            ],
            Action::Update => vec![
                PlannedStep::label_only("Fetching available updates..."),
                PlannedStep::new("Upgrading Python...", vec![Task::Run(command)]),
                PlannedStep::label_only("Verifying update..."),
            ],
        })
    }
}

/// Rust, installed through rustup.
pub struct Rust;

impl Toolchain for Rust {
    fn id(&self) -> ToolchainId {
        ToolchainId::new("rust")
    }

    fn display_name(&self) -> &'static str {
        "Rust"
    }

    fn detect_command(&self, _platform: &Platform) -> CommandSpec {
        CommandSpec::new("rustc", ["--version"])
    }

    fn plan(&self, action: Action, env: &InstallEnv) -> Result<Vec<PlannedStep>, InstallError> {
        match action {
            Action::Install => {
                if !matches!(env.platform.os, Os::Linux | Os::MacOs) {
                    return Err(unsupported("rust", &env.platform));
                }
                let script = env.download_dir.join("rustup-init.sh");
                Ok(vec![
                    PlannedStep::new(
                        "Downloading Rust installer...",
                        vec![Task::Download {
                            url: RUSTUP_SCRIPT_URL.to_string(),
                            dest: script.clone(),
                        }],
                    ),
                    PlannedStep::new(
                        "Running installation script...",
                        vec![Task::Run(CommandSpec::new(
                            "sh",
                            [script.display().to_string(), "-y".to_string()],
                        ))],
                    ),
                    PlannedStep::label_only("Configuring environment..."),
                ])
            }
            Action::Update => Ok(vec![
                PlannedStep::label_only("Checking for updates..."),
                PlannedStep::new(
                    "Updating Rust...",
                    vec![Task::Run(CommandSpec::new("rustup", ["update"]))],
                ),
                PlannedStep::label_only("Verifying update..."),
            ]),
        }
    }
}

/// The platform C++ compiler: Xcode command line tools or GCC.
pub struct Cpp;

impl Toolchain for Cpp {
    fn id(&self) -> ToolchainId {
        ToolchainId::new("c++")
    }

    fn display_name(&self) -> &'static str {
        "C++"
    }

    fn detect_command(&self, platform: &Platform) -> CommandSpec {
        if platform.os == Os::MacOs {
            CommandSpec::new("clang", ["--version"])
        } else {
            CommandSpec::new("g++", ["--version"])
        }
    }

    fn plan(&self, action: Action, env: &InstallEnv) -> Result<Vec<PlannedStep>, InstallError> {
        let platform = &env.platform;
        let command = match (platform.os, action) {
            (Os::MacOs, Action::Install) => CommandSpec::new("xcode-select", ["--install"]),
            (Os::MacOs, Action::Update) => {
                CommandSpec::new("softwareupdate", ["-i", "-a"])
                    .via_package_manager()
                    .elevated(env.use_sudo)
            }
            (Os::Linux, Action::Install) => {
                package_command("c++", action, env, |manager| match manager {
                    PackageManager::Apt => Some("build-essential"),
                    PackageManager::Dnf => Some("gcc-c++"),
                    PackageManager::Pacman => Some("base-devel"),
                    PackageManager::Brew | PackageManager::Unknown => None,
                })?
            }
            (Os::Linux, Action::Update) => platform
                .pkg_manager
                .upgrade_args(&[])
                .and_then(CommandSpec::from_argv)
                .map(|command| command.via_package_manager().elevated(env.use_sudo))
                .ok_or_else(|| unsupported("c++", platform))?,
            (Os::Windows | Os::Other, _) => return Err(unsupported("c++", platform)),
        };
        Ok(match action {
            Action::Install => vec![
                PlannedStep::label_only("Preparing installation..."),
                PlannedStep::new("Installing C++ compiler...", vec![Task::Run(command)]),
                PlannedStep::label_only("Setting up environment..."),
            ],
            Action::Update => vec![
                PlannedStep::label_only("Checking for system updates..."),
                PlannedStep::new("Installing updates...", vec![Task::Run(command)]),
                PlannedStep::label_only("Verifying..."),
            ],
        })
    }
}

/// OpenJDK 21.
pub struct Java;

impl Toolchain for Java {
    fn id(&self) -> ToolchainId {
        ToolchainId::new("java")
    }

    fn display_name(&self) -> &'static str {
        "Java"
    }

    fn detect_command(&self, _platform: &Platform) -> CommandSpec {
        // `java -version` prints to stderr.
        CommandSpec::new("java", ["-version"])
    }

    fn plan(&self, action: Action, env: &InstallEnv) -> Result<Vec<PlannedStep>, InstallError> {
        let command = package_command("java", action, env, |manager| match manager {
            PackageManager::Brew => Some("openjdk@21"),
            PackageManager::Apt => Some("openjdk-21-jdk"),
            PackageManager::Dnf => Some("java-21-openjdk-devel"),
            PackageManager::Pacman => Some("jdk21-openjdk"),
            PackageManager::Unknown => None,
        })?;
        Ok(match action {
            Action::Install => vec![
                PlannedStep::label_only("Preparing installation..."),
                PlannedStep::new("Installing OpenJDK...", vec![Task::Run(command)]),
                PlannedStep::label_only("Setting up environment..."),
            ],
            Action::Update => vec![
                PlannedStep::label_only("Fetching available updates..."),
                PlannedStep::new("Upgrading OpenJDK...", vec![Task::Run(command)]),
                PlannedStep::label_only("Verifying update..."),
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn env(os: Os, pkg_manager: PackageManager) -> InstallEnv {
        InstallEnv {
            platform: Platform {
                os,
                arch: "aarch64".to_string(),
                distro_id: String::new(),
                pkg_manager,
            },
            go_root: PathBuf::from("/usr/local"),
            download_dir: PathBuf::from("/tmp/decor"),
            use_sudo: true,
        }
    }

    fn commands(steps: &[PlannedStep]) -> Vec<String> {
        steps
            .iter()
            .flat_map(|step| step.tasks.iter())
            .filter_map(|task| match task {
                Task::Run(command) => Some(command.to_string()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_every_plan_has_three_steps() {
        let linux = env(Os::Linux, PackageManager::Apt);
        let toolchains: Vec<Box<dyn Toolchain>> = vec![
            Box::new(Go::new("1.25.5")),
            Box::new(Python),
            Box::new(Rust),
            Box::new(Cpp),
            Box::new(Java),
        ];
        for toolchain in &toolchains {
            let action = toolchain.effective_action(Action::Install);
            assert_eq!(toolchain.plan(action, &linux).unwrap().len(), 3);
            let action = toolchain.effective_action(Action::Update);
            assert_eq!(toolchain.plan(action, &linux).unwrap().len(), 3);
        }
    }

    #[test]
    fn test_go_downloads_archive_for_platform() {
        let steps = Go::new("1.25.5")
            .plan(Action::Install, &env(Os::MacOs, PackageManager::Brew))
            .unwrap();
        assert_eq!(steps[0].label, "Downloading Go...");
        assert_eq!(
            steps[0].tasks,
            vec![Task::Download {
                url: "https://go.dev/dl/go1.25.5.darwin-arm64.tar.gz".to_string(),
                dest: PathBuf::from("/tmp/decor/go1.25.5.darwin-arm64.tar.gz"),
            }]
        );
        assert!(matches!(
            &steps[1].tasks[1],
            Task::ExtractTarGz { into, .. } if into == &PathBuf::from("/usr/local")
        ));
    }

    #[test]
    fn test_go_update_reuses_install() {
        let go = Go::new("1.25.5");
        assert_eq!(go.update_policy(), UpdatePolicy::Reinstall);
        assert_eq!(go.effective_action(Action::Update), Action::Install);
    }

    #[test]
    fn test_other_toolchains_update_natively() {
        assert_eq!(Python.effective_action(Action::Update), Action::Update);
        assert_eq!(Rust.effective_action(Action::Update), Action::Update);
        assert_eq!(Cpp.effective_action(Action::Update), Action::Update);
        assert_eq!(Java.effective_action(Action::Update), Action::Update);
    }

    #[test]
    fn test_go_unsupported_on_windows() {
        let windows = env(Os::Windows, PackageManager::Unknown);
        let result = Go::new("1.25.5").plan(Action::Install, &windows);
        assert!(matches!(result, Err(InstallError::UnsupportedPlatform { .. })));
    }

    #[test]
    fn test_python_commands_per_platform() {
        let mac = Python.plan(Action::Install, &env(Os::MacOs, PackageManager::Brew)).unwrap();
        assert_eq!(commands(&mac), vec!["brew install python@3.13"]);

        let debian = Python.plan(Action::Install, &env(Os::Linux, PackageManager::Apt)).unwrap();
        assert_eq!(commands(&debian), vec!["sudo apt-get install -y python3"]);

        let fedora = Python.plan(Action::Update, &env(Os::Linux, PackageManager::Dnf)).unwrap();
        assert_eq!(commands(&fedora), vec!["sudo dnf upgrade -y python3"]);
        assert_eq!(fedora[1].label, "Upgrading Python...");
    }

    #[test]
    fn test_system_packages_take_package_manager_lock() {
        let debian = env(Os::Linux, PackageManager::Apt);
        for steps in [
            Python.plan(Action::Install, &debian).unwrap(),
            Java.plan(Action::Install, &debian).unwrap(),
            Cpp.plan(Action::Update, &debian).unwrap(),
        ] {
            assert!(steps[1].tasks[0].uses_package_manager());
        }
        let mac = Java.plan(Action::Update, &env(Os::MacOs, PackageManager::Brew)).unwrap();
        assert!(mac[1].tasks[0].uses_package_manager());
    }

    #[test]
    fn test_python_unknown_package_manager() {
        let result = Python.plan(Action::Install, &env(Os::Linux, PackageManager::Unknown));
        assert!(matches!(result, Err(InstallError::UnsupportedPlatform { .. })));
    }

    #[test]
    fn test_rust_install_runs_downloaded_script() {
        let steps = Rust.plan(Action::Install, &env(Os::Linux, PackageManager::Apt)).unwrap();
        assert!(matches!(
            &steps[0].tasks[0],
            Task::Download { url, .. } if url == RUSTUP_SCRIPT_URL
        ));
        assert!(!steps[1].tasks[0].uses_package_manager());
        assert_eq!(commands(&steps), vec!["sh /tmp/decor/rustup-init.sh -y"]);

        let update = Rust.plan(Action::Update, &env(Os::Linux, PackageManager::Apt)).unwrap();
        assert_eq!(commands(&update), vec!["rustup update"]);
    }

    #[test]
    fn test_cpp_detector_differs_by_os() {
        let mac = env(Os::MacOs, PackageManager::Brew).platform;
        let linux = env(Os::Linux, PackageManager::Apt).platform;
        assert_eq!(Cpp.detect_command(&mac).program, "clang");
        assert_eq!(Cpp.detect_command(&linux).program, "g++");
    }

    #[test]
    fn test_cpp_commands() {
        let mac = Cpp.plan(Action::Install, &env(Os::MacOs, PackageManager::Brew)).unwrap();
        assert_eq!(commands(&mac), vec!["xcode-select --install"]);

        let arch = Cpp.plan(Action::Update, &env(Os::Linux, PackageManager::Pacman)).unwrap();
        assert_eq!(commands(&arch), vec!["sudo pacman -Syu --noconfirm"]);
    }

    #[test]
    fn test_java_commands() {
        let mac = Java.plan(Action::Update, &env(Os::MacOs, PackageManager::Brew)).unwrap();
        assert_eq!(commands(&mac), vec!["brew upgrade openjdk@21"]);

        let debian = Java.plan(Action::Install, &env(Os::Linux, PackageManager::Apt)).unwrap();
        assert_eq!(commands(&debian), vec!["sudo apt-get install -y openjdk-21-jdk"]);
    }
}
