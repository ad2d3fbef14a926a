use std::collections::HashMap;
use std::fmt;
use std::fs;

use tracing::debug;

/// Operating system as reported by the Rust runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Linux,
    MacOs,
    Windows,
    Other,
}

impl Os {
    pub fn current() -> Self {
        Self::from_name(std::env::consts::OS)
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "linux" => Os::Linux,
            "macos" => Os::MacOs,
            "windows" => Os::Windows,
            _ => Os::Other,
        }
    }

    /// Name used in go.dev archive file names.
    pub fn go_name(&self) -> Option<&'static str> {
        match self {
            Os::Linux => Some("linux"),
            Os::MacOs => Some("darwin"),
            Os::Windows | Os::Other => None,
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Os::Linux => "linux",
            Os::MacOs => "macos",
            Os::Windows => "windows",
            Os::Other => "unknown",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Dnf,
    Pacman,
    Brew,
    Unknown,
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PackageManager::Apt => "apt",
            PackageManager::Dnf => "dnf",
            PackageManager::Pacman => "pacman",
            PackageManager::Brew => "brew",
            PackageManager::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

impl PackageManager {
    /// Argument vector installing `packages`, without any privilege wrapper.
    pub fn install_args(&self, packages: &[&str]) -> Option<Vec<String>> {
        if packages.is_empty() {
            return None;
        }
        let mut args: Vec<String> = match self {
            PackageManager::Apt => vec!["apt-get".into(), "install".into(), "-y".into()],
            PackageManager::Dnf => vec!["dnf".into(), "install".into(), "-y".into()],
            PackageManager::Pacman => vec!["pacman".into(), "-S".into(), "--noconfirm".into()],
            PackageManager::Brew => vec!["brew".into(), "install".into()],
            PackageManager::Unknown => return None,
        };
        args.extend(packages.iter().map(|p| p.to_string()));
        Some(args)
    }

    /// Argument vector upgrading `packages`; an empty slice upgrades the whole system.
    pub fn upgrade_args(&self, packages: &[&str]) -> Option<Vec<String>> {
        let mut args: Vec<String> = match self {
            PackageManager::Apt => vec!["apt-get".into(), "upgrade".into(), "-y".into()],
            PackageManager::Dnf => vec!["dnf".into(), "upgrade".into(), "-y".into()],
            PackageManager::Pacman if packages.is_empty() => {
                vec!["pacman".into(), "-Syu".into(), "--noconfirm".into()]
            }
            PackageManager::Pacman => vec!["pacman".into(), "-S".into(), "--noconfirm".into()],
            PackageManager::Brew => vec!["brew".into(), "upgrade".into()],
            PackageManager::Unknown => return None,
        };
        args.extend(packages.iter().map(|p| p.to_string()));
        Some(args)
    }
}

/// Host facts resolved once at startup and shared read-only with every runner.
#[derive(Debug, Clone)]
pub struct Platform {
    pub os: Os,
    pub arch: String,
    pub distro_id: String,
    pub pkg_manager: PackageManager,
}

impl Platform {
    pub fn detect() -> Self {
        let os = Os::current();
        let (distro_id, pkg_manager) = match os {
            Os::MacOs => ("macos".to_string(), PackageManager::Brew),
            Os::Linux => match fs::read_to_string("/etc/os-release") {
                Ok(content) => {
                    let pairs = parse_os_release(&content);
                    let id = pairs.get("ID").cloned().unwrap_or_default();
                    let id_like = pairs.get("ID_LIKE").cloned().unwrap_or_default();
                    let manager = detect_package_manager(&id, &id_like);
                    (id, manager)
                }
                Err(e) => {
                    debug!("failed to read /etc/os-release: {e}");
                    (String::new(), PackageManager::Unknown)
                }
            },
            Os::Windows | Os::Other => (String::new(), PackageManager::Unknown),
        };

        let platform = Self {
            os,
            arch: std::env::consts::ARCH.to_string(),
            distro_id,
            pkg_manager,
        };
        debug!(?platform, "detected platform");
        platform
    }

    /// Architecture name used in go.dev archive file names.
    pub fn go_arch(&self) -> &str {
        match self.arch.as_str() {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            "x86" => "386",
            other => other,
        }
    }
}

fn parse_os_release(content: &str) -> HashMap<String, String> {
    let mut pairs = HashMap::new();
    for line in content.lines() {
        if let Some((key, value)) = line.split_once('=') {
            let cleaned = value.trim_matches('"').to_string();
            pairs.insert(key.to_string(), cleaned);
        }
    }
    pairs
}

fn detect_package_manager(id: &str, id_like: &str) -> PackageManager {
    let debian_ids = ["ubuntu", "debian", "linuxmint", "pop", "ubuntu-budgie", "kdeneon"];
    let fedora_ids = ["fedora", "rhel", "centos", "rocky"];
    let arch_ids = ["arch", "manjaro", "endeavouros", "artix"];

    if debian_ids.iter().any(|&d| id == d) {
        return PackageManager::Apt;
    }
    if fedora_ids.iter().any(|&f| id == f) {
        return PackageManager::Dnf;
    }
    if arch_ids.iter().any(|&a| id == a) {
        return PackageManager::Pacman;
    }

    if id_like.contains("debian") || id_like.contains("ubuntu") {
        return PackageManager::Apt;
    }
    if id_like.contains("fedora") || id_like.contains("rhel") {
        return PackageManager::Dnf;
    }
    if id_like.contains("arch") {
        return PackageManager::Pacman;
    }

    PackageManager::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_os_release_strips_quotes() {
        let pairs = parse_os_release("NAME=\"Ubuntu\"\nID=ubuntu\nID_LIKE=debian\n");
        assert_eq!(pairs.get("NAME").map(String::as_str), Some("Ubuntu"));
        assert_eq!(pairs.get("ID").map(String::as_str), Some("ubuntu"));
    }

    #[test]
    fn test_detect_package_manager_by_id() {
        assert_eq!(detect_package_manager("debian", ""), PackageManager::Apt);
        assert_eq!(detect_package_manager("fedora", ""), PackageManager::Dnf);
        assert_eq!(detect_package_manager("manjaro", ""), PackageManager::Pacman);
    }

    #[test]
    fn test_detect_package_manager_by_id_like() {
        assert_eq!(detect_package_manager("elementary", "ubuntu debian"), PackageManager::Apt);
        assert_eq!(detect_package_manager("almalinux", "rhel centos fedora"), PackageManager::Dnf);
        assert_eq!(detect_package_manager("gentoo", ""), PackageManager::Unknown);
    }

    #[test]
    fn test_install_args() {
        assert_eq!(
            PackageManager::Apt.install_args(&["python3"]),
            Some(vec!["apt-get".to_string(), "install".into(), "-y".into(), "python3".into()])
        );
        assert_eq!(PackageManager::Brew.install_args(&[]), None);
        assert_eq!(PackageManager::Unknown.install_args(&["python3"]), None);
    }

    #[test]
    fn test_upgrade_args_whole_system() {
        assert_eq!(
            PackageManager::Pacman.upgrade_args(&[]),
            Some(vec!["pacman".to_string(), "-Syu".into(), "--noconfirm".into()])
        );
        assert_eq!(
            PackageManager::Apt.upgrade_args(&[]),
            Some(vec!["apt-get".to_string(), "upgrade".into(), "-y".into()])
        );
    }

    #[test]
    fn test_os_names() {
        assert_eq!(Os::from_name("macos").go_name(), Some("darwin"));
        assert_eq!(Os::from_name("linux").to_string(), "linux");
        assert_eq!(Os::from_name("freebsd"), Os::Other);
    }

    #[test]
    fn test_go_arch() {
        let platform = Platform {
            os: Os::Linux,
            arch: "x86_64".to_string(),
            distro_id: "ubuntu".to_string(),
            pkg_manager: PackageManager::Apt,
        };
        assert_eq!(platform.go_arch(), "amd64");
    }
}
