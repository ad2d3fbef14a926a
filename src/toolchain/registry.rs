use std::collections::BTreeMap;

use super::{Cpp, Go, Java, Python, Rust, Toolchain, ToolchainId};

/// Newest known release per toolchain. These are bare version numbers, while
/// the probed version is the detector's whole first output line (for example
/// `go version go1.25.5 linux/amd64`), so the two rarely compare equal.
const LATEST_VERSIONS: &[(&str, &str)] = &[
    ("go", "1.25.5"),
    ("python", "3.13.0"),
    ("rust", "1.81.0"),
    ("c++", "14"),
    ("java", "21"),
];

/// The static latest-version table with optional per-id overrides from config.
#[derive(Debug, Clone, Default)]
pub struct LatestVersions {
    overrides: BTreeMap<ToolchainId, String>,
}

impl LatestVersions {
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        Self {
            overrides: overrides
                .iter()
                .map(|(id, version)| (ToolchainId::new(id), version.trim().to_string()))
                .collect(),
        }
    }

    /// Latest version for `id`, or an empty string when none is known.
    pub fn get(&self, id: &ToolchainId) -> String {
        if let Some(version) = self.overrides.get(id) {
            return version.clone();
        }
        LATEST_VERSIONS
            .iter()
            .find(|(name, _)| *name == id.as_str())
            .map(|(_, version)| version.to_string())
            .unwrap_or_default()
    }
}

/// Ordered set of supported toolchains. Order is menu order.
pub struct Registry {
    toolchains: Vec<Box<dyn Toolchain>>,
}

impl Registry {
    pub fn new(toolchains: Vec<Box<dyn Toolchain>>) -> Self {
        Self { toolchains }
    }

    /// Go, Python, Rust, C++ and Java. The Go archive tracks the latest Go version.
    pub fn builtin(latest: &LatestVersions) -> Self {
        Self::new(vec![
            Box::new(Go::new(latest.get(&ToolchainId::new("go")))),
            Box::new(Python),
            Box::new(Rust),
            Box::new(Cpp),
            Box::new(Java),
        ])
    }

    pub fn get(&self, id: &ToolchainId) -> Option<&dyn Toolchain> {
        self.toolchains
            .iter()
            .find(|toolchain| &toolchain.id() == id)
            .map(|toolchain| toolchain.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Toolchain> {
        self.toolchains.iter().map(|toolchain| toolchain.as_ref())
    }

    pub fn ids(&self) -> Vec<ToolchainId> {
        self.iter().map(|toolchain| toolchain.id()).collect()
    }

    /// Parse a comma separated list of ids, dropping duplicates and keeping
    /// first-seen order. Fails on the first id that is not registered.
    pub fn parse_selection(&self, list: &str) -> Result<Vec<ToolchainId>, String> {
        let mut selection: Vec<ToolchainId> = Vec::new();
        for part in list.split(',').map(str::trim).filter(|part| !part.is_empty()) {
            let id = ToolchainId::new(part);
            if self.get(&id).is_none() {
                let known: Vec<String> = self.ids().iter().map(ToString::to_string).collect();
                return Err(format!(
                    "unknown toolchain '{part}' (expected one of: {})",
                    known.join(", ")
                ));
            }
            if !selection.contains(&id) {
                selection.push(id);
            }
        }
        Ok(selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_versions_table() {
        let latest = LatestVersions::default();
        assert_eq!(latest.get(&ToolchainId::new("go")), "1.25.5");
        assert_eq!(latest.get(&ToolchainId::new("C++")), "14");
        assert_eq!(latest.get(&ToolchainId::new("cobol")), "");
    }

    #[test]
    fn test_latest_versions_override() {
        let mut overrides = BTreeMap::new();
        overrides.insert("Go".to_string(), " 1.26.0 ".to_string());
        let latest = LatestVersions::with_overrides(&overrides);
        assert_eq!(latest.get(&ToolchainId::new("go")), "1.26.0");
        assert_eq!(latest.get(&ToolchainId::new("java")), "21");
    }

    #[test]
    fn test_builtin_registry_order() {
        let registry = Registry::builtin(&LatestVersions::default());
        let ids: Vec<String> = registry.ids().iter().map(ToString::to_string).collect();
        assert_eq!(ids, vec!["go", "python", "rust", "c++", "java"]);
        assert_eq!(registry.get(&ToolchainId::new("java")).map(|t| t.display_name()), Some("Java"));
        assert!(registry.get(&ToolchainId::new("cobol")).is_none());
    }

    #[test]
    fn test_parse_selection() {
        let registry = Registry::builtin(&LatestVersions::default());
        let selection = registry.parse_selection("Python, go,python,,c++").unwrap();
        let names: Vec<&str> = selection.iter().map(ToolchainId::as_str).collect();
        assert_eq!(names, vec!["python", "go", "c++"]);
    }

    #[test]
    fn test_parse_selection_rejects_unknown() {
        let registry = Registry::builtin(&LatestVersions::default());
        let err = registry.parse_selection("go,cobol").unwrap_err();
        assert!(err.contains("cobol"));
        assert!(registry.parse_selection("").unwrap().is_empty());
    }
}
