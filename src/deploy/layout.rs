//! Persisted state layout on the BPF filesystem
//!
//! ```text
//! /sys/fs/bpf/bpflock/                 ← pin root, shared by bpflock tools
//! ├── ns_map                           ← initial pid namespace reference
//! └── bpfrestrict/                     ← deployment root
//!     ├── bpfrestrict_map              ← configuration map (base pin)
//!     ├── bpfrestrict_bpf_link         ← one pinned link per program
//!     ├── bpfrestrict_bpf_map_link
//!     ├── bpfrestrict_bpf_prog_link
//!     └── committed                    ← written last
//! ```

use std::path::{Path, PathBuf};

use super::loader::HookProgram;

/// Directory of this tool under the pin root
pub const DEPLOYMENT_DIR: &str = "bpfrestrict";

/// Name of the configuration map and of its pin
pub const CONFIG_MAP_NAME: &str = "bpfrestrict_map";

/// Name of the shared namespace pin
pub const NAMESPACE_PIN_NAME: &str = "ns_map";

/// Name of the completion marker
pub const COMMIT_MARKER_NAME: &str = "committed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentLayout {
    pin_root: PathBuf,
    root: PathBuf,
}

impl DeploymentLayout {
    pub fn new(pin_root: impl Into<PathBuf>) -> Self {
        let pin_root = pin_root.into();
        let root = pin_root.join(DEPLOYMENT_DIR);
        Self { pin_root, root }
    }

    pub fn pin_root(&self) -> &Path {
        &self.pin_root
    }

    /// Directory an operator removes to reverse the deployment.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_store_pin(&self) -> PathBuf {
        self.root.join(CONFIG_MAP_NAME)
    }

    pub fn link_pin(&self, program: &HookProgram) -> PathBuf {
        self.root.join(format!("{}_link", program.name))
    }

    pub fn commit_marker(&self) -> PathBuf {
        self.root.join(COMMIT_MARKER_NAME)
    }

    pub fn namespace_pin(&self) -> PathBuf {
        self.pin_root.join(NAMESPACE_PIN_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::HOOK_PROGRAMS;

    #[test]
    fn test_paths() {
        let layout = DeploymentLayout::new("/sys/fs/bpf/bpflock");
        assert_eq!(layout.root(), Path::new("/sys/fs/bpf/bpflock/bpfrestrict"));
        assert_eq!(
            layout.namespace_pin(),
            Path::new("/sys/fs/bpf/bpflock/ns_map")
        );
        assert_eq!(
            layout.link_pin(&HOOK_PROGRAMS[0]),
            Path::new("/sys/fs/bpf/bpflock/bpfrestrict/bpfrestrict_bpf_link")
        );
        assert!(layout.commit_marker().starts_with(layout.root()));
    }

    #[test]
    fn test_link_pins_are_distinct() {
        let layout = DeploymentLayout::new("/pins");
        let mut pins: Vec<_> = HOOK_PROGRAMS.iter().map(|p| layout.link_pin(p)).collect();
        pins.sort();
        pins.dedup();
        assert_eq!(pins.len(), HOOK_PROGRAMS.len());
    }
}
