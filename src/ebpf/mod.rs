//! aya-backed hook loader
//!
//! Bridges the deployment pipeline to the kernel:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  User Space (DeploymentPipeline)                            │
//! │                                                             │
//! │  write_configuration() ──► AyaLoader::write_config          │
//! │  attach_and_pin()      ──► AyaLoader::attach / pin_link     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Kernel Space (bpfrestrict object)                          │
//! │                                                             │
//! │  lsm/bpf, lsm/bpf_map, lsm/bpf_prog                         │
//! │        │                                                    │
//! │        ├──► bpfrestrict_map     (perm, op)                  │
//! │        └──► bpfrestrict_ns_map  (initial pid namespace)     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Requirements
//!
//! - Linux kernel 5.7+ with CONFIG_BPF_LSM=y and `bpf` in the active LSM list
//! - Kernel BTF at /sys/kernel/btf/vmlinux
//! - CAP_BPF (or CAP_SYS_ADMIN) and CAP_MAC_ADMIN
//! - Compiled with `--features ebpf`

#[cfg(feature = "ebpf")]
mod loader;

#[cfg(feature = "ebpf")]
pub use loader::{AyaLoader, LsmHookLink};

#[cfg(not(feature = "ebpf"))]
use std::path::{Path, PathBuf};

#[cfg(not(feature = "ebpf"))]
use crate::deploy::{HookLoader, HookProgram, LoaderError, NamespaceIdentity};

/// Stub AyaLoader for when the eBPF feature is disabled.
///
/// The binary still builds and runs; opening the object reports the missing
/// feature as an unsupported resource.
#[cfg(not(feature = "ebpf"))]
pub struct AyaLoader {
    object: PathBuf,
}

#[cfg(not(feature = "ebpf"))]
impl AyaLoader {
    pub fn new(object: impl Into<PathBuf>) -> Self {
        Self {
            object: object.into(),
        }
    }

    fn disabled(&self) -> LoaderError {
        LoaderError::Unsupported(format!(
            "eBPF feature not enabled at compile time, cannot load {}",
            self.object.display()
        ))
    }
}

#[cfg(not(feature = "ebpf"))]
impl HookLoader for AyaLoader {
    type Link = ();

    fn open(&mut self) -> Result<(), LoaderError> {
        Err(self.disabled())
    }

    fn load(&mut self) -> Result<(), LoaderError> {
        Err(self.disabled())
    }

    fn write_config(&mut self, _key: u32, _value: u32) -> Result<(), LoaderError> {
        Err(self.disabled())
    }

    fn read_pinned_namespace(
        &mut self,
        _path: &Path,
    ) -> Result<Option<NamespaceIdentity>, LoaderError> {
        Err(self.disabled())
    }

    fn write_namespace(&mut self, _identity: NamespaceIdentity) -> Result<(), LoaderError> {
        Err(self.disabled())
    }

    fn pin_namespace(&mut self, _path: &Path) -> Result<(), LoaderError> {
        Err(self.disabled())
    }

    fn pin_base(&mut self, _path: &Path) -> Result<(), LoaderError> {
        Err(self.disabled())
    }

    fn attach(&mut self, _program: &HookProgram) -> Result<Self::Link, LoaderError> {
        Err(self.disabled())
    }

    fn pin_link(&mut self, _link: &mut Self::Link, _path: &Path) -> Result<(), LoaderError> {
        Err(self.disabled())
    }

    fn destroy_link(&mut self, _link: Self::Link) {}

    fn pin_commit_marker(&mut self, _path: &Path) -> Result<(), LoaderError> {
        Err(self.disabled())
    }
}

#[cfg(all(test, not(feature = "ebpf")))]
mod tests {
    use super::*;
    use crate::deploy::{DeployError, DeploymentLayout, DeploymentPipeline};
    use crate::policy::EnforcementConfiguration;

    #[test]
    fn test_stub_reports_unsupported_at_open() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DeploymentLayout::new(dir.path());
        let mut loader = AyaLoader::new("/nonexistent/bpfrestrict.bpf.o");

        let err = DeploymentPipeline::new(&mut loader, &layout)
            .run(&EnforcementConfiguration::default())
            .unwrap_err();
        assert!(matches!(err, DeployError::ResourceUnavailable { .. }));
        assert!(!layout.root().exists());
    }
}
