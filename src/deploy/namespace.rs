//! Initial pid namespace reference
//!
//! Baseline-profile hooks allow bpf() only for tasks whose pid namespace
//! matches a trusted value. That value is captured from the loader's own
//! namespace and pinned once under the shared pin root, where other bpflock
//! tools reuse it instead of capturing their own.

use std::fs;
use std::io;
use std::path::Path;

use nix::sys::stat::stat;

use super::error::DeployError;
use super::layout::DeploymentLayout;
use super::loader::HookLoader;

/// Namespace file the identity is read from
pub const SELF_PID_NS: &str = "/proc/self/ns/pid";

/// Identity of a pid namespace as the kernel exposes it to BPF.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NamespaceIdentity {
    pub inode: u64,
    pub device: u64,
}

impl NamespaceIdentity {
    /// Identity of the calling process's pid namespace.
    pub fn current() -> io::Result<Self> {
        Self::from_ns_file(Path::new(SELF_PID_NS))
    }

    pub fn from_ns_file(path: &Path) -> io::Result<Self> {
        let st = stat(path).map_err(io::Error::from)?;
        Ok(Self {
            inode: st.st_ino,
            device: st.st_dev,
        })
    }
}

/// How the namespace reference was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceSetup {
    /// An existing pin was found and its identity reused
    Reused(NamespaceIdentity),
    /// The identity was captured and pinned by this run
    Created(NamespaceIdentity),
}

impl NamespaceSetup {
    pub fn identity(&self) -> NamespaceIdentity {
        match self {
            NamespaceSetup::Reused(id) | NamespaceSetup::Created(id) => *id,
        }
    }
}

/// Make the object's namespace map hold the canonical identity.
///
/// `capture` supplies the identity when no reusable pin exists.
pub fn ensure_namespace_ready<L, F>(
    loader: &mut L,
    layout: &DeploymentLayout,
    capture: F,
) -> Result<NamespaceSetup, DeployError>
where
    L: HookLoader,
    F: FnOnce() -> io::Result<NamespaceIdentity>,
{
    let pin = layout.namespace_pin();

    if let Some(identity) = read_reusable_pin(loader, &pin) {
        loader
            .write_namespace(identity)
            .map_err(|e| setup_failure(format!("failed to store reused identity: {}", e)))?;
        tracing::info!(pin = %pin.display(), inode = identity.inode, "reusing pinned namespace reference");
        return Ok(NamespaceSetup::Reused(identity));
    }

    let identity =
        capture().map_err(|e| setup_failure(format!("failed to read {}: {}", SELF_PID_NS, e)))?;
    loader
        .write_namespace(identity)
        .map_err(|e| setup_failure(format!("failed to store identity: {}", e)))?;

    if pin.symlink_metadata().is_ok() {
        // present but unreadable: leave it for the operator
        tracing::warn!(pin = %pin.display(), "namespace pin is unusable, not replacing it");
    } else {
        fs::create_dir_all(layout.pin_root()).map_err(|e| {
            setup_failure(format!("failed to create '{}': {}", layout.pin_root().display(), e))
        })?;
        loader
            .pin_namespace(&pin)
            .map_err(|e| setup_failure(format!("failed to pin into '{}': {}", pin.display(), e)))?;
    }

    tracing::info!(pin = %pin.display(), inode = identity.inode, "pinned initial namespace reference");
    Ok(NamespaceSetup::Created(identity))
}

/// Best effort: any problem reading the pin means "not reusable".
fn read_reusable_pin<L: HookLoader>(loader: &mut L, pin: &Path) -> Option<NamespaceIdentity> {
    if pin.symlink_metadata().is_err() {
        return None;
    }
    match loader.read_pinned_namespace(pin) {
        Ok(Some(identity)) => Some(identity),
        Ok(None) => {
            tracing::debug!(pin = %pin.display(), "pinned namespace map is empty");
            None
        }
        Err(e) => {
            tracing::warn!(pin = %pin.display(), error = %e, "cannot reuse pinned namespace map");
            None
        }
    }
}

fn setup_failure(reason: String) -> DeployError {
    DeployError::NamespaceSetupFailure { reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_identity_is_stable() {
        let a = NamespaceIdentity::current().unwrap();
        let b = NamespaceIdentity::current().unwrap();
        assert_eq!(a, b);
        assert_ne!(a.inode, 0);
    }

    #[test]
    fn test_missing_ns_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = NamespaceIdentity::from_ns_file(&dir.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_setup_identity() {
        let id = NamespaceIdentity { inode: 4026531836, device: 4 };
        assert_eq!(NamespaceSetup::Reused(id).identity(), id);
        assert_eq!(NamespaceSetup::Created(id).identity(), id);
    }
}
