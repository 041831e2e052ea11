//! Contract of the privileged loading backend
//!
//! The pipeline never touches kernel objects directly. Everything it needs
//! from the backend (open, load, map writes, attach, pin) goes through
//! [`HookLoader`], so the orchestration can be exercised against a recording
//! mock and the real implementation stays behind the `ebpf` feature.

use std::path::Path;

use super::namespace::NamespaceIdentity;

/// Key of the profile entry in the configuration map
pub const PERM_KEY: u32 = 1;

/// Key of the blocked-operations entry in the configuration map
pub const OP_KEY: u32 = 2;

/// One enforcement program of the hook object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookProgram {
    /// Program name inside the object
    pub name: &'static str,
    /// LSM hook it attaches to
    pub hook: &'static str,
}

/// Programs of the bpfrestrict object, in attach order.
pub const HOOK_PROGRAMS: &[HookProgram] = &[
    HookProgram {
        name: "bpfrestrict_bpf",
        hook: "bpf",
    },
    HookProgram {
        name: "bpfrestrict_bpf_map",
        hook: "bpf_map",
    },
    HookProgram {
        name: "bpfrestrict_bpf_prog",
        hook: "bpf_prog",
    },
];

/// Backend failure, classified so the pipeline can name the error kind.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// Kernel or build lacks what the hooks need (BPF LSM, BTF, privileges)
    #[error("not supported: {0}")]
    Unsupported(String),
    /// The object could not be read or parsed
    #[error("invalid object: {0}")]
    Object(String),
    /// The verifier refused a program
    #[error("rejected by verifier: {0}")]
    Rejected(String),
    #[error("map error: {0}")]
    Map(String),
    #[error("attach error: {0}")]
    Attach(String),
    #[error("pin error: {0}")]
    Pin(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Loading, configuration and attachment primitives for one hook object.
///
/// Calls arrive in pipeline order: `open`, `load`, `write_config`,
/// namespace setup, `pin_base`, then `attach`/`pin_link` per program and
/// finally `pin_commit_marker`. Implementations are not expected to
/// tolerate other orders.
pub trait HookLoader {
    /// Handle for an attached program. Dropping it must not detach a pinned link.
    type Link;

    /// Read and parse the object.
    fn open(&mut self) -> Result<(), LoaderError>;

    /// Create the object's maps and submit every program to the verifier.
    fn load(&mut self) -> Result<(), LoaderError>;

    /// Insert or overwrite `key` in the configuration map.
    fn write_config(&mut self, key: u32, value: u32) -> Result<(), LoaderError>;

    /// Read the namespace identity held by a pinned namespace map.
    ///
    /// `Ok(None)` means the pin exists but holds no identity.
    fn read_pinned_namespace(
        &mut self,
        path: &Path,
    ) -> Result<Option<NamespaceIdentity>, LoaderError>;

    /// Store `identity` in the object's own namespace map.
    fn write_namespace(&mut self, identity: NamespaceIdentity) -> Result<(), LoaderError>;

    /// Pin the object's namespace map at the shared location.
    fn pin_namespace(&mut self, path: &Path) -> Result<(), LoaderError>;

    /// Pin the configuration map; this is the base of the deployment.
    fn pin_base(&mut self, path: &Path) -> Result<(), LoaderError>;

    fn attach(&mut self, program: &HookProgram) -> Result<Self::Link, LoaderError>;

    fn pin_link(&mut self, link: &mut Self::Link, path: &Path) -> Result<(), LoaderError>;

    /// Release a link handle on the failure path. Unpinned links detach.
    fn destroy_link(&mut self, link: Self::Link);

    /// Pin the marker that declares the deployment complete.
    fn pin_commit_marker(&mut self, path: &Path) -> Result<(), LoaderError>;
}
