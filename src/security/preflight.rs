//! Host checks run before any BPF object is opened

use std::fs;
use std::path::Path;

use nix::sys::resource::{setrlimit, Resource};

use super::capabilities;
use crate::deploy::{DeployError, Step};

/// Active LSMs, comma separated
pub const LSM_LIST_PATH: &str = "/sys/kernel/security/lsm";

#[derive(Debug, thiserror::Error)]
pub enum PreflightError {
    #[error("BPF LSM is not enabled (missing 'bpf' in {path}): boot with lsm=...,bpf")]
    LsmDisabled { path: String },
    #[error("cannot read {path}: {source}")]
    LsmUnreadable {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to raise RLIMIT_MEMLOCK: {0}")]
    Memlock(nix::errno::Errno),
    #[error("missing capability {needed} to {purpose}")]
    MissingCapability {
        purpose: &'static str,
        needed: String,
    },
    #[error("cannot read process capabilities: {0}")]
    Capabilities(String),
}

impl From<PreflightError> for DeployError {
    fn from(e: PreflightError) -> Self {
        DeployError::ResourceUnavailable {
            step: Step::Preflight,
            reason: e.to_string(),
        }
    }
}

/// Run every check in order, stopping at the first failure.
pub fn run_preflight() -> Result<(), PreflightError> {
    check_lsm_support(Path::new(LSM_LIST_PATH))?;
    check_capabilities()?;
    bump_memlock_rlimit()?;
    tracing::debug!("preflight checks passed");
    Ok(())
}

pub fn check_lsm_support(lsm_list: &Path) -> Result<(), PreflightError> {
    let contents = fs::read_to_string(lsm_list).map_err(|source| PreflightError::LsmUnreadable {
        path: lsm_list.display().to_string(),
        source,
    })?;

    if lsm_list_has_bpf(&contents) {
        Ok(())
    } else {
        Err(PreflightError::LsmDisabled {
            path: lsm_list.display().to_string(),
        })
    }
}

fn lsm_list_has_bpf(contents: &str) -> bool {
    contents.trim().split(',').any(|lsm| lsm == "bpf")
}

pub fn check_capabilities() -> Result<(), PreflightError> {
    let missing = capabilities::missing_requirements()
        .map_err(|e| PreflightError::Capabilities(e.to_string()))?;

    match missing.first() {
        Some(req) => Err(PreflightError::MissingCapability {
            purpose: req.purpose,
            needed: req.describe(),
        }),
        None => Ok(()),
    }
}

/// Kernels before 5.11 charge BPF maps against RLIMIT_MEMLOCK.
pub fn bump_memlock_rlimit() -> Result<(), PreflightError> {
    setrlimit(
        Resource::RLIMIT_MEMLOCK,
        libc::RLIM_INFINITY,
        libc::RLIM_INFINITY,
    )
    .map_err(PreflightError::Memlock)
}
