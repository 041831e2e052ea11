//! Idempotency guard
//!
//! Only the commit marker, pinned after every link, declares a deployment
//! active. A deployment root without the marker is what a failed run leaves
//! behind and is reported separately so the operator can clean it up.
//!
//! Two concurrent invocations can both pass the guard; the loser then fails
//! when pinning over the winner's files. This is accepted.

use std::path::Path;

use super::error::DeployError;
use super::layout::DeploymentLayout;

/// What the bpffs says about an earlier run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentState {
    Absent,
    Partial,
    Active,
}

pub fn inspect(layout: &DeploymentLayout) -> DeploymentState {
    if exists(&layout.commit_marker()) {
        DeploymentState::Active
    } else if exists(layout.root()) {
        DeploymentState::Partial
    } else {
        DeploymentState::Absent
    }
}

/// Pass only when nothing from an earlier run is pinned.
pub fn check_not_already_deployed(layout: &DeploymentLayout) -> Result<(), DeployError> {
    let state = inspect(layout);
    tracing::debug!(root = %layout.root().display(), ?state, "inspected persisted state");

    match state {
        DeploymentState::Absent => Ok(()),
        DeploymentState::Active => Err(DeployError::AlreadyActive {
            root: layout.root().to_path_buf(),
        }),
        DeploymentState::Partial => Err(DeployError::PartialDeployment {
            root: layout.root().to_path_buf(),
        }),
    }
}

// symlink_metadata so a dangling entry still counts as present
fn exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}
