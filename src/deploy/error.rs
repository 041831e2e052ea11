//! Deployment errors, each tagged with the step that failed

use std::fmt;
use std::path::PathBuf;

use super::loader::LoaderError;
use crate::policy::PolicyError;

/// Named step of a deployment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Resolve,
    Preflight,
    Guard,
    Open,
    Load,
    Configure,
    Namespace,
    PinBase,
    Attach,
    PinLink,
    Commit,
}

impl Step {
    pub const fn as_str(self) -> &'static str {
        match self {
            Step::Resolve => "resolve",
            Step::Preflight => "preflight",
            Step::Guard => "guard",
            Step::Open => "open",
            Step::Load => "load",
            Step::Configure => "configure",
            Step::Namespace => "namespace",
            Step::PinBase => "pin-base",
            Step::Attach => "attach",
            Step::PinLink => "pin-link",
            Step::Commit => "commit",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error(transparent)]
    InputTooLong(#[from] PolicyError),

    /// Not a failure: a complete deployment is already in place.
    #[error(
        "already loaded, nothing to do; delete pinned directory '{}' to be able to run it again",
        .root.display()
    )]
    AlreadyActive { root: PathBuf },

    /// A previous run pinned state but never committed.
    #[error(
        "incomplete deployment found at '{}' (no commit marker); delete it to be able to run again",
        .root.display()
    )]
    PartialDeployment { root: PathBuf },

    #[error("{step}: resource unavailable: {reason}")]
    ResourceUnavailable { step: Step, reason: String },

    #[error("{step}: failed to load BPF object: {source}")]
    LoadFailure { step: Step, source: LoaderError },

    #[error("{step}: BPF verification failed: {source}")]
    VerificationFailure { step: Step, source: LoaderError },

    #[error("configure: failed to write '{key}' into the configuration map: {source}")]
    ConfigurationWriteFailure {
        key: &'static str,
        source: LoaderError,
    },

    #[error("namespace: failed to set up initial namespace reference: {reason}")]
    NamespaceSetupFailure { reason: String },

    #[error("attach: failed to attach program {program} (#{index}): {source}")]
    AttachFailure {
        program: &'static str,
        index: usize,
        source: LoaderError,
    },

    #[error("{step}: failed to pin into '{}': {source}", .path.display())]
    PinFailure {
        step: Step,
        path: PathBuf,
        source: LoaderError,
    },
}

impl DeployError {
    /// Step the run stopped at.
    pub fn step(&self) -> Step {
        match self {
            DeployError::InputTooLong(_) => Step::Resolve,
            DeployError::AlreadyActive { .. } | DeployError::PartialDeployment { .. } => {
                Step::Guard
            }
            DeployError::ResourceUnavailable { step, .. }
            | DeployError::LoadFailure { step, .. }
            | DeployError::VerificationFailure { step, .. }
            | DeployError::PinFailure { step, .. } => *step,
            DeployError::ConfigurationWriteFailure { .. } => Step::Configure,
            DeployError::NamespaceSetupFailure { .. } => Step::Namespace,
            DeployError::AttachFailure { .. } => Step::Attach,
        }
    }

    pub fn is_already_active(&self) -> bool {
        matches!(self, DeployError::AlreadyActive { .. })
    }

    /// Classify an open/load failure from the backend.
    pub(crate) fn from_load(step: Step, source: LoaderError) -> Self {
        match source {
            LoaderError::Unsupported(reason) => DeployError::ResourceUnavailable { step, reason },
            source @ LoaderError::Rejected(_) => DeployError::VerificationFailure { step, source },
            source => DeployError::LoadFailure { step, source },
        }
    }
}
