//! Configuration map writer
//!
//! Hooks read two keys on every bpf() call:
//!
//! - `perm` ([`PERM_KEY`]): always written, default profile included, so a
//!   hook never sees an undefined profile.
//! - `op` ([`OP_KEY`]): written only when at least one operation is blocked.
//!   An absent key means "nothing blocked".

use super::error::DeployError;
use super::loader::{HookLoader, LoaderError, OP_KEY, PERM_KEY};
use crate::policy::EnforcementConfiguration;

pub fn write_configuration<L: HookLoader>(
    loader: &mut L,
    config: &EnforcementConfiguration,
) -> Result<(), DeployError> {
    loader
        .write_config(PERM_KEY, config.profile.code())
        .map_err(|source| write_failure("perm", source))?;

    if let Some(mask) = config.blocked.mask() {
        loader
            .write_config(OP_KEY, mask)
            .map_err(|source| write_failure("op", source))?;
    }

    tracing::info!(
        profile = %config.profile,
        blocked = ?config.blocked.names(),
        "configuration map written"
    );
    Ok(())
}

fn write_failure(key: &'static str, source: LoaderError) -> DeployError {
    DeployError::ConfigurationWriteFailure { key, source }
}
