//! Fail-safe deployment of the bpfrestrict hooks
//!
//! A run either leaves the hooks fully active (every link pinned and the
//! commit marker written) or reports which step failed. Re-running over an
//! active deployment is always safe: the guard stops it before any mutation.
//!
//! ## Flow
//!
//! ```text
//! EnforcementConfiguration
//!          │
//!          ▼
//! ┌──────────────────┐  marker present   ┌──────────────────┐
//! │ Idempotency guard│──────────────────►│  AlreadyActive   │
//! └────────┬─────────┘                   └──────────────────┘
//!          │ absent
//!          ▼
//! ┌──────────────────┐     ┌──────────────────────────────┐
//! │ DeploymentPipeline│────►│ HookLoader (aya or mock)     │
//! └────────┬─────────┘     │ open/load/write/attach/pin   │
//!          │               └──────────────────────────────┘
//!          ▼
//!      Deployment
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let config = policy::resolve(Some("baseline"), Some("prog_load"))?;
//! let layout = settings.layout();
//! let mut loader = AyaLoader::new(&settings.object);
//! let deployment = deploy::deploy(&mut loader, &layout, config)?;
//! ```

mod error;
mod guard;
mod layout;
mod loader;
mod namespace;
mod pipeline;
mod report;
mod store;

pub use error::{DeployError, Step};
pub use guard::{check_not_already_deployed, inspect, DeploymentState};
pub use layout::{DeploymentLayout, CONFIG_MAP_NAME, COMMIT_MARKER_NAME, NAMESPACE_PIN_NAME};
pub use loader::{HookLoader, HookProgram, LoaderError, HOOK_PROGRAMS, OP_KEY, PERM_KEY};
pub use namespace::{ensure_namespace_ready, NamespaceIdentity, NamespaceSetup};
pub use pipeline::{Deployment, DeploymentPipeline, PipelineState};
pub use report::{DeploymentReport, Outcome};
pub use store::write_configuration;

use crate::metrics;
use crate::policy::EnforcementConfiguration;

/// Guard, then run the pipeline with the default program list.
pub fn deploy<L: HookLoader>(
    loader: &mut L,
    layout: &DeploymentLayout,
    config: EnforcementConfiguration,
) -> Result<Deployment, DeployError> {
    if let Err(e) = check_not_already_deployed(layout) {
        metrics::record_step(Step::Guard, false);
        return Err(e);
    }
    metrics::record_step(Step::Guard, true);

    DeploymentPipeline::new(loader, layout).run(&config)
}
