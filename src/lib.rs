//! bpflock - restrict the bpf() system call with BPF LSM hooks
//!
//! This library is the control plane of `bpfrestrict`: it resolves a small
//! policy vocabulary into the configuration read by pre-built LSM hooks and
//! deploys those hooks into a pinned, idempotent state on the BPF filesystem.
//!
//! # Modules
//!
//! - `policy` - Profile and blocked-operation vocabulary
//! - `deploy` - Idempotency guard and the ordered deployment pipeline
//! - `ebpf` - aya-backed hook loader (real backend requires `--features ebpf`)
//! - `security` - Host preflight (BPF LSM, capabilities, memlock)
//! - `config` - Loader settings and pin layout
//! - `logging` - tracing-subscriber setup
//! - `metrics` - Prometheus metrics, exported as a textfile
//!
//! # Quick Start
//!
//! ```ignore
//! use bpflock::{deploy, ebpf::AyaLoader, policy, Settings};
//!
//! let settings = Settings::default();
//! let config = policy::resolve(Some("restricted"), None)?;
//! let mut loader = AyaLoader::new(&settings.object);
//! let deployment = deploy::deploy(&mut loader, &settings.layout(), config)?;
//! ```

pub mod config;
pub mod deploy;
pub mod ebpf;
pub mod logging;
pub mod metrics;
pub mod policy;
pub mod security;

// Re-export commonly used types at crate root for convenience
pub use config::Settings;
pub use deploy::{DeployError, Deployment, DeploymentLayout, HookLoader};
pub use policy::{AccessProfile, BlockOperationSet, EnforcementConfiguration};
