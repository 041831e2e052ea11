//! Host preflight for bpfrestrict
//!
//! Before any BPF object is opened the loader verifies the host can run the
//! hooks at all, so a missing kernel feature surfaces as one clear
//! `ResourceUnavailable` instead of a verifier or attach error later on.
//!
//! # Checks
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  1. BPF LSM enabled        /sys/kernel/security/lsm lists "bpf" │
//! │  2. Capabilities           CAP_BPF|CAP_SYS_ADMIN + CAP_MAC_ADMIN│
//! │  3. RLIMIT_MEMLOCK         raised to infinity (pre-5.11 kernels)│
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod capabilities;
pub mod preflight;

pub use capabilities::{CapabilityRequirement, LOADER_REQUIREMENTS};
pub use preflight::{run_preflight, PreflightError};
