//! Prometheus metrics for deployment runs
//!
//! The loader is a one-shot process, so metrics are exported through the
//! node-exporter textfile collector rather than a scrape endpoint:
//!
//! ```text
//! bpfrestrict --metrics-file /var/lib/node_exporter/bpflock.prom
//! ```

use std::fs;
use std::io;
use std::path::Path;

use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, register_int_gauge, Encoder, IntCounterVec, IntGauge, TextEncoder};

use crate::deploy::Step;
use crate::policy::AccessProfile;

lazy_static! {
    /// Pipeline steps executed, by step name and outcome ("ok" / "error").
    pub static ref DEPLOY_STEPS: IntCounterVec = register_int_counter_vec!(
        "bpflock_deploy_steps_total",
        "Deployment pipeline steps executed by bpfrestrict",
        &["step", "outcome"]
    ).expect("failed to register DEPLOY_STEPS metric");

    /// Whether this run left or found an active deployment.
    pub static ref RESTRICT_ACTIVE: IntGauge = register_int_gauge!(
        "bpflock_restrict_active",
        "Whether bpf() restriction is active (1) or not (0)"
    ).expect("failed to register RESTRICT_ACTIVE metric");

    /// Code of the profile deployed by this run, 0 otherwise.
    pub static ref RESTRICT_PROFILE: IntGauge = register_int_gauge!(
        "bpflock_restrict_profile",
        "Enforced bpf() access profile (1=allow, 2=baseline, 3=restricted)"
    ).expect("failed to register RESTRICT_PROFILE metric");
}

pub fn record_step(step: Step, ok: bool) {
    DEPLOY_STEPS
        .with_label_values(&[step.as_str(), if ok { "ok" } else { "error" }])
        .inc();
}

pub fn set_active(profile: Option<AccessProfile>) {
    RESTRICT_ACTIVE.set(i64::from(profile.is_some()));
    RESTRICT_PROFILE.set(profile.map_or(0, |p| i64::from(p.code())));
}

/// An earlier run's deployment is in place; its profile is not known here.
pub fn set_found_active() {
    RESTRICT_ACTIVE.set(1);
    RESTRICT_PROFILE.set(0);
}

/// Render the default registry in text exposition format.
pub fn render() -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    TextEncoder::new()
        .encode(&prometheus::gather(), &mut buf)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    Ok(buf)
}

/// Write metrics atomically so the collector never reads a partial file.
pub fn write_textfile(path: &Path) -> io::Result<()> {
    let tmp = path.with_extension("prom.tmp");
    fs::write(&tmp, render()?)?;
    fs::rename(&tmp, path)
}
