//! Capability requirements for loading BPF LSM hooks
//!
//! # Which capabilities?
//!
//! ```text
//! ┌──────────────────────────┬──────────────────────────────────────────┐
//! │ Operation                │ Needs                                    │
//! ├──────────────────────────┼──────────────────────────────────────────┤
//! │ create maps, load progs  │ CAP_BPF (5.8+) or CAP_SYS_ADMIN          │
//! │ attach LSM programs      │ CAP_MAC_ADMIN                            │
//! │ pin into /sys/fs/bpf     │ write access to the bpffs (usually root) │
//! └──────────────────────────┴──────────────────────────────────────────┘
//! ```
//!
//! Only the effective set matters: the loader never execs, so whatever is
//! effective now is what the kernel checks on each bpf() call.

use caps::{CapSet, Capability, CapsHashSet};

// ═══════════════════════════════════════════════════════════════════════════
// CapabilityRequirement
// ═══════════════════════════════════════════════════════════════════════════
// WHAT IT IS:
//   A requirement satisfied by ANY ONE of its alternatives. CAP_BPF was
//   split out of CAP_SYS_ADMIN in 5.8, so either one grants map/prog
//   creation.
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityRequirement {
    /// What the capability is needed for (for error messages)
    pub purpose: &'static str,
    /// Any one of these satisfies the requirement
    pub any_of: &'static [Capability],
}

/// Everything bpfrestrict needs before touching the kernel.
pub const LOADER_REQUIREMENTS: &[CapabilityRequirement] = &[
    CapabilityRequirement {
        purpose: "load BPF programs",
        any_of: &[Capability::CAP_BPF, Capability::CAP_SYS_ADMIN],
    },
    CapabilityRequirement {
        purpose: "attach LSM hooks",
        any_of: &[Capability::CAP_MAC_ADMIN],
    },
];

impl CapabilityRequirement {
    pub fn is_met_by(&self, effective: &CapsHashSet) -> bool {
        self.any_of.iter().any(|cap| effective.contains(cap))
    }

    /// Human-readable alternatives, e.g. "CAP_BPF or CAP_SYS_ADMIN"
    pub fn describe(&self) -> String {
        self.any_of
            .iter()
            .map(|cap| cap.to_string())
            .collect::<Vec<_>>()
            .join(" or ")
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// missing_requirements() - Check the current process
// ═══════════════════════════════════════════════════════════════════════════
// RETURNS:
//   The requirements NOT satisfied by the effective set (empty = all good)
// ═══════════════════════════════════════════════════════════════════════════
pub fn missing_requirements() -> Result<Vec<CapabilityRequirement>, caps::errors::CapsError> {
    let effective = caps::read(None, CapSet::Effective)?;
    Ok(unmet(LOADER_REQUIREMENTS, &effective))
}

fn unmet(
    requirements: &[CapabilityRequirement],
    effective: &CapsHashSet,
) -> Vec<CapabilityRequirement> {
    requirements
        .iter()
        .filter(|req| !req.is_met_by(effective))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(caps: &[Capability]) -> CapsHashSet {
        caps.iter().copied().collect()
    }

    #[test]
    fn test_root_like_set_meets_everything() {
        let effective = set(&[Capability::CAP_SYS_ADMIN, Capability::CAP_MAC_ADMIN]);
        assert!(unmet(LOADER_REQUIREMENTS, &effective).is_empty());
    }

    #[test]
    fn test_cap_bpf_replaces_sys_admin() {
        let effective = set(&[Capability::CAP_BPF, Capability::CAP_MAC_ADMIN]);
        assert!(unmet(LOADER_REQUIREMENTS, &effective).is_empty());
    }

    #[test]
    fn test_missing_mac_admin() {
        let effective = set(&[Capability::CAP_BPF]);
        let missing = unmet(LOADER_REQUIREMENTS, &effective);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].purpose, "attach LSM hooks");
        assert_eq!(missing[0].describe(), "CAP_MAC_ADMIN");
    }

    #[test]
    fn test_describe_alternatives() {
        assert_eq!(
            LOADER_REQUIREMENTS[0].describe(),
            "CAP_BPF or CAP_SYS_ADMIN"
        );
    }

    #[test]
    fn test_read_current_caps() {
        // Should not error, result depends on who runs the tests
        assert!(missing_requirements().is_ok());
    }
}
