//! Access profiles for the bpf() system call

use serde::Serialize;

/// Profile selector aliases, in match priority order.
///
/// Matching is a case-sensitive prefix test: `restricted-v2` still selects
/// the restricted profile. Anything that matches nothing is `Allow`.
const PROFILE_ALIASES: &[(&str, AccessProfile)] = &[
    ("restricted", AccessProfile::Restricted),
    ("baseline", AccessProfile::Baseline),
    ("allow", AccessProfile::Allow),
    ("none", AccessProfile::Allow),
    ("privileged", AccessProfile::Allow),
];

/// Coarse enforcement mode read by the hooks under the `perm` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessProfile {
    /// bpf() is allowed for everyone; the hooks only log.
    #[default]
    Allow,
    /// bpf() is allowed only for tasks in the initial pid namespace.
    Baseline,
    /// bpf() is denied for everyone.
    Restricted,
}

impl AccessProfile {
    /// Resolve a profile selector. Total: unknown input is `Allow`.
    pub fn from_selector(input: &str) -> Self {
        PROFILE_ALIASES
            .iter()
            .find(|(alias, _)| input.starts_with(alias))
            .map(|(_, profile)| *profile)
            .unwrap_or_default()
    }

    /// Value stored in the configuration map.
    pub const fn code(self) -> u32 {
        match self {
            AccessProfile::Allow => 1,
            AccessProfile::Baseline => 2,
            AccessProfile::Restricted => 3,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            AccessProfile::Allow => "allow",
            AccessProfile::Baseline => "baseline",
            AccessProfile::Restricted => "restricted",
        }
    }
}

impl std::fmt::Display for AccessProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
