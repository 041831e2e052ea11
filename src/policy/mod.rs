//! Policy vocabulary for bpf() restriction
//!
//! The vocabulary is fixed: three profiles and four blockable operations.
//! [`resolve`] turns the raw `--profile` / `--block` strings into an
//! [`EnforcementConfiguration`], the only data handed to the hooks.
//!
//! ```text
//! --profile baseline ──► AccessProfile::Baseline ──► perm = 2
//! --block prog_load  ──► PROG_LOAD               ──► op   = 0b0010
//! ```

mod ops;
mod profile;

pub use ops::{BlockOperationSet, BLOCK_KEYWORDS};
pub use profile::AccessProfile;

/// Longest accepted `--profile` value in bytes.
pub const MAX_PROFILE_LEN: usize = 63;

/// Longest accepted `--block` value in bytes.
pub const MAX_BLOCK_LEN: usize = 127;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("invalid --{flag} argument: too long ({len} bytes, max {max})")]
    InputTooLong {
        flag: &'static str,
        len: usize,
        max: usize,
    },
}

/// Resolved policy, immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnforcementConfiguration {
    pub profile: AccessProfile,
    pub blocked: BlockOperationSet,
}

impl EnforcementConfiguration {
    pub fn new(profile: AccessProfile, blocked: BlockOperationSet) -> Self {
        Self { profile, blocked }
    }
}

/// Resolve the optional profile and block inputs.
///
/// Absent input yields the permissive defaults. Only over-long input fails.
pub fn resolve(
    profile: Option<&str>,
    block: Option<&str>,
) -> Result<EnforcementConfiguration, PolicyError> {
    let profile = match profile {
        Some(input) => {
            check_len("profile", input, MAX_PROFILE_LEN)?;
            AccessProfile::from_selector(input)
        }
        None => AccessProfile::default(),
    };

    let blocked = match block {
        Some(input) => {
            check_len("block", input, MAX_BLOCK_LEN)?;
            BlockOperationSet::from_keywords(input)
        }
        None => BlockOperationSet::empty(),
    };

    Ok(EnforcementConfiguration { profile, blocked })
}

fn check_len(flag: &'static str, input: &str, max: usize) -> Result<(), PolicyError> {
    if input.len() > max {
        return Err(PolicyError::InputTooLong {
            flag,
            len: input.len(),
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_absent_inputs() {
        let cfg = resolve(None, None).unwrap();
        assert_eq!(cfg.profile, AccessProfile::Allow);
        assert!(cfg.blocked.is_empty());
    }

    #[test]
    fn test_restricted_scenario() {
        let cfg = resolve(Some("restricted"), None).unwrap();
        assert_eq!(cfg.profile, AccessProfile::Restricted);
        assert!(cfg.blocked.is_empty());
    }

    #[test]
    fn test_baseline_with_blocks() {
        let cfg = resolve(Some("baseline"), Some("prog_load,bpf_write")).unwrap();
        assert_eq!(cfg.profile, AccessProfile::Baseline);
        assert_eq!(
            cfg.blocked,
            BlockOperationSet::PROG_LOAD | BlockOperationSet::BPF_WRITE
        );
    }

    #[test]
    fn test_length_bounds() {
        let ok = "a".repeat(MAX_PROFILE_LEN);
        assert!(resolve(Some(&ok), None).is_ok());

        let long = "restricted".to_string() + &"x".repeat(54);
        assert_eq!(long.len(), 64);
        assert_eq!(
            resolve(Some(&long), None),
            Err(PolicyError::InputTooLong {
                flag: "profile",
                len: 64,
                max: MAX_PROFILE_LEN
            })
        );

        assert!(resolve(None, Some(&"b".repeat(MAX_BLOCK_LEN))).is_ok());
        assert!(matches!(
            resolve(None, Some(&"b".repeat(MAX_BLOCK_LEN + 1))),
            Err(PolicyError::InputTooLong { flag: "block", .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_profile_resolution_is_total(input in "[ -~]{0,63}") {
            let first = resolve(Some(&input), None).unwrap();
            let second = resolve(Some(&input), None).unwrap();
            prop_assert_eq!(first, second);
            if !["restricted", "baseline"].iter().any(|p| input.starts_with(p)) {
                prop_assert_eq!(first.profile, AccessProfile::Allow);
            }
        }

        #[test]
        fn prop_block_set_equals_mentioned_subset(
            picks in proptest::collection::vec(0usize..4, 0..8),
            sep in "[ ,;|]",
        ) {
            let words: Vec<&str> = picks.iter().map(|i| BLOCK_KEYWORDS[*i].0).collect();
            let expected = picks
                .iter()
                .fold(BlockOperationSet::empty(), |set, i| set | BLOCK_KEYWORDS[*i].1);

            let cfg = resolve(None, Some(&words.join(sep.as_str()))).unwrap();
            prop_assert_eq!(cfg.blocked, expected);
        }
    }
}
