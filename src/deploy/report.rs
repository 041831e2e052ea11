//! Terminal report of a run, printed as text or JSON

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::error::DeployError;
use super::pipeline::Deployment;
use crate::policy::AccessProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Active,
    AlreadyActive,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentReport {
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<AccessProfile>,
    pub blocked: Vec<&'static str>,
    /// Path to delete to reverse (or retry) the deployment
    pub root: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<&'static str>,
    pub message: String,
}

impl DeploymentReport {
    pub fn active(deployment: &Deployment) -> Self {
        let profile = deployment.config.profile;
        Self {
            outcome: Outcome::Active,
            profile: Some(profile),
            blocked: deployment.config.blocked.names(),
            root: deployment.root.clone(),
            failed_step: None,
            message: success_message(profile, &deployment.root),
        }
    }

    pub fn failed(error: &DeployError, root: &Path) -> Self {
        let outcome = if error.is_already_active() {
            Outcome::AlreadyActive
        } else {
            Outcome::Failed
        };
        Self {
            outcome,
            profile: None,
            blocked: Vec::new(),
            root: root.to_path_buf(),
            failed_step: (outcome == Outcome::Failed).then(|| error.step().as_str()),
            message: error.to_string(),
        }
    }
}

fn success_message(profile: AccessProfile, root: &Path) -> String {
    let root = root.display();
    match profile {
        AccessProfile::Restricted => format!(
            "success: profile: restricted - the bpf() syscall is now disabled - delete pinned file '{}' to re-enable",
            root
        ),
        AccessProfile::Baseline => format!(
            "success: profile: baseline - the bpf() syscall is now restricted only to initial pid namespace - delete pinned file '{}' to re-enable",
            root
        ),
        AccessProfile::Allow => format!(
            "success: profile: allow - the bpf() syscall is allowed - delete pinned file '{}' to disable access logging",
            root
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::{NamespaceIdentity, NamespaceSetup};
    use crate::policy::{BlockOperationSet, EnforcementConfiguration};

    fn deployment(profile: AccessProfile, blocked: BlockOperationSet) -> Deployment {
        Deployment {
            config: EnforcementConfiguration::new(profile, blocked),
            root: PathBuf::from("/sys/fs/bpf/bpflock/bpfrestrict"),
            namespace: NamespaceSetup::Created(NamespaceIdentity::default()),
            links: Vec::new(),
        }
    }

    #[test]
    fn test_active_report_json() {
        let report = DeploymentReport::active(&deployment(
            AccessProfile::Baseline,
            BlockOperationSet::PROG_LOAD,
        ));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"], "active");
        assert_eq!(json["profile"], "baseline");
        assert_eq!(json["blocked"], serde_json::json!(["prog_load"]));
        assert!(json.get("failed_step").is_none());
        assert!(report.message.contains("initial pid namespace"));
    }

    #[test]
    fn test_already_active_is_not_a_failed_step() {
        let root = Path::new("/sys/fs/bpf/bpflock/bpfrestrict");
        let err = DeployError::AlreadyActive {
            root: root.to_path_buf(),
        };
        let report = DeploymentReport::failed(&err, root);
        assert_eq!(report.outcome, Outcome::AlreadyActive);
        assert_eq!(report.failed_step, None);
        assert!(report.message.contains("already loaded"));
    }

    #[test]
    fn test_restricted_message_names_root() {
        let report = DeploymentReport::active(&deployment(
            AccessProfile::Restricted,
            BlockOperationSet::empty(),
        ));
        assert!(report.message.contains("now disabled"));
        assert!(report.message.contains("/sys/fs/bpf/bpflock/bpfrestrict"));
    }
}
