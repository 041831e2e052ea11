//! Loader settings
//!
//! Values come from, lowest priority first: built-in defaults, `BPFLOCK_*`
//! environment variables, command-line flags. The binary wires the last two
//! through clap's `env` support; this module owns the defaults and validation.

use std::path::{Component, Path, PathBuf};

use crate::deploy::DeploymentLayout;

/// Default mount point of the BPF filesystem
pub const DEFAULT_BPFFS: &str = "/sys/fs/bpf";

/// Default directory under the bpffs shared by all bpflock tools
pub const DEFAULT_PIN_PREFIX: &str = "bpflock";

/// Default location of the pre-built hook object
pub const DEFAULT_OBJECT_PATH: &str = "/usr/lib/bpflock/bpf/bpfrestrict.bpf.o";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("bpffs root '{}' must be an absolute path", .0.display())]
    RelativeBpffs(PathBuf),
    #[error("pin prefix '{0}' must be a single path component")]
    InvalidPrefix(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Mount point of the BPF filesystem
    pub bpffs: PathBuf,
    /// Directory under `bpffs` holding every bpflock pin
    pub prefix: String,
    /// Compiled hook object handed to the loader backend
    pub object: PathBuf,
    /// Optional node-exporter textfile written at exit
    pub metrics_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bpffs: PathBuf::from(DEFAULT_BPFFS),
            prefix: DEFAULT_PIN_PREFIX.to_string(),
            object: PathBuf::from(DEFAULT_OBJECT_PATH),
            metrics_file: None,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.bpffs.is_absolute() {
            return Err(ConfigError::RelativeBpffs(self.bpffs.clone()));
        }
        let mut components = Path::new(&self.prefix).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(()),
            _ => Err(ConfigError::InvalidPrefix(self.prefix.clone())),
        }
    }

    /// Pin paths derived from these settings.
    pub fn layout(&self) -> DeploymentLayout {
        DeploymentLayout::new(self.bpffs.join(&self.prefix))
    }
}
