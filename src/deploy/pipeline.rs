//! Deployment pipeline
//!
//! ```text
//! Unloaded ─► Opened ─► Loaded ─► Configured ─► NamespaceReady ─► BasePinned
//!                                                                     │
//!            Active ◄── commit marker ◄── Attaching(n-1) ◄ … ◄ Attaching(0)
//!
//! any step fails ─► Failed(step)
//! ```
//!
//! Steps run strictly in order and are never retried. The configuration map
//! is complete before the first attach. On failure every link handle created
//! by this run is destroyed in reverse order; pins already on the bpffs stay
//! for the operator to inspect. Without the commit marker the guard reports
//! such leftovers as a partial deployment.

use std::fs;
use std::io;
use std::path::PathBuf;

use super::error::{DeployError, Step};
use super::layout::DeploymentLayout;
use super::loader::{HookLoader, HookProgram, LoaderError, HOOK_PROGRAMS};
use super::namespace::{self, NamespaceIdentity, NamespaceSetup};
use super::store;
use crate::metrics;
use crate::policy::EnforcementConfiguration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Unloaded,
    Opened,
    Loaded,
    Configured,
    NamespaceReady,
    BasePinned,
    /// Programs `0..i` are attached and pinned
    Attaching(usize),
    Active,
    Failed(Step),
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub config: EnforcementConfiguration,
    pub root: PathBuf,
    pub namespace: NamespaceSetup,
    pub links: Vec<PathBuf>,
}

pub struct DeploymentPipeline<'a, L: HookLoader> {
    loader: &'a mut L,
    layout: &'a DeploymentLayout,
    capture_namespace: fn() -> io::Result<NamespaceIdentity>,
    state: PipelineState,
    links: Vec<L::Link>,
}

impl<'a, L: HookLoader> DeploymentPipeline<'a, L> {
    pub fn new(loader: &'a mut L, layout: &'a DeploymentLayout) -> Self {
        Self {
            loader,
            layout,
            capture_namespace: NamespaceIdentity::current,
            state: PipelineState::Unloaded,
            links: Vec::new(),
        }
    }

    /// Replace the source of the namespace identity captured on first use.
    pub fn with_namespace_source(mut self, capture: fn() -> io::Result<NamespaceIdentity>) -> Self {
        self.capture_namespace = capture;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Run every step. A pipeline runs at most once.
    pub fn run(&mut self, config: &EnforcementConfiguration) -> Result<Deployment, DeployError> {
        if self.state != PipelineState::Unloaded {
            return Err(DeployError::ResourceUnavailable {
                step: Step::Open,
                reason: format!("pipeline already ran (state {:?})", self.state),
            });
        }

        match self.advance(config) {
            Ok(deployment) => {
                self.state = PipelineState::Active;
                // ownership of every link now lies with its pin
                self.links.clear();
                tracing::info!(
                    profile = %config.profile,
                    root = %deployment.root.display(),
                    "deployment active"
                );
                Ok(deployment)
            }
            Err(e) => {
                metrics::record_step(e.step(), false);
                self.state = PipelineState::Failed(e.step());
                tracing::error!(step = %e.step(), error = %e, "deployment failed");
                self.rollback();
                Err(e)
            }
        }
    }

    fn advance(&mut self, config: &EnforcementConfiguration) -> Result<Deployment, DeployError> {
        self.loader
            .open()
            .map_err(|e| DeployError::from_load(Step::Open, e))?;
        self.enter(Step::Open, PipelineState::Opened);

        self.loader
            .load()
            .map_err(|e| DeployError::from_load(Step::Load, e))?;
        self.enter(Step::Load, PipelineState::Loaded);

        store::write_configuration(&mut *self.loader, config)?;
        self.enter(Step::Configure, PipelineState::Configured);

        let namespace = namespace::ensure_namespace_ready(
            &mut *self.loader,
            self.layout,
            self.capture_namespace,
        )?;
        self.enter(Step::Namespace, PipelineState::NamespaceReady);

        self.pin_base()?;
        self.enter(Step::PinBase, PipelineState::BasePinned);

        // same table the loader loaded from
        let mut links = Vec::with_capacity(HOOK_PROGRAMS.len());
        for (index, program) in HOOK_PROGRAMS.iter().enumerate() {
            self.state = PipelineState::Attaching(index);
            links.push(self.attach_and_pin(index, program)?);
        }

        let marker = self.layout.commit_marker();
        self.loader
            .pin_commit_marker(&marker)
            .map_err(|source| pin_failure(Step::Commit, marker, source))?;
        metrics::record_step(Step::Commit, true);

        Ok(Deployment {
            config: *config,
            root: self.layout.root().to_path_buf(),
            namespace,
            links,
        })
    }

    fn pin_base(&mut self) -> Result<(), DeployError> {
        let root = self.layout.root();
        fs::create_dir_all(root).map_err(|e| {
            pin_failure(Step::PinBase, root.to_path_buf(), LoaderError::Io(e))
        })?;

        let path = self.layout.config_store_pin();
        self.loader
            .pin_base(&path)
            .map_err(|source| pin_failure(Step::PinBase, path, source))
    }

    fn attach_and_pin(
        &mut self,
        index: usize,
        program: &HookProgram,
    ) -> Result<PathBuf, DeployError> {
        let link = self
            .loader
            .attach(program)
            .map_err(|source| DeployError::AttachFailure {
                program: program.name,
                index,
                source,
            })?;
        // tracked before pinning so a pin failure still tears it down
        self.links.push(link);
        metrics::record_step(Step::Attach, true);

        let path = self.layout.link_pin(program);
        if let Some(link) = self.links.last_mut() {
            self.loader
                .pin_link(link, &path)
                .map_err(|source| pin_failure(Step::PinLink, path.clone(), source))?;
        }
        metrics::record_step(Step::PinLink, true);

        tracing::info!(program = program.name, hook = program.hook, link = %path.display(), "program attached");
        Ok(path)
    }

    fn enter(&mut self, step: Step, state: PipelineState) {
        metrics::record_step(step, true);
        tracing::debug!(%step, ?state, "step finished");
        self.state = state;
    }

    fn rollback(&mut self) {
        while let Some(link) = self.links.pop() {
            self.loader.destroy_link(link);
        }
        if self.state_left_pins() {
            tracing::warn!(
                root = %self.layout.root().display(),
                "pinned state left behind, remove it before running again"
            );
        }
    }

    fn state_left_pins(&self) -> bool {
        self.layout.root().symlink_metadata().is_ok()
    }
}

fn pin_failure(step: Step, path: PathBuf, source: LoaderError) -> DeployError {
    DeployError::PinFailure { step, path, source }
}
