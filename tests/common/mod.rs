//! Recording HookLoader used by the pipeline tests
//!
//! Pins are simulated with plain files under a temp dir so the guard sees
//! the same on-disk state a real bpffs would show. The namespace pin holds
//! "inode:device" so a later loader can read it back.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bpflock::deploy::{HookLoader, HookProgram, LoaderError, NamespaceIdentity};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Open,
    Load,
    WriteConfig(u32, u32),
    ReadNamespace(PathBuf),
    WriteNamespace(NamespaceIdentity),
    PinNamespace(PathBuf),
    PinBase(PathBuf),
    Attach(&'static str),
    PinLink(usize, PathBuf),
    DestroyLink(usize),
    PinCommit(PathBuf),
}

/// Where the mock should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Open,
    OpenUnsupported,
    LoadRejected,
    WriteConfig,
    WriteNamespace,
    PinNamespace,
    PinBase,
    Attach(usize),
    PinLink(usize),
    Commit,
}

#[derive(Debug, Default)]
pub struct RecordingLoader {
    pub calls: Vec<Call>,
    pub config: BTreeMap<u32, u32>,
    pub namespace: Option<NamespaceIdentity>,
    pub fail: Option<FailAt>,
    next_link: usize,
    attach_index: usize,
}

impl RecordingLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(fail: FailAt) -> Self {
        Self {
            fail: Some(fail),
            ..Self::default()
        }
    }

    pub fn attach_calls(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Attach(_)))
            .count()
    }

    pub fn destroyed(&self) -> Vec<usize> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::DestroyLink(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.calls.iter().position(pred)
    }

    fn pin_file(path: &Path, contents: &str) -> Result<(), LoaderError> {
        if path.exists() {
            return Err(LoaderError::Pin(format!("{} exists", path.display())));
        }
        fs::write(path, contents)?;
        Ok(())
    }
}

impl HookLoader for RecordingLoader {
    type Link = usize;

    fn open(&mut self) -> Result<(), LoaderError> {
        self.calls.push(Call::Open);
        match self.fail {
            Some(FailAt::Open) => Err(LoaderError::Object("truncated ELF".into())),
            Some(FailAt::OpenUnsupported) => Err(LoaderError::Unsupported("no BTF".into())),
            _ => Ok(()),
        }
    }

    fn load(&mut self) -> Result<(), LoaderError> {
        self.calls.push(Call::Load);
        match self.fail {
            Some(FailAt::LoadRejected) => Err(LoaderError::Rejected("invalid mem access".into())),
            _ => Ok(()),
        }
    }

    fn write_config(&mut self, key: u32, value: u32) -> Result<(), LoaderError> {
        self.calls.push(Call::WriteConfig(key, value));
        if self.fail == Some(FailAt::WriteConfig) {
            return Err(LoaderError::Map("E2BIG".into()));
        }
        self.config.insert(key, value);
        Ok(())
    }

    fn read_pinned_namespace(
        &mut self,
        path: &Path,
    ) -> Result<Option<NamespaceIdentity>, LoaderError> {
        self.calls.push(Call::ReadNamespace(path.to_path_buf()));
        let text = fs::read_to_string(path)?;
        let (inode, device) = text
            .trim()
            .split_once(':')
            .ok_or_else(|| LoaderError::Map("not a namespace map".into()))?;
        let parse = |s: &str| {
            s.parse::<u64>()
                .map_err(|e| LoaderError::Map(e.to_string()))
        };
        Ok(Some(NamespaceIdentity {
            inode: parse(inode)?,
            device: parse(device)?,
        }))
    }

    fn write_namespace(&mut self, identity: NamespaceIdentity) -> Result<(), LoaderError> {
        self.calls.push(Call::WriteNamespace(identity));
        if self.fail == Some(FailAt::WriteNamespace) {
            return Err(LoaderError::Map("EFAULT".into()));
        }
        self.namespace = Some(identity);
        Ok(())
    }

    fn pin_namespace(&mut self, path: &Path) -> Result<(), LoaderError> {
        self.calls.push(Call::PinNamespace(path.to_path_buf()));
        if self.fail == Some(FailAt::PinNamespace) {
            return Err(LoaderError::Pin("EACCES".into()));
        }
        let identity = self.namespace.unwrap_or_default();
        Self::pin_file(path, &format!("{}:{}", identity.inode, identity.device))
    }

    fn pin_base(&mut self, path: &Path) -> Result<(), LoaderError> {
        self.calls.push(Call::PinBase(path.to_path_buf()));
        if self.fail == Some(FailAt::PinBase) {
            return Err(LoaderError::Pin("EPERM".into()));
        }
        Self::pin_file(path, "")
    }

    fn attach(&mut self, program: &HookProgram) -> Result<Self::Link, LoaderError> {
        self.calls.push(Call::Attach(program.name));
        let index = self.attach_index;
        self.attach_index += 1;
        if self.fail == Some(FailAt::Attach(index)) {
            return Err(LoaderError::Attach("EINVAL".into()));
        }
        let id = self.next_link;
        self.next_link += 1;
        Ok(id)
    }

    fn pin_link(&mut self, link: &mut Self::Link, path: &Path) -> Result<(), LoaderError> {
        self.calls.push(Call::PinLink(*link, path.to_path_buf()));
        if self.fail == Some(FailAt::PinLink(*link)) {
            return Err(LoaderError::Pin("ENOSPC".into()));
        }
        Self::pin_file(path, "")
    }

    fn destroy_link(&mut self, link: Self::Link) {
        self.calls.push(Call::DestroyLink(link));
    }

    fn pin_commit_marker(&mut self, path: &Path) -> Result<(), LoaderError> {
        self.calls.push(Call::PinCommit(path.to_path_buf()));
        if self.fail == Some(FailAt::Commit) {
            return Err(LoaderError::Pin("EROFS".into()));
        }
        Self::pin_file(path, "")
    }
}

pub const INIT_NS: NamespaceIdentity = NamespaceIdentity {
    inode: 4026531836,
    device: 4,
};

pub const OTHER_NS: NamespaceIdentity = NamespaceIdentity {
    inode: 4026532999,
    device: 4,
};

pub fn init_ns() -> io::Result<NamespaceIdentity> {
    Ok(INIT_NS)
}

pub fn other_ns() -> io::Result<NamespaceIdentity> {
    Ok(OTHER_NS)
}

pub fn unreadable_ns() -> io::Result<NamespaceIdentity> {
    Err(io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"))
}
