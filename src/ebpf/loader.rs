//! aya implementation of [`HookLoader`]
//!
//! The bpfrestrict object carries three LSM programs and two hash maps:
//!
//! ```text
//! bpfrestrict_map     u32 → u32                  perm / op configuration
//! bpfrestrict_ns_map  u32 → NamespaceIdentity    initial pid namespace (key 0)
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use aya::maps::{HashMap, Map, MapData, MapError};
use aya::programs::links::{FdLink, PinnedLink};
use aya::programs::{Lsm, ProgramError};
use aya::{Bpf, Btf};

use crate::deploy::{
    HookLoader, HookProgram, LoaderError, NamespaceIdentity, CONFIG_MAP_NAME, HOOK_PROGRAMS,
};

/// Namespace map inside the object
const NS_MAP_NAME: &str = "bpfrestrict_ns_map";

/// Slot of the identity in the namespace map
const NS_KEY: u32 = 0;

// Required for HashMap values
unsafe impl aya::Pod for NamespaceIdentity {}

/// Link handle as it moves through attach and pin.
pub enum LsmHookLink {
    Attached(FdLink),
    Pinned(PinnedLink),
    Released,
}

/// Loads the bpfrestrict object from disk and drives it through aya.
pub struct AyaLoader {
    object: PathBuf,
    bytes: Option<Vec<u8>>,
    btf: Option<Btf>,
    bpf: Option<Bpf>,
    base_pin: Option<PathBuf>,
}

impl AyaLoader {
    pub fn new(object: impl Into<PathBuf>) -> Self {
        Self {
            object: object.into(),
            bytes: None,
            btf: None,
            bpf: None,
            base_pin: None,
        }
    }

    fn bpf_mut(&mut self) -> Result<&mut Bpf, LoaderError> {
        self.bpf
            .as_mut()
            .ok_or_else(|| LoaderError::Object("object not loaded".to_string()))
    }

    fn lsm_program<'b>(bpf: &'b mut Bpf, name: &str) -> Result<&'b mut Lsm, LoaderError> {
        bpf.program_mut(name)
            .ok_or_else(|| LoaderError::Object(format!("{} program not found", name)))?
            .try_into()
            .map_err(|e: ProgramError| LoaderError::Object(e.to_string()))
    }

    /// Remove a map from the object so it can be pinned by value.
    fn take_map_data(&mut self, name: &str) -> Result<MapData, LoaderError> {
        match self.bpf_mut()?.take_map(name) {
            Some(Map::HashMap(data)) => Ok(data),
            Some(_) => Err(LoaderError::Map(format!("{} is not a hash map", name))),
            None => Err(LoaderError::Map(format!("{} map not found", name))),
        }
    }
}

impl HookLoader for AyaLoader {
    type Link = LsmHookLink;

    fn open(&mut self) -> Result<(), LoaderError> {
        let bytes = fs::read(&self.object).map_err(|e| {
            LoaderError::Object(format!("cannot read {}: {}", self.object.display(), e))
        })?;
        let btf = Btf::from_sys_fs()
            .map_err(|e| LoaderError::Unsupported(format!("kernel BTF unavailable: {}", e)))?;

        tracing::debug!(object = %self.object.display(), size = bytes.len(), "object read");
        self.bytes = Some(bytes);
        self.btf = Some(btf);
        Ok(())
    }

    fn load(&mut self) -> Result<(), LoaderError> {
        let bytes = self
            .bytes
            .take()
            .ok_or_else(|| LoaderError::Object("object not opened".to_string()))?;
        let mut bpf = Bpf::load(&bytes).map_err(|e| LoaderError::Object(e.to_string()))?;

        let btf = self
            .btf
            .as_ref()
            .ok_or_else(|| LoaderError::Unsupported("kernel BTF unavailable".to_string()))?;

        for program in HOOK_PROGRAMS {
            Self::lsm_program(&mut bpf, program.name)?
                .load(program.hook, btf)
                .map_err(|e| match e {
                    ProgramError::LoadError { .. } => LoaderError::Rejected(e.to_string()),
                    other => LoaderError::Object(other.to_string()),
                })?;
        }

        self.bpf = Some(bpf);
        Ok(())
    }

    fn write_config(&mut self, key: u32, value: u32) -> Result<(), LoaderError> {
        let bpf = self.bpf_mut()?;
        let mut config: HashMap<_, u32, u32> = bpf
            .map_mut(CONFIG_MAP_NAME)
            .ok_or_else(|| LoaderError::Map(format!("{} map not found", CONFIG_MAP_NAME)))?
            .try_into()
            .map_err(|e: MapError| LoaderError::Map(e.to_string()))?;

        config
            .insert(key, value, 0)
            .map_err(|e| LoaderError::Map(e.to_string()))
    }

    fn read_pinned_namespace(
        &mut self,
        path: &Path,
    ) -> Result<Option<NamespaceIdentity>, LoaderError> {
        let data = MapData::from_pin(path).map_err(|e| LoaderError::Map(e.to_string()))?;
        let pinned: HashMap<_, u32, NamespaceIdentity> = HashMap::try_from(Map::HashMap(data))
            .map_err(|e: MapError| LoaderError::Map(e.to_string()))?;

        match pinned.get(&NS_KEY, 0) {
            Ok(identity) => Ok(Some(identity)),
            Err(MapError::KeyNotFound) => Ok(None),
            Err(e) => Err(LoaderError::Map(e.to_string())),
        }
    }

    fn write_namespace(&mut self, identity: NamespaceIdentity) -> Result<(), LoaderError> {
        let bpf = self.bpf_mut()?;
        let mut ns: HashMap<_, u32, NamespaceIdentity> = bpf
            .map_mut(NS_MAP_NAME)
            .ok_or_else(|| LoaderError::Map(format!("{} map not found", NS_MAP_NAME)))?
            .try_into()
            .map_err(|e: MapError| LoaderError::Map(e.to_string()))?;

        ns.insert(NS_KEY, identity, 0)
            .map_err(|e| LoaderError::Map(e.to_string()))
    }

    fn pin_namespace(&mut self, path: &Path) -> Result<(), LoaderError> {
        let data = self.take_map_data(NS_MAP_NAME)?;
        data.pin(path).map_err(|e| LoaderError::Pin(e.to_string()))
    }

    fn pin_base(&mut self, path: &Path) -> Result<(), LoaderError> {
        let data = self.take_map_data(CONFIG_MAP_NAME)?;
        data.pin(path).map_err(|e| LoaderError::Pin(e.to_string()))?;
        self.base_pin = Some(path.to_path_buf());
        Ok(())
    }

    fn attach(&mut self, program: &HookProgram) -> Result<Self::Link, LoaderError> {
        let lsm = Self::lsm_program(self.bpf_mut()?, program.name)?;
        let link_id = lsm
            .attach()
            .map_err(|e| LoaderError::Attach(e.to_string()))?;
        let link = lsm
            .take_link(link_id)
            .map_err(|e| LoaderError::Attach(e.to_string()))?;

        Ok(LsmHookLink::Attached(FdLink::from(link)))
    }

    fn pin_link(&mut self, link: &mut Self::Link, path: &Path) -> Result<(), LoaderError> {
        match std::mem::replace(link, LsmHookLink::Released) {
            LsmHookLink::Attached(fd_link) => {
                // on error aya drops the link, which detaches it
                let pinned = fd_link
                    .pin(path)
                    .map_err(|e| LoaderError::Pin(e.to_string()))?;
                *link = LsmHookLink::Pinned(pinned);
                Ok(())
            }
            other => {
                *link = other;
                Err(LoaderError::Pin("link is not in attached state".to_string()))
            }
        }
    }

    fn destroy_link(&mut self, link: Self::Link) {
        match link {
            LsmHookLink::Attached(fd_link) => {
                tracing::debug!("detaching unpinned link");
                drop(fd_link);
            }
            LsmHookLink::Pinned(pinned) => {
                // the pin keeps the program attached; only our handle goes
                tracing::debug!("releasing pinned link handle");
                drop(pinned);
            }
            LsmHookLink::Released => {}
        }
    }

    fn pin_commit_marker(&mut self, path: &Path) -> Result<(), LoaderError> {
        let base = self
            .base_pin
            .as_ref()
            .ok_or_else(|| LoaderError::Pin("configuration map is not pinned".to_string()))?;
        let data = MapData::from_pin(base).map_err(|e| LoaderError::Pin(e.to_string()))?;
        data.pin(path).map_err(|e| LoaderError::Pin(e.to_string()))
    }
}
