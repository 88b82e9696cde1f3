//! Character-device table: routes identities to the instances serving them and runs the
//! process-visible file operations (`open`, `close`, `mmap`, `ioctl`).
//!
//! The table owns the identity allocator, since it is the sole issuer of the identities it routes.
//! Routing entries and sessions hold [HandleRef]s; the driver's instance table keeps the only
//! long-lived [Handle].

use crate::{
    error::Errno,
    identity::{DevId, IdentityAllocator},
    instance::DeviceInstance,
    mmap::{IoRemap, MapError, VmArea},
    session::{SessionId, SessionTable},
};
use alloc::collections::btree_map::BTreeMap;
use spin::RwLock;
use utils::handle::{Handle, HandleRef};

/// Operations a device node supports once opened.
pub trait FileOperations: Sync {
    /// Accept a new opener. No exclusivity is implied.
    fn open(&self) -> Result<(), FileError>;
    fn release(&self);
    fn mmap(&self, vma: &mut VmArea, mapper: &dyn IoRemap) -> Result<(), MapError>;
    fn ioctl(&self, cmd: u32, arg: usize) -> Result<usize, FileError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FileError {
    #[error("no device {0}")]
    NoDevice(DevId),
    #[error("unknown session")]
    BadSession,
    #[error("operation {cmd:#x} not supported on this device")]
    NotSupported { cmd: u32 },
}

impl FileError {
    pub fn errno(&self) -> Errno {
        match self {
            FileError::NoDevice(_) => Errno::ENXIO,
            FileError::BadSession => Errno::EBADF,
            FileError::NotSupported { .. } => Errno::ENOTTY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CdevError {
    #[error("device {0} already has a handler")]
    Busy(DevId),
}

impl CdevError {
    pub fn errno(&self) -> Errno {
        Errno::EBUSY
    }
}

pub struct CharDevices {
    ids: IdentityAllocator,
    cdevs: RwLock<BTreeMap<DevId, HandleRef<DeviceInstance>>>,
    sessions: SessionTable<DeviceInstance>,
}

impl Default for CharDevices {
    fn default() -> Self {
        CharDevices::new(IdentityAllocator::default())
    }
}

impl CharDevices {
    pub fn new(ids: IdentityAllocator) -> CharDevices {
        CharDevices {
            ids,
            cdevs: RwLock::new(BTreeMap::new()),
            sessions: SessionTable::new(),
        }
    }

    pub fn identities(&self) -> &IdentityAllocator {
        &self.ids
    }

    /// Route `id` to `target`.
    pub fn cdev_add(&self, id: DevId, target: HandleRef<DeviceInstance>) -> Result<(), CdevError> {
        let mut guard = self.cdevs.write();
        if guard.contains_key(&id) {
            return Err(CdevError::Busy(id));
        }
        guard.insert(id, target);
        Ok(())
    }

    pub fn cdev_del(&self, id: DevId) {
        if self.cdevs.write().remove(&id).is_none() {
            log::error!("Device {} has no handler to remove.", id);
        }
    }

    /// The instance serving `id`, if it is still alive.
    pub fn lookup(&self, id: DevId) -> Option<Handle<DeviceInstance>> {
        self.cdevs.read().get(&id)?.get_handle()
    }

    pub fn is_routed(&self, id: DevId) -> bool {
        self.cdevs.read().contains_key(&id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn session_target(&self, session: SessionId) -> Result<Option<Handle<DeviceInstance>>, FileError> {
        let target = self.sessions.get(session).ok_or(FileError::BadSession)?;
        Ok(target.get_handle())
    }

    /// Open the node of `id` and attach its instance to a new session.
    pub fn open(&self, id: DevId) -> Result<SessionId, FileError> {
        let instance = self.lookup(id).ok_or(FileError::NoDevice(id))?;
        instance.open()?;
        Ok(self.sessions.open(instance.create_ref()))
    }

    /// Close `session`. The instance keeps no per-session state.
    pub fn close(&self, session: SessionId) -> Result<(), FileError> {
        let target = self.session_target(session)?;
        self.sessions.close(session);
        if let Some(instance) = target {
            instance.release();
        }
        Ok(())
    }

    pub fn mmap(
        &self,
        session: SessionId,
        vma: &mut VmArea,
        mapper: &dyn IoRemap,
    ) -> Result<(), MapError> {
        let instance = self
            .session_target(session)
            .map_err(|_| MapError::BadSession)?
            .ok_or(MapError::NoDevice)?;
        instance.mmap(vma, mapper)
    }

    pub fn ioctl(&self, session: SessionId, cmd: u32, arg: usize) -> Result<usize, FileError> {
        let instance = self
            .session_target(session)?
            .ok_or(FileError::NotSupported { cmd })?;
        instance.ioctl(cmd, arg)
    }
}
