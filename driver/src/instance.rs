//! Device instances and their publication lifecycle.
//!
//! ```text
//! Unpublished --publish--> Published --destroy--> Destroyed
//! ```
//!
//! Publication acquires, in order: an identity, a char-device route to the instance, a visible
//! node. A failure at any step releases what was acquired so far in reverse order, so a failed
//! publish leaves neither an identity nor a route nor a node behind. Destruction releases the same
//! three resources in reverse order.

use crate::{
    chrdev::{CdevError, CharDevices, FileError, FileOperations},
    class::{ClassRegistry, NodeError, NodeHandle, NodeRegistry},
    error::{Errno, ErrorKind},
    identity::{DevId, IdentityError},
    mmap::{IoRemap, MapError, VmArea},
    region::RegionSpec,
};
use alloc::boxed::Box;
use core::sync::atomic::{AtomicU8, Ordering};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use spin::Mutex;
use utils::handle::Handle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum NodeState {
    Unpublished,
    Published,
    Destroyed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    #[error("device identities exhausted")]
    IdentityExhausted,
    #[error(transparent)]
    Identity(IdentityError),
    #[error(transparent)]
    Route(#[from] CdevError),
    #[error("unable to create device node: {0}")]
    Node(#[from] NodeError),
}

impl From<IdentityError> for PublishError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Exhausted => PublishError::IdentityExhausted,
            err => PublishError::Identity(err),
        }
    }
}

impl PublishError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PublishError::IdentityExhausted | PublishError::Identity(_) => ErrorKind::Resource,
            PublishError::Route(_) | PublishError::Node(_) => ErrorKind::Publish,
        }
    }

    pub fn errno(&self) -> Errno {
        match self {
            PublishError::IdentityExhausted => Errno::EBUSY,
            PublishError::Identity(err) => err.errno(),
            PublishError::Route(err) => err.errno(),
            PublishError::Node(err) => err.errno(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("device {id} is {state:?}, expected {expected:?}")]
pub struct StateError {
    pub id: DevId,
    pub state: NodeState,
    pub expected: NodeState,
}

#[derive(Debug)]
pub struct DeviceInstance {
    spec: RegionSpec,
    label: Box<str>,
    identity: DevId,
    node: Mutex<Option<NodeHandle>>,
    state: AtomicU8,
}

impl DeviceInstance {
    /// Publish `spec` as a node named `label`.
    pub fn publish<R: NodeRegistry>(
        spec: RegionSpec,
        label: &str,
        chrdev: &CharDevices,
        class: &ClassRegistry<R>,
    ) -> Result<Handle<DeviceInstance>, PublishError> {
        let ids = chrdev.identities();
        let identity = ids.alloc_region()?;
        let instance = Handle::from(DeviceInstance {
            spec,
            label: Box::from(label),
            identity,
            node: Mutex::new(None),
            state: AtomicU8::new(NodeState::Unpublished.into()),
        });

        if let Err(err) = chrdev.cdev_add(identity, instance.create_ref()) {
            log::error!("cdev_add() failed for {}: {}", identity, err);
            instance.release_identity(chrdev);
            return Err(err.into());
        }

        match class.create_node(identity, label) {
            Ok(node) => *instance.node.lock() = Some(node),
            Err(err) => {
                log::error!("unable to create device {}: {}", label, err);
                chrdev.cdev_del(identity);
                instance.release_identity(chrdev);
                return Err(err.into());
            }
        }

        instance.set_state(NodeState::Published);
        debug_ex!("\tPublished '{}' as {}: {}.", label, identity, instance.spec);
        Ok(instance)
    }

    /// Remove the node, its route and its identity.
    ///
    /// Only a [NodeState::Published] instance can be destroyed; otherwise nothing changes.
    pub fn destroy<R: NodeRegistry>(
        &self,
        chrdev: &CharDevices,
        class: &ClassRegistry<R>,
    ) -> Result<(), StateError> {
        let state = self.state();
        if state != NodeState::Published {
            return Err(StateError {
                id: self.identity,
                state,
                expected: NodeState::Published,
            });
        }
        if let Some(node) = self.node.lock().take() {
            class.destroy_node(node);
        }
        chrdev.cdev_del(self.identity);
        self.release_identity(chrdev);
        self.set_state(NodeState::Destroyed);
        debug_ex!("\tDestroyed '{}' ({}).", self.label, self.identity);
        Ok(())
    }

    fn release_identity(&self, chrdev: &CharDevices) {
        if let Err(err) = chrdev.identities().release(self.identity) {
            log::error!("Releasing identity of '{}': {}", self.label, err);
        }
    }

    fn set_state(&self, state: NodeState) {
        self.state.store(state.into(), Ordering::Release);
    }

    pub fn state(&self) -> NodeState {
        NodeState::try_from(self.state.load(Ordering::Acquire)).unwrap_or(NodeState::Destroyed)
    }

    pub fn spec(&self) -> &RegionSpec {
        &self.spec
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn identity(&self) -> DevId {
        self.identity
    }
}

impl FileOperations for DeviceInstance {
    fn open(&self) -> Result<(), FileError> {
        if self.state() != NodeState::Published {
            return Err(FileError::NoDevice(self.identity));
        }
        Ok(())
    }

    fn release(&self) {}

    fn mmap(&self, vma: &mut VmArea, mapper: &dyn IoRemap) -> Result<(), MapError> {
        if self.state() != NodeState::Published {
            return Err(MapError::NoDevice);
        }
        self.map(vma, mapper)
    }

    fn ioctl(&self, cmd: u32, _arg: usize) -> Result<usize, FileError> {
        Err(FileError::NotSupported { cmd })
    }
}
