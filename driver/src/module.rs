//! Module bootstrap and the plmem driver itself.
//!
//! [PlmemModule::init] creates the device class before anything can be probed; if that fails the
//! module is not loaded at all. Each successful probe stores the only long-lived [Handle] of its
//! instance, keyed by the firmware path of the node. [PlmemModule::exit] destroys every instance
//! and only then tears the class down.

use crate::{
    binder::{resolve, DtNode, FirmwareNode},
    chrdev::CharDevices,
    class::{ClassRegistry, NodeError, NodeRegistry},
    driver::{Driver, ProbeError, RemoveError},
    identity::{DevId, IdentityAllocator},
    instance::DeviceInstance,
};
use alloc::{boxed::Box, collections::btree_map::BTreeMap, vec::Vec};
use config::{CLASS_NAME, DRIVER_NAME, MATCH_TABLE};
use dt::node::DeviceTree;
use log::{error, info};
use spin::RwLock;
use utils::handle::Handle;

/// Result of probing one node during [PlmemModule::probe_tree].
#[derive(Debug)]
pub struct ProbeOutcome {
    pub path: Box<str>,
    pub result: Result<DevId, ProbeError>,
}

pub struct PlmemModule<R: NodeRegistry> {
    class: ClassRegistry<R>,
    chrdev: CharDevices,
    instances: RwLock<BTreeMap<Box<str>, Handle<DeviceInstance>>>,
}

impl<R: NodeRegistry> PlmemModule<R> {
    /// Load the module with the configured identity range.
    pub fn init(backend: R) -> Result<PlmemModule<R>, NodeError> {
        Self::with_identities(backend, IdentityAllocator::default())
    }

    pub fn with_identities(
        backend: R,
        ids: IdentityAllocator,
    ) -> Result<PlmemModule<R>, NodeError> {
        let class = ClassRegistry::create(CLASS_NAME, backend).map_err(|err| {
            error!("Failed to create device class '{}': {}", CLASS_NAME, err);
            err
        })?;
        debug_ex!("Registered driver '{}'.", DRIVER_NAME);
        Ok(PlmemModule {
            class,
            chrdev: CharDevices::new(ids),
            instances: RwLock::new(BTreeMap::new()),
        })
    }

    pub fn class(&self) -> &ClassRegistry<R> {
        &self.class
    }

    /// Character-device table serving the published nodes.
    pub fn files(&self) -> &CharDevices {
        &self.chrdev
    }

    /// Instance bound to the firmware node at `path`.
    pub fn instance(&self, path: &str) -> Option<Handle<DeviceInstance>> {
        self.instances.read().get(path).cloned()
    }

    /// Firmware paths of the bound nodes, sorted.
    pub fn bound(&self) -> Vec<Box<str>> {
        self.instances.read().keys().cloned().collect()
    }

    /// Probe every node of `tree` matching the driver's compatible strings.
    ///
    /// Nodes are independent: a node that fails is reported in its outcome and the walk moves on.
    pub fn probe_tree(&self, tree: &DeviceTree) -> Vec<ProbeOutcome> {
        tree.find_compatible(MATCH_TABLE)
            .map(|node| {
                let node = DtNode::new(tree, node);
                ProbeOutcome {
                    path: node.path(),
                    result: self.probe(&node),
                }
            })
            .collect()
    }

    /// Unload the module and hand the node registry back.
    pub fn exit(self) -> R {
        let instances = core::mem::take(&mut *self.instances.write());
        for (path, instance) in instances {
            if let Err(err) = instance.destroy(&self.chrdev, &self.class) {
                error!("{}: {}", path, err);
            }
        }
        self.class.destroy()
    }
}

impl<R: NodeRegistry> Driver for PlmemModule<R> {
    fn get_name(&self) -> &'static str {
        DRIVER_NAME
    }

    fn get_comp_strs(&self) -> &'static [&'static str] {
        MATCH_TABLE
    }

    fn probe(&self, node: &dyn FirmwareNode) -> Result<DevId, ProbeError> {
        let path = node.path();
        let mut instances = self.instances.write();
        if instances.contains_key(&path) {
            return Err(ProbeError::AlreadyBound(path));
        }
        let published = resolve(node).map_err(ProbeError::from).and_then(|region| {
            DeviceInstance::publish(region.spec, &region.label, &self.chrdev, &self.class)
                .map_err(ProbeError::from)
        });
        match published {
            Ok(instance) => {
                let id = instance.identity();
                info!(
                    "{}: {} mapped as '{}' ({}).",
                    path,
                    instance.spec(),
                    instance.label(),
                    id
                );
                instances.insert(path, instance);
                Ok(id)
            }
            Err(err) => {
                error!("{}: probe failed: {}", path, err);
                Err(err)
            }
        }
    }

    fn remove(&self, path: &str) -> Result<(), RemoveError> {
        let instance = self
            .instances
            .write()
            .remove(path)
            .ok_or_else(|| RemoveError::NotBound(Box::from(path)))?;
        instance.destroy(&self.chrdev, &self.class)?;
        debug_ex!("{}: removed.", path);
        Ok(())
    }
}
