//! Device class: the administrative namespace every published node lives under.
//!
//! A [ClassRegistry] is created once at module load and passed by reference to every publish
//! and destroy call. It records which identity carries which node name and forwards the actual
//! node creation to a [NodeRegistry] collaborator. It holds no region data.

use crate::{error::Errno, identity::DevId};
use alloc::{boxed::Box, collections::btree_map::BTreeMap, format, vec::Vec};
use config::DEV_DIR;
use spin::RwLock;

/// Node-registry collaborator: owns the filesystem-visible entries.
pub trait NodeRegistry: Send + Sync {
    fn register_class(&self, class: &str) -> Result<(), NodeError>;
    fn unregister_class(&self, class: &str);
    fn create(&self, class: &str, id: DevId, name: &str) -> Result<(), NodeError>;
    fn remove(&self, class: &str, id: DevId, name: &str);
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodeError {
    #[error("node registry unavailable")]
    Unavailable,
    #[error("node name '{0}' already exists")]
    NameCollision(Box<str>),
    #[error("out of memory")]
    NoMemory,
}

impl NodeError {
    pub fn errno(&self) -> Errno {
        match self {
            NodeError::Unavailable => Errno::ENODEV,
            NodeError::NameCollision(_) => Errno::EEXIST,
            NodeError::NoMemory => Errno::ENOMEM,
        }
    }
}

/// Proof that a node exists. Consumed by [ClassRegistry::destroy_node].
#[derive(Debug, PartialEq, Eq)]
pub struct NodeHandle {
    id: DevId,
    name: Box<str>,
}

impl NodeHandle {
    pub fn id(&self) -> DevId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

pub struct ClassRegistry<R: NodeRegistry> {
    name: &'static str,
    backend: R,
    nodes: RwLock<BTreeMap<DevId, Box<str>>>,
}

impl<R: NodeRegistry> ClassRegistry<R> {
    /// Register the class `name` with `backend`.
    pub fn create(name: &'static str, backend: R) -> Result<ClassRegistry<R>, NodeError> {
        backend.register_class(name)?;
        debug_ex!("Created device class '{}'.", name);
        Ok(ClassRegistry {
            name,
            backend,
            nodes: RwLock::new(BTreeMap::new()),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn backend(&self) -> &R {
        &self.backend
    }

    /// Publish a node named `name` for `id`.
    ///
    /// Nothing is recorded unless the backend succeeds.
    pub fn create_node(&self, id: DevId, name: &str) -> Result<NodeHandle, NodeError> {
        let mut guard = self.nodes.write();
        if guard.contains_key(&id) || guard.values().any(|node| node.as_ref() == name) {
            return Err(NodeError::NameCollision(Box::from(name)));
        }
        self.backend.create(self.name, id, name)?;
        guard.insert(id, Box::from(name));
        debug_ex!("\tCreated node '{}' ({}) in class '{}'.", name, id, self.name);
        Ok(NodeHandle {
            id,
            name: Box::from(name),
        })
    }

    pub fn destroy_node(&self, node: NodeHandle) {
        let mut guard = self.nodes.write();
        if guard.remove(&node.id).is_none() {
            log::error!("Node '{}' ({}) is not part of class '{}'.", node.name, node.id, self.name);
            return;
        }
        self.backend.remove(self.name, node.id, &node.name);
        debug_ex!("\tRemoved node '{}' ({}) from class '{}'.", node.name, node.id, self.name);
    }

    /// Published nodes, ordered by identity.
    pub fn nodes(&self) -> Vec<(DevId, Box<str>)> {
        self.nodes
            .read()
            .iter()
            .map(|(id, name)| (*id, name.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    /// Tear the class down and hand the backend back.
    ///
    /// Nodes still present are removed with a warning; every instance should have been destroyed
    /// before.
    pub fn destroy(self) -> R {
        for (id, name) in self.nodes.write().iter() {
            log::warn!("Node '{}' ({}) outlived class '{}'; removing.", name, id, self.name);
            self.backend.remove(self.name, *id, name);
        }
        self.backend.unregister_class(self.name);
        debug_ex!("Destroyed device class '{}'.", self.name);
        self.backend
    }
}

/// In-memory node registry exposing each node as `DEV_DIR/<name>`.
#[derive(Default)]
pub struct MemoryDevFs {
    classes: RwLock<Vec<Box<str>>>,
    entries: RwLock<BTreeMap<Box<str>, (DevId, Box<str>)>>,
}

impl MemoryDevFs {
    pub fn new() -> MemoryDevFs {
        MemoryDevFs::default()
    }

    pub fn path_of(name: &str) -> Box<str> {
        format!("{}/{}", DEV_DIR, name).into_boxed_str()
    }

    /// Identity of the node at `path`.
    pub fn lookup(&self, path: &str) -> Option<DevId> {
        self.entries.read().get(path).map(|(id, _)| *id)
    }

    /// Every visible path, sorted.
    pub fn paths(&self) -> Vec<Box<str>> {
        self.entries.read().keys().cloned().collect()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.read().iter().any(|name| name.as_ref() == class)
    }
}

impl NodeRegistry for MemoryDevFs {
    fn register_class(&self, class: &str) -> Result<(), NodeError> {
        let mut classes = self.classes.write();
        if classes.iter().any(|name| name.as_ref() == class) {
            return Err(NodeError::NameCollision(Box::from(class)));
        }
        classes.push(Box::from(class));
        Ok(())
    }

    fn unregister_class(&self, class: &str) {
        self.classes.write().retain(|name| name.as_ref() != class);
    }

    fn create(&self, class: &str, id: DevId, name: &str) -> Result<(), NodeError> {
        if !self.has_class(class) {
            return Err(NodeError::Unavailable);
        }
        let path = Self::path_of(name);
        let mut entries = self.entries.write();
        if entries.contains_key(&path) {
            return Err(NodeError::NameCollision(path));
        }
        entries.insert(path, (id, Box::from(class)));
        Ok(())
    }

    fn remove(&self, _class: &str, id: DevId, name: &str) {
        let path = Self::path_of(name);
        let mut entries = self.entries.write();
        if entries.get(&path).is_some_and(|(owner, _)| *owner == id) {
            entries.remove(&path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicBool, Ordering};

    /// Backend that can be told to refuse node creation.
    #[derive(Default)]
    struct Flaky {
        refuse: AtomicBool,
        fs: MemoryDevFs,
    }

    impl NodeRegistry for Flaky {
        fn register_class(&self, class: &str) -> Result<(), NodeError> {
            self.fs.register_class(class)
        }
        fn unregister_class(&self, class: &str) {
            self.fs.unregister_class(class)
        }
        fn create(&self, class: &str, id: DevId, name: &str) -> Result<(), NodeError> {
            if self.refuse.load(Ordering::SeqCst) {
                return Err(NodeError::NoMemory);
            }
            self.fs.create(class, id, name)
        }
        fn remove(&self, class: &str, id: DevId, name: &str) {
            self.fs.remove(class, id, name)
        }
    }

    #[test]
    fn nodes_appear_and_disappear_in_devfs() {
        let class = ClassRegistry::create("plmem", MemoryDevFs::new()).unwrap();
        let node = class.create_node(DevId::new(240, 0), "fpga0").unwrap();
        assert_eq!(node.name(), "fpga0");
        assert_eq!(class.backend().lookup("/dev/fpga0"), Some(DevId::new(240, 0)));
        assert_eq!(class.len(), 1);
        class.destroy_node(node);
        assert!(class.is_empty());
        assert!(class.backend().paths().is_empty());
        let fs = class.destroy();
        assert!(!fs.has_class("plmem"));
    }

    #[test]
    fn duplicate_names_collide() {
        let class = ClassRegistry::create("plmem", MemoryDevFs::new()).unwrap();
        let _first = class.create_node(DevId::new(240, 0), "plmem").unwrap();
        let err = class.create_node(DevId::new(241, 0), "plmem").unwrap_err();
        assert_eq!(err, NodeError::NameCollision(Box::from("plmem")));
        assert_eq!(err.errno(), Errno::EEXIST);
        assert_eq!(class.nodes(), [(DevId::new(240, 0), Box::<str>::from("plmem"))]);
    }

    #[test]
    fn class_names_are_unique_per_backend() {
        let fs = MemoryDevFs::new();
        fs.register_class("plmem").unwrap();
        assert!(ClassRegistry::create("plmem", fs).is_err());
    }

    #[test]
    fn backend_failure_records_nothing() {
        let class = ClassRegistry::create("plmem", Flaky::default()).unwrap();
        class.backend().refuse.store(true, Ordering::SeqCst);
        assert_eq!(
            class.create_node(DevId::new(240, 0), "fpga0"),
            Err(NodeError::NoMemory)
        );
        assert!(class.is_empty());
        assert!(class.backend().fs.paths().is_empty());
    }

    #[test]
    fn destroying_the_class_sweeps_leftover_nodes() {
        let class = ClassRegistry::create("plmem", MemoryDevFs::new()).unwrap();
        let _leaked = class.create_node(DevId::new(240, 0), "fpga0").unwrap();
        let fs = class.destroy();
        assert!(fs.paths().is_empty());
    }
}
