//! Assemble a [DeviceTree] in memory.
//!
//! Property values are encoded the way a flattened device tree stores them: cells as big-endian
//! 32-bit words and strings NUL-terminated.

use crate::{
    node::{DeviceTree, Node},
    prop::Property,
};
use alloc::{boxed::Box, vec, vec::Vec};
use utils::endian::BigEndian32;

pub struct DeviceTreeBuilder {
    nodes: Vec<Node>,
}

impl Default for DeviceTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceTreeBuilder {
    pub fn new() -> DeviceTreeBuilder {
        DeviceTreeBuilder {
            nodes: vec![Node {
                node_id: 0,
                parent_id: 0,
                full_name: Box::from(""),
                node_name: Box::from(""),
                unit_addr: Box::from(""),
                children: vec![],
                props: vec![],
            }],
        }
    }

    pub fn root(&self) -> usize {
        0
    }

    /// Add a child named `full_name` (`name@unit-address`) under `parent` and return its id.
    pub fn add_node(&mut self, parent: usize, full_name: &str) -> usize {
        let (node_name, unit_addr) = full_name.split_once('@').unwrap_or((full_name, ""));
        let node_id = self.nodes.len();
        self.nodes.push(Node {
            node_id,
            parent_id: parent,
            full_name: Box::from(full_name),
            node_name: Box::from(node_name),
            unit_addr: Box::from(unit_addr),
            children: vec![],
            props: vec![],
        });
        self.nodes[parent].children.push(node_id);
        node_id
    }

    pub fn prop_bytes(&mut self, node: usize, name: &str, data: &[u8]) -> &mut Self {
        self.nodes[node].props.push(Property::new(name, data));
        self
    }

    pub fn prop_u32(&mut self, node: usize, name: &str, value: u32) -> &mut Self {
        self.prop_cells(node, name, &[value])
    }

    pub fn prop_cells(&mut self, node: usize, name: &str, cells: &[u32]) -> &mut Self {
        let data: Vec<u8> = cells
            .iter()
            .flat_map(|cell| BigEndian32::new(*cell).to_bytes())
            .collect();
        self.prop_bytes(node, name, &data)
    }

    pub fn prop_str(&mut self, node: usize, name: &str, value: &str) -> &mut Self {
        self.prop_strlist(node, name, &[value])
    }

    pub fn prop_strlist(&mut self, node: usize, name: &str, values: &[&str]) -> &mut Self {
        let mut data = Vec::new();
        for value in values {
            data.extend_from_slice(value.as_bytes());
            data.push(0);
        }
        self.prop_bytes(node, name, &data)
    }

    pub fn build(self) -> DeviceTree {
        DeviceTree {
            root_id: 0,
            container: self.nodes,
        }
    }
}
