//! In-memory device tree model.
//!
//! A [node::DeviceTree] is a flat arena of [node::Node]s linked by index. Trees are either produced
//! by firmware loaders or assembled with [builder::DeviceTreeBuilder].

#![no_std]
extern crate alloc;

pub mod builder;
pub mod node;
pub mod prop;
