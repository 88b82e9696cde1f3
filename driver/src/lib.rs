//! plmem: expose firmware-described physical memory regions (FPGA RAM, register windows) as
//! device nodes that processes map directly into their address space.
//!
//! The crate covers the device-instance lifecycle. Three collaborators are reached through traits:
//! - the firmware description, [binder::FirmwareNode];
//! - the node registry that makes nodes visible, [class::NodeRegistry];
//! - the virtual-memory subsystem that fills page tables, [mmap::IoRemap].
#![no_std]
extern crate alloc;

#[macro_use]
pub mod logging;

pub mod binder;
pub mod chrdev;
pub mod class;
pub mod driver;
pub mod error;
pub mod identity;
pub mod instance;
pub mod mmap;
pub mod module;
pub mod region;
pub mod session;

pub use binder::{resolve, BindError, FirmwareNode, ResolvedRegion};
pub use class::ClassRegistry;
pub use instance::DeviceInstance;
pub use module::PlmemModule;
pub use region::{CacheMode, RegionSpec};
