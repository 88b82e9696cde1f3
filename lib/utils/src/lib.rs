#![no_std]
extern crate alloc;

pub mod endian;
pub mod handle;
pub mod macros;
