//! Configurations for the plmem driver.
//! The constants are generated at build time from `driver.json` at the workspace root.

#![no_std]
#![deny(missing_docs)]

/// Constants generated from `driver.json`.
#[allow(missing_docs)]
pub mod build_flags {
    include!(concat!(env!("OUT_DIR"), "/build_flags.rs"));
}

pub use build_flags::*;

/// Size of a page in bytes.
pub const PAGE_SIZE: usize = 1 << PAGE_WIDTH;

/// Compatible strings served by the driver, in match-table order.
pub const MATCH_TABLE: &[&str] = &[COMPAT_PLMEM, COMPAT_TESTER];
