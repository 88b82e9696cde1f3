//! Error codes shared by every component.
//!
//! Each component has its own error enum; all of them map onto an [Errno] so that a framework
//! can report a distinct code per failure cause.

use num_enum::IntoPrimitive;

/// POSIX error numbers reported to the framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[repr(i32)]
pub enum Errno {
    EPERM = 1,
    ENXIO = 6,
    EBADF = 9,
    ENOMEM = 12,
    EBUSY = 16,
    EEXIST = 17,
    ENODEV = 19,
    EINVAL = 22,
    ENOTTY = 25,
    ERANGE = 34,
}

impl Errno {
    /// The negated value, as returned from kernel-style entry points.
    pub fn as_neg(self) -> i32 {
        -i32::from(self)
    }
}

/// Coarse classification of a failure, deciding who sees it and what it aborts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid firmware configuration; aborts the probe of one node.
    Config,
    /// Missing or exhausted resource; aborts the probe of one node.
    Resource,
    /// Node publication failed; aborts the probe of one node.
    Publish,
    /// Mapping request rejected; reported to the caller only.
    Map,
}
