//! Device identities and the allocator that issues them.
//!
//! An identity is a `major:minor` pair. Every device gets its own major from a bounded pool with
//! a single minor, so allocating an identity is allocating a major. Released majors are recycled
//! before fresh ones are handed out.

use crate::error::Errno;
use alloc::{collections::btree_set::BTreeSet, vec, vec::Vec};
use config::{DEV_MAJOR_BASE, DEV_MAJOR_COUNT, MINOR_BITS, MINORS_PER_DEVICE};
use core::fmt::{Debug, Display, Formatter};
use spin::Mutex;

/// A `major:minor` device identity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DevId {
    major: u32,
    minor: u32,
}

impl DevId {
    pub const MINOR_MASK: u32 = (1 << MINOR_BITS) - 1;

    pub const fn new(major: u32, minor: u32) -> DevId {
        DevId {
            major,
            minor: minor & Self::MINOR_MASK,
        }
    }

    pub const fn major(self) -> u32 {
        self.major
    }

    pub const fn minor(self) -> u32 {
        self.minor
    }
}

impl Debug for DevId {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{}:{}", self.major, self.minor))
    }
}

impl Display for DevId {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("no free device identity")]
    Exhausted,
    #[error("device identity {0} is not allocated")]
    NotAllocated(DevId),
}

impl IdentityError {
    pub fn errno(&self) -> Errno {
        match self {
            IdentityError::Exhausted => Errno::EBUSY,
            IdentityError::NotAllocated(_) => Errno::EINVAL,
        }
    }
}

struct MajorPool {
    base: u32,
    count: u32,
    current: u32,
    recycled: Vec<u32>,
    allocated: BTreeSet<u32>,
}

/// Bounded free-list allocator of device identities.
pub struct IdentityAllocator {
    pool: Mutex<MajorPool>,
}

impl Default for IdentityAllocator {
    fn default() -> Self {
        IdentityAllocator::new(DEV_MAJOR_BASE as u32, DEV_MAJOR_COUNT as u32)
    }
}

impl IdentityAllocator {
    /// An allocator handing out majors `base..base + count`.
    pub fn new(base: u32, count: u32) -> IdentityAllocator {
        IdentityAllocator {
            pool: Mutex::new(MajorPool {
                base,
                count,
                current: 0,
                recycled: vec![],
                allocated: BTreeSet::new(),
            }),
        }
    }

    /// Allocate the identity region of one device.
    pub fn alloc_region(&self) -> Result<DevId, IdentityError> {
        let mut pool = self.pool.lock();
        let major = match pool.recycled.pop() {
            Some(major) => major,
            None if pool.current < pool.count => {
                let major = pool.base + pool.current;
                pool.current += 1;
                major
            }
            None => return Err(IdentityError::Exhausted),
        };
        pool.allocated.insert(major);
        Ok(DevId::new(major, 0))
    }

    /// Return the region starting at `id` to the pool.
    pub fn release(&self, id: DevId) -> Result<(), IdentityError> {
        let mut pool = self.pool.lock();
        if id.minor() >= MINORS_PER_DEVICE as u32 || !pool.allocated.remove(&id.major()) {
            return Err(IdentityError::NotAllocated(id));
        }
        pool.recycled.push(id.major());
        Ok(())
    }

    pub fn is_allocated(&self, id: DevId) -> bool {
        self.pool.lock().allocated.contains(&id.major())
    }

    /// Number of identities currently handed out.
    pub fn outstanding(&self) -> usize {
        self.pool.lock().allocated.len()
    }
}
