//! Region description produced by the binder and owned by one device instance.

use core::fmt::{Display, Formatter};
use utils::{impl_basic, impl_hex_fmt};

/// A physical address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PhysAddr {
    inner: usize,
}
impl_basic!(PhysAddr, usize);
impl_hex_fmt!(PhysAddr);

/// Page-attribute policy applied when the region is mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// Every access goes to the device.
    NonCached,
    /// Writes are buffered and merged, reads are not cached.
    WriteCombine,
    /// Ordinary cached memory.
    Cached,
}

impl CacheMode {
    /// Parse a `mem-type` property value. Unknown values yield `None`; there is no fallback.
    pub fn from_mem_type(value: &str) -> Option<CacheMode> {
        match value {
            "writecombine" => Some(CacheMode::WriteCombine),
            "cached" => Some(CacheMode::Cached),
            "noncached" => Some(CacheMode::NonCached),
            _ => None,
        }
    }

    /// The `mem-type` spelling of this mode.
    pub fn as_mem_type(self) -> &'static str {
        match self {
            CacheMode::NonCached => "noncached",
            CacheMode::WriteCombine => "writecombine",
            CacheMode::Cached => "cached",
        }
    }
}

impl Display for CacheMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_mem_type())
    }
}

/// Physical span and cache policy of one device. Immutable once created.
#[derive(Debug, PartialEq, Eq)]
pub struct RegionSpec {
    base: PhysAddr,
    length: usize,
    cache_mode: CacheMode,
}

impl RegionSpec {
    /// Return `None` unless `base` is non-zero, `length` is non-zero and the span does not wrap.
    pub fn new(base: PhysAddr, length: usize, cache_mode: CacheMode) -> Option<RegionSpec> {
        if *base == 0 || length == 0 {
            return None;
        }
        base.checked_add(length - 1)?;
        Some(RegionSpec {
            base,
            length,
            cache_mode,
        })
    }

    pub fn base(&self) -> PhysAddr {
        self.base
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn cache_mode(&self) -> CacheMode {
        self.cache_mode
    }

    /// Last byte address of the region.
    pub fn last(&self) -> PhysAddr {
        PhysAddr::from(*self.base + (self.length - 1))
    }
}

impl Display for RegionSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!(
            "[{:#x}, {:#x}] ({} bytes, {})",
            *self.base,
            *self.last(),
            self.length,
            self.cache_mode
        ))
    }
}
