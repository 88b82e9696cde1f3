//! Mapping a region into a caller's address space.
//!
//! The driver only decides the page attribute. Populating the page tables is left to an
//! [IoRemap] collaborator, which either establishes the whole mapping or fails.

use crate::{
    error::{Errno, ErrorKind},
    instance::DeviceInstance,
    region::{CacheMode, PhysAddr},
};
use bitflags::bitflags;
use config::{PAGE_SIZE, PAGE_WIDTH};

bitflags! {
    /// Attribute bits of the page-table entries backing a mapping.
    pub struct PageAttr: u32 {
        const PRESENT       = 1 << 0;
        const READ          = 1 << 1;
        const WRITE         = 1 << 2;
        const EXEC          = 1 << 3;
        const USER          = 1 << 4;
        /// Caching disabled; every access reaches the device.
        const NO_CACHE      = 1 << 5;
        /// Write-through caching.
        const WRITE_THROUGH = 1 << 6;
        /// Uncached but with buffered, merged writes.
        const WRITE_COMBINE = 1 << 7;

        /// Bits selecting the memory type.
        const CACHE_MASK    = Self::NO_CACHE.bits | Self::WRITE_THROUGH.bits | Self::WRITE_COMBINE.bits;
    }
}

bitflags! {
    /// Properties of a virtual memory area.
    pub struct VmFlags: u32 {
        const READ       = 1 << 0;
        const WRITE      = 1 << 1;
        const EXEC       = 1 << 2;
        const SHARED     = 1 << 3;
        /// Memory-mapped I/O, set by the collaborator when it maps device memory.
        const IO         = 1 << 4;
        /// Pure page-frame mapping without struct-page backing.
        const PFNMAP     = 1 << 5;
        const DONTEXPAND = 1 << 6;
        const DONTDUMP   = 1 << 7;
    }
}

impl PageAttr {
    /// Default (fully cached) attribute for a user mapping with `flags`.
    pub fn for_vm_flags(flags: VmFlags) -> PageAttr {
        let mut attr = PageAttr::PRESENT | PageAttr::USER;
        attr.set(PageAttr::READ, flags.contains(VmFlags::READ));
        attr.set(PageAttr::WRITE, flags.contains(VmFlags::WRITE));
        attr.set(PageAttr::EXEC, flags.contains(VmFlags::EXEC));
        attr
    }

    pub fn noncached(self) -> PageAttr {
        (self - PageAttr::CACHE_MASK) | PageAttr::NO_CACHE
    }

    pub fn writecombine(self) -> PageAttr {
        (self - PageAttr::CACHE_MASK) | PageAttr::WRITE_COMBINE
    }

    /// The memory type encoded in the attribute.
    pub fn cache_mode(self) -> CacheMode {
        if self.contains(PageAttr::NO_CACHE) {
            CacheMode::NonCached
        } else if self.contains(PageAttr::WRITE_COMBINE) {
            CacheMode::WriteCombine
        } else {
            CacheMode::Cached
        }
    }
}

impl CacheMode {
    /// Adjust `attr` for this mode; [CacheMode::Cached] leaves it untouched.
    pub fn apply(self, attr: PageAttr) -> PageAttr {
        match self {
            CacheMode::NonCached => attr.noncached(),
            CacheMode::WriteCombine => attr.writecombine(),
            CacheMode::Cached => attr,
        }
    }
}

/// Destination of a mapping: a range of the caller's address space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmArea {
    pub start: usize,
    pub end: usize,
    /// Offset into the region, in pages.
    pub pgoff: usize,
    pub flags: VmFlags,
    pub page_prot: PageAttr,
}

impl VmArea {
    pub fn new(start: usize, len: usize, pgoff: usize, flags: VmFlags) -> VmArea {
        VmArea {
            start,
            end: start.saturating_add(len),
            pgoff,
            flags,
            page_prot: PageAttr::for_vm_flags(flags),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Virtual-memory collaborator populating page tables for device memory.
pub trait IoRemap: Sync {
    /// Map `vma` onto the physical range `phys..phys + len` using `vma.page_prot`.
    fn remap_io(&self, vma: &mut VmArea, phys: PhysAddr, len: usize) -> Result<(), VmError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VmError {
    #[error("address {addr:#x} is not page aligned")]
    Misaligned { addr: usize },
    #[error("mapping does not fit the region")]
    OutOfRange,
    #[error("mapping overlaps an existing one")]
    Overlap,
    #[error("permission denied")]
    PermissionDenied,
}

impl VmError {
    pub fn errno(&self) -> Errno {
        match self {
            VmError::Misaligned { .. } | VmError::OutOfRange => Errno::EINVAL,
            VmError::Overlap => Errno::EEXIST,
            VmError::PermissionDenied => Errno::EPERM,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("unknown session")]
    BadSession,
    #[error("device is gone")]
    NoDevice,
    #[error(transparent)]
    Vm(#[from] VmError),
}

impl MapError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Map
    }

    pub fn errno(&self) -> Errno {
        match self {
            MapError::BadSession => Errno::EBADF,
            MapError::NoDevice => Errno::ENXIO,
            MapError::Vm(err) => err.errno(),
        }
    }
}

/// Page frames an io-remap of a region should install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoMapPlan {
    /// First page frame mapped at `vma.start`.
    pub pfn: usize,
    pub pages: usize,
}

/// Check `vma` against the region `phys..phys + len` and compute the frames to map.
///
/// The area must be page aligned, start `pgoff` pages into the region and not extend past its
/// last page.
pub fn iomap_plan(vma: &VmArea, phys: PhysAddr, len: usize) -> Result<IoMapPlan, VmError> {
    let phys = *phys;
    if len == 0 || phys.checked_add(len).is_none() {
        return Err(VmError::OutOfRange);
    }
    for addr in [vma.start, vma.end] {
        if addr % PAGE_SIZE != 0 {
            return Err(VmError::Misaligned { addr });
        }
    }
    if vma.end <= vma.start {
        return Err(VmError::OutOfRange);
    }
    let len = len + (phys & (PAGE_SIZE - 1));
    let pages = len.div_ceil(PAGE_SIZE);
    if vma.pgoff > pages {
        return Err(VmError::OutOfRange);
    }
    let vm_pages = vma.len() >> PAGE_WIDTH;
    if vm_pages > pages - vma.pgoff {
        return Err(VmError::OutOfRange);
    }
    Ok(IoMapPlan {
        pfn: (phys >> PAGE_WIDTH) + vma.pgoff,
        pages: vm_pages,
    })
}

impl DeviceInstance {
    /// Map the whole region into `vma` with the attribute selected by the cache mode.
    ///
    /// Every call redoes the attribute selection; nothing is cached between calls and a failure
    /// leaves the instance untouched.
    pub fn map(&self, vma: &mut VmArea, mapper: &dyn IoRemap) -> Result<(), MapError> {
        let spec = self.spec();
        vma.page_prot = spec.cache_mode().apply(vma.page_prot);
        mapper.remap_io(vma, spec.base(), spec.length())?;
        debug_ex!(
            "{}: mapped [{:#x}, {:#x}) as {}.",
            self.label(),
            vma.start,
            vma.end,
            spec.cache_mode()
        );
        Ok(())
    }
}
