//! Region binder: turn one firmware description node into a [RegionSpec] and a display label.
//!
//! Resolution order:
//! 1. Memory resource 0 gives the physical span (`length = end - start + 1`).
//! 2. The default cache mode is [CacheMode::NonCached] for nodes compatible with the tester tag and
//!    [CacheMode::WriteCombine] otherwise.
//! 3. The `mem-type` property, when present, overrides the default. Unknown values fail the node.
//! 4. The `label` property names the node; without it the default label is used and a warning is
//!    logged.
//!
//! Nothing is allocated or registered here; a failed resolution leaves no trace.

use crate::{
    error::{Errno, ErrorKind},
    region::{CacheMode, PhysAddr, RegionSpec},
};
use alloc::boxed::Box;
use config::{COMPAT_TESTER, DEFAULT_LABEL, LABEL_PROPERTY, MEM_TYPE_PROPERTY, REG_PROPERTY};
use dt::{
    node::{DeviceTree, Node},
    prop::PropertyError,
};
use log::warn;

/// A memory resource with an inclusive end address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemResource {
    pub start: usize,
    pub end: usize,
}

/// View of a firmware description node, as consumed by [resolve].
pub trait FirmwareNode {
    /// Identifies the node in diagnostics and in the driver's instance table.
    fn path(&self) -> Box<str>;
    /// `Ok(None)` when the node declares no resource at `index`, `Err(_)` when its resources
    /// cannot be decoded.
    fn mem_resource(&self, index: usize) -> Result<Option<MemResource>, PropertyError>;
    fn is_compatible(&self, tag: &str) -> bool;
    /// `None` when the property is absent, `Some(Err(_))` when it is not a string.
    fn read_string(&self, name: &str) -> Option<Result<&str, PropertyError>>;
}

/// A [FirmwareNode] backed by a device-tree node.
#[derive(Clone, Copy)]
pub struct DtNode<'a> {
    tree: &'a DeviceTree,
    node: &'a Node,
}

impl<'a> DtNode<'a> {
    pub fn new(tree: &'a DeviceTree, node: &'a Node) -> DtNode<'a> {
        DtNode { tree, node }
    }

    pub fn node(&self) -> &'a Node {
        self.node
    }
}

impl FirmwareNode for DtNode<'_> {
    fn path(&self) -> Box<str> {
        self.tree.get_full_path(self.node)
    }

    fn mem_resource(&self, index: usize) -> Result<Option<MemResource>, PropertyError> {
        let ranges = match self.tree.get_reg_value(self.node) {
            Ok(ranges) => ranges,
            Err(PropertyError::PropNotFound) => return Ok(None),
            Err(err) => return Err(err),
        };
        Ok(ranges.get(index).map(|range| MemResource {
            start: *range.start(),
            end: *range.end(),
        }))
    }

    fn is_compatible(&self, tag: &str) -> bool {
        self.tree.is_compatible(self.node, tag)
    }

    fn read_string(&self, name: &str) -> Option<Result<&str, PropertyError>> {
        self.tree
            .get_property(self.node, name)
            .map(|prop| prop.value_as_str())
    }
}

/// Output of [resolve].
#[derive(Debug)]
pub struct ResolvedRegion {
    pub spec: RegionSpec,
    pub label: Box<str>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error("no memory resource")]
    MissingResource,
    #[error("invalid memory resource [{start:#x}, {end:#x}]")]
    InvalidResource { start: usize, end: usize },
    #[error("Invalid mem-type: {0}")]
    InvalidMemType(Box<str>),
    #[error("malformed property '{name}': {error:?}")]
    MalformedProperty {
        name: &'static str,
        error: PropertyError,
    },
}

impl BindError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BindError::MissingResource | BindError::InvalidResource { .. } => ErrorKind::Resource,
            BindError::InvalidMemType(_) | BindError::MalformedProperty { .. } => ErrorKind::Config,
        }
    }

    pub fn errno(&self) -> Errno {
        match self {
            BindError::MissingResource => Errno::ENODEV,
            BindError::InvalidResource { .. } => Errno::ERANGE,
            BindError::InvalidMemType(_) | BindError::MalformedProperty { .. } => Errno::EINVAL,
        }
    }
}

/// Resolve the region, cache mode and label of `node`.
pub fn resolve<N: FirmwareNode + ?Sized>(node: &N) -> Result<ResolvedRegion, BindError> {
    let res = node
        .mem_resource(0)
        .map_err(|error| BindError::MalformedProperty {
            name: REG_PROPERTY,
            error,
        })?
        .ok_or(BindError::MissingResource)?;
    let invalid = BindError::InvalidResource {
        start: res.start,
        end: res.end,
    };
    let length = res
        .end
        .checked_sub(res.start)
        .and_then(|span| span.checked_add(1))
        .ok_or_else(|| invalid.clone())?;

    let mut cache_mode = if node.is_compatible(COMPAT_TESTER) {
        CacheMode::NonCached
    } else {
        CacheMode::WriteCombine
    };
    if let Some(mem_type) = node.read_string(MEM_TYPE_PROPERTY) {
        let mem_type = mem_type.map_err(|error| BindError::MalformedProperty {
            name: MEM_TYPE_PROPERTY,
            error,
        })?;
        cache_mode = CacheMode::from_mem_type(mem_type)
            .ok_or_else(|| BindError::InvalidMemType(Box::from(mem_type)))?;
    }

    let spec = RegionSpec::new(PhysAddr::from(res.start), length, cache_mode).ok_or(invalid)?;

    let label: Box<str> = match node.read_string(LABEL_PROPERTY) {
        Some(Ok(label)) => Box::from(label),
        _ => {
            warn!("{}: No label, using default: {}", node.path(), DEFAULT_LABEL);
            Box::from(DEFAULT_LABEL)
        }
    };

    debug_ex!("{}: region {}, label '{}'.", node.path(), spec, label);
    Ok(ResolvedRegion {
        spec,
        label,
    })
}
