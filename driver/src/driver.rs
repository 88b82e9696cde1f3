//! Driver interface: match a firmware node by compatible string, then bind or unbind it.
//!
//! - [Driver::get_comp_strs] lists the compatible strings a driver accepts; [Driver::matches]
//!   checks a node against them.
//! - [Driver::probe] binds one node and returns the identity of the node it published.
//! - [Driver::remove] unbinds a previously probed node, addressed by its firmware path.

use crate::{
    binder::{BindError, FirmwareNode},
    error::{Errno, ErrorKind},
    identity::DevId,
    instance::{PublishError, StateError},
};
use alloc::boxed::Box;

pub trait Driver: Sync {
    fn get_name(&self) -> &'static str;
    fn get_comp_strs(&self) -> &'static [&'static str];
    fn probe(&self, node: &dyn FirmwareNode) -> Result<DevId, ProbeError>;
    fn remove(&self, path: &str) -> Result<(), RemoveError>;

    /// Whether `node` is compatible with any of [Driver::get_comp_strs].
    fn matches(&self, node: &dyn FirmwareNode) -> bool {
        self.get_comp_strs()
            .iter()
            .any(|comp| node.is_compatible(comp))
    }
}

// region: Error Types

/// Errors returned by [Driver::probe].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    /// The node does not describe a usable region.
    #[error(transparent)]
    Bind(#[from] BindError),
    /// The region could not be published.
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error("{0} is already bound")]
    AlreadyBound(Box<str>),
}

impl ProbeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProbeError::Bind(err) => err.kind(),
            ProbeError::Publish(err) => err.kind(),
            ProbeError::AlreadyBound(_) => ErrorKind::Publish,
        }
    }

    pub fn errno(&self) -> Errno {
        match self {
            ProbeError::Bind(err) => err.errno(),
            ProbeError::Publish(err) => err.errno(),
            ProbeError::AlreadyBound(_) => Errno::EBUSY,
        }
    }
}

/// Errors returned by [Driver::remove].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoveError {
    #[error("{0} is not bound")]
    NotBound(Box<str>),
    #[error(transparent)]
    State(#[from] StateError),
}

impl RemoveError {
    pub fn errno(&self) -> Errno {
        match self {
            RemoveError::NotBound(_) => Errno::ENODEV,
            RemoveError::State(_) => Errno::EINVAL,
        }
    }
}

// endregion
