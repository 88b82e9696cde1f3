//! Handle types for shared ownership and non-owning back references.
//!
//! - [Handle<T>] owns a strong reference through [alloc::sync::Arc]. The owner of an object keeps
//!   exactly one long-lived [Handle<T>]; handles obtained from [HandleRef<T>::get_handle] are
//!   expected to be temporary.
//! - [HandleRef<T>] stores a [alloc::sync::Weak] reference, for routing tables and sessions that
//!   must not keep the target alive.
//!
//! [HandleRef::get_handle] returns [None] once every strong owner is gone.
//! **Consumers must handle the [None] case explicitly.**
use alloc::sync::{Arc, Weak};
use core::ops::Deref;

/// Strong owning handle backed by [Arc<T>].
#[derive(Debug)]
pub struct Handle<T> {
    inner: Arc<T>,
}

impl<T> Deref for Handle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> From<T> for Handle<T> {
    fn from(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Handle<T> {
    /// Create a non-owning [HandleRef<T>] to the same object.
    ///
    /// The returned reference does not keep the object alive and must be upgraded with
    /// [HandleRef::get_handle] before use.
    pub fn create_ref(&self) -> HandleRef<T> {
        HandleRef {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Whether two handles point to the same object.
    pub fn ptr_eq(&self, other: &Handle<T>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Weak (non-owning) handle backed by [Weak<T>].
#[derive(Debug)]
pub struct HandleRef<T> {
    inner: Weak<T>,
}

impl<T> Clone for HandleRef<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> HandleRef<T> {
    /// Attempt to upgrade into a strong [Handle<T>].
    ///
    /// Return `None` if the target has already been dropped.
    pub fn get_handle(&self) -> Option<Handle<T>> {
        Weak::upgrade(&self.inner).map(|inner| Handle { inner })
    }

    /// Whether the reference points to the object owned by `handle`.
    pub fn refers_to(&self, handle: &Handle<T>) -> bool {
        Weak::ptr_eq(&self.inner, &Arc::downgrade(&handle.inner))
    }
}
