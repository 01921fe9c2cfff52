//! Shared ownership handles.
//!
//! Every object that crosses the view/core/provider boundary is held through a [`Handle`].
//! Native callback threads may clone and drop handles at any time, so the strong count is atomic;
//! the object is destroyed exactly once, when the last handle goes away.
//!
//! Back-references that must not keep their target alive (a core pointing at its view) use
//! [`WeakHandle`], whose [`upgrade`](WeakHandle::upgrade) reports [`Error::Detached`] instead of
//! handing out a dangling reference.

use crate::error::{Error, Result};
use core::fmt;
use core::ops::Deref;
use std::sync::{Arc, Weak};

/// Strong owning handle.
///
/// Cloning increments the count; dropping decrements it. There is no null handle: optional
/// ownership is spelled `Option<Handle<T>>`.
pub struct Handle<T: ?Sized> {
    inner: Arc<T>,
}

impl<T> Handle<T> {
    /// Creates a new object with a count of one.
    pub fn new(value: T) -> Handle<T> {
        Handle {
            inner: Arc::new(value),
        }
    }
}

impl<T: ?Sized> Handle<T> {
    /// Creates a non-owning reference to the same object.
    pub fn downgrade(this: &Self) -> WeakHandle<T> {
        WeakHandle {
            inner: Arc::downgrade(&this.inner),
        }
    }

    /// Number of strong handles currently alive.
    pub fn ref_count(this: &Self) -> usize {
        Arc::strong_count(&this.inner)
    }

    /// Returns true if both handles point at the same object.
    ///
    /// Only the data address is compared, so two capability views of one object are equal.
    pub fn ptr_eq<U: ?Sized>(this: &Self, other: &Handle<U>) -> bool {
        Arc::as_ptr(&this.inner) as *const () == Arc::as_ptr(&other.inner) as *const ()
    }

    /// Reinterprets this handle as a different capability view of the same object.
    ///
    /// The reference moves into the new handle, so the count is unchanged. If `cast` refuses,
    /// the original handle is returned.
    pub fn cast<U: ?Sized, F>(this: Self, cast: F) -> core::result::Result<Handle<U>, Handle<T>>
    where
        F: FnOnce(Arc<T>) -> core::result::Result<Arc<U>, Arc<T>>,
    {
        match cast(this.inner) {
            Ok(inner) => Ok(Handle { inner }),
            Err(inner) => Err(Handle { inner }),
        }
    }
}

impl<T: ?Sized> From<Arc<T>> for Handle<T> {
    fn from(inner: Arc<T>) -> Self {
        Handle { inner }
    }
}

impl<T: ?Sized> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Handle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: ?Sized> Deref for Handle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Handle({:?})", &*self.inner)
    }
}

/// Non-owning reference to an object held by [`Handle`]s.
pub struct WeakHandle<T: ?Sized> {
    inner: Weak<T>,
}

impl<T: ?Sized> WeakHandle<T> {
    /// Obtains a strong handle, or [`Error::Detached`] if the object is gone.
    pub fn upgrade(&self) -> Result<Handle<T>> {
        self.inner
            .upgrade()
            .map(|inner| Handle { inner })
            .ok_or(Error::Detached)
    }

    /// Returns true while at least one strong handle exists.
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl<T: ?Sized> Clone for WeakHandle<T> {
    fn clone(&self) -> Self {
        WeakHandle {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T: ?Sized> fmt::Debug for WeakHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_alive() {
            write!(f, "WeakHandle(..)")
        } else {
            write!(f, "WeakHandle(detached)")
        }
    }
}
