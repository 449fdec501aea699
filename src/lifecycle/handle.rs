//! RAII wrapper tying shared resources to the global registry

use crate::lifecycle::registry::{LifecycleError, ResourceRegistry, SharedResource};
use std::ops::Deref;
use std::sync::Arc;

/// Shared ownership of a registry-managed resource.
///
/// Each live `SharedHandle` holds one reference in the global registry:
/// cloning retains, dropping releases. The wrapped resource is torn down
/// when the last handle goes away. Dropping logs teardown failures; use
/// [`release`](SharedHandle::release) where the caller needs the error.
#[derive(Debug)]
pub struct SharedHandle<R: SharedResource> {
    inner: Option<Arc<R>>,
}

impl<R: SharedResource> SharedHandle<R> {
    /// Place a resource under shared reference counting with an initial
    /// count of one.
    pub fn new(resource: R) -> Result<Self, LifecycleError> {
        let inner = Arc::new(resource);
        ResourceRegistry::global().inc_ref(inner.as_ref())?;
        Ok(Self { inner: Some(inner) })
    }

    /// Release this reference, propagating a teardown failure if this was
    /// the last one.
    pub fn release(mut self) -> Result<(), LifecycleError> {
        match self.inner.take() {
            Some(inner) => ResourceRegistry::global().dec_ref(inner.as_ref()),
            None => Ok(()),
        }
    }
}

impl<R: SharedResource> Deref for SharedHandle<R> {
    type Target = R;

    fn deref(&self) -> &R {
        // invariant: inner is Some for every handle that was not consumed
        // by release(), and release() takes self by value
        self.inner
            .as_deref()
            .unwrap_or_else(|| unreachable!("shared handle used after release"))
    }
}

impl<R: SharedResource> Clone for SharedHandle<R> {
    fn clone(&self) -> Self {
        let inner = self.inner.clone();
        if let Some(inner) = &inner {
            // the key was validated non-null at construction
            if let Err(err) = ResourceRegistry::global().inc_ref(inner.as_ref()) {
                log::error!("failed to retain shared resource: {err}");
            }
        }
        Self { inner }
    }
}

impl<R: SharedResource> Drop for SharedHandle<R> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            if let Err(err) = ResourceRegistry::global().dec_ref(inner.as_ref()) {
                log::error!("shared resource teardown failed: {err}");
            }
        }
    }
}
