//! Reference-counted resource registry
//!
//! A process-wide association between resource identity and a live count.
//! Components that store a long-lived reference to a shared GPU resource
//! call [`ResourceRegistry::inc_ref`]; releasing the reference calls
//! [`ResourceRegistry::dec_ref`]. When the count for a key returns to zero
//! the entry is removed and the resource's teardown runs exactly once.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use thiserror::Error;

/// Opaque identity of a shared resource.
///
/// Keys are drawn from a process-wide counter so two distinct resources
/// never alias the same registry entry. [`ResourceKey::NULL`] marks an
/// absent handle and is rejected by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceKey(u64);

impl ResourceKey {
    pub const NULL: Self = Self(0);

    /// Allocate a fresh, unique key.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

/// Teardown failure raised by a resource's disposal routine.
#[derive(Error, Debug)]
#[error("resource teardown failed: {0}")]
pub struct TeardownError(#[source] Box<dyn Error + Send + Sync + 'static>);

impl TeardownError {
    pub fn new<E: Error + Send + Sync + 'static>(source: E) -> Self {
        Self(Box::new(source))
    }
}

/// Lifecycle error taxonomy
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// A null/absent handle was passed; no state was mutated.
    #[error("null resource handle")]
    NullHandle,
    /// The disposal routine failed. The registry entry was already removed,
    /// so the registry stays consistent; the error is never swallowed.
    #[error(transparent)]
    Teardown(#[from] TeardownError),
}

/// Disposal contract of a shared GPU-backed object.
///
/// Once a resource is placed under shared reference counting, owners must
/// release it through the registry and never invoke
/// [`release_resource`](SharedResource::release_resource) directly.
pub trait SharedResource {
    /// Identity the registry counts under.
    fn resource_key(&self) -> ResourceKey;

    /// Release the underlying GPU/native object. Invoked by the registry
    /// exactly once per registration cycle, with the registry lock released.
    fn release_resource(&self) -> Result<(), TeardownError>;
}

/// Map from resource identity to a live reference count.
///
/// All lookups, mutations, and the teardown decision happen atomically
/// under one lock. The lock is dropped before teardown runs, so a disposal
/// routine may re-enter the registry without deadlocking.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    entries: Mutex<HashMap<ResourceKey, u32>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry instance.
    pub fn global() -> &'static ResourceRegistry {
        static GLOBAL: OnceLock<ResourceRegistry> = OnceLock::new();
        GLOBAL.get_or_init(ResourceRegistry::new)
    }

    /// Increment the reference count of a resource, creating the entry at
    /// zero first if the key is not yet registered.
    pub fn inc_ref<R: SharedResource + ?Sized>(&self, resource: &R) -> Result<(), LifecycleError> {
        let key = resource.resource_key();
        if key.is_null() {
            return Err(LifecycleError::NullHandle);
        }
        let mut entries = self.entries.lock();
        *entries.entry(key).or_insert(0) += 1;
        Ok(())
    }

    /// Decrement the reference count of a resource with a floor of zero.
    ///
    /// Decrementing a never-incremented key is tolerated and treated as
    /// already-zero, so an unreferenced resource disposes itself on first
    /// decrement. When the count reaches zero the entry is removed and the
    /// resource's teardown runs once, outside the registry lock; a teardown
    /// error propagates to the caller.
    pub fn dec_ref<R: SharedResource + ?Sized>(&self, resource: &R) -> Result<(), LifecycleError> {
        let key = resource.resource_key();
        if key.is_null() {
            return Err(LifecycleError::NullHandle);
        }
        let dispose = {
            let mut entries = self.entries.lock();
            let count = entries.entry(key).or_insert(0);
            *count = count.saturating_sub(1);
            if *count == 0 {
                entries.remove(&key);
                true
            } else {
                false
            }
        };
        if dispose {
            log::trace!("resource {key:?} reached zero references, tearing down");
            resource.release_resource()?;
        }
        Ok(())
    }

    /// Current count for a key; zero for unregistered keys.
    pub fn ref_count(&self, key: ResourceKey) -> u32 {
        self.entries.lock().get(&key).copied().unwrap_or(0)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
