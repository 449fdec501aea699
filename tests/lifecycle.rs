use gl_hal::lifecycle::{
    LifecycleError, ResourceKey, ResourceRegistry, SharedHandle, SharedResource, TeardownError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

/// Counts teardowns; optionally fails its disposal routine.
struct FakeResource {
    key: ResourceKey,
    teardowns: Arc<AtomicUsize>,
    fail_teardown: bool,
}

impl FakeResource {
    fn new() -> (Self, Arc<AtomicUsize>) {
        let teardowns = Arc::new(AtomicUsize::new(0));
        (
            Self {
                key: ResourceKey::next(),
                teardowns: teardowns.clone(),
                fail_teardown: false,
            },
            teardowns,
        )
    }

    fn failing() -> (Self, Arc<AtomicUsize>) {
        let (mut resource, teardowns) = Self::new();
        resource.fail_teardown = true;
        (resource, teardowns)
    }
}

impl SharedResource for FakeResource {
    fn resource_key(&self) -> ResourceKey {
        self.key
    }

    fn release_resource(&self) -> Result<(), TeardownError> {
        self.teardowns.fetch_add(1, Ordering::SeqCst);
        if self.fail_teardown {
            Err(TeardownError::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                "simulated device failure",
            )))
        } else {
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Count transitions and teardown
// ---------------------------------------------------------------------------

#[test]
fn inc_then_dec_tears_down_once() {
    let registry = ResourceRegistry::new();
    let (resource, teardowns) = FakeResource::new();

    registry.inc_ref(&resource).unwrap();
    assert_eq!(registry.ref_count(resource.key), 1);

    registry.dec_ref(&resource).unwrap();
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);
    assert_eq!(registry.ref_count(resource.key), 0);
    assert!(registry.is_empty());
}

#[test]
fn teardown_waits_for_the_last_reference() {
    let registry = ResourceRegistry::new();
    let (resource, teardowns) = FakeResource::new();

    registry.inc_ref(&resource).unwrap();
    registry.inc_ref(&resource).unwrap();
    assert_eq!(registry.ref_count(resource.key), 2);

    registry.dec_ref(&resource).unwrap();
    assert_eq!(teardowns.load(Ordering::SeqCst), 0);

    registry.dec_ref(&resource).unwrap();
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);
    assert!(registry.is_empty());
}

#[test]
fn dec_without_inc_disposes_immediately() {
    let registry = ResourceRegistry::new();
    let (resource, teardowns) = FakeResource::new();

    // count starts at 0 and floor-decrements to 0, which still disposes
    registry.dec_ref(&resource).unwrap();
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);
    assert!(registry.is_empty());

    // the key's next registration cycle is independent
    registry.dec_ref(&resource).unwrap();
    assert_eq!(teardowns.load(Ordering::SeqCst), 2);
    assert!(registry.is_empty());
}

#[test]
fn distinct_resources_never_alias() {
    let registry = ResourceRegistry::new();
    let (first, first_teardowns) = FakeResource::new();
    let (second, second_teardowns) = FakeResource::new();

    registry.inc_ref(&first).unwrap();
    registry.inc_ref(&second).unwrap();
    registry.dec_ref(&first).unwrap();

    assert_eq!(first_teardowns.load(Ordering::SeqCst), 1);
    assert_eq!(second_teardowns.load(Ordering::SeqCst), 0);
    assert_eq!(registry.ref_count(second.key), 1);

    registry.dec_ref(&second).unwrap();
    assert_eq!(second_teardowns.load(Ordering::SeqCst), 1);
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

#[test]
fn null_handles_are_rejected() {
    let registry = ResourceRegistry::new();
    let (mut resource, teardowns) = FakeResource::new();
    resource.key = ResourceKey::NULL;

    assert!(matches!(
        registry.inc_ref(&resource),
        Err(LifecycleError::NullHandle)
    ));
    assert!(matches!(
        registry.dec_ref(&resource),
        Err(LifecycleError::NullHandle)
    ));
    assert_eq!(teardowns.load(Ordering::SeqCst), 0);
    assert!(registry.is_empty());
}

#[test]
fn teardown_failure_propagates_and_registry_stays_consistent() {
    let registry = ResourceRegistry::new();
    let (resource, teardowns) = FakeResource::failing();

    registry.inc_ref(&resource).unwrap();
    let err = registry.dec_ref(&resource).unwrap_err();
    assert!(matches!(err, LifecycleError::Teardown(_)));
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);

    // the entry was removed before teardown ran
    assert!(registry.is_empty());

    // a later cycle on the same key starts fresh
    registry.inc_ref(&resource).unwrap();
    assert_eq!(registry.ref_count(resource.key), 1);
}

// ---------------------------------------------------------------------------
// Re-entrancy
// ---------------------------------------------------------------------------

/// Disposal releases another shared resource, re-entering the registry.
struct ChainedResource {
    key: ResourceKey,
    inner: FakeResource,
}

impl SharedResource for ChainedResource {
    fn resource_key(&self) -> ResourceKey {
        self.key
    }

    fn release_resource(&self) -> Result<(), TeardownError> {
        ResourceRegistry::global()
            .dec_ref(&self.inner)
            .map_err(TeardownError::new)
    }
}

#[test]
fn teardown_may_reenter_the_registry() {
    let registry = ResourceRegistry::global();
    let (inner, inner_teardowns) = FakeResource::new();
    let outer = ChainedResource {
        key: ResourceKey::next(),
        inner,
    };

    registry.inc_ref(&outer.inner).unwrap();
    registry.inc_ref(&outer).unwrap();

    // dropping the outer reference releases the inner one from inside its
    // teardown routine; the registry lock must not be held across teardown
    registry.dec_ref(&outer).unwrap();
    assert_eq!(inner_teardowns.load(Ordering::SeqCst), 1);
    assert_eq!(registry.ref_count(outer.key), 0);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_releases_tear_down_exactly_once() {
    const OWNERS: usize = 16;

    let registry = ResourceRegistry::new();
    let (resource, teardowns) = FakeResource::new();

    for _ in 0..OWNERS {
        registry.inc_ref(&resource).unwrap();
    }

    thread::scope(|scope| {
        for _ in 0..OWNERS {
            scope.spawn(|| {
                registry.dec_ref(&resource).unwrap();
            });
        }
    });

    assert_eq!(teardowns.load(Ordering::SeqCst), 1);
    assert!(registry.is_empty());
}

#[test]
fn concurrent_retains_serialize_against_releases() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 100;

    let registry = ResourceRegistry::new();
    let (resource, teardowns) = FakeResource::new();

    // hold one reference so interleaved retain/release pairs never cross zero
    registry.inc_ref(&resource).unwrap();

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                for _ in 0..ROUNDS {
                    registry.inc_ref(&resource).unwrap();
                    registry.dec_ref(&resource).unwrap();
                }
            });
        }
    });

    assert_eq!(teardowns.load(Ordering::SeqCst), 0);
    assert_eq!(registry.ref_count(resource.key), 1);

    registry.dec_ref(&resource).unwrap();
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);
}

// ---------------------------------------------------------------------------
// SharedHandle RAII wrapper
// ---------------------------------------------------------------------------

#[test]
fn shared_handle_retains_and_releases() {
    let (resource, teardowns) = FakeResource::new();
    let key = resource.key;

    let handle = SharedHandle::new(resource).unwrap();
    assert_eq!(ResourceRegistry::global().ref_count(key), 1);

    let second = handle.clone();
    assert_eq!(ResourceRegistry::global().ref_count(key), 2);

    drop(second);
    assert_eq!(ResourceRegistry::global().ref_count(key), 1);
    assert_eq!(teardowns.load(Ordering::SeqCst), 0);

    drop(handle);
    assert_eq!(ResourceRegistry::global().ref_count(key), 0);
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);
}

#[test]
fn shared_handle_release_surfaces_teardown_errors() {
    let (resource, teardowns) = FakeResource::failing();

    let handle = SharedHandle::new(resource).unwrap();
    let err = handle.release().unwrap_err();
    assert!(matches!(err, LifecycleError::Teardown(_)));
    assert_eq!(teardowns.load(Ordering::SeqCst), 1);
}
