//! Module registry
//!
//! Process-wide cache from [`ArtifactPath`] to [`ModuleHandle`]. Each key owns
//! a slot that moves from `Loading` to `Ready` (or `Failed`) exactly once.
//! The first caller to reserve a slot runs the loader; everyone else asking
//! for the same key waits on that slot's condvar. Map shard locks are only
//! held long enough to reserve or look up a slot, so loads of different keys
//! never block each other.
//!
//! Blocked waiters are recorded per thread. A wait that would close a cycle
//! (thread A waits on a slot owned by B, which waits on one owned by A) is
//! refused with `CircularImport` instead of blocking.

use crate::error::ImportError;
use crate::module::ModuleHandle;
use crate::namespace::{ArtifactPath, Namespace};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

static GLOBAL: Lazy<Arc<ModuleRegistry>> = Lazy::new(|| Arc::new(ModuleRegistry::new()));

enum SlotState {
    Loading { owner: ThreadId },
    Ready(ModuleHandle),
    Failed(ImportError),
}

struct Slot {
    state: Mutex<SlotState>,
    settled: Condvar,
}

impl Slot {
    fn reserved() -> Self {
        Self {
            state: Mutex::new(SlotState::Loading {
                owner: thread::current().id(),
            }),
            settled: Condvar::new(),
        }
    }

    fn owner(&self) -> Option<ThreadId> {
        match &*self.state.lock() {
            SlotState::Loading { owner } => Some(*owner),
            _ => None,
        }
    }

    fn ready(&self) -> Option<ModuleHandle> {
        match &*self.state.lock() {
            SlotState::Ready(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    fn settle(&self, state: SlotState) {
        *self.state.lock() = state;
        self.settled.notify_all();
    }
}

/// Registry statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Ready entries
    pub entries: usize,
    /// Requests served without running a loader
    pub hits: usize,
    /// Requests that ran a loader
    pub misses: usize,
}

impl CacheStats {
    /// Hit ratio (0.0 to 1.0)
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
pub struct ModuleRegistry {
    slots: DashMap<ArtifactPath, Arc<Slot>>,
    /// Slot each blocked thread is waiting on
    waiting: Mutex<HashMap<ThreadId, Arc<Slot>>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

/// Settles the owner's slot as aborted if the loader unwinds
struct Reservation<'a> {
    registry: &'a ModuleRegistry,
    path: &'a ArtifactPath,
    slot: Arc<Slot>,
    settled: bool,
}

impl Reservation<'_> {
    fn complete(mut self, result: &Result<ModuleHandle, ImportError>) {
        match result {
            Ok(handle) => self.slot.settle(SlotState::Ready(handle.clone())),
            Err(err) => self.registry.release(self.path, &self.slot, err.clone()),
        }
        self.settled = true;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.registry.release(
                self.path,
                &self.slot,
                ImportError::LoadAborted(self.path.clone()),
            );
        }
    }
}

/// Clears the current thread's wait record
struct Waiting<'a> {
    registry: &'a ModuleRegistry,
    thread: ThreadId,
}

impl Drop for Waiting<'_> {
    fn drop(&mut self) {
        self.registry.waiting.lock().remove(&self.thread);
    }
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared process-wide registry
    pub fn global() -> Arc<ModuleRegistry> {
        Arc::clone(&GLOBAL)
    }

    /// Ready handle for `path`, if any. Does not wait or touch statistics.
    pub fn get(&self, path: &ArtifactPath) -> Option<ModuleHandle> {
        let slot = self.slots.get(path).map(|entry| Arc::clone(entry.value()))?;
        slot.ready()
    }

    /// Return the cached handle for `path`, or run `load` to create it.
    ///
    /// Among concurrent callers for one key exactly one runs `load`; the
    /// others block until it settles and then share its handle or its error.
    /// With a `timeout`, a waiter that gives up drops the stale reservation
    /// so a later call can retry.
    pub fn get_or_create<F>(
        &self,
        path: &ArtifactPath,
        timeout: Option<Duration>,
        load: F,
    ) -> Result<ModuleHandle, ImportError>
    where
        F: FnOnce(&ArtifactPath) -> Result<ModuleHandle, ImportError>,
    {
        if let Some(slot) = self.slots.get(path).map(|entry| Arc::clone(entry.value())) {
            return self.await_slot(path, &slot, timeout);
        }

        let reserved = match self.slots.entry(path.clone()) {
            Entry::Occupied(entry) => Err(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let slot = Arc::new(Slot::reserved());
                entry.insert(Arc::clone(&slot));
                Ok(slot)
            }
        };

        let slot = match reserved {
            Ok(slot) => slot,
            Err(existing) => return self.await_slot(path, &existing, timeout),
        };

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(path = %path, "cache miss, loading");

        let reservation = Reservation {
            registry: self,
            path,
            slot,
            settled: false,
        };
        let result = load(path);
        reservation.complete(&result);
        result
    }

    fn await_slot(
        &self,
        path: &ArtifactPath,
        slot: &Arc<Slot>,
        timeout: Option<Duration>,
    ) -> Result<ModuleHandle, ImportError> {
        let current = thread::current().id();
        let started = Instant::now();
        let deadline = timeout.map(|t| started + t);
        let mut waiting = None;
        let mut state = slot.state.lock();
        loop {
            let owner = match &*state {
                SlotState::Ready(handle) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(path = %path, "cache hit");
                    return Ok(handle.clone());
                }
                SlotState::Failed(err) => return Err(err.clone()),
                SlotState::Loading { owner } => *owner,
            };

            if owner == current {
                return Err(ImportError::CircularImport(path.clone()));
            }

            if waiting.is_none() {
                // Slot lock is never held while taking the wait table
                let entered = MutexGuard::unlocked(&mut state, || self.enter_wait(path, slot));
                waiting = Some(entered?);
                continue;
            }

            match deadline {
                None => slot.settled.wait(&mut state),
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        drop(state);
                        return self.give_up(path, slot, started.elapsed());
                    }
                    slot.settled.wait_until(&mut state, deadline);
                }
            }
        }
    }

    /// Record that the current thread is about to block on `slot`, unless
    /// following the owners' own waits leads back to this thread.
    fn enter_wait(&self, path: &ArtifactPath, slot: &Arc<Slot>) -> Result<Waiting<'_>, ImportError> {
        let current = thread::current().id();
        let mut waiting = self.waiting.lock();

        let mut next = Arc::clone(slot);
        for _ in 0..=waiting.len() {
            let Some(owner) = next.owner() else { break };
            if owner == current {
                warn!(path = %path, "wait cycle across threads");
                return Err(ImportError::CircularImport(path.clone()));
            }
            match waiting.get(&owner) {
                Some(blocked_on) => next = Arc::clone(blocked_on),
                None => break,
            }
        }

        waiting.insert(current, Arc::clone(slot));
        Ok(Waiting {
            registry: self,
            thread: current,
        })
    }

    /// Timed-out waiter: evict the reservation only while it is still loading.
    /// A slot that settled in the meantime is answered from its final state.
    fn give_up(
        &self,
        path: &ArtifactPath,
        slot: &Arc<Slot>,
        waited: Duration,
    ) -> Result<ModuleHandle, ImportError> {
        let evicted = self
            .slots
            .remove_if(path, |_, current| {
                Arc::ptr_eq(current, slot) && current.owner().is_some()
            })
            .is_some();

        if !evicted {
            match &*slot.state.lock() {
                SlotState::Ready(handle) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(handle.clone());
                }
                SlotState::Failed(err) => return Err(err.clone()),
                SlotState::Loading { .. } => {}
            }
        }

        warn!(path = %path, ?waited, "gave up waiting for load");
        Err(ImportError::LoadTimeout {
            path: path.clone(),
            waited,
        })
    }

    /// Fail a slot and drop it from the map so the key can be retried
    fn release(&self, path: &ArtifactPath, slot: &Arc<Slot>, err: ImportError) {
        debug!(path = %path, error = %err, "load failed, releasing slot");
        slot.settle(SlotState::Failed(err));
        self.slots
            .remove_if(path, |_, current| Arc::ptr_eq(current, slot));
    }

    /// Evict one namespace. The next request for it loads afresh.
    pub fn delete(&self, namespace: &Namespace) -> Option<ModuleHandle> {
        self.slots
            .remove(&namespace.artifact_path())
            .and_then(|(_, slot)| slot.ready())
    }

    /// Evict everything and clear statistics
    pub fn reset(&self) {
        self.slots.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn contains(&self, path: &ArtifactPath) -> bool {
        self.get(path).is_some()
    }

    /// Number of ready entries
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| entry.value().ready().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ready entries sorted by path
    pub fn loaded(&self) -> Vec<(ArtifactPath, ModuleHandle)> {
        let mut loaded: Vec<(ArtifactPath, ModuleHandle)> = self
            .slots
            .iter()
            .filter_map(|entry| entry.value().ready().map(|h| (entry.key().clone(), h)))
            .collect();
        loaded.sort_by(|a, b| a.0.cmp(&b.0));
        loaded
    }

    /// Loader invocations since creation or the last reset
    pub fn load_count(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::Barrier;

    fn path(ns: &str) -> ArtifactPath {
        Namespace::parse(ns).unwrap().artifact_path()
    }

    fn make(path: &ArtifactPath) -> Result<ModuleHandle, ImportError> {
        Ok(ModuleHandle::new(path.namespace(), "/tmp/test.pcl"))
    }

    #[test]
    fn test_get_or_create_caches() {
        let registry = ModuleRegistry::new();
        let key = path("foo");

        let first = registry.get_or_create(&key, None, make).unwrap();
        let second = registry
            .get_or_create(&key, None, |_| panic!("loader must not run twice"))
            .unwrap();

        assert!(first.ptr_eq(&second));
        assert_eq!(registry.load_count(), 1);
        assert!(registry.get(&key).unwrap().ptr_eq(&first));
        assert!(registry.contains(&key));
    }

    #[test]
    fn test_get_has_no_side_effects() {
        let registry = ModuleRegistry::new();
        assert!(registry.get(&path("foo")).is_none());
        assert_eq!(registry.stats(), CacheStats::default());
    }

    #[test]
    fn test_stats() {
        let registry = ModuleRegistry::new();
        let key = path("foo");
        registry.get_or_create(&key, None, make).unwrap();
        registry.get_or_create(&key, None, make).unwrap();
        registry.get_or_create(&key, None, make).unwrap();

        let stats = registry.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
        assert!((stats.hit_ratio() - 0.666).abs() < 0.01);
    }

    #[test]
    fn test_failure_releases_slot() {
        let registry = ModuleRegistry::new();
        let key = path("broken");

        let err = registry
            .get_or_create(&key, None, |p| Err(ImportError::LoadAborted(p.clone())))
            .unwrap_err();
        assert!(matches!(err, ImportError::LoadAborted(_)));
        assert!(registry.is_empty());

        let handle = registry.get_or_create(&key, None, make).unwrap();
        assert_eq!(handle.name().as_str(), "broken");
        assert_eq!(registry.load_count(), 2);
    }

    #[test]
    fn test_panicking_loader_releases_slot() {
        let registry = ModuleRegistry::new();
        let key = path("panics");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            registry.get_or_create(&key, None, |_| panic!("boom"))
        }));
        assert!(outcome.is_err());
        assert!(registry.get(&key).is_none());
        assert!(registry.get_or_create(&key, None, make).is_ok());
    }

    #[test]
    fn test_reentry_is_circular() {
        let registry = ModuleRegistry::new();
        let key = path("cycle");

        let err = registry
            .get_or_create(&key, None, |p| registry.get_or_create(p, None, make))
            .unwrap_err();
        assert!(matches!(err, ImportError::CircularImport(ref p) if *p == key));
        assert!(!registry.contains(&key));
    }

    #[test]
    fn test_concurrent_requests_load_once() {
        const THREADS: usize = 8;
        let registry = Arc::new(ModuleRegistry::new());
        let barrier = Arc::new(Barrier::new(THREADS));
        let key = path("shared");

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                let key = key.clone();
                thread::spawn(move || {
                    barrier.wait();
                    registry
                        .get_or_create(&key, None, |p| {
                            thread::sleep(Duration::from_millis(50));
                            make(p)
                        })
                        .unwrap()
                })
            })
            .collect();

        let results: Vec<ModuleHandle> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(registry.load_count(), 1);
        assert!(results.iter().all(|h| h.ptr_eq(&results[0])));
    }

    #[test]
    fn test_waiter_times_out_and_drops_reservation() {
        let registry = Arc::new(ModuleRegistry::new());
        let key = path("slow");
        let started = Arc::new(Barrier::new(2));

        let loader = {
            let registry = Arc::clone(&registry);
            let started = Arc::clone(&started);
            let key = key.clone();
            thread::spawn(move || {
                registry.get_or_create(&key, None, |p| {
                    started.wait();
                    thread::sleep(Duration::from_millis(300));
                    make(p)
                })
            })
        };

        started.wait();
        let err = registry
            .get_or_create(&key, Some(Duration::from_millis(20)), make)
            .unwrap_err();
        assert!(matches!(err, ImportError::LoadTimeout { .. }));

        // Reservation is gone, so a new attempt loads on its own
        let retried = registry.get_or_create(&key, None, make).unwrap();
        let orphan = loader.join().unwrap().unwrap();
        assert!(!retried.ptr_eq(&orphan));
        assert!(registry.get(&key).unwrap().ptr_eq(&retried));
    }

    #[test]
    fn test_give_up_keeps_settled_slot() {
        let registry = ModuleRegistry::new();
        let key = path("settled");
        let slot = Arc::new(Slot::reserved());
        registry.slots.insert(key.clone(), Arc::clone(&slot));

        // Loader finished between the deadline and the eviction
        let handle = make(&key).unwrap();
        slot.settle(SlotState::Ready(handle.clone()));

        let answered = registry.give_up(&key, &slot, Duration::ZERO).unwrap();
        assert!(answered.ptr_eq(&handle));
        assert!(registry.get(&key).unwrap().ptr_eq(&handle));
    }

    #[test]
    fn test_give_up_evicts_loading_slot() {
        let registry = ModuleRegistry::new();
        let key = path("stuck");
        let slot = Arc::new(Slot::reserved());
        registry.slots.insert(key.clone(), Arc::clone(&slot));

        let err = registry.give_up(&key, &slot, Duration::ZERO).unwrap_err();
        assert!(matches!(err, ImportError::LoadTimeout { .. }));
        assert!(registry.slots.get(&key).is_none());
    }

    #[test]
    fn test_cross_thread_cycle_is_circular() {
        let registry = Arc::new(ModuleRegistry::new());
        let both_reserved = Arc::new(Barrier::new(2));
        let (done, outcomes) = std::sync::mpsc::channel();

        for (own, other) in [("a", "b"), ("b", "a")] {
            let registry = Arc::clone(&registry);
            let both_reserved = Arc::clone(&both_reserved);
            let done = done.clone();
            thread::spawn(move || {
                let result = registry.get_or_create(&path(own), None, |_| {
                    both_reserved.wait();
                    registry.get_or_create(&path(other), None, make)
                });
                let _ = done.send(result);
            });
        }

        for _ in 0..2 {
            let result = outcomes
                .recv_timeout(Duration::from_secs(10))
                .expect("cross-thread cycle deadlocked");
            assert!(matches!(result, Err(ImportError::CircularImport(_))));
        }
        assert!(registry.is_empty());
        assert!(registry.waiting.lock().is_empty());
    }

    #[test]
    fn test_independent_waits_are_not_cycles() {
        let registry = Arc::new(ModuleRegistry::new());
        let reserved = Arc::new(Barrier::new(2));

        // "outer" waits on "inner" while "inner" is held by another thread
        // that never waits back
        let holder = {
            let registry = Arc::clone(&registry);
            let reserved = Arc::clone(&reserved);
            thread::spawn(move || {
                registry.get_or_create(&path("inner"), None, |p| {
                    reserved.wait();
                    thread::sleep(Duration::from_millis(100));
                    make(p)
                })
            })
        };

        reserved.wait();
        let outer = registry
            .get_or_create(&path("outer"), None, |p| {
                registry.get_or_create(&path("inner"), None, make)?;
                make(p)
            })
            .unwrap();
        assert_eq!(outer.name().as_str(), "outer");
        assert!(holder.join().unwrap().is_ok());
        assert_eq!(registry.load_count(), 2);
    }

    #[test]
    fn test_delete_and_reset() {
        let registry = ModuleRegistry::new();
        let foo = Namespace::parse("foo").unwrap();
        let first = registry.get_or_create(&foo.artifact_path(), None, make).unwrap();
        registry.get_or_create(&path("bar"), None, make).unwrap();

        let loaded: Vec<String> = registry
            .loaded()
            .into_iter()
            .map(|(p, _)| p.to_string())
            .collect();
        assert_eq!(loaded, vec!["bar.pcl", "foo.pcl"]);

        assert!(registry.delete(&foo).unwrap().ptr_eq(&first));
        let second = registry.get_or_create(&foo.artifact_path(), None, make).unwrap();
        assert!(!first.ptr_eq(&second));
        assert_eq!(registry.load_count(), 3);

        registry.reset();
        assert!(registry.is_empty());
        assert_eq!(registry.load_count(), 0);
    }
}
