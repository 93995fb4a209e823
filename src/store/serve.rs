//! Generation handoff for a serving process.
//!
//! Readers take a lease on the current generation with a lock-free load. A
//! rebuilt index is installed with `replace`; the previous generation is
//! returned as a `RetiredIndex` whose `drain` waits for outstanding leases
//! before unmapping. If a drain gives up, the last lease to drop releases the
//! map, so bytes are never unmapped under a reader.

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use tracing::{debug, info, warn};

use crate::error::MapError;
use crate::store::MappedHandle;

const MAX_BACKOFF: Duration = Duration::from_millis(10);

#[derive(Debug)]
struct Generation {
    id: u64,
    handle: MappedHandle,
}

/// The index currently answering queries.
///
/// Reads never lock. `replace` and `shutdown` are serialized so that no
/// generation can be installed once shutdown has retired the current one.
#[derive(Debug, Default)]
pub struct ServingIndex {
    current: ArcSwapOption<Generation>,
    next_id: AtomicU64,
    closed: AtomicBool,
    control: Mutex<()>,
}

impl ServingIndex {
    pub fn new(handle: MappedHandle) -> Self {
        let index = Self::default();
        index.install(handle);
        index
    }

    /// Held across `replace` and `shutdown`. Guards no data, so poisoning is
    /// ignored.
    fn control(&self) -> MutexGuard<'_, ()> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn install(&self, handle: MappedHandle) -> (u64, Option<Arc<Generation>>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let old = self.current.swap(Some(Arc::new(Generation { id, handle })));
        (id, old)
    }

    /// Lease the current generation. Fails with `MapError::Closed` after
    /// `shutdown` or before any index was installed.
    pub fn acquire(&self) -> Result<IndexLease, MapError> {
        if self.closed.load(Ordering::Acquire) { return Err(MapError::Closed) }
        self.current.load_full()
            .map(|generation| IndexLease { generation })
            .ok_or(MapError::Closed)
    }

    /// Install `handle` as the new generation and return the previous one.
    pub fn replace(&self, handle: MappedHandle) -> Result<Option<RetiredIndex>, MapError> {
        let _control = self.control();
        if self.closed.load(Ordering::Acquire) { return Err(MapError::Closed) }
        let (id, old) = self.install(handle);
        info!("[store::serve] installed generation {id}");
        Ok(old.map(|generation| RetiredIndex { generation }))
    }

    /// Id of the installed generation, if any.
    pub fn generation(&self) -> Option<u64> {
        self.current.load().as_ref().map(|g| g.id)
    }

    #[inline] pub fn is_closed(&self) -> bool { self.closed.load(Ordering::Acquire) }

    /// Stop handing out leases and drain the current generation. A second
    /// call is a no-op.
    pub fn shutdown(&self, timeout: Duration) -> Result<(), MapError> {
        let retired = {
            let _control = self.control();
            if self.closed.swap(true, Ordering::AcqRel) { return Ok(()) }
            self.current.swap(None)
        };
        match retired {
            Some(generation) => RetiredIndex { generation }.drain(timeout),
            None => Ok(()),
        }
    }
}

/// A reader's hold on one generation. Dropping it marks the request finished.
#[derive(Debug, Clone)]
pub struct IndexLease {
    generation: Arc<Generation>,
}

impl IndexLease {
    #[inline] pub fn generation(&self) -> u64 { self.generation.id }
}

impl Deref for IndexLease {
    type Target = MappedHandle;

    fn deref(&self) -> &MappedHandle { &self.generation.handle }
}

/// A generation that no longer receives new leases.
#[derive(Debug)]
pub struct RetiredIndex {
    generation: Arc<Generation>,
}

impl RetiredIndex {
    #[inline] pub fn generation(&self) -> u64 { self.generation.id }

    /// Leases still holding this generation.
    pub fn in_flight(&self) -> usize { Arc::strong_count(&self.generation) - 1 }

    /// Wait until every lease is dropped, then unmap. On timeout the
    /// generation is left to the remaining leases.
    pub fn drain(self, timeout: Duration) -> Result<(), MapError> {
        let deadline = Instant::now() + timeout;
        let mut backoff = Duration::from_micros(100);
        let mut generation = self.generation;
        loop {
            match Arc::try_unwrap(generation) {
                Ok(Generation { id, handle }) => {
                    handle.close();
                    info!("[store::serve] drained generation {id}");
                    return Ok(());
                }
                Err(shared) => {
                    if Instant::now() >= deadline {
                        let in_flight = Arc::strong_count(&shared) - 1;
                        warn!("[store::serve] generation {} still has {in_flight} lease(s) after {timeout:?}", shared.id);
                        return Err(MapError::DrainTimeout { in_flight });
                    }
                    generation = shared;
                    debug!("[store::serve] waiting on {} lease(s)", Arc::strong_count(&generation) - 1);
                    thread::sleep(backoff);
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
    }
}
