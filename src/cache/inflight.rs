//! In-flight request tracking.
//!
//! At most one fetch per key runs at a time. Later callers for the same key
//! receive a clone of the shared future instead of starting their own.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use serde_json::Value;

use super::error::FetchError;

/// Outcome of a fetch as observed by every caller that shares it.
pub type FetchOutcome = Result<Value, FetchError>;

/// A fetch that may be awaited by any number of callers.
pub type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;

struct Slot {
    id: u64,
    future: SharedFetch,
}

#[derive(Default, Clone)]
pub(crate) struct InFlight {
    requests: Arc<DashMap<String, Slot>>,
    next_id: Arc<AtomicU64>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the pending fetch for `key`, or register the one built by
    /// `start`. The boolean is `true` when an existing fetch was joined.
    ///
    /// `start` runs while the key's slot is reserved, so the guard it receives
    /// cannot release the slot before the future is registered.
    pub fn join_or_start<F>(&self, key: &str, start: F) -> (SharedFetch, bool)
    where
        F: FnOnce(InFlightGuard) -> SharedFetch,
    {
        use dashmap::mapref::entry::Entry;

        match self.requests.entry(key.to_string()) {
            Entry::Occupied(occupied) => (occupied.get().future.clone(), true),
            Entry::Vacant(vacant) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let guard = InFlightGuard {
                    key: key.to_string(),
                    id,
                    requests: Arc::clone(&self.requests),
                };
                let future = start(guard);
                vacant.insert(Slot {
                    id,
                    future: future.clone(),
                });
                (future, false)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.requests.contains_key(key)
    }
}

/// Releases a key's in-flight slot when dropped, including on panic.
pub(crate) struct InFlightGuard {
    key: String,
    id: u64,
    requests: Arc<DashMap<String, Slot>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let id = self.id;
        self.requests.remove_if(&self.key, |_, slot| slot.id == id);
    }
}
