use std::collections::HashMap;
use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::CacheError;

/// An item that can live in an [`ItemCache`].
///
/// Items are immutable once created. Refreshing an item means creating a
/// replacement, never updating the existing one in place.
pub trait ExpirableItem: Send + Sync + 'static {
    /// Key the item is stored under.
    fn key(&self) -> &str;

    /// Whether the item must no longer be handed out.
    fn is_expired(&self) -> bool;
}

struct Entry<T> {
    item: T,
    refs: AtomicUsize,
}

type Outcome<T, E> = Option<Result<Arc<Entry<T>>, CacheError<E>>>;

enum Slot<T, E> {
    Creating(watch::Receiver<Outcome<T, E>>),
    Ready(Arc<Entry<T>>),
}

struct Inner<T, E> {
    slots: Mutex<HashMap<String, Slot<T, E>>>,
}

enum Claim<T: ExpirableItem, E> {
    Hit(CacheRef<T, E>),
    Wait(watch::Receiver<Outcome<T, E>>),
    Create(watch::Sender<Outcome<T, E>>),
}

/// Keyed cache with at most one in-flight creation per key.
///
/// Lookups return a [`CacheRef`] that keeps the entry alive until it is
/// released (dropped). An expired entry is never handed out; the next lookup
/// creates a replacement while existing holders keep reading the old item.
pub struct ItemCache<T, E> {
    inner: Arc<Inner<T, E>>,
}

impl<T, E> Clone for ItemCache<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> Default for ItemCache<T, E>
where
    T: ExpirableItem,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> ItemCache<T, E>
where
    T: ExpirableItem,
    E: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Returns the fresh item for `key`, creating it with `create` on a miss.
    ///
    /// Concurrent callers for the same key wait for the single in-flight
    /// creation and share its outcome. `create` runs on the calling task
    /// outside the cache lock. A miss also drops every expired entry nobody
    /// holds, so keys that are never requested again do not linger.
    ///
    /// # Errors
    ///
    /// - [`CacheError::Create`] if `create` failed, for the creating caller
    ///   and every caller waiting on it
    /// - [`CacheError::Cancelled`] if `cancel` fired first
    /// - [`CacheError::Abandoned`] if the creating caller was cancelled or dropped
    /// - [`CacheError::KeyMismatch`] if `create` returned an item for another key
    pub async fn get_or_create<F, Fut>(
        &self,
        cancel: &CancellationToken,
        key: &str,
        create: F,
    ) -> Result<CacheRef<T, E>, CacheError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let tx = loop {
            match self.claim(key) {
                Claim::Hit(handle) => {
                    tracing::trace!(key, "cache hit");
                    return Ok(handle);
                }
                Claim::Create(tx) => break tx,
                Claim::Wait(rx) => {
                    if let Some(handle) = self.wait(cancel, key, rx).await? {
                        return Ok(handle);
                    }
                    // Shared result expired before hand-out; look again.
                }
            }
        };

        tracing::trace!(key, "cache miss");
        let swept = self.evict_expired();
        if swept > 0 {
            tracing::debug!(swept, "evicted expired entries");
        }
        let mut pending = PendingCreation {
            inner: &self.inner,
            key,
            tx: Some(tx),
        };

        let created = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = create() => Some(result),
        };
        let Some(created) = created else {
            // Dropping `pending` clears the marker and wakes waiters.
            return Err(CacheError::Cancelled);
        };

        let outcome = created.map_err(CacheError::Create).and_then(|item| {
            if item.key() == key {
                Ok(Arc::new(Entry {
                    item,
                    refs: AtomicUsize::new(1),
                }))
            } else {
                Err(CacheError::KeyMismatch {
                    expected: key.to_owned(),
                    actual: item.key().to_owned(),
                })
            }
        });
        pending.complete(outcome.clone());

        outcome.map(|entry| CacheRef {
            inner: Arc::clone(&self.inner),
            entry,
        })
    }

    /// Removes the entry for `key` if it is not referenced or being created.
    ///
    /// Returns `true` if an entry was removed.
    pub fn evict(&self, key: &str) -> bool {
        let mut slots = self.inner.slots.lock();
        let idle = matches!(
            slots.get(key),
            Some(Slot::Ready(entry)) if entry.refs.load(Ordering::Acquire) == 0
        );
        if idle {
            slots.remove(key);
        }
        idle
    }

    /// Removes every expired entry that has no outstanding references.
    ///
    /// Returns the number of entries removed.
    pub fn evict_expired(&self) -> usize {
        let mut slots = self.inner.slots.lock();
        let before = slots.len();
        slots.retain(|_, slot| match slot {
            Slot::Ready(entry) => {
                entry.refs.load(Ordering::Acquire) > 0 || !entry.item.is_expired()
            }
            Slot::Creating(_) => true,
        });
        before - slots.len()
    }

    /// Number of created entries currently mapped, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .slots
            .lock()
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn claim(&self, key: &str) -> Claim<T, E> {
        let mut slots = self.inner.slots.lock();
        match slots.get(key) {
            Some(Slot::Ready(entry)) if !entry.item.is_expired() => {
                entry.refs.fetch_add(1, Ordering::AcqRel);
                return Claim::Hit(CacheRef {
                    inner: Arc::clone(&self.inner),
                    entry: Arc::clone(entry),
                });
            }
            Some(Slot::Creating(rx)) => return Claim::Wait(rx.clone()),
            _ => {}
        }

        // Missing or expired: the expired entry stays alive for its holders.
        let (tx, rx) = watch::channel(None);
        slots.insert(key.to_owned(), Slot::Creating(rx));
        Claim::Create(tx)
    }

    async fn wait(
        &self,
        cancel: &CancellationToken,
        key: &str,
        mut rx: watch::Receiver<Outcome<T, E>>,
    ) -> Result<Option<CacheRef<T, E>>, CacheError<E>> {
        let outcome = loop {
            if let Some(outcome) = rx.borrow_and_update().clone() {
                break outcome;
            }

            let changed = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(CacheError::Cancelled),
                changed = rx.changed() => changed,
            };
            if changed.is_err() {
                if let Some(outcome) = rx.borrow().clone() {
                    break outcome;
                }
                return Err(CacheError::Abandoned(key.to_owned()));
            }
        };

        let entry = outcome?;
        let _slots = self.inner.slots.lock();
        if entry.item.is_expired() {
            return Ok(None);
        }
        entry.refs.fetch_add(1, Ordering::AcqRel);
        Ok(Some(CacheRef {
            inner: Arc::clone(&self.inner),
            entry,
        }))
    }
}

/// Owns the in-flight marker for one key until the creation completes.
///
/// Dropped without completing (cancellation, or the creating future being
/// dropped), it removes the marker so waiters observe an abandoned creation.
struct PendingCreation<'a, T, E> {
    inner: &'a Inner<T, E>,
    key: &'a str,
    tx: Option<watch::Sender<Outcome<T, E>>>,
}

impl<T, E> PendingCreation<'_, T, E>
where
    T: ExpirableItem,
    E: Clone,
{
    fn complete(&mut self, outcome: Result<Arc<Entry<T>>, CacheError<E>>) {
        {
            let mut slots = self.inner.slots.lock();
            match &outcome {
                Ok(entry) => {
                    slots.insert(self.key.to_owned(), Slot::Ready(Arc::clone(entry)));
                }
                Err(_) => {
                    slots.remove(self.key);
                }
            }
        }
        if let Some(tx) = self.tx.take() {
            tx.send_replace(Some(outcome));
        }
    }
}

impl<T, E> Drop for PendingCreation<'_, T, E> {
    fn drop(&mut self) {
        if self.tx.is_some() {
            let mut slots = self.inner.slots.lock();
            if matches!(slots.get(self.key), Some(Slot::Creating(_))) {
                slots.remove(self.key);
            }
        }
    }
}

/// A counted reference to a cached item.
///
/// Dropping the handle releases the reference. An entry is never evicted
/// while a reference is outstanding; releasing the last reference to an
/// expired entry that is still mapped removes it.
pub struct CacheRef<T: ExpirableItem, E> {
    inner: Arc<Inner<T, E>>,
    entry: Arc<Entry<T>>,
}

impl<T: ExpirableItem, E> CacheRef<T, E> {
    /// Releases the reference. Equivalent to dropping the handle.
    pub fn release(self) {
        drop(self);
    }
}

impl<T: ExpirableItem, E> Deref for CacheRef<T, E> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.entry.item
    }
}

impl<T: ExpirableItem, E> Drop for CacheRef<T, E> {
    fn drop(&mut self) {
        let mut slots = self.inner.slots.lock();
        let previous = self.entry.refs.fetch_sub(1, Ordering::AcqRel);
        if previous == 1 && self.entry.item.is_expired() {
            let key = self.entry.item.key();
            let is_current = matches!(
                slots.get(key),
                Some(Slot::Ready(current)) if Arc::ptr_eq(current, &self.entry)
            );
            if is_current {
                slots.remove(key);
            }
        }
    }
}
