//! Cancel-and-reschedule timers keyed by an arbitrary identifier.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct Pending {
    generation: u64,
    cancel: CancellationToken,
}

struct Inner<K> {
    pending: Mutex<HashMap<K, Pending>>,
    generation: AtomicU64,
    shutdown: CancellationToken,
}

/// Runs a task once a key has been quiet for its interval.
///
/// Scheduling a key that already has a pending timer cancels that timer,
/// so a burst of triggers collapses into one run after the last of them.
/// A task that has started running is not cancelled.
pub struct CoalescingScheduler<K> {
    inner: Arc<Inner<K>>,
}

impl<K> Clone for CoalescingScheduler<K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K> Default for CoalescingScheduler<K> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Inner {
                pending: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
                shutdown: CancellationToken::new(),
            }),
        }
    }
}

impl<K> CoalescingScheduler<K>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Must be called from within a tokio runtime.
    pub fn schedule<F, Fut>(&self, key: K, delay: Duration, task: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.inner.shutdown.is_cancelled() {
            tracing::debug!("Scheduler shut down, dropping {:?}", key);
            return;
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
        let cancel = self.inner.shutdown.child_token();
        {
            let mut pending = self.pending();
            if let Some(previous) = pending.insert(
                key.clone(),
                Pending {
                    generation,
                    cancel: cancel.clone(),
                },
            ) {
                previous.cancel.cancel();
            }
        }

        let inner = self.inner.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            {
                let mut pending = inner.pending.lock().unwrap_or_else(PoisonError::into_inner);
                match pending.get(&key) {
                    Some(entry) if entry.generation == generation => {
                        pending.remove(&key);
                    }
                    _ => return,
                }
            }

            tracing::trace!("Running coalesced task {:?}", key);
            task().await;
        });
    }

    /// Cancels a pending timer. Returns whether one was pending.
    pub fn cancel(&self, key: &K) -> bool {
        match self.pending().remove(key) {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending().contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.pending().len()
    }

    /// Cancels every pending timer and refuses new ones.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.pending().clear();
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, HashMap<K, Pending>> {
        self.inner.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
