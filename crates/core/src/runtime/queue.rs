//! Bounded, debounced, serialized analysis queue.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Consumer of queued items. Implementations handle their own failures;
/// nothing is reported back to the queue.
#[async_trait]
pub trait DocumentAnalyzer<T>: Send + Sync {
    async fn analyze(&self, item: T);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePhase {
    Idle,
    Processing,
    DebounceWait,
}

struct QueueState<T> {
    entries: VecDeque<(u64, T)>,
    next_seq: u64,
}

struct QueueInner<T> {
    state: Mutex<QueueState<T>>,
    phase: watch::Sender<QueuePhase>,
    analyzer: Arc<dyn DocumentAnalyzer<T>>,
    max_len: usize,
    debounce: Duration,
    cancel: CancellationToken,
}

/// At most one analysis runs at a time. The newest entry is always taken
/// next; when the queue is full the oldest entry is dropped.
pub struct AnalysisQueue<T> {
    inner: Arc<QueueInner<T>>,
}

impl<T> Clone for AnalysisQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> AnalysisQueue<T>
where
    T: Clone + Debug + Send + Sync + 'static,
{
    pub fn new(analyzer: Arc<dyn DocumentAnalyzer<T>>, max_len: usize, debounce: Duration) -> Self {
        let (phase, _) = watch::channel(QueuePhase::Idle);
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState {
                    entries: VecDeque::new(),
                    next_seq: 0,
                }),
                phase,
                analyzer,
                max_len: max_len.max(1),
                debounce,
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Must be called from within a tokio runtime.
    pub fn push(&self, item: T) {
        if self.inner.cancel.is_cancelled() {
            return;
        }

        let start = {
            let mut state = self.inner.lock();
            while state.entries.len() >= self.inner.max_len {
                if let Some((_, dropped)) = state.entries.pop_front() {
                    tracing::debug!("Analysis queue full, dropping {:?}", dropped);
                }
            }
            let seq = state.next_seq;
            state.next_seq += 1;
            state.entries.push_back((seq, item));

            let idle = *self.inner.phase.borrow() == QueuePhase::Idle;
            if idle {
                self.inner.phase.send_replace(QueuePhase::Processing);
            }
            idle
        };

        if start {
            let inner = self.inner.clone();
            tokio::spawn(async move { inner.drive().await });
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn phase(&self) -> QueuePhase {
        *self.inner.phase.borrow()
    }

    pub fn is_idle(&self) -> bool {
        self.phase() == QueuePhase::Idle
    }

    /// Resolves once the queue has drained and gone idle.
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.phase.subscribe();
        let _ = rx.wait_for(|phase| *phase == QueuePhase::Idle).await;
    }

    /// Drops pending entries and stops the driver after the current analysis.
    pub fn close(&self) {
        self.inner.cancel.cancel();
        let mut state = self.inner.lock();
        state.entries.clear();
        if *self.inner.phase.borrow() != QueuePhase::Processing {
            self.inner.phase.send_replace(QueuePhase::Idle);
        }
    }
}

impl<T: Clone + Debug + Send + Sync + 'static> QueueInner<T> {
    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn drive(self: Arc<Self>) {
        loop {
            let next = {
                let state = self.lock();
                match state.entries.back() {
                    Some((seq, item)) if !self.cancel.is_cancelled() => {
                        self.phase.send_replace(QueuePhase::Processing);
                        Some((*seq, item.clone()))
                    }
                    _ => {
                        self.phase.send_replace(QueuePhase::Idle);
                        None
                    }
                }
            };
            let Some((seq, item)) = next else {
                return;
            };

            tracing::trace!("Analyzing {:?}", item);
            self.analyzer.analyze(item).await;

            {
                let mut state = self.lock();
                state.entries.retain(|(s, _)| *s != seq);
                self.phase.send_replace(QueuePhase::DebounceWait);
            }

            tokio::select! {
                _ = self.cancel.cancelled() => {}
                _ = tokio::time::sleep(self.debounce) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<u32>>,
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl DocumentAnalyzer<u32> for Recorder {
        async fn analyze(&self, item: u32) {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.seen.lock().unwrap().push(item);
        }
    }

    #[tokio::test]
    async fn test_single_push_is_analyzed() {
        let recorder = Arc::new(Recorder::default());
        let queue = AnalysisQueue::new(recorder.clone(), 10, Duration::from_millis(5));
        queue.push(7);
        assert!(!queue.is_idle());
        queue.wait_idle().await;
        assert_eq!(*recorder.seen.lock().unwrap(), vec![7]);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_newest_first_and_bounded() {
        let gate = Arc::new(Notify::new());
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
            gate: Some(gate.clone()),
        });
        let queue = AnalysisQueue::new(recorder.clone(), 3, Duration::from_millis(5));

        // 0 starts processing immediately and blocks on the gate
        queue.push(0);
        tokio::task::yield_now().await;
        for i in 1..=10 {
            queue.push(i);
            assert!(queue.len() <= 3);
        }

        for _ in 0..4 {
            gate.notify_one();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        queue.wait_idle().await;

        let seen = recorder.seen.lock().unwrap().clone();
        assert_eq!(seen[0], 0);
        assert_eq!(seen[1], 10);
        assert!(seen.len() <= 4);
        assert!(!seen.contains(&1));
    }

    #[tokio::test]
    async fn test_close_stops_processing() {
        let recorder = Arc::new(Recorder::default());
        let queue = AnalysisQueue::new(recorder.clone(), 10, Duration::from_millis(5));
        queue.close();
        queue.push(1);
        assert!(queue.is_idle());
        assert!(recorder.seen.lock().unwrap().is_empty());
    }
}
