use crate::state::lock;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
struct PendingTimer {
    generation: u64,
    started_at: Instant,
    duration: Duration,
    handle: JoinHandle<()>,
}

/// At most one pending countdown per key. Starting a timer for a key replaces
/// and aborts the previous one.
///
/// A timer that has fired is removed before its callback runs, so cancelling it
/// afterwards is a no-op. Callbacks must therefore tolerate running after the
/// state they were scheduled for has moved on.
#[derive(Debug, Clone)]
pub struct TimerRegistry<K> {
    pending: Arc<Mutex<HashMap<K, PendingTimer>>>,
    generation: Arc<AtomicU64>,
}

impl<K> Default for TimerRegistry<K> {
    fn default() -> Self {
        Self {
            pending: Default::default(),
            generation: Default::default(),
        }
    }
}

impl<K> TimerRegistry<K>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
{
    pub fn new() -> Self {
        Default::default()
    }

    /// Must be called from within a tokio runtime.
    pub fn start<F>(&self, key: K, duration: Duration, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let mut pending = lock(&self.pending);
        if let Some(previous) = pending.remove(&key) {
            previous.handle.abort();
        }

        let registry = Arc::clone(&self.pending);
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let fired = {
                let mut pending = lock(&registry);
                match pending.get(&task_key) {
                    Some(timer) if timer.generation == generation => {
                        pending.remove(&task_key);
                        true
                    }
                    _ => false,
                }
            };
            if fired {
                debug!(key = ?task_key, "timer fired");
                callback();
            }
        });

        pending.insert(
            key,
            PendingTimer {
                generation,
                started_at: Instant::now(),
                duration,
                handle,
            },
        );
    }

    /// Returns whether a pending timer was cancelled.
    pub fn cancel(&self, key: &K) -> bool {
        match lock(&self.pending).remove(key) {
            Some(timer) => {
                timer.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all<'a>(&self, keys: impl IntoIterator<Item = &'a K>)
    where
        K: 'a,
    {
        let mut pending = lock(&self.pending);
        for key in keys {
            if let Some(timer) = pending.remove(key) {
                timer.handle.abort();
            }
        }
    }

    pub fn is_pending(&self, key: &K) -> bool {
        lock(&self.pending).contains_key(key)
    }

    pub fn len(&self) -> usize {
        lock(&self.pending).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Time since the pending timer for `key` was started.
    pub fn elapsed(&self, key: &K) -> Option<Duration> {
        lock(&self.pending)
            .get(key)
            .map(|timer| timer.started_at.elapsed())
    }

    /// Time left before the pending timer for `key` fires.
    pub fn remaining(&self, key: &K) -> Option<Duration> {
        lock(&self.pending)
            .get(key)
            .map(|timer| timer.duration.saturating_sub(timer.started_at.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Box<dyn FnOnce() + Send>) {
        let count = Arc::new(AtomicUsize::new(0));
        let make = {
            let count = Arc::clone(&count);
            move || {
                let count = Arc::clone(&count);
                Box::new(move || {
                    count.fetch_add(1, Ordering::SeqCst);
                }) as Box<dyn FnOnce() + Send>
            }
        };
        (count, make)
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_the_duration() {
        let timers = TimerRegistry::new();
        let (count, callback) = counter();
        timers.start("room", Duration::from_secs(20), callback());

        tokio::time::sleep(Duration::from_secs(19)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(timers.is_pending(&"room"));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!timers.is_pending(&"room"));
        assert!(!timers.cancel(&"room"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timers_never_fire() {
        let timers = TimerRegistry::new();
        let (count, callback) = counter();
        timers.start(1u8, Duration::from_secs(5), callback());
        assert!(timers.cancel(&1));
        assert!(!timers.cancel(&1));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(timers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_replaces_the_previous_timer() {
        let timers = TimerRegistry::new();
        let (count, callback) = counter();
        timers.start(7u32, Duration::from_secs(5), callback());
        tokio::time::sleep(Duration::from_secs(3)).await;
        timers.start(7u32, Duration::from_secs(5), callback());
        assert_eq!(timers.len(), 1);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reports_elapsed_and_remaining_time() {
        let timers = TimerRegistry::new();
        timers.start("r", Duration::from_secs(60), || {});
        tokio::time::sleep(Duration::from_secs(15)).await;

        let elapsed = timers.elapsed(&"r").unwrap();
        let remaining = timers.remaining(&"r").unwrap();
        assert!(elapsed >= Duration::from_secs(15) && elapsed < Duration::from_secs(16));
        assert!(remaining > Duration::from_secs(44) && remaining <= Duration::from_secs(45));
        assert_eq!(timers.remaining(&"other"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_clears_every_listed_key() {
        let timers = TimerRegistry::new();
        let (count, callback) = counter();
        for key in 0..4u8 {
            timers.start(key, Duration::from_secs(1), callback());
        }
        timers.cancel_all(&[0, 1, 2]);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
