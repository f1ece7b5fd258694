//! # Keyed cooldown tracking.
//!
//! [`RateLimiter`] maps a subject key to an expiry instant and answers
//! "is ready" / "trigger" / "remaining". [`MultiRateLimiter`] keys by
//! `(subject, action)` pairs and is otherwise identical — one subject can be
//! on cooldown for "teleport" while ready for "home".
//!
//! ## Rules
//! - **Absence ⇔ ready**: no entry means the key may trigger; a swept entry
//!   behaves exactly like an absent one.
//! - **Atomic try-trigger**: [`RateLimiter::try_trigger`] is a single
//!   check-and-set under the lock. Racing callers on the same key observe
//!   exactly one success per window.
//! - **Sweep is optional**: expired entries never affect correctness, only
//!   memory; call [`RateLimiter::sweep`] from any thread when convenient.
//!
//! ## Example
//! ```
//! use std::time::Duration;
//! use systemvisor::RateLimiter;
//!
//! let chat: RateLimiter<u64> = RateLimiter::new(Duration::from_secs(3));
//! assert!(chat.try_trigger(42));
//! assert!(!chat.try_trigger(42)); // still cooling down
//! assert!(chat.remaining(&42) > Duration::ZERO);
//! assert!(chat.is_ready(&7)); // other keys unaffected
//! ```

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Thread-safe mapping from a subject key to a cooldown expiry.
pub struct RateLimiter<K> {
    window: Duration,
    entries: Mutex<HashMap<K, Instant>>,
}

impl<K: Eq + Hash> RateLimiter<K> {
    /// Creates a limiter with the given cooldown window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The configured cooldown window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// True if the key has no unexpired entry.
    pub fn is_ready(&self, key: &K) -> bool {
        let entries = self.lock();
        match entries.get(key) {
            Some(expires) => *expires <= Instant::now(),
            None => true,
        }
    }

    /// Starts (or restarts) the cooldown for the key.
    pub fn trigger(&self, key: K) {
        let expires = Instant::now() + self.window;
        self.lock().insert(key, expires);
    }

    /// Atomically checks readiness and triggers on success.
    ///
    /// Returns `true` if the key was ready and the cooldown now runs;
    /// `false` if it was still cooling down. Exactly one of N racing callers
    /// on the same key succeeds per window.
    pub fn try_trigger(&self, key: K) -> bool {
        let now = Instant::now();
        let mut entries = self.lock();
        match entries.get(&key) {
            Some(expires) if *expires > now => false,
            _ => {
                entries.insert(key, now + self.window);
                true
            }
        }
    }

    /// Time until the key is ready; [`Duration::ZERO`] if ready now.
    pub fn remaining(&self, key: &K) -> Duration {
        let entries = self.lock();
        match entries.get(key) {
            Some(expires) => expires.saturating_duration_since(Instant::now()),
            None => Duration::ZERO,
        }
    }

    /// Removes expired entries (amortized memory cleanup, never required for
    /// correctness).
    pub fn sweep(&self) {
        let now = Instant::now();
        self.lock().retain(|_, expires| *expires > now);
    }

    /// Number of tracked entries, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if no entries are tracked.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<K, Instant>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cooldown tracking keyed by `(subject, action)` pairs.
///
/// Identical semantics to [`RateLimiter`], with the action label folded into
/// the key so one subject tracks independent cooldowns per action.
pub struct MultiRateLimiter<S, A> {
    inner: RateLimiter<(S, A)>,
}

impl<S: Eq + Hash, A: Eq + Hash> MultiRateLimiter<S, A> {
    /// Creates a limiter with the given cooldown window.
    pub fn new(window: Duration) -> Self {
        Self {
            inner: RateLimiter::new(window),
        }
    }

    /// True if the pair has no unexpired entry.
    pub fn is_ready(&self, subject: &S, action: &A) -> bool
    where
        S: Clone,
        A: Clone,
    {
        self.inner.is_ready(&(subject.clone(), action.clone()))
    }

    /// Starts (or restarts) the cooldown for the pair.
    pub fn trigger(&self, subject: S, action: A) {
        self.inner.trigger((subject, action));
    }

    /// Atomically checks readiness and triggers on success.
    pub fn try_trigger(&self, subject: S, action: A) -> bool {
        self.inner.try_trigger((subject, action))
    }

    /// Time until the pair is ready; [`Duration::ZERO`] if ready now.
    pub fn remaining(&self, subject: &S, action: &A) -> Duration
    where
        S: Clone,
        A: Clone,
    {
        self.inner.remaining(&(subject.clone(), action.clone()))
    }

    /// Removes expired entries.
    pub fn sweep(&self) {
        self.inner.sweep();
    }

    /// Number of tracked entries.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True if no entries are tracked.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_ready_after_window_elapses() {
        let limiter: RateLimiter<&str> = RateLimiter::new(Duration::from_millis(30));
        assert!(limiter.is_ready(&"key"));
        limiter.trigger("key");
        assert!(!limiter.is_ready(&"key"));
        assert!(limiter.remaining(&"key") > Duration::ZERO);

        thread::sleep(Duration::from_millis(50));
        assert!(limiter.is_ready(&"key"));
        assert_eq!(limiter.remaining(&"key"), Duration::ZERO);
    }

    #[test]
    fn test_try_trigger_exclusive_under_race() {
        let limiter = Arc::new(RateLimiter::<u32>::new(Duration::from_secs(60)));
        let successes = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let successes = Arc::clone(&successes);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    if limiter.try_trigger(1) {
                        successes.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(successes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sweep_behaves_like_absence() {
        let limiter: RateLimiter<u32> = RateLimiter::new(Duration::from_millis(10));
        limiter.trigger(1);
        limiter.trigger(2);
        assert_eq!(limiter.len(), 2);

        thread::sleep(Duration::from_millis(30));
        limiter.sweep();
        assert!(limiter.is_empty());
        assert!(limiter.is_ready(&1));
        assert!(limiter.try_trigger(1));
    }

    #[test]
    fn test_multi_actions_are_independent() {
        let limiter: MultiRateLimiter<u64, &str> =
            MultiRateLimiter::new(Duration::from_secs(60));
        assert!(limiter.try_trigger(9, "teleport"));
        assert!(!limiter.try_trigger(9, "teleport"));
        assert!(limiter.try_trigger(9, "home"));
        assert!(limiter.is_ready(&10, &"teleport"));
        assert_eq!(limiter.len(), 2);
    }
}
