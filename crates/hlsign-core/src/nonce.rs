//! Nonce generation.
//!
//! Every signed request needs a fresh millisecond nonce. Nonces are strictly
//! increasing per process, even when several threads sign at once or the
//! clock jumps backwards.

use std::sync::atomic::{AtomicU64, Ordering};

/// Trait for obtaining current time, enabling testability.
pub trait Clock: Send + Sync {
    /// Returns current time in milliseconds since Unix epoch.
    fn now_ms(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        // Pre-epoch clocks clamp to 0; the counter still increases.
        u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

/// Issues `max(last + 1, now)` nonces.
///
/// # Guarantees
/// - Nonces are always strictly increasing
/// - Nonces follow the clock whenever it is ahead of the counter
/// - Thread-safe for concurrent access
pub struct NonceManager<C: Clock> {
    /// Last issued nonce.
    counter: AtomicU64,
    clock: C,
}

impl<C: Clock> NonceManager<C> {
    /// Creates a new `NonceManager` with the given clock.
    ///
    /// The counter starts one below the current time so the first nonce is
    /// the current millisecond.
    #[must_use]
    pub fn new(clock: C) -> Self {
        let now = clock.now_ms();
        Self {
            counter: AtomicU64::new(now.saturating_sub(1)),
            clock,
        }
    }

    /// Generates the next nonce value.
    ///
    /// Thread-safe via CAS loop.
    pub fn next(&self) -> u64 {
        let target = self.clock.now_ms();

        loop {
            let current = self.counter.load(Ordering::Acquire);
            let next_val = current.saturating_add(1).max(target);

            match self.counter.compare_exchange_weak(
                current,
                next_val,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return next_val,
                Err(_) => continue,
            }
        }
    }

    /// Last nonce handed out (or the seed if none was).
    #[must_use]
    pub fn last(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }
}

impl NonceManager<SystemClock> {
    /// Creates a new `NonceManager` with the system clock.
    #[must_use]
    pub fn with_system_clock() -> Self {
        Self::new(SystemClock)
    }
}

impl<C: Clock> std::fmt::Debug for NonceManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NonceManager")
            .field("last", &self.last())
            .finish_non_exhaustive()
    }
}
