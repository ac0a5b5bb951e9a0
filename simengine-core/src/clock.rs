//! Clock - Time source for boot timestamps
//!
//! TigerStyle: Deterministic, controllable time for simulation runs.
//!
//! Assets stamp `boot_time` from an injected [`Clock`]. Simulations use
//! [`SimClock`] so replays produce identical timestamps; the CLI may use
//! [`SystemClock`] for wall-clock stamps.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::constants::{SIM_TIME_ADVANCE_MS_MAX, TIME_MS_PER_SEC};

/// A source of "now" in milliseconds.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current time in milliseconds.
    fn now_ms(&self) -> u64;
}

/// Clock handle shared by every asset of a simulation.
pub type SharedClock = Arc<dyn Clock>;

// =============================================================================
// SimClock
// =============================================================================

/// A simulated clock shared across assets.
///
/// TigerStyle:
/// - Time only moves forward
/// - All time operations are explicit
/// - No reliance on system time
#[derive(Debug, Default)]
pub struct SimClock {
    current_ms: AtomicU64,
}

impl SimClock {
    /// Create a new clock starting at time zero.
    ///
    /// # Example
    /// ```
    /// use simengine_core::clock::{Clock, SimClock};
    /// let clock = SimClock::new();
    /// assert_eq!(clock.now_ms(), 0);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::at_ms(0)
    }

    /// Create a clock starting at the given time.
    #[must_use]
    pub fn at_ms(start_ms: u64) -> Self {
        Self {
            current_ms: AtomicU64::new(start_ms),
        }
    }

    /// Wrap in an `Arc` ready to hand to the bus.
    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Current time in seconds (truncated).
    #[must_use]
    pub fn now_secs(&self) -> u64 {
        self.now_ms() / TIME_MS_PER_SEC
    }

    /// Advance time by the given milliseconds and return the new time.
    ///
    /// # Panics
    /// Panics if `ms` exceeds `SIM_TIME_ADVANCE_MS_MAX`.
    pub fn advance_ms(&self, ms: u64) -> u64 {
        assert!(
            ms <= SIM_TIME_ADVANCE_MS_MAX,
            "advance_ms({}) exceeds max ({})",
            ms,
            SIM_TIME_ADVANCE_MS_MAX
        );

        let old_time = self.current_ms.fetch_add(ms, Ordering::SeqCst);
        let new_time = old_time.saturating_add(ms);

        assert!(new_time >= old_time, "time must not go backwards");
        new_time
    }

    /// Set time to an absolute value.
    ///
    /// # Panics
    /// Panics if `ms` is earlier than the current time.
    pub fn set_ms(&self, ms: u64) {
        let current = self.now_ms();
        assert!(
            ms >= current,
            "cannot set time backwards: {} < {}",
            ms,
            current
        );
        self.current_ms.store(ms, Ordering::SeqCst);
    }

    /// Elapsed time since a previously taken timestamp.
    ///
    /// # Panics
    /// Panics if `since` is in the future.
    #[must_use]
    pub fn elapsed_since(&self, since: u64) -> u64 {
        let now = self.now_ms();
        assert!(
            since <= now,
            "elapsed_since({}) is in the future (now={})",
            since,
            now
        );
        now - since
    }
}

impl Clock for SimClock {
    fn now_ms(&self) -> u64 {
        self.current_ms.load(Ordering::SeqCst)
    }
}

// =============================================================================
// SystemClock
// =============================================================================

/// Wall-clock time since the Unix epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}
