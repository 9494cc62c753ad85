//! Dual-cadence tick scheduler.
//!
//! A hardware timer calls [`TickScheduler::on_timer_fire`] at a fixed
//! granularity.  The scheduler accumulates the real elapsed time and,
//! once it reaches the interval of the current cadence, hands the whole
//! accumulated amount to a [`TickDelegate`] and starts over from zero.
//! The main loop installs a delegate that forwards into the event queue.
//!
//! ```text
//! ┌────────────┐  delta_ms  ┌─────────────────────────────┐
//! │ esp_timer  │───────────▶│ TickScheduler               │
//! │ (periodic) │            │  elapsed += delta           │
//! └────────────┘            │  elapsed >= interval(mode)? │
//!                           └──────────────┬──────────────┘
//!                                          │ on_interval(elapsed)
//!                                          ▼
//!                           ┌─────────────────────────────┐
//!                           │ TickDelegate                │
//!                           │ (QueueForwarder → queue)    │
//!                           └─────────────────────────────┘
//! ```
//!
//! Two cadences exist, fast and slow.  [`TickScheduler::configure`]
//! replaces both intervals at once; [`TickScheduler::switch_mode`] picks
//! which one governs dispatch.  Both take effect on the next timer fire
//! and neither discards time already accumulated, so the sum of all
//! dispatched ticks always equals the sum of all timer deltas.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{debug, info};

use crate::app::ports::TickDelegate;
use crate::error::ConfigError;

// ═══════════════════════════════════════════════════════════════
//  Configuration
// ═══════════════════════════════════════════════════════════════

/// Which interval governs dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickMode {
    Fast,
    Slow,
}

/// Cadence to use once a new [`TickConfig`] is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStart {
    Fast,
    Slow,
    /// Keep whatever cadence was active.
    Same,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickConfig {
    pub fast_interval_ms: u32,
    pub slow_interval_ms: u32,
    pub start: TickStart,
}

impl TickConfig {
    pub const fn new(fast_interval_ms: u32, slow_interval_ms: u32, start: TickStart) -> Self {
        Self {
            fast_interval_ms,
            slow_interval_ms,
            start,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fast_interval_ms == 0 {
            return Err(ConfigError::Invalid("fast interval must be positive"));
        }
        if self.fast_interval_ms >= self.slow_interval_ms {
            return Err(ConfigError::Invalid("fast interval must be below slow"));
        }
        Ok(())
    }

    pub const fn interval(&self, mode: TickMode) -> u32 {
        match mode {
            TickMode::Fast => self.fast_interval_ms,
            TickMode::Slow => self.slow_interval_ms,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy)]
struct Runtime {
    config: TickConfig,
    mode: TickMode,
    pending_mode: Option<TickMode>,
    elapsed_ms: u32,
}

/// Shared between the timer callback and the main loop.  Every access
/// goes through a short critical section; the delegate is always called
/// after the lock is released.
pub struct TickScheduler {
    state: Mutex<CriticalSectionRawMutex, RefCell<Runtime>>,
}

impl TickScheduler {
    /// Starts slow; the first [`configure`](Self::configure) decides the
    /// real intervals.
    pub const fn new(config: TickConfig) -> Self {
        let mode = match config.start {
            TickStart::Fast => TickMode::Fast,
            TickStart::Slow | TickStart::Same => TickMode::Slow,
        };
        Self {
            state: Mutex::new(RefCell::new(Runtime {
                config,
                mode,
                pending_mode: None,
                elapsed_ms: 0,
            })),
        }
    }

    /// Replace the active configuration.
    ///
    /// An invalid configuration is rejected and the previous one stays.
    /// An explicit `Fast`/`Slow` start overrides any pending
    /// [`switch_mode`](Self::switch_mode); `Same` leaves it in place.
    pub fn configure(&self, config: TickConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.state.lock(|s| {
            let mut rt = s.borrow_mut();
            rt.config = config;
            match config.start {
                TickStart::Fast => {
                    rt.mode = TickMode::Fast;
                    rt.pending_mode = None;
                }
                TickStart::Slow => {
                    rt.mode = TickMode::Slow;
                    rt.pending_mode = None;
                }
                TickStart::Same => {}
            }
        });
        info!(
            "Ticks: fast={}ms slow={}ms start={:?}",
            config.fast_interval_ms, config.slow_interval_ms, config.start
        );
        Ok(())
    }

    /// Select the governing cadence from the next timer fire on.
    pub fn switch_mode(&self, mode: TickMode) {
        self.state.lock(|s| s.borrow_mut().pending_mode = Some(mode));
        debug!("Ticks: switch to {:?} pending", mode);
    }

    /// Timer callback entry point.
    ///
    /// Returns the dispatched elapsed time when this fire completed an
    /// interval.
    pub fn on_timer_fire(&self, delta_ms: u32, delegate: &mut dyn TickDelegate) -> Option<u32> {
        let due = self.state.lock(|s| {
            let mut rt = s.borrow_mut();
            if let Some(mode) = rt.pending_mode.take() {
                rt.mode = mode;
            }
            rt.elapsed_ms = rt.elapsed_ms.saturating_add(delta_ms);
            if rt.elapsed_ms >= rt.config.interval(rt.mode) {
                let elapsed = rt.elapsed_ms;
                rt.elapsed_ms = 0;
                Some(elapsed)
            } else {
                None
            }
        });
        if let Some(elapsed) = due {
            delegate.on_interval(elapsed);
        }
        due
    }

    /// Cadence currently governing dispatch.
    pub fn mode(&self) -> TickMode {
        self.state.lock(|s| s.borrow().mode)
    }

    pub fn config(&self) -> TickConfig {
        self.state.lock(|s| s.borrow().config)
    }

    /// Time accumulated towards the next dispatch.
    pub fn pending_elapsed(&self) -> u32 {
        self.state.lock(|s| s.borrow().elapsed_ms)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════


#[cfg(all(test, not(target_os = "espidf")))]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    struct Sum(u64, u32);

    impl TickDelegate for Sum {
        fn on_interval(&mut self, elapsed_ms: u32) {
            self.0 += u64::from(elapsed_ms);
            self.1 += 1;
        }
    }

    proptest! {
        /// Dispatched plus pending time always equals the fed time.
        #[test]
        fn elapsed_time_is_conserved(
            deltas in prop::collection::vec(1u32..200, 1..300),
            switches in prop::collection::vec(any::<bool>(), 300),
        ) {
            let sched = TickScheduler::new(TickConfig::new(60, 1_100, TickStart::Fast));
            let mut sum = Sum(0, 0);
            let mut fed = 0u64;
            for (i, d) in deltas.iter().enumerate() {
                if i % 7 == 0 {
                    sched.switch_mode(if switches[i] { TickMode::Fast } else { TickMode::Slow });
                }
                fed += u64::from(*d);
                if let Some(e) = sched.on_timer_fire(*d, &mut sum) {
                    prop_assert!(e >= 60);
                }
            }
            prop_assert_eq!(sum.0 + u64::from(sched.pending_elapsed()), fed);
        }
    }
}
