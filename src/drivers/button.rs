//! Button gesture recognizer built on a duration ladder.
//!
//! ## Hardware
//!
//! Active-low momentary switch with pull-up.  The GPIO interrupt fires on
//! both edges and calls [`ButtonRecognizer::on_edge`] with the decoded
//! level.  Edge handlers only open or close the press session and post
//! into the event queue; held duration accumulates in
//! [`ButtonRecognizer::on_tick`], driven by scheduler ticks on the main
//! loop.
//!
//! The first ticks after a press still carry time that elapsed before
//! the edge (the scheduler accumulator plus any tick not yet drained).
//! The press edge records that amount and the session skips it, so only
//! post-press time counts as held.
//!
//! ## Gestures
//!
//! | Step      | Condition                      | Cross posted            |
//! |-----------|--------------------------------|-------------------------|
//! | `Wake`    | press edge                     | immediately             |
//! | `Quick`   | held >= 100 ms                 | on the tick crossing it |
//! | `Short`   | held >= 5 s                    | on the tick crossing it |
//! | `Long`    | held >= 15 s                   | on the tick crossing it |
//! | `Runaway` | accumulator saturated          | never in normal use     |
//!
//! A tick spanning several thresholds reports only the highest one.
//! Every release posts `GestureRelease(last step)`, or `Wake` when no
//! threshold was reached.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::debug;

use crate::error::LadderError;
use crate::events::{Message, MessageSink};

/// Longest ladder, sentinel included.
pub const MAX_RUNGS: usize = 8;

/// Classified press duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GestureStep {
    Wake,
    Quick,
    Short,
    Long,
    /// Sentinel: held duration saturated the accumulator.
    Runaway,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureAction {
    Cross,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rung {
    pub threshold_ms: u32,
    pub step: GestureStep,
}

const SENTINEL: Rung = Rung {
    threshold_ms: u32::MAX,
    step: GestureStep::Runaway,
};

/// Ordered `(threshold, step)` pairs ending in the [`GestureStep::Runaway`]
/// sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureLadder {
    rungs: [Rung; MAX_RUNGS],
    len: usize,
}

impl GestureLadder {
    /// Quick 100 ms, short 5 s, long 15 s.
    pub const DEFAULT: Self = Self {
        rungs: [
            Rung { threshold_ms: 100, step: GestureStep::Quick },
            Rung { threshold_ms: 5_000, step: GestureStep::Short },
            Rung { threshold_ms: 15_000, step: GestureStep::Long },
            SENTINEL,
            SENTINEL,
            SENTINEL,
            SENTINEL,
            SENTINEL,
        ],
        len: 4,
    };

    /// Build a ladder from strictly increasing thresholds.  The sentinel
    /// is appended.
    pub fn new(steps: &[(u32, GestureStep)]) -> Result<Self, LadderError> {
        if steps.is_empty() {
            return Err(LadderError::Empty);
        }
        if steps.len() >= MAX_RUNGS {
            return Err(LadderError::TooManySteps);
        }
        let mut rungs = [SENTINEL; MAX_RUNGS];
        let mut prev = 0u32;
        for (i, &(threshold_ms, step)) in steps.iter().enumerate() {
            if threshold_ms == 0 {
                return Err(LadderError::ZeroThreshold);
            }
            if (i > 0 && threshold_ms <= prev) || threshold_ms == u32::MAX {
                return Err(LadderError::NotIncreasing);
            }
            rungs[i] = Rung { threshold_ms, step };
            prev = threshold_ms;
        }
        Ok(Self {
            rungs,
            len: steps.len() + 1,
        })
    }

    pub fn rungs(&self) -> &[Rung] {
        &self.rungs[..self.len]
    }

    /// Index of the highest rung whose threshold is `<= held_ms`.
    pub fn highest_reached(&self, held_ms: u32) -> Option<usize> {
        self.rungs()
            .iter()
            .rposition(|r| r.threshold_ms <= held_ms)
    }

    pub fn step(&self, index: usize) -> GestureStep {
        self.rungs().get(index).map_or(GestureStep::Runaway, |r| r.step)
    }
}

impl Default for GestureLadder {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Lives from a press edge to the matching release edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PressSession {
    held_ms: u32,
    /// Pre-press time still to arrive in upcoming ticks.
    skip_ms: u32,
    last_rung: Option<usize>,
}

impl PressSession {
    /// Credit the post-press part of `elapsed_ms`.
    fn credit(&mut self, elapsed_ms: u32) {
        let skipped = elapsed_ms.min(self.skip_ms);
        self.skip_ms -= skipped;
        self.held_ms = self.held_ms.saturating_add(elapsed_ms - skipped);
    }
}

#[derive(Debug)]
struct RecognizerState {
    ladder: GestureLadder,
    session: Option<PressSession>,
}

/// Shared between the GPIO ISR and the main loop.
pub struct ButtonRecognizer {
    state: Mutex<CriticalSectionRawMutex, RefCell<RecognizerState>>,
    enabled: AtomicBool,
}

impl ButtonRecognizer {
    pub const fn new(ladder: GestureLadder) -> Self {
        Self {
            state: Mutex::new(RefCell::new(RecognizerState {
                ladder,
                session: None,
            })),
            enabled: AtomicBool::new(true),
        }
    }

    /// ISR entry point for both edges.
    ///
    /// `pre_press_ms` is tick time accumulated before this edge that has
    /// not reached [`on_tick`](Self::on_tick) yet.  Ignored on release.
    pub fn on_edge(&self, pressed: bool, pre_press_ms: u32, sink: &dyn MessageSink) {
        if pressed {
            self.on_press_edge(pre_press_ms, sink);
        } else {
            self.on_release_edge(sink);
        }
    }

    /// Opens a session and posts the zero-duration `Wake` cross.
    /// A second press edge while held is contact bounce and ignored.
    pub fn on_press_edge(&self, pre_press_ms: u32, sink: &dyn MessageSink) {
        if !self.is_enabled() {
            return;
        }
        let opened = self.state.lock(|s| {
            let mut st = s.borrow_mut();
            if st.session.is_some() {
                return false;
            }
            st.session = Some(PressSession {
                held_ms: 0,
                skip_ms: pre_press_ms,
                last_rung: None,
            });
            true
        });
        if opened {
            sink.post(Message::GestureCross(GestureStep::Wake));
        }
    }

    /// Closes the session and posts the release with the last step reached.
    pub fn on_release_edge(&self, sink: &dyn MessageSink) {
        let released = self.state.lock(|s| {
            let mut st = s.borrow_mut();
            let session = st.session.take()?;
            Some(
                session
                    .last_rung
                    .map_or(GestureStep::Wake, |i| st.ladder.step(i)),
            )
        });
        if let Some(step) = released {
            sink.post(Message::GestureRelease(step));
        }
    }

    /// Accumulate held time and post the highest newly crossed step.
    ///
    /// Returns the step posted, if any.
    pub fn on_tick(&self, elapsed_ms: u32, sink: &dyn MessageSink) -> Option<GestureStep> {
        if !self.is_enabled() {
            return None;
        }
        let crossed = self.state.lock(|s| {
            let mut st = s.borrow_mut();
            let ladder = st.ladder;
            let session = st.session.as_mut()?;
            session.credit(elapsed_ms);
            let reached = ladder.highest_reached(session.held_ms)?;
            if session.last_rung.is_some_and(|last| reached <= last) {
                return None;
            }
            session.last_rung = Some(reached);
            Some(ladder.step(reached))
        });
        if let Some(step) = crossed {
            debug!("Button: crossed {:?}", step);
            sink.post(Message::GestureCross(step));
        }
        crossed
    }

    /// Disabling drops any in-flight session without a release.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
        if !enabled {
            self.state.lock(|s| s.borrow_mut().session = None);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Replace the ladder.  Cancels any in-flight session.
    pub fn set_ladder(&self, ladder: GestureLadder) {
        self.state.lock(|s| {
            let mut st = s.borrow_mut();
            st.ladder = ladder;
            st.session = None;
        });
    }

    pub fn is_held(&self) -> bool {
        self.state.lock(|s| s.borrow().session.is_some())
    }
}


#[cfg(all(test, not(target_os = "espidf")))]
mod proptests {
    use super::*;
    use core::cell::RefCell as StdRefCell;
    use proptest::prelude::*;

    struct Recorder(StdRefCell<Vec<Message>>);

    impl MessageSink for Recorder {
        fn post(&self, msg: Message) -> bool {
            self.0.borrow_mut().push(msg);
            true
        }
    }

    proptest! {
        /// Crosses within one press are strictly increasing and the release
        /// carries the highest step whose threshold fits the held time.
        #[test]
        fn crosses_monotonic_and_release_matches_held_time(
            ticks in prop::collection::vec(1u32..2_000, 0..40),
        ) {
            let btn = ButtonRecognizer::new(GestureLadder::DEFAULT);
            let sink = Recorder(StdRefCell::new(Vec::new()));
            btn.on_press_edge(0, &sink);
            let held: u32 = ticks.iter().sum();
            for t in &ticks {
                btn.on_tick(*t, &sink);
            }
            btn.on_release_edge(&sink);

            let msgs = sink.0.borrow();
            let crosses: Vec<GestureStep> = msgs
                .iter()
                .filter_map(|m| match m {
                    Message::GestureCross(s) => Some(*s),
                    _ => None,
                })
                .collect();
            prop_assert!(crosses.windows(2).all(|w| w[0] < w[1]));

            let expected = GestureLadder::DEFAULT
                .highest_reached(held)
                .map_or(GestureStep::Wake, |i| GestureLadder::DEFAULT.step(i));
            prop_assert_eq!(msgs.last(), Some(&Message::GestureRelease(expected)));
        }
    }
}
