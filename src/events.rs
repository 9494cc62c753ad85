//! Deferred event queue.
//!
//! Messages are produced by:
//! - the periodic timer callback (interval ticks)
//! - the button edge ISR (gesture cross / release)
//! - radio stack callbacks (mode change requests)
//! - the main loop itself (re-entrant posts from handlers)
//!
//! Messages are consumed by the main loop, which drains them one at a
//! time in arrival order.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Timer cb    │────▶│              │     │              │
//! │ Button ISR  │────▶│  EventQueue  │────▶│  Main Loop   │
//! │ Radio cb    │────▶│  (bounded)   │     │  (consumer)  │
//! │ Handlers    │────▶│              │     │              │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! Enqueue takes a short critical section and never blocks or allocates.
//! A full queue drops the new message and bumps the overflow counter;
//! entries already queued are never touched.

use core::cell::RefCell;
use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use heapless::Deque;

use crate::app::ports::TickDelegate;
use crate::drivers::button::GestureStep;
use crate::error::QueueError;
use crate::fsm::DeviceMode;

/// A queued message.  The payload type is fixed by the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    /// Scheduler dispatch carrying real elapsed time since the last one.
    IntervalTick { elapsed_ms: u32 },
    /// Request to move the device into another mode.
    StateChange(DeviceMode),
    /// A held button newly reached a step.
    GestureCross(GestureStep),
    /// The button was released; carries the last step reached.
    GestureRelease(GestureStep),
}

/// Per-kind handlers invoked by [`EventQueue::drain`].
///
/// Handlers run to completion on the main loop.  They may post new
/// messages; those land at the tail and are seen by the same drain.
pub trait MessageHandler {
    fn on_interval_tick(&mut self, elapsed_ms: u32);
    fn on_state_change(&mut self, target: DeviceMode);
    fn on_gesture_cross(&mut self, step: GestureStep);
    fn on_gesture_release(&mut self, step: GestureStep);
}

/// Anything that accepts messages from interrupt context.
pub trait MessageSink {
    /// Returns `false` when the message was dropped.
    fn post(&self, msg: Message) -> bool;
}

/// Bounded FIFO bridging interrupt context and the main loop.
pub struct EventQueue<const N: usize> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Deque<Message, N>>>,
    overflows: AtomicU32,
}

impl<const N: usize> EventQueue<N> {
    /// Upper bound on messages handled by one [`drain`](Self::drain) call.
    pub const DRAIN_BUDGET: usize = N * 4;

    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Deque::new())),
            overflows: AtomicU32::new(0),
        }
    }

    /// Append a message.  Safe from ISR context.
    ///
    /// Returns `false` if the queue is full (message dropped and counted).
    pub fn push(&self, msg: Message) -> bool {
        let accepted = self
            .inner
            .lock(|q| q.borrow_mut().push_back(msg).is_ok());
        if !accepted {
            self.overflows.fetch_add(1, Ordering::Relaxed);
        }
        accepted
    }

    /// [`push`](Self::push) for main-loop callers that propagate errors.
    pub fn try_push(&self, msg: Message) -> Result<(), QueueError> {
        if self.push(msg) { Ok(()) } else { Err(QueueError::Overflow) }
    }

    /// Pop the oldest message.
    pub fn pop(&self) -> Option<Message> {
        self.inner.lock(|q| q.borrow_mut().pop_front())
    }

    /// Dispatch queued messages until the queue is empty or
    /// [`Self::DRAIN_BUDGET`] messages have been handled.
    ///
    /// Returns the number of messages dispatched.  The critical section
    /// is released before each handler runs.
    pub fn drain(&self, handler: &mut impl MessageHandler) -> usize {
        let mut handled = 0;
        while handled < Self::DRAIN_BUDGET {
            let Some(msg) = self.pop() else {
                break;
            };
            match msg {
                Message::IntervalTick { elapsed_ms } => handler.on_interval_tick(elapsed_ms),
                Message::StateChange(target) => handler.on_state_change(target),
                Message::GestureCross(step) => handler.on_gesture_cross(step),
                Message::GestureRelease(step) => handler.on_gesture_release(step),
            }
            handled += 1;
        }
        handled
    }

    pub fn len(&self) -> usize {
        self.inner.lock(|q| q.borrow().len())
    }

    /// Elapsed time carried by interval ticks still waiting in the queue.
    pub fn queued_tick_ms(&self) -> u32 {
        self.inner.lock(|q| {
            q.borrow().iter().fold(0u32, |acc, msg| match msg {
                Message::IntervalTick { elapsed_ms } => acc.saturating_add(*elapsed_ms),
                _ => acc,
            })
        })
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Messages dropped since boot.
    pub fn overflow_count(&self) -> u32 {
        self.overflows.load(Ordering::Relaxed)
    }
}

impl<const N: usize> Default for EventQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> MessageSink for EventQueue<N> {
    fn post(&self, msg: Message) -> bool {
        self.push(msg)
    }
}

/// Scheduler consumer that turns each dispatch into an
/// [`Message::IntervalTick`].
pub struct QueueForwarder<'q, S: MessageSink + ?Sized> {
    sink: &'q S,
}

impl<'q, S: MessageSink + ?Sized> QueueForwarder<'q, S> {
    pub fn new(sink: &'q S) -> Self {
        Self { sink }
    }
}

impl<S: MessageSink + ?Sized> TickDelegate for QueueForwarder<'_, S> {
    fn on_interval(&mut self, elapsed_ms: u32) {
        // Drop is already counted by the queue.
        let _ = self.sink.post(Message::IntervalTick { elapsed_ms });
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
