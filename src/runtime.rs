//! Process-wide instances shared with interrupt context, and the entry
//! points the platform wires into its interrupt sources.
//!
//! ```text
//!  esp_timer cb ──▶ on_timer_fire(delta) ──▶ TICKS ──▶ EVENT_QUEUE
//!  button ISR   ──▶ on_button_edge(level) ──▶ BUTTON ──▶ EVENT_QUEUE
//!  BLE GAP cb   ──▶ request_mode(mode)    ─────────────▶ EVENT_QUEUE
//! ```
//!
//! Everything here is `const`-constructed so it can live in a `static`
//! and be reached from a bare `extern "C"` callback.

use log::info;

use crate::app::service::{AppService, GestureObserver};
use crate::config::{ButtonConfig, SysInfo, SystemConfig};
use crate::drivers::button::{ButtonRecognizer, GestureLadder, GestureStep};
use crate::error::Result;
use crate::events::{EventQueue, Message, QueueForwarder};
use crate::fsm::DeviceMode;
use crate::scheduler::{TickConfig, TickScheduler, TickStart};

/// Depth of the deferred event queue.
pub const QUEUE_DEPTH: usize = 16;

pub static EVENT_QUEUE: EventQueue<QUEUE_DEPTH> = EventQueue::new();
pub static TICKS: TickScheduler = TickScheduler::new(TickConfig::new(60, 300_000, TickStart::Slow));
pub static BUTTON: ButtonRecognizer = ButtonRecognizer::new(GestureLadder::DEFAULT);

/// Timer hook.  `delta_ms` is the real time since the previous fire.
pub fn on_timer_fire(delta_ms: u32) {
    let mut forwarder = QueueForwarder::new(&EVENT_QUEUE);
    TICKS.on_timer_fire(delta_ms, &mut forwarder);
}

/// Button edge hook.  `pressed` is the decoded (active-low) level.
pub fn on_button_edge(pressed: bool) {
    BUTTON.on_edge(pressed, undelivered_tick_ms(&TICKS, &EVENT_QUEUE), &EVENT_QUEUE);
}

/// Tick time fed to `ticks` that the main loop has not consumed yet:
/// the scheduler's pending remainder plus ticks still queued.
pub fn undelivered_tick_ms<const N: usize>(ticks: &TickScheduler, queue: &EventQueue<N>) -> u32 {
    ticks.pending_elapsed().saturating_add(queue.queued_tick_ms())
}

/// Mode change request from a radio stack callback.
pub fn request_mode(mode: DeviceMode) -> bool {
    EVENT_QUEUE.push(Message::StateChange(mode))
}

/// Gesture ladder described by `config`.
pub fn ladder_from(config: &SystemConfig) -> Result<GestureLadder> {
    Ok(GestureLadder::new(&[
        (config.quick_press_ms, GestureStep::Quick),
        (config.short_press_ms, GestureStep::Short),
        (config.long_press_ms, GestureStep::Long),
    ])?)
}

/// Validate `config`, load it into the shared instances, wire the button
/// and tick timer, and build the service.
///
/// The service still needs [`AppService::start`].
pub fn init(
    button: ButtonConfig,
    config: SystemConfig,
    identity: SysInfo,
    on_gesture: Option<GestureObserver>,
) -> Result<AppService<'static, QUEUE_DEPTH>> {
    config.validate()?;

    BUTTON.set_ladder(ladder_from(&config)?);
    BUTTON.set_enabled(true);
    TICKS.configure(config.sensing.tick_config(TickStart::Slow))?;

    crate::drivers::hw_init::init_button(button)?;
    crate::drivers::hw_timer::start_tick_timer(config.timer_granularity_ms)?;

    info!(
        "Runtime: button GPIO{} prio {}, timer {} ms, queue depth {}",
        button.pin, button.irq_priority, config.timer_granularity_ms, QUEUE_DEPTH
    );

    let svc = AppService::new(&EVENT_QUEUE, &TICKS, &BUTTON, config, identity);
    Ok(match on_gesture {
        Some(observer) => svc.with_observer(observer),
        None => svc,
    })
}
