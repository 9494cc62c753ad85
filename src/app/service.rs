//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the state machine and its context, and borrows the
//! three interrupt-shared pieces (event queue, tick scheduler, button
//! recognizer).  One call to [`AppService::process_iteration`] is one
//! pass of the main loop.  All I/O flows through port traits injected at
//! call sites, so the whole service runs against mock adapters.
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!  EventQueue ──▶ │         AppService           │ ──▶ EventSink
//!                 │  drain → Fsm → Commands      │
//!  DevicePorts ◀──│  TickScheduler · Recognizer  │
//!                 └──────────────────────────────┘
//! ```

use log::{error, info, warn};

use crate::config::{SenseConfig, SysInfo, SystemConfig};
use crate::drivers::button::{ButtonRecognizer, GestureAction, GestureStep};
use crate::events::{EventQueue, Message, MessageHandler};
use crate::fsm::context::FsmContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{DeviceMode, Fsm, Input};
use crate::scheduler::TickScheduler;

use super::commands::{Command, CommandList};
use super::events::AppEvent;
use super::ports::{DevicePorts, EventSink};

/// Application hook invoked for every gesture event the main loop handles.
pub type GestureObserver = fn(GestureStep, GestureAction);

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService<'a, const N: usize> {
    queue: &'a EventQueue<N>,
    ticks: &'a TickScheduler,
    button: &'a ButtonRecognizer,
    fsm: Fsm,
    ctx: FsmContext,
    /// Sensing configuration published to, and received from, the radio.
    sense_config: SenseConfig,
    identity: SysInfo,
    observer: Option<GestureObserver>,
    overflows_reported: u32,
    iterations: u64,
}

impl<'a, const N: usize> AppService<'a, N> {
    /// Construct the service.
    ///
    /// Does **not** start the state machine; call [`start`](Self::start)
    /// next.
    pub fn new(
        queue: &'a EventQueue<N>,
        ticks: &'a TickScheduler,
        button: &'a ButtonRecognizer,
        config: SystemConfig,
        identity: SysInfo,
    ) -> Self {
        Self {
            queue,
            ticks,
            button,
            fsm: Fsm::new(build_state_table()),
            ctx: FsmContext::new(config),
            sense_config: SenseConfig::default(),
            identity,
            observer: None,
            overflows_reported: queue.overflow_count(),
            iterations: 0,
        }
    }

    pub fn with_observer(mut self, observer: GestureObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Force the transition into `Sensing` so its entry actions run.
    pub fn start(&mut self, hw: &mut impl DevicePorts, sink: &mut impl EventSink) {
        self.ctx.radio_active = hw.is_active();
        let cmds = self.fsm.start(DeviceMode::Sensing, &mut self.ctx);
        self.execute(cmds, hw, sink);
        sink.emit(&AppEvent::Started(DeviceMode::Sensing));
        info!("AppService started in {:?}", DeviceMode::Sensing);
    }

    // ── Main-loop iteration ───────────────────────────────────

    /// Feed the watchdog, collect radio config, drain the queue, report
    /// overflows, then sleep until the next interrupt.
    pub fn process_iteration(&mut self, hw: &mut impl DevicePorts, sink: &mut impl EventSink) {
        self.iterations += 1;
        hw.feed();

        if let Some(blob) = hw.take_received_config() {
            self.apply_config_blob(&blob, sink);
        }

        let queue = self.queue;
        let mut dispatcher = Dispatcher { svc: self, hw: &mut *hw, sink: &mut *sink };
        queue.drain(&mut dispatcher);

        self.report_overflows(sink);
        hw.wait_for_event();
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current device mode (`None` before start).
    pub fn state(&self) -> Option<DeviceMode> {
        self.fsm.current_state()
    }

    pub fn sense_config(&self) -> &SenseConfig {
        &self.sense_config
    }

    pub fn identity(&self) -> &SysInfo {
        &self.identity
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    // ── Internal ──────────────────────────────────────────────

    fn handle(&mut self, input: Input, hw: &mut impl DevicePorts, sink: &mut impl EventSink) {
        self.ctx.radio_active = hw.is_active();
        let prev = self.fsm.current_state();
        let cmds = self.fsm.dispatch(input, &mut self.ctx);
        if let (Some(from), Some(to)) = (prev, self.fsm.current_state()) {
            if from != to {
                sink.emit(&AppEvent::ModeChanged { from, to });
            }
        }
        self.execute(cmds, hw, sink);
    }

    /// Run commands in order against the ports.
    fn execute(&mut self, cmds: CommandList, hw: &mut impl DevicePorts, sink: &mut impl EventSink) {
        let mut radio_failed = false;
        for cmd in cmds {
            match cmd {
                Command::ConfigureTicks(cfg) => {
                    if let Err(e) = self.ticks.configure(cfg) {
                        warn!("Tick config rejected: {}", e);
                    }
                }
                Command::SwitchTickMode(mode) => self.ticks.switch_mode(mode),
                Command::RequestMode(mode) => self.post(Message::StateChange(mode)),

                Command::ActivateRadio => {
                    if let Err(e) = hw.activate() {
                        error!("Radio activation failed: {}", e);
                        sink.emit(&AppEvent::RadioFault(e));
                        radio_failed = true;
                        self.post(Message::StateChange(DeviceMode::Sensing));
                    }
                }
                Command::DeactivateRadio => hw.deactivate(),
                Command::PublishAdvertisement if !radio_failed => {
                    hw.set_advertisement(&self.identity, self.sense_config.name());
                }
                Command::PublishIdentity if !radio_failed => hw.set_identity(&self.identity),
                Command::PublishConfig if !radio_failed => hw.set_config(&self.sense_config),
                Command::StartAdvertising if !radio_failed => {
                    if let Err(e) = hw.start_advertising() {
                        error!("Advertising start failed: {}", e);
                        sink.emit(&AppEvent::RadioFault(e));
                        self.post(Message::StateChange(DeviceMode::Sensing));
                    }
                }
                Command::PublishAdvertisement
                | Command::PublishIdentity
                | Command::PublishConfig
                | Command::StartAdvertising => {}
                Command::ForceDisconnect => {
                    sink.emit(&AppEvent::ConnectionTimeout);
                    hw.force_disconnect();
                }

                Command::StartPattern { pattern, priority } => hw.start_pattern(pattern, priority),
                Command::StopPatterns(kind) => hw.stop_all(kind),

                Command::ArmButtonWake(armed) => hw.arm_wake(armed),
                Command::Restart(path) => {
                    sink.emit(&AppEvent::RestartRequested(path));
                    hw.restart(path);
                    return;
                }
            }
        }
    }

    fn post(&self, msg: Message) {
        if let Err(e) = self.queue.try_push(msg) {
            warn!("Event queue: {}, {:?}", e, msg);
        }
    }

    fn apply_config_blob(&mut self, blob: &[u8], sink: &mut impl EventSink) {
        match SenseConfig::from_blob(blob) {
            Ok(cfg) => {
                cfg.log_summary();
                self.sense_config = cfg;
                sink.emit(&AppEvent::ConfigReceived);
            }
            Err(e) => {
                warn!("Config blob rejected: {}", e);
                sink.emit(&AppEvent::ConfigRejected(e));
            }
        }
    }

    fn report_overflows(&mut self, sink: &mut impl EventSink) {
        let total = self.queue.overflow_count();
        if total != self.overflows_reported {
            let dropped = total.wrapping_sub(self.overflows_reported);
            warn!("Event queue dropped {} message(s) ({} total)", dropped, total);
            sink.emit(&AppEvent::QueueOverflow { dropped, total });
            self.overflows_reported = total;
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Queue dispatch
// ───────────────────────────────────────────────────────────────

/// Routes drained messages into the service for one drain call.
struct Dispatcher<'s, 'a, const N: usize, H, S> {
    svc: &'s mut AppService<'a, N>,
    hw: &'s mut H,
    sink: &'s mut S,
}

impl<const N: usize, H: DevicePorts, S: EventSink> Dispatcher<'_, '_, N, H, S> {
    fn gesture(&mut self, step: GestureStep, action: GestureAction) {
        if let Some(observer) = self.svc.observer {
            observer(step, action);
        }
        self.sink.emit(&AppEvent::Gesture { step, action });
    }
}

impl<const N: usize, H: DevicePorts, S: EventSink> MessageHandler for Dispatcher<'_, '_, N, H, S> {
    fn on_interval_tick(&mut self, elapsed_ms: u32) {
        // Crosses land at the tail of the queue and run in this drain.
        self.svc.button.on_tick(elapsed_ms, self.svc.queue);
        self.svc.handle(Input::Tick(elapsed_ms), &mut *self.hw, &mut *self.sink);
    }

    fn on_state_change(&mut self, target: DeviceMode) {
        self.svc.handle(Input::ModeRequest(target), &mut *self.hw, &mut *self.sink);
    }

    fn on_gesture_cross(&mut self, step: GestureStep) {
        self.gesture(step, GestureAction::Cross);
        self.svc.handle(Input::GestureCross(step), &mut *self.hw, &mut *self.sink);
    }

    fn on_gesture_release(&mut self, step: GestureStep) {
        self.gesture(step, GestureAction::Release);
        self.svc.handle(Input::GestureRelease(step), &mut *self.hw, &mut *self.sink);
    }
}
