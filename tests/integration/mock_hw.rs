//! Mock hardware adapter for integration tests.
//!
//! Records every port call so tests can assert on the full command
//! history without touching the radio, LED or watchdog.

use sensebe::app::events::AppEvent;
use sensebe::app::ports::{
    ButtonWakePort, ConfigBlob, EventSink, IndicatorPort, RadioPort, RestartPath, SystemPort,
    WatchdogPort,
};
use sensebe::app::service::AppService;
use sensebe::config::{SenseConfig, SysInfo, SystemConfig};
use sensebe::drivers::button::{ButtonRecognizer, GestureLadder};
use sensebe::drivers::led_patterns::{PatternId, PatternKind, Priority};
use sensebe::error::RadioError;
use sensebe::events::{EventQueue, QueueForwarder};
use sensebe::scheduler::TickScheduler;
use sensebe::scheduler::TickStart;
use sensebe::runtime;

// ── Port call record ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum HwCall {
    Activate,
    Deactivate,
    StartAdvertising,
    ForceDisconnect,
    SetAdvertisement(String),
    SetIdentity(String),
    SetConfig(SenseConfig),
    StartPattern(PatternId, Priority),
    StopAll(PatternKind),
    Feed,
    ArmWake(bool),
    Restart(RestartPath),
    Wait,
}

// ── MockDevice ────────────────────────────────────────────────

pub struct MockDevice {
    pub calls: Vec<HwCall>,
    pub radio_active: bool,
    pub fail_activation: Option<i32>,
    pub fail_advertising: Option<i32>,
    pub rx_config: Option<ConfigBlob>,
}

#[allow(dead_code)]
impl MockDevice {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            radio_active: false,
            fail_activation: None,
            fail_advertising: None,
            rx_config: None,
        }
    }

    /// Simulate a central writing the configuration characteristic.
    pub fn write_config(&mut self, raw: &[u8]) {
        self.rx_config = ConfigBlob::from_slice(raw).ok();
    }

    pub fn count(&self, call: &HwCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn restarts(&self) -> Vec<RestartPath> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HwCall::Restart(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    /// Calls other than the per-iteration `Feed` / `Wait` bookkeeping.
    pub fn actions(&self) -> Vec<HwCall> {
        self.calls
            .iter()
            .filter(|c| !matches!(c, HwCall::Feed | HwCall::Wait))
            .cloned()
            .collect()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RadioPort for MockDevice {
    fn is_active(&self) -> bool {
        self.radio_active
    }

    fn activate(&mut self) -> Result<(), RadioError> {
        self.calls.push(HwCall::Activate);
        if let Some(code) = self.fail_activation.take() {
            return Err(RadioError::StackInitFailed(code));
        }
        self.radio_active = true;
        Ok(())
    }

    fn deactivate(&mut self) {
        self.calls.push(HwCall::Deactivate);
        self.radio_active = false;
    }

    fn start_advertising(&mut self) -> Result<(), RadioError> {
        self.calls.push(HwCall::StartAdvertising);
        match self.fail_advertising.take() {
            Some(code) => Err(RadioError::AdvertisingFailed(code)),
            None => Ok(()),
        }
    }

    fn force_disconnect(&mut self) {
        self.calls.push(HwCall::ForceDisconnect);
    }

    fn set_advertisement(&mut self, _info: &SysInfo, name: &str) {
        self.calls.push(HwCall::SetAdvertisement(name.to_string()));
    }

    fn set_identity(&mut self, info: &SysInfo) {
        self.calls.push(HwCall::SetIdentity(info.id_str().to_string()));
    }

    fn set_config(&mut self, config: &SenseConfig) {
        self.calls.push(HwCall::SetConfig(*config));
    }

    fn take_received_config(&mut self) -> Option<ConfigBlob> {
        self.rx_config.take()
    }
}

impl IndicatorPort for MockDevice {
    fn start_pattern(&mut self, pattern: PatternId, priority: Priority) {
        self.calls.push(HwCall::StartPattern(pattern, priority));
    }

    fn stop_all(&mut self, kind: PatternKind) {
        self.calls.push(HwCall::StopAll(kind));
    }
}

impl WatchdogPort for MockDevice {
    fn feed(&mut self) {
        self.calls.push(HwCall::Feed);
    }
}

impl ButtonWakePort for MockDevice {
    fn arm_wake(&mut self, armed: bool) {
        self.calls.push(HwCall::ArmWake(armed));
    }
}

impl SystemPort for MockDevice {
    fn restart(&mut self, path: RestartPath) {
        self.calls.push(HwCall::Restart(path));
        self.radio_active = false;
    }

    fn wait_for_event(&mut self) {
        self.calls.push(HwCall::Wait);
    }
}

// ── RecordingSink ─────────────────────────────────────────────

pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}

// ── Rig: the interrupt-shared pieces a service borrows ────────

pub const DEPTH: usize = 16;

pub struct Rig {
    pub queue: EventQueue<DEPTH>,
    pub ticks: TickScheduler,
    pub button: ButtonRecognizer,
}

#[allow(dead_code)]
impl Rig {
    pub fn new() -> Self {
        let config = SystemConfig::default();
        Self {
            queue: EventQueue::new(),
            ticks: TickScheduler::new(config.sensing.tick_config(TickStart::Slow)),
            button: ButtonRecognizer::new(GestureLadder::DEFAULT),
        }
    }

    pub fn service(&self, config: SystemConfig) -> AppService<'_, DEPTH> {
        AppService::new(&self.queue, &self.ticks, &self.button, config, SysInfo::new("SB-EFCAFE"))
    }

    /// Advance the tick timer by `total_ms` in `step_ms` fires.
    pub fn run_timer(&self, total_ms: u32, step_ms: u32) {
        let mut forwarder = QueueForwarder::new(&self.queue);
        let mut left = total_ms;
        while left > 0 {
            let step = step_ms.min(left);
            self.ticks.on_timer_fire(step, &mut forwarder);
            left -= step;
        }
    }

    pub fn press(&self) {
        let pre_press = runtime::undelivered_tick_ms(&self.ticks, &self.queue);
        self.button.on_edge(true, pre_press, &self.queue);
    }

    pub fn release(&self) {
        self.button.on_edge(false, 0, &self.queue);
    }
}

/// Start a service and clear the start-up port calls.
#[allow(dead_code)]
pub fn started<'r>(
    rig: &'r Rig,
    config: SystemConfig,
) -> (AppService<'r, DEPTH>, MockDevice, RecordingSink) {
    let mut app = rig.service(config);
    let mut hw = MockDevice::new();
    let mut sink = RecordingSink::new();
    app.start(&mut hw, &mut sink);
    hw.clear();
    sink.events.clear();
    (app, hw, sink)
}
