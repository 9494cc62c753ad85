//! Hardware adapter — bridges real peripherals to domain port traits.
//!
//! Owns the radio adapter, the LED pattern engine, the status LED and the
//! watchdog, exposing them through the port traits the
//! [`AppService`](crate::app::service::AppService) drives.  This is the
//! only module in the system that touches actual hardware.  On non-espidf
//! targets, the underlying drivers use cfg-gated simulation stubs.

use log::{info, warn};

use crate::adapters::ble::BleAdapter;
use crate::app::ports::{
    ButtonWakePort, ConfigBlob, IndicatorPort, RadioPort, RestartPath, SystemPort, WatchdogPort,
};
use crate::config::{SenseConfig, SysInfo, RESTART_MARKER};
use crate::drivers::hw_init;
use crate::drivers::led_patterns::{LedPatternEngine, PatternId, PatternKind, Priority};
use crate::drivers::status_led::StatusLed;
use crate::drivers::watchdog::Watchdog;
use crate::error::RadioError;

// ── Restart marker ────────────────────────────────────────────

/// Survives a software reset; cleared by power loss.
#[cfg(target_os = "espidf")]
#[unsafe(link_section = ".rtc_noinit")]
static mut RESTART_REASON: u8 = 0;

#[cfg(not(target_os = "espidf"))]
static RESTART_REASON: core::sync::atomic::AtomicU8 = core::sync::atomic::AtomicU8::new(0);

#[cfg(target_os = "espidf")]
fn write_restart_marker(marker: u8) {
    // SAFETY: single byte written from the main task right before reset.
    unsafe { core::ptr::write_volatile(&raw mut RESTART_REASON, marker) };
}

#[cfg(not(target_os = "espidf"))]
fn write_restart_marker(marker: u8) {
    RESTART_REASON.store(marker, core::sync::atomic::Ordering::Relaxed);
}

/// Read and clear the marker left by the previous boot.  `true` when the
/// last reset was requested from the button.
#[cfg(target_os = "espidf")]
pub fn take_restart_marker() -> bool {
    // SAFETY: read once at boot from the main task before anything else
    // can write it.
    unsafe {
        let marker = core::ptr::read_volatile(&raw const RESTART_REASON);
        core::ptr::write_volatile(&raw mut RESTART_REASON, 0);
        marker == RESTART_MARKER
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn take_restart_marker() -> bool {
    RESTART_REASON.swap(0, core::sync::atomic::Ordering::Relaxed) == RESTART_MARKER
}

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    radio: BleAdapter,
    patterns: LedPatternEngine,
    led: StatusLed,
    watchdog: Watchdog,
    /// Step used to advance the LED engine while waiting.
    frame_ms: u32,
    #[cfg(not(target_os = "espidf"))]
    restarts: u32,
}

impl HardwareAdapter {
    pub fn new(radio: BleAdapter, led: StatusLed, watchdog: Watchdog, frame_ms: u32) -> Self {
        Self {
            radio,
            patterns: LedPatternEngine::new(),
            led,
            watchdog,
            frame_ms: frame_ms.max(1),
            #[cfg(not(target_os = "espidf"))]
            restarts: 0,
        }
    }

    pub fn radio(&self) -> &BleAdapter {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut BleAdapter {
        &mut self.radio
    }

    pub fn active_pattern(&self) -> Option<PatternId> {
        self.patterns.active()
    }

    pub fn led_colour(&self) -> (u8, u8, u8) {
        self.led.current_colour()
    }

    /// Restarts requested so far (host builds only).
    #[cfg(not(target_os = "espidf"))]
    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    fn advance_led(&mut self, delta_ms: u32) {
        let rgb = self.patterns.tick(delta_ms);
        self.led.set_colour(rgb);
    }
}

// ── RadioPort (delegates to the BLE adapter) ──────────────────

impl RadioPort for HardwareAdapter {
    fn is_active(&self) -> bool {
        self.radio.is_active()
    }

    fn activate(&mut self) -> Result<(), RadioError> {
        self.radio.activate()
    }

    fn deactivate(&mut self) {
        self.radio.deactivate();
    }

    fn start_advertising(&mut self) -> Result<(), RadioError> {
        self.radio.start_advertising()
    }

    fn force_disconnect(&mut self) {
        self.radio.force_disconnect();
    }

    fn set_advertisement(&mut self, info: &SysInfo, name: &str) {
        self.radio.set_advertisement(info, name);
    }

    fn set_identity(&mut self, info: &SysInfo) {
        self.radio.set_identity(info);
    }

    fn set_config(&mut self, config: &SenseConfig) {
        self.radio.set_config(config);
    }

    fn take_received_config(&mut self) -> Option<ConfigBlob> {
        self.radio.take_received_config()
    }
}

// ── IndicatorPort ─────────────────────────────────────────────

impl IndicatorPort for HardwareAdapter {
    fn start_pattern(&mut self, pattern: PatternId, priority: Priority) {
        self.patterns.start(pattern, priority);
        self.advance_led(0);
    }

    fn stop_all(&mut self, kind: PatternKind) {
        self.patterns.stop_all(kind);
        self.advance_led(0);
    }
}

// ── WatchdogPort / ButtonWakePort ─────────────────────────────

impl WatchdogPort for HardwareAdapter {
    fn feed(&mut self) {
        self.watchdog.feed();
    }
}

impl ButtonWakePort for HardwareAdapter {
    fn arm_wake(&mut self, armed: bool) {
        hw_init::arm_button_wake(armed);
    }
}

// ── SystemPort ────────────────────────────────────────────────

impl SystemPort for HardwareAdapter {
    fn restart(&mut self, path: RestartPath) {
        warn!("System: restart requested ({:?})", path);
        write_restart_marker(RESTART_MARKER);
        if path == RestartPath::StackAware {
            self.radio.deactivate();
        }
        self.led.off();

        #[cfg(target_os = "espidf")]
        // SAFETY: esp_restart never returns.
        unsafe {
            esp_idf_svc::sys::esp_restart();
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.restarts += 1;
            info!("System(sim): restart #{} swallowed", self.restarts);
        }
    }

    /// Sleep in frame-sized steps until something lands in the event
    /// queue, animating the LED in between.  FreeRTOS tickless idle turns
    /// the delay into light sleep.
    #[cfg(target_os = "espidf")]
    fn wait_for_event(&mut self) {
        use esp_idf_svc::hal::delay::FreeRtos;
        while crate::runtime::EVENT_QUEUE.is_empty() {
            FreeRtos::delay_ms(self.frame_ms);
            self.advance_led(self.frame_ms);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn wait_for_event(&mut self) {
        self.advance_led(self.frame_ms);
    }
}
