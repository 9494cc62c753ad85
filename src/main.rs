//! SenseBe Firmware — Main Entry Point
//!
//! Hexagonal architecture with interrupt-deferred, event-driven execution.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter (BLE · LED · TWDT · wake · restart)           │
//! │  LogEventSink (EventSink)                                      │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  FSM · command execution · config intake               │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  runtime: EventQueue · TickScheduler · ButtonRecognizer        │
//! │  (fed from esp_timer and the button ISR)                       │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use sensebe::adapters::ble::BleAdapter;
use sensebe::adapters::device_id;
use sensebe::adapters::hardware::{take_restart_marker, HardwareAdapter};
use sensebe::adapters::log_sink::LogEventSink;
use sensebe::config::{ButtonConfig, SystemConfig};
use sensebe::drivers::button::{GestureAction, GestureStep};
use sensebe::drivers::status_led::StatusLed;
use sensebe::drivers::watchdog::Watchdog;
use sensebe::drivers::{hw_init, hw_timer};
use sensebe::runtime;

fn on_gesture(step: GestureStep, action: GestureAction) {
    info!("Button: {:?} {:?}", step, action);
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  SenseBe v{}                         ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    if take_restart_marker() {
        info!("Boot: restart requested by long press");
    }

    // ── 2. Peripherals ────────────────────────────────────────
    let config = SystemConfig::default();
    if let Err(e) = hw_init::init_led_pwm() {
        warn!("LED PWM init failed: {} (continuing without status LED)", e);
    }
    let watchdog = Watchdog::new(config.watchdog_period_ms);

    // ── 3. Identity ───────────────────────────────────────────
    let mac = device_id::read_mac();
    let identity = device_id::sys_info(&mac);
    info!("Device ID: {}", identity.id_str());

    // ── 4. Runtime: queue, ticks, button, tick timer ──────────
    let mut app = runtime::init(ButtonConfig::default(), config.clone(), identity, Some(on_gesture))
        .map_err(|e| anyhow::anyhow!("runtime init failed: {e}"))?;

    let mut hw = HardwareAdapter::new(
        BleAdapter::new(),
        StatusLed::new(),
        watchdog,
        config.timer_granularity_ms,
    );
    let mut log_sink = LogEventSink::new();

    // ── 5. Start in Sensing and run forever ───────────────────
    app.start(&mut hw, &mut log_sink);
    info!("System ready. Entering event loop.");

    loop {
        app.process_iteration(&mut hw, &mut log_sink);
        if app.iterations() % 10_000 == 0 {
            info!("Main loop: {} iterations", app.iterations());
        }
        if app.state().is_none() {
            hw_timer::stop_tick_timer();
            anyhow::bail!("state machine lost its mode");
        }
    }
}
