//! Integration tests for the queue → AppService → FSM → ports pipeline.
//!
//! Messages are pushed straight into the queue the way interrupt hooks
//! would, then one main-loop iteration runs against the mock device.

use sensebe::app::events::AppEvent;
use sensebe::app::ports::RestartPath;
use sensebe::config::{SenseConfig, Settings, SystemConfig, TriggerFunc};
use sensebe::drivers::led_patterns::{PatternId, PatternKind, Priority};
use sensebe::error::{ConfigError, RadioError};
use sensebe::events::Message;
use sensebe::fsm::DeviceMode;
use sensebe::scheduler::TickMode;

use crate::mock_hw::{started, HwCall, MockDevice, RecordingSink, Rig};

fn request(rig: &Rig, mode: DeviceMode) {
    assert!(rig.queue.push(Message::StateChange(mode)));
}

// ── Start-up ──────────────────────────────────────────────────

#[test]
fn start_forces_sensing_entry() {
    let rig = Rig::new();
    let mut app = rig.service(SystemConfig::default());
    let mut hw = MockDevice::new();
    let mut sink = RecordingSink::new();

    assert_eq!(app.state(), None);
    app.start(&mut hw, &mut sink);

    assert_eq!(app.state(), Some(DeviceMode::Sensing));
    assert_eq!(hw.actions(), vec![HwCall::StopAll(PatternKind::Loop)]);
    assert_eq!(sink.events, vec![AppEvent::Started(DeviceMode::Sensing)]);

    let ticks = rig.ticks.config();
    assert_eq!(ticks.fast_interval_ms, 60);
    assert_eq!(ticks.slow_interval_ms, 300_000);
    assert_eq!(rig.ticks.mode(), TickMode::Slow);
}

#[test]
fn iteration_feeds_first_and_waits_last() {
    let rig = Rig::new();
    let (mut app, mut hw, mut sink) = started(&rig, SystemConfig::default());

    request(&rig, DeviceMode::Advertising);
    app.process_iteration(&mut hw, &mut sink);

    assert_eq!(hw.calls.first(), Some(&HwCall::Feed));
    assert_eq!(hw.calls.last(), Some(&HwCall::Wait));
    assert_eq!(app.iterations(), 1);
    assert!(rig.queue.is_empty());
}

// ── Mode transitions ──────────────────────────────────────────

#[test]
fn advertising_entry_brings_radio_up() {
    let rig = Rig::new();
    let (mut app, mut hw, mut sink) = started(&rig, SystemConfig::default());

    request(&rig, DeviceMode::Advertising);
    app.process_iteration(&mut hw, &mut sink);

    assert_eq!(app.state(), Some(DeviceMode::Advertising));
    assert_eq!(
        hw.actions(),
        vec![
            HwCall::Activate,
            HwCall::SetAdvertisement("SenseBe".into()),
            HwCall::SetIdentity("SB-EFCAFE".into()),
            HwCall::SetConfig(SenseConfig::default()),
            HwCall::StartAdvertising,
            HwCall::StopAll(PatternKind::Loop),
            HwCall::StartPattern(PatternId::OrangeWave, Priority::Mid),
        ]
    );
    assert_eq!(
        sink.events,
        vec![AppEvent::ModeChanged { from: DeviceMode::Sensing, to: DeviceMode::Advertising }]
    );
    assert_eq!(rig.ticks.config().slow_interval_ms, 1_100);
}

#[test]
fn request_for_current_mode_is_a_no_op() {
    let rig = Rig::new();
    let (mut app, mut hw, mut sink) = started(&rig, SystemConfig::default());

    request(&rig, DeviceMode::Sensing);
    request(&rig, DeviceMode::Sensing);
    app.process_iteration(&mut hw, &mut sink);

    assert_eq!(app.state(), Some(DeviceMode::Sensing));
    assert!(hw.actions().is_empty());
    assert!(sink.events.is_empty());
}

#[test]
fn connected_then_disconnected_turns_radio_off() {
    let rig = Rig::new();
    let (mut app, mut hw, mut sink) = started(&rig, SystemConfig::default());

    request(&rig, DeviceMode::Advertising);
    request(&rig, DeviceMode::Connected);
    app.process_iteration(&mut hw, &mut sink);
    assert_eq!(app.state(), Some(DeviceMode::Connected));
    assert_eq!(
        hw.actions().last(),
        Some(&HwCall::StartPattern(PatternId::GreenWave, Priority::Mid))
    );

    hw.clear();
    request(&rig, DeviceMode::Sensing);
    app.process_iteration(&mut hw, &mut sink);
    assert_eq!(app.state(), Some(DeviceMode::Sensing));
    assert_eq!(
        hw.actions(),
        vec![HwCall::Deactivate, HwCall::StopAll(PatternKind::Loop)]
    );
    assert!(!hw.radio_active);
}

// ── Connection timeout ────────────────────────────────────────

#[test]
fn connection_timeout_disconnects_once_per_session() {
    let rig = Rig::new();
    let config = SystemConfig { connection_timeout_ms: 3_000, ..SystemConfig::default() };
    let (mut app, mut hw, mut sink) = started(&rig, config);

    request(&rig, DeviceMode::Advertising);
    request(&rig, DeviceMode::Connected);
    app.process_iteration(&mut hw, &mut sink);

    for _ in 0..6 {
        rig.queue.push(Message::IntervalTick { elapsed_ms: 1_100 });
        app.process_iteration(&mut hw, &mut sink);
    }
    assert_eq!(hw.count(&HwCall::ForceDisconnect), 1);
    assert_eq!(sink.count(|e| *e == AppEvent::ConnectionTimeout), 1);

    // A fresh session gets a fresh timer.
    request(&rig, DeviceMode::Sensing);
    request(&rig, DeviceMode::Advertising);
    request(&rig, DeviceMode::Connected);
    app.process_iteration(&mut hw, &mut sink);
    for _ in 0..2 {
        rig.queue.push(Message::IntervalTick { elapsed_ms: 1_100 });
        app.process_iteration(&mut hw, &mut sink);
    }
    assert_eq!(hw.count(&HwCall::ForceDisconnect), 1);

    rig.queue.push(Message::IntervalTick { elapsed_ms: 1_100 });
    app.process_iteration(&mut hw, &mut sink);
    assert_eq!(hw.count(&HwCall::ForceDisconnect), 2);
}

#[test]
fn timeout_needs_strictly_more_than_the_limit() {
    let rig = Rig::new();
    let config = SystemConfig { connection_timeout_ms: 2_200, ..SystemConfig::default() };
    let (mut app, mut hw, mut sink) = started(&rig, config);

    request(&rig, DeviceMode::Advertising);
    request(&rig, DeviceMode::Connected);
    rig.queue.push(Message::IntervalTick { elapsed_ms: 1_100 });
    rig.queue.push(Message::IntervalTick { elapsed_ms: 1_100 });
    app.process_iteration(&mut hw, &mut sink);
    assert_eq!(hw.count(&HwCall::ForceDisconnect), 0);

    rig.queue.push(Message::IntervalTick { elapsed_ms: 1 });
    app.process_iteration(&mut hw, &mut sink);
    assert_eq!(hw.count(&HwCall::ForceDisconnect), 1);
}

// ── Radio faults ──────────────────────────────────────────────

#[test]
fn failed_activation_falls_back_to_sensing() {
    let rig = Rig::new();
    let (mut app, mut hw, mut sink) = started(&rig, SystemConfig::default());
    hw.fail_activation = Some(-1);

    request(&rig, DeviceMode::Advertising);
    app.process_iteration(&mut hw, &mut sink);

    assert_eq!(app.state(), Some(DeviceMode::Sensing));
    assert_eq!(hw.count(&HwCall::StartAdvertising), 0);
    assert_eq!(hw.count(&HwCall::SetIdentity("SB-EFCAFE".into())), 0);
    assert!(sink.events.contains(&AppEvent::RadioFault(RadioError::StackInitFailed(-1))));
    assert_eq!(
        sink.events.last(),
        Some(&AppEvent::ModeChanged { from: DeviceMode::Advertising, to: DeviceMode::Sensing })
    );
}

#[test]
fn failed_advertising_falls_back_to_sensing() {
    let rig = Rig::new();
    let (mut app, mut hw, mut sink) = started(&rig, SystemConfig::default());
    hw.fail_advertising = Some(7);

    request(&rig, DeviceMode::Advertising);
    app.process_iteration(&mut hw, &mut sink);

    assert_eq!(app.state(), Some(DeviceMode::Sensing));
    assert!(sink.events.contains(&AppEvent::RadioFault(RadioError::AdvertisingFailed(7))));
    // Stack came up, so leaving for Sensing tears it down again.
    assert_eq!(hw.count(&HwCall::Deactivate), 1);
}

// ── Configuration intake ──────────────────────────────────────

#[test]
fn received_config_is_applied_and_republished() {
    let rig = Rig::new();
    let (mut app, mut hw, mut sink) = started(&rig, SystemConfig::default());

    let mut cfg = SenseConfig::default();
    cfg.dev_name = *b"Porch\0\0\0\0\0\0\0\0\0\0\0";
    cfg.speed = 3;
    cfg.generic_settings[1] = Settings::default().with_motion(1, 2, 30, 5);
    hw.write_config(&cfg.to_blob());
    app.process_iteration(&mut hw, &mut sink);

    assert_eq!(app.sense_config(), &cfg);
    assert_eq!(
        app.sense_config().generic_settings[1].trigger(),
        TriggerFunc::Motion { is_enable: 1, sensitivity: 2, inter_trig_time: 30, detect_trigger_num: 5 }
    );
    assert!(sink.events.contains(&AppEvent::ConfigReceived));

    request(&rig, DeviceMode::Advertising);
    app.process_iteration(&mut hw, &mut sink);
    assert!(hw.calls.contains(&HwCall::SetAdvertisement("Porch".into())));
    assert!(hw.calls.contains(&HwCall::SetConfig(cfg)));
}

#[test]
fn short_config_is_rejected_and_previous_kept() {
    let rig = Rig::new();
    let (mut app, mut hw, mut sink) = started(&rig, SystemConfig::default());

    hw.write_config(&[1, 2, 3]);
    app.process_iteration(&mut hw, &mut sink);

    assert_eq!(app.sense_config(), &SenseConfig::default());
    assert_eq!(
        sink.events,
        vec![AppEvent::ConfigRejected(ConfigError::BlobTooShort { got: 3, need: SenseConfig::BLOB_LEN })]
    );
}

#[test]
fn oversized_config_uses_the_fixed_prefix() {
    let rig = Rig::new();
    let (mut app, mut hw, mut sink) = started(&rig, SystemConfig::default());

    let mut cfg = SenseConfig::default();
    cfg.battery_type = 1;
    let mut raw = cfg.to_blob().to_vec();
    raw.extend_from_slice(&[0xEE; 8]);
    hw.write_config(&raw);
    app.process_iteration(&mut hw, &mut sink);

    assert_eq!(app.sense_config(), &cfg);
}

// ── Overflow reporting ────────────────────────────────────────

#[test]
fn overflow_is_reported_once_with_counts() {
    let rig = Rig::new();
    let (mut app, mut hw, mut sink) = started(&rig, SystemConfig::default());

    for _ in 0..20 {
        rig.queue.push(Message::StateChange(DeviceMode::Sensing));
    }
    app.process_iteration(&mut hw, &mut sink);
    app.process_iteration(&mut hw, &mut sink);

    assert_eq!(
        sink.events,
        vec![AppEvent::QueueOverflow { dropped: 4, total: 4 }]
    );

    rig.queue.push(Message::StateChange(DeviceMode::Sensing));
    for _ in 0..16 {
        rig.queue.push(Message::StateChange(DeviceMode::Sensing));
    }
    app.process_iteration(&mut hw, &mut sink);
    assert_eq!(sink.events.last(), Some(&AppEvent::QueueOverflow { dropped: 1, total: 5 }));
}

#[test]
fn restart_stops_executing_the_batch() {
    let rig = Rig::new();
    let (mut app, mut hw, mut sink) = started(&rig, SystemConfig::default());

    request(&rig, DeviceMode::Advertising);
    app.process_iteration(&mut hw, &mut sink);
    hw.clear();

    rig.queue.push(Message::GestureCross(sensebe::drivers::button::GestureStep::Long));
    app.process_iteration(&mut hw, &mut sink);

    assert_eq!(hw.restarts(), vec![RestartPath::StackAware]);
    assert!(sink.events.contains(&AppEvent::RestartRequested(RestartPath::StackAware)));
}

// ── Real adapters in simulation ───────────────────────────────

#[test]
fn simulated_hardware_runs_a_configuration_session() {
    use sensebe::adapters::ble::{BleAdapter, BleState};
    use sensebe::adapters::hardware::HardwareAdapter;
    use sensebe::adapters::log_sink::LogEventSink;
    use sensebe::drivers::status_led::StatusLed;
    use sensebe::drivers::watchdog::Watchdog;

    let rig = Rig::new();
    let mut app = rig.service(SystemConfig::default());
    let mut hw = HardwareAdapter::new(BleAdapter::new(), StatusLed::new(), Watchdog::new(301_000), 10);
    let mut sink = LogEventSink::new();
    app.start(&mut hw, &mut sink);

    request(&rig, DeviceMode::Advertising);
    app.process_iteration(&mut hw, &mut sink);
    assert_eq!(hw.radio().state(), BleState::Advertising);
    assert!(hw.radio().adv_payload().ends_with(b"SenseBe"));
    assert!(hw.radio().scan_response().windows(9).any(|w| w == b"SB-EFCAFE"));
    assert!(hw.radio().scan_response().ends_with(&[0xFF, 0, 0, 8]));
    assert_eq!(hw.active_pattern(), Some(PatternId::OrangeWave));

    hw.radio_mut().sim_central_connected(&rig.queue);
    let mut cfg = SenseConfig::default();
    cfg.speed = 0;
    hw.radio_mut().sim_config_write(&cfg.to_blob());
    app.process_iteration(&mut hw, &mut sink);
    assert_eq!(app.state(), Some(DeviceMode::Connected));
    assert_eq!(app.sense_config(), &cfg);
    assert_eq!(hw.active_pattern(), Some(PatternId::GreenWave));

    hw.radio_mut().sim_central_disconnected(&rig.queue);
    app.process_iteration(&mut hw, &mut sink);
    assert_eq!(app.state(), Some(DeviceMode::Sensing));
    assert_eq!(hw.radio().state(), BleState::Off);
    assert_eq!(hw.active_pattern(), None);
    assert!(sink.emitted() >= 5);
}
