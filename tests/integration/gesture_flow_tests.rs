//! End-to-end button flows: ISR edges and timer fires go into the queue,
//! the main loop turns them into gestures, mode changes and restarts.

use sensebe::app::events::AppEvent;
use sensebe::app::ports::RestartPath;
use sensebe::config::{ButtonConfig, SysInfo, SystemConfig};
use sensebe::drivers::button::{GestureAction, GestureLadder, GestureStep};
use sensebe::error::Error;
use sensebe::events::Message;
use sensebe::fsm::DeviceMode;
use sensebe::runtime;
use sensebe::scheduler::TickMode;

use crate::mock_hw::{started, HwCall, MockDevice, RecordingSink, Rig};

fn cross(step: GestureStep) -> AppEvent {
    AppEvent::Gesture { step, action: GestureAction::Cross }
}

fn release(step: GestureStep) -> AppEvent {
    AppEvent::Gesture { step, action: GestureAction::Release }
}

// ── Wake / release cadence ────────────────────────────────────

#[test]
fn press_wakes_fast_ticks_and_release_restores_slow() {
    let rig = Rig::new();
    let (mut app, mut hw, mut sink) = started(&rig, SystemConfig::default());

    rig.press();
    app.process_iteration(&mut hw, &mut sink);
    assert_eq!(rig.ticks.mode(), TickMode::Fast);
    assert_eq!(hw.actions(), vec![HwCall::ArmWake(false)]);
    assert_eq!(sink.events, vec![cross(GestureStep::Wake)]);

    rig.release();
    app.process_iteration(&mut hw, &mut sink);
    assert_eq!(hw.actions().last(), Some(&HwCall::ArmWake(true)));
    assert_eq!(sink.events.last(), Some(&release(GestureStep::Wake)));

    // The switch back lands on the next timer fire.
    assert_eq!(rig.ticks.mode(), TickMode::Fast);
    rig.run_timer(10, 10);
    assert_eq!(rig.ticks.mode(), TickMode::Slow);
    assert_eq!(app.state(), Some(DeviceMode::Sensing));
}

#[test]
fn contact_bounce_is_ignored() {
    let rig = Rig::new();
    let (mut app, mut hw, mut sink) = started(&rig, SystemConfig::default());

    rig.press();
    rig.press();
    rig.release();
    rig.release();
    app.process_iteration(&mut hw, &mut sink);

    assert_eq!(sink.count(|e| *e == cross(GestureStep::Wake)), 1);
    assert_eq!(sink.count(|e| *e == release(GestureStep::Wake)), 1);
    assert_eq!(hw.count(&HwCall::ArmWake(true)), 1);
}

#[test]
fn short_tap_after_long_idle_only_wakes() {
    let rig = Rig::new();
    let (mut app, mut hw, mut sink) = started(&rig, SystemConfig::default());

    // 200 s idle at the slow cadence leaves it all in the accumulator.
    rig.run_timer(200_000, 10);
    app.process_iteration(&mut hw, &mut sink);
    assert_eq!(rig.ticks.pending_elapsed(), 200_000);

    rig.press();
    app.process_iteration(&mut hw, &mut sink);
    rig.run_timer(10, 10);
    app.process_iteration(&mut hw, &mut sink);
    rig.release();
    app.process_iteration(&mut hw, &mut sink);

    let gestures: Vec<&AppEvent> = sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::Gesture { .. }))
        .collect();
    assert_eq!(gestures, vec![&cross(GestureStep::Wake), &release(GestureStep::Wake)]);
    assert!(hw.restarts().is_empty());
    assert_eq!(app.state(), Some(DeviceMode::Sensing));
}

#[test]
fn queued_idle_tick_is_not_held_time() {
    let rig = Rig::new();
    let (mut app, mut hw, mut sink) = started(&rig, SystemConfig::default());

    // A full slow interval is still queued when the edge arrives.
    rig.run_timer(300_000, 1_000);
    assert_eq!(rig.queue.len(), 1);
    rig.press();
    app.process_iteration(&mut hw, &mut sink);

    assert_eq!(sink.events, vec![cross(GestureStep::Wake)]);
    assert!(hw.restarts().is_empty());

    // Hold time still counts normally afterwards.
    rig.run_timer(120, 10);
    app.process_iteration(&mut hw, &mut sink);
    assert_eq!(app.state(), Some(DeviceMode::Advertising));
}

// ── Quick press ───────────────────────────────────────────────

#[test]
fn quick_press_starts_advertising() {
    let rig = Rig::new();
    let (mut app, mut hw, mut sink) = started(&rig, SystemConfig::default());

    rig.press();
    app.process_iteration(&mut hw, &mut sink);

    // Two fast intervals of 60 ms cross the 100 ms rung.
    rig.run_timer(120, 10);
    assert_eq!(rig.queue.len(), 2);
    app.process_iteration(&mut hw, &mut sink);

    assert_eq!(app.state(), Some(DeviceMode::Advertising));
    assert!(sink.events.contains(&cross(GestureStep::Quick)));
    assert!(sink.events.contains(&AppEvent::ModeChanged {
        from: DeviceMode::Sensing,
        to: DeviceMode::Advertising,
    }));
    assert_eq!(hw.count(&HwCall::StartAdvertising), 1);
    // Entering advertising keeps the fast cadence while held.
    assert_eq!(rig.ticks.mode(), TickMode::Fast);

    rig.release();
    app.process_iteration(&mut hw, &mut sink);
    assert_eq!(sink.events.last(), Some(&release(GestureStep::Quick)));
    rig.run_timer(10, 10);
    assert_eq!(rig.ticks.mode(), TickMode::Slow);
    assert_eq!(app.state(), Some(DeviceMode::Advertising));
}

#[test]
fn quick_press_while_advertising_does_nothing() {
    let rig = Rig::new();
    let (mut app, mut hw, mut sink) = started(&rig, SystemConfig::default());
    rig.queue.push(Message::StateChange(DeviceMode::Advertising));
    app.process_iteration(&mut hw, &mut sink);
    hw.clear();

    rig.press();
    app.process_iteration(&mut hw, &mut sink);
    rig.run_timer(120, 10);
    app.process_iteration(&mut hw, &mut sink);

    assert!(sink.events.contains(&cross(GestureStep::Quick)));
    assert_eq!(app.state(), Some(DeviceMode::Advertising));
    assert_eq!(hw.count(&HwCall::StartAdvertising), 0);
}

// ── Long press / runaway ──────────────────────────────────────

/// Hold the button, feeding one fast interval per iteration, until a
/// restart is issued or `limit_ms` of hold time passes.
fn hold_until_restart(
    rig: &Rig,
    app: &mut sensebe::app::service::AppService<'_, { crate::mock_hw::DEPTH }>,
    hw: &mut MockDevice,
    sink: &mut RecordingSink,
    limit_ms: u32,
) -> u32 {
    rig.press();
    app.process_iteration(hw, sink);
    let mut held = 0;
    while held < limit_ms && hw.restarts().is_empty() {
        rig.run_timer(60, 10);
        held += 60;
        app.process_iteration(hw, sink);
    }
    held
}

#[test]
fn long_press_from_advertising_restarts_stack_aware() {
    let rig = Rig::new();
    let (mut app, mut hw, mut sink) = started(&rig, SystemConfig::default());

    let held = hold_until_restart(&rig, &mut app, &mut hw, &mut sink, 20_000);

    assert_eq!(held, 15_000);
    assert_eq!(hw.restarts(), vec![RestartPath::StackAware]);
    let steps: Vec<GestureStep> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Gesture { step, action: GestureAction::Cross } => Some(*step),
            _ => None,
        })
        .collect();
    assert_eq!(
        steps,
        vec![GestureStep::Wake, GestureStep::Quick, GestureStep::Short, GestureStep::Long]
    );
}

#[test]
fn long_press_with_radio_down_restarts_directly() {
    let rig = Rig::new();
    let ladder = GestureLadder::new(&[(5_000, GestureStep::Short), (15_000, GestureStep::Long)])
        .unwrap();
    rig.button.set_ladder(ladder);
    let (mut app, mut hw, mut sink) = started(&rig, SystemConfig::default());

    let held = hold_until_restart(&rig, &mut app, &mut hw, &mut sink, 20_000);

    assert_eq!(held, 15_000);
    assert_eq!(app.state(), Some(DeviceMode::Sensing));
    assert_eq!(hw.restarts(), vec![RestartPath::Direct]);
    assert!(sink.events.contains(&AppEvent::RestartRequested(RestartPath::Direct)));
}

#[test]
fn saturated_hold_is_a_runaway_restart() {
    let rig = Rig::new();
    let (mut app, mut hw, mut sink) = started(&rig, SystemConfig::default());

    rig.press();
    rig.queue.push(Message::IntervalTick { elapsed_ms: u32::MAX });
    app.process_iteration(&mut hw, &mut sink);

    assert!(sink.events.contains(&cross(GestureStep::Runaway)));
    assert!(!sink.events.contains(&cross(GestureStep::Long)));
    assert_eq!(hw.restarts(), vec![RestartPath::Direct]);
}

#[test]
fn ticks_without_a_press_post_no_gestures() {
    let rig = Rig::new();
    let (mut app, mut hw, mut sink) = started(&rig, SystemConfig::default());

    rig.run_timer(300_000, 10);
    assert_eq!(rig.queue.len(), 1);
    app.process_iteration(&mut hw, &mut sink);

    assert!(sink.events.is_empty());
    assert!(hw.actions().is_empty());
}

// ── Shared runtime instances ──────────────────────────────────

// The only test touching the process-wide statics.
#[test]
fn runtime_hooks_feed_the_shared_queue() {
    let bad = SystemConfig { connection_timeout_ms: 0, ..SystemConfig::default() };
    assert!(matches!(
        runtime::init(ButtonConfig::default(), bad, SysInfo::new("SB-000001"), None),
        Err(Error::Config(_))
    ));

    let mut app = runtime::init(
        ButtonConfig::default(),
        SystemConfig::default(),
        SysInfo::new("SB-000001"),
        None,
    )
    .unwrap();
    let mut hw = MockDevice::new();
    let mut sink = RecordingSink::new();
    app.start(&mut hw, &mut sink);
    assert_eq!(app.identity().id_str(), "SB-000001");

    runtime::on_button_edge(true);
    app.process_iteration(&mut hw, &mut sink);
    assert_eq!(runtime::TICKS.mode(), TickMode::Fast);

    runtime::on_timer_fire(60);
    runtime::on_timer_fire(60);
    app.process_iteration(&mut hw, &mut sink);
    assert_eq!(app.state(), Some(DeviceMode::Advertising));

    assert!(runtime::request_mode(DeviceMode::Connected));
    app.process_iteration(&mut hw, &mut sink);
    assert_eq!(app.state(), Some(DeviceMode::Connected));

    runtime::on_button_edge(false);
    app.process_iteration(&mut hw, &mut sink);
    runtime::on_timer_fire(10);
    assert_eq!(runtime::TICKS.mode(), TickMode::Slow);
    assert!(runtime::EVENT_QUEUE.is_empty());
}
