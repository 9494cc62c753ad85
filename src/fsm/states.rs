//! Concrete state handler functions and table builder.
//!
//! Each mode is defined by plain `fn` pointers: no closures, no dynamic
//! dispatch, no heap.  Handlers only append commands to the context.
//!
//! ```text
//!  SENSING ──[quick press]──▶ ADVERTISING ──[central connects]──▶ CONNECTED
//!     ▲                            │                                  │
//!     └────[adv terminated]────────┘                                  │
//!     └────[disconnected / connection timeout]────────────────────────┘
//!
//!  Any mode ──[long press]──▶ restart
//! ```

use super::context::FsmContext;
use super::{DeviceMode, StateDescriptor};
use crate::app::commands::Command;
use crate::drivers::button::GestureStep;
use crate::drivers::led_patterns::{PatternId, PatternKind, Priority};
use crate::scheduler::TickStart;
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; DeviceMode::COUNT] {
    [
        // Index 0 — Sensing
        StateDescriptor {
            id: DeviceMode::Sensing,
            name: "Sensing",
            on_enter: Some(sensing_enter),
            on_exit: None,
            on_tick: None,
            on_gesture: Some(sensing_gesture),
        },
        // Index 1 — Advertising
        StateDescriptor {
            id: DeviceMode::Advertising,
            name: "Advertising",
            on_enter: Some(advertising_enter),
            on_exit: None,
            on_tick: None,
            on_gesture: None,
        },
        // Index 2 — Connected
        StateDescriptor {
            id: DeviceMode::Connected,
            name: "Connected",
            on_enter: Some(connected_enter),
            on_exit: Some(connected_exit),
            on_tick: Some(connected_tick),
            on_gesture: None,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  SENSING — radio off, slow cadence, button is the only way out
// ═══════════════════════════════════════════════════════════════════════════

fn sensing_enter(ctx: &mut FsmContext) {
    if ctx.radio_active {
        ctx.emit(Command::DeactivateRadio);
    }
    let rates = ctx.rates(DeviceMode::Sensing);
    ctx.emit(Command::ConfigureTicks(rates.tick_config(TickStart::Same)));
    ctx.emit(Command::StopPatterns(PatternKind::Loop));
    info!("SENSING: radio off, ticks {}/{} ms", rates.fast_ms, rates.slow_ms);
}

fn sensing_gesture(ctx: &mut FsmContext, step: GestureStep) {
    if step == GestureStep::Quick {
        ctx.emit(Command::RequestMode(DeviceMode::Advertising));
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  ADVERTISING — radio up, waiting for a central
// ═══════════════════════════════════════════════════════════════════════════

fn advertising_enter(ctx: &mut FsmContext) {
    ctx.reset_connection_timer();
    let rates = ctx.rates(DeviceMode::Advertising);
    ctx.emit(Command::ConfigureTicks(rates.tick_config(TickStart::Same)));

    // Coming from SENSING the stack is down.
    if !ctx.radio_active {
        ctx.emit(Command::ActivateRadio);
        ctx.emit(Command::PublishAdvertisement);
        ctx.emit(Command::PublishIdentity);
        ctx.emit(Command::PublishConfig);
    }
    ctx.emit(Command::StartAdvertising);

    ctx.emit(Command::StopPatterns(PatternKind::Loop));
    ctx.emit(Command::StartPattern {
        pattern: PatternId::OrangeWave,
        priority: Priority::Mid,
    });
    info!("ADVERTISING: waiting for a connection");
}

// ═══════════════════════════════════════════════════════════════════════════
//  CONNECTED — configuration session with a bounded lifetime
// ═══════════════════════════════════════════════════════════════════════════

fn connected_enter(ctx: &mut FsmContext) {
    ctx.reset_connection_timer();
    let rates = ctx.rates(DeviceMode::Connected);
    ctx.emit(Command::ConfigureTicks(rates.tick_config(TickStart::Same)));
    ctx.emit(Command::StopPatterns(PatternKind::Loop));
    ctx.emit(Command::StartPattern {
        pattern: PatternId::GreenWave,
        priority: Priority::Mid,
    });
    info!(
        "CONNECTED: session timeout {} s",
        ctx.config.connection_timeout_ms / 1000
    );
}

fn connected_tick(ctx: &mut FsmContext, elapsed_ms: u32) {
    ctx.connection_elapsed_ms = ctx.connection_elapsed_ms.saturating_add(elapsed_ms);
    if ctx.connection_elapsed_ms > ctx.config.connection_timeout_ms && !ctx.disconnect_requested {
        warn!(
            "CONNECTED: session exceeded {} ms, disconnecting",
            ctx.config.connection_timeout_ms
        );
        ctx.disconnect_requested = true;
        ctx.emit(Command::ForceDisconnect);
    }
}

fn connected_exit(ctx: &mut FsmContext) {
    ctx.reset_connection_timer();
}
