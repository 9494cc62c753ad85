//! Function-pointer finite state machine for the device modes.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                       │
//! │  ┌─────────────┬──────────┬──────────┬──────────────┬───────────┐ │
//! │  │ DeviceMode  │ on_enter │ on_exit  │ on_tick      │ on_gesture│ │
//! │  ├─────────────┼──────────┼──────────┼──────────────┼───────────┤ │
//! │  │ Sensing     │ fn(ctx)  │ —        │ —            │ fn(ctx,s) │ │
//! │  │ Advertising │ fn(ctx)  │ —        │ —            │ —         │ │
//! │  │ Connected   │ fn(ctx)  │ fn(ctx)  │ fn(ctx, ms)  │ —         │ │
//! │  └─────────────┴──────────┴──────────┴──────────────┴───────────┘ │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`Fsm::dispatch`] is the only writer of the current mode.  It runs the
//! handlers for one [`Input`] and returns the commands they produced;
//! nothing is executed inline.  Gestures that mean the same in every mode
//! (wake, long press, release) are handled here; mode-specific ones go
//! through the table.

pub mod context;
pub mod states;

use context::FsmContext;
use log::{error, info, warn};

use crate::app::commands::{Command, CommandList};
use crate::app::ports::RestartPath;
use crate::drivers::button::GestureStep;
use crate::scheduler::{TickMode, TickStart};

// ---------------------------------------------------------------------------
// Mode identity
// ---------------------------------------------------------------------------

/// Top-level device modes.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DeviceMode {
    Sensing = 0,
    Advertising = 1,
    Connected = 2,
}

impl DeviceMode {
    /// Number of modes, sizes the table array.
    pub const COUNT: usize = 3;

    /// Convert an index back to a mode.  Out-of-range falls back to
    /// `Sensing`, the radio-off mode.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Sensing,
            1 => Self::Advertising,
            2 => Self::Connected,
            _ => {
                debug_assert!(false, "invalid mode index: {idx}");
                Self::Sensing
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Entry and exit actions.  Run exactly once per transition.
pub type StateActionFn = fn(&mut FsmContext);

/// Per-tick handler, receives the dispatched elapsed time.
pub type StateTickFn = fn(&mut FsmContext, u32);

/// Mode-specific reaction to a gesture cross.
pub type StateGestureFn = fn(&mut FsmContext, GestureStep);

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

pub struct StateDescriptor {
    pub id: DeviceMode,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_tick: Option<StateTickFn>,
    pub on_gesture: Option<StateGestureFn>,
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// Move to a mode (button, radio stack, or a handler's own request).
    ModeRequest(DeviceMode),
    GestureCross(GestureStep),
    GestureRelease(GestureStep),
    Tick(u32),
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    /// Fixed-size table indexed by `DeviceMode as usize`.
    table: [StateDescriptor; DeviceMode::COUNT],
    /// `None` until [`start`](Self::start) forces the first transition.
    current: Option<usize>,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; DeviceMode::COUNT]) -> Self {
        Self {
            table,
            current: None,
        }
    }

    /// Enter `initial` through a real transition so its entry actions run.
    pub fn start(&mut self, initial: DeviceMode, ctx: &mut FsmContext) -> CommandList {
        info!("FSM starting in state: {}", self.table[initial as usize].name);
        self.dispatch(Input::ModeRequest(initial), ctx)
    }

    /// Run the handlers for one input and return the resulting commands.
    pub fn dispatch(&mut self, input: Input, ctx: &mut FsmContext) -> CommandList {
        ctx.commands.clear();
        match input {
            Input::ModeRequest(target) => self.request(target, ctx),
            Input::Tick(elapsed_ms) => {
                if let Some(tick) = self.descriptor().and_then(|d| d.on_tick) {
                    tick(ctx, elapsed_ms);
                }
            }
            Input::GestureCross(step) => self.on_cross(step, ctx),
            Input::GestureRelease(step) => {
                info!("FSM: button released at {:?}", step);
                ctx.emit(Command::SwitchTickMode(TickMode::Slow));
                ctx.emit(Command::ArmButtonWake(true));
            }
        }
        ctx.take_commands()
    }

    /// `None` before [`start`](Self::start).
    pub fn current_state(&self) -> Option<DeviceMode> {
        self.current.map(DeviceMode::from_index)
    }

    pub fn state_name(&self, mode: DeviceMode) -> &'static str {
        self.table[mode as usize].name
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn descriptor(&self) -> Option<&StateDescriptor> {
        self.current.map(|idx| &self.table[idx])
    }

    fn request(&mut self, target: DeviceMode, ctx: &mut FsmContext) {
        if self.current == Some(target as usize) {
            info!("FSM: already in {}, ignoring", self.table[target as usize].name);
            return;
        }
        self.transition(target, ctx);
    }

    fn on_cross(&mut self, step: GestureStep, ctx: &mut FsmContext) {
        match step {
            GestureStep::Wake => {
                let mode = self.current_state().unwrap_or(DeviceMode::Sensing);
                let fast = ctx.rates(mode).tick_config(TickStart::Fast);
                ctx.emit(Command::ArmButtonWake(false));
                ctx.emit(Command::ConfigureTicks(fast));
            }
            GestureStep::Long | GestureStep::Runaway => {
                if step == GestureStep::Runaway {
                    error!("FSM: button hold saturated the gesture ladder");
                }
                let path = if ctx.radio_active {
                    RestartPath::StackAware
                } else {
                    RestartPath::Direct
                };
                warn!("FSM: restart requested ({:?})", path);
                ctx.emit(Command::Restart(path));
            }
            _ => {
                if let Some(gesture) = self.descriptor().and_then(|d| d.on_gesture) {
                    gesture(ctx, step);
                }
            }
        }
    }

    fn transition(&mut self, next: DeviceMode, ctx: &mut FsmContext) {
        let next_idx = next as usize;

        if let Some(cur) = self.current {
            info!(
                "FSM transition: {} -> {}",
                self.table[cur].name, self.table[next_idx].name
            );
            if let Some(exit) = self.table[cur].on_exit {
                exit(ctx);
            }
        }

        self.current = Some(next_idx);

        if let Some(enter) = self.table[next_idx].on_enter {
            enter(ctx);
        }
    }
}


#[cfg(all(test, not(target_os = "espidf")))]
mod proptests {
    use super::context::FsmContext;
    use super::*;
    use crate::config::SystemConfig;
    use proptest::prelude::*;

    fn arb_mode() -> impl Strategy<Value = DeviceMode> {
        (0usize..DeviceMode::COUNT).prop_map(DeviceMode::from_index)
    }

    proptest! {
        /// Requesting the current mode never produces side effects.
        #[test]
        fn repeated_requests_are_idempotent(modes in prop::collection::vec(arb_mode(), 1..50)) {
            let mut fsm = Fsm::new(states::build_state_table());
            let mut ctx = FsmContext::new(SystemConfig::default());
            fsm.start(DeviceMode::Sensing, &mut ctx);

            for mode in modes {
                fsm.dispatch(Input::ModeRequest(mode), &mut ctx);
                ctx.radio_active = mode != DeviceMode::Sensing;
                let again = fsm.dispatch(Input::ModeRequest(mode), &mut ctx);
                prop_assert!(again.is_empty());
                prop_assert_eq!(fsm.current_state(), Some(mode));
            }
        }
    }
}
