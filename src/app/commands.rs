//! Outbound commands produced by the device state machine.
//!
//! State handlers never touch hardware.  They append [`Command`]s to the
//! [`FsmContext`](crate::fsm::context::FsmContext) and the
//! [`AppService`](super::service::AppService) executes them in order
//! against the port traits after the handler returns.

use crate::app::ports::RestartPath;
use crate::drivers::led_patterns::{PatternId, PatternKind, Priority};
use crate::fsm::DeviceMode;
use crate::scheduler::{TickConfig, TickMode};

/// Upper bound on commands from a single dispatch.
pub const MAX_COMMANDS: usize = 16;

/// Commands emitted by one state machine dispatch, in execution order.
pub type CommandList = heapless::Vec<Command, MAX_COMMANDS>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Replace the scheduler's intervals.
    ConfigureTicks(TickConfig),
    /// Change the governing cadence at the next timer fire.
    SwitchTickMode(TickMode),
    /// Post a mode change request back through the event queue.
    RequestMode(DeviceMode),

    /// Bring the radio stack up.
    ActivateRadio,
    /// Tear the radio stack down.
    DeactivateRadio,
    /// Push the advertisement payload to the stack.
    PublishAdvertisement,
    /// Push the identity/status record to the stack.
    PublishIdentity,
    /// Push the current sensing configuration to the stack.
    PublishConfig,
    StartAdvertising,
    ForceDisconnect,

    StartPattern { pattern: PatternId, priority: Priority },
    StopPatterns(PatternKind),

    /// Arm or disarm the button as a wake source.
    ArmButtonWake(bool),
    /// Terminal: reset the device.
    Restart(RestartPath),
}
