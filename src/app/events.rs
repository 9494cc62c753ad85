//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, count them in a test,
//! and so on.

use crate::app::ports::RestartPath;
use crate::drivers::button::{GestureAction, GestureStep};
use crate::error::{ConfigError, RadioError};
use crate::fsm::DeviceMode;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// The service has started (carries initial mode).
    Started(DeviceMode),

    /// The state machine moved between modes.
    ModeChanged { from: DeviceMode, to: DeviceMode },

    /// A gesture event was dispatched.
    Gesture { step: GestureStep, action: GestureAction },

    /// Messages were dropped since the last report.
    QueueOverflow { dropped: u32, total: u32 },

    /// A configuration blob from the radio stack was accepted.
    ConfigReceived,

    /// A configuration blob was rejected; the previous one is kept.
    ConfigRejected(ConfigError),

    /// The radio stack failed an operation.
    RadioFault(RadioError),

    /// The connected session ran past its timeout.
    ConnectionTimeout,

    /// A restart is about to happen.
    RestartRequested(RestartPath),
}
