//! Port traits: the hexagonal boundary between the control plane and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (radio stack, indicator LED, watchdog, button wake,
//! system control, event sinks) implement these traits.  The
//! [`AppService`](super::service::AppService) consumes them via generics,
//! so the state machine never touches hardware directly.

use crate::config::{SenseConfig, SysInfo};
use crate::drivers::led_patterns::{PatternId, PatternKind, Priority};
use crate::error::RadioError;

// ───────────────────────────────────────────────────────────────
// Radio port (driven adapter: domain ↔ BLE stack)
// ───────────────────────────────────────────────────────────────

pub const CONFIG_BLOB_CAP: usize = 128;

/// Raw configuration bytes written by a connected central.
pub type ConfigBlob = heapless::Vec<u8, CONFIG_BLOB_CAP>;

/// Radio stack lifecycle and the data it publishes.
pub trait RadioPort {
    /// Whether the controller and host stack are up.
    fn is_active(&self) -> bool;

    /// Bring the stack up and register the service.
    fn activate(&mut self) -> Result<(), RadioError>;

    /// Tear the stack down.  No-op when inactive.
    fn deactivate(&mut self);

    /// Start connectable advertising.
    fn start_advertising(&mut self) -> Result<(), RadioError>;

    /// Drop the current connection, if any.
    fn force_disconnect(&mut self);

    /// Advertisement and scan-response payload (device name + id).
    fn set_advertisement(&mut self, info: &SysInfo, name: &str);

    /// Identity/status characteristic.
    fn set_identity(&mut self, info: &SysInfo);

    /// Configuration characteristic.
    fn set_config(&mut self, config: &SenseConfig);

    /// Configuration written by the central since the last call.
    fn take_received_config(&mut self) -> Option<ConfigBlob>;
}

// ───────────────────────────────────────────────────────────────
// Indicator port (driven adapter: domain → status LED)
// ───────────────────────────────────────────────────────────────

pub trait IndicatorPort {
    fn start_pattern(&mut self, pattern: PatternId, priority: Priority);

    /// Stop every running pattern of the given kind.
    fn stop_all(&mut self, kind: PatternKind);
}

// ───────────────────────────────────────────────────────────────
// Watchdog, button wake, system control
// ───────────────────────────────────────────────────────────────

pub trait WatchdogPort {
    fn feed(&mut self);
}

pub trait ButtonWakePort {
    /// Arm (or disarm) the button as a wake-from-sleep source.
    fn arm_wake(&mut self, armed: bool);
}

/// How a restart is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartPath {
    /// Shut the radio stack down cleanly first.
    StackAware,
    /// Reset immediately.
    Direct,
}

pub trait SystemPort {
    /// Does not return on hardware.
    fn restart(&mut self, path: RestartPath);

    /// Low-power wait until any interrupt source fires.
    fn wait_for_event(&mut self);
}

/// Everything the service drives, bundled so one adapter (or one mock)
/// can stand in for the whole device.
pub trait DevicePorts: RadioPort + IndicatorPort + WatchdogPort + ButtonWakePort + SystemPort {}

impl<T> DevicePorts for T where
    T: RadioPort + IndicatorPort + WatchdogPort + ButtonWakePort + SystemPort
{
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Tick delegate (decouples scheduler from the event queue)
// ───────────────────────────────────────────────────────────────

/// Callback the [`TickScheduler`](crate::scheduler::TickScheduler) invokes
/// on every dispatch.
///
/// Runs in timer context.  The firmware forwards into the event queue via
/// [`QueueForwarder`](crate::events::QueueForwarder); the scheduler itself
/// knows nothing about queues.
pub trait TickDelegate {
    fn on_interval(&mut self, elapsed_ms: u32);
}
