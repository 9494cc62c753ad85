//! Unified error types for the SenseBe firmware.
//!
//! Every fallible main-loop operation funnels into [`Error`].  Interrupt
//! context never returns one: queue pushes report `false` and bump an
//! overflow counter, and edge handlers drop what they cannot use.
//! All variants are `Copy` so they can be logged and carried through
//! [`AppEvent`](crate::app::events::AppEvent) without allocation.

use core::fmt;

pub use crate::drivers::hw_init::HwInitError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The deferred event queue rejected a message.
    Queue(QueueError),
    /// A configuration record is invalid or truncated.
    Config(ConfigError),
    /// A gesture ladder could not be built.
    Ladder(LadderError),
    /// The radio stack refused an operation.
    Radio(RadioError),
    /// Peripheral initialisation failed.
    Init(HwInitError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queue(e) => write!(f, "queue: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Ladder(e) => write!(f, "ladder: {e}"),
            Self::Radio(e) => write!(f, "radio: {e}"),
            Self::Init(e) => write!(f, "init: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Queue errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The queue was full; the message was dropped and counted.
    Overflow,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overflow => write!(f, "queue full, message dropped"),
        }
    }
}

impl From<QueueError> for Error {
    fn from(e: QueueError) -> Self {
        Self::Queue(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A configuration blob was shorter than the structure it encodes.
    BlobTooShort { got: usize, need: usize },
    /// A field failed validation.
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlobTooShort { got, need } => {
                write!(f, "blob too short ({got} bytes, need {need})")
            }
            Self::Invalid(msg) => write!(f, "invalid: {msg}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Gesture ladder errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LadderError {
    /// No steps were supplied.
    Empty,
    /// More steps than the fixed ladder can hold.
    TooManySteps,
    /// Thresholds must be strictly increasing.
    NotIncreasing,
    /// A zero threshold collides with the press-edge step.
    ZeroThreshold,
}

impl fmt::Display for LadderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "no steps"),
            Self::TooManySteps => write!(f, "too many steps"),
            Self::NotIncreasing => write!(f, "thresholds not strictly increasing"),
            Self::ZeroThreshold => write!(f, "zero threshold"),
        }
    }
}

impl From<LadderError> for Error {
    fn from(e: LadderError) -> Self {
        Self::Ladder(e)
    }
}

// ---------------------------------------------------------------------------
// Radio errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// Controller or host stack bring-up failed (raw ESP-IDF code).
    StackInitFailed(i32),
    /// Advertising could not be started (raw ESP-IDF code).
    AdvertisingFailed(i32),
    /// The operation needs an active stack.
    NotActive,
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackInitFailed(code) => write!(f, "stack init failed ({code})"),
            Self::AdvertisingFailed(code) => write!(f, "advertising failed ({code})"),
            Self::NotActive => write!(f, "stack not active"),
        }
    }
}

impl From<RadioError> for Error {
    fn from(e: RadioError) -> Self {
        Self::Radio(e)
    }
}

impl From<HwInitError> for Error {
    fn from(e: HwInitError) -> Self {
        Self::Init(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
