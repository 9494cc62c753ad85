//! GPIO / peripheral pin assignments for the SenseBe board.
//!
//! Every driver references this module rather than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// User button (active-low, internal pull-up)
// ---------------------------------------------------------------------------

/// Momentary push-button driving the gesture recognizer.
pub const BUTTON_GPIO: i32 = 9;

/// Interrupt priority flag level for the button edge ISR (1 = lowest).
pub const BUTTON_IRQ_PRIORITY: u8 = 1;

// ---------------------------------------------------------------------------
// Status LED (discrete RGB, common cathode)
// ---------------------------------------------------------------------------

pub const LED_R_GPIO: i32 = 3;
pub const LED_G_GPIO: i32 = 4;
pub const LED_B_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution (bits).  8-bit gives 0 – 255 duty levels.
pub const PWM_RESOLUTION_BITS: u32 = 8;
/// LEDC frequency for the RGB status LED (1 kHz).
pub const LED_PWM_FREQ_HZ: u32 = 1_000;
