//! Peripheral drivers, hardware initialisation, and the gesture recognizer.

pub mod button;
pub mod hw_init;
pub mod hw_timer;
pub mod led_patterns;
pub mod status_led;
pub mod watchdog;
