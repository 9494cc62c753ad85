//! RGB status LED driver.
//!
//! Three LEDC PWM channels (CH0-2) drive a common-cathode RGB LED.
//! On host builds only the last colour is tracked.

use crate::drivers::hw_init;
use crate::drivers::led_patterns::Rgb;

pub struct StatusLed {
    current: Rgb,
}

impl Default for StatusLed {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusLed {
    pub fn new() -> Self {
        Self { current: (0, 0, 0) }
    }

    pub fn set_colour(&mut self, (r, g, b): Rgb) {
        if (r, g, b) == self.current {
            return;
        }
        hw_init::ledc_set(hw_init::LEDC_CH_LED_R, r);
        hw_init::ledc_set(hw_init::LEDC_CH_LED_G, g);
        hw_init::ledc_set(hw_init::LEDC_CH_LED_B, b);
        self.current = (r, g, b);
    }

    pub fn off(&mut self) {
        self.set_colour((0, 0, 0));
    }

    pub fn current_colour(&self) -> Rgb {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_last_colour() {
        let mut led = StatusLed::new();
        led.set_colour((255, 80, 0));
        assert_eq!(led.current_colour(), (255, 80, 0));
        led.off();
        assert_eq!(led.current_colour(), (0, 0, 0));
    }
}
