//! One-shot hardware peripheral initialization.
//!
//! Configures the button GPIO and its any-edge interrupt, the LEDC
//! channels behind the status LED, and the button wake source, using raw
//! ESP-IDF sys calls.  Called once from `runtime::init()` / `main()`
//! before the event loop starts.

use core::sync::atomic::{AtomicI32, Ordering};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::config::ButtonConfig;
#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    InvalidPriority(u8),
    LedcInitFailed(i32),
    IsrInstallFailed(i32),
    TimerFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::InvalidPriority(p)   => write!(f, "button IRQ priority {} outside 1..=3", p),
            Self::LedcInitFailed(rc)   => write!(f, "LEDC timer/channel config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
            Self::TimerFailed(rc)      => write!(f, "tick timer create/start failed (rc={})", rc),
        }
    }
}

/// Button pin recorded by [`init_button`]; `-1` until then.
static BUTTON_PIN: AtomicI32 = AtomicI32::new(-1);

pub fn button_pin() -> Option<i32> {
    match BUTTON_PIN.load(Ordering::Relaxed) {
        pin if pin >= 0 => Some(pin),
        _ => None,
    }
}

/// ESP-IDF interrupt allocation flag for a 1-based priority level.
pub fn irq_priority_flag(priority: u8) -> Result<i32, HwInitError> {
    match priority {
        // ESP_INTR_FLAG_LEVEL1 is bit 1, LEVEL2 bit 2, LEVEL3 bit 3.
        1..=3 => Ok(1 << priority),
        other => Err(HwInitError::InvalidPriority(other)),
    }
}

// ── Button GPIO + ISR ─────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn button_gpio_isr(arg: *mut core::ffi::c_void) {
    let pin = arg as usize as i32;
    // Active-low: level 0 is pressed.
    // SAFETY: gpio_get_level is a register read; safe in ISR context.
    let pressed = unsafe { gpio_get_level(pin) } == 0;
    crate::runtime::on_button_edge(pressed);
}

/// Configure the button input and hook its any-edge interrupt into
/// [`crate::runtime::on_button_edge`].
#[cfg(target_os = "espidf")]
pub fn init_button(button: ButtonConfig) -> Result<(), HwInitError> {
    let flags = irq_priority_flag(button.irq_priority)?;

    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << button.pin,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_ANYEDGE,
    };
    // SAFETY: Called once from the single main task before the event loop.
    // ESP_ERR_INVALID_STATE from the ISR service means it was already
    // installed (acceptable).
    unsafe {
        let ret = gpio_config(&cfg);
        if ret != ESP_OK {
            return Err(HwInitError::GpioConfigFailed(ret));
        }

        let ret = gpio_install_isr_service(flags);
        if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        let ret = gpio_isr_handler_add(
            button.pin,
            Some(button_gpio_isr),
            button.pin as usize as *mut core::ffi::c_void,
        );
        if ret != ESP_OK {
            return Err(HwInitError::IsrInstallFailed(ret));
        }
        gpio_intr_enable(button.pin);
    }
    BUTTON_PIN.store(button.pin, Ordering::Relaxed);

    info!("hw_init: button GPIO{} any-edge ISR (level {})", button.pin, button.irq_priority);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_button(button: ButtonConfig) -> Result<(), HwInitError> {
    irq_priority_flag(button.irq_priority)?;
    BUTTON_PIN.store(button.pin, Ordering::Relaxed);
    log::info!("hw_init(sim): button GPIO{} recorded, edges come from tests", button.pin);
    Ok(())
}

/// Arm or disarm the button as a light-sleep wake source (level low).
#[cfg(target_os = "espidf")]
pub fn arm_button_wake(armed: bool) {
    let Some(pin) = button_pin() else {
        log::warn!("hw_init: button wake requested before init");
        return;
    };
    // SAFETY: pin was configured as an input in init_button(); wakeup
    // registers are only touched from the main task.
    unsafe {
        if armed {
            gpio_wakeup_enable(pin, gpio_int_type_t_GPIO_INTR_LOW_LEVEL);
            esp_sleep_enable_gpio_wakeup();
        } else {
            gpio_wakeup_disable(pin);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn arm_button_wake(armed: bool) {
    log::debug!("hw_init(sim): button wake {}", if armed { "armed" } else { "disarmed" });
}

// ── LEDC PWM (status LED) ─────────────────────────────────────

pub const LEDC_CH_LED_R: u32 = 0;
pub const LEDC_CH_LED_G: u32 = 1;
pub const LEDC_CH_LED_B: u32 = 2;

/// Configure LEDC timer 0 and channels 0-2 for the RGB LED.
#[cfg(target_os = "espidf")]
pub fn init_led_pwm() -> Result<(), HwInitError> {
    let timer = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_8_BIT,
        freq_hz: pins::LED_PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    // SAFETY: Called from the single main task before the event loop.
    let ret = unsafe { ledc_timer_config(&timer) };
    if ret != ESP_OK {
        return Err(HwInitError::LedcInitFailed(ret));
    }

    let led_gpios = [pins::LED_R_GPIO, pins::LED_G_GPIO, pins::LED_B_GPIO];
    for (i, &gpio) in led_gpios.iter().enumerate() {
        let ret = unsafe { ledc_channel_config(&ledc_channel_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel: LEDC_CH_LED_R + i as u32,
            timer_sel: ledc_timer_t_LEDC_TIMER_0,
            gpio_num: gpio,
            duty: 0,
            hpoint: 0,
            ..Default::default()
        }) };
        if ret != ESP_OK {
            return Err(HwInitError::LedcInitFailed(ret));
        }
    }

    info!("hw_init: LEDC configured (led=CH0-2)");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_led_pwm() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): LEDC init skipped");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn ledc_set(channel: u32, duty: u8) {
    // SAFETY: LEDC channels were configured in init_led_pwm(); duty
    // register writes only happen from the main loop.
    unsafe {
        ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, duty as u32);
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set(_channel: u32, _duty: u8) {}
