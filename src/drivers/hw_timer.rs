//! Tick timer using ESP-IDF's esp_timer API.
//!
//! One periodic timer at the configured granularity measures the real
//! time since its previous fire and hands it to
//! [`crate::runtime::on_timer_fire`].  The scheduler decides from there
//! whether an interval tick is due, so the timer itself never changes
//! period when the cadence switches.
//!
//! Timer callbacks execute in the ESP timer task context (not ISR).

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicU32, Ordering};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use super::hw_init::HwInitError;

#[cfg(target_os = "espidf")]
static mut TICK_TIMER: esp_timer_handle_t = core::ptr::null_mut();

/// Timestamp (µs, low 32 bits) of the previous fire.
#[cfg(target_os = "espidf")]
static LAST_FIRE_US: AtomicU32 = AtomicU32::new(0);
/// Sub-millisecond remainder carried into the next fire.
#[cfg(target_os = "espidf")]
static CARRY_US: AtomicU32 = AtomicU32::new(0);

/// Split an elapsed microsecond count into whole milliseconds and the
/// leftover microseconds.
pub fn split_elapsed(elapsed_us: u32, carry_us: u32) -> (u32, u32) {
    let total = elapsed_us.saturating_add(carry_us);
    (total / 1_000, total % 1_000)
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn tick_timer_cb(_arg: *mut core::ffi::c_void) {
    // SAFETY: esp_timer_get_time is a counter read; safe in timer context.
    let now = unsafe { esp_timer_get_time() } as u32;
    let last = LAST_FIRE_US.swap(now, Ordering::Relaxed);
    let (delta_ms, carry) = split_elapsed(now.wrapping_sub(last), CARRY_US.load(Ordering::Relaxed));
    CARRY_US.store(carry, Ordering::Relaxed);
    if delta_ms > 0 {
        crate::runtime::on_timer_fire(delta_ms);
    }
}

/// Start the periodic tick timer at `granularity_ms`.
#[cfg(target_os = "espidf")]
pub fn start_tick_timer(granularity_ms: u32) -> Result<(), HwInitError> {
    // SAFETY: TICK_TIMER is written here once at boot from the single
    // main task before any timer callback fires.
    unsafe {
        let args = esp_timer_create_args_t {
            callback: Some(tick_timer_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"tick\0".as_ptr() as *const _,
            skip_unhandled_events: true,
        };
        let ret = esp_timer_create(&args, &raw mut TICK_TIMER);
        if ret != ESP_OK {
            return Err(HwInitError::TimerFailed(ret));
        }

        LAST_FIRE_US.store(esp_timer_get_time() as u32, Ordering::Relaxed);
        let ret = esp_timer_start_periodic(TICK_TIMER, granularity_ms as u64 * 1_000);
        if ret != ESP_OK {
            return Err(HwInitError::TimerFailed(ret));
        }
    }
    info!("hw_timer: tick timer every {} ms", granularity_ms);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn start_tick_timer(granularity_ms: u32) -> Result<(), HwInitError> {
    log::info!("hw_timer(sim): {} ms timer not started (tests drive on_timer_fire)", granularity_ms);
    Ok(())
}

/// Stop the tick timer.
#[cfg(target_os = "espidf")]
pub fn stop_tick_timer() {
    // SAFETY: TICK_TIMER is a valid handle if start_tick_timer()
    // succeeded; the null check covers the other case.
    unsafe {
        let t = TICK_TIMER;
        if !t.is_null() { esp_timer_stop(t); }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn stop_tick_timer() {}
