//! System configuration parameters
//!
//! Three records live here:
//!
//! - [`SystemConfig`]: the timing profile (per-mode tick rates, connection
//!   timeout, watchdog period, gesture thresholds).  Compiled-in defaults,
//!   validated once at init.
//! - [`SenseConfig`]: the sensing configuration exchanged with the mobile
//!   app over the radio stack as a fixed little-endian blob.
//! - [`SysInfo`]: identity and status published to the radio stack.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::scheduler::{TickConfig, TickStart};

/// Value written to the retained restart slot before a user-requested reset.
pub const RESTART_MARKER: u8 = 0xB1;

/// Fast/slow interval pair for one device mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickRates {
    pub fast_ms: u32,
    pub slow_ms: u32,
}

impl TickRates {
    pub const fn new(fast_ms: u32, slow_ms: u32) -> Self {
        Self { fast_ms, slow_ms }
    }

    /// Scheduler configuration for these rates.
    pub const fn tick_config(self, start: TickStart) -> TickConfig {
        TickConfig::new(self.fast_ms, self.slow_ms, start)
    }
}

/// Core timing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Tick cadence per mode ---
    pub sensing: TickRates,
    pub advertising: TickRates,
    pub connected: TickRates,

    // --- Timeouts ---
    /// Connected-mode session length before a forced disconnect (ms)
    pub connection_timeout_ms: u32,
    /// Watchdog bite interval (ms)
    pub watchdog_period_ms: u32,
    /// Period of the hardware timer feeding the scheduler (ms)
    pub timer_granularity_ms: u32,

    // --- Gesture ladder ---
    pub quick_press_ms: u32,
    pub short_press_ms: u32,
    pub long_press_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            sensing: TickRates::new(60, 300_000),
            advertising: TickRates::new(60, 1_100),
            connected: TickRates::new(60, 1_100),

            connection_timeout_ms: 10 * 60 * 1000,
            watchdog_period_ms: 301_000,
            timer_granularity_ms: 10,

            quick_press_ms: 100,
            short_press_ms: 5_000,
            long_press_ms: 15_000,
        }
    }
}

impl SystemConfig {
    /// Reject combinations that would misfire the scheduler or starve the
    /// watchdog.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for rates in [self.sensing, self.advertising, self.connected] {
            if rates.fast_ms == 0 || rates.slow_ms == 0 {
                return Err(ConfigError::Invalid("tick interval must be positive"));
            }
            if rates.fast_ms >= rates.slow_ms {
                return Err(ConfigError::Invalid("fast interval must be below slow"));
            }
            if rates.slow_ms >= self.watchdog_period_ms {
                return Err(ConfigError::Invalid("tick interval exceeds watchdog period"));
            }
            if self.timer_granularity_ms > rates.fast_ms {
                return Err(ConfigError::Invalid("timer granularity coarser than fast tick"));
            }
        }
        if self.timer_granularity_ms == 0 {
            return Err(ConfigError::Invalid("timer granularity must be positive"));
        }
        if self.connection_timeout_ms == 0 {
            return Err(ConfigError::Invalid("connection timeout must be positive"));
        }
        if !(0 < self.quick_press_ms
            && self.quick_press_ms < self.short_press_ms
            && self.short_press_ms < self.long_press_ms)
        {
            return Err(ConfigError::Invalid("press thresholds not increasing"));
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Button wiring
// ───────────────────────────────────────────────────────────────

/// Button pin and interrupt priority handed to [`crate::runtime::init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonConfig {
    pub pin: i32,
    /// Interrupt priority level (1 = lowest).
    pub irq_priority: u8,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self { pin: crate::pins::BUTTON_GPIO, irq_priority: crate::pins::BUTTON_IRQ_PRIORITY }
    }
}

// ───────────────────────────────────────────────────────────────
// Sensing configuration blob
// ───────────────────────────────────────────────────────────────

pub const BATTERY_STANDARD: u8 = 0;
pub const BATTERY_RECHARGEABLE: u8 = 1;

pub const SPEED_LIGHTNING: u8 = 0;
pub const SPEED_FAST: u8 = 1;
pub const SPEED_NORMAL: u8 = 2;
pub const SPEED_SLOW: u8 = 3;

pub const DEV_NAME_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Date {
    pub dd: u8,
    pub mm: u8,
    pub yy: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RadioControl {
    pub channel: u8,
    pub oper_duration_25ms: u16,
    pub oper_freq_100us: u16,
}

/// Camera trigger slots carried in every [`SenseConfig`].
pub const MAX_SETTINGS: usize = 2;

/// Camera trigger modes.
pub const CAM_MODE_SINGLE_SHOT: u8 = 0;
pub const CAM_MODE_MULTI_SHOT: u8 = 1;
pub const CAM_MODE_BULB: u8 = 2;
pub const CAM_MODE_VIDEO: u8 = 3;
pub const CAM_MODE_FOCUS: u8 = 4;
pub const CAM_MODE_NO_SHOT: u8 = 5;

/// `trig_sel` value for motion detection.  Anything else selects the timer.
pub const TRIG_SEL_MOTION: u8 = 0;
pub const TRIG_SEL_TIMER: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CamTrigger {
    pub mode: u8,
    /// Mode-specific parameter, e.g. long press duration in 100 ms units.
    pub mode_setting: u16,
    pub pre_focus_en: u8,
    pub video_w_full_press_en: u8,
    pub prf_pulse_duration_100ms: u8,
    pub radio_trig_en: u8,
    pub trig_pulse_duration_100ms: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperCond {
    pub lower_light_threshold: u16,
    pub higher_light_threshold: u16,
    /// `u32::MAX` on both ends means no time window.
    pub start_time: u32,
    pub end_time: u32,
}

/// Decoded view of [`Settings::func_setting`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerFunc {
    Motion {
        is_enable: u8,
        sensitivity: u8,
        inter_trig_time: u16,
        detect_trigger_num: u8,
    },
    Timer { duration: u16 },
}

/// One camera trigger slot.
///
/// Wire layout (little-endian, [`Settings::LEN`] bytes):
///
/// ```text
/// 0      camera mode
/// 1..3   mode setting
/// 3      pre-focus enable
/// 4      video with full press enable
/// 5      pre-focus pulse (100 ms units)
/// 6      radio trigger enable
/// 7      trigger pulse (100 ms units)
/// 8..10  lower light threshold
/// 10..12 higher light threshold
/// 12..16 start time
/// 16..20 end time
/// 20     trigger select
/// 21..26 function setting, shared by motion and timer
/// ```
///
/// The function bytes are kept raw so re-encoding is byte exact whichever
/// interpretation `trig_sel` picks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub cam_trigger: CamTrigger,
    pub oper_cond: OperCond,
    pub trig_sel: u8,
    pub func_setting: [u8; Settings::FUNC_LEN],
}

impl Default for Settings {
    /// No shot, timer triggered every 15 units, no time window.
    fn default() -> Self {
        Self {
            cam_trigger: CamTrigger {
                mode: CAM_MODE_NO_SHOT,
                mode_setting: 1,
                pre_focus_en: 1,
                video_w_full_press_en: 1,
                prf_pulse_duration_100ms: 1,
                radio_trig_en: 1,
                trig_pulse_duration_100ms: 1,
            },
            oper_cond: OperCond {
                lower_light_threshold: 0,
                higher_light_threshold: 0,
                start_time: u32::MAX,
                end_time: u32::MAX,
            },
            trig_sel: TRIG_SEL_TIMER,
            func_setting: Self::timer_func(15),
        }
    }
}

impl Settings {
    pub const LEN: usize = 26;
    pub const FUNC_LEN: usize = 5;

    fn timer_func(duration: u16) -> [u8; Self::FUNC_LEN] {
        let d = duration.to_le_bytes();
        [d[0], d[1], 0, 0, 0]
    }

    pub fn with_timer(mut self, duration: u16) -> Self {
        self.trig_sel = TRIG_SEL_TIMER;
        self.func_setting = Self::timer_func(duration);
        self
    }

    pub fn with_motion(
        mut self,
        is_enable: u8,
        sensitivity: u8,
        inter_trig_time: u16,
        detect_trigger_num: u8,
    ) -> Self {
        let t = inter_trig_time.to_le_bytes();
        self.trig_sel = TRIG_SEL_MOTION;
        self.func_setting = [is_enable, sensitivity, t[0], t[1], detect_trigger_num];
        self
    }

    pub fn trigger(&self) -> TriggerFunc {
        let f = &self.func_setting;
        if self.trig_sel == TRIG_SEL_MOTION {
            TriggerFunc::Motion {
                is_enable: f[0],
                sensitivity: f[1],
                inter_trig_time: u16::from_le_bytes([f[2], f[3]]),
                detect_trigger_num: f[4],
            }
        } else {
            TriggerFunc::Timer {
                duration: u16::from_le_bytes([f[0], f[1]]),
            }
        }
    }

    fn read(b: &[u8; Self::LEN]) -> Self {
        let mut func_setting = [0u8; Self::FUNC_LEN];
        func_setting.copy_from_slice(&b[21..26]);
        Self {
            cam_trigger: CamTrigger {
                mode: b[0],
                mode_setting: u16::from_le_bytes([b[1], b[2]]),
                pre_focus_en: b[3],
                video_w_full_press_en: b[4],
                prf_pulse_duration_100ms: b[5],
                radio_trig_en: b[6],
                trig_pulse_duration_100ms: b[7],
            },
            oper_cond: OperCond {
                lower_light_threshold: u16::from_le_bytes([b[8], b[9]]),
                higher_light_threshold: u16::from_le_bytes([b[10], b[11]]),
                start_time: u32::from_le_bytes([b[12], b[13], b[14], b[15]]),
                end_time: u32::from_le_bytes([b[16], b[17], b[18], b[19]]),
            },
            trig_sel: b[20],
            func_setting,
        }
    }

    fn write(&self, b: &mut [u8; Self::LEN]) {
        let cam = &self.cam_trigger;
        b[0] = cam.mode;
        b[1..3].copy_from_slice(&cam.mode_setting.to_le_bytes());
        b[3] = cam.pre_focus_en;
        b[4] = cam.video_w_full_press_en;
        b[5] = cam.prf_pulse_duration_100ms;
        b[6] = cam.radio_trig_en;
        b[7] = cam.trig_pulse_duration_100ms;
        b[8..10].copy_from_slice(&self.oper_cond.lower_light_threshold.to_le_bytes());
        b[10..12].copy_from_slice(&self.oper_cond.higher_light_threshold.to_le_bytes());
        b[12..16].copy_from_slice(&self.oper_cond.start_time.to_le_bytes());
        b[16..20].copy_from_slice(&self.oper_cond.end_time.to_le_bytes());
        b[20] = self.trig_sel;
        b[21..26].copy_from_slice(&self.func_setting);
    }

    fn log_summary(&self, slot: usize) {
        let cam = &self.cam_trigger;
        info!(
            "Config[{}]: cam mode={} setting={:#x} prefocus={} video_full={} prf={} radio={} pulse={}",
            slot,
            cam.mode,
            cam.mode_setting,
            cam.pre_focus_en,
            cam.video_w_full_press_en,
            cam.prf_pulse_duration_100ms,
            cam.radio_trig_en,
            cam.trig_pulse_duration_100ms,
        );
        info!(
            "Config[{}]: light {}..{} time {}..{}",
            slot,
            self.oper_cond.lower_light_threshold,
            self.oper_cond.higher_light_threshold,
            self.oper_cond.start_time,
            self.oper_cond.end_time,
        );
        match self.trigger() {
            TriggerFunc::Motion {
                is_enable,
                sensitivity,
                inter_trig_time,
                detect_trigger_num,
            } => info!(
                "Config[{}]: motion enabled={} sensitivity={} inter_trig={} triggers={}",
                slot, is_enable, sensitivity, inter_trig_time, detect_trigger_num
            ),
            TriggerFunc::Timer { duration } => {
                info!("Config[{}]: timer duration={}", slot, duration)
            }
        }
    }
}

/// Sensing configuration as exchanged with the mobile app.
///
/// Wire layout (little-endian, [`SenseConfig::BLOB_LEN`] bytes):
///
/// ```text
/// 0      battery_type
/// 1..4   date dd, mm, yy
/// 4..8   current_time (seconds since midnight)
/// 8..24  dev_name (NUL padded)
/// 24     radio channel
/// 25..27 radio operation duration (25 ms units)
/// 27..29 radio operation frequency (100 us units)
/// 29     speed
/// 30..32 trigger operation condition selectors
/// 32..   MAX_SETTINGS camera trigger slots, Settings::LEN bytes each
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenseConfig {
    pub battery_type: u8,
    pub current_date: Date,
    pub current_time: u32,
    pub dev_name: [u8; DEV_NAME_LEN],
    pub radio_control: RadioControl,
    pub speed: u8,
    pub trigger_oper_cond_sel: [u8; 2],
    pub generic_settings: [Settings; MAX_SETTINGS],
}

impl Default for SenseConfig {
    fn default() -> Self {
        let mut dev_name = [0u8; DEV_NAME_LEN];
        dev_name[..7].copy_from_slice(b"SenseBe");
        Self {
            battery_type: BATTERY_STANDARD,
            current_date: Date { dd: 0, mm: 0, yy: 0 },
            current_time: 0,
            dev_name,
            radio_control: RadioControl::default(),
            speed: SPEED_FAST,
            trigger_oper_cond_sel: [1, 1],
            generic_settings: [Settings::default(); MAX_SETTINGS],
        }
    }
}

impl SenseConfig {
    const HEADER_LEN: usize = 32;
    pub const BLOB_LEN: usize = Self::HEADER_LEN + MAX_SETTINGS * Settings::LEN;

    /// Decode a blob received from the radio stack.
    ///
    /// Exactly [`Self::BLOB_LEN`] bytes are used: trailing bytes are
    /// ignored with a warning, a short blob is rejected.
    pub fn from_blob(blob: &[u8]) -> Result<Self, ConfigError> {
        if blob.len() < Self::BLOB_LEN {
            return Err(ConfigError::BlobTooShort {
                got: blob.len(),
                need: Self::BLOB_LEN,
            });
        }
        if blob.len() > Self::BLOB_LEN {
            warn!(
                "Config blob oversized ({} bytes), using first {}",
                blob.len(),
                Self::BLOB_LEN
            );
        }
        let b = &blob[..Self::BLOB_LEN];

        let mut dev_name = [0u8; DEV_NAME_LEN];
        dev_name.copy_from_slice(&b[8..24]);

        let mut generic_settings = [Settings::default(); MAX_SETTINGS];
        for (slot, raw) in generic_settings
            .iter_mut()
            .zip(b[Self::HEADER_LEN..].chunks_exact(Settings::LEN))
        {
            let mut bytes = [0u8; Settings::LEN];
            bytes.copy_from_slice(raw);
            *slot = Settings::read(&bytes);
        }

        Ok(Self {
            battery_type: b[0],
            current_date: Date { dd: b[1], mm: b[2], yy: b[3] },
            current_time: u32::from_le_bytes([b[4], b[5], b[6], b[7]]),
            dev_name,
            radio_control: RadioControl {
                channel: b[24],
                oper_duration_25ms: u16::from_le_bytes([b[25], b[26]]),
                oper_freq_100us: u16::from_le_bytes([b[27], b[28]]),
            },
            speed: b[29],
            trigger_oper_cond_sel: [b[30], b[31]],
            generic_settings,
        })
    }

    /// Encode in the layout [`Self::from_blob`] reads.
    pub fn to_blob(&self) -> [u8; Self::BLOB_LEN] {
        let mut b = [0u8; Self::BLOB_LEN];
        b[0] = self.battery_type;
        b[1] = self.current_date.dd;
        b[2] = self.current_date.mm;
        b[3] = self.current_date.yy;
        b[4..8].copy_from_slice(&self.current_time.to_le_bytes());
        b[8..24].copy_from_slice(&self.dev_name);
        b[24] = self.radio_control.channel;
        b[25..27].copy_from_slice(&self.radio_control.oper_duration_25ms.to_le_bytes());
        b[27..29].copy_from_slice(&self.radio_control.oper_freq_100us.to_le_bytes());
        b[29] = self.speed;
        b[30..32].copy_from_slice(&self.trigger_oper_cond_sel);
        for (setting, raw) in self
            .generic_settings
            .iter()
            .zip(b[Self::HEADER_LEN..].chunks_exact_mut(Settings::LEN))
        {
            let mut bytes = [0u8; Settings::LEN];
            setting.write(&mut bytes);
            raw.copy_from_slice(&bytes);
        }
        b
    }

    /// Device name up to the first NUL, lossy on invalid UTF-8.
    pub fn name(&self) -> &str {
        let end = self
            .dev_name
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(DEV_NAME_LEN);
        core::str::from_utf8(&self.dev_name[..end]).unwrap_or("SenseBe")
    }

    pub fn log_summary(&self) {
        info!(
            "Config: battery={} date={}/{}/{} time={}s name={} chan={} dur={} freq={} speed={} motion={} timer={}",
            self.battery_type,
            self.current_date.dd,
            self.current_date.mm,
            self.current_date.yy,
            self.current_time,
            self.name(),
            self.radio_control.channel,
            self.radio_control.oper_duration_25ms,
            self.radio_control.oper_freq_100us,
            self.speed,
            self.trigger_oper_cond_sel[0],
            self.trigger_oper_cond_sel[1],
        );
        for (slot, setting) in self.generic_settings.iter().enumerate() {
            setting.log_summary(slot);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Identity / status
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FwVersion {
    pub major: u8,
    pub minor: u8,
    pub build: u8,
}

pub const FW_VERSION: FwVersion = FwVersion { major: 0, minor: 0, build: 8 };

/// Identity and status record published to the radio stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SysInfo {
    pub id: [u8; 16],
    pub battery_status: u8,
    pub fw_ver: FwVersion,
}

impl SysInfo {
    /// Upper bound of the postcard encoding.
    pub const MAX_ENCODED_LEN: usize = 24;

    /// Ids longer than 16 bytes are cut at the last whole character.
    pub fn new(id: &str) -> Self {
        let mut buf = [0u8; 16];
        let mut n = id.len().min(buf.len());
        while !id.is_char_boundary(n) {
            n -= 1;
        }
        buf[..n].copy_from_slice(&id.as_bytes()[..n]);
        Self {
            id: buf,
            battery_status: 0,
            fw_ver: FW_VERSION,
        }
    }

    /// Id up to the first NUL.
    pub fn id_str(&self) -> &str {
        let end = self.id.iter().position(|&c| c == 0).unwrap_or(self.id.len());
        core::str::from_utf8(&self.id[..end]).unwrap_or("")
    }

    /// Compact encoding for the status characteristic.
    pub fn encode<'b>(&self, buf: &'b mut [u8]) -> Result<&'b mut [u8], ConfigError> {
        postcard::to_slice(self, buf).map_err(|_| ConfigError::Invalid("sysinfo encode"))
    }
}
