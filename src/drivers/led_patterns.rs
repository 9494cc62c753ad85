//! LED pattern engine with priority-based pattern selection.
//!
//! Generates time-varying RGB values for the status LED.  The state
//! machine starts and stops patterns through
//! [`IndicatorPort`](crate::app::ports::IndicatorPort); a periodic caller
//! advances the engine with `tick()` and feeds the output to
//! `StatusLed::set_colour()`.
//!
//! ## Priority
//!
//! One slot per [`Priority`].  The highest occupied slot drives the LED.
//!
//! ## Patterns
//!
//! | Pattern     | Kind    | Description                          | Period |
//! |-------------|---------|--------------------------------------|--------|
//! | OrangeWave  | Loop    | Orange triangular fade               | 2 s    |
//! | GreenWave   | Loop    | Green triangular fade                | 2 s    |
//! | RedDouble   | OneShot | Two red flashes, then done           | 400 ms |
//! | WhiteFlash  | OneShot | Single white flash, then done        | 150 ms |

use log::debug;

/// Colour as (R, G, B) tuple, each 0–255.
pub type Rgb = (u8, u8, u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternId {
    OrangeWave,
    GreenWave,
    RedDouble,
    WhiteFlash,
}

/// Looping patterns run until stopped; one-shots end on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Loop,
    OneShot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Low = 0,
    Mid = 1,
    High = 2,
}

impl PatternId {
    pub const fn kind(self) -> PatternKind {
        match self {
            Self::OrangeWave | Self::GreenWave => PatternKind::Loop,
            Self::RedDouble | Self::WhiteFlash => PatternKind::OneShot,
        }
    }

    const fn period_ms(self) -> u32 {
        match self {
            Self::OrangeWave | Self::GreenWave => 2_000,
            Self::RedDouble => 400,
            Self::WhiteFlash => 150,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Running {
    pattern: PatternId,
    phase_ms: u32,
}

/// LED pattern engine.  Stack-allocated, no heap.
pub struct LedPatternEngine {
    slots: [Option<Running>; 3],
}

impl Default for LedPatternEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LedPatternEngine {
    pub const fn new() -> Self {
        Self { slots: [None; 3] }
    }

    /// Start `pattern` in the slot for `priority`, replacing what ran there.
    pub fn start(&mut self, pattern: PatternId, priority: Priority) {
        debug!("LED: start {:?} at {:?}", pattern, priority);
        self.slots[priority as usize] = Some(Running { pattern, phase_ms: 0 });
    }

    /// Stop every pattern of `kind`, whatever its priority.
    pub fn stop_all(&mut self, kind: PatternKind) {
        for slot in &mut self.slots {
            if slot.is_some_and(|r| r.pattern.kind() == kind) {
                *slot = None;
            }
        }
    }

    /// Pattern currently driving the LED.
    pub fn active(&self) -> Option<PatternId> {
        self.slots.iter().rev().flatten().next().map(|r| r.pattern)
    }

    /// Advance every running pattern and return the LED output.
    pub fn tick(&mut self, delta_ms: u32) -> Rgb {
        for slot in &mut self.slots {
            if let Some(run) = slot {
                run.phase_ms = run.phase_ms.saturating_add(delta_ms);
                if run.pattern.kind() == PatternKind::OneShot && run.phase_ms >= run.pattern.period_ms() {
                    *slot = None;
                }
            }
        }
        match self.slots.iter().rev().flatten().next() {
            Some(run) => Self::generate(run.pattern, run.phase_ms),
            None => (0, 0, 0),
        }
    }

    fn generate(pattern: PatternId, phase_ms: u32) -> Rgb {
        match pattern {
            PatternId::OrangeWave => {
                let b = Self::wave_brightness(phase_ms, pattern.period_ms());
                Self::scale(COLOUR_ORANGE, b)
            }
            PatternId::GreenWave => {
                let b = Self::wave_brightness(phase_ms, pattern.period_ms());
                Self::scale(COLOUR_GREEN, b)
            }
            PatternId::RedDouble => {
                let on = phase_ms < 100 || (200..300).contains(&phase_ms);
                if on { COLOUR_RED } else { (0, 0, 0) }
            }
            PatternId::WhiteFlash => COLOUR_WHITE,
        }
    }

    /// Triangular ramp 0→255→0 over `period_ms`, no libm.
    fn wave_brightness(phase_ms: u32, period_ms: u32) -> u8 {
        let pos = (phase_ms % period_ms) as u64;
        let half = period_ms as u64 / 2;
        if pos < half {
            ((pos * 255) / half) as u8
        } else {
            (((period_ms as u64 - pos) * 255) / half) as u8
        }
    }

    fn scale((r, g, b): Rgb, brightness: u8) -> Rgb {
        let br = brightness as u16;
        (
            ((r as u16 * br) / 255) as u8,
            ((g as u16 * br) / 255) as u8,
            ((b as u16 * br) / 255) as u8,
        )
    }
}

pub const COLOUR_ORANGE: Rgb = (255, 110, 0);
pub const COLOUR_GREEN: Rgb = (0, 255, 50);
pub const COLOUR_RED: Rgb = (255, 0, 0);
pub const COLOUR_WHITE: Rgb = (255, 255, 255);
