//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production).

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink {
    emitted: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emitted(&self) -> u32 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        self.emitted = self.emitted.wrapping_add(1);
        match event {
            AppEvent::Started(mode) => {
                info!("START | initial_mode={:?}", mode);
            }
            AppEvent::ModeChanged { from, to } => {
                info!("MODE | {:?} -> {:?}", from, to);
            }
            AppEvent::Gesture { step, action } => {
                info!("GESTURE | {:?} {:?}", step, action);
            }
            AppEvent::QueueOverflow { dropped, total } => {
                info!("QUEUE | dropped={} total={}", dropped, total);
            }
            AppEvent::ConfigReceived => {
                info!("CONFIG | accepted");
            }
            AppEvent::ConfigRejected(e) => {
                info!("CONFIG | rejected: {}", e);
            }
            AppEvent::RadioFault(e) => {
                info!("RADIO | fault: {}", e);
            }
            AppEvent::ConnectionTimeout => {
                info!("RADIO | connection timed out");
            }
            AppEvent::RestartRequested(path) => {
                info!("RESTART | path={:?}", path);
            }
        }
    }
}
